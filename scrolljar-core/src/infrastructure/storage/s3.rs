//! S3 object storage
//!
//! Bodies smaller than one multipart part go up in a single PutObject. Larger
//! bodies stream as a multipart upload, which is aborted if the body or any
//! part fails so no partial object is left behind. Both paths send
//! `If-None-Match: *` so an existing object is never overwritten.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::domain::jar::ObjectKey;
use crate::domain::storage::{ByteStream, IObjectStorage, KeyPage, StorageError};

/// Minimum S3 part size; also the single-put threshold
pub const PART_SIZE: usize = 5 * 1024 * 1024;
/// DeleteObjects accepts at most this many keys per call
const DELETE_BATCH: usize = 1000;

/// Error codes S3 answers a failed `If-None-Match: *` write with
const CONDITIONAL_WRITE_CODES: [&str; 2] = ["PreconditionFailed", "ConditionalRequestConflict"];

fn sdk_error(context: &str, error: impl std::error::Error) -> StorageError {
    StorageError::backend(format!("{}: {}", context, DisplayErrorContext(error)))
}

fn conditional_write_error<E>(key: &ObjectKey, context: &str, error: E) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match error.code() {
        Some(code) if CONDITIONAL_WRITE_CODES.contains(&code) => {
            StorageError::AlreadyExists(key.to_string())
        }
        _ => sdk_error(context, error),
    }
}

pub struct S3ObjectStorage {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the storage section, falling back to the default
    /// AWS credential chain when no static credentials are configured
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "scrolljar-static",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        info!(bucket = %config.bucket, region = %config.region, "Initialized S3 object storage");
        Self::new(S3Client::from_conf(s3_config), config.bucket.clone())
    }

    async fn put_single(
        &self,
        key: &ObjectKey,
        content_type: &str,
        body: Bytes,
    ) -> Result<u64, StorageError> {
        let length = body.len() as u64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .if_none_match("*")
            .body(S3ByteStream::from(body))
            .send()
            .await
            .map_err(|e| conditional_write_error(key, "put object", e))?;
        Ok(length)
    }

    async fn upload_part(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPart, StorageError> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(upload_id)
            .part_number(part_number)
            .body(S3ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error("upload part", e))?;

        Ok(CompletedPart::builder()
            .set_e_tag(output.e_tag().map(str::to_string))
            .part_number(part_number)
            .build())
    }

    /// Stream the rest of `body` as parts, starting with the `first` buffered part
    async fn upload_parts(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        first: Bytes,
        mut body: ByteStream,
    ) -> Result<(Vec<CompletedPart>, u64), StorageError> {
        let mut written = first.len() as u64;
        let mut parts = vec![self.upload_part(key, upload_id, 1, first).await?];
        let mut buffer = BytesMut::with_capacity(PART_SIZE);

        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
            while buffer.len() >= PART_SIZE {
                let part = buffer.split_to(PART_SIZE).freeze();
                written += part.len() as u64;
                let number = parts.len() as i32 + 1;
                parts.push(self.upload_part(key, upload_id, number, part).await?);
            }
        }

        if !buffer.is_empty() {
            written += buffer.len() as u64;
            let number = parts.len() as i32 + 1;
            parts.push(self.upload_part(key, upload_id, number, buffer.freeze()).await?);
        }

        Ok((parts, written))
    }

    async fn put_multipart(
        &self,
        key: &ObjectKey,
        content_type: &str,
        first: Bytes,
        body: ByteStream,
    ) -> Result<u64, StorageError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| sdk_error("create multipart upload", e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::backend("multipart upload id missing"))?
            .to_string();

        let (parts, written) = match self.upload_parts(key, &upload_id, first, body).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                self.abort(key, &upload_id).await;
                return Err(e);
            }
        };

        let completed = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(&upload_id)
            .if_none_match("*")
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await;

        if let Err(e) = completed {
            self.abort(key, &upload_id).await;
            return Err(conditional_write_error(key, "complete multipart upload", e));
        }

        debug!(key = %key, bytes = written, "Completed multipart upload");
        Ok(written)
    }

    async fn abort(&self, key: &ObjectKey, upload_id: &str) {
        let aborted = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .upload_id(upload_id)
            .send()
            .await;

        if let Err(e) = aborted {
            warn!(key = %key, "Failed to abort multipart upload: {}", DisplayErrorContext(e));
        }
    }
}

#[async_trait]
impl IObjectStorage for S3ObjectStorage {
    #[tracing::instrument(skip(self, body), fields(key = %key))]
    async fn put_stream(
        &self,
        key: &ObjectKey,
        content_type: &str,
        mut body: ByteStream,
    ) -> Result<u64, StorageError> {
        // Buffer up to one part before deciding between a single put and multipart
        let mut buffer = BytesMut::new();
        while buffer.len() < PART_SIZE {
            match body.next().await {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                None => return self.put_single(key, content_type, buffer.freeze()).await,
            }
        }

        let first = buffer.split_to(PART_SIZE).freeze();
        let rest = futures::stream::iter([Ok(buffer.freeze())])
            .chain(body)
            .boxed();
        self.put_multipart(key, content_type, first, rest).await
    }

    async fn presign_get(&self, key: &ObjectKey, ttl: Duration) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| sdk_error("presign", e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning)
            .await
            .map_err(|e| sdk_error("presign get object", e))?;
        Ok(request.uri().to_string())
    }

    async fn list_keys(&self, continuation: Option<String>) -> Result<KeyPage, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| sdk_error("list objects", e))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(KeyPage { keys, next })
    }

    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        for batch in keys.chunks(DELETE_BATCH) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| sdk_error("delete objects", e))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| sdk_error("delete objects", e))?;

            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| sdk_error("delete objects", e))?;

            for failed in output.errors() {
                warn!(
                    key = failed.key().unwrap_or_default(),
                    "Object deletion failed: {}",
                    failed.message().unwrap_or_default()
                );
            }
        }
        Ok(())
    }
}
