//! Streaming validation of uploaded scroll content
//!
//! Counts bytes against the upload ceiling and checks UTF-8 as chunks pass
//! through, carrying an incomplete trailing code point into the next chunk.
//! The first violation ends the stream with an error.

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;

use crate::domain::storage::{ByteStream, StorageError};

/// Longest prefix of a code point that can be split off a chunk boundary
const MAX_UTF8_CARRY: usize = 3;

#[derive(Debug)]
struct ContentValidator {
    limit: u64,
    seen: u64,
    carry: Vec<u8>,
}

impl ContentValidator {
    fn new(limit: u64) -> Self {
        Self {
            limit,
            seen: 0,
            carry: Vec::new(),
        }
    }

    fn check_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.seen += chunk.len() as u64;
        if self.seen > self.limit {
            return Err(StorageError::PayloadTooLarge { limit: self.limit });
        }

        if self.carry.is_empty() {
            self.check_utf8(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.carry);
            joined.extend_from_slice(chunk);
            self.check_utf8(&joined)
        }
    }

    fn check_utf8(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        match std::str::from_utf8(bytes) {
            Ok(_) => Ok(()),
            // Truncated code point at the end of the chunk
            Err(e) if e.error_len().is_none() => {
                let tail = &bytes[e.valid_up_to()..];
                if tail.len() > MAX_UTF8_CARRY {
                    return Err(StorageError::InvalidUtf8);
                }
                self.carry = tail.to_vec();
                Ok(())
            }
            Err(_) => Err(StorageError::InvalidUtf8),
        }
    }

    fn finish(&self) -> Result<(), StorageError> {
        if self.carry.is_empty() {
            Ok(())
        } else {
            Err(StorageError::InvalidUtf8)
        }
    }
}

struct State {
    body: ByteStream,
    validator: ContentValidator,
    done: bool,
}

/// Wrap `body` so it fails with `PayloadTooLarge` past `limit` bytes and with
/// `InvalidUtf8` on malformed text
pub fn validate_content(body: ByteStream, limit: u64) -> ByteStream {
    let state = State {
        body,
        validator: ContentValidator::new(limit),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        let item = match state.body.next().await {
            Some(Ok(chunk)) => state.validator.check_chunk(&chunk).map(|_| chunk),
            Some(Err(e)) => Err(e),
            None => {
                state.done = true;
                return state.validator.finish().err().map(|e| (Err(e), state));
            }
        };

        if item.is_err() {
            state.done = true;
        }
        Some((item, state))
    })
    .boxed()
}

/// Single-chunk body, mostly for tests and small in-memory payloads
pub fn body_from_bytes(bytes: impl Into<Bytes>) -> ByteStream {
    stream::iter([Ok(bytes.into())]).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn chunked(chunks: Vec<&'static [u8]>) -> ByteStream {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c)))).boxed()
    }

    async fn drain(body: ByteStream) -> Result<Vec<u8>, StorageError> {
        body.try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
    }

    #[tokio::test]
    async fn test_valid_text_passes_through() {
        let body = validate_content(chunked(vec![&b"hello "[..], &b"world"[..]]), 64);
        assert_eq!(drain(body).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_code_point_split_across_chunks() {
        // "é" is 0xC3 0xA9; "€" is 0xE2 0x82 0xAC
        let body = validate_content(
            chunked(vec![&b"caf\xC3"[..], &b"\xA9 "[..], &b"\xE2"[..], &b"\x82"[..], &b"\xAC"[..]]),
            64,
        );
        assert_eq!(drain(body).await.unwrap(), "café €".as_bytes());
    }

    #[tokio::test]
    async fn test_truncated_code_point_at_end() {
        let body = validate_content(chunked(vec![&b"abc\xE2\x82"[..]]), 64);
        assert_eq!(drain(body).await, Err(StorageError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_invalid_byte_rejected() {
        let body = validate_content(chunked(vec![&b"ok"[..], &b"\xFF\xFE"[..]]), 64);
        assert_eq!(drain(body).await, Err(StorageError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_ceiling_enforced() {
        let body = validate_content(chunked(vec![&b"12345"[..], &b"678"[..]]), 6);
        assert_eq!(
            drain(body).await,
            Err(StorageError::PayloadTooLarge { limit: 6 })
        );
    }

    #[tokio::test]
    async fn test_exactly_at_ceiling() {
        let body = validate_content(chunked(vec![&b"123"[..], &b"456"[..]]), 6);
        assert_eq!(drain(body).await.unwrap().len(), 6);
    }
}
