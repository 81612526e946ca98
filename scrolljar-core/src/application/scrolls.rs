//! Scroll use cases, including the capability-authorized content upload

use std::sync::Arc;
use tracing::instrument;

use super::errors::ApplicationError;
use super::jars::{parse_jar_id, require_owner, require_user, unlock};
use super::unit_of_work::finish;
use super::validation::Validator;
use crate::config::UploadConfig;
use crate::domain::auth::{Principal, PrincipalId, UserId};
use crate::domain::jar::{
    IJarRepository, IScrollRepository, Jar, JarId, NewScroll, ObjectKey, Scroll, ScrollId,
    ScrollState, ScrollUpdate,
};
use crate::domain::storage::{ByteStream, IObjectStorage, StorageError};
use crate::domain::store::{StoreError, Version};
use crate::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};
use crate::infrastructure::auth::{CapabilityTokenService, PasswordHasher};
use crate::infrastructure::storage::validate_content;

const MAX_TITLE_CHARS: usize = 255;
const MAX_FORMAT_CHARS: usize = 64;
const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Metadata of a scroll to create; content follows through the upload call
#[derive(Debug, Clone, Default)]
pub struct ScrollDraft {
    pub title: Option<String>,
    pub format: Option<String>,
}

/// A created scroll and the capability authorizing its upload
#[derive(Debug, Clone)]
pub struct IssuedScroll {
    pub scroll: Scroll,
    pub upload_token: String,
}

pub(crate) fn validate_draft(v: &mut Validator, prefix: &str, draft: &ScrollDraft) {
    check_metadata(v, prefix, draft.title.as_deref(), draft.format.as_deref());
}

fn check_metadata(v: &mut Validator, prefix: &str, title: Option<&str>, format: Option<&str>) {
    let key = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        }
    };

    if let Some(title) = title {
        v.check(
            title.chars().count() <= MAX_TITLE_CHARS,
            &key("title"),
            format!("must not be more than {MAX_TITLE_CHARS} characters long"),
        );
    }
    if let Some(format) = format {
        v.check(
            format.chars().count() <= MAX_FORMAT_CHARS,
            &key("format"),
            format!("must not be more than {MAX_FORMAT_CHARS} characters long"),
        );
    }
}

fn parse_scroll_id(raw: &str) -> Result<ScrollId, ApplicationError> {
    ScrollId::parse(raw).ok_or_else(|| ApplicationError::not_found("scroll"))
}

/// Look up a scroll and the jar holding it
async fn load_scroll(
    jars: &dyn IJarRepository,
    scrolls: &dyn IScrollRepository,
    id: &str,
) -> Result<(Scroll, Jar), ApplicationError> {
    let id = parse_scroll_id(id)?;
    let scroll = scrolls
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("scroll"))?;
    let jar = jars
        .find_by_id(&scroll.jar_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("scroll"))?;
    Ok((scroll, jar))
}

fn missing_scroll(error: StoreError) -> ApplicationError {
    match error {
        StoreError::NotFound => ApplicationError::not_found("scroll"),
        other => other.into(),
    }
}

/// Use case for adding a scroll to an existing jar. Owner only.
///
/// The ownership read runs inside the same unit of work as the insert.
pub struct CreateScrollUseCase {
    units: Arc<dyn IUnitOfWorkFactory>,
    capabilities: Arc<CapabilityTokenService>,
}

impl CreateScrollUseCase {
    pub fn new(
        units: Arc<dyn IUnitOfWorkFactory>,
        capabilities: Arc<CapabilityTokenService>,
    ) -> Self {
        Self {
            units,
            capabilities,
        }
    }

    #[instrument(skip(self, principal, draft))]
    pub async fn execute(
        &self,
        principal: &Principal,
        jar_id: &str,
        draft: ScrollDraft,
    ) -> Result<IssuedScroll, ApplicationError> {
        let user = require_user(principal)?;
        let jar_id = parse_jar_id(jar_id)?;

        let mut v = Validator::new();
        validate_draft(&mut v, "", &draft);
        v.finish()?;

        let mut uow = self.units.begin().await?;
        let outcome = self
            .stage(uow.as_mut(), principal, &user, &jar_id, draft)
            .await;
        let issued = finish(uow, outcome).await?;

        tracing::info!(jar_id = %issued.scroll.jar_id, scroll_id = %issued.scroll.id, "Scroll created");
        Ok(issued)
    }

    async fn stage(
        &self,
        uow: &mut dyn IUnitOfWork,
        principal: &Principal,
        user: &UserId,
        jar_id: &JarId,
        draft: ScrollDraft,
    ) -> Result<IssuedScroll, ApplicationError> {
        let jar = uow
            .find_jar(jar_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("jar"))?;
        require_owner(&jar, user)?;

        let scroll = uow
            .insert_scroll(&NewScroll {
                jar_id: jar.id.clone(),
                title: draft.title,
                format: draft.format,
            })
            .await?;
        let upload_token =
            self.capabilities
                .issue(&scroll.id, &jar.id, principal.capability_id())?;

        Ok(IssuedScroll {
            scroll,
            upload_token,
        })
    }
}

/// A delivered scroll with a time-limited download URL
#[derive(Debug, Clone)]
pub struct ScrollView {
    pub scroll: Scroll,
    pub fetch_url: String,
}

/// Use case for reading a delivered scroll
pub struct GetScrollUseCase {
    jars: Arc<dyn IJarRepository>,
    scrolls: Arc<dyn IScrollRepository>,
    storage: Arc<dyn IObjectStorage>,
    hasher: PasswordHasher,
    config: UploadConfig,
}

impl GetScrollUseCase {
    pub fn new(
        jars: Arc<dyn IJarRepository>,
        scrolls: Arc<dyn IScrollRepository>,
        storage: Arc<dyn IObjectStorage>,
        hasher: PasswordHasher,
        config: UploadConfig,
    ) -> Self {
        Self {
            jars,
            scrolls,
            storage,
            hasher,
            config,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn execute(
        &self,
        id: &str,
        password: Option<String>,
    ) -> Result<ScrollView, ApplicationError> {
        let (scroll, jar) = load_scroll(self.jars.as_ref(), self.scrolls.as_ref(), id).await?;

        // Undelivered scrolls have nothing to read yet
        if !scroll.state.is_delivered() {
            return Err(ApplicationError::not_found("scroll"));
        }
        unlock(&self.hasher, &jar, password).await?;

        let fetch_url = self
            .storage
            .presign_get(&scroll.object_key(), self.config.fetch_url_ttl())
            .await?;

        Ok(ScrollView { scroll, fetch_url })
    }
}

/// Metadata edit guarded by the version the client last read
#[derive(Debug, Clone)]
pub struct UpdateScrollCommand {
    pub title: Option<String>,
    pub format: Option<String>,
    pub version: Version,
}

/// Use case for editing scroll metadata. Owner only.
pub struct UpdateScrollUseCase {
    jars: Arc<dyn IJarRepository>,
    scrolls: Arc<dyn IScrollRepository>,
}

impl UpdateScrollUseCase {
    pub fn new(jars: Arc<dyn IJarRepository>, scrolls: Arc<dyn IScrollRepository>) -> Self {
        Self { jars, scrolls }
    }

    #[instrument(skip(self, principal, command), fields(expected = %command.version))]
    pub async fn execute(
        &self,
        principal: &Principal,
        id: &str,
        command: UpdateScrollCommand,
    ) -> Result<Scroll, ApplicationError> {
        let user = require_user(principal)?;

        let mut v = Validator::new();
        check_metadata(
            &mut v,
            "",
            command.title.as_deref(),
            command.format.as_deref(),
        );
        v.finish()?;

        let (mut scroll, jar) =
            load_scroll(self.jars.as_ref(), self.scrolls.as_ref(), id).await?;
        require_owner(&jar, &user)?;

        let update = ScrollUpdate {
            title: command.title,
            format: command.format,
        };
        let version = self
            .scrolls
            .update_metadata(&scroll.id, &update, command.version)
            .await?;

        if let Some(title) = update.title {
            scroll.title = Some(title);
        }
        if let Some(format) = update.format {
            scroll.format = Some(format);
        }
        scroll.version = version;

        tracing::info!(scroll_id = %scroll.id, version = %version, "Scroll updated");
        Ok(scroll)
    }
}

/// Use case for deleting a scroll. Owner only. The stored object is left
/// for the orphan cleaner.
pub struct DeleteScrollUseCase {
    jars: Arc<dyn IJarRepository>,
    scrolls: Arc<dyn IScrollRepository>,
}

impl DeleteScrollUseCase {
    pub fn new(jars: Arc<dyn IJarRepository>, scrolls: Arc<dyn IScrollRepository>) -> Self {
        Self { jars, scrolls }
    }

    #[instrument(skip(self, principal))]
    pub async fn execute(&self, principal: &Principal, id: &str) -> Result<(), ApplicationError> {
        let user = require_user(principal)?;
        let (scroll, jar) = load_scroll(self.jars.as_ref(), self.scrolls.as_ref(), id).await?;
        require_owner(&jar, &user)?;

        self.scrolls
            .delete(&scroll.id)
            .await
            .map_err(missing_scroll)?;

        tracing::info!(scroll_id = %scroll.id, "Scroll deleted");
        Ok(())
    }
}

/// Content upload authorized by an upload capability
pub struct UploadScrollCommand {
    /// Scroll id from the request path
    pub scroll_id: String,
    /// Raw `X-Upload-Token` value
    pub token: Option<String>,
    pub body: ByteStream,
}

#[derive(Debug, Clone)]
pub struct UploadScrollResult {
    pub scroll: Scroll,
    pub bytes_written: u64,
    pub fetch_url: String,
}

/// Use case for delivering scroll content.
///
/// The capability alone authorizes the call; the caller's own authentication
/// plays no part. The size ceiling follows the principal bound into the
/// capability when it was issued.
pub struct UploadScrollUseCase {
    scrolls: Arc<dyn IScrollRepository>,
    storage: Arc<dyn IObjectStorage>,
    capabilities: Arc<CapabilityTokenService>,
    config: UploadConfig,
}

impl UploadScrollUseCase {
    pub fn new(
        scrolls: Arc<dyn IScrollRepository>,
        storage: Arc<dyn IObjectStorage>,
        capabilities: Arc<CapabilityTokenService>,
        config: UploadConfig,
    ) -> Self {
        Self {
            scrolls,
            storage,
            capabilities,
            config,
        }
    }

    /// Byte ceiling for uploads authorized on behalf of `principal`
    pub fn ceiling_for(&self, principal: PrincipalId) -> u64 {
        if principal.is_anonymous() {
            self.config.anonymous_max_bytes
        } else {
            self.config.authenticated_max_bytes
        }
    }

    #[instrument(skip(self, command), fields(scroll_id = %command.scroll_id))]
    pub async fn execute(
        &self,
        command: UploadScrollCommand,
    ) -> Result<UploadScrollResult, ApplicationError> {
        let token = command.token.ok_or(ApplicationError::InvalidCapability)?;
        let capability = self.capabilities.verify(&token)?;

        if capability.scroll_id.as_str() != command.scroll_id {
            return Err(ApplicationError::InvalidCapability);
        }

        let scroll = self
            .scrolls
            .find_by_id(&capability.scroll_id)
            .await?
            .ok_or(ApplicationError::InvalidCapability)?;
        if scroll.jar_id != capability.jar_id {
            return Err(ApplicationError::InvalidCapability);
        }
        if scroll.state.is_delivered() {
            tracing::warn!(scroll_id = %scroll.id, "Upload replayed against delivered scroll");
            return Err(ApplicationError::AlreadyDelivered);
        }

        let limit = self.ceiling_for(capability.principal_id);
        let key = scroll.object_key();
        // Create-only: a concurrent upload that stored first wins the key
        let bytes_written = self
            .storage
            .put_stream(&key, CONTENT_TYPE, validate_content(command.body, limit))
            .await
            .inspect_err(|e| {
                if matches!(e, StorageError::AlreadyExists(_)) {
                    tracing::warn!(scroll_id = %scroll.id, "Concurrent upload already stored content");
                }
            })?;

        let version = match self.scrolls.mark_delivered(&scroll.id, scroll.version).await {
            Ok(version) => version,
            Err(e) => {
                self.discard(&key).await;
                return Err(e.into());
            }
        };

        let fetch_url = self
            .storage
            .presign_get(&key, self.config.fetch_url_ttl())
            .await?;

        tracing::info!(
            scroll_id = %scroll.id,
            principal_id = %capability.principal_id,
            bytes = bytes_written,
            "Scroll delivered"
        );

        let mut scroll = scroll;
        scroll.state = ScrollState::Delivered;
        scroll.version = version;

        Ok(UploadScrollResult {
            scroll,
            bytes_written,
            fetch_url,
        })
    }

    /// Remove content this upload stored but could not commit, so a retry can write the key
    async fn discard(&self, key: &ObjectKey) {
        if let Err(e) = self.storage.delete_objects(&[key.to_string()]).await {
            tracing::error!(key = %key, "Failed to remove uncommitted scroll content: {}", e);
        }
    }
}
