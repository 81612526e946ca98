//! Jar use cases

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::instrument;

use super::errors::ApplicationError;
use super::scrolls::{IssuedScroll, ScrollDraft, validate_draft};
use super::unit_of_work::finish;
use super::validation::Validator;
use crate::config::JarsConfig;
use crate::domain::auth::{Principal, UserId};
use crate::domain::jar::{IJarRepository, IScrollRepository, Jar, JarAccess, JarId, NewJar, NewScroll, Scroll};
use crate::domain::store::StoreError;
use crate::domain::unit_of_work::{IUnitOfWork, IUnitOfWorkFactory};
use crate::infrastructure::auth::{CapabilityTokenService, PasswordHasher};

const MAX_NAME_CHARS: usize = 255;
const MAX_TAGS: usize = 16;
const MAX_TAG_CHARS: usize = 64;
const MAX_JAR_PASSWORD_BYTES: usize = 72;

/// Input of jar creation
#[derive(Debug, Clone, Default)]
pub struct CreateJarCommand {
    pub name: String,
    pub access: JarAccess,
    pub password: Option<String>,
    pub tags: Vec<String>,
    /// Lifetime in seconds; anonymous jars get the configured default when absent
    pub expiry_seconds: Option<i64>,
    pub scrolls: Vec<ScrollDraft>,
}

#[derive(Debug, Clone)]
pub struct CreateJarResult {
    pub jar: Jar,
    pub scrolls: Vec<IssuedScroll>,
}

/// Parse a public jar id; malformed ids are reported as missing jars
pub(crate) fn parse_jar_id(raw: &str) -> Result<JarId, ApplicationError> {
    JarId::parse(raw).ok_or_else(|| ApplicationError::not_found("jar"))
}

/// The authenticated user behind `principal`
pub(crate) fn require_user(principal: &Principal) -> Result<UserId, ApplicationError> {
    principal
        .user()
        .map(|user| user.id)
        .ok_or(ApplicationError::AuthenticationRequired)
}

pub(crate) fn require_owner(jar: &Jar, user: &UserId) -> Result<(), ApplicationError> {
    if jar.is_owned_by(user) {
        Ok(())
    } else {
        Err(ApplicationError::Forbidden)
    }
}

/// Check the `X-Paste-Password` value against a private jar's hash
pub(crate) async fn unlock(
    hasher: &PasswordHasher,
    jar: &Jar,
    password: Option<String>,
) -> Result<(), ApplicationError> {
    if !jar.requires_password() {
        return Ok(());
    }

    let (Some(password), Some(hash)) = (password, jar.password_hash.clone()) else {
        return Err(ApplicationError::InvalidCredentials);
    };

    if hasher.verify(password, hash).await? {
        Ok(())
    } else {
        Err(ApplicationError::InvalidCredentials)
    }
}

fn validate_create_jar(
    command: &CreateJarCommand,
    anonymous: bool,
    config: &JarsConfig,
) -> Result<(), ApplicationError> {
    let mut v = Validator::new();

    v.check(
        command.name.chars().count() <= MAX_NAME_CHARS,
        "name",
        format!("must not be more than {MAX_NAME_CHARS} characters long"),
    );
    v.check(
        command.tags.len() <= MAX_TAGS,
        "tags",
        format!("must not contain more than {MAX_TAGS} tags"),
    );
    v.check(
        command
            .tags
            .iter()
            .all(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_CHARS),
        "tags",
        format!("each tag must be 1-{MAX_TAG_CHARS} characters long"),
    );

    match (command.access, command.password.as_deref()) {
        (JarAccess::Private, None) | (JarAccess::Private, Some("")) => {
            v.check(false, "password", "must be provided for a private jar")
        }
        (_, Some(password)) => v.check(
            password.len() <= MAX_JAR_PASSWORD_BYTES,
            "password",
            format!("must not be more than {MAX_JAR_PASSWORD_BYTES} bytes long"),
        ),
        _ => {}
    }

    if let Some(seconds) = command.expiry_seconds {
        v.check(seconds > 0, "expiry", "must be a positive number of seconds");
        if anonymous {
            v.check(
                TimeDelta::try_seconds(seconds).is_some_and(|d| d <= config.anonymous_expiry()),
                "expiry",
                format!(
                    "must not exceed {} days for anonymous jars",
                    config.anonymous_expiry_days
                ),
            );
        }
    }

    v.check(
        command.scrolls.len() <= config.max_scrolls_per_request,
        "scrolls",
        format!(
            "must not contain more than {} scrolls",
            config.max_scrolls_per_request
        ),
    );
    for (index, draft) in command.scrolls.iter().enumerate() {
        validate_draft(&mut v, &format!("scrolls.{index}"), draft);
    }

    v.finish()
}

fn resolve_expiry(
    anonymous: bool,
    expiry_seconds: Option<i64>,
    config: &JarsConfig,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match expiry_seconds.and_then(TimeDelta::try_seconds) {
        Some(lifetime) => Some(now + lifetime),
        None if anonymous => Some(now + config.anonymous_expiry()),
        None => None,
    }
}

/// Use case for creating a jar together with its initial scrolls.
///
/// The jar and every scroll are written in one unit of work; each created
/// scroll comes back with an upload capability bound to it.
pub struct CreateJarUseCase {
    units: Arc<dyn IUnitOfWorkFactory>,
    hasher: PasswordHasher,
    capabilities: Arc<CapabilityTokenService>,
    config: JarsConfig,
}

impl CreateJarUseCase {
    pub fn new(
        units: Arc<dyn IUnitOfWorkFactory>,
        hasher: PasswordHasher,
        capabilities: Arc<CapabilityTokenService>,
        config: JarsConfig,
    ) -> Self {
        Self {
            units,
            hasher,
            capabilities,
            config,
        }
    }

    #[instrument(skip(self, principal, command), fields(principal_id = %principal.capability_id(), scrolls = command.scrolls.len()))]
    pub async fn execute(
        &self,
        principal: &Principal,
        command: CreateJarCommand,
    ) -> Result<CreateJarResult, ApplicationError> {
        let anonymous = principal.is_anonymous();
        validate_create_jar(&command, anonymous, &self.config)?;

        // Hash before the transaction opens; it is the slow part
        let password_hash = match command.password.as_deref() {
            Some(password) if !password.is_empty() => {
                Some(self.hasher.hash(password.to_string()).await?)
            }
            _ => None,
        };

        let new_jar = NewJar {
            owner: principal.user().map(|user| user.id),
            name: command.name,
            access: command.access,
            password_hash,
            tags: command.tags,
            expires_at: resolve_expiry(anonymous, command.expiry_seconds, &self.config, Utc::now()),
        };

        let mut uow = self.units.begin().await?;
        let outcome = self
            .stage(uow.as_mut(), principal, &new_jar, &command.scrolls)
            .await;
        let result = finish(uow, outcome).await?;

        tracing::info!(jar_id = %result.jar.id, "Jar created");
        Ok(result)
    }

    async fn stage(
        &self,
        uow: &mut dyn IUnitOfWork,
        principal: &Principal,
        new_jar: &NewJar,
        drafts: &[ScrollDraft],
    ) -> Result<CreateJarResult, ApplicationError> {
        let jar = uow.insert_jar(new_jar).await?;

        let mut scrolls = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let scroll = uow
                .insert_scroll(&NewScroll {
                    jar_id: jar.id.clone(),
                    title: draft.title.clone(),
                    format: draft.format.clone(),
                })
                .await?;
            let upload_token =
                self.capabilities
                    .issue(&scroll.id, &jar.id, principal.capability_id())?;
            scrolls.push(IssuedScroll {
                scroll,
                upload_token,
            });
        }

        Ok(CreateJarResult { jar, scrolls })
    }
}

/// Use case for reading a jar
pub struct GetJarUseCase {
    jars: Arc<dyn IJarRepository>,
    hasher: PasswordHasher,
}

impl GetJarUseCase {
    pub fn new(jars: Arc<dyn IJarRepository>, hasher: PasswordHasher) -> Self {
        Self { jars, hasher }
    }

    #[instrument(skip(self, password))]
    pub async fn execute(&self, id: &str, password: Option<String>) -> Result<Jar, ApplicationError> {
        let id = parse_jar_id(id)?;
        let jar = self
            .jars
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("jar"))?;

        unlock(&self.hasher, &jar, password).await?;
        Ok(jar)
    }
}

/// Use case for listing the scrolls of a jar
pub struct ListJarScrollsUseCase {
    jars: Arc<dyn IJarRepository>,
    scrolls: Arc<dyn IScrollRepository>,
    hasher: PasswordHasher,
}

impl ListJarScrollsUseCase {
    pub fn new(
        jars: Arc<dyn IJarRepository>,
        scrolls: Arc<dyn IScrollRepository>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            jars,
            scrolls,
            hasher,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn execute(
        &self,
        id: &str,
        password: Option<String>,
    ) -> Result<Vec<Scroll>, ApplicationError> {
        let id = parse_jar_id(id)?;
        let jar = self
            .jars
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("jar"))?;

        unlock(&self.hasher, &jar, password).await?;
        Ok(self.scrolls.list_by_jar(&jar.id).await?)
    }
}

/// Use case for deleting a jar and its scrolls. Owner only.
pub struct DeleteJarUseCase {
    jars: Arc<dyn IJarRepository>,
}

impl DeleteJarUseCase {
    pub fn new(jars: Arc<dyn IJarRepository>) -> Self {
        Self { jars }
    }

    #[instrument(skip(self, principal))]
    pub async fn execute(&self, principal: &Principal, id: &str) -> Result<(), ApplicationError> {
        let user = require_user(principal)?;
        let id = parse_jar_id(id)?;
        let jar = self
            .jars
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("jar"))?;
        require_owner(&jar, &user)?;

        self.jars.delete(&jar.id).await.map_err(|e| match e {
            StoreError::NotFound => ApplicationError::not_found("jar"),
            other => other.into(),
        })?;

        tracing::info!(jar_id = %jar.id, user_id = %user, "Jar deleted");
        Ok(())
    }
}

/// Use case for listing the caller's own jars
pub struct ListUserJarsUseCase {
    jars: Arc<dyn IJarRepository>,
}

impl ListUserJarsUseCase {
    pub fn new(jars: Arc<dyn IJarRepository>) -> Self {
        Self { jars }
    }

    #[instrument(skip(self, principal))]
    pub async fn execute(&self, principal: &Principal) -> Result<Vec<Jar>, ApplicationError> {
        let user = require_user(principal)?;
        Ok(self.jars.list_by_owner(&user).await?)
    }
}
