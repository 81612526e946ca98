//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use scrolljar_core::application::{
    AuthTokens, CreateJarCommand, CreateJarResult, IssuedScroll, RegisterUserCommand, ScrollDraft,
    ScrollView, UpdateScrollCommand, UploadScrollResult,
};
use scrolljar_core::domain::auth::{IssuedToken, User};
use scrolljar_core::domain::jar::{Jar, JarAccess, Scroll, ScrollState};
use scrolljar_core::domain::store::Version;

/// Error response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    #[schema(example = "EDIT_CONFLICT")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "The resource was modified concurrently. Re-fetch and retry.")]
    pub message: String,

    /// Additional error context; withheld in production except for field errors
    #[schema(example = r#"{"fields": [{"field": ["scrolls", "0", "title"], "message": "must not be more than 255 characters long"}]}"#)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Unique request identifier, also present in the request logs
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub request_id: Uuid,

    #[schema(example = "2026-01-15T10:30:00Z")]
    pub timestamp: DateTime<Utc>,
}

/// Liveness response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    #[schema(example = "running")]
    pub status: String,
    #[schema(example = 3600)]
    pub uptime_seconds: u64,
    #[schema(example = "dev")]
    pub environment: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Jars and scrolls
// ============================================================================

/// Who may read a jar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccessDto {
    #[default]
    Public,
    /// Readers must send `X-Paste-Password`
    Private,
}

impl From<AccessDto> for JarAccess {
    fn from(access: AccessDto) -> Self {
        match access {
            AccessDto::Public => JarAccess::Public,
            AccessDto::Private => JarAccess::Private,
        }
    }
}

impl From<JarAccess> for AccessDto {
    fn from(access: JarAccess) -> Self {
        match access {
            JarAccess::Public => AccessDto::Public,
            JarAccess::Private => AccessDto::Private,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ScrollDraftRequest {
    #[schema(example = "main.rs")]
    pub title: Option<String>,
    #[schema(example = "rust")]
    pub format: Option<String>,
}

impl From<ScrollDraftRequest> for ScrollDraft {
    fn from(request: ScrollDraftRequest) -> Self {
        ScrollDraft {
            title: request.title,
            format: request.format,
        }
    }
}

/// Request model for jar creation
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateJarRequest {
    #[serde(default)]
    #[schema(example = "snippets")]
    pub name: String,
    #[serde(default)]
    pub access: AccessDto,
    /// Required for private jars
    pub password: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Lifetime in seconds
    #[schema(example = 86400)]
    pub expiry: Option<i64>,
    #[serde(default)]
    pub scrolls: Vec<ScrollDraftRequest>,
}

impl From<CreateJarRequest> for CreateJarCommand {
    fn from(request: CreateJarRequest) -> Self {
        CreateJarCommand {
            name: request.name,
            access: request.access.into(),
            password: request.password,
            tags: request.tags,
            expiry_seconds: request.expiry,
            scrolls: request.scrolls.into_iter().map(ScrollDraft::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JarResponse {
    #[schema(example = "4fZq9LmT")]
    pub id: String,
    #[schema(example = "https://scrolljar.com/jar/4fZq9LmT")]
    pub uri: String,
    pub name: String,
    pub access: AccessDto,
    pub tags: Vec<String>,
    pub owner_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Version stamp for conditional updates
    pub version: DateTime<Utc>,
}

impl JarResponse {
    pub fn new(jar: Jar, base_url: &str) -> Self {
        Self {
            uri: format!("{}/jar/{}", base_url, jar.id),
            id: jar.id.to_string(),
            name: jar.name,
            access: jar.access.into(),
            tags: jar.tags,
            owner_id: jar.owner.map(|id| id.as_i64()),
            expires_at: jar.expires_at,
            created_at: jar.created_at,
            version: jar.version.as_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JarListResponse {
    pub jars: Vec<JarResponse>,
}

impl JarListResponse {
    pub fn new(jars: Vec<Jar>, base_url: &str) -> Self {
        Self {
            jars: jars
                .into_iter()
                .map(|jar| JarResponse::new(jar, base_url))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollStateDto {
    /// Waiting for its content upload
    Created,
    Delivered,
}

impl From<ScrollState> for ScrollStateDto {
    fn from(state: ScrollState) -> Self {
        match state {
            ScrollState::Created => ScrollStateDto::Created,
            ScrollState::Delivered => ScrollStateDto::Delivered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScrollResponse {
    #[schema(example = "Qx81bTzc")]
    pub id: String,
    pub jar_id: String,
    #[schema(example = "https://scrolljar.com/scroll/Qx81bTzc")]
    pub uri: String,
    pub title: Option<String>,
    pub format: Option<String>,
    pub state: ScrollStateDto,
    pub created_at: DateTime<Utc>,
    /// Version stamp; send it back as `version` when updating
    pub version: DateTime<Utc>,
}

impl ScrollResponse {
    pub fn new(scroll: Scroll, base_url: &str) -> Self {
        Self {
            uri: format!("{}/scroll/{}", base_url, scroll.id),
            id: scroll.id.to_string(),
            jar_id: scroll.jar_id.to_string(),
            title: scroll.title,
            format: scroll.format,
            state: scroll.state.into(),
            created_at: scroll.created_at,
            version: scroll.version.as_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScrollListResponse {
    pub scrolls: Vec<ScrollResponse>,
}

impl ScrollListResponse {
    pub fn new(scrolls: Vec<Scroll>, base_url: &str) -> Self {
        Self {
            scrolls: scrolls
                .into_iter()
                .map(|scroll| ScrollResponse::new(scroll, base_url))
                .collect(),
        }
    }
}

/// A created scroll with the capability for its content upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedScrollResponse {
    pub scroll: ScrollResponse,
    /// Send as `X-Upload-Token` to `POST /v1/scroll/{id}`
    pub upload_token: String,
}

impl IssuedScrollResponse {
    pub fn new(issued: IssuedScroll, base_url: &str) -> Self {
        Self {
            scroll: ScrollResponse::new(issued.scroll, base_url),
            upload_token: issued.upload_token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateJarResponse {
    pub jar: JarResponse,
    pub scrolls: Vec<IssuedScrollResponse>,
}

impl CreateJarResponse {
    pub fn new(result: CreateJarResult, base_url: &str) -> Self {
        Self {
            jar: JarResponse::new(result.jar, base_url),
            scrolls: result
                .scrolls
                .into_iter()
                .map(|issued| IssuedScrollResponse::new(issued, base_url))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScrollContentResponse {
    pub scroll: ScrollResponse,
    /// Time-limited direct download URL
    pub fetch_url: String,
}

impl ScrollContentResponse {
    pub fn new(view: ScrollView, base_url: &str) -> Self {
        Self {
            scroll: ScrollResponse::new(view.scroll, base_url),
            fetch_url: view.fetch_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub scroll: ScrollResponse,
    pub bytes_written: u64,
    pub fetch_url: String,
}

impl UploadResponse {
    pub fn new(result: UploadScrollResult, base_url: &str) -> Self {
        Self {
            scroll: ScrollResponse::new(result.scroll, base_url),
            bytes_written: result.bytes_written,
            fetch_url: result.fetch_url,
        }
    }
}

/// Conditional metadata edit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateScrollRequest {
    pub title: Option<String>,
    pub format: Option<String>,
    /// The `version` last read for this scroll
    pub version: DateTime<Utc>,
}

impl From<UpdateScrollRequest> for UpdateScrollCommand {
    fn from(request: UpdateScrollRequest) -> Self {
        UpdateScrollCommand {
            title: request.title,
            format: request.format,
            version: Version::from(request.version),
        }
    }
}

// ============================================================================
// Users and tokens
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "correct horse battery")]
    pub password: String,
}

impl From<RegisterRequest> for RegisterUserCommand {
    fn from(request: RegisterRequest) -> Self {
        RegisterUserCommand {
            username: request.username,
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.as_i64(),
            username: user.username,
            email: user.email.to_string(),
            activated: user.activated,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivateRequest {
    pub token: String,
}

/// Email and password, used by authentication and activation-token requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDto {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

impl From<IssuedToken> for TokenDto {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.plaintext,
            expiry: issued.token.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthTokensResponse {
    /// Send as `Authorization: Bearer <token>`
    pub authorization: TokenDto,
    pub refresh: TokenDto,
}

impl From<AuthTokens> for AuthTokensResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            authorization: tokens.authorization.into(),
            refresh: tokens.refresh.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivationTokenResponse {
    pub message: String,
    /// Expiry of the token sent by mail
    pub expiry: DateTime<Utc>,
}
