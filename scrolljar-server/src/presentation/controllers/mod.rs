//! HTTP handlers and the state they share

pub mod jars;
pub mod ping;
pub mod scrolls;
pub mod tokens;
pub mod users;

use std::sync::Arc;
use std::time::Instant;

use scrolljar_core::Config;
use scrolljar_core::application::{
    ActivateUserUseCase, AuthenticateUserUseCase, CreateActivationTokenUseCase, CreateJarUseCase,
    CreateScrollUseCase, DeleteJarUseCase, DeleteScrollUseCase, GetJarUseCase, GetScrollUseCase,
    ListJarScrollsUseCase, ListUserJarsUseCase, MailDispatcher, RegisterUserUseCase,
    ResolvePrincipalUseCase, UpdateScrollUseCase, UploadScrollUseCase,
};
use scrolljar_core::domain::storage::IObjectStorage;
use scrolljar_core::infrastructure::{
    CapabilityTokenService, PasswordHasher, Persistence, TokenGenerator,
};

/// Process facts reported by the ping endpoint
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub started_at: Instant,
    pub environment: String,
    pub version: String,
}

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    // Jars
    pub create_jar_use_case: Arc<CreateJarUseCase>,
    pub get_jar_use_case: Arc<GetJarUseCase>,
    pub list_jar_scrolls_use_case: Arc<ListJarScrollsUseCase>,
    pub delete_jar_use_case: Arc<DeleteJarUseCase>,
    pub list_user_jars_use_case: Arc<ListUserJarsUseCase>,

    // Scrolls
    pub create_scroll_use_case: Arc<CreateScrollUseCase>,
    pub get_scroll_use_case: Arc<GetScrollUseCase>,
    pub update_scroll_use_case: Arc<UpdateScrollUseCase>,
    pub delete_scroll_use_case: Arc<DeleteScrollUseCase>,
    pub upload_scroll_use_case: Arc<UploadScrollUseCase>,

    // Users and tokens
    pub register_user_use_case: Arc<RegisterUserUseCase>,
    pub activate_user_use_case: Arc<ActivateUserUseCase>,
    pub authenticate_user_use_case: Arc<AuthenticateUserUseCase>,
    pub create_activation_token_use_case: Arc<CreateActivationTokenUseCase>,
    pub resolve_principal_use_case: Arc<ResolvePrincipalUseCase>,

    /// Public base URL for resource links
    pub base_url: String,
    pub runtime: RuntimeInfo,
}

impl AppState {
    pub fn build(
        persistence: Persistence,
        storage: Arc<dyn IObjectStorage>,
        mail: MailDispatcher,
        config: &Config,
    ) -> Self {
        Self::with_hasher(persistence, storage, mail, config, PasswordHasher::new())
    }

    /// Same as [`AppState::build`] with explicit password hashing costs
    pub fn with_hasher(
        persistence: Persistence,
        storage: Arc<dyn IObjectStorage>,
        mail: MailDispatcher,
        config: &Config,
        hasher: PasswordHasher,
    ) -> Self {
        let Persistence {
            jars,
            scrolls,
            users,
            tokens,
            units,
        } = persistence;
        let capabilities = Arc::new(CapabilityTokenService::from_config(&config.auth));
        let generator = TokenGenerator::new();

        Self {
            create_jar_use_case: Arc::new(CreateJarUseCase::new(
                units.clone(),
                hasher.clone(),
                capabilities.clone(),
                config.jars.clone(),
            )),
            get_jar_use_case: Arc::new(GetJarUseCase::new(jars.clone(), hasher.clone())),
            list_jar_scrolls_use_case: Arc::new(ListJarScrollsUseCase::new(
                jars.clone(),
                scrolls.clone(),
                hasher.clone(),
            )),
            delete_jar_use_case: Arc::new(DeleteJarUseCase::new(jars.clone())),
            list_user_jars_use_case: Arc::new(ListUserJarsUseCase::new(jars.clone())),

            create_scroll_use_case: Arc::new(CreateScrollUseCase::new(
                units.clone(),
                capabilities.clone(),
            )),
            get_scroll_use_case: Arc::new(GetScrollUseCase::new(
                jars.clone(),
                scrolls.clone(),
                storage.clone(),
                hasher.clone(),
                config.upload.clone(),
            )),
            update_scroll_use_case: Arc::new(UpdateScrollUseCase::new(
                jars.clone(),
                scrolls.clone(),
            )),
            delete_scroll_use_case: Arc::new(DeleteScrollUseCase::new(jars, scrolls.clone())),
            upload_scroll_use_case: Arc::new(UploadScrollUseCase::new(
                scrolls,
                storage,
                capabilities,
                config.upload.clone(),
            )),

            register_user_use_case: Arc::new(RegisterUserUseCase::new(
                units.clone(),
                hasher.clone(),
                generator.clone(),
                mail.clone(),
                config.auth.clone(),
            )),
            activate_user_use_case: Arc::new(ActivateUserUseCase::new(
                units.clone(),
                generator.clone(),
            )),
            authenticate_user_use_case: Arc::new(AuthenticateUserUseCase::new(
                users.clone(),
                units,
                hasher.clone(),
                generator.clone(),
                config.auth.clone(),
            )),
            create_activation_token_use_case: Arc::new(CreateActivationTokenUseCase::new(
                users,
                tokens.clone(),
                hasher,
                generator.clone(),
                mail,
                config.auth.clone(),
            )),
            resolve_principal_use_case: Arc::new(ResolvePrincipalUseCase::new(tokens, generator)),

            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            runtime: RuntimeInfo {
                started_at: Instant::now(),
                environment: config.server.env.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}
