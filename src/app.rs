//! Application setup and wiring

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use scrolljar_core::Config;
use scrolljar_core::application::MailDispatcher;
use scrolljar_core::domain::mailer::IMailer;
use scrolljar_core::domain::storage::IObjectStorage;
use scrolljar_core::infrastructure::rate_limiter::{RateLimiterService, SweeperHandle};
use scrolljar_core::infrastructure::{PasswordHasher, Persistence, mailer, storage};
use scrolljar_server::{AppState, create_router};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    /// Cancelled when the process starts shutting down
    pub shutdown_token: CancellationToken,
    /// Background work (mail delivery) drained on shutdown
    pub tracker: TaskTracker,
    pub sweeper: SweeperHandle,
    pub rate_limiter: Arc<RateLimiterService>,
}

impl AppHandle {
    /// Cancel background work, stop the sweeper and drain tracked tasks.
    ///
    /// Returns `false` when tasks were still running after `grace`.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.shutdown_token.cancel();
        self.sweeper.stop().await;

        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("Background tasks drained");
                true
            }
            Err(_) => {
                tracing::warn!(
                    pending = self.tracker.len(),
                    grace_secs = grace.as_secs(),
                    "Background tasks still running after the grace period"
                );
                false
            }
        }
    }
}

/// Store, object storage and mailer backends the application runs on
pub struct Backends {
    pub persistence: Persistence,
    pub storage: Arc<dyn IObjectStorage>,
    pub mailer: Arc<dyn IMailer>,
    pub hasher: PasswordHasher,
}

impl Backends {
    /// Backends selected by configuration
    pub async fn from_config(
        config: &Config,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let persistence = Persistence::connect(&config.database).await.map_err(|e| {
            tracing::error!("Failed to initialize the store: {}", e);
            e
        })?;
        let storage = storage::from_config(&config.storage, &config.server.base_url).await;
        let mailer = mailer::from_config(&config.mailer);

        Ok(Self {
            persistence,
            storage,
            mailer,
            hasher: PasswordHasher::new(),
        })
    }
}

/// Create the application router and return an AppHandle for shutdown coordination
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let backends = Backends::from_config(&config).await?;
    Ok(create_app_with(&config, backends))
}

/// Wire the application over explicit backends
pub fn create_app_with(config: &Config, backends: Backends) -> AppHandle {
    let shutdown_token = CancellationToken::new();
    let tracker = TaskTracker::new();

    let mail = MailDispatcher::new(backends.mailer, tracker.clone(), &config.mailer);
    let state = AppState::with_hasher(
        backends.persistence,
        backends.storage,
        mail,
        config,
        backends.hasher,
    );

    let rate_limiter = Arc::new(RateLimiterService::new(config.rate_limit.clone()));
    let sweeper = rate_limiter.start_sweeper(&shutdown_token);

    let router = create_router(state, rate_limiter.clone(), config);

    tracing::info!(
        env = %config.server.env,
        rate_limiting = rate_limiter.is_enabled(),
        docs = config.server.enable_docs,
        "Application initialized"
    );

    AppHandle {
        router,
        shutdown_token,
        tracker,
        sweeper,
        rate_limiter,
    }
}
