//! Store implementations: Postgres for deployments, in-memory for development and tests

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, MemoryUnitOfWork};

use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::domain::auth::{ITokenRepository, IUserRepository};
use crate::domain::jar::{IJarRepository, IScrollRepository};
use crate::domain::unit_of_work::IUnitOfWorkFactory;

/// Every store handle the application layer consumes
#[derive(Clone)]
pub struct Persistence {
    pub jars: Arc<dyn IJarRepository>,
    pub scrolls: Arc<dyn IScrollRepository>,
    pub users: Arc<dyn IUserRepository>,
    pub tokens: Arc<dyn ITokenRepository>,
    pub units: Arc<dyn IUnitOfWorkFactory>,
}

impl Persistence {
    /// Open the configured backend, running migrations when asked to
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        match config.backend {
            DatabaseBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Ok(Self::memory(MemoryStore::new()))
            }
            DatabaseBackend::Postgres => {
                let pool = postgres::connect(config).await?;
                if config.run_migrations {
                    postgres::run_migrations(&pool).await?;
                }
                Ok(Self::postgres(Arc::new(pool), config))
            }
        }
    }

    pub fn postgres(pool: Arc<sqlx::PgPool>, config: &DatabaseConfig) -> Self {
        let timeout = config.store_timeout();
        Self {
            jars: Arc::new(postgres::PgJarRepository::new(pool.clone(), timeout)),
            scrolls: Arc::new(postgres::PgScrollRepository::new(pool.clone(), timeout)),
            users: Arc::new(postgres::PgUserRepository::new(pool.clone(), timeout)),
            tokens: Arc::new(postgres::PgTokenRepository::new(pool.clone(), timeout)),
            units: Arc::new(postgres::PgUnitOfWorkFactory::new(pool, timeout)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            jars: store.clone(),
            scrolls: store.clone(),
            users: store.clone(),
            tokens: store.clone(),
            units: store,
        }
    }
}
