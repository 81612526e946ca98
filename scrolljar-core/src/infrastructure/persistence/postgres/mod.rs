//! Postgres-backed repositories and unit of work (sqlx)
//!
//! Every statement runs under the configured store timeout. Conflict
//! detection is the `updated_at` compare-and-write of each update statement;
//! no explicit row locks are taken.

mod jar_repository;
mod rows;
mod scroll_repository;
mod statements;
mod token_repository;
mod unit_of_work;
mod user_repository;

pub use jar_repository::PgJarRepository;
pub use scroll_repository::PgScrollRepository;
pub use token_repository::PgTokenRepository;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};
pub use user_repository::PgUserRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::future::Future;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::domain::store::StoreError;

/// Open the connection pool described by `config`
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        "Initializing PostgreSQL database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_idle.unwrap_or(0))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
        .connect(&config.url)
        .await
}

/// Apply the migrations shipped with this crate
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}

/// Run one store call, failing with `StoreError::Timeout` once `limit` elapses
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout(limit))
        }
    }
}

pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolTimedOut => {
            tracing::error!("Timed out acquiring a database connection");
            StoreError::backend("connection pool exhausted")
        }
        other => {
            if let Some(db_err) = other.as_database_error()
                && db_err.is_unique_violation()
            {
                return StoreError::Duplicate {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }

            tracing::error!("Database error: {}", other);
            StoreError::backend(other)
        }
    }
}
