//! Postgres backing for the document store.
//!
//! Each collection lives in its own JSONB table created by `migrations/`.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;
use crate::store::COLLECTION_NAMES;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("DATABASE_URL is not configured")]
    NotConfigured,

    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Collection table missing after migrations: {0}")]
    MissingCollection(&'static str),
}

/// Open a pool against `DATABASE_URL`
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    let url = config.database_url.as_deref().ok_or(DbError::NotConfigured)?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Connecting to document database at {}",
        config.database_url_masked()
    );

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))
}

/// Apply pending migrations, then make sure every collection has its table.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    for &collection in COLLECTION_NAMES {
        let exists: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(collection)
            .fetch_one(pool)
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;
        if exists.is_none() {
            return Err(DbError::MissingCollection(collection));
        }
    }

    tracing::info!(collections = COLLECTION_NAMES.len(), "Document tables ready");
    Ok(())
}
