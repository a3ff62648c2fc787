use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Database pool not initialized")]
    NotInitialized,

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

// Process-scoped pool, created once at startup. The store owns all
// authoritative state; the service keeps nothing in memory beyond this.
static POOL: OnceLock<PgPool> = OnceLock::new();

/// Connect the pool from `DATABASE_URL` and run pending migrations.
///
/// Pool limits come from config: bounded concurrent connections, idle
/// reclamation and a connection-acquisition timeout.
pub async fn init() -> Result<&'static PgPool, DatabaseError> {
    let url =
        std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

    let db = &config::config().database;
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!(
        max_connections = db.max_connections,
        "database pool initialized"
    );
    Ok(POOL.get_or_init(|| pool))
}

/// Shared pool accessor for handlers and middleware.
pub fn pool() -> Result<&'static PgPool, DatabaseError> {
    POOL.get().ok_or(DatabaseError::NotInitialized)
}

/// Pings the store to confirm connectivity.
pub async fn health_check() -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool()?).await?;
    Ok(())
}

/// Begin a transaction on the shared pool.
///
/// The returned transaction commits explicitly and rolls back on drop, so
/// the connection goes back to the pool on every exit path, including
/// panics and abandoned requests.
pub async fn transaction() -> Result<Transaction<'static, Postgres>, DatabaseError> {
    Ok(pool()?.begin().await?)
}
