//! Database module for wallet-pulse
//!
//! Manages the PostgreSQL connection pool and applies the schema at startup.
//! Row-level operations live behind the [`crate::store::Store`] trait.

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Type alias for the PostgreSQL connection pool
pub type DbPool = Pool<Postgres>;

/// Initialize the database connection pool
pub async fn init_pool(database_url: &str, config: &DatabaseConfig) -> AppResult<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Database pool initialized"
    );

    Ok(pool)
}

/// Apply the schema from `database/schema.sql`
///
/// Statements are idempotent (`IF NOT EXISTS`), so re-applying against an
/// existing database is safe.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let schema_path = Path::new("database/schema.sql");

    if !schema_path.exists() {
        warn!(path = %schema_path.display(), "Schema file not found, skipping migrations");
        return Ok(());
    }

    let schema = std::fs::read_to_string(schema_path)
        .map_err(|e| AppError::Internal(format!("Failed to read schema file: {}", e)))?;

    for statement in schema.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() || stmt.starts_with("--") {
            continue;
        }

        sqlx::query(stmt).execute(pool).await?;
    }

    info!("Database schema applied");
    Ok(())
}
