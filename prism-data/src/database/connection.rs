//! Database connection module for the PRISM application
//!
//! PostgreSQL is the only backend. The pool lives in a process-wide cell so
//! that repositories and health checks can reach it without threading it
//! through every constructor.

use std::env;
use std::time::Duration;

use once_cell::sync::OnceCell;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{error, info};

use super::migrations::run_postgres_migrations;

/// Global database pool used throughout the application
static DB_POOL: OnceCell<PgPool> = OnceCell::new();

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Driver-level error
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] sqlx::Error),

    /// Database pool already initialized
    #[error("Database pool is already initialized")]
    PoolAlreadyInitialized,

    /// Database pool not initialized
    #[error("Database pool is not initialized")]
    PoolNotInitialized,

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub connection_string: Option<String>,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// `DATABASE_URL` wins over `DB_CONNECTION`.
    pub fn from_env() -> Result<Self, DatabaseError> {
        let connection_string = env::var("DATABASE_URL")
            .or_else(|_| env::var("DB_CONNECTION"))
            .map_err(|_| DatabaseError::EnvVarNotFound("DATABASE_URL".to_string()))?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        info!(
            "Database configuration: max_connections={}, timeout={}s",
            max_connections, timeout_seconds
        );

        Ok(DatabaseConfig {
            connection_string: Some(connection_string),
            max_connections,
            timeout_seconds,
        })
    }
}

/// Connect the pool, run migrations and publish the pool globally
pub async fn initialize_database_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    if DB_POOL.get().is_some() {
        return Err(DatabaseError::PoolAlreadyInitialized);
    }

    let connection_string = config
        .connection_string
        .as_deref()
        .ok_or_else(|| DatabaseError::EnvVarNotFound("DATABASE_URL".to_string()))?;

    info!("Initializing PostgreSQL pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.timeout_seconds))
        .connect(connection_string)
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            DatabaseError::PostgresError(e)
        })?;

    run_postgres_migrations(&pool)
        .await
        .map_err(DatabaseError::MigrationError)?;

    DB_POOL
        .set(pool.clone())
        .map_err(|_| DatabaseError::PoolAlreadyInitialized)?;

    info!("PostgreSQL connection pool created successfully");
    Ok(pool)
}

/// Get the database connection pool
pub fn get_db_pool() -> Result<PgPool, DatabaseError> {
    DB_POOL.get().cloned().ok_or(DatabaseError::PoolNotInitialized)
}

/// Round-trip a trivial query to prove the database answers
pub async fn check_connection() -> Result<(), DatabaseError> {
    let pool = get_db_pool()?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(())
}

/// Get information about the current database connection
pub fn get_connection_info() -> Option<String> {
    let pool = DB_POOL.get()?;

    Some(format!(
        "PostgreSQL pool (size={}, idle={})",
        pool.size(),
        pool.num_idle()
    ))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert!(config.connection_string.is_none());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_pool_not_initialized() {
        assert!(matches!(get_db_pool(), Err(DatabaseError::PoolNotInitialized)));
        assert!(get_connection_info().is_none());
    }

    #[tokio::test]
    async fn test_initialize_without_url_fails() {
        let config = DatabaseConfig::default();
        let result = initialize_database_pool(&config).await;
        assert!(matches!(result, Err(DatabaseError::EnvVarNotFound(_))));
    }
}
