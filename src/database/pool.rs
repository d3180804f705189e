use crate::config::DatabaseConfig;
use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;

/// Errors that can occur when working with the database
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create database pool: {0}")]
    PoolCreation(sqlx::Error),

    #[error("Database query error: {0}")]
    QueryError(sqlx::Error),

    #[error("Database connection timeout")]
    ConnectionTimeout,

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::QueryError(err)
    }
}

/// Database wrapper that holds the connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get ownership of the pool (useful for passing to repositories)
    pub fn into_pool(self) -> PgPool {
        self.pool
    }

    /// Check that the database answers a trivial query
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(DatabaseError::QueryError)
    }
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(config.test_before_acquire)
}

fn connect_error(err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::PoolTimedOut => DatabaseError::ConnectionTimeout,
        other => DatabaseError::PoolCreation(other),
    }
}

/// Create a PostgreSQL connection pool and verify it with a round trip
///
/// # Arguments
/// * `config` - Database configuration
///
/// # Returns
/// * `Ok(PgPool)` - Connected pool
/// * `Err(DatabaseError)` - Connection failed or timed out
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let pool = pool_options(config)
        .connect(&config.url)
        .await
        .map_err(connect_error)?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(connect_error)?;

    Ok(pool)
}

/// Create a pool that connects on first use
///
/// Only the URL is validated here, which lets the HTTP layer be exercised
/// without a running database.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    pool_options(config)
        .connect_lazy(&config.url)
        .map_err(DatabaseError::PoolCreation)
}

/// Run database migrations
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `migrations_path` - Path to migrations directory (default: "./migrations")
///
/// # Returns
/// * `Ok(())` - Migrations completed successfully
/// * `Err(DatabaseError)` - Migration error
pub async fn run_migrations(
    pool: &PgPool,
    migrations_path: Option<&str>,
) -> Result<(), DatabaseError> {
    let path = migrations_path.unwrap_or("./migrations");
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(path))
        .await
        .map_err(DatabaseError::Migration)?;

    migrator.run(pool).await.map_err(DatabaseError::Migration)?;

    Ok(())
}