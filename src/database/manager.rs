use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::repository::Store;
use crate::filter::FilterError;

/// Errors raised by the storage drivers
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Transaction already finished")]
    TransactionClosed,

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify constraint violations reported by Postgres
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23505") => return DatabaseError::UniqueViolation(db.message().to_string()),
                Some("23503") => return DatabaseError::ForeignKeyViolation(db.message().to_string()),
                _ => {}
            }
        }
        DatabaseError::Sqlx(err)
    }
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Builds the configured storage driver
pub struct DatabaseManager;

impl DatabaseManager {
    /// `memory://` selects the in-process driver, anything else is treated as a Postgres URL
    pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
        if config.is_memory() {
            info!("Using in-memory database");
            return Ok(Arc::new(MemoryStore::new()));
        }
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        if !(config.url.starts_with("postgres://") || config.url.starts_with("postgresql://")) {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;
        info!("Created database pool (max {} connections)", config.max_connections);

        if config.run_migrations {
            Self::migrate(&pool).await?;
        }
        Ok(Arc::new(PgStore::new(pool)))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}
