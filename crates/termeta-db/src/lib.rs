//! # termeta-db
//!
//! PostgreSQL storage for taxonomy term metadata.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgShadowRecordStore`], the `ShadowRecordStore` backed by two tables
//!   (`term_meta_record`, `term_meta_value`)
//! - Schema migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use termeta_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/termeta").await?;
//!     let records = Arc::new(db.records.clone());
//!     // hand `records` to a TermMetaStore
//!     Ok(())
//! }
//! ```
pub mod pool;
pub mod records;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use termeta_core::*;

pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use records::PgShadowRecordStore;

/// Database context holding the pool and the record store.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Shadow record store.
    pub records: PgShadowRecordStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            records: PgShadowRecordStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect using the database and record settings of a [`TermMetaConfig`].
    ///
    /// The configuration is validated before any connection is attempted.
    pub async fn from_config(config: &TermMetaConfig) -> Result<Self> {
        config.validate()?;
        let url = config
            .database
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("database url is not configured".to_string()))?;
        let pool = create_pool_with_config(url, PoolConfig::from(&config.database)).await?;
        let mut db = Self::new(pool);
        db.records = db.records.with_prefix(config.records.prefix.clone());
        Ok(db)
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        tracing::info!(
            subsystem = "db",
            component = "migrations",
            op = "migrate",
            "Term metadata schema is up to date"
        );
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
