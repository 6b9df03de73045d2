//! Connection pool for the shadow record tables.
//!
//! Term metadata traffic is short point queries and row-locked writes, so the
//! only knob exposed is the pool size. Timeouts come from
//! [`defaults`](termeta_core::defaults).

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use termeta_core::{defaults, DatabaseConfig, Error, Result};

/// Sizing for the shadow record pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::MAX_CONNECTIONS,
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self::new().max_connections(config.max_connections)
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the pool size. Zero is raised to one.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(defaults::IDLE_TIMEOUT_SECS))
            .max_lifetime(Duration::from_secs(defaults::MAX_LIFETIME_SECS))
    }
}

/// Connect with the default pool size.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Connect with an explicit pool size.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Shadow record pool connected"
    );
    Ok(pool)
}
