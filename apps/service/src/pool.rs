use std::time::Duration;

use anyhow::{Context, Result};
use deadpool::managed::{self, Pool, RecycleError, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};

use crate::config::DatabaseConfig;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LibsqlManager {
    database: Database,
    local: bool,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database, local: true }
    }

    /// Manager for a remote database, skips local-only connection pragmas
    pub fn remote(database: Database) -> Self {
        Self { database, local: false }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.database.connect()?;
        if self.local {
            // Pooled connections write concurrently, wait for the lock instead of failing
            conn.query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT.as_millis()), ()).await?;
        }
        Ok(conn)
    }

    async fn recycle(&self, conn: &mut Self::Type, _: &managed::Metrics) -> RecycleResult<Self::Error> {
        let mut rows = conn.query("SELECT 1", ()).await?;
        match rows.next().await? {
            Some(_) => Ok(()),
            None => Err(RecycleError::Message("Connection health check returned no rows".into())),
        }
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open the configured database and wrap it in a connection pool.
///
/// A remote `url` takes precedence over the local `path`.
pub async fn open_pool(config: &DatabaseConfig) -> Result<LibsqlPool> {
    let manager = match &config.url {
        Some(url) => {
            let token = match &config.auth_token_env {
                Some(var) => std::env::var(var).with_context(|| format!("{} is not set", var))?,
                None => String::new(),
            };
            tracing::info!("Connecting to remote database at {}", url);
            LibsqlManager::remote(libsql::Builder::new_remote(url.clone(), token).build().await?)
        }
        None => {
            tracing::info!("Opening local database at {}", config.path);
            LibsqlManager::new(libsql::Builder::new_local(&config.path).build().await?)
        }
    };

    let pool = Pool::builder(manager).max_size(config.max_connections).build()?;
    Ok(pool)
}
