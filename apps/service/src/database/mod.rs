/// Persistence gateway
///
/// The monitoring engine only talks to the [`Database`] trait; the LibSQL
/// implementation stores block history, halt events and the published status.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::{DatabaseImpl, initialize_database};
    use crate::pool::{LibsqlManager, LibsqlPool};

    /// Fresh migrated database in a temporary directory.
    ///
    /// The directory must outlive the database, so it is handed back to the caller.
    pub async fn create_test_database() -> Result<(TempDir, Arc<DatabaseImpl>)> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("test.db");

        let db = libsql::Builder::new_local(db_path.to_string_lossy().to_string()).build().await?;
        let pool: LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db)).max_size(4).build()?;

        let conn = pool.get().await?;
        initialize_database(&conn).await?;
        drop(conn);

        Ok((temp_dir, Arc::new(DatabaseImpl::new_from_pool(pool))))
    }
}
