use anyhow::Result;
use libsql::Connection;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
///
/// This is the single source of truth for the database schema.
pub async fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Initial schema").await?;
    }

    tracing::info!("Database migrations completed successfully (now at version {})", SCHEMA_VERSION);
    Ok(())
}

async fn get_current_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: networks, block_snapshots, halt_events and network_status
async fn run_migration_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS networks (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            expected_block_time INTEGER NOT NULL,
            halt_threshold INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    // Append-only, one row per successful fetch
    conn.execute(
        "CREATE TABLE IF NOT EXISTS block_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            network_id TEXT NOT NULL REFERENCES networks(id),
            block_number INTEGER NOT NULL,
            block_timestamp INTEGER NOT NULL,
            source TEXT NOT NULL,
            recorded_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS halt_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            network_id TEXT NOT NULL REFERENCES networks(id),
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            duration_seconds INTEGER,
            severity TEXT NOT NULL
        )",
        (),
    )
    .await?;

    // One live row per network, upserted every cycle
    conn.execute(
        "CREATE TABLE IF NOT EXISTS network_status (
            network_id TEXT PRIMARY KEY REFERENCES networks(id),
            status TEXT NOT NULL,
            latest_block_number INTEGER,
            latest_block_timestamp INTEGER,
            primary_source_status TEXT,
            secondary_source_status TEXT,
            tertiary_source_status TEXT,
            primary_source_name TEXT,
            secondary_source_name TEXT,
            tertiary_source_name TEXT,
            uptime_percent_24h REAL,
            uptime_percent_7d REAL,
            uptime_percent_30d REAL,
            last_checked_at INTEGER,
            updated_at INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_block_snapshots_network_recorded ON block_snapshots(network_id, recorded_at DESC)",
        (),
    )
    .await?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_halt_events_network_started ON halt_events(network_id, started_at DESC)",
        (),
    )
    .await?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_halt_events_ended_at ON halt_events(ended_at)", ()).await?;

    // At most one open incident per network
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_halt_events_one_open ON halt_events(network_id) WHERE ended_at IS NULL",
        (),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("migrations.db");
        let db = libsql::Builder::new_local(path.to_string_lossy().to_string()).build().await?;
        let conn = db.connect()?;

        run_migrations(&conn).await?;
        run_migrations(&conn).await?;

        assert_eq!(get_current_version(&conn).await?, SCHEMA_VERSION);

        let mut rows = conn.query("SELECT COUNT(*) FROM schema_migrations", ()).await?;
        let row = rows.next().await?.expect("count row");
        assert_eq!(row.get::<i64>(0)?, 1);

        conn.execute(
            "INSERT INTO networks (id, name, expected_block_time, halt_threshold, created_at) VALUES ('bitcoin', 'Bitcoin', 600, 3600, 0)",
            (),
        )
        .await?;
        conn.execute(
            "INSERT INTO network_status (network_id, status, primary_source_name, updated_at) VALUES ('bitcoin', 'unknown', 'Blockstream', 0)",
            (),
        )
        .await?;
        Ok(())
    }
}
