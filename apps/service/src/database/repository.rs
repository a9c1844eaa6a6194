use anyhow::{Result, anyhow};
use async_trait::async_trait;
use libsql::{Row, params};

use super::models::{HaltEvent, NetworkStatusSnapshot};
use crate::monitoring::types::{BlockObservation, ChainStatus, HaltSeverity, NetworkConfig, Source};
use crate::pool::LibsqlPool;

/// Persistence gateway used by the monitoring engine
///
/// Every write is either an append-only insert or a single-row update keyed by
/// identity, so an abandoned cycle never leaves partial state behind.
#[async_trait]
pub trait Database: Send + Sync {
    /// Store a network's reference data and an initial `unknown` status row.
    ///
    /// Returns `true` when the network was not known before.
    async fn register_network(&self, config: &NetworkConfig) -> Result<bool>;

    /// The single open halt event of a network, if any
    async fn get_open_halt_event(&self, network_id: &str) -> Result<Option<HaltEvent>>;

    /// Open a new halt event and return its id
    async fn create_halt_event(&self, network_id: &str, severity: HaltSeverity, started_at: i64) -> Result<i64>;

    /// Rewrite the severity of an event while it stays open
    async fn update_halt_event_severity(&self, id: i64, severity: HaltSeverity) -> Result<()>;

    /// Close an event
    async fn close_halt_event(&self, id: i64, ended_at: i64, duration_seconds: i64) -> Result<()>;

    /// Events still open or ending after `window_start`
    async fn get_halt_events_overlapping(&self, network_id: &str, window_start: i64) -> Result<Vec<HaltEvent>>;

    /// Most recent events first
    async fn get_recent_halt_events(&self, network_id: &str, limit: usize) -> Result<Vec<HaltEvent>>;

    /// Remove every halt event, returns the number deleted
    async fn delete_all_halt_events(&self) -> Result<u64>;

    /// Append one observation to the block history
    async fn append_block_snapshot(&self, observation: &BlockObservation) -> Result<i64>;

    /// Most recent observations first
    async fn get_recent_block_snapshots(&self, network_id: &str, limit: usize) -> Result<Vec<BlockObservation>>;

    /// Replace the published status row of a network
    async fn upsert_network_status(&self, snapshot: &NetworkStatusSnapshot) -> Result<()>;

    async fn get_network_status(&self, network_id: &str) -> Result<Option<NetworkStatusSnapshot>>;

    async fn get_network_statuses(&self) -> Result<Vec<NetworkStatusSnapshot>>;
}

const HALT_EVENT_COLUMNS: &str = "id, network_id, severity, started_at, ended_at, duration_seconds";

const STATUS_COLUMNS: &str = "network_id, status, latest_block_number, latest_block_timestamp, \
     primary_source_status, secondary_source_status, tertiary_source_status, \
     primary_source_name, secondary_source_name, tertiary_source_name, \
     uptime_percent_24h, uptime_percent_7d, uptime_percent_30d, last_checked_at, updated_at";

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn up_down(up: bool) -> &'static str {
    if up { "up" } else { "down" }
}

const STATUS_UPSERT: &str = "DO UPDATE SET
    status = excluded.status,
    latest_block_number = excluded.latest_block_number,
    latest_block_timestamp = excluded.latest_block_timestamp,
    primary_source_status = excluded.primary_source_status,
    secondary_source_status = excluded.secondary_source_status,
    tertiary_source_status = excluded.tertiary_source_status,
    primary_source_name = excluded.primary_source_name,
    secondary_source_name = excluded.secondary_source_name,
    tertiary_source_name = excluded.tertiary_source_name,
    uptime_percent_24h = excluded.uptime_percent_24h,
    uptime_percent_7d = excluded.uptime_percent_7d,
    uptime_percent_30d = excluded.uptime_percent_30d,
    last_checked_at = excluded.last_checked_at,
    updated_at = excluded.updated_at";

/// Insert a status row, resolving an existing one with `on_conflict`
async fn write_status(conn: &libsql::Connection, snapshot: &NetworkStatusSnapshot, on_conflict: &str) -> Result<u64> {
    let written = conn
        .execute(
            &format!(
                "INSERT INTO network_status ({STATUS_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(network_id) {on_conflict}"
            ),
            params![
                snapshot.network_id.clone(),
                snapshot.status.as_str(),
                snapshot.latest_block_number.map(|v| v as i64),
                snapshot.latest_block_timestamp,
                up_down(snapshot.primary_up),
                up_down(snapshot.secondary_up),
                up_down(snapshot.tertiary_up),
                snapshot.primary_source_name.clone(),
                snapshot.secondary_source_name.clone(),
                snapshot.tertiary_source_name.clone(),
                snapshot.uptime_24h,
                snapshot.uptime_7d,
                snapshot.uptime_30d,
                snapshot.last_checked_at,
                snapshot.updated_at
            ],
        )
        .await?;
    Ok(written)
}

fn halt_event_from_row(row: &Row) -> Result<HaltEvent> {
    let severity: String = row.get(2)?;

    Ok(HaltEvent {
        id: row.get(0)?,
        network_id: row.get(1)?,
        severity: HaltSeverity::from_db(&severity)
            .ok_or_else(|| anyhow!("Unknown halt severity in database: {}", severity))?,
        started_at: row.get(3)?,
        ended_at: row.get(4)?,
        duration_seconds: row.get(5)?,
    })
}

fn observation_from_row(row: &Row) -> Result<BlockObservation> {
    let source: String = row.get(3)?;

    Ok(BlockObservation {
        network_id: row.get(0)?,
        block_number: row.get::<i64>(1)? as u64,
        block_timestamp: row.get(2)?,
        source: Source::from_db(&source).ok_or_else(|| anyhow!("Unknown source in database: {}", source))?,
        observed_at: row.get(4)?,
    })
}

fn snapshot_from_row(row: &Row) -> Result<NetworkStatusSnapshot> {
    let status: String = row.get(1)?;
    let is_up = |value: Option<String>| value.as_deref() == Some("up");

    Ok(NetworkStatusSnapshot {
        network_id: row.get(0)?,
        status: ChainStatus::from_db(&status),
        latest_block_number: row.get::<Option<i64>>(2)?.map(|v| v as u64),
        latest_block_timestamp: row.get(3)?,
        primary_up: is_up(row.get(4)?),
        secondary_up: is_up(row.get(5)?),
        tertiary_up: is_up(row.get(6)?),
        primary_source_name: row.get(7)?,
        secondary_source_name: row.get(8)?,
        tertiary_source_name: row.get(9)?,
        uptime_24h: row.get(10)?,
        uptime_7d: row.get(11)?,
        uptime_30d: row.get(12)?,
        last_checked_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn register_network(&self, config: &NetworkConfig) -> Result<bool> {
        let conn = self.get_conn().await?;
        let now = chrono::Utc::now().timestamp();

        let inserted = conn
            .execute(
                "INSERT INTO networks (id, name, expected_block_time, halt_threshold, created_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
                params![
                    config.id.clone(),
                    config.name.clone(),
                    config.expected_block_time as i64,
                    config.halt_threshold as i64,
                    now
                ],
            )
            .await?;

        if inserted == 0 {
            // Known network, keep its reference data in line with the configuration
            conn.execute(
                "UPDATE networks SET name = ?, expected_block_time = ?, halt_threshold = ? WHERE id = ?",
                params![
                    config.name.clone(),
                    config.expected_block_time as i64,
                    config.halt_threshold as i64,
                    config.id.clone()
                ],
            )
            .await?;
        }

        write_status(&conn, &NetworkStatusSnapshot::initial(config.id.clone(), now), "DO NOTHING").await?;

        Ok(inserted > 0)
    }

    async fn get_open_halt_event(&self, network_id: &str) -> Result<Option<HaltEvent>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {HALT_EVENT_COLUMNS} FROM halt_events WHERE network_id = ? AND ended_at IS NULL ORDER BY started_at DESC LIMIT 1"
                ),
                params![network_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(halt_event_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_halt_event(&self, network_id: &str, severity: HaltSeverity, started_at: i64) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO halt_events (network_id, started_at, severity) VALUES (?, ?, ?)",
            params![network_id, started_at, severity.as_str()],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_halt_event_severity(&self, id: i64, severity: HaltSeverity) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "UPDATE halt_events SET severity = ? WHERE id = ? AND ended_at IS NULL",
            params![severity.as_str(), id],
        )
        .await?;
        Ok(())
    }

    async fn close_halt_event(&self, id: i64, ended_at: i64, duration_seconds: i64) -> Result<()> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE halt_events SET ended_at = ?, duration_seconds = ? WHERE id = ? AND ended_at IS NULL",
                params![ended_at, duration_seconds, id],
            )
            .await?;

        if updated == 0 {
            return Err(anyhow!("Halt event {} is not open", id));
        }
        Ok(())
    }

    async fn get_halt_events_overlapping(&self, network_id: &str, window_start: i64) -> Result<Vec<HaltEvent>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {HALT_EVENT_COLUMNS} FROM halt_events WHERE network_id = ? AND (ended_at IS NULL OR ended_at > ?) ORDER BY started_at"
                ),
                params![network_id, window_start],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(halt_event_from_row(&row)?);
        }
        Ok(events)
    }

    async fn get_recent_halt_events(&self, network_id: &str, limit: usize) -> Result<Vec<HaltEvent>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {HALT_EVENT_COLUMNS} FROM halt_events WHERE network_id = ? ORDER BY started_at DESC LIMIT ?"
                ),
                params![network_id, limit as i64],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(halt_event_from_row(&row)?);
        }
        Ok(events)
    }

    async fn delete_all_halt_events(&self) -> Result<u64> {
        let conn = self.get_conn().await?;
        Ok(conn.execute("DELETE FROM halt_events", ()).await?)
    }

    async fn append_block_snapshot(&self, observation: &BlockObservation) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO block_snapshots (network_id, block_number, block_timestamp, source, recorded_at) VALUES (?, ?, ?, ?, ?)",
            params![
                observation.network_id.clone(),
                observation.block_number as i64,
                observation.block_timestamp,
                observation.source.as_str(),
                observation.observed_at
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_recent_block_snapshots(&self, network_id: &str, limit: usize) -> Result<Vec<BlockObservation>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT network_id, block_number, block_timestamp, source, recorded_at FROM block_snapshots WHERE network_id = ? ORDER BY recorded_at DESC, id DESC LIMIT ?",
                params![network_id, limit as i64],
            )
            .await?;

        let mut observations = Vec::new();
        while let Some(row) = rows.next().await? {
            observations.push(observation_from_row(&row)?);
        }
        Ok(observations)
    }

    async fn upsert_network_status(&self, snapshot: &NetworkStatusSnapshot) -> Result<()> {
        let conn = self.get_conn().await?;
        write_status(&conn, snapshot, STATUS_UPSERT).await?;
        Ok(())
    }

    async fn get_network_status(&self, network_id: &str) -> Result<Option<NetworkStatusSnapshot>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {STATUS_COLUMNS} FROM network_status WHERE network_id = ?"),
                params![network_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(snapshot_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_network_statuses(&self) -> Result<Vec<NetworkStatusSnapshot>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {STATUS_COLUMNS} FROM network_status ORDER BY network_id"), ())
            .await?;

        let mut snapshots = Vec::new();
        while let Some(row) = rows.next().await? {
            snapshots.push(snapshot_from_row(&row)?);
        }
        Ok(snapshots)
    }
}
