use serde::{Deserialize, Serialize};

use crate::monitoring::cross_validator::Detection;
use crate::monitoring::types::{ChainStatus, HaltSeverity, SourceResult};
use crate::monitoring::uptime::UptimeWindows;

/// Persisted incident bounding a period a network was classified down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaltEvent {
    pub id: i64,
    pub network_id: String,
    pub severity: HaltSeverity,
    /// Unix seconds
    pub started_at: i64,
    /// Unix seconds, `None` while the incident is open
    pub ended_at: Option<i64>,
    pub duration_seconds: Option<i64>,
}

impl HaltEvent {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Published view of one network, replaced every cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatusSnapshot {
    pub network_id: String,
    pub status: ChainStatus,
    pub latest_block_number: Option<u64>,
    pub latest_block_timestamp: Option<i64>,
    pub primary_up: bool,
    pub secondary_up: bool,
    pub tertiary_up: bool,
    pub primary_source_name: Option<String>,
    pub secondary_source_name: Option<String>,
    pub tertiary_source_name: Option<String>,
    pub uptime_24h: Option<f64>,
    pub uptime_7d: Option<f64>,
    pub uptime_30d: Option<f64>,
    pub last_checked_at: Option<i64>,
    pub updated_at: i64,
}

impl NetworkStatusSnapshot {
    /// Row written when a network is first registered
    pub fn initial(network_id: impl Into<String>, now: i64) -> Self {
        Self {
            network_id: network_id.into(),
            status: ChainStatus::Unknown,
            latest_block_number: None,
            latest_block_timestamp: None,
            primary_up: false,
            secondary_up: false,
            tertiary_up: false,
            primary_source_name: None,
            secondary_source_name: None,
            tertiary_source_name: None,
            uptime_24h: None,
            uptime_7d: None,
            uptime_30d: None,
            last_checked_at: None,
            updated_at: now,
        }
    }

    /// Snapshot for a completed cycle
    pub fn from_cycle(
        network_id: impl Into<String>,
        detection: &Detection,
        sources: [&SourceResult; 3],
        uptime: &UptimeWindows,
        now: i64,
    ) -> Self {
        let [primary, secondary, tertiary] = sources;
        Self {
            network_id: network_id.into(),
            status: detection.status,
            latest_block_number: detection.block.as_ref().map(|block| block.block_number),
            latest_block_timestamp: detection.block.as_ref().map(|block| block.block_timestamp),
            primary_up: detection.primary_up,
            secondary_up: detection.secondary_up,
            tertiary_up: detection.tertiary_up,
            primary_source_name: Some(primary.source_name.clone()),
            secondary_source_name: Some(secondary.source_name.clone()),
            tertiary_source_name: Some(tertiary.source_name.clone()),
            uptime_24h: Some(uptime.last_24h),
            uptime_7d: Some(uptime.last_7d),
            uptime_30d: Some(uptime.last_30d),
            last_checked_at: Some(now),
            updated_at: now,
        }
    }

    /// Seconds since the latest known block, relative to `now`
    pub fn seconds_since_last_block(&self, now: i64) -> Option<i64> {
        self.latest_block_timestamp.map(|timestamp| now - timestamp)
    }
}
