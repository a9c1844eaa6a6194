//! Turns the per-cycle status of a network into halt incidents.
//!
//! Only `halted` opens or sustains an incident. Any other status closes the
//! open incident, and `slow` on its own never creates one.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::database::Database;
use crate::database::models::HaltEvent;
use crate::monitoring::types::{ChainStatus, HaltSeverity};

/// What a cycle did to the incident record of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HaltTransition {
    /// No open incident and nothing to open, or the open one already matches
    Unchanged,
    Open { severity: HaltSeverity, started_at: i64 },
    UpdateSeverity { id: i64, severity: HaltSeverity },
    Close { id: i64, ended_at: i64, duration_seconds: i64 },
}

/// Decide the transition for one cycle.
pub fn decide(open_event: Option<&HaltEvent>, status: ChainStatus, now: i64) -> HaltTransition {
    match (open_event, status) {
        (None, ChainStatus::Halted) => {
            HaltTransition::Open { severity: HaltSeverity::Halted, started_at: now }
        }
        (None, _) => HaltTransition::Unchanged,
        (Some(event), ChainStatus::Halted) if event.severity == HaltSeverity::Halted => {
            HaltTransition::Unchanged
        }
        (Some(event), ChainStatus::Halted) => {
            HaltTransition::UpdateSeverity { id: event.id, severity: HaltSeverity::Halted }
        }
        (Some(event), _) => HaltTransition::Close {
            id: event.id,
            ended_at: now,
            duration_seconds: (now - event.started_at).max(0),
        },
    }
}

/// Applies [`decide`] against the persistence gateway.
///
/// The read-decide-write sequence for one network runs under that network's
/// lock, so overlapping cycles can never open two incidents or lose one.
pub struct HaltTracker {
    database: Arc<dyn Database>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HaltTracker {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database, locks: Mutex::new(HashMap::new()) }
    }

    async fn network_lock(&self, network_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(network_id.to_string()).or_default().clone()
    }

    /// Record this cycle's status for a network and return what changed
    pub async fn record(&self, network_id: &str, status: ChainStatus, now: i64) -> Result<HaltTransition> {
        let lock = self.network_lock(network_id).await;
        let _guard = lock.lock().await;

        let open_event = self.database.get_open_halt_event(network_id).await?;
        let transition = decide(open_event.as_ref(), status, now);

        match transition {
            HaltTransition::Unchanged => {
                debug!("No halt event change for {} ({})", network_id, status);
            }
            HaltTransition::Open { severity, started_at } => {
                let id = self.database.create_halt_event(network_id, severity, started_at).await?;
                info!("Opened halt event {} for {}", id, network_id);
            }
            HaltTransition::UpdateSeverity { id, severity } => {
                self.database.update_halt_event_severity(id, severity).await?;
                info!("Halt event {} for {} is now {}", id, network_id, severity);
            }
            HaltTransition::Close { id, ended_at, duration_seconds } => {
                self.database.close_halt_event(id, ended_at, duration_seconds).await?;
                info!(
                    "Closed halt event {} for {} after {}s (status {})",
                    id, network_id, duration_seconds, status
                );
            }
        }

        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseImpl;
    use crate::database::test_support::create_test_database;
    use crate::monitoring::types::NetworkConfig;

    fn open(severity: HaltSeverity) -> HaltEvent {
        HaltEvent {
            id: 7,
            network_id: "solana".to_string(),
            severity,
            started_at: 1_000,
            ended_at: None,
            duration_seconds: None,
        }
    }

    async fn registered_database() -> Result<(tempfile::TempDir, Arc<DatabaseImpl>)> {
        let (dir, database) = create_test_database().await?;
        database
            .register_network(&NetworkConfig {
                id: "solana".to_string(),
                name: "Solana".to_string(),
                expected_block_time: 15,
                halt_threshold: 300,
            })
            .await?;
        Ok((dir, database))
    }

    #[test]
    fn test_decide_table() {
        assert_eq!(
            decide(None, ChainStatus::Halted, 1_000),
            HaltTransition::Open { severity: HaltSeverity::Halted, started_at: 1_000 }
        );
        assert_eq!(decide(None, ChainStatus::Slow, 1_000), HaltTransition::Unchanged);
        assert_eq!(decide(None, ChainStatus::Stale, 1_000), HaltTransition::Unchanged);

        let halted = open(HaltSeverity::Halted);
        assert_eq!(decide(Some(&halted), ChainStatus::Halted, 1_060), HaltTransition::Unchanged);

        let slow = open(HaltSeverity::Slow);
        assert_eq!(
            decide(Some(&slow), ChainStatus::Halted, 1_060),
            HaltTransition::UpdateSeverity { id: 7, severity: HaltSeverity::Halted }
        );

        for status in [ChainStatus::Slow, ChainStatus::Healthy, ChainStatus::Degraded, ChainStatus::Stale] {
            assert_eq!(
                decide(Some(&halted), status, 1_300),
                HaltTransition::Close { id: 7, ended_at: 1_300, duration_seconds: 300 }
            );
        }
    }

    #[tokio::test]
    async fn test_status_sequence_produces_one_event() -> Result<()> {
        let (_dir, database) = registered_database().await?;
        let tracker = HaltTracker::new(database.clone());

        let polls = [
            (ChainStatus::Healthy, 1_000),
            (ChainStatus::Halted, 1_060),
            (ChainStatus::Halted, 1_120),
            (ChainStatus::Slow, 1_180),
        ];
        for (status, now) in polls {
            tracker.record("solana", status, now).await?;
        }

        let events = database.get_recent_halt_events("solana", 10).await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].started_at, 1_060);
        assert_eq!(events[0].ended_at, Some(1_180));
        assert_eq!(events[0].duration_seconds, Some(120));
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_never_opens_an_event() -> Result<()> {
        let (_dir, database) = registered_database().await?;
        let tracker = HaltTracker::new(database.clone());

        for now in [1_000, 1_060, 1_120] {
            assert_eq!(tracker.record("solana", ChainStatus::Slow, now).await?, HaltTransition::Unchanged);
        }
        assert!(database.get_recent_halt_events("solana", 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_records_open_a_single_event() -> Result<()> {
        let (_dir, database) = registered_database().await?;
        let tracker = Arc::new(HaltTracker::new(database.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.record("solana", ChainStatus::Halted, 2_000).await })
            })
            .collect();

        let mut transitions = Vec::new();
        for handle in handles {
            transitions.push(handle.await??);
        }
        let opened = transitions.iter().filter(|t| matches!(t, HaltTransition::Open { .. })).count();
        assert_eq!(opened, 1);
        assert_eq!(transitions.iter().filter(|t| **t == HaltTransition::Unchanged).count(), 7);

        let events = database.get_recent_halt_events("solana", 10).await?;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_open());
        Ok(())
    }
}
