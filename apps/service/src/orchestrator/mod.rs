/// Orchestrator module - coordinates one polling cycle across all networks
///
/// For every network the orchestrator:
/// - Fetches the three sources concurrently and waits for all of them
/// - Cross-validates the outcomes against a single `now` sample
/// - Commits block history, halt incidents, uptime and the published status
///
/// Networks run in parallel and fail independently of each other.
pub mod scheduler;


pub use crate::monitoring::clock::{Clock, SystemClock};
pub use scheduler::PollScheduler;

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::database::models::NetworkStatusSnapshot;
use crate::monitoring::cross_validator::{Detection, cross_validate};
use crate::monitoring::halt_tracker::{HaltTracker, HaltTransition};
use crate::monitoring::types::{BlockObservation, ChainStatus, NetworkConfig, SourceResult};
use crate::monitoring::uptime::{MONTH_SECONDS, UptimeWindows};
use crate::registry::NetworkRegistry;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("configuration error: unknown network {0}")]
    UnknownNetwork(String),
    #[error("persistence failure for {network_id}: {message}")]
    Persistence { network_id: String, message: String },
}

/// Outcome of one network within a cycle
#[derive(Debug, Clone, Serialize)]
pub struct NetworkPollResult {
    pub network_id: String,
    pub status: ChainStatus,
    /// Representative block chosen by cross-validation
    pub block: Option<BlockObservation>,
    pub sources: Vec<SourceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halt_transition: Option<HaltTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<UptimeWindows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkPollResult {
    fn from_detection(network_id: &str, detection: &Detection, sources: Vec<SourceResult>) -> Self {
        Self {
            network_id: network_id.to_string(),
            status: detection.status,
            block: detection.block.clone(),
            sources,
            halt_transition: None,
            uptime: None,
            error: None,
        }
    }

    fn failed(network_id: &str, error: &PollError) -> Self {
        let mut result = Self::from_detection(network_id, &Detection::unknown(), Vec::new());
        result.error = Some(error.to_string());
        result
    }
}

/// Result of a whole polling cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// False when any network failed to persist its results
    pub success: bool,
    pub results: Vec<NetworkPollResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    pub fn result(&self, network_id: &str) -> Option<&NetworkPollResult> {
        self.results.iter().find(|result| result.network_id == network_id)
    }
}

/// Runs polling cycles over the registered networks
pub struct PollOrchestrator {
    registry: Arc<NetworkRegistry>,
    database: Arc<dyn Database>,
    halt_tracker: HaltTracker,
    clock: Arc<dyn Clock>,
}

impl PollOrchestrator {
    pub fn new(registry: Arc<NetworkRegistry>, database: Arc<dyn Database>) -> Self {
        Self::with_clock(registry, database, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<NetworkRegistry>, database: Arc<dyn Database>, clock: Arc<dyn Clock>) -> Self {
        let halt_tracker = HaltTracker::new(database.clone());
        Self { registry, database, halt_tracker, clock }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Register every network in storage, once at startup
    pub async fn initialize(&self) -> Result<()> {
        for network in self.registry.iter() {
            if self.database.register_network(&network.config).await? {
                info!("Registered new network {} ({})", network.config.id, network.config.name);
            }
        }
        Ok(())
    }

    /// Poll every registered network once
    pub async fn run_polling_cycle(&self) -> CycleReport {
        let ids = self.registry.ids();
        self.run_polling_cycle_for(&ids).await
    }

    /// Poll the given networks once; unknown ids fail only their own entry
    pub async fn run_polling_cycle_for(&self, network_ids: &[String]) -> CycleReport {
        let started = Instant::now();
        let outcomes = join_all(network_ids.iter().map(|id| self.poll_network(id))).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (result, error) in outcomes {
            if let Some(error @ PollError::Persistence { .. }) = error {
                failures.push(error.to_string());
            }
            results.push(result);
        }

        let success = failures.is_empty();
        info!(
            "Polling cycle finished for {} networks in {}ms ({} persistence failures)",
            results.len(),
            started.elapsed().as_millis(),
            failures.len()
        );

        CycleReport { success, results, error: (!success).then(|| failures.join("; ")) }
    }

    async fn poll_network(&self, network_id: &str) -> (NetworkPollResult, Option<PollError>) {
        let Some(network) = self.registry.get(network_id) else {
            let error = PollError::UnknownNetwork(network_id.to_string());
            warn!("{}", error);
            return (NetworkPollResult::failed(network_id, &error), Some(error));
        };

        let adapter = &network.adapter;
        let (primary, secondary, tertiary) =
            tokio::join!(adapter.fetch_primary(), adapter.fetch_secondary(), adapter.fetch_tertiary());

        let now = self.clock.now();
        let detection = cross_validate(&primary, &secondary, &tertiary, &network.config, now);
        debug!(
            "{} is {} (sources up: {}/{}/{})",
            network_id, detection.status, detection.primary_up, detection.secondary_up, detection.tertiary_up
        );

        let committed = self.commit(&network.config, &detection, [&primary, &secondary, &tertiary], now).await;
        let mut result =
            NetworkPollResult::from_detection(network_id, &detection, vec![primary, secondary, tertiary]);

        match committed {
            Ok((transition, uptime)) => {
                result.halt_transition = Some(transition);
                result.uptime = Some(uptime);
                (result, None)
            }
            Err(e) => {
                let error = PollError::Persistence { network_id: network_id.to_string(), message: format!("{:#}", e) };
                error!("{}", error);
                result.error = Some(error.to_string());
                (result, Some(error))
            }
        }
    }

    /// Persist one network's cycle in order: history, incidents, uptime, status
    async fn commit(
        &self,
        config: &NetworkConfig,
        detection: &Detection,
        sources: [&SourceResult; 3],
        now: i64,
    ) -> Result<(HaltTransition, UptimeWindows)> {
        for observation in sources.iter().filter_map(|source| source.observation()) {
            self.database.append_block_snapshot(observation).await?;
        }

        let transition = self.halt_tracker.record(&config.id, detection.status, now).await?;

        let events = self.database.get_halt_events_overlapping(&config.id, now - MONTH_SECONDS).await?;
        let uptime = UptimeWindows::compute(&events, now);

        let snapshot = NetworkStatusSnapshot::from_cycle(config.id.clone(), detection, sources, &uptime, now);
        self.database.upsert_network_status(&snapshot).await?;

        Ok((transition, uptime))
    }
}
