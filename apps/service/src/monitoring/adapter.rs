use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::fetcher::BlockFetcher;
use super::types::{BlockObservation, Source, SourceResult};

/// Per-network data acquisition contract
///
/// The three fetches are independent of each other and never fail: every
/// problem comes back as a failure outcome carrying the reason and latency.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn network_id(&self) -> &str;

    /// Human-readable name of the provider behind `source`
    fn source_name(&self, source: Source) -> &str;

    async fn fetch_primary(&self) -> SourceResult;

    async fn fetch_secondary(&self) -> SourceResult;

    async fn fetch_tertiary(&self) -> SourceResult;
}

/// A named provider endpoint
#[derive(Clone)]
pub struct Provider {
    pub name: String,
    pub fetcher: Arc<dyn BlockFetcher>,
}

impl Provider {
    pub fn new(name: impl Into<String>, fetcher: Arc<dyn BlockFetcher>) -> Self {
        Self { name: name.into(), fetcher }
    }
}

/// Adapter built from three independent provider endpoints
pub struct NetworkAdapter {
    network_id: String,
    primary: Provider,
    secondary: Provider,
    tertiary: Provider,
    clock: Arc<dyn Clock>,
}

impl NetworkAdapter {
    pub fn new(network_id: impl Into<String>, primary: Provider, secondary: Provider, tertiary: Provider) -> Self {
        Self { network_id: network_id.into(), primary, secondary, tertiary, clock: Arc::new(SystemClock) }
    }

    /// Stamp observations with `clock` instead of the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn provider(&self, source: Source) -> &Provider {
        match source {
            Source::Primary => &self.primary,
            Source::Secondary => &self.secondary,
            Source::Tertiary => &self.tertiary,
        }
    }

    /// Run one fetch and turn its outcome into a [`SourceResult`]
    async fn fetch(&self, source: Source) -> SourceResult {
        let provider = self.provider(source);
        let start = Instant::now();

        let block = provider.fetcher.latest_block().await.and_then(|raw| {
            let timestamp = raw.unix_timestamp()?;
            Ok((raw.number, timestamp))
        });
        let latency_ms = start.elapsed().as_millis() as u64;

        match block {
            Ok((block_number, block_timestamp)) => {
                debug!(
                    "{} {} ({}) at block {} in {}ms",
                    self.network_id, source, provider.name, block_number, latency_ms
                );
                let observation = BlockObservation {
                    network_id: self.network_id.clone(),
                    block_number,
                    block_timestamp,
                    source,
                    observed_at: self.clock.now(),
                };
                SourceResult::success(provider.name.clone(), observation, latency_ms)
            }
            Err(e) => {
                debug!("{} {} ({}) failed after {}ms: {:#}", self.network_id, source, provider.name, latency_ms, e);
                SourceResult::failure(source, provider.name.clone(), format!("{:#}", e), latency_ms)
            }
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for NetworkAdapter {
    fn network_id(&self) -> &str {
        &self.network_id
    }

    fn source_name(&self, source: Source) -> &str {
        &self.provider(source).name
    }

    async fn fetch_primary(&self) -> SourceResult {
        self.fetch(Source::Primary).await
    }

    async fn fetch_secondary(&self) -> SourceResult {
        self.fetch(Source::Secondary).await
    }

    async fn fetch_tertiary(&self) -> SourceResult {
        self.fetch(Source::Tertiary).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::fetcher::{RawBlock, TimestampUnit};
    use anyhow::{Result, anyhow};

    struct FixedFetcher(Option<RawBlock>);

    #[async_trait::async_trait]
    impl BlockFetcher for FixedFetcher {
        async fn latest_block(&self) -> Result<RawBlock> {
            self.0.ok_or_else(|| anyhow!("HTTP 503 Service Unavailable"))
        }
    }

    fn provider(name: &str, block: Option<RawBlock>) -> Provider {
        Provider::new(name, Arc::new(FixedFetcher(block)))
    }

    #[tokio::test]
    async fn test_fetches_are_independent() {
        let adapter = NetworkAdapter::new(
            "near",
            provider("NEAR RPC", Some(RawBlock::new(140_000_000, 1_700_000_000_123_456_789, TimestampUnit::Nanoseconds))),
            provider("dRPC", None),
            provider("Omniatech", Some(RawBlock::in_seconds(139_999_999, 1_699_999_999))),
        );

        let primary = adapter.fetch_primary().await;
        let secondary = adapter.fetch_secondary().await;
        let tertiary = adapter.fetch_tertiary().await;

        let observation = primary.observation().expect("primary is up");
        assert_eq!(observation.block_timestamp, 1_700_000_000);
        assert_eq!(observation.source, Source::Primary);
        assert_eq!(observation.network_id, "near");

        assert!(!secondary.is_up());
        assert_eq!(secondary.source, Source::Secondary);
        assert_eq!(secondary.source_name, "dRPC");
        assert!(secondary.failure_reason().unwrap().contains("503"));

        assert_eq!(tertiary.observation().unwrap().block_number, 139_999_999);
        assert_eq!(adapter.source_name(Source::Tertiary), "Omniatech");
    }

    struct FrozenClock(i64);

    impl Clock for FrozenClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    #[tokio::test]
    async fn test_observations_are_stamped_by_the_injected_clock() {
        let adapter = NetworkAdapter::new(
            "aptos",
            provider("Aptos Labs", Some(RawBlock::new(250_000_000, 1_600_000_000_000_000, TimestampUnit::Microseconds))),
            provider("Nodereal", None),
            provider("Ankr", None),
        )
        .with_clock(Arc::new(FrozenClock(1_600_000_042)));

        let observation = adapter.fetch_primary().await.observation().cloned().expect("primary is up");
        assert_eq!(observation.observed_at, 1_600_000_042);
        assert_eq!(observation.block_timestamp, 1_600_000_000);
    }

    #[tokio::test]
    async fn test_unrepresentable_timestamp_is_a_failure() {
        let adapter = NetworkAdapter::new(
            "tron",
            provider("TronGrid", Some(RawBlock::in_seconds(1, u64::MAX))),
            provider("TronStack", None),
            provider("TronGrid", None),
        );

        let primary = adapter.fetch_primary().await;
        assert!(!primary.is_up());
        assert!(primary.failure_reason().unwrap().contains("out of range"));
    }
}
