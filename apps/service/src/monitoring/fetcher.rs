use anyhow::{Result, anyhow};

/// Unit a provider reports block timestamps in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimestampUnit {
    fn per_second(self) -> u64 {
        match self {
            TimestampUnit::Seconds => 1,
            TimestampUnit::Milliseconds => 1_000,
            TimestampUnit::Microseconds => 1_000_000,
            TimestampUnit::Nanoseconds => 1_000_000_000,
        }
    }

    /// Convert a raw provider timestamp into whole unix seconds, truncating
    /// any sub-second part.
    pub fn to_unix_seconds(self, raw: u64) -> Result<i64> {
        let seconds = raw / self.per_second();
        i64::try_from(seconds).map_err(|_| anyhow!("Block timestamp out of range: {}", raw))
    }
}

/// Latest block exactly as a provider reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock {
    pub number: u64,
    pub timestamp: u64,
    pub unit: TimestampUnit,
}

impl RawBlock {
    pub fn new(number: u64, timestamp: u64, unit: TimestampUnit) -> Self {
        Self { number, timestamp, unit }
    }

    /// Block with a timestamp already in unix seconds
    pub fn in_seconds(number: u64, timestamp: u64) -> Self {
        Self::new(number, timestamp, TimestampUnit::Seconds)
    }

    pub fn unix_timestamp(&self) -> Result<i64> {
        self.unit.to_unix_seconds(self.timestamp)
    }
}

/// A single provider endpoint able to report the chain head
#[async_trait::async_trait]
pub trait BlockFetcher: Send + Sync {
    /// Fetch the latest block number and its timestamp
    async fn latest_block(&self) -> Result<RawBlock>;
}
