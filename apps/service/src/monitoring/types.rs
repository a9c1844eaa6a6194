use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three redundant providers polled for every network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Primary,
    Secondary,
    Tertiary,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Primary => "primary",
            Source::Secondary => "secondary",
            Source::Tertiary => "tertiary",
        }
    }

    /// Parse the stored column value
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(Source::Primary),
            "secondary" => Some(Source::Secondary),
            "tertiary" => Some(Source::Tertiary),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determined health of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Healthy,
    Slow,
    Halted,
    Degraded,
    /// No source returned usable data
    Stale,
    Unknown,
}

impl ChainStatus {
    /// Rank used for tie-breaking, higher is worse.
    ///
    /// `Stale` and `Unknown` carry no block data and sit outside the order.
    pub fn severity(self) -> Option<u8> {
        match self {
            ChainStatus::Halted => Some(3),
            ChainStatus::Slow => Some(2),
            ChainStatus::Degraded => Some(1),
            ChainStatus::Healthy => Some(0),
            ChainStatus::Stale | ChainStatus::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Healthy => "healthy",
            ChainStatus::Slow => "slow",
            ChainStatus::Halted => "halted",
            ChainStatus::Degraded => "degraded",
            ChainStatus::Stale => "stale",
            ChainStatus::Unknown => "unknown",
        }
    }

    /// Parse the stored column value, unrecognised values read back as `Unknown`
    pub fn from_db(value: &str) -> Self {
        match value {
            "healthy" => ChainStatus::Healthy,
            "slow" => ChainStatus::Slow,
            "halted" => ChainStatus::Halted,
            "degraded" => ChainStatus::Degraded,
            "stale" => ChainStatus::Stale,
            _ => ChainStatus::Unknown,
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity recorded on a halt incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltSeverity {
    Slow,
    Halted,
}

impl HaltSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            HaltSeverity::Slow => "slow",
            HaltSeverity::Halted => "halted",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "slow" => Some(HaltSeverity::Slow),
            "halted" => Some(HaltSeverity::Halted),
            _ => None,
        }
    }
}

impl fmt::Display for HaltSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static reference data for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub id: String,
    pub name: String,
    /// Reference block production cadence in seconds
    pub expected_block_time: u64,
    /// Seconds without a block after which the network is considered down
    pub halt_threshold: u64,
}

/// Latest block as reported by one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockObservation {
    pub network_id: String,
    pub block_number: u64,
    /// Block production time in unix seconds
    pub block_timestamp: i64,
    pub source: Source,
    /// Wall clock of the fetch in unix seconds
    pub observed_at: i64,
}

/// Outcome of a single provider fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SourceOutcome {
    Success(BlockObservation),
    Failure { reason: String },
}

/// Result of one fetch, tagged by source. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: Source,
    /// Human-readable provider name
    pub source_name: String,
    /// Time the fetch took, including failed attempts
    pub latency_ms: u64,
    pub outcome: SourceOutcome,
}

impl SourceResult {
    pub fn success(source_name: impl Into<String>, observation: BlockObservation, latency_ms: u64) -> Self {
        Self {
            source: observation.source,
            source_name: source_name.into(),
            latency_ms,
            outcome: SourceOutcome::Success(observation),
        }
    }

    pub fn failure(
        source: Source,
        source_name: impl Into<String>,
        reason: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            source,
            source_name: source_name.into(),
            latency_ms,
            outcome: SourceOutcome::Failure { reason: reason.into() },
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Success(_))
    }

    pub fn observation(&self) -> Option<&BlockObservation> {
        match &self.outcome {
            SourceOutcome::Success(observation) => Some(observation),
            SourceOutcome::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            SourceOutcome::Success(_) => None,
            SourceOutcome::Failure { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        let halted = ChainStatus::Halted.severity();
        let slow = ChainStatus::Slow.severity();
        let degraded = ChainStatus::Degraded.severity();
        let healthy = ChainStatus::Healthy.severity();

        assert!(halted > slow);
        assert!(slow > degraded);
        assert!(degraded > healthy);
        assert_eq!(ChainStatus::Stale.severity(), None);
        assert_eq!(ChainStatus::Unknown.severity(), None);
    }

    #[test]
    fn test_status_column_values() {
        for status in [
            ChainStatus::Healthy,
            ChainStatus::Slow,
            ChainStatus::Halted,
            ChainStatus::Degraded,
            ChainStatus::Stale,
            ChainStatus::Unknown,
        ] {
            assert_eq!(ChainStatus::from_db(&status.to_string()), status);
        }
        assert_eq!(ChainStatus::from_db("exploded"), ChainStatus::Unknown);
    }

    #[test]
    fn test_failure_result_has_no_observation() {
        let result = SourceResult::failure(Source::Tertiary, "Ankr", "timeout", 10_000);
        assert!(!result.is_up());
        assert!(result.observation().is_none());
        assert_eq!(result.failure_reason(), Some("timeout"));
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let result = SourceResult::failure(Source::Primary, "LlamaRPC", "HTTP 503", 42);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["state"], "failure");
        assert_eq!(json["source"], "primary");
    }
}
