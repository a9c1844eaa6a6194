//! Reconciles the three per-source reports of a network into one status.
//!
//! Each successful source yields a candidate status derived from the age of
//! the block it reported. How the candidates are combined depends on how many
//! sources answered:
//! - none: `Stale`
//! - one: its candidate, with `Healthy` downgraded to `Degraded`
//! - two: the shared candidate (again `Healthy` becomes `Degraded`), or the
//!   candidate of the source that saw the higher block when they disagree
//! - three: unanimity, then strict majority, then the most severe candidate
//!
//! The representative block is always the highest one reported, so a single
//! provider serving a stale cached head cannot produce a false halt.

use serde::Serialize;

use super::types::{BlockObservation, ChainStatus, NetworkConfig, SourceResult};

/// Blocks younger than this many block times are healthy
pub const HEALTHY_BLOCK_TIMES: i64 = 5;
/// Blocks younger than this many block times are slow, anything older is halted
pub const HALTED_BLOCK_TIMES: i64 = 15;

/// Determined status of a network for one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub status: ChainStatus,
    /// Highest block reported by any successful source
    pub block: Option<BlockObservation>,
    pub primary_up: bool,
    pub secondary_up: bool,
    pub tertiary_up: bool,
}

impl Detection {
    /// No source answered
    pub fn stale() -> Self {
        Self::without_data(ChainStatus::Stale)
    }

    /// The network could not be evaluated at all
    pub fn unknown() -> Self {
        Self::without_data(ChainStatus::Unknown)
    }

    fn without_data(status: ChainStatus) -> Self {
        Self { status, block: None, primary_up: false, secondary_up: false, tertiary_up: false }
    }
}

/// Classify the age of a block against the network's expected block time.
pub fn status_from_elapsed(elapsed_seconds: i64, expected_block_time: u64) -> ChainStatus {
    let block_time = i64::try_from(expected_block_time).unwrap_or(i64::MAX);

    if elapsed_seconds < block_time.saturating_mul(HEALTHY_BLOCK_TIMES) {
        ChainStatus::Healthy
    } else if elapsed_seconds < block_time.saturating_mul(HALTED_BLOCK_TIMES) {
        ChainStatus::Slow
    } else {
        ChainStatus::Halted
    }
}

/// Combine the three fetch outcomes of one network.
///
/// `now` is sampled once by the caller so every candidate is judged against
/// the same instant.
pub fn cross_validate(
    primary: &SourceResult,
    secondary: &SourceResult,
    tertiary: &SourceResult,
    config: &NetworkConfig,
    now: i64,
) -> Detection {
    let candidates: Vec<(&BlockObservation, ChainStatus)> = [primary, secondary, tertiary]
        .into_iter()
        .filter_map(SourceResult::observation)
        .map(|block| {
            (block, status_from_elapsed(now - block.block_timestamp, config.expected_block_time))
        })
        .collect();

    if candidates.is_empty() {
        return Detection::stale();
    }

    // First seen wins ties, hence the strict comparison.
    let mut representative = 0;
    for (index, (block, _)) in candidates.iter().enumerate().skip(1) {
        if block.block_number > candidates[representative].0.block_number {
            representative = index;
        }
    }

    let statuses: Vec<ChainStatus> = candidates.iter().map(|(_, status)| *status).collect();
    let status = reconcile(&statuses, statuses[representative]);

    Detection {
        status,
        block: Some(candidates[representative].0.clone()),
        primary_up: primary.is_up(),
        secondary_up: secondary.is_up(),
        tertiary_up: tertiary.is_up(),
    }
}

/// Pick the network status from the candidates of the successful sources.
///
/// `freshest` is the candidate of the source that reported the highest block.
fn reconcile(candidates: &[ChainStatus], freshest: ChainStatus) -> ChainStatus {
    match candidates {
        [] => ChainStatus::Stale,
        [only] => without_redundancy(*only),
        [first, second] if first == second => without_redundancy(*first),
        [_, _] => freshest,
        _ => consensus(candidates),
    }
}

/// A fine chain seen through too few sources is reported as degraded.
fn without_redundancy(status: ChainStatus) -> ChainStatus {
    match status {
        ChainStatus::Healthy => ChainStatus::Degraded,
        other => other,
    }
}

fn consensus(candidates: &[ChainStatus]) -> ChainStatus {
    let mut tally: Vec<(ChainStatus, usize)> = Vec::new();
    for status in candidates {
        match tally.iter_mut().find(|(seen, _)| seen == status) {
            Some((_, count)) => *count += 1,
            None => tally.push((*status, 1)),
        }
    }

    if let Some((status, _)) = tally.iter().find(|(_, count)| count * 2 > candidates.len()) {
        return *status;
    }

    candidates
        .iter()
        .copied()
        .max_by_key(|status| status.severity())
        .unwrap_or(ChainStatus::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Source;

    const NOW: i64 = 1_700_000_000;

    fn ethereum() -> NetworkConfig {
        NetworkConfig {
            id: "ethereum".to_string(),
            name: "Ethereum".to_string(),
            expected_block_time: 12,
            halt_threshold: 180,
        }
    }

    fn up(source: Source, block_number: u64, age: i64) -> SourceResult {
        SourceResult::success(
            source.as_str(),
            BlockObservation {
                network_id: "ethereum".to_string(),
                block_number,
                block_timestamp: NOW - age,
                source,
                observed_at: NOW,
            },
            50,
        )
    }

    fn down(source: Source) -> SourceResult {
        SourceResult::failure(source, source.as_str(), "connection refused", 30)
    }

    #[test]
    fn test_status_thresholds() {
        for block_time in [1u64, 2, 12, 600] {
            let ebt = block_time as i64;
            assert_eq!(status_from_elapsed(0, block_time), ChainStatus::Healthy);
            assert_eq!(status_from_elapsed(5 * ebt - 1, block_time), ChainStatus::Healthy);
            assert_eq!(status_from_elapsed(5 * ebt, block_time), ChainStatus::Slow);
            assert_eq!(status_from_elapsed(15 * ebt - 1, block_time), ChainStatus::Slow);
            assert_eq!(status_from_elapsed(15 * ebt, block_time), ChainStatus::Halted);
        }
    }

    #[test]
    fn test_block_from_the_future_is_healthy() {
        assert_eq!(status_from_elapsed(-30, 12), ChainStatus::Healthy);
    }

    #[test]
    fn test_no_sources_is_stale() {
        let detection = cross_validate(
            &down(Source::Primary),
            &down(Source::Secondary),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection, Detection::stale());
        assert!(!detection.primary_up && !detection.secondary_up && !detection.tertiary_up);
    }

    #[test]
    fn test_single_healthy_source_is_degraded() {
        let detection = cross_validate(
            &down(Source::Primary),
            &up(Source::Secondary, 100, 10),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Degraded);
        assert!(detection.secondary_up);
        assert!(!detection.primary_up);
    }

    #[test]
    fn test_single_source_keeps_slow_and_halted() {
        let slow = cross_validate(
            &up(Source::Primary, 100, 60),
            &down(Source::Secondary),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(slow.status, ChainStatus::Slow);

        let halted = cross_validate(
            &up(Source::Primary, 100, 600),
            &down(Source::Secondary),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(halted.status, ChainStatus::Halted);
    }

    #[test]
    fn test_two_healthy_sources_are_degraded() {
        let detection = cross_validate(
            &up(Source::Primary, 100, 5),
            &up(Source::Secondary, 101, 3),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Degraded);
        assert_eq!(detection.block.unwrap().block_number, 101);
    }

    #[test]
    fn test_two_agreeing_halted_sources_stay_halted() {
        let detection = cross_validate(
            &down(Source::Primary),
            &up(Source::Secondary, 100, 400),
            &up(Source::Tertiary, 100, 400),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Halted);
    }

    #[test]
    fn test_two_disagreeing_sources_follow_the_higher_block() {
        // Primary serves a stale head: 200s old, the secondary is 10s old.
        let fresh_secondary = cross_validate(
            &up(Source::Primary, 90, 200),
            &up(Source::Secondary, 105, 10),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(fresh_secondary.status, ChainStatus::Healthy);
        assert_eq!(fresh_secondary.block.as_ref().unwrap().source, Source::Secondary);

        // Same ages, but the halted primary claims the higher block.
        let halted_primary = cross_validate(
            &up(Source::Primary, 110, 200),
            &up(Source::Secondary, 105, 10),
            &down(Source::Tertiary),
            &ethereum(),
            NOW,
        );
        assert_eq!(halted_primary.status, ChainStatus::Halted);
        assert_eq!(halted_primary.block.as_ref().unwrap().source, Source::Primary);
    }

    #[test]
    fn test_three_healthy_sources_stay_healthy() {
        let detection = cross_validate(
            &up(Source::Primary, 100, 5),
            &up(Source::Secondary, 100, 5),
            &up(Source::Tertiary, 99, 12),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Healthy);
        assert_eq!(detection.block.unwrap().source, Source::Primary);
    }

    #[test]
    fn test_three_sources_majority_wins() {
        let detection = cross_validate(
            &up(Source::Primary, 100, 70),
            &up(Source::Secondary, 102, 5),
            &up(Source::Tertiary, 100, 80),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Slow);
        assert_eq!(detection.block.unwrap().block_number, 102);
    }

    #[test]
    fn test_three_distinct_candidates_pick_the_most_severe() {
        let detection = cross_validate(
            &up(Source::Primary, 100, 5),
            &up(Source::Secondary, 98, 70),
            &up(Source::Tertiary, 90, 900),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.status, ChainStatus::Halted);
        assert_eq!(detection.block.unwrap().block_number, 100);
    }

    #[test]
    fn test_three_sources_never_produce_degraded() {
        let ages = [0, 30, 60, 150, 200, 1_000];
        for a in ages {
            for b in ages {
                for c in ages {
                    let detection = cross_validate(
                        &up(Source::Primary, 1, a),
                        &up(Source::Secondary, 2, b),
                        &up(Source::Tertiary, 3, c),
                        &ethereum(),
                        NOW,
                    );
                    assert_ne!(detection.status, ChainStatus::Degraded);
                }
            }
        }
    }

    #[test]
    fn test_equal_block_numbers_prefer_first_seen() {
        let detection = cross_validate(
            &down(Source::Primary),
            &up(Source::Secondary, 100, 4),
            &up(Source::Tertiary, 100, 8),
            &ethereum(),
            NOW,
        );
        assert_eq!(detection.block.unwrap().source, Source::Secondary);
    }
}
