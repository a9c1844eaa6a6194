//! Validation of network and provider settings loaded from configuration.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use url::Url;

use super::types::NetworkConfig;

/// Validate a provider endpoint URL
pub fn validate_source_url(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| anyhow!("Invalid URL {}: {}", target, e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Invalid scheme for provider URL: {}", other)),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(anyhow!("Provider URL has no host: {}", target));
    }

    if url.port() == Some(0) {
        return Err(anyhow!("Port 0 is not valid"));
    }

    Ok(())
}

/// Network ids are stored as keys and used on the command line
fn validate_network_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(anyhow!("Network id must not be empty"));
    }

    if !id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(anyhow!(
            "Invalid network id {:?}: use lowercase letters, digits, '-' or '_'",
            id
        ));
    }

    Ok(())
}

/// Validate the static timing parameters of a network
pub fn validate_network(network: &NetworkConfig) -> Result<()> {
    validate_network_id(&network.id)?;

    if network.expected_block_time == 0 {
        return Err(anyhow!("{}: expected_block_time must be positive", network.id));
    }

    if network.halt_threshold < network.expected_block_time {
        return Err(anyhow!(
            "{}: halt_threshold ({}s) is shorter than expected_block_time ({}s)",
            network.id,
            network.halt_threshold,
            network.expected_block_time
        ));
    }

    Ok(())
}

/// Every network id may appear only once
pub fn validate_unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(anyhow!("Duplicate network id: {}", id));
        }
    }
    Ok(())
}

/// Validate polling interval
pub fn validate_poll_interval(interval_seconds: u64) -> Result<()> {
    const MIN_INTERVAL: u64 = 10;
    const MAX_INTERVAL: u64 = 86400; // 24 hours

    if interval_seconds < MIN_INTERVAL {
        return Err(anyhow!(
            "Poll interval too short: {} seconds (minimum: {})",
            interval_seconds,
            MIN_INTERVAL
        ));
    }

    if interval_seconds > MAX_INTERVAL {
        return Err(anyhow!(
            "Poll interval too long: {} seconds (maximum: {})",
            interval_seconds,
            MAX_INTERVAL
        ));
    }

    Ok(())
}

/// Validate request timeout is reasonable
pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    const MIN_TIMEOUT: u64 = 1;
    const MAX_TIMEOUT: u64 = 300; // 5 minutes

    if timeout_seconds < MIN_TIMEOUT {
        return Err(anyhow!(
            "Timeout too short: {} seconds (minimum: {})",
            timeout_seconds,
            MIN_TIMEOUT
        ));
    }

    if timeout_seconds > MAX_TIMEOUT {
        return Err(anyhow!(
            "Timeout too long: {} seconds (maximum: {})",
            timeout_seconds,
            MAX_TIMEOUT
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(id: &str, expected_block_time: u64, halt_threshold: u64) -> NetworkConfig {
        NetworkConfig {
            id: id.to_string(),
            name: id.to_string(),
            expected_block_time,
            halt_threshold,
        }
    }

    #[test]
    fn test_validate_source_url() {
        assert!(validate_source_url("https://eth.llamarpc.com").is_ok());
        assert!(validate_source_url("http://localhost:8545").is_ok());
        assert!(validate_source_url("https://blockstream.info/api/").is_ok());

        assert!(validate_source_url("wss://eth.llamarpc.com").is_err());
        assert!(validate_source_url("eth.llamarpc.com").is_err());
        assert!(validate_source_url("http://example.com:0").is_err());
    }

    #[test]
    fn test_validate_network() {
        assert!(validate_network(&network("ethereum", 12, 180)).is_ok());
        assert!(validate_network(&network("bnb", 3, 3)).is_ok());

        assert!(validate_network(&network("ethereum", 0, 180)).is_err());
        assert!(validate_network(&network("ethereum", 12, 6)).is_err());
        assert!(validate_network(&network("", 12, 180)).is_err());
        assert!(validate_network(&network("Ethereum Mainnet", 12, 180)).is_err());
    }

    #[test]
    fn test_validate_unique_ids() {
        assert!(validate_unique_ids(["ethereum", "bitcoin"]).is_ok());
        assert!(validate_unique_ids(["ethereum", "bitcoin", "ethereum"]).is_err());
    }

    #[test]
    fn test_validate_poll_interval() {
        assert!(validate_poll_interval(10).is_ok()); // Min
        assert!(validate_poll_interval(60).is_ok());
        assert!(validate_poll_interval(86400).is_ok()); // Max

        assert!(validate_poll_interval(5).is_err());
        assert!(validate_poll_interval(100000).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout(1).is_ok());
        assert!(validate_timeout(300).is_ok());
        assert!(validate_timeout(0).is_err());
        assert!(validate_timeout(301).is_err());
    }
}
