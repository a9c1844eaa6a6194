use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use super::{get_json, parse_u64};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock, TimestampUnit};

/// Aptos REST ledger info (`GET /v1`)
pub struct AptosFetcher {
    client: Client,
    url: String,
}

impl AptosFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for AptosFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let ledger = get_json(&self.client, &self.url).await?;
        parse_ledger_info(&ledger)
    }
}

/// Ledger timestamps are microseconds encoded as decimal strings
pub(crate) fn parse_ledger_info(ledger: &Value) -> Result<RawBlock> {
    let height = parse_u64(&ledger["block_height"], "block height")?;
    let timestamp = parse_u64(&ledger["ledger_timestamp"], "ledger timestamp")?;
    Ok(RawBlock::new(height, timestamp, TimestampUnit::Microseconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ledger_info() {
        let ledger = json!({
            "chain_id": 1,
            "epoch": "5000",
            "ledger_version": "300000000",
            "block_height": "120000000",
            "ledger_timestamp": "1700000000123456"
        });
        let raw = parse_ledger_info(&ledger).unwrap();
        assert_eq!(raw.number, 120_000_000);
        assert_eq!(raw.unix_timestamp().unwrap(), 1_700_000_000);
    }
}
