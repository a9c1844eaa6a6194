use anyhow::Result;
use reqwest::Client;
use serde_json::{Value, json};

use super::{parse_u64, rpc_call};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock, TimestampUnit};

/// Sui JSON-RPC; checkpoints stand in for blocks
pub struct SuiRpcFetcher {
    client: Client,
    url: String,
}

impl SuiRpcFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for SuiRpcFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let sequence =
            rpc_call(&self.client, &self.url, "sui_getLatestCheckpointSequenceNumber", json!([])).await?;
        let sequence = parse_u64(&sequence, "checkpoint sequence number")?;

        let checkpoint =
            rpc_call(&self.client, &self.url, "sui_getCheckpoint", json!([sequence.to_string()])).await?;
        parse_checkpoint(sequence, &checkpoint)
    }
}

pub(crate) fn parse_checkpoint(sequence: u64, checkpoint: &Value) -> Result<RawBlock> {
    let timestamp = parse_u64(&checkpoint["timestampMs"], "checkpoint timestamp")?;
    Ok(RawBlock::new(sequence, timestamp, TimestampUnit::Milliseconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkpoint() {
        let checkpoint = json!({"sequenceNumber": "20000000", "timestampMs": "1700000000999", "epoch": "200"});
        let raw = parse_checkpoint(20_000_000, &checkpoint).unwrap();
        assert_eq!(raw.number, 20_000_000);
        assert_eq!(raw.unix_timestamp().unwrap(), 1_700_000_000);
    }
}
