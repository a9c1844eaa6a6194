use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::{Value, json};

use super::{parse_u64, rpc_call};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock};

/// Solana JSON-RPC: latest finalized slot, then its block time
pub struct SolanaRpcFetcher {
    client: Client,
    url: String,
}

impl SolanaRpcFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for SolanaRpcFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let slot = rpc_call(&self.client, &self.url, "getSlot", json!([{"commitment": "finalized"}])).await?;
        let slot = parse_u64(&slot, "slot")?;

        // null for skipped slots, which rpc_call reports as an error
        let block_time = rpc_call(&self.client, &self.url, "getBlockTime", json!([slot])).await?;
        parse_slot_time(slot, &block_time)
    }
}

pub(crate) fn parse_slot_time(slot: u64, block_time: &Value) -> Result<RawBlock> {
    let timestamp = block_time
        .as_u64()
        .ok_or_else(|| anyhow!("Invalid block time for slot {}: {}", slot, block_time))?;
    Ok(RawBlock::in_seconds(slot, timestamp))
}
