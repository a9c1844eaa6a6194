use anyhow::Result;
use reqwest::Client;
use serde_json::{Value, json};

use super::{parse_u64, rpc_call};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock, TimestampUnit};

pub struct NearRpcFetcher {
    client: Client,
    url: String,
}

impl NearRpcFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for NearRpcFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let block = rpc_call(&self.client, &self.url, "block", json!({"finality": "final"})).await?;
        parse_block(&block)
    }
}

/// Header timestamps are nanoseconds
pub(crate) fn parse_block(block: &Value) -> Result<RawBlock> {
    let header = &block["header"];
    let height = parse_u64(&header["height"], "block height")?;
    let timestamp = parse_u64(&header["timestamp"], "block timestamp")?;
    Ok(RawBlock::new(height, timestamp, TimestampUnit::Nanoseconds))
}
