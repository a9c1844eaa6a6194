use anyhow::Result;
use reqwest::Client;
use serde_json::{Value, json};

use super::{base_url, parse_u64, post_json};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock, TimestampUnit};

/// Tron full node HTTP API (`/wallet/getnowblock`)
pub struct TronFetcher {
    client: Client,
    url: String,
}

impl TronFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for TronFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let url = format!("{}/wallet/getnowblock", base_url(&self.url));
        let block = post_json(&self.client, &url, &json!({})).await?;
        parse_now_block(&block)
    }
}

pub(crate) fn parse_now_block(block: &Value) -> Result<RawBlock> {
    let raw_data = &block["block_header"]["raw_data"];
    let number = parse_u64(&raw_data["number"], "block number")?;
    let timestamp = parse_u64(&raw_data["timestamp"], "block timestamp")?;
    Ok(RawBlock::new(number, timestamp, TimestampUnit::Milliseconds))
}
