use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;

use super::{base_url, get_json, get_text, parse_u64};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock};

/// Esplora REST API
///
/// The tip hash is resolved first and the block is then read by hash, so
/// height and timestamp always describe the same block.
pub struct EsploraFetcher {
    client: Client,
    url: String,
}

impl EsploraFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for EsploraFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let base = base_url(&self.url);
        let hash = get_text(&self.client, &format!("{}/blocks/tip/hash", base)).await?;
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Invalid tip hash: {}", hash));
        }

        let block = get_json(&self.client, &format!("{}/block/{}", base, hash)).await?;
        parse_esplora_block(&block)
    }
}

/// blockchain.info `latestblock` endpoint
pub struct BlockchainInfoFetcher {
    client: Client,
    url: String,
}

impl BlockchainInfoFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for BlockchainInfoFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let block = get_json(&self.client, &self.url).await?;
        parse_latest_block(&block)
    }
}

pub(crate) fn parse_esplora_block(block: &Value) -> Result<RawBlock> {
    let height = parse_u64(&block["height"], "block height")?;
    let timestamp = parse_u64(&block["timestamp"], "block timestamp")?;
    Ok(RawBlock::in_seconds(height, timestamp))
}

pub(crate) fn parse_latest_block(block: &Value) -> Result<RawBlock> {
    let height = parse_u64(&block["height"], "block height")?;
    let timestamp = parse_u64(&block["time"], "block time")?;
    Ok(RawBlock::in_seconds(height, timestamp))
}
