use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::{Value, json};

use super::{parse_hex_u64, rpc_call, rpc_result};
use crate::monitoring::fetcher::{BlockFetcher, RawBlock};

/// Ethereum-compatible JSON-RPC node
pub struct EvmRpcFetcher {
    client: Client,
    url: String,
}

impl EvmRpcFetcher {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for EvmRpcFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let block = rpc_call(&self.client, &self.url, "eth_getBlockByNumber", json!(["latest", false])).await?;
        parse_block(&block)
    }
}

/// Explorer API exposing the node through `module=proxy`
pub struct EtherscanFetcher {
    client: Client,
    url: String,
    chain_id: Option<u64>,
    api_key: Option<String>,
}

impl EtherscanFetcher {
    pub fn new(client: Client, url: String, chain_id: Option<u64>, api_key: Option<String>) -> Self {
        Self { client, url, chain_id, api_key }
    }
}

#[async_trait::async_trait]
impl BlockFetcher for EtherscanFetcher {
    async fn latest_block(&self) -> Result<RawBlock> {
        let mut query: Vec<(&str, String)> = vec![
            ("module", "proxy".to_string()),
            ("action", "eth_getBlockByNumber".to_string()),
            ("tag", "latest".to_string()),
            ("boolean", "false".to_string()),
        ];
        if let Some(chain_id) = self.chain_id {
            query.push(("chainid", chain_id.to_string()));
        }
        if let Some(api_key) = &self.api_key {
            query.push(("apikey", api_key.clone()));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Request failed with status code: {}", status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(|e| anyhow!("Invalid JSON response: {}", e))?;
        parse_explorer_response(payload)
    }
}

/// Parse an `eth_getBlockByNumber` result object
pub(crate) fn parse_block(block: &Value) -> Result<RawBlock> {
    if !block.is_object() {
        return Err(anyhow!("Unexpected block payload: {}", block));
    }
    let number = parse_hex_u64(&block["number"], "block number")?;
    let timestamp = parse_hex_u64(&block["timestamp"], "block timestamp")?;
    Ok(RawBlock::in_seconds(number, timestamp))
}

/// Explorers report API errors as `{"status":"0","result":"<message>"}`
pub(crate) fn parse_explorer_response(payload: Value) -> Result<RawBlock> {
    let result = rpc_result(payload)?;
    if let Some(message) = result.as_str() {
        return Err(anyhow!("Explorer error: {}", message));
    }
    parse_block(&result)
}
