//! Concrete provider integrations behind [`BlockFetcher`].
//!
//! Each integration knows one upstream wire format and reports the chain head
//! in the provider's native timestamp unit; normalisation to unix seconds
//! happens in the adapter.

pub mod aptos;
pub mod bitcoin;
pub mod evm;
pub mod near;
pub mod solana;
pub mod sui;
pub mod tron;

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::SourceSpec;
use crate::monitoring::fetcher::BlockFetcher;

/// Wire format spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Ethereum-compatible JSON-RPC node
    EvmRpc,
    /// Etherscan-style explorer `module=proxy` API
    Etherscan,
    /// Esplora REST API (Blockstream, mempool.space)
    Esplora,
    BlockchainInfo,
    SolanaRpc,
    Aptos,
    SuiRpc,
    NearRpc,
    Tron,
}

/// Build the fetcher for one configured source
pub fn build_fetcher(spec: &SourceSpec, client: &Client) -> Arc<dyn BlockFetcher> {
    let client = client.clone();
    let url = spec.url.clone();

    match spec.kind {
        ProviderKind::EvmRpc => Arc::new(evm::EvmRpcFetcher::new(client, url)),
        ProviderKind::Etherscan => {
            Arc::new(evm::EtherscanFetcher::new(client, url, spec.chain_id, spec.api_key()))
        }
        ProviderKind::Esplora => Arc::new(bitcoin::EsploraFetcher::new(client, url)),
        ProviderKind::BlockchainInfo => Arc::new(bitcoin::BlockchainInfoFetcher::new(client, url)),
        ProviderKind::SolanaRpc => Arc::new(solana::SolanaRpcFetcher::new(client, url)),
        ProviderKind::Aptos => Arc::new(aptos::AptosFetcher::new(client, url)),
        ProviderKind::SuiRpc => Arc::new(sui::SuiRpcFetcher::new(client, url)),
        ProviderKind::NearRpc => Arc::new(near::NearRpcFetcher::new(client, url)),
        ProviderKind::Tron => Arc::new(tron::TronFetcher::new(client, url)),
    }
}

/// POST a JSON-RPC 2.0 request and return its `result`
pub(crate) async fn rpc_call(client: &Client, url: &str, method: &str, params: Value) -> Result<Value> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let payload = post_json(client, url, &body).await?;
    rpc_result(payload)
}

/// Extract the `result` member of a JSON-RPC response
pub(crate) fn rpc_result(mut payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(anyhow!("RPC error: {}", message));
    }

    match payload.get_mut("result").map(Value::take) {
        Some(result) if !result.is_null() => Ok(result),
        _ => Err(anyhow!("RPC response has no result")),
    }
}

pub(crate) async fn post_json(client: &Client, url: &str, body: &Value) -> Result<Value> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| anyhow!("Request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Request failed with status code: {}", status.as_u16()));
    }

    Ok(response.json().await.map_err(|e| anyhow!("Invalid JSON response: {}", e))?)
}

pub(crate) async fn get_json(client: &Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await.map_err(|e| anyhow!("Request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Request failed with status code: {}", status.as_u16()));
    }

    Ok(response.json().await.map_err(|e| anyhow!("Invalid JSON response: {}", e))?)
}

pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| anyhow!("Request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Request failed with status code: {}", status.as_u16()));
    }

    Ok(response.text().await?.trim().to_string())
}

/// Unsigned integer sent either as a JSON number or a decimal string
pub(crate) fn parse_u64(value: &Value, field: &str) -> Result<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Invalid {}: {}", field, value))
}

/// `0x`-prefixed hexadecimal quantity
pub(crate) fn parse_hex_u64(value: &Value, field: &str) -> Result<u64> {
    value
        .as_str()
        .and_then(|text| text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| anyhow!("Invalid {}: {}", field, value))
}

/// Trim a trailing slash so paths can be appended with `format!`
pub(crate) fn base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
