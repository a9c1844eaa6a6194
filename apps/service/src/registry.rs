//! Static mapping of network ids to their configuration and source adapter.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::monitoring::adapter::{NetworkAdapter, Provider, SourceAdapter};
use crate::monitoring::providers::build_fetcher;
use crate::monitoring::types::NetworkConfig;

/// A monitored network
#[derive(Clone)]
pub struct RegisteredNetwork {
    pub config: NetworkConfig,
    pub adapter: Arc<dyn SourceAdapter>,
}

/// Networks in configuration order, indexed by id
#[derive(Default)]
pub struct NetworkRegistry {
    networks: Vec<RegisteredNetwork>,
    index: HashMap<String, usize>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured network with a shared HTTP client
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.polling.request_timeout_seconds))
            .user_agent(concat!("blockwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut registry = Self::new();
        for entry in &config.networks {
            let [primary, secondary, tertiary] = entry
                .sources()
                .map(|spec| Provider::new(spec.name.clone(), build_fetcher(spec, &client)));

            let adapter = NetworkAdapter::new(entry.id.clone(), primary, secondary, tertiary);
            registry.register(entry.to_network_config(), Arc::new(adapter))?;
        }

        Ok(registry)
    }

    pub fn register(&mut self, config: NetworkConfig, adapter: Arc<dyn SourceAdapter>) -> Result<()> {
        if self.index.contains_key(&config.id) {
            return Err(anyhow!("Network {} is already registered", config.id));
        }
        if adapter.network_id() != config.id {
            return Err(anyhow!(
                "Adapter for {} is bound to network {}",
                config.id,
                adapter.network_id()
            ));
        }

        debug!("Registered network {} ({})", config.id, config.name);
        self.index.insert(config.id.clone(), self.networks.len());
        self.networks.push(RegisteredNetwork { config, adapter });
        Ok(())
    }

    pub fn get(&self, network_id: &str) -> Option<&RegisteredNetwork> {
        self.index.get(network_id).map(|&i| &self.networks[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredNetwork> {
        self.networks.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.networks.iter().map(|network| network.config.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
