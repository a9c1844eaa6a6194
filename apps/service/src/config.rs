use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};

use crate::monitoring::providers::ProviderKind;
use crate::monitoring::types::NetworkConfig;
use crate::monitoring::validation;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub networks: Vec<NetworkEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database file, used when no `url` is set
    #[serde(default = "default_database_path")]
    pub path: String,
    /// Remote libsql endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Environment variable holding the remote auth token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token_env: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// One monitored network and its three providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub id: String,
    pub name: String,
    /// Seconds
    pub expected_block_time: u64,
    /// Seconds
    pub halt_threshold: u64,
    pub primary: SourceSpec,
    pub secondary: SourceSpec,
    pub tertiary: SourceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub kind: ProviderKind,
    pub url: String,
    /// Environment variable holding an explorer API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Chain id for multi-chain explorer APIs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

fn default_database_path() -> String {
    "blockwatch.db".into()
}

fn default_max_connections() -> usize {
    8
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            url: None,
            auth_token_env: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl NetworkEntry {
    pub fn to_network_config(&self) -> NetworkConfig {
        NetworkConfig {
            id: self.id.clone(),
            name: self.name.clone(),
            expected_block_time: self.expected_block_time,
            halt_threshold: self.halt_threshold,
        }
    }

    pub fn sources(&self) -> [&SourceSpec; 3] {
        [&self.primary, &self.secondary, &self.tertiary]
    }
}

impl SourceSpec {
    fn new(name: &str, kind: ProviderKind, url: &str) -> Self {
        Self { name: name.into(), kind, url: url.into(), api_key_env: None, chain_id: None }
    }

    fn with_api_key_env(mut self, var: &str) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// API key from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

fn network(
    id: &str,
    name: &str,
    expected_block_time: u64,
    halt_threshold: u64,
    sources: [SourceSpec; 3],
) -> NetworkEntry {
    let [primary, secondary, tertiary] = sources;
    NetworkEntry {
        id: id.into(),
        name: name.into(),
        expected_block_time,
        halt_threshold,
        primary,
        secondary,
        tertiary,
    }
}

fn default_networks() -> Vec<NetworkEntry> {
    use ProviderKind::*;

    vec![
        network("ethereum", "Ethereum", 12, 180, [
            SourceSpec::new("LlamaRPC", EvmRpc, "https://eth.llamarpc.com"),
            SourceSpec::new("Etherscan", Etherscan, "https://api.etherscan.io/v2/api")
                .with_chain_id(1)
                .with_api_key_env("ETHERSCAN_API_KEY"),
            SourceSpec::new("Ankr", EvmRpc, "https://rpc.ankr.com/eth"),
        ]),
        network("bitcoin", "Bitcoin", 600, 3600, [
            SourceSpec::new("Blockstream", Esplora, "https://blockstream.info/api"),
            SourceSpec::new("Mempool", Esplora, "https://mempool.space/api"),
            SourceSpec::new("Blockchain.info", BlockchainInfo, "https://blockchain.info/latestblock"),
        ]),
        network("solana", "Solana", 15, 300, [
            SourceSpec::new("Solana RPC", SolanaRpc, "https://api.mainnet-beta.solana.com"),
            SourceSpec::new("Ankr", SolanaRpc, "https://rpc.ankr.com/solana"),
            SourceSpec::new("Alchemy", SolanaRpc, "https://solana-mainnet.g.alchemy.com/v2/demo"),
        ]),
        network("bnb", "BNB Smart Chain", 3, 45, [
            SourceSpec::new("Binance Dataseed 1", EvmRpc, "https://bsc-dataseed1.binance.org"),
            SourceSpec::new("Binance Dataseed 2", EvmRpc, "https://bsc-dataseed2.binance.org"),
            SourceSpec::new("Binance Dataseed 3", EvmRpc, "https://bsc-dataseed3.binance.org"),
        ]),
        network("avalanche", "Avalanche C-Chain", 2, 30, [
            SourceSpec::new("Avalanche RPC", EvmRpc, "https://api.avax.network/ext/bc/C/rpc"),
            SourceSpec::new("Snowtrace", Etherscan, "https://api.snowtrace.io/api")
                .with_api_key_env("SNOWTRACE_API_KEY"),
            SourceSpec::new("PublicNode", EvmRpc, "https://avalanche-c-chain-rpc.publicnode.com"),
        ]),
        network("monad", "Monad", 1, 60, [
            SourceSpec::new("Monad RPC", EvmRpc, "https://rpc.monad.xyz"),
            SourceSpec::new("Monad RPC 1", EvmRpc, "https://rpc1.monad.xyz"),
            SourceSpec::new("Monad RPC 2", EvmRpc, "https://rpc2.monad.xyz"),
        ]),
    ]
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/blockwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("blockwatch/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            polling: PollingConfig::default(),
            networks: default_networks(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_title_2 = write_title_indented(2);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Database")?;
        match &self.database.url {
            Some(url) => write_1(f, "Remote URL", url)?,
            None => write_1(f, "Path", &self.database.path)?,
        }
        write_1(f, "Max Connections", &self.database.max_connections)?;

        write_title_1(f, "Polling")?;
        write_1(f, "Interval (s)", &self.polling.interval_seconds)?;
        write_1(f, "Request Timeout (s)", &self.polling.request_timeout_seconds)?;

        write_title_1(f, "Networks")?;
        for network in &self.networks {
            write_title_2(f, &format!("{} ({})", network.name, network.id))?;
            write_2(f, "Expected Block Time (s)", &network.expected_block_time)?;
            write_2(f, "Halt Threshold (s)", &network.halt_threshold)?;
            for (label, source) in ["Primary", "Secondary", "Tertiary"].into_iter().zip(network.sources()) {
                write_2(f, label, &format!("{} [{:?}] {}", source.name, source.kind, source.url))?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/blockwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,no_run
    /// use std::path;
    /// use blockwatch_service::config;
    ///
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str::<Self>(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Check timing bounds, provider URLs and id uniqueness
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |e: anyhow::Error| Error::Invalid(e.to_string());

        validation::validate_poll_interval(self.polling.interval_seconds).map_err(invalid)?;
        validation::validate_timeout(self.polling.request_timeout_seconds).map_err(invalid)?;

        if self.database.max_connections == 0 {
            return Err(Error::Invalid("database.max_connections must be positive".into()));
        }
        if let Some(url) = &self.database.url {
            url::Url::parse(url).map_err(|e| Error::Invalid(format!("Invalid database URL {}: {}", url, e)))?;
        }

        for network in &self.networks {
            validation::validate_network(&network.to_network_config()).map_err(invalid)?;
            for source in network.sources() {
                validation::validate_source_url(&source.url)
                    .map_err(|e| Error::Invalid(format!("{} / {}: {}", network.id, source.name, e)))?;
            }
        }

        validation::validate_unique_ids(self.networks.iter().map(|network| network.id.as_str())).map_err(invalid)
    }
}
