//! Configuration management

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use terminator_rpc::ApiEndpoint;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lotus API URL or `TOKEN:multiaddr`
    pub api_url: Option<String>,

    /// Bearer token for the API
    pub api_token: Option<String>,

    /// Default number of concurrent workers
    pub workers: usize,

    /// Default strategy threshold in days
    pub expiration_threshold_days: u32,

    /// Use the mainnet genesis time without asking the node
    pub offline_genesis: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            expiration_threshold_days: 7,
            offline_genesis: false,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load the given file, or the default file if it exists, or defaults
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save config to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".fil-terminator").join("config.toml"))
    }

    /// Initialize config directory and file
    pub fn init() -> Result<PathBuf> {
        let config_path = Self::default_path()?;
        Self::init_at(&config_path)?;
        Ok(config_path)
    }

    /// Write a default config at `path` unless one is already there
    pub fn init_at(path: &Path) -> Result<()> {
        if !path.exists() {
            Config::default().save(path)?;
        }
        Ok(())
    }

    /// Pick the node endpoint.
    ///
    /// Precedence: `--api-url` flag, then `FULLNODE_API_INFO`, then the
    /// config file, then the local default.
    pub fn resolve_endpoint(&self, flag: Option<&str>) -> Result<ApiEndpoint> {
        self.resolve_endpoint_with(flag, ApiEndpoint::from_env())
    }

    fn resolve_endpoint_with(
        &self,
        flag: Option<&str>,
        env: Option<terminator_rpc::RpcResult<ApiEndpoint>>,
    ) -> Result<ApiEndpoint> {
        if let Some(flag) = flag {
            return Ok(ApiEndpoint::parse_api_info(flag)?);
        }
        if let Some(endpoint) = env {
            return Ok(endpoint.context("Invalid FULLNODE_API_INFO")?);
        }
        if let Some(url) = &self.api_url {
            let endpoint = ApiEndpoint::parse_api_info(url)?;
            return Ok(match (&endpoint.token, &self.api_token) {
                (None, Some(token)) => endpoint.with_token(token.clone()),
                _ => endpoint,
            });
        }
        Ok(match &self.api_token {
            Some(token) => ApiEndpoint::default().with_token(token.clone()),
            None => ApiEndpoint::default(),
        })
    }
}
