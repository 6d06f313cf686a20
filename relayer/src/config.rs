//! Configuration management for the BetVex Relayer
//!
//! Loads configuration from TOML files with environment variable substitution.
//! Both `${VAR}` and `${VAR:-default}` forms are supported.

use crate::error::{RelayerError, RelayerResult};
use crate::tx::CallBudget;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "BETVEX_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub relayer: RelayerConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    /// Account that signs and pays for proxy calls
    pub account_id: String,
    /// Proxy contract that triggers the MPC signature
    pub proxy_contract_id: String,
    #[serde(default = "default_proxy_method")]
    pub proxy_method: String,
    /// Gas attached to the proxy call
    #[serde(default = "default_gas")]
    pub gas: u64,
    /// Deposit in yoctoNEAR, as a decimal string
    #[serde(default = "default_deposit")]
    pub attached_deposit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network_id")]
    pub network_id: String,
    pub rpc_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the relayer private key
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    pub interval_secs: u64,
}

fn default_proxy_method() -> String {
    "proxy_bet".to_string()
}

fn default_gas() -> u64 {
    crate::tx::gas::DEFAULT_PROXY_GAS
}

fn default_deposit() -> String {
    "1".to_string()
}

fn default_network_id() -> String {
    "testnet".to_string()
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "RELAYER_PRIVATE_KEY".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl WalletConfig {
    /// Read the relayer private key from the configured environment variable.
    ///
    /// A missing key is fatal at startup, so this maps to a config error.
    pub fn private_key(&self) -> RelayerResult<String> {
        match env::var(&self.private_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(RelayerError::Config(format!(
                "relayer private key not found in ${}",
                self.private_key_env
            ))),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file named by `BETVEX_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> RelayerResult<()> {
        if self.relayer.account_id.trim().is_empty() {
            return Err(RelayerError::Config("relayer.account_id is empty".to_string()));
        }
        if self.relayer.proxy_contract_id.trim().is_empty() {
            return Err(RelayerError::Config(
                "relayer.proxy_contract_id is empty".to_string(),
            ));
        }
        if self.relayer.proxy_method.trim().is_empty() {
            return Err(RelayerError::Config("relayer.proxy_method is empty".to_string()));
        }
        if !self.network.rpc_url.starts_with("http://")
            && !self.network.rpc_url.starts_with("https://")
        {
            return Err(RelayerError::Config(format!(
                "network.rpc_url must be an http(s) URL, got {:?}",
                self.network.rpc_url
            )));
        }
        if self.network.request_timeout_ms == 0 {
            tracing::warn!("network.request_timeout_ms is 0 - RPC calls will time out immediately");
        }

        // Gas and deposit are checked by the budget itself
        CallBudget::from_config(&self.relayer)?;

        Ok(())
    }
}

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern");
}

/// Substitute environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(input, |cap: &regex::Captures| {
            let default = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
            match env::var(&cap[1]) {
                Ok(value) if !value.is_empty() => value,
                _ => default.to_string(),
            }
        })
        .into_owned()
}
