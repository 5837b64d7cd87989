//! TOML file configuration structures.
//!
//! These structs directly map to the `topup-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use topup_core::config::{DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL, DEFAULT_SUPPORTED_METHODS};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    pub payment: PaymentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Base URLs of the remote services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub broker: Url,
    pub payment: Url,
    pub partner: Url,
    pub gamification: Url,
}

/// The wallet that pays for top-ups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Can also be given with `--wallet`.
    pub address: Option<String>,
}

/// Amount input pipeline section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_conversion_scale")]
    pub conversion_scale: u32,
    #[serde(default = "default_bonus_scale")]
    pub bonus_scale: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            conversion_scale: default_conversion_scale(),
            bonus_scale: default_bonus_scale(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_conversion_scale() -> u32 {
    2
}

fn default_bonus_scale() -> u32 {
    18
}

/// Transaction status poller section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

/// Payment section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Where the provider sends the user back after a redirect.
    pub return_url: Url,
    #[serde(default = "default_supported_methods")]
    pub supported_methods: Vec<String>,
}

fn default_supported_methods() -> Vec<String> {
    DEFAULT_SUPPORTED_METHODS
        .iter()
        .map(|id| id.to_string())
        .collect()
}

/// Rate cache section. Without a path, rates are kept in memory only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<PathBuf>,
}
