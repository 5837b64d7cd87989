//! Configuration module for topup-cli.
//!
//! Reads the TOML file, applies CLI overrides and turns it into the
//! runtime configuration of `topup-core`.

pub mod file;

use crate::config::file::{EndpointsConfig, FileConfig};
use compact_str::CompactString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use topup_core::config::{GateConfig, PipelineConfig, PollerConfig, TopUpConfig};
use topup_core::services::Wallet;
use topup_core::utils::rounding::MAX_SCALE;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Loaded configuration, ready to build a session from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub endpoints: EndpointsConfig,
    pub wallet: Option<Wallet>,
    pub top_up: TopUpConfig,
    pub return_url: Url,
    pub cache_path: Option<PathBuf>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    wallet_override: Option<String>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, wallet_override: Option<String>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            wallet_override,
        }
    }

    /// Read the TOML file, apply the CLI overrides and validate the result.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(address) = &self.wallet_override {
            file_config.wallet.address = Some(address.clone());
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let pipeline = &config.pipeline;
    for (name, scale) in [
        ("conversion_scale", pipeline.conversion_scale),
        ("bonus_scale", pipeline.bonus_scale),
    ] {
        if scale > MAX_SCALE {
            return Err(ConfigError::Validation(format!(
                "pipeline.{name} is {scale}, the maximum is {MAX_SCALE}"
            )));
        }
    }
    if config.poller.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "poller.interval_secs must be positive".to_string(),
        ));
    }
    if config.payment.supported_methods.is_empty() {
        return Err(ConfigError::Validation(
            "payment.supported_methods is empty".to_string(),
        ));
    }
    if config
        .wallet
        .address
        .as_deref()
        .is_some_and(|address| address.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "wallet.address is blank".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    let top_up = TopUpConfig {
        pipeline: PipelineConfig {
            debounce: Duration::from_millis(file_config.pipeline.debounce_ms),
            conversion_scale: file_config.pipeline.conversion_scale,
            bonus_scale: file_config.pipeline.bonus_scale,
        },
        poller: PollerConfig {
            interval: Duration::from_secs(file_config.poller.interval_secs),
        },
        gate: GateConfig {
            supported_methods: file_config
                .payment
                .supported_methods
                .into_iter()
                .map(CompactString::from)
                .collect(),
        },
    };

    LoadedConfig {
        endpoints: file_config.endpoints,
        wallet: file_config.wallet.address.map(Wallet::new),
        top_up,
        return_url: file_config.payment.return_url,
        cache_path: file_config.cache.path,
    }
}
