//! Runtime configuration for top-up sessions.
//!
//! These types represent validated configuration. Loading and parsing
//! (files, CLI flags) is handled by the binary crate.

use compact_str::CompactString;
use std::time::Duration;

/// Quiet period after the last keystroke before a conversion is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(700);

/// Interval between two transaction status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Payment rails a top-up can be paid with.
pub const DEFAULT_SUPPORTED_METHODS: [&str; 2] = ["paypal", "credit_card"];

/// Settings of the amount input pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub debounce: Duration,
    /// Decimal digits kept when converting between the two displayed sides.
    pub conversion_scale: u32,
    /// Decimal digits kept when converting the fiat amount for the bonus
    /// forecast.
    pub bonus_scale: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            conversion_scale: 2,
            bonus_scale: 18,
        }
    }
}

/// Settings of the transaction status poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Settings of the payment method gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Identifiers of the payment methods offered to the user.
    pub supported_methods: Vec<CompactString>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            supported_methods: DEFAULT_SUPPORTED_METHODS
                .iter()
                .map(|id| CompactString::from(*id))
                .collect(),
        }
    }
}

/// Complete configuration of a top-up session.
#[derive(Debug, Clone, Default)]
pub struct TopUpConfig {
    pub pipeline: PipelineConfig,
    pub poller: PollerConfig,
    pub gate: GateConfig,
}
