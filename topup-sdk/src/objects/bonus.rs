//! Gamification bonus forecast.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusStatus {
    Active,
    Inactive,
    NoNetwork,
    UnknownError,
}

/// Bonus the user is expected to earn for a purchase of a given amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastBonus {
    pub status: BonusStatus,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: CompactString,
}

impl ForecastBonus {
    /// Whether the bonus should be shown to the user at all.
    pub fn is_visible(&self) -> bool {
        self.status == BonusStatus::Active && self.amount > Decimal::ZERO
    }
}
