//! Payment method allow-list and top-up bounds.

use compact_str::CompactString;
use rust_decimal::Decimal;
use topup_sdk::objects::{PaymentMethodData, TopUpLimits};

use crate::config::GateConfig;
use crate::state::{AmountEntry, TopUpState};

/// Outcome of comparing an amount against the top-up limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundsCheck {
    Ok,
    TooLow,
    TooHigh,
}

/// Compare `amount` against `min` and `max`. Both bounds are allowed values.
///
/// With inverted bounds an amount that violates both is reported as
/// `TooHigh`.
pub fn validate_bounds(amount: Decimal, min: Decimal, max: Decimal) -> BoundsCheck {
    if amount > max {
        BoundsCheck::TooHigh
    } else if amount < min {
        BoundsCheck::TooLow
    } else {
        BoundsCheck::Ok
    }
}

/// Limits applying to one submission, in the local fiat currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveLimits {
    pub min: Decimal,
    pub max: Decimal,
    pub currency: CompactString,
}

impl EffectiveLimits {
    pub fn check(&self, amount: Decimal) -> BoundsCheck {
        validate_bounds(amount, self.min, self.max)
    }

    /// Warning text for a failed check, e.g. `"5 EUR"`.
    pub fn warning(&self, check: BoundsCheck) -> Option<String> {
        match check {
            BoundsCheck::Ok => None,
            BoundsCheck::TooLow => Some(format!("{} {}", self.min, self.currency)),
            BoundsCheck::TooHigh => Some(format!("{} {}", self.max, self.currency)),
        }
    }
}

/// Decides which payment methods are offered and when an amount may be
/// submitted.
#[derive(Debug, Clone, Default)]
pub struct PaymentMethodGate {
    config: GateConfig,
}

impl PaymentMethodGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn is_supported(&self, method_id: &str) -> bool {
        self.config
            .supported_methods
            .iter()
            .any(|supported| supported == method_id)
    }

    /// Restrict `methods` to the supported ones, keeping their order.
    pub fn filter_supported(&self, methods: Vec<PaymentMethodData>) -> Vec<PaymentMethodData> {
        methods
            .into_iter()
            .filter(|method| self.is_supported(&method.id))
            .collect()
    }

    /// Top-up limits narrowed by the bounds of `method`, if it has any.
    pub fn effective_limits(
        &self,
        limits: &TopUpLimits,
        method: Option<&PaymentMethodData>,
    ) -> EffectiveLimits {
        let mut min = limits.min.amount;
        let mut max = limits.max.amount;
        if let Some(method) = method {
            if let Some(method_min) = method.min_amount {
                min = min.max(method_min);
            }
            if let Some(method_max) = method.max_amount {
                max = max.min(method_max);
            }
        }
        EffectiveLimits {
            min,
            max,
            currency: limits.min.currency.clone(),
        }
    }

    /// Bounds check of the fiat side of `state`, once both the amount and the
    /// limits are known.
    pub fn check(&self, state: &TopUpState) -> Option<(BoundsCheck, EffectiveLimits)> {
        let amount = state.entry.fiat.amount()?;
        let limits = self.effective_limits(state.limits.as_ref()?, state.selected_method.as_ref());
        Some((limits.check(amount), limits))
    }

    /// Both sides hold a positive amount and a method is selected.
    pub fn is_submittable(&self, entry: &AmountEntry, method: Option<&PaymentMethodData>) -> bool {
        entry.fiat.positive().is_some() && entry.token.positive().is_some() && method.is_some()
    }

    /// Whether the submit control should be enabled for `state`.
    pub fn can_submit(&self, state: &TopUpState) -> bool {
        state.conversion_settled
            && state.bounds == Some(BoundsCheck::Ok)
            && self.is_submittable(&state.entry, state.selected_method.as_ref())
    }
}
