use compact_str::{CompactString, ToCompactString};
use topup_sdk::objects::{ForecastBonus, PaymentMethodData, TopUpLimits};

use super::amount::{AmountEntry, AmountValue, LocalCurrency};
use crate::processors::payment_gate::BoundsCheck;

/// Snapshot of everything the top-up screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopUpState {
    pub entry: AmountEntry,
    /// Payment methods offered, already restricted to the supported ones.
    pub methods: Vec<PaymentMethodData>,
    pub selected_method: Option<PaymentMethodData>,
    /// Top-up limits, fetched once per session.
    pub limits: Option<TopUpLimits>,
    /// Bounds check of the current amount, `None` until validated.
    pub bounds: Option<BoundsCheck>,
    pub bonus: Option<ForecastBonus>,
    /// Whether the derived side reflects the current source amount.
    pub conversion_settled: bool,
}

/// A state transition.
#[derive(Debug, Clone)]
pub enum TopUpAction {
    SetupLoaded {
        methods: Vec<PaymentMethodData>,
        currency: LocalCurrency,
    },
    /// The user typed `text` on the selected side. The text has already
    /// passed the numeric filter.
    AmountEdited { text: CompactString },
    ConversionSettled { derived: AmountValue },
    LimitsLoaded(TopUpLimits),
    BoundsValidated(BoundsCheck),
    BonusUpdated(Option<ForecastBonus>),
    MethodSelected(PaymentMethodData),
    CurrencySwitched,
}

/// Computes the state following `action`.
pub fn reduce(state: &TopUpState, action: TopUpAction) -> TopUpState {
    let mut next = state.clone();
    match action {
        TopUpAction::SetupLoaded { methods, currency } => {
            next.entry.currency = currency;
            let still_offered = state
                .selected_method
                .as_ref()
                .is_none_or(|selected| methods.iter().any(|m| m.id == selected.id));
            if !still_offered {
                next.selected_method = None;
            }
            next.methods = methods;
        }
        TopUpAction::AmountEdited { text } => {
            let Some(value) = AmountValue::from_text(&text) else {
                return next;
            };
            let side = state.entry.selected;
            next.entry = state
                .entry
                .with_side(side, value)
                .with_side(side.other(), AmountValue::Unknown);
            next.entry.raw_text = text;
            next.bounds = None;
            next.bonus = None;
            next.conversion_settled = false;
        }
        TopUpAction::ConversionSettled { derived } => {
            next.entry = state.entry.with_side(state.entry.selected.other(), derived);
            next.conversion_settled = true;
        }
        TopUpAction::LimitsLoaded(limits) => {
            next.limits = Some(limits);
        }
        TopUpAction::BoundsValidated(check) => {
            next.bounds = Some(check);
        }
        TopUpAction::BonusUpdated(bonus) => {
            next.bonus = bonus;
        }
        TopUpAction::MethodSelected(method) => {
            next.selected_method = Some(method);
        }
        TopUpAction::CurrencySwitched => {
            next.entry.selected = state.entry.selected.other();
            next.entry.raw_text = match next.entry.source() {
                AmountValue::Value(v) => v.to_compact_string(),
                AmountValue::Zero => CompactString::from("0"),
                AmountValue::Unknown => CompactString::default(),
            };
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::amount::CurrencySide;
    use rust_decimal::Decimal;

    fn method(id: &str) -> PaymentMethodData {
        PaymentMethodData {
            id: id.into(),
            label: id.to_string(),
            icon_url: None,
            min_amount: None,
            max_amount: None,
        }
    }

    fn edited(text: &str) -> TopUpState {
        reduce(
            &TopUpState::default(),
            TopUpAction::AmountEdited { text: text.into() },
        )
    }

    #[test]
    fn test_edit_sets_source_and_clears_derived() {
        let state = edited("10");
        let state = reduce(
            &state,
            TopUpAction::ConversionSettled {
                derived: AmountValue::Value(Decimal::new(2005, 1)),
            },
        );
        assert!(state.conversion_settled);
        assert_eq!(state.entry.token, AmountValue::Value(Decimal::new(2005, 1)));

        let next = reduce(&state, TopUpAction::AmountEdited { text: "11".into() });
        assert_eq!(next.entry.fiat, AmountValue::Value(Decimal::from(11)));
        assert_eq!(next.entry.token, AmountValue::Unknown);
        assert!(!next.conversion_settled);
        assert_eq!(next.bounds, None);

        // The previous snapshot is untouched.
        assert_eq!(state.entry.fiat, AmountValue::Value(Decimal::TEN));
    }

    #[test]
    fn test_unparseable_edit_leaves_state_unchanged() {
        let state = edited("10");
        for text in ["1.", "1_0", "abc"] {
            let next = reduce(&state, TopUpAction::AmountEdited { text: text.into() });
            assert_eq!(next, state, "{text}");
        }
    }

    #[test]
    fn test_switch_currency_keeps_values() {
        let state = edited("10");
        let state = reduce(
            &state,
            TopUpAction::ConversionSettled {
                derived: AmountValue::Value(Decimal::new(2005, 1)),
            },
        );
        let switched = reduce(&state, TopUpAction::CurrencySwitched);
        assert_eq!(switched.entry.selected, CurrencySide::Token);
        assert_eq!(switched.entry.raw_text, "200.5");
        assert_eq!(switched.entry.fiat, state.entry.fiat);
        assert_eq!(switched.entry.token, state.entry.token);
    }

    #[test]
    fn test_setup_drops_selection_that_is_no_longer_offered() {
        let state = reduce(
            &TopUpState::default(),
            TopUpAction::MethodSelected(method("sofort")),
        );
        let state = reduce(
            &state,
            TopUpAction::SetupLoaded {
                methods: vec![method("paypal")],
                currency: LocalCurrency::new("EUR", "€"),
            },
        );
        assert_eq!(state.selected_method, None);
        assert_eq!(state.entry.currency.code, "EUR");
    }
}
