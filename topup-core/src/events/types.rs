//! Event type definitions for a top-up session.
//!
//! `SessionEvent`s flow in from the presentation layer, `AmountInput`s are
//! routed from the session to the amount pipeline, and `UiEffect`s flow back
//! out to the presentation layer.

use compact_str::CompactString;
use rust_decimal::Decimal;
use topup_sdk::objects::{PaymentAction, PaymentMethodData, TransactionStatus};

use crate::state::{AmountEntry, CurrencySide, LocalCurrency};

/// Data the presentation layer attaches to a submit click.
#[derive(Debug, Clone)]
pub struct PaymentSubmission {
    /// Provider payment method payload (card form output, paypal token, ...).
    pub payment: serde_json::Value,
    pub return_url: String,
}

/// Events emitted by the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Raw text of the amount field changed.
    AmountChanged(String),
    /// The user swapped the typed side between fiat and token.
    ChangeCurrencyClicked,
    PaymentMethodSelected(CompactString),
    NextClicked(PaymentSubmission),
    /// The user came back from a redirect or 3DS challenge.
    RedirectReturned {
        uid: String,
        details: serde_json::Value,
        payment_data: Option<String>,
    },
}

/// Inputs of the amount pipeline.
#[derive(Debug, Clone)]
pub enum AmountInput {
    /// Payment methods and local currency are known.
    Setup {
        methods: Vec<PaymentMethodData>,
        currency: LocalCurrency,
    },
    Edit(CompactString),
    SwitchCurrency,
    SelectMethod(PaymentMethodData),
}

/// Side effects for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    SetupUi {
        methods: Vec<PaymentMethodData>,
        currency: LocalCurrency,
    },
    SetSubmitEnabled(bool),
    /// The derived side of the amount settled.
    ConversionValue(AmountEntry),
    CurrencySwitched(CurrencySide),
    ShowMinValueWarning(String),
    ShowMaxValueWarning(String),
    HideValueWarning,
    /// Whether the typed amount is within the top-up limits.
    MainValueValid(bool),
    ShowBonus {
        amount: Decimal,
        currency: CompactString,
    },
    HideBonus,
    ShowLoading,
    /// The payment needs the user to visit the provider.
    Redirect {
        uid: Option<String>,
        action: PaymentAction,
    },
    PaymentFinished {
        uid: String,
        status: TransactionStatus,
    },
    PaymentFailed {
        message: String,
    },
}

impl std::fmt::Display for UiEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiEffect::SetupUi { methods, currency } => {
                let ids: Vec<&str> = methods.iter().map(|m| m.id.as_str()).collect();
                write!(f, "setup: methods [{}], currency {}", ids.join(", "), currency.code)
            }
            UiEffect::SetSubmitEnabled(enabled) => write!(f, "submit enabled: {enabled}"),
            UiEffect::ConversionValue(entry) => write!(
                f,
                "amount: {} {} = {} APPC",
                entry.fiat.display(),
                entry.currency.code,
                entry.token.display()
            ),
            UiEffect::CurrencySwitched(side) => write!(f, "typing in {side}"),
            UiEffect::ShowMinValueWarning(min) => write!(f, "minimum top-up is {min}"),
            UiEffect::ShowMaxValueWarning(max) => write!(f, "maximum top-up is {max}"),
            UiEffect::HideValueWarning => write!(f, "amount within limits"),
            UiEffect::MainValueValid(valid) => write!(f, "amount valid: {valid}"),
            UiEffect::ShowBonus { amount, currency } => write!(f, "bonus: {amount} {currency}"),
            UiEffect::HideBonus => write!(f, "no bonus"),
            UiEffect::ShowLoading => write!(f, "processing payment..."),
            UiEffect::Redirect { action, .. } => write!(
                f,
                "continue payment at {}",
                action.url.as_deref().unwrap_or("<provider component>")
            ),
            UiEffect::PaymentFinished { uid, status } => {
                write!(f, "transaction {uid} finished: {status}")
            }
            UiEffect::PaymentFailed { message } => write!(f, "payment failed: {message}"),
        }
    }
}
