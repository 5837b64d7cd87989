use compact_str::{CompactString, ToCompactString};
use rust_decimal::Decimal;
use std::str::FromStr;
use topup_sdk::objects::ConversionResult;

use crate::utils::numeric::is_numeric;

/// Text shown for an amount that is empty, not yet computed or zero.
pub const EMPTY_DISPLAY: &str = "--";

/// Which side of the amount field the user is typing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurrencySide {
    /// Local fiat currency.
    #[default]
    Fiat,
    /// Wallet token (APPC).
    Token,
}

impl CurrencySide {
    pub fn other(self) -> Self {
        match self {
            CurrencySide::Fiat => CurrencySide::Token,
            CurrencySide::Token => CurrencySide::Fiat,
        }
    }
}

impl std::fmt::Display for CurrencySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencySide::Fiat => write!(f, "fiat"),
            CurrencySide::Token => write!(f, "token"),
        }
    }
}

/// Amount held by one side of the entry.
///
/// `Unknown` (empty input, or a derived value not computed yet) is kept
/// apart from `Zero` (a value that is known to be zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AmountValue {
    #[default]
    Unknown,
    Zero,
    Value(Decimal),
}

impl AmountValue {
    /// Parses user input. Empty text is `Unknown`; `None` means the text
    /// does not match the numeric pattern (`-?\d+(\.\d+)?`).
    pub fn from_text(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(AmountValue::Unknown);
        }
        if !is_numeric(text) {
            return None;
        }
        Decimal::from_str(text).ok().map(Self::from_decimal)
    }

    pub fn from_decimal(amount: Decimal) -> Self {
        if amount.is_zero() {
            AmountValue::Zero
        } else {
            AmountValue::Value(amount)
        }
    }

    pub fn from_conversion(result: &ConversionResult) -> Self {
        Self::from_decimal(result.amount)
    }

    /// The amount if it is known, zero included.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            AmountValue::Unknown => None,
            AmountValue::Zero => Some(Decimal::ZERO),
            AmountValue::Value(v) => Some(*v),
        }
    }

    /// The amount if it is known and strictly positive.
    pub fn positive(&self) -> Option<Decimal> {
        match self {
            AmountValue::Value(v) if *v > Decimal::ZERO => Some(*v),
            _ => None,
        }
    }

    /// Text for the amount field. Zero and unknown both render as
    /// [`EMPTY_DISPLAY`].
    pub fn display(&self) -> CompactString {
        match self {
            AmountValue::Value(v) => v.to_compact_string(),
            AmountValue::Unknown | AmountValue::Zero => CompactString::from(EMPTY_DISPLAY),
        }
    }
}

/// Local fiat currency of the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LocalCurrency {
    pub code: CompactString,
    pub symbol: CompactString,
}

impl LocalCurrency {
    pub fn new(code: impl Into<CompactString>, symbol: impl Into<CompactString>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
        }
    }
}

impl From<&ConversionResult> for LocalCurrency {
    fn from(result: &ConversionResult) -> Self {
        Self::new(result.currency.clone(), result.symbol.clone())
    }
}

/// Both sides of the top-up amount field.
///
/// `selected` is the source of truth; the other side is derived from it by
/// conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmountEntry {
    /// Text as typed on the selected side.
    pub raw_text: CompactString,
    pub selected: CurrencySide,
    pub fiat: AmountValue,
    pub token: AmountValue,
    pub currency: LocalCurrency,
}

impl AmountEntry {
    pub fn new(currency: LocalCurrency) -> Self {
        Self {
            currency,
            ..Default::default()
        }
    }

    pub fn side(&self, side: CurrencySide) -> &AmountValue {
        match side {
            CurrencySide::Fiat => &self.fiat,
            CurrencySide::Token => &self.token,
        }
    }

    pub fn source(&self) -> &AmountValue {
        self.side(self.selected)
    }

    pub fn derived(&self) -> &AmountValue {
        self.side(self.selected.other())
    }

    /// Copy of the entry with `side` set to `value`.
    pub fn with_side(&self, side: CurrencySide, value: AmountValue) -> Self {
        let mut next = self.clone();
        match side {
            CurrencySide::Fiat => next.fiat = value,
            CurrencySide::Token => next.token = value,
        }
        next
    }
}
