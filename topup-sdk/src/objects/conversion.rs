//! Exchange broker conversion types.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw response of `GET /broker/{version}/exchanges/{currency}/convert/{value}`.
///
/// The converted amount is named `appcValue` on the wire regardless of the
/// direction of the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponseBody {
    #[serde(rename = "appcValue")]
    pub appc_value: Decimal,
    pub currency: CompactString,
    pub symbol: CompactString,
}

/// A converted amount together with the currency it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionResult {
    pub amount: Decimal,
    pub currency: CompactString,
    pub symbol: CompactString,
}

impl ConversionResult {
    pub fn new(
        amount: Decimal,
        currency: impl Into<CompactString>,
        symbol: impl Into<CompactString>,
    ) -> Self {
        Self {
            amount,
            currency: currency.into(),
            symbol: symbol.into(),
        }
    }

    /// A zero amount with no currency attached.
    ///
    /// Used as a neutral value when a conversion result is chained into
    /// another computation and the conversion could not be performed.
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, "", "")
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Minimum and maximum amount accepted for a top-up, in local fiat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpLimits {
    pub min: ConversionResult,
    pub max: ConversionResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_response_body_accepts_numeric_value() {
        let body: ConversionResponseBody = serde_json::from_str(
            r#"{"appcValue": 2.567, "currency": "EUR", "symbol": "€"}"#,
        )
        .unwrap();
        assert_eq!(body.appc_value, Decimal::from_str("2.567").unwrap());
        assert_eq!(body.currency, "EUR");
        assert_eq!(body.symbol, "€");
    }

    #[test]
    fn test_zero_result() {
        assert!(ConversionResult::zero().is_zero());
        assert!(!ConversionResult::new(Decimal::ONE, "USD", "$").is_zero());
    }
}
