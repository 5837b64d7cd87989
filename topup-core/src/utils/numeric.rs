//! Validation of user-typed amounts.
#![allow(clippy::expect_used)]

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Optionally signed decimal, e.g. `12`, `-3`, `0.50`.
    static ref NUMERIC: Regex =
        Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("numeric pattern is valid");
    /// Unsigned decimal accepted by the conversion endpoint.
    static ref NON_NEGATIVE: Regex =
        Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("non-negative pattern is valid");
}

pub fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text)
}

pub fn is_non_negative_decimal(text: &str) -> bool {
    NON_NEGATIVE.is_match(text)
}
