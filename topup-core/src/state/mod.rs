//! Immutable state snapshots of a top-up screen.
//!
//! Every transition produces a new [`TopUpState`] through [`reduce`];
//! nothing mutates a published snapshot.

pub mod amount;
pub mod reducer;

pub use amount::{AmountEntry, AmountValue, CurrencySide, EMPTY_DISPLAY, LocalCurrency};
pub use reducer::{TopUpAction, TopUpState, reduce};
