pub mod debounce;
pub mod numeric;
pub mod rounding;
pub mod switch_latest;
