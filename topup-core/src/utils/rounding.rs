use rust_decimal::{Decimal, RoundingStrategy};

/// Largest scale a [`Decimal`] can carry.
pub const MAX_SCALE: u32 = 28;

/// Truncates `value` toward negative infinity, keeping `scale` decimal
/// digits. The result always carries exactly `scale` digits, so `2.5` at
/// scale 2 renders as `2.50`.
pub fn floor_to_scale(value: Decimal, scale: u32) -> Decimal {
    let scale = scale.min(MAX_SCALE);
    let mut floored = value.round_dp_with_strategy(scale, RoundingStrategy::ToNegativeInfinity);
    floored.rescale(scale);
    floored
}
