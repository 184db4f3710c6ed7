//! Price helpers for binary outcome tokens.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Lowest tradeable price.
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
/// Highest tradeable price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/// Clamp a price into the tradeable range `[0.01, 0.99]`.
#[must_use]
pub fn clamp(price: Decimal) -> Decimal {
    price.max(MIN_PRICE).min(MAX_PRICE)
}

/// Lossy conversion for signal arithmetic.
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Conversion back from signal arithmetic; non-finite values become zero.
#[must_use]
pub fn from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn constants_match_tick_bounds() {
        assert_eq!(MIN_PRICE, dec!(0.01));
        assert_eq!(MAX_PRICE, dec!(0.99));
    }

    #[test]
    fn clamp_keeps_prices_tradeable() {
        assert_eq!(clamp(dec!(1.2)), dec!(0.99));
        assert_eq!(clamp(dec!(0.001)), dec!(0.01));
        assert_eq!(clamp(dec!(0.42)), dec!(0.42));
    }
}
