//! Limit-price derivation for entries and exits.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{price, OrderSide, Strategy};

const AGGRESSIVE_OFFSET: Decimal = dec!(0.02);
const CONSERVATIVE_OFFSET: Decimal = dec!(0.01);
const ADAPTIVE_BASE: Decimal = dec!(0.01);
const ADAPTIVE_MAX: Decimal = dec!(0.02);

/// Fractional offset from the observed price for an entry.
///
/// Aggressive entries cross by up to 2% (bounded by the assessment's
/// slippage allowance), conservative by 1%, adaptive by 1% plus 1% scaled
/// by the risk score, at most 2%.
#[must_use]
pub fn entry_offset(strategy: Strategy, risk_score: f64, max_slippage: Decimal) -> Decimal {
    match strategy {
        Strategy::Aggressive => AGGRESSIVE_OFFSET.min(max_slippage),
        Strategy::Conservative => CONSERVATIVE_OFFSET,
        Strategy::Adaptive => {
            let scaled = Decimal::from_f64(risk_score.clamp(0.0, 100.0) / 100.0)
                .unwrap_or(Decimal::ZERO);
            (ADAPTIVE_BASE + ADAPTIVE_BASE * scaled).round_dp(4).min(ADAPTIVE_MAX)
        }
    }
}

/// Entry limit: pay up for buys, give in for sells.
#[must_use]
pub fn entry_limit(observed: Decimal, side: OrderSide, offset: Decimal) -> Decimal {
    let limit = match side {
        OrderSide::Buy => observed * (Decimal::ONE + offset),
        OrderSide::Sell => observed * (Decimal::ONE - offset),
    };
    price::clamp(limit.round_dp(4))
}

/// Exit limit, deliberately unfavourable so the close fills.
#[must_use]
pub fn exit_limit(current: Decimal, side: OrderSide, offset: Decimal) -> Decimal {
    entry_limit(current, side, offset)
}

/// Relative distance between the fill and the observed price.
#[must_use]
pub fn slippage(observed: Decimal, filled: Decimal) -> Decimal {
    if observed.is_zero() {
        return Decimal::ZERO;
    }
    ((filled - observed).abs() / observed).round_dp(4)
}
