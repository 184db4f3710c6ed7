//! Proportional order sizing shared by flash trading and copy trading.
//!
//! [`size`] converts a reference trade plus balances into a final order
//! size, applying the $1 notional floor, caps, and the exchange-minimum
//! dust rules. It is a pure function of its inputs.
//!
//! Units depend on the side:
//!
//! - **Buy**: balances, trade size and cap are USD notionals.
//! - **Sell**: balances and trade size are share counts; the cap is ignored
//!   because capping a sell could strand an unsellable remainder.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::execution::OrderSide;

/// Smallest notional the exchange accepts for a marketable order.
pub const NOTIONAL_FLOOR_USD: Decimal = Decimal::ONE;

/// Inputs for one sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingInputs {
    /// Own balance: USD for buys, shares held for sells.
    pub your_balance: Decimal,
    /// Reference balance: USD for buys, shares held before the trade for sells.
    pub their_balance: Decimal,
    /// Reference trade: USD for buys, shares for sells.
    pub their_trade_size: Decimal,
    pub multiplier: Decimal,
    pub price: Decimal,
    /// Maximum notional per order (buys only); zero disables the cap.
    pub max_cap: Decimal,
    /// Exchange minimum order size in shares.
    pub min_order_size: Decimal,
    pub side: OrderSide,
}

impl SizingInputs {
    /// Inputs where the account is its own reference, so the ratio is 1.
    ///
    /// Used by flash entries: the risk engine's recommended notional is the
    /// reference trade and the floor/cap/dust rules apply unchanged.
    #[must_use]
    pub fn self_referenced(
        balance: Decimal,
        trade_size: Decimal,
        price: Decimal,
        max_cap: Decimal,
        min_order_size: Decimal,
        side: OrderSide,
    ) -> Self {
        let their_balance = match side {
            OrderSide::Buy => (balance - trade_size).max(Decimal::ZERO),
            OrderSide::Sell => balance,
        };
        Self {
            your_balance: balance,
            their_balance,
            their_trade_size: trade_size,
            multiplier: Decimal::ONE,
            price,
            max_cap,
            min_order_size,
            side,
        }
    }
}

/// Which rule produced the final size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingReason {
    Proportional,
    FloorApplied,
    CappedMax,
    CappedBalance,
    DustTrapDetected,
    FullLiquidation,
    BelowMinimumAfterCap,
    InsufficientBalance,
    InvalidPrice,
}

impl SizingReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proportional => "proportional",
            Self::FloorApplied => "floor_applied",
            Self::CappedMax => "capped_max",
            Self::CappedBalance => "capped_balance",
            Self::DustTrapDetected => "dust_trap_detected",
            Self::FullLiquidation => "full_liquidation",
            Self::BelowMinimumAfterCap => "below_minimum_after_cap",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidPrice => "invalid_price",
        }
    }
}

impl fmt::Display for SizingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final order size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingResult {
    pub target_shares: Decimal,
    pub target_usd: Decimal,
    /// Own balance divided by the reference balance.
    pub ratio: Decimal,
    pub reason: SizingReason,
}

impl SizingResult {
    fn zero(ratio: Decimal, reason: SizingReason) -> Self {
        Self {
            target_shares: Decimal::ZERO,
            target_usd: Decimal::ZERO,
            ratio,
            reason,
        }
    }

    fn shares(shares: Decimal, price: Decimal, ratio: Decimal, reason: SizingReason) -> Self {
        Self {
            target_shares: shares,
            target_usd: shares * price,
            ratio,
            reason,
        }
    }

    /// True when there is something to submit.
    #[must_use]
    pub fn is_tradeable(&self) -> bool {
        self.target_shares > Decimal::ZERO
    }
}

/// Compute the order size for `inputs`.
#[must_use]
pub fn size(inputs: &SizingInputs) -> SizingResult {
    if inputs.price <= Decimal::ZERO || inputs.price >= Decimal::ONE {
        return SizingResult::zero(Decimal::ZERO, SizingReason::InvalidPrice);
    }
    match inputs.side {
        OrderSide::Buy => size_buy(inputs),
        OrderSide::Sell => size_sell(inputs),
    }
}

fn round_down(shares: Decimal) -> Decimal {
    shares.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

fn round_up(shares: Decimal) -> Decimal {
    shares.round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}

fn size_buy(inputs: &SizingInputs) -> SizingResult {
    let price = inputs.price;
    let denominator = (inputs.their_balance + inputs.their_trade_size).max(Decimal::ONE);
    let ratio = inputs.your_balance.max(Decimal::ZERO) / denominator;

    if inputs.your_balance <= Decimal::ZERO {
        return SizingResult::zero(ratio, SizingReason::InsufficientBalance);
    }

    let base_usd = inputs.their_trade_size * ratio * inputs.multiplier;
    let min_shares = round_up(inputs.min_order_size);

    // Floor first, then caps: a cap must be able to override the round-up.
    // Rounding shares down can also sink a $1+ target under the floor.
    let proportional = round_down(base_usd / price);
    let (mut shares, mut reason) =
        if base_usd < NOTIONAL_FLOOR_USD || proportional * price < NOTIONAL_FLOOR_USD {
            let floor_shares = (NOTIONAL_FLOOR_USD / price).ceil();
            (floor_shares.max(min_shares), SizingReason::FloorApplied)
        } else if proportional < min_shares {
            (min_shares, SizingReason::FloorApplied)
        } else {
            (proportional, SizingReason::Proportional)
        };

    if inputs.max_cap > Decimal::ZERO && shares * price > inputs.max_cap {
        shares = round_down(inputs.max_cap / price);
        reason = SizingReason::CappedMax;
    }
    if shares * price > inputs.your_balance {
        shares = round_down(inputs.your_balance / price);
        reason = SizingReason::CappedBalance;
    }

    if shares < min_shares || shares * price < NOTIONAL_FLOOR_USD {
        return SizingResult::zero(ratio, SizingReason::BelowMinimumAfterCap);
    }

    SizingResult::shares(shares, price, ratio, reason)
}

fn size_sell(inputs: &SizingInputs) -> SizingResult {
    let price = inputs.price;
    let held = inputs.your_balance;
    let min_shares = inputs.min_order_size;
    let ratio = held.max(Decimal::ZERO) / inputs.their_balance.max(Decimal::ONE);

    if held < min_shares || held <= Decimal::ZERO {
        return SizingResult::zero(ratio, SizingReason::DustTrapDetected);
    }

    let mut reason = SizingReason::Proportional;
    let mut target = round_up(inputs.their_trade_size * ratio * inputs.multiplier);
    if target < min_shares {
        target = min_shares;
        reason = SizingReason::FloorApplied;
    }
    if target > held {
        target = held;
        reason = SizingReason::CappedBalance;
    }

    let remainder = held - target;
    if remainder > Decimal::ZERO && remainder < min_shares {
        target = held;
        reason = SizingReason::FullLiquidation;
    }

    SizingResult::shares(target, price, ratio, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy(your: Decimal, their: Decimal, trade: Decimal, price: Decimal) -> SizingInputs {
        SizingInputs {
            your_balance: your,
            their_balance: their,
            their_trade_size: trade,
            multiplier: dec!(1),
            price,
            max_cap: dec!(0),
            min_order_size: dec!(1),
            side: OrderSide::Buy,
        }
    }

    fn sell(held: Decimal, their_held: Decimal, sold: Decimal) -> SizingInputs {
        SizingInputs {
            your_balance: held,
            their_balance: their_held,
            their_trade_size: sold,
            multiplier: dec!(1),
            price: dec!(0.50),
            max_cap: dec!(0),
            min_order_size: dec!(5),
            side: OrderSide::Sell,
        }
    }

    #[test]
    fn buy_ratio_includes_their_trade() {
        // 100 / (900 + 100) = 0.1, so $100 becomes $10.
        let result = size(&buy(dec!(100), dec!(900), dec!(100), dec!(0.50)));
        assert_eq!(result.ratio, dec!(0.1));
        assert_eq!(result.target_usd, dec!(10));
        assert_eq!(result.target_shares, dec!(20));
        assert_eq!(result.reason, SizingReason::Proportional);
    }

    #[test]
    fn buy_below_floor_rounds_up_to_whole_shares() {
        // ratio 0.1 on a $3 trade = $0.30 at 0.40.
        let result = size(&buy(dec!(10), dec!(97), dec!(3), dec!(0.40)));
        assert_eq!(result.target_shares, dec!(3));
        assert_eq!(result.target_usd, dec!(1.20));
        assert_eq!(result.reason, SizingReason::FloorApplied);
    }

    #[test]
    fn rounding_down_never_drops_a_dollar_buy() {
        // Ratio 1 on a $1 trade; 3.03 shares at 0.33 is only $0.9999.
        let result = size(&buy(dec!(100), dec!(99), dec!(1), dec!(0.33)));
        assert_eq!(result.target_shares, dec!(4));
        assert_eq!(result.target_usd, dec!(1.32));
        assert_eq!(result.reason, SizingReason::FloorApplied);
    }

    #[test]
    fn floor_respects_exchange_minimum() {
        let mut inputs = buy(dec!(10), dec!(97), dec!(3), dec!(0.40));
        inputs.min_order_size = dec!(5);
        let result = size(&inputs);
        assert_eq!(result.target_shares, dec!(5));
    }

    #[test]
    fn cap_applies_after_floor() {
        let mut inputs = buy(dec!(1000), dec!(0), dec!(500), dec!(0.50));
        inputs.max_cap = dec!(50);
        let result = size(&inputs);
        assert_eq!(result.target_shares, dec!(100));
        assert_eq!(result.target_usd, dec!(50));
        assert_eq!(result.reason, SizingReason::CappedMax);
    }

    #[test]
    fn balance_cap_applies_last() {
        let mut inputs = buy(dec!(20), dec!(0), dec!(500), dec!(0.50));
        inputs.multiplier = dec!(3);
        inputs.max_cap = dec!(100);
        let result = size(&inputs);
        assert_eq!(result.target_usd, dec!(20));
        assert_eq!(result.reason, SizingReason::CappedBalance);
    }

    #[test]
    fn cap_below_floor_yields_nothing() {
        let mut inputs = buy(dec!(10), dec!(97), dec!(3), dec!(0.40));
        inputs.max_cap = dec!(0.50);
        let result = size(&inputs);
        assert!(!result.is_tradeable());
        assert_eq!(result.reason, SizingReason::BelowMinimumAfterCap);
    }

    #[test]
    fn empty_balance_is_insufficient() {
        let result = size(&buy(dec!(0), dec!(100), dec!(10), dec!(0.50)));
        assert_eq!(result.reason, SizingReason::InsufficientBalance);
    }

    #[test]
    fn invalid_price_is_rejected() {
        let result = size(&buy(dec!(100), dec!(100), dec!(10), dec!(1)));
        assert_eq!(result.reason, SizingReason::InvalidPrice);
    }

    #[test]
    fn sell_dust_is_never_sold() {
        for sold in [dec!(1), dec!(3), dec!(50)] {
            let result = size(&sell(dec!(3), dec!(10), sold));
            assert_eq!(result.target_shares, dec!(0));
            assert_eq!(result.reason, SizingReason::DustTrapDetected);
        }
    }

    #[test]
    fn sell_liquidates_when_remainder_would_be_dust() {
        let result = size(&sell(dec!(12), dec!(12), dec!(9)));
        assert_eq!(result.target_shares, dec!(12));
        assert_eq!(result.reason, SizingReason::FullLiquidation);
    }

    #[test]
    fn sell_rounds_small_targets_up_to_minimum() {
        let result = size(&sell(dec!(100), dec!(100), dec!(2)));
        assert_eq!(result.target_shares, dec!(5));
        assert_eq!(result.reason, SizingReason::FloorApplied);
    }

    #[test]
    fn repeated_calls_agree() {
        let inputs = buy(dec!(250), dec!(4000), dec!(300), dec!(0.37));
        let first = size(&inputs);
        for _ in 0..3 {
            assert_eq!(size(&inputs), first);
        }
    }

    #[test]
    fn self_referenced_buy_has_unit_ratio() {
        let inputs = SizingInputs::self_referenced(
            dec!(500),
            dec!(25),
            dec!(0.50),
            dec!(100),
            dec!(5),
            OrderSide::Buy,
        );
        let result = size(&inputs);
        assert_eq!(result.ratio, dec!(1));
        assert_eq!(result.target_usd, dec!(25));
    }
}
