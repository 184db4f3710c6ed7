//! Copy-trade order planning.
//!
//! Sizes a leader's trade print for the follower account using the shared
//! proportional sizer. Submission belongs to the copy-trade executor.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

use crate::domain::sizing::{self, SizingInputs, SizingResult};
use crate::domain::{price, FulfillmentMode, OrderRequest, OrderSide, OrderSize, TradePrint};

/// Copy-trade sizing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Scales the proportional size.
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
    /// Notional cap per mirrored buy; zero disables it.
    #[serde(default = "default_max_cap_usd")]
    pub max_cap_usd: Decimal,
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
    /// Limit offset from the leader's price.
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: Decimal,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

fn default_max_cap_usd() -> Decimal {
    dec!(100)
}

fn default_min_order_size() -> Decimal {
    dec!(5)
}

fn default_slippage_pct() -> Decimal {
    dec!(0.02)
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            max_cap_usd: default_max_cap_usd(),
            min_order_size: default_min_order_size(),
            slippage_pct: default_slippage_pct(),
        }
    }
}

/// Balances for one mirror decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorBalances {
    pub your_usd: Decimal,
    pub their_usd: Decimal,
    /// Follower's shares of the traded instrument.
    pub your_shares: Decimal,
    /// Leader's shares of the traded instrument before the trade.
    pub their_shares: Decimal,
}

/// A sized order ready for the copy-trade executor.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorOrder {
    pub request: OrderRequest,
    pub sizing: SizingResult,
}

/// Size `trade` for the follower, or `None` when nothing should be sent.
#[must_use]
pub fn plan_mirror_order(
    trade: &TradePrint,
    balances: MirrorBalances,
    settings: &SizingConfig,
) -> Option<MirrorOrder> {
    let inputs = match trade.side {
        OrderSide::Buy => SizingInputs {
            your_balance: balances.your_usd,
            their_balance: balances.their_usd,
            their_trade_size: trade.notional(),
            multiplier: settings.multiplier,
            price: trade.price,
            max_cap: settings.max_cap_usd,
            min_order_size: settings.min_order_size,
            side: OrderSide::Buy,
        },
        OrderSide::Sell => SizingInputs {
            your_balance: balances.your_shares,
            their_balance: balances.their_shares,
            their_trade_size: trade.size,
            multiplier: settings.multiplier,
            price: trade.price,
            max_cap: Decimal::ZERO,
            min_order_size: settings.min_order_size,
            side: OrderSide::Sell,
        },
    };

    let sizing = sizing::size(&inputs);
    if !sizing.is_tradeable() {
        debug!(
            instrument_id = %trade.instrument_id,
            side = %trade.side,
            reason = %sizing.reason,
            "Mirror trade skipped"
        );
        return None;
    }

    let limit = match trade.side {
        OrderSide::Buy => trade.price * (Decimal::ONE + settings.slippage_pct),
        OrderSide::Sell => trade.price * (Decimal::ONE - settings.slippage_pct),
    };
    Some(MirrorOrder {
        request: OrderRequest {
            instrument_id: trade.instrument_id.clone(),
            outcome: None,
            side: trade.side,
            size: OrderSize::Shares(sizing.target_shares),
            price_limit: Some(price::clamp(limit.round_dp(4))),
            fulfillment: FulfillmentMode::FillAndKill,
        },
        sizing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SizingReason;
    use crate::testkit::domain::trade_print;

    #[test]
    fn buy_scales_by_balance_ratio() {
        let trade = trade_print("t1", OrderSide::Buy, dec!(0.50), dec!(200), 1);
        let balances = MirrorBalances {
            your_usd: dec!(100),
            their_usd: dec!(900),
            ..MirrorBalances::default()
        };

        let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

        // ratio 100 / (900 + 100) = 0.1, base $10 at 0.50
        assert_eq!(order.sizing.target_shares, dec!(20));
        assert_eq!(order.request.price_limit, Some(dec!(0.51)));
        assert_eq!(order.request.side, OrderSide::Buy);
    }

    #[test]
    fn tiny_buy_is_floored() {
        let trade = trade_print("t1", OrderSide::Buy, dec!(0.40), dec!(1), 1);
        let balances = MirrorBalances {
            your_usd: dec!(30),
            their_usd: dec!(100),
            ..MirrorBalances::default()
        };
        let settings = SizingConfig {
            min_order_size: dec!(1),
            ..SizingConfig::default()
        };

        let order = plan_mirror_order(&trade, balances, &settings).expect("order");

        assert_eq!(order.sizing.reason, SizingReason::FloorApplied);
        assert_eq!(order.sizing.target_shares, dec!(3));
    }

    #[test]
    fn dust_sell_is_skipped() {
        let trade = trade_print("t1", OrderSide::Sell, dec!(0.50), dec!(10), 1);
        let balances = MirrorBalances {
            your_shares: dec!(3),
            their_shares: dec!(100),
            ..MirrorBalances::default()
        };
        assert!(plan_mirror_order(&trade, balances, &SizingConfig::default()).is_none());
    }

    #[test]
    fn sell_leaving_dust_liquidates() {
        let trade = trade_print("t1", OrderSide::Sell, dec!(0.50), dec!(75), 1);
        let balances = MirrorBalances {
            your_shares: dec!(12),
            their_shares: dec!(100),
            ..MirrorBalances::default()
        };

        let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

        assert_eq!(order.sizing.reason, SizingReason::FullLiquidation);
        assert_eq!(order.request.size, OrderSize::Shares(dec!(12)));
    }
}
