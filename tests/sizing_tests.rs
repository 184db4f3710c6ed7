//! Proportional sizing through the public API: copy-trade planning and the
//! self-referenced flash entry case.

use rust_decimal_macros::dec;

use flashmirror::application::mirror::{plan_mirror_order, MirrorBalances, SizingConfig};
use flashmirror::domain::sizing::{self, SizingInputs};
use flashmirror::domain::{FulfillmentMode, OrderSide, OrderSize, SizingReason};
use flashmirror::testkit::domain::trade_print;

#[test]
fn leader_buy_is_scaled_to_follower_balance() {
    // Leader spends $50 of $1,000; the follower has $100.
    let trade = trade_print("t1", OrderSide::Buy, dec!(0.50), dec!(100), 0);
    let balances = MirrorBalances {
        your_usd: dec!(100),
        their_usd: dec!(950),
        ..MirrorBalances::default()
    };

    let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

    assert_eq!(order.sizing.ratio, dec!(0.1));
    assert_eq!(order.sizing.reason, SizingReason::Proportional);
    assert_eq!(order.request.size, OrderSize::Shares(dec!(10)));
    assert_eq!(order.request.side, OrderSide::Buy);
    assert_eq!(order.request.price_limit, Some(dec!(0.51)));
    assert_eq!(order.request.fulfillment, FulfillmentMode::FillAndKill);
}

#[test]
fn small_leader_buy_is_floored_to_exchange_minimum() {
    let trade = trade_print("t1", OrderSide::Buy, dec!(0.50), dec!(4), 0);
    let balances = MirrorBalances {
        your_usd: dec!(100),
        their_usd: dec!(9_998),
        ..MirrorBalances::default()
    };

    let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

    assert_eq!(order.sizing.reason, SizingReason::FloorApplied);
    assert_eq!(order.sizing.target_shares, dec!(5));
}

#[test]
fn large_leader_buy_is_capped() {
    let trade = trade_print("t1", OrderSide::Buy, dec!(0.50), dec!(1_000), 0);
    let balances = MirrorBalances {
        your_usd: dec!(10_000),
        their_usd: dec!(1_000),
        ..MirrorBalances::default()
    };

    let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

    assert_eq!(order.sizing.reason, SizingReason::CappedMax);
    assert_eq!(order.sizing.target_shares, dec!(200));
    assert_eq!(order.sizing.target_usd, dec!(100));
}

#[test]
fn follower_holding_dust_does_not_mirror_a_sell() {
    let trade = trade_print("t1", OrderSide::Sell, dec!(0.40), dec!(50), 0);
    let balances = MirrorBalances {
        your_shares: dec!(3),
        their_shares: dec!(100),
        ..MirrorBalances::default()
    };

    assert!(plan_mirror_order(&trade, balances, &SizingConfig::default()).is_none());
}

#[test]
fn sell_that_would_strand_a_remainder_liquidates() {
    let trade = trade_print("t1", OrderSide::Sell, dec!(0.50), dec!(60), 0);
    let balances = MirrorBalances {
        your_shares: dec!(12),
        their_shares: dec!(100),
        ..MirrorBalances::default()
    };

    let order = plan_mirror_order(&trade, balances, &SizingConfig::default()).expect("order");

    assert_eq!(order.sizing.reason, SizingReason::FullLiquidation);
    assert_eq!(order.request.size, OrderSize::Shares(dec!(12)));
    assert_eq!(order.request.price_limit, Some(dec!(0.49)));
}

#[test]
fn multiplier_scales_the_proportional_size() {
    let trade = trade_print("t1", OrderSide::Buy, dec!(0.25), dec!(200), 0);
    let balances = MirrorBalances {
        your_usd: dec!(500),
        their_usd: dec!(950),
        ..MirrorBalances::default()
    };
    let settings = SizingConfig {
        multiplier: dec!(2),
        ..SizingConfig::default()
    };

    let order = plan_mirror_order(&trade, balances, &settings).expect("order");

    // $50 * 0.5 * 2 = $50 at 0.25
    assert_eq!(order.sizing.target_shares, dec!(200));
}

#[test]
fn flash_entry_sizing_uses_unit_ratio() {
    let result = sizing::size(&SizingInputs::self_referenced(
        dec!(100),
        dec!(6.88),
        dec!(0.5353),
        dec!(50),
        dec!(5),
        OrderSide::Buy,
    ));

    assert_eq!(result.ratio, dec!(1));
    assert_eq!(result.target_shares, dec!(12.85));
    assert_eq!(result.reason, SizingReason::Proportional);
}

#[test]
fn certain_prices_are_not_sized() {
    let result = sizing::size(&SizingInputs::self_referenced(
        dec!(100),
        dec!(10),
        dec!(1),
        dec!(50),
        dec!(5),
        OrderSide::Buy,
    ));

    assert!(!result.is_tradeable());
    assert_eq!(result.reason, SizingReason::InvalidPrice);
}
