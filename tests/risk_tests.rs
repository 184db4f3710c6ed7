//! Risk vetoes and portfolio limits as seen by the execution engine.

use std::sync::Arc;

use rust_decimal_macros::dec;

use flashmirror::application::execution::{ExecutionConfig, ExecutionEngine, KillSwitch};
use flashmirror::application::risk::{PortfolioConfig, PortfolioLimits, RiskConfig, RiskEngine};
use flashmirror::domain::{CloseReason, DetectionEvent, Direction, InstrumentId, OrderSide};
use flashmirror::testkit::domain::{detection, AFTERNOON_MS};
use flashmirror::testkit::order::MockOrderAdapter;

const NOW: i64 = AFTERNOON_MS;

fn engine_with(
    execution: ExecutionConfig,
    portfolio: PortfolioConfig,
) -> (ExecutionEngine, Arc<MockOrderAdapter>) {
    let adapter = Arc::new(MockOrderAdapter::new(dec!(1_000)));
    let risk = RiskConfig::default();
    let engine = ExecutionEngine::new(
        execution,
        KillSwitch::from(&risk),
        PortfolioLimits::new(portfolio),
        adapter.clone(),
    );
    (engine, adapter)
}

async fn run(engine: &mut ExecutionEngine, event: &DetectionEvent, now_ms: i64) -> (bool, String) {
    let assessment = RiskEngine::new(RiskConfig::default()).assess(event);
    let execution = engine.execute(event, &assessment, None, now_ms).await;
    (
        execution.result.success,
        execution.result.error_msg.unwrap_or_default(),
    )
}

#[tokio::test]
async fn entries_clustered_in_time_are_vetoed() {
    let (mut engine, _) = engine_with(
        ExecutionConfig::default(),
        PortfolioConfig {
            max_correlated_entries: 2,
            ..PortfolioConfig::default()
        },
    );

    assert!(run(&mut engine, &detection("a").build(), NOW).await.0);
    assert!(run(&mut engine, &detection("b").build(), NOW).await.0);
    let (ok, error) = run(&mut engine, &detection("c").build(), NOW + 1_000).await;
    assert!(!ok);
    assert!(error.contains("correlated"), "{error}");

    // Once the window has passed the same entry is allowed.
    assert!(run(&mut engine, &detection("c").build(), NOW + 31_000).await.0);
}

#[tokio::test]
async fn exposure_limit_blocks_second_entry_until_exit() {
    let (mut engine, _) = engine_with(
        ExecutionConfig::default(),
        PortfolioConfig {
            max_exposure_usd: dec!(15),
            ..PortfolioConfig::default()
        },
    );

    assert!(run(&mut engine, &detection("a").build(), NOW).await.0);
    let (ok, error) = run(&mut engine, &detection("b").build(), NOW).await;
    assert!(!ok);
    assert!(error.contains("exposure"), "{error}");

    let closed = engine
        .close(&InstrumentId::from("a"), CloseReason::Manual, NOW + 1_000)
        .await
        .expect("closed");
    assert_eq!(closed.reason, CloseReason::Manual);
    assert_eq!(engine.portfolio().exposure(), dec!(0));
    assert!(run(&mut engine, &detection("b").build(), NOW + 2_000).await.0);
}

#[tokio::test]
async fn detector_hint_can_trip_the_kill_switch() {
    let (mut engine, adapter) = engine_with(ExecutionConfig::default(), PortfolioConfig::default());
    let event = detection("a").hint(95.0).build();

    let assessment = RiskEngine::new(RiskConfig::default()).assess(&event);
    assert!(!assessment.too_risky);

    let (ok, error) = run(&mut engine, &event, NOW).await;
    assert!(!ok);
    assert!(error.contains("kill switch"), "{error}");
    assert!(adapter.orders().is_empty());
}

#[tokio::test]
async fn per_account_position_ceiling_applies_before_portfolio_limits() {
    let (mut engine, _) = engine_with(
        ExecutionConfig {
            max_concurrent_positions: 2,
            ..ExecutionConfig::default()
        },
        PortfolioConfig::default(),
    );

    assert!(run(&mut engine, &detection("a").build(), NOW).await.0);
    assert!(run(&mut engine, &detection("b").build(), NOW).await.0);
    let (ok, error) = run(&mut engine, &detection("c").build(), NOW).await;

    assert!(!ok);
    assert!(error.contains("max concurrent positions"), "{error}");
    assert_eq!(engine.open_positions(), 2);
}

#[tokio::test]
async fn second_detection_on_open_instrument_is_refused() {
    let (mut engine, adapter) = engine_with(ExecutionConfig::default(), PortfolioConfig::default());

    assert!(run(&mut engine, &detection("a").build(), NOW).await.0);
    let (ok, error) = run(&mut engine, &detection("a").build(), NOW + 500).await;

    assert!(!ok);
    assert!(error.contains("already open"), "{error}");
    assert_eq!(adapter.orders().len(), 1);
}

#[tokio::test]
async fn downward_flash_opens_short_with_inverted_bounds() {
    let (mut engine, adapter) = engine_with(ExecutionConfig::default(), PortfolioConfig::default());
    let event = detection("a")
        .velocity(-0.06)
        .prices(dec!(0.53), dec!(0.50))
        .build();

    assert!(run(&mut engine, &event, NOW).await.0);

    let position = engine.position(&InstrumentId::from("a")).expect("position");
    assert_eq!(position.direction(), Direction::Short);
    assert_eq!(adapter.orders()[0].side, OrderSide::Sell);
    // Aggressive entries give up 2% on sells.
    assert_eq!(position.entry_price(), dec!(0.49));
    assert!(position.take_profit_price() < position.entry_price());
    assert!(position.stop_loss_price() > position.entry_price());
}
