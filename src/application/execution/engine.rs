//! Turns approved detections into orders and manages the resulting positions.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::pricing;
use super::ExecutionConfig;
use crate::application::risk::{PortfolioLimits, RiskConfig};
use crate::domain::sizing::{self, SizingInputs};
use crate::domain::{
    CloseReason, DetectionEvent, ExecutionResult, ExitBounds, FulfillmentMode, InstrumentId,
    OrderRequest, OrderSide, OrderSize, RiskAssessment, TrackedPosition,
};
use crate::error::ExecutionError;
use crate::port::outbound::order::OrderAdapter;

/// Kill-switch ceiling consulted before every entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillSwitch {
    pub armed: bool,
    pub ceiling: f64,
}

impl KillSwitch {
    /// Returns the offending score when the switch trips.
    #[must_use]
    pub fn trips(&self, risk_score: f64, risk_score_hint: f64) -> Option<f64> {
        if !self.armed {
            return None;
        }
        let score = risk_score.max(risk_score_hint);
        (score > self.ceiling).then_some(score)
    }
}

impl From<&RiskConfig> for KillSwitch {
    fn from(config: &RiskConfig) -> Self {
        Self {
            armed: config.kill_switch_enabled,
            ceiling: config.kill_switch_score,
        }
    }
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: ExecutionResult,
    /// Position opened by a successful entry.
    pub position: Option<TrackedPosition>,
}

/// A position that left the book, with the exit order's outcome.
#[derive(Debug, Clone)]
pub struct ClosedPosition {
    pub position: TrackedPosition,
    pub reason: CloseReason,
    /// Fill price of the exit order, `None` if the exit failed.
    pub exit_price: Option<Decimal>,
    pub timestamp_ms: i64,
}

/// Per-account execution engine.
///
/// Owns the account's open flash positions; nothing else mutates them.
pub struct ExecutionEngine {
    config: ExecutionConfig,
    kill_switch: KillSwitch,
    portfolio: PortfolioLimits,
    adapter: Arc<dyn OrderAdapter>,
    positions: HashMap<InstrumentId, TrackedPosition>,
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(
        config: ExecutionConfig,
        kill_switch: KillSwitch,
        portfolio: PortfolioLimits,
        adapter: Arc<dyn OrderAdapter>,
    ) -> Self {
        Self {
            config,
            kill_switch,
            portfolio,
            adapter,
            positions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn OrderAdapter> {
        &self.adapter
    }

    #[must_use]
    pub fn position(&self, instrument_id: &InstrumentId) -> Option<&TrackedPosition> {
        self.positions.get(instrument_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &TrackedPosition> {
        self.positions.values()
    }

    #[must_use]
    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub const fn portfolio(&self) -> &PortfolioLimits {
        &self.portfolio
    }

    /// Execute an assessed detection.
    ///
    /// Every refusal or failure is reported as an unsuccessful
    /// [`ExecutionResult`]; the same detection is never retried.
    pub async fn execute(
        &mut self,
        event: &DetectionEvent,
        assessment: &RiskAssessment,
        outcome: Option<String>,
        now_ms: i64,
    ) -> Execution {
        let started = Instant::now();
        let strategy = assessment.recommended_strategy;

        match self.try_execute(event, assessment, outcome, now_ms, started).await {
            Ok((result, position)) => {
                info!(
                    instrument_id = %event.instrument_id,
                    strategy = %strategy,
                    shares = %result.shares_filled,
                    price = %result.price_filled,
                    take_profit = %position.take_profit_price(),
                    stop_loss = %position.stop_loss_price(),
                    "Flash position opened"
                );
                Execution {
                    result,
                    position: Some(position),
                }
            }
            Err(e) => {
                match &e {
                    ExecutionError::Vetoed { .. }
                    | ExecutionError::KillSwitch { .. }
                    | ExecutionError::DuplicatePosition { .. }
                    | ExecutionError::PositionCeiling { .. }
                    | ExecutionError::Limit(_)
                    | ExecutionError::Unsizeable { .. } => {
                        info!(instrument_id = %event.instrument_id, reason = %e, "Execution skipped");
                    }
                    _ => {
                        warn!(instrument_id = %event.instrument_id, error = %e, "Execution failed");
                    }
                }
                Execution {
                    result: ExecutionResult::failed(strategy, e.to_string(), elapsed_ms(started)),
                    position: None,
                }
            }
        }
    }

    async fn try_execute(
        &mut self,
        event: &DetectionEvent,
        assessment: &RiskAssessment,
        outcome: Option<String>,
        now_ms: i64,
        started: Instant,
    ) -> Result<(ExecutionResult, TrackedPosition), ExecutionError> {
        self.precheck(event, assessment)?;

        let strategy = assessment.recommended_strategy;
        let direction = event.direction();
        let side = OrderSide::opening(direction);

        let observed = match self.adapter.market_price(&event.instrument_id, side).await {
            Ok(price) => price,
            Err(e) => {
                debug!(instrument_id = %event.instrument_id, error = %e, "No quote, using detection price");
                event.new_price
            }
        };

        let drift = pricing::slippage(event.new_price, observed);
        if drift > assessment.max_slippage_pct {
            return Err(ExecutionError::SlippageExceeded {
                actual: drift,
                max: assessment.max_slippage_pct,
            });
        }

        let offset = pricing::entry_offset(strategy, assessment.risk_score, assessment.max_slippage_pct);
        let limit = pricing::entry_limit(observed, side, offset);

        let balance = self
            .adapter
            .available_balance()
            .await
            .map_err(|e| ExecutionError::Adapter(e.to_string()))?;
        // Entries are sized in USD for both directions.
        let sized = sizing::size(&SizingInputs::self_referenced(
            balance,
            assessment.recommended_size_usd,
            limit,
            self.config.max_position_usd,
            self.config.min_order_shares,
            OrderSide::Buy,
        ));
        if !sized.is_tradeable() {
            return Err(ExecutionError::Unsizeable {
                reason: sized.reason.to_string(),
            });
        }

        self.portfolio.check(sized.target_usd, now_ms)?;

        let request = OrderRequest {
            instrument_id: event.instrument_id.clone(),
            outcome,
            side,
            size: OrderSize::Shares(sized.target_shares),
            price_limit: Some(limit),
            fulfillment: FulfillmentMode::for_strategy(strategy),
        };
        debug!(
            instrument_id = %request.instrument_id,
            side = %side,
            shares = %sized.target_shares,
            limit = %limit,
            mode = request.fulfillment.as_str(),
            sizing = %sized.reason,
            "Submitting entry"
        );

        let ack = self
            .adapter
            .create_order(&request)
            .await
            .map_err(|e| ExecutionError::Adapter(e.to_string()))?;
        if !ack.success {
            let message = ack.error.unwrap_or_else(|| "rejected".to_string());
            return Err(if message.to_ascii_lowercase().contains("liquidity") {
                ExecutionError::InsufficientLiquidity(message)
            } else {
                ExecutionError::OrderRejected(message)
            });
        }
        if ack.shares_filled <= Decimal::ZERO {
            return Err(ExecutionError::InsufficientLiquidity("nothing filled".to_string()));
        }

        let position = TrackedPosition::open(
            event.instrument_id.clone(),
            event.condition_id.clone(),
            ack.price_filled,
            ack.shares_filled,
            direction,
            strategy,
            now_ms,
            ExitBounds {
                take_profit_pct: self.config.take_profit_pct,
                stop_loss_pct: self.config.stop_loss_pct,
            },
        );
        self.portfolio.record_entry(position.notional(), now_ms);
        self.positions
            .insert(event.instrument_id.clone(), position.clone());

        let result = ExecutionResult {
            success: true,
            order_id: ack.order_id,
            shares_filled: ack.shares_filled,
            price_filled: ack.price_filled,
            slippage: pricing::slippage(observed, ack.price_filled),
            strategy,
            execution_time_ms: elapsed_ms(started),
            error_msg: None,
        };
        Ok((result, position))
    }

    fn precheck(
        &self,
        event: &DetectionEvent,
        assessment: &RiskAssessment,
    ) -> Result<(), ExecutionError> {
        if assessment.too_risky {
            return Err(ExecutionError::Vetoed {
                reasons: assessment.reasons(),
            });
        }
        if let Some(score) = self
            .kill_switch
            .trips(assessment.risk_score, event.risk_score_hint)
        {
            return Err(ExecutionError::KillSwitch { score });
        }
        if self.positions.contains_key(&event.instrument_id) {
            return Err(ExecutionError::DuplicatePosition {
                instrument_id: event.instrument_id.to_string(),
            });
        }
        if self.positions.len() >= self.config.max_concurrent_positions {
            return Err(ExecutionError::PositionCeiling {
                open: self.positions.len(),
            });
        }
        Ok(())
    }

    /// Mark the position on `instrument_id` and close it if an exit rule fires.
    pub async fn on_price(
        &mut self,
        instrument_id: &InstrumentId,
        price: Decimal,
        now_ms: i64,
    ) -> Option<ClosedPosition> {
        let position = self.positions.get_mut(instrument_id)?;
        position.update_price(price);
        let reason = position.exit_signal(now_ms, self.config.max_hold_ms())?;
        self.close(instrument_id, reason, now_ms).await
    }

    /// Close every position whose exit rule fires at `now_ms`.
    pub async fn sweep(&mut self, now_ms: i64) -> Vec<ClosedPosition> {
        let max_hold_ms = self.config.max_hold_ms();
        let due: Vec<(InstrumentId, CloseReason)> = self
            .positions
            .iter()
            .filter_map(|(id, p)| p.exit_signal(now_ms, max_hold_ms).map(|r| (id.clone(), r)))
            .collect();

        let mut closed = Vec::with_capacity(due.len());
        for (id, reason) in due {
            if let Some(c) = self.close(&id, reason, now_ms).await {
                closed.push(c);
            }
        }
        closed
    }

    /// Close one position with a fill-and-kill order at an unfavourable limit.
    ///
    /// The position is dropped even when the exit order fails; failures are
    /// logged and not retried.
    pub async fn close(
        &mut self,
        instrument_id: &InstrumentId,
        reason: CloseReason,
        now_ms: i64,
    ) -> Option<ClosedPosition> {
        let position = self.positions.remove(instrument_id)?;
        self.portfolio.record_exit(position.notional());

        let side = OrderSide::closing(position.direction());
        let request = OrderRequest {
            instrument_id: instrument_id.clone(),
            outcome: None,
            side,
            size: OrderSize::Shares(position.shares()),
            price_limit: Some(pricing::exit_limit(
                position.current_price(),
                side,
                self.config.exit_slippage_pct,
            )),
            fulfillment: FulfillmentMode::FillAndKill,
        };

        let exit_price = match self.adapter.create_order(&request).await {
            Ok(ack) if ack.success => Some(ack.price_filled),
            Ok(ack) => {
                warn!(
                    instrument_id = %instrument_id,
                    reason = %reason,
                    error = ack.error.as_deref().unwrap_or("rejected"),
                    "Exit order rejected"
                );
                None
            }
            Err(e) => {
                warn!(instrument_id = %instrument_id, reason = %reason, error = %e, "Exit order failed");
                None
            }
        };

        info!(
            instrument_id = %instrument_id,
            reason = %reason,
            entry = %position.entry_price(),
            exit = ?exit_price,
            "Flash position closed"
        );
        Some(ClosedPosition {
            position,
            reason,
            exit_price,
            timestamp_ms: now_ms,
        })
    }

    /// Close every open position with `reason`, best effort.
    pub async fn close_all(&mut self, reason: CloseReason, now_ms: i64) -> Vec<ClosedPosition> {
        let ids: Vec<InstrumentId> = self.positions.keys().cloned().collect();
        let mut closed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(c) = self.close(&id, reason, now_ms).await {
                closed.push(c);
            }
        }
        closed
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::risk::{PortfolioConfig, RiskEngine};
    use crate::domain::{Direction, Strategy};
    use crate::testkit::domain::detection;
    use crate::testkit::order::MockOrderAdapter;
    use rust_decimal_macros::dec;

    const NOW: i64 = crate::testkit::domain::AFTERNOON_MS;

    fn engine(adapter: Arc<MockOrderAdapter>) -> ExecutionEngine {
        ExecutionEngine::new(
            ExecutionConfig::default(),
            KillSwitch::from(&RiskConfig::default()),
            PortfolioLimits::new(PortfolioConfig::default()),
            adapter,
        )
    }

    fn assess(event: &DetectionEvent) -> RiskAssessment {
        RiskEngine::new(RiskConfig::default()).assess(event)
    }

    #[tokio::test]
    async fn aggressive_long_opens_with_symmetric_bounds() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        adapter.quote("t1", dec!(0.53));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").velocity(0.06).volatility(0.04).confidence(0.9).build();
        let assessment = assess(&event);

        let execution = engine.execute(&event, &assessment, None, NOW).await;

        assert!(execution.result.success, "{:?}", execution.result.error_msg);
        assert_eq!(execution.result.strategy, Strategy::Aggressive);
        let position = execution.position.expect("position");
        let entry = position.entry_price();
        assert_eq!(entry, dec!(0.5406));
        assert_eq!(position.take_profit_price(), entry * dec!(1.20));
        assert_eq!(position.stop_loss_price(), entry * dec!(0.90));

        let orders = adapter.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].fulfillment, FulfillmentMode::FillAndKill);
        assert_eq!(orders[0].size, OrderSize::Shares(dec!(17.57)));
    }

    #[tokio::test]
    async fn short_moves_sell_and_conservative_is_fill_or_kill() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        adapter.quote("t1", dec!(0.47));
        let mut engine = engine(adapter.clone());
        let event = detection("t1")
            .prices(dec!(0.50), dec!(0.47))
            .velocity(-0.06)
            .confidence(0.4)
            .build();
        let assessment = assess(&event);
        assert_eq!(assessment.recommended_strategy, Strategy::Conservative);

        let execution = engine.execute(&event, &assessment, None, NOW).await;

        let position = execution.position.expect("position");
        assert_eq!(position.direction(), Direction::Short);
        assert!(position.take_profit_price() < position.entry_price());
        let orders = adapter.orders();
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].fulfillment, FulfillmentMode::FillOrKill);
    }

    #[tokio::test]
    async fn kill_switch_hint_never_reaches_the_adapter() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").hint(95.0).build();
        let assessment = assess(&event);
        assert!(!assessment.too_risky);

        let execution = engine.execute(&event, &assessment, None, NOW).await;

        assert!(!execution.result.success);
        assert!(execution
            .result
            .error_msg
            .as_deref()
            .is_some_and(|m| m.contains("kill switch")));
        assert!(adapter.orders().is_empty());
    }

    #[tokio::test]
    async fn vetoed_assessment_is_not_submitted() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").confidence(0.1).build();

        let execution = engine.execute(&event, &assess(&event), None, NOW).await;

        assert!(!execution.result.success);
        assert!(adapter.orders().is_empty());
    }

    #[tokio::test]
    async fn one_position_per_instrument() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").build();
        let assessment = assess(&event);

        assert!(engine.execute(&event, &assessment, None, NOW).await.result.success);
        let second = engine.execute(&event, &assessment, None, NOW + 1_000).await;

        assert!(!second.result.success);
        assert_eq!(adapter.orders().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_ceiling_blocks_new_entries() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = ExecutionEngine::new(
            ExecutionConfig {
                max_concurrent_positions: 1,
                ..ExecutionConfig::default()
            },
            KillSwitch::from(&RiskConfig::default()),
            PortfolioLimits::new(PortfolioConfig::default()),
            adapter.clone(),
        );
        let first = detection("t1").build();
        let second = detection("t2").build();

        engine.execute(&first, &assess(&first), None, NOW).await;
        let execution = engine.execute(&second, &assess(&second), None, NOW).await;

        assert!(!execution.result.success);
        assert_eq!(engine.open_positions(), 1);
    }

    #[tokio::test]
    async fn rejected_order_is_a_failed_result() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        adapter.reject_with("insufficient liquidity at limit");
        let mut engine = engine(adapter.clone());
        let event = detection("t1").build();

        let execution = engine.execute(&event, &assess(&event), None, NOW).await;

        assert!(!execution.result.success);
        assert!(execution
            .result
            .error_msg
            .as_deref()
            .is_some_and(|m| m.starts_with("insufficient liquidity")));
        assert_eq!(engine.open_positions(), 0);
    }

    #[tokio::test]
    async fn drifted_quote_exceeds_slippage() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        adapter.quote("t1", dec!(0.60));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").build();

        let execution = engine.execute(&event, &assess(&event), None, NOW).await;

        assert!(!execution.result.success);
        assert!(adapter.orders().is_empty());
    }

    #[tokio::test]
    async fn empty_balance_is_unsizeable() {
        let adapter = Arc::new(MockOrderAdapter::new(Decimal::ZERO));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").build();

        let execution = engine.execute(&event, &assess(&event), None, NOW).await;

        assert_eq!(
            execution.result.error_msg.as_deref(),
            Some("order size below exchange minimum: insufficient_balance")
        );
    }

    #[tokio::test]
    async fn take_profit_closes_with_unfavourable_fak() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter.clone());
        let event = detection("t1").build();
        engine.execute(&event, &assess(&event), None, NOW).await;
        let tp = engine.position(&event.instrument_id).map(TrackedPosition::take_profit_price);

        let closed = engine
            .on_price(&event.instrument_id, dec!(0.70), NOW + 5_000)
            .await
            .expect("closed");

        assert_eq!(closed.reason, CloseReason::TargetHit);
        assert!(tp.is_some_and(|tp| tp <= dec!(0.70)));
        let exit = adapter.orders().pop().expect("exit order");
        assert_eq!(exit.side, OrderSide::Sell);
        assert_eq!(exit.fulfillment, FulfillmentMode::FillAndKill);
        assert_eq!(exit.price_limit, Some(dec!(0.665)));
        assert_eq!(engine.open_positions(), 0);
        assert_eq!(engine.portfolio().exposure(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn stop_loss_closes_as_momentum_stall() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter);
        let event = detection("t1").build();
        engine.execute(&event, &assess(&event), None, NOW).await;

        assert!(engine.on_price(&event.instrument_id, dec!(0.53), NOW + 1_000).await.is_none());
        let closed = engine
            .on_price(&event.instrument_id, dec!(0.40), NOW + 2_000)
            .await
            .expect("closed");
        assert_eq!(closed.reason, CloseReason::MomentumStall);
    }

    #[tokio::test]
    async fn sweep_enforces_time_stop() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter);
        let event = detection("t1").build();
        engine.execute(&event, &assess(&event), None, NOW).await;

        assert!(engine.sweep(NOW + 119_000).await.is_empty());
        let closed = engine.sweep(NOW + 120_000).await;

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].reason, CloseReason::TimeStop);
    }

    #[tokio::test]
    async fn failed_exit_still_drops_the_position() {
        let adapter = Arc::new(MockOrderAdapter::new(dec!(1000)));
        let mut engine = engine(adapter.clone());
        let first = detection("t1").build();
        let second = detection("t2").build();
        engine.execute(&first, &assess(&first), None, NOW).await;
        engine.execute(&second, &assess(&second), None, NOW).await;
        adapter.fail_orders();

        let closed = engine.close_all(CloseReason::ServiceDisabled, NOW + 1_000).await;

        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|c| c.exit_price.is_none()));
        assert_eq!(engine.open_positions(), 0);
    }
}
