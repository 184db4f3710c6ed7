//! Per-account flash-trading pipeline.
//!
//! A [`FlashService`] owns one detector, risk engine and execution engine
//! for one account. While enabled, a single task consumes hub events and
//! handles them strictly in order: for each price tick the open position on
//! that instrument is marked first, then the tick runs through
//! detect, assess and execute before the next event is taken.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::detector::{Detector, DetectorConfig};
use super::execution::{ClosedPosition, ExecutionConfig, ExecutionEngine, KillSwitch};
use super::hub::{recv_event, IngestionHub, InstrumentsEvicted};
use super::risk::{PortfolioLimits, RiskConfig, RiskEngine};
use crate::domain::{
    AccountId, CloseReason, DetectionEvent, ExecutionResult, InstrumentId, PriceUpdate,
    RiskAssessment, TrackedPosition,
};
use crate::error::{ConfigError, Error};
use crate::port::outbound::audit::{AuditRecord, AuditSink};
use crate::port::outbound::order::OrderAdapter;

const EVENT_CAPACITY: usize = 256;

/// Everything one account's pipeline is configured with.
#[derive(Debug, Clone, Default)]
pub struct FlashConfig {
    pub detector: DetectorConfig,
    pub risk: RiskConfig,
    pub execution: ExecutionConfig,
    /// Instruments subscribed on the hub while enabled.
    pub instruments: Vec<InstrumentId>,
}

/// Outbound notifications from a flash service.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// Every processed detection, executed or not.
    FlashMoveDetected {
        event: DetectionEvent,
        assessment: RiskAssessment,
        result: ExecutionResult,
    },
    /// A detection that opened a position.
    FlashMoveExecuted {
        event: DetectionEvent,
        result: ExecutionResult,
        position: TrackedPosition,
    },
    PositionClosed {
        instrument_id: InstrumentId,
        reason: CloseReason,
        timestamp_ms: i64,
    },
}

enum ServiceCommand {
    Close(InstrumentId),
    Stop,
}

struct Running {
    commands: mpsc::UnboundedSender<ServiceCommand>,
    task: JoinHandle<()>,
}

/// Flash-move trading for one account.
pub struct FlashService {
    account_id: AccountId,
    hub: IngestionHub,
    config: FlashConfig,
    adapter: Arc<dyn OrderAdapter>,
    audit: Arc<dyn AuditSink>,
    events: broadcast::Sender<ServiceEvent>,
    positions: watch::Sender<Vec<TrackedPosition>>,
    running: Mutex<Option<Running>>,
}

impl FlashService {
    pub fn new(
        account_id: AccountId,
        hub: IngestionHub,
        config: FlashConfig,
        adapter: Arc<dyn OrderAdapter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            account_id,
            hub,
            config,
            adapter,
            audit,
            events: broadcast::channel(EVENT_CAPACITY).0,
            positions: watch::Sender::new(Vec::new()),
            running: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Start processing hub events.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCapability`] when the order adapter
    /// cannot place the orders flash trading needs; the service stays
    /// disabled.
    pub fn enable(&self) -> Result<(), Error> {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            debug!(account_id = %self.account_id, "Flash service already enabled");
            return Ok(());
        }

        if let Some(capability) = self.adapter.capabilities().missing_for_flash() {
            return Err(ConfigError::MissingCapability {
                adapter: self.adapter.name(),
                capability,
            }
            .into());
        }

        // Listeners are registered before this returns so no tick is missed.
        let prices = self.hub.listen::<PriceUpdate>();
        let evicted = self.hub.listen::<InstrumentsEvicted>();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let config = &self.config;
        let pipeline = Pipeline {
            account_id: self.account_id.clone(),
            hub: self.hub.clone(),
            clock: self.hub.clock(),
            detector: Detector::new(config.detector.clone()),
            risk: RiskEngine::new(config.risk.clone()),
            engine: ExecutionEngine::new(
                config.execution.clone(),
                KillSwitch::from(&config.risk),
                PortfolioLimits::new(config.risk.portfolio.clone()),
                Arc::clone(&self.adapter),
            ),
            audit: Arc::clone(&self.audit),
            events: self.events.clone(),
            positions: self.positions.clone(),
        };
        let monitor = Duration::from_millis(config.execution.monitor_interval_ms.max(1));
        let task = tokio::spawn(pipeline.run(prices, evicted, command_rx, monitor));

        for instrument in &config.instruments {
            self.hub.subscribe(instrument);
        }

        *running = Some(Running { commands, task });
        info!(
            account_id = %self.account_id,
            adapter = self.adapter.name(),
            instruments = config.instruments.len(),
            "Flash service enabled"
        );
        Ok(())
    }

    /// Stop processing and force-close every open position.
    ///
    /// Hub listeners are dropped before positions are closed. Exit failures
    /// are logged, not retried.
    pub async fn disable(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        let _ = running.commands.send(ServiceCommand::Stop);
        if let Err(e) = running.task.await {
            warn!(account_id = %self.account_id, error = %e, "Flash task ended abnormally");
        }
        for instrument in &self.config.instruments {
            self.hub.unsubscribe(instrument);
        }
        info!(account_id = %self.account_id, "Flash service disabled");
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Request a manual close of the position on `instrument_id`.
    ///
    /// Returns false when the service is not running.
    pub fn close_position(&self, instrument_id: &InstrumentId) -> bool {
        self.running.lock().as_ref().is_some_and(|r| {
            r.commands
                .send(ServiceCommand::Close(instrument_id.clone()))
                .is_ok()
        })
    }

    /// Register a listener for service events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Snapshot of open positions.
    #[must_use]
    pub fn positions(&self) -> Vec<TrackedPosition> {
        self.positions.borrow().clone()
    }

    /// Watch open positions change.
    #[must_use]
    pub fn watch_positions(&self) -> watch::Receiver<Vec<TrackedPosition>> {
        self.positions.subscribe()
    }
}

/// State owned by the running task.
struct Pipeline {
    account_id: AccountId,
    hub: IngestionHub,
    clock: Clock,
    detector: Detector,
    risk: RiskEngine,
    engine: ExecutionEngine,
    audit: Arc<dyn AuditSink>,
    events: broadcast::Sender<ServiceEvent>,
    positions: watch::Sender<Vec<TrackedPosition>>,
}

impl Pipeline {
    async fn run(
        mut self,
        mut prices: broadcast::Receiver<PriceUpdate>,
        mut evicted: broadcast::Receiver<InstrumentsEvicted>,
        mut commands: mpsc::UnboundedReceiver<ServiceCommand>,
        monitor_period: Duration,
    ) {
        let mut monitor = self.clock.ticker(monitor_period);
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(ServiceCommand::Close(id)) => {
                        let now = self.clock.now_ms();
                        if let Some(closed) = self.engine.close(&id, CloseReason::Manual, now).await {
                            self.closed(vec![closed]);
                        }
                    }
                    Some(ServiceCommand::Stop) | None => break,
                },
                update = recv_event(&mut prices) => match update {
                    Some(update) => self.on_price(update).await,
                    None => break,
                },
                Some(event) = recv_event(&mut evicted) => {
                    self.detector.forget(&event.instruments);
                    self.detector.evict_idle(self.clock.now_ms());
                }
                _ = monitor.tick() => {
                    let closed = self.engine.sweep(self.clock.now_ms()).await;
                    self.closed(closed);
                }
            }
        }

        drop(prices);
        drop(evicted);

        let closed = self
            .engine
            .close_all(CloseReason::ServiceDisabled, self.clock.now_ms())
            .await;
        if !closed.is_empty() {
            info!(account_id = %self.account_id, closed = closed.len(), "Closed positions on disable");
        }
        self.closed(closed);
    }

    async fn on_price(&mut self, update: PriceUpdate) {
        let now = self.clock.now_ms();
        self.engine.adapter().observe_price(&update);
        if let Some(closed) = self
            .engine
            .on_price(&update.instrument_id, update.price, now)
            .await
        {
            self.closed(vec![closed]);
        } else if self.engine.position(&update.instrument_id).is_some() {
            self.publish_positions();
        }

        let Some(detection) = self.detector.detect(&update) else {
            return;
        };
        debug!(
            account_id = %self.account_id,
            instrument_id = %detection.instrument_id,
            velocity = detection.velocity,
            confidence = detection.confidence,
            strategy_hint = %detection.strategy_hint,
            "Flash move detected"
        );

        let assessment = self.risk.assess(&detection);
        let outcome = self
            .hub
            .metadata(&detection.instrument_id)
            .and_then(|m| m.outcome);
        let execution = self.engine.execute(&detection, &assessment, outcome, now).await;

        self.record(&detection, &assessment, &execution.result).await;
        let _ = self.events.send(ServiceEvent::FlashMoveDetected {
            event: detection.clone(),
            assessment,
            result: execution.result.clone(),
        });
        if let Some(position) = execution.position {
            let _ = self.events.send(ServiceEvent::FlashMoveExecuted {
                event: detection,
                result: execution.result,
                position,
            });
            self.publish_positions();
        }
    }

    async fn record(
        &self,
        detection: &DetectionEvent,
        assessment: &RiskAssessment,
        result: &ExecutionResult,
    ) {
        let record = AuditRecord {
            account_id: self.account_id.clone(),
            detection: detection.clone(),
            assessment: assessment.clone(),
            result: result.clone(),
            recorded_at_ms: self.clock.now_ms(),
        };
        if let Err(e) = self.audit.record(&record).await {
            warn!(account_id = %self.account_id, error = %e, "Failed to write audit record");
        }
    }

    fn closed(&self, closed: Vec<ClosedPosition>) {
        if closed.is_empty() {
            return;
        }
        for c in closed {
            let _ = self.events.send(ServiceEvent::PositionClosed {
                instrument_id: c.position.instrument_id().clone(),
                reason: c.reason,
                timestamp_ms: c.timestamp_ms,
            });
        }
        self.publish_positions();
    }

    fn publish_positions(&self) {
        self.positions
            .send_replace(self.engine.positions().cloned().collect());
    }
}
