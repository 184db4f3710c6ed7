//! Flash-move anomaly detector.
//!
//! Each account's detector keeps its own per-instrument [`RollingHistory`]
//! in a [`BoundedCache`], updates it on every price tick, and compares the
//! newest price against the oldest sample inside the lookback window (and a
//! sub-second micro-tick window). A detection is emitted only when at least
//! one signal crosses its threshold.

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::cache::BoundedCache;
use crate::domain::price;
use crate::domain::{
    DetectionEvent, DetectionMetadata, HistoryLimits, InstrumentId, PriceSample, PriceUpdate,
    PushOutcome, RollingHistory, Strategy, Trigger,
};

const MICRO_WEIGHT: f64 = 0.5;
const VELOCITY_WEIGHT: f64 = 0.3;
const MOMENTUM_WEIGHT: f64 = 0.1;
const VOLUME_WEIGHT: f64 = 0.1;

/// Samples used for the momentum estimate.
const MOMENTUM_SAMPLES: usize = 3;
/// Prior volumes averaged for the spike ratio.
const VOLUME_BASELINE: usize = 5;

/// Detector thresholds and history bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Relative move over the lookback window that fires on its own.
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,
    /// Relative move inside the micro-tick window that fires on its own.
    #[serde(default = "default_micro_tick_threshold")]
    pub micro_tick_threshold: f64,
    #[serde(default = "default_micro_tick_window_ms")]
    pub micro_tick_window_ms: i64,
    /// Price change per second that fires on its own.
    #[serde(default = "default_momentum_threshold")]
    pub momentum_threshold: f64,
    /// Volume relative to the recent mean that fires on its own.
    #[serde(default = "default_volume_spike_threshold")]
    pub volume_spike_threshold: f64,
    #[serde(default = "default_lookback_ms")]
    pub lookback_ms: i64,
    /// Minimum recent traded volume; zero disables the floor.
    #[serde(default)]
    pub liquidity_floor: f64,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: i64,
    #[serde(default = "default_max_volumes")]
    pub max_volumes: usize,
    /// Histories kept per detector.
    #[serde(default = "default_max_instruments")]
    pub max_instruments: usize,
    /// Histories untouched this long are dropped.
    #[serde(default = "default_history_idle_ms")]
    pub history_idle_ms: i64,
}

fn default_velocity_threshold() -> f64 {
    0.05
}

fn default_micro_tick_threshold() -> f64 {
    0.03
}

const fn default_micro_tick_window_ms() -> i64 {
    500
}

fn default_momentum_threshold() -> f64 {
    0.02
}

fn default_volume_spike_threshold() -> f64 {
    3.0
}

const fn default_lookback_ms() -> i64 {
    15_000
}

const fn default_max_samples() -> usize {
    crate::domain::history::DEFAULT_MAX_SAMPLES
}

const fn default_max_age_ms() -> i64 {
    crate::domain::history::DEFAULT_MAX_AGE_MS
}

const fn default_max_volumes() -> usize {
    crate::domain::history::DEFAULT_MAX_VOLUMES
}

const fn default_max_instruments() -> usize {
    5_000
}

const fn default_history_idle_ms() -> i64 {
    600_000
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: default_velocity_threshold(),
            micro_tick_threshold: default_micro_tick_threshold(),
            micro_tick_window_ms: default_micro_tick_window_ms(),
            momentum_threshold: default_momentum_threshold(),
            volume_spike_threshold: default_volume_spike_threshold(),
            lookback_ms: default_lookback_ms(),
            liquidity_floor: 0.0,
            max_samples: default_max_samples(),
            max_age_ms: default_max_age_ms(),
            max_volumes: default_max_volumes(),
            max_instruments: default_max_instruments(),
            history_idle_ms: default_history_idle_ms(),
        }
    }
}

impl DetectorConfig {
    fn limits(&self) -> HistoryLimits {
        HistoryLimits {
            max_samples: self.max_samples,
            max_age_ms: self.max_age_ms,
            max_volumes: self.max_volumes,
        }
    }
}

/// Raw signals computed for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signals {
    velocity: f64,
    micro_velocity: Option<f64>,
    momentum: f64,
    volume_spike: f64,
}

/// Per-account flash-move detector.
#[derive(Debug)]
pub struct Detector {
    config: DetectorConfig,
    histories: BoundedCache<InstrumentId, RollingHistory>,
}

impl Detector {
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        let histories = BoundedCache::new(config.max_instruments, config.history_idle_ms);
        Self { config, histories }
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Record a tick and return a detection if any signal crossed its threshold.
    pub fn detect(&mut self, update: &PriceUpdate) -> Option<DetectionEvent> {
        let now = update.timestamp_ms;
        let sample = match PriceSample::try_new(
            update.instrument_id.clone(),
            update.price,
            now,
            update.best_bid,
            update.best_ask,
        ) {
            Ok(sample) => sample,
            Err(e) => {
                debug!(instrument_id = %update.instrument_id, error = %e, "Dropping invalid tick");
                return None;
            }
        };

        let limits = self.config.limits();
        let history = self
            .histories
            .get_or_insert_with(update.instrument_id.clone(), now, || RollingHistory::new(limits));

        if history.push(sample) == PushOutcome::Stale {
            debug!(instrument_id = %update.instrument_id, timestamp_ms = now, "Dropping stale tick");
            return None;
        }

        let volume_spike = match update.volume {
            Some(volume) if volume > Decimal::ZERO => {
                let spike = spike_ratio(history, volume);
                history.push_volume(volume);
                spike
            }
            _ => 0.0,
        };

        if history.len() < 2 {
            return None;
        }

        let config = &self.config;
        if config.liquidity_floor > 0.0 {
            let traded: f64 = history.volumes().map(|v| price::to_f64(*v)).sum();
            if traded < config.liquidity_floor {
                return None;
            }
        }

        let newest = history.latest()?.price_f64();
        let reference = history.oldest_since(now - config.lookback_ms)?;
        let old = reference.price_f64();
        if old <= 0.0 {
            return None;
        }

        let micro_velocity = history
            .oldest_since(now - config.micro_tick_window_ms)
            .map(PriceSample::price_f64)
            .filter(|p| *p > 0.0)
            .map(|p| (newest - p) / p);

        let signals = Signals {
            velocity: (newest - old) / old,
            micro_velocity,
            momentum: momentum(history),
            volume_spike,
        };

        let triggers = triggers(config, &signals);
        if triggers.is_empty() {
            return None;
        }

        let confidence = confidence(config, &signals);
        let micro_fired = triggers.contains(&Trigger::MicroTick);
        let risk_score_hint = risk_score_hint(config, &signals, micro_fired);
        let strategy_hint = strategy_hint(confidence, micro_fired);

        let metadata = DetectionMetadata {
            triggers,
            micro_velocity: signals.micro_velocity,
            volatility: history.realized_volatility(now - config.lookback_ms),
            samples: history.len(),
            window_ms: now - reference.timestamp_ms(),
            best_bid: update.best_bid,
            best_ask: update.best_ask,
        };

        Some(DetectionEvent {
            instrument_id: update.instrument_id.clone(),
            condition_id: update.condition_id.clone(),
            old_price: reference.price(),
            new_price: update.price,
            velocity: signals.velocity,
            momentum: signals.momentum,
            volume_spike: signals.volume_spike,
            confidence,
            risk_score_hint,
            strategy_hint,
            timestamp_ms: now,
            metadata,
        })
    }

    /// Drop histories for instruments the hub evicted.
    pub fn forget(&mut self, instruments: &[InstrumentId]) {
        for id in instruments {
            self.histories.remove(id);
        }
    }

    /// Drop histories untouched past the idle window.
    pub fn evict_idle(&mut self, now_ms: i64) -> Vec<InstrumentId> {
        self.histories.evict_idle(now_ms)
    }

    #[must_use]
    pub fn history(&self, instrument_id: &InstrumentId) -> Option<&RollingHistory> {
        self.histories.peek(instrument_id)
    }

    /// Number of instruments with history.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.histories.len()
    }
}

fn triggers(config: &DetectorConfig, signals: &Signals) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    if signals
        .micro_velocity
        .is_some_and(|v| v.abs() >= config.micro_tick_threshold)
    {
        triggers.push(Trigger::MicroTick);
    }
    if signals.velocity.abs() >= config.velocity_threshold {
        triggers.push(Trigger::Velocity);
    }
    if signals.momentum.abs() >= config.momentum_threshold {
        triggers.push(Trigger::Momentum);
    }
    if signals.volume_spike >= config.volume_spike_threshold {
        triggers.push(Trigger::VolumeSpike);
    }
    triggers
}

fn confidence(config: &DetectorConfig, signals: &Signals) -> f64 {
    let micro = signals.micro_velocity.unwrap_or(0.0);
    let total = MICRO_WEIGHT * strength(micro, config.micro_tick_threshold)
        + VELOCITY_WEIGHT * strength(signals.velocity, config.velocity_threshold)
        + MOMENTUM_WEIGHT * strength(signals.momentum, config.momentum_threshold)
        + VOLUME_WEIGHT * strength(signals.volume_spike, config.volume_spike_threshold);
    total.min(1.0)
}

fn risk_score_hint(config: &DetectorConfig, signals: &Signals, micro_fired: bool) -> f64 {
    let mut score = signals.velocity.abs() * 200.0 + signals.momentum.abs() * 300.0;
    if signals.volume_spike >= config.volume_spike_threshold {
        score += 15.0;
    }
    if micro_fired {
        score += 10.0;
    }
    score.min(100.0)
}

/// `|signal| / threshold`, capped at 1.
fn strength(signal: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.0;
    }
    (signal.abs() / threshold).min(1.0)
}

/// Price change per second across the last few samples.
fn momentum(history: &RollingHistory) -> f64 {
    let recent: Vec<&PriceSample> = history.last_n(MOMENTUM_SAMPLES).collect();
    let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
        return 0.0;
    };
    let elapsed_secs = (last.timestamp_ms() - first.timestamp_ms()) as f64 / 1_000.0;
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (last.price_f64() - first.price_f64()) / elapsed_secs
}

/// Current volume over the mean of the previous few volumes.
fn spike_ratio(history: &RollingHistory, volume: Decimal) -> f64 {
    let prior: Vec<f64> = history
        .volumes()
        .rev()
        .take(VOLUME_BASELINE)
        .map(|v| price::to_f64(*v))
        .collect();
    if prior.is_empty() {
        return 0.0;
    }
    let mean = prior.iter().sum::<f64>() / prior.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    price::to_f64(volume) / mean
}

fn strategy_hint(confidence: f64, micro_fired: bool) -> Strategy {
    if micro_fired && confidence > 0.8 {
        Strategy::Aggressive
    } else if confidence < 0.5 {
        Strategy::Conservative
    } else {
        Strategy::Adaptive
    }
}
