//! Flash-move detection types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ConditionId, InstrumentId};

/// Order strategy recommended for a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Cross the spread quickly, accept partial fills.
    Aggressive,
    /// Tight limit, all-or-nothing.
    Conservative,
    /// Limit offset scaled by risk, accept partial fills.
    Adaptive,
}

impl Strategy {
    /// Stable name used in logs and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Conservative => "conservative",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a trade relative to the instrument's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Profit when the price rises.
    Long,
    /// Profit when the price falls.
    Short,
}

impl Direction {
    /// Direction implied by the sign of a velocity.
    #[must_use]
    pub fn from_velocity(velocity: f64) -> Self {
        if velocity < 0.0 {
            Self::Short
        } else {
            Self::Long
        }
    }
}

/// Signal that crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Velocity,
    MicroTick,
    Momentum,
    VolumeSpike,
}

/// Supporting detail attached to a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetadata {
    /// Signals that crossed their thresholds.
    pub triggers: Vec<Trigger>,
    /// Relative change inside the micro-tick window, if a sample existed there.
    pub micro_velocity: Option<f64>,
    /// Standard deviation of consecutive returns in the lookback window.
    pub volatility: f64,
    /// Samples in history when the detection fired.
    pub samples: usize,
    /// Milliseconds between the reference sample and the newest one.
    pub window_ms: i64,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

/// An immutable flash-move detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub instrument_id: InstrumentId,
    pub condition_id: Option<ConditionId>,
    pub old_price: Decimal,
    pub new_price: Decimal,
    /// Relative price change over the lookback window.
    pub velocity: f64,
    /// Price change per second over the last few samples.
    pub momentum: f64,
    /// Current volume relative to the recent mean (0 when unknown).
    pub volume_spike: f64,
    /// Weighted evidence in `[0, 1]`.
    pub confidence: f64,
    /// Coarse risk estimate in `[0, 100]`, re-scored by the risk engine.
    pub risk_score_hint: f64,
    pub strategy_hint: Strategy,
    pub timestamp_ms: i64,
    pub metadata: DetectionMetadata,
}

impl DetectionEvent {
    /// Trade direction implied by the velocity sign.
    #[must_use]
    pub fn direction(&self) -> Direction {
        Direction::from_velocity(self.velocity)
    }

    /// Whether a given trigger fired.
    #[must_use]
    pub fn fired(&self, trigger: Trigger) -> bool {
        self.metadata.triggers.contains(&trigger)
    }
}
