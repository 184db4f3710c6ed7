//! Risk assessment result types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::detection::Strategy;

/// Why an assessment flagged or vetoed a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Kill switch armed and score above the ceiling.
    KillSwitch,
    /// Confidence below the minimum.
    LowConfidence,
    /// Velocity so large it is treated as bad data or manipulation.
    ExtremeVelocity,
    /// Score above the conservative threshold (informational).
    ElevatedRisk,
}

impl ReasonCode {
    /// Returns true for codes that veto a trade outright.
    #[must_use]
    pub const fn is_veto(self) -> bool {
        !matches!(self, Self::ElevatedRisk)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KillSwitch => "kill_switch",
            Self::LowConfidence => "low_confidence",
            Self::ExtremeVelocity => "extreme_velocity",
            Self::ElevatedRisk => "elevated_risk",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub too_risky: bool,
    /// Sum of the sub-scores, capped at 100.
    pub risk_score: f64,
    pub reason_codes: Vec<ReasonCode>,
    pub recommended_strategy: Strategy,
    pub recommended_size_usd: Decimal,
    /// Maximum acceptable slippage as a fraction (0.02 = 2%).
    pub max_slippage_pct: Decimal,
}

impl RiskAssessment {
    /// Comma-separated reason codes for logs.
    #[must_use]
    pub fn reasons(&self) -> String {
        self.reason_codes
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
