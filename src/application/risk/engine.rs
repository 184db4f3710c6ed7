//! Detection scoring.

use chrono::{DateTime, Timelike};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::info;

use super::RiskConfig;
use crate::domain::{DetectionEvent, ReasonCode, RiskAssessment, Strategy};

/// Scores above this are flagged as elevated and pushed to conservative.
const CONSERVATIVE_SCORE: f64 = 60.0;
const AGGRESSIVE_MAX_SCORE: f64 = 40.0;
const AGGRESSIVE_MIN_CONFIDENCE: f64 = 0.8;
const CONSERVATIVE_MAX_CONFIDENCE: f64 = 0.5;

/// `(exclusive upper bound, points)`; values past the last bound score `TAIL`.
type Table = &'static [(f64, f64)];

const VOLATILITY: Table = &[(0.01, 0.0), (0.03, 5.0), (0.05, 10.0), (0.10, 15.0)];
const VOLATILITY_TAIL: f64 = 20.0;
const VELOCITY: Table = &[(0.05, 5.0), (0.10, 10.0), (0.20, 20.0), (0.30, 30.0)];
const VELOCITY_TAIL: f64 = 40.0;
const MOMENTUM: Table = &[(0.01, 0.0), (0.02, 5.0), (0.05, 10.0)];
const MOMENTUM_TAIL: f64 = 15.0;
const VOLUME: Table = &[(2.0, 0.0), (3.0, 5.0), (5.0, 10.0)];
const VOLUME_TAIL: f64 = 15.0;

fn lookup(table: Table, tail: f64, value: f64) -> f64 {
    table
        .iter()
        .find(|(bound, _)| value < *bound)
        .map_or(tail, |(_, points)| *points)
}

/// Thin overnight books score highest, the US session lowest.
fn time_of_day_score(timestamp_ms: i64) -> f64 {
    let Some(hour) = DateTime::from_timestamp_millis(timestamp_ms).map(|t| t.hour()) else {
        return 0.0;
    };
    match hour {
        0..=5 => 10.0,
        6..=12 => 5.0,
        13..=21 => 0.0,
        _ => 5.0,
    }
}

/// Stateless risk scorer for one account.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score a detection and decide strategy, size and slippage allowance.
    #[must_use]
    pub fn assess(&self, event: &DetectionEvent) -> RiskAssessment {
        let config = &self.config;
        let risk_score = Self::score(event);

        let mut reason_codes = Vec::new();
        if config.kill_switch_enabled && risk_score > config.kill_switch_score {
            reason_codes.push(ReasonCode::KillSwitch);
        }
        if event.confidence < config.min_confidence {
            reason_codes.push(ReasonCode::LowConfidence);
        }
        if event.velocity.abs() > config.max_velocity {
            reason_codes.push(ReasonCode::ExtremeVelocity);
        }
        if risk_score > CONSERVATIVE_SCORE {
            reason_codes.push(ReasonCode::ElevatedRisk);
        }
        let too_risky = reason_codes.iter().any(|c| c.is_veto());

        let recommended_strategy = config
            .preferred_strategy
            .unwrap_or_else(|| Self::strategy(event.confidence, risk_score));

        let assessment = RiskAssessment {
            too_risky,
            risk_score,
            reason_codes,
            recommended_strategy,
            recommended_size_usd: self.size(event.confidence, risk_score),
            max_slippage_pct: self.slippage(recommended_strategy, risk_score),
        };

        if too_risky {
            info!(
                instrument_id = %event.instrument_id,
                risk_score,
                confidence = event.confidence,
                reasons = %assessment.reasons(),
                "Detection vetoed"
            );
        }
        assessment
    }

    /// Sum of the five sub-scores, capped at 100.
    #[must_use]
    pub fn score(event: &DetectionEvent) -> f64 {
        let total = lookup(VOLATILITY, VOLATILITY_TAIL, event.metadata.volatility)
            + lookup(VELOCITY, VELOCITY_TAIL, event.velocity.abs())
            + lookup(MOMENTUM, MOMENTUM_TAIL, event.momentum.abs())
            + lookup(VOLUME, VOLUME_TAIL, event.volume_spike)
            + time_of_day_score(event.timestamp_ms);
        total.min(100.0)
    }

    fn strategy(confidence: f64, score: f64) -> Strategy {
        if confidence > AGGRESSIVE_MIN_CONFIDENCE && score < AGGRESSIVE_MAX_SCORE {
            Strategy::Aggressive
        } else if confidence < CONSERVATIVE_MAX_CONFIDENCE || score > CONSERVATIVE_SCORE {
            Strategy::Conservative
        } else {
            Strategy::Adaptive
        }
    }

    fn size(&self, confidence: f64, score: f64) -> Decimal {
        let mut factor = 0.5 + confidence.clamp(0.0, 1.0) * 0.5;
        if score > 50.0 {
            factor *= 0.5;
        } else if score > 30.0 {
            factor *= 0.7;
        }
        let factor = Decimal::from_f64(factor).unwrap_or(Decimal::ZERO);
        (self.config.base_size_usd * factor)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .max(self.config.min_size_usd)
    }

    fn slippage(&self, strategy: Strategy, score: f64) -> Decimal {
        let pct = match strategy {
            Strategy::Aggressive => dec!(0.02),
            Strategy::Conservative => dec!(0.01),
            Strategy::Adaptive => {
                let scaled = Decimal::from_f64(score / 100.0).unwrap_or(Decimal::ZERO);
                (dec!(0.01) + dec!(0.01) * scaled).round_dp(4)
            }
        };
        pct.min(self.config.max_slippage_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{detection, AFTERNOON_MS, NIGHT_MS};

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskConfig::default())
    }

    #[test]
    fn lookup_bounds_are_exclusive() {
        assert_eq!(lookup(VELOCITY, VELOCITY_TAIL, 0.049), 5.0);
        assert_eq!(lookup(VELOCITY, VELOCITY_TAIL, 0.05), 10.0);
        assert_eq!(lookup(VELOCITY, VELOCITY_TAIL, 0.45), 40.0);
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(time_of_day_score(NIGHT_MS), 10.0);
        assert_eq!(time_of_day_score(AFTERNOON_MS), 0.0);
        assert_eq!(time_of_day_score(AFTERNOON_MS + 8 * 3_600_000), 5.0);
    }

    #[test]
    fn confident_calm_move_is_aggressive() {
        let event = detection("t1").velocity(0.06).volatility(0.04).confidence(0.9).build();

        let assessment = engine().assess(&event);

        assert!((assessment.risk_score - 20.0).abs() < f64::EPSILON);
        assert!(!assessment.too_risky);
        assert_eq!(assessment.recommended_strategy, Strategy::Aggressive);
        assert_eq!(assessment.recommended_size_usd, dec!(9.50));
        assert_eq!(assessment.max_slippage_pct, dec!(0.02));
    }

    #[test]
    fn low_confidence_is_vetoed() {
        let event = detection("t1").confidence(0.2).build();
        let assessment = engine().assess(&event);
        assert!(assessment.too_risky);
        assert_eq!(assessment.reason_codes, vec![ReasonCode::LowConfidence]);
        assert_eq!(assessment.recommended_strategy, Strategy::Conservative);
    }

    #[test]
    fn extreme_velocity_is_bad_data() {
        let event = detection("t1").velocity(-0.6).build();
        let assessment = engine().assess(&event);
        assert!(assessment.too_risky);
        assert!(assessment.reason_codes.contains(&ReasonCode::ExtremeVelocity));
    }

    #[test]
    fn kill_switch_vetoes_maximal_scores() {
        let event = detection("t1")
            .velocity(0.4)
            .volatility(0.2)
            .momentum(0.1)
            .volume_spike(6.0)
            .at(NIGHT_MS)
            .build();

        let assessment = engine().assess(&event);

        assert!((assessment.risk_score - 100.0).abs() < f64::EPSILON);
        assert!(assessment.too_risky);
        assert!(assessment.reason_codes.contains(&ReasonCode::KillSwitch));
        assert!(assessment.reason_codes.contains(&ReasonCode::ElevatedRisk));
    }

    #[test]
    fn disarmed_kill_switch_only_flags() {
        let engine = RiskEngine::new(RiskConfig {
            kill_switch_enabled: false,
            ..RiskConfig::default()
        });
        let event = detection("t1")
            .velocity(0.4)
            .volatility(0.2)
            .momentum(0.1)
            .volume_spike(6.0)
            .at(NIGHT_MS)
            .build();

        let assessment = engine.assess(&event);

        assert!(!assessment.too_risky);
        assert_eq!(assessment.reason_codes, vec![ReasonCode::ElevatedRisk]);
        assert_eq!(assessment.recommended_strategy, Strategy::Conservative);
        assert_eq!(assessment.recommended_size_usd, dec!(4.75));
    }

    #[test]
    fn moderate_score_reduces_size_and_scales_adaptive_slippage() {
        // 15 volatility + 20 velocity = 35
        let event = detection("t1").velocity(0.15).volatility(0.07).confidence(0.7).build();

        let assessment = engine().assess(&event);

        assert!((assessment.risk_score - 35.0).abs() < f64::EPSILON);
        assert_eq!(assessment.recommended_strategy, Strategy::Adaptive);
        // 10 * 0.85 * 0.7
        assert_eq!(assessment.recommended_size_usd, dec!(5.95));
        assert_eq!(assessment.max_slippage_pct, dec!(0.0135));
    }

    #[test]
    fn configured_strategy_overrides_scoring() {
        let engine = RiskEngine::new(RiskConfig {
            preferred_strategy: Some(Strategy::Conservative),
            ..RiskConfig::default()
        });
        let event = detection("t1").confidence(0.95).build();
        assert_eq!(engine.assess(&event).recommended_strategy, Strategy::Conservative);
    }

    #[test]
    fn size_never_drops_below_minimum_ticket() {
        let engine = RiskEngine::new(RiskConfig {
            base_size_usd: dec!(1),
            min_size_usd: dec!(2),
            ..RiskConfig::default()
        });
        let event = detection("t1").build();
        assert_eq!(engine.assess(&event).recommended_size_usd, dec!(2));
    }
}
