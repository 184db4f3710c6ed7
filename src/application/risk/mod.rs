//! Risk scoring and portfolio limits.
//!
//! The [`RiskEngine`] turns a detection into a [`RiskAssessment`] from fixed
//! breakpoint tables and hard vetoes. [`PortfolioLimits`] tracks aggregate
//! exposure across one account's positions and can veto independently.

mod engine;
mod portfolio;

pub use engine::RiskEngine;
pub use portfolio::PortfolioLimits;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::Strategy;

/// Risk engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Veto any detection scoring above `kill_switch_score`.
    #[serde(default = "default_kill_switch_enabled")]
    pub kill_switch_enabled: bool,
    #[serde(default = "default_kill_switch_score")]
    pub kill_switch_score: f64,
    /// Detections below this confidence are vetoed.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Moves larger than this are treated as bad data.
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// Ticket size before confidence and risk scaling.
    #[serde(default = "default_base_size_usd")]
    pub base_size_usd: Decimal,
    #[serde(default = "default_min_size_usd")]
    pub min_size_usd: Decimal,
    /// Upper bound on any strategy's slippage allowance.
    #[serde(default = "default_max_slippage_pct")]
    pub max_slippage_pct: Decimal,
    /// Overrides the score-based strategy choice when set.
    #[serde(default)]
    pub preferred_strategy: Option<Strategy>,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
}

fn default_kill_switch_enabled() -> bool {
    true
}

fn default_kill_switch_score() -> f64 {
    90.0
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_max_velocity() -> f64 {
    0.5
}

fn default_base_size_usd() -> Decimal {
    dec!(10)
}

fn default_min_size_usd() -> Decimal {
    Decimal::ONE
}

fn default_max_slippage_pct() -> Decimal {
    dec!(0.02)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            kill_switch_enabled: default_kill_switch_enabled(),
            kill_switch_score: default_kill_switch_score(),
            min_confidence: default_min_confidence(),
            max_velocity: default_max_velocity(),
            base_size_usd: default_base_size_usd(),
            min_size_usd: default_min_size_usd(),
            max_slippage_pct: default_max_slippage_pct(),
            preferred_strategy: None,
            portfolio: PortfolioConfig::default(),
        }
    }
}

/// Account-wide limits checked before every entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    /// Total notional across open positions.
    #[serde(default = "default_max_exposure_usd")]
    pub max_exposure_usd: Decimal,
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    /// Entries allowed inside one correlation window.
    #[serde(default = "default_max_correlated_entries")]
    pub max_correlated_entries: usize,
    #[serde(default = "default_correlation_window_secs")]
    pub correlation_window_secs: u64,
}

fn default_max_exposure_usd() -> Decimal {
    dec!(500)
}

const fn default_max_positions() -> usize {
    10
}

const fn default_max_correlated_entries() -> usize {
    3
}

const fn default_correlation_window_secs() -> u64 {
    30
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            max_exposure_usd: default_max_exposure_usd(),
            max_positions: default_max_positions(),
            max_correlated_entries: default_max_correlated_entries(),
            correlation_window_secs: default_correlation_window_secs(),
        }
    }
}
