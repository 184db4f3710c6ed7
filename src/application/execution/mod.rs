//! Flash-order execution and position management.

mod engine;
mod pricing;

pub use engine::{ClosedPosition, Execution, ExecutionEngine, KillSwitch};
pub use pricing::{entry_offset, entry_limit, exit_limit, slippage};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Execution engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Open flash positions allowed at once for this account.
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
    /// Notional cap for a single entry.
    #[serde(default = "default_max_position_usd")]
    pub max_position_usd: Decimal,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Hard time-stop for any position.
    #[serde(default = "default_max_hold_secs")]
    pub max_hold_secs: u64,
    /// Unfavourable offset applied to exit limits so exits fill.
    #[serde(default = "default_exit_slippage_pct")]
    pub exit_slippage_pct: Decimal,
    /// Exchange minimum order size in shares.
    #[serde(default = "default_min_order_shares")]
    pub min_order_shares: Decimal,
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

const fn default_max_concurrent_positions() -> usize {
    5
}

fn default_max_position_usd() -> Decimal {
    dec!(50)
}

fn default_take_profit_pct() -> Decimal {
    dec!(0.20)
}

fn default_stop_loss_pct() -> Decimal {
    dec!(0.10)
}

const fn default_max_hold_secs() -> u64 {
    120
}

fn default_exit_slippage_pct() -> Decimal {
    dec!(0.05)
}

fn default_min_order_shares() -> Decimal {
    dec!(5)
}

const fn default_monitor_interval_ms() -> u64 {
    1_000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_positions: default_max_concurrent_positions(),
            max_position_usd: default_max_position_usd(),
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            max_hold_secs: default_max_hold_secs(),
            exit_slippage_pct: default_exit_slippage_pct(),
            min_order_shares: default_min_order_shares(),
            monitor_interval_ms: default_monitor_interval_ms(),
        }
    }
}

impl ExecutionConfig {
    #[must_use]
    pub fn max_hold_ms(&self) -> i64 {
        i64::try_from(self.max_hold_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}
