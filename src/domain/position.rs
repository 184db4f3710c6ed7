//! Tracked flash positions and exit rules.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::detection::{Direction, Strategy};
use super::id::{ConditionId, InstrumentId};
use super::price;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Price reached the take-profit bound.
    TargetHit,
    /// Price reversed through the stop-loss bound.
    MomentumStall,
    /// Maximum holding time elapsed.
    TimeStop,
    /// Closed on request.
    Manual,
    /// Service was disabled with the position open.
    ServiceDisabled,
}

impl CloseReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetHit => "target_hit",
            Self::MomentumStall => "momentum_stall",
            Self::TimeStop => "time_stop",
            Self::Manual => "manual",
            Self::ServiceDisabled => "service_disabled",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit bounds expressed as fractions of the entry price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitBounds {
    /// Take-profit distance (0.20 = 20%).
    pub take_profit_pct: Decimal,
    /// Stop-loss distance (0.10 = 10%).
    pub stop_loss_pct: Decimal,
}

/// An open position created by a successful flash execution.
///
/// Mutated only by the execution engine; everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    instrument_id: InstrumentId,
    condition_id: Option<ConditionId>,
    entry_price: Decimal,
    shares: Decimal,
    direction: Direction,
    strategy: Strategy,
    opened_at_ms: i64,
    take_profit_price: Decimal,
    stop_loss_price: Decimal,
    current_price: Decimal,
}

impl TrackedPosition {
    /// Open a position, deriving direction-aware exit bounds from `entry_price`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        instrument_id: InstrumentId,
        condition_id: Option<ConditionId>,
        entry_price: Decimal,
        shares: Decimal,
        direction: Direction,
        strategy: Strategy,
        opened_at_ms: i64,
        bounds: ExitBounds,
    ) -> Self {
        let up = |pct: Decimal| price::clamp(entry_price * (Decimal::ONE + pct));
        let down = |pct: Decimal| price::clamp(entry_price * (Decimal::ONE - pct));
        let (take_profit_price, stop_loss_price) = match direction {
            Direction::Long => (up(bounds.take_profit_pct), down(bounds.stop_loss_pct)),
            Direction::Short => (down(bounds.take_profit_pct), up(bounds.stop_loss_pct)),
        };

        Self {
            instrument_id,
            condition_id,
            entry_price,
            shares,
            direction,
            strategy,
            opened_at_ms,
            take_profit_price,
            stop_loss_price,
            current_price: entry_price,
        }
    }

    #[must_use]
    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    #[must_use]
    pub fn condition_id(&self) -> Option<&ConditionId> {
        self.condition_id.as_ref()
    }

    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    #[must_use]
    pub const fn shares(&self) -> Decimal {
        self.shares
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[must_use]
    pub const fn opened_at_ms(&self) -> i64 {
        self.opened_at_ms
    }

    #[must_use]
    pub const fn take_profit_price(&self) -> Decimal {
        self.take_profit_price
    }

    #[must_use]
    pub const fn stop_loss_price(&self) -> Decimal {
        self.stop_loss_price
    }

    #[must_use]
    pub const fn current_price(&self) -> Decimal {
        self.current_price
    }

    /// Capital committed at entry.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.entry_price * self.shares
    }

    /// Mark-to-market profit at the current price.
    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        let delta = self.current_price - self.entry_price;
        match self.direction {
            Direction::Long => delta * self.shares,
            Direction::Short => -delta * self.shares,
        }
    }

    pub(crate) fn update_price(&mut self, price: Decimal) {
        self.current_price = price;
    }

    /// Exit rule evaluated against the current price and clock.
    #[must_use]
    pub fn exit_signal(&self, now_ms: i64, max_hold_ms: i64) -> Option<CloseReason> {
        let price = self.current_price;
        let (target_hit, stopped) = match self.direction {
            Direction::Long => (
                price >= self.take_profit_price,
                price <= self.stop_loss_price,
            ),
            Direction::Short => (
                price <= self.take_profit_price,
                price >= self.stop_loss_price,
            ),
        };

        if target_hit {
            Some(CloseReason::TargetHit)
        } else if stopped {
            Some(CloseReason::MomentumStall)
        } else if now_ms.saturating_sub(self.opened_at_ms) >= max_hold_ms {
            Some(CloseReason::TimeStop)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bounds() -> ExitBounds {
        ExitBounds {
            take_profit_pct: dec!(0.20),
            stop_loss_pct: dec!(0.10),
        }
    }

    fn position(direction: Direction) -> TrackedPosition {
        TrackedPosition::open(
            InstrumentId::from("t"),
            None,
            dec!(0.50),
            dec!(10),
            direction,
            Strategy::Aggressive,
            1_000,
            bounds(),
        )
    }

    #[test]
    fn long_bounds_are_symmetric_around_entry() {
        let pos = position(Direction::Long);
        assert_eq!(pos.take_profit_price(), dec!(0.60));
        assert_eq!(pos.stop_loss_price(), dec!(0.45));
    }

    #[test]
    fn short_bounds_are_inverted() {
        let pos = position(Direction::Short);
        assert_eq!(pos.take_profit_price(), dec!(0.40));
        assert_eq!(pos.stop_loss_price(), dec!(0.55));
    }

    #[test]
    fn bounds_are_clamped_inside_unit_interval() {
        let pos = TrackedPosition::open(
            InstrumentId::from("t"),
            None,
            dec!(0.95),
            dec!(10),
            Direction::Long,
            Strategy::Adaptive,
            0,
            bounds(),
        );
        assert_eq!(pos.take_profit_price(), dec!(0.99));
    }

    #[test]
    fn exit_signals_follow_direction() {
        let mut long = position(Direction::Long);
        assert_eq!(long.exit_signal(2_000, 60_000), None);
        long.update_price(dec!(0.61));
        assert_eq!(long.exit_signal(2_000, 60_000), Some(CloseReason::TargetHit));
        long.update_price(dec!(0.44));
        assert_eq!(
            long.exit_signal(2_000, 60_000),
            Some(CloseReason::MomentumStall)
        );

        let mut short = position(Direction::Short);
        short.update_price(dec!(0.39));
        assert_eq!(short.exit_signal(2_000, 60_000), Some(CloseReason::TargetHit));
        assert!(short.unrealized_pnl() > Decimal::ZERO);
    }

    #[test]
    fn time_stop_fires_after_max_hold() {
        let pos = position(Direction::Long);
        assert_eq!(pos.exit_signal(60_999, 60_000), None);
        assert_eq!(pos.exit_signal(61_000, 60_000), Some(CloseReason::TimeStop));
    }
}
