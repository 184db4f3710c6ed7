//! Order and execution result types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::detection::{Direction, Strategy};
use super::id::{InstrumentId, OrderId};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that opens a position in `direction`.
    #[must_use]
    pub const fn opening(direction: Direction) -> Self {
        match direction {
            Direction::Long => Self::Buy,
            Direction::Short => Self::Sell,
        }
    }

    /// Side that closes a position in `direction`.
    #[must_use]
    pub const fn closing(direction: Direction) -> Self {
        match direction {
            Direction::Long => Self::Sell,
            Direction::Short => Self::Buy,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of an order must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FulfillmentMode {
    /// Fill completely or cancel (FOK).
    FillOrKill,
    /// Fill what is available, cancel the remainder (FAK).
    FillAndKill,
}

impl FulfillmentMode {
    /// Fulfillment mode used for entries with `strategy`.
    #[must_use]
    pub const fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Conservative => Self::FillOrKill,
            Strategy::Aggressive | Strategy::Adaptive => Self::FillAndKill,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FillOrKill => "FOK",
            Self::FillAndKill => "FAK",
        }
    }
}

/// Order quantity, either notional or share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSize {
    Usd(Decimal),
    Shares(Decimal),
}

/// Order handed to the exchange adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument_id: InstrumentId,
    /// Outcome label of the instrument, when known.
    pub outcome: Option<String>,
    pub side: OrderSide,
    pub size: OrderSize,
    pub price_limit: Option<Decimal>,
    pub fulfillment: FulfillmentMode,
}

/// Adapter acknowledgement for a submitted order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderAck {
    pub success: bool,
    pub order_id: Option<OrderId>,
    pub shares_filled: Decimal,
    pub price_filled: Decimal,
    pub error: Option<String>,
}

impl OrderAck {
    /// Successful acknowledgement.
    #[must_use]
    pub fn filled(order_id: impl Into<OrderId>, shares: Decimal, price: Decimal) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            shares_filled: shares,
            price_filled: price,
            error: None,
        }
    }

    /// Rejected acknowledgement.
    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Result of executing one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<OrderId>,
    pub shares_filled: Decimal,
    pub price_filled: Decimal,
    /// Relative difference between fill price and observed price.
    pub slippage: Decimal,
    pub strategy: Strategy,
    pub execution_time_ms: u64,
    pub error_msg: Option<String>,
}

impl ExecutionResult {
    /// Failed result that never reached (or was refused by) the exchange.
    #[must_use]
    pub fn failed(strategy: Strategy, reason: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            order_id: None,
            shares_filled: Decimal::ZERO,
            price_filled: Decimal::ZERO,
            slippage: Decimal::ZERO,
            strategy,
            execution_time_ms,
            error_msg: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservative_is_all_or_nothing() {
        assert_eq!(
            FulfillmentMode::for_strategy(Strategy::Conservative),
            FulfillmentMode::FillOrKill
        );
        assert_eq!(
            FulfillmentMode::for_strategy(Strategy::Aggressive),
            FulfillmentMode::FillAndKill
        );
        assert_eq!(
            FulfillmentMode::for_strategy(Strategy::Adaptive),
            FulfillmentMode::FillAndKill
        );
    }

    #[test]
    fn closing_side_inverts_opening_side() {
        for direction in [Direction::Long, Direction::Short] {
            assert_ne!(OrderSide::opening(direction), OrderSide::closing(direction));
        }
    }
}
