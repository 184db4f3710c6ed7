//! Canonical market events published by the ingestion hub.
//!
//! Adapters translate exchange wire messages into these types; subscribers
//! only ever see copies of them.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::execution::OrderSide;
use super::id::{ConditionId, InstrumentId, OrderId};

/// The fixed set of event types a consumer can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PriceUpdate,
    Trade,
    NewInstrument,
    Fill,
    InstrumentResolved,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceUpdate => "price_update",
            Self::Trade => "trade",
            Self::NewInstrument => "new_instrument",
            Self::Fill => "fill",
            Self::InstrumentResolved => "instrument_resolved",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive data for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMetadata {
    pub instrument_id: InstrumentId,
    pub condition_id: Option<ConditionId>,
    pub question: String,
    pub image: Option<String>,
    pub slug: Option<String>,
    /// Outcome label of this token (e.g. "Yes").
    pub outcome: Option<String>,
    /// True when synthesized because the exchange does not know the instrument.
    pub placeholder: bool,
}

impl InstrumentMetadata {
    /// Synthetic metadata for an instrument the exchange reports as missing.
    #[must_use]
    pub fn placeholder(instrument_id: InstrumentId) -> Self {
        let question = format!("Unknown market ({instrument_id})");
        Self {
            instrument_id,
            condition_id: None,
            question,
            image: None,
            slug: None,
            outcome: None,
            placeholder: true,
        }
    }
}

/// Best bid/ask or last-trade price tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub instrument_id: InstrumentId,
    pub condition_id: Option<ConditionId>,
    pub price: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    /// Size traded with this tick, when it came from a trade.
    pub volume: Option<Decimal>,
    pub timestamp_ms: i64,
}

/// A public trade print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePrint {
    pub instrument_id: InstrumentId,
    pub condition_id: Option<ConditionId>,
    pub side: OrderSide,
    pub price: Decimal,
    /// Size in shares.
    pub size: Decimal,
    pub maker: Option<String>,
    pub taker: Option<String>,
    pub transaction_hash: Option<String>,
    pub timestamp_ms: i64,
}

impl TradePrint {
    /// Notional value of the print.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// True when `wallet` is either counterparty.
    #[must_use]
    pub fn involves(&self, wallet: &str) -> bool {
        let matches = |w: &Option<String>| w.as_deref().is_some_and(|w| w.eq_ignore_ascii_case(wallet));
        matches(&self.maker) || matches(&self.taker)
    }
}

/// A newly listed instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstrument {
    pub metadata: InstrumentMetadata,
    pub timestamp_ms: i64,
}

/// A fill on one of the account's own orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub instrument_id: InstrumentId,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub timestamp_ms: i64,
}

/// A market resolved; its instruments stop trading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentResolved {
    pub condition_id: ConditionId,
    pub instruments: Vec<InstrumentId>,
    pub winning_instrument: Option<InstrumentId>,
    pub winning_outcome: Option<String>,
    pub timestamp_ms: i64,
}
