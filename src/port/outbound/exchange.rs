//! Streaming market-data port.
//!
//! One [`MarketDataStream`] backs one exchange channel (public market data
//! or the authenticated user channel). The hub owns each stream inside a
//! supervisor task and never shares it.

use async_trait::async_trait;

use crate::domain::{
    Fill, InstrumentId, InstrumentResolved, NewInstrument, PriceUpdate, TradePrint,
};
use crate::error::Error;

/// Events received from a market data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    /// Best bid/ask or last-trade price tick.
    Price(PriceUpdate),
    /// Trade print with counterparty identity.
    Trade(TradePrint),
    /// A newly listed instrument.
    NewInstrument(NewInstrument),
    /// Fill on one of our own orders (user channel only).
    Fill(Fill),
    /// A market resolved.
    Resolved(InstrumentResolved),
    /// Reply to a heartbeat.
    Pong,
    /// Connection established.
    Connected,
    /// Connection lost (may reconnect).
    Disconnected {
        /// The disconnection reason.
        reason: String,
    },
}

impl MarketEvent {
    /// Instrument the event refers to, if it refers to exactly one.
    #[must_use]
    pub fn instrument_id(&self) -> Option<&InstrumentId> {
        match self {
            Self::Price(update) => Some(&update.instrument_id),
            Self::Trade(trade) => Some(&trade.instrument_id),
            Self::NewInstrument(listing) => Some(&listing.metadata.instrument_id),
            Self::Fill(fill) => Some(&fill.instrument_id),
            _ => None,
        }
    }

    /// True for events carrying market data (as opposed to connection state).
    #[must_use]
    pub const fn is_data(&self) -> bool {
        !matches!(
            self,
            Self::Pong | Self::Connected | Self::Disconnected { .. }
        )
    }
}

/// Real-time market data stream from an exchange.
///
/// Implementations handle the wire protocol for a single channel. Connection
/// supervision (reconnect, heartbeat deadlines, subscription replay) lives in
/// the hub so every adapter gets identical recovery behaviour.
///
/// `next_event` must be cancel-safe: the hub polls it inside `select!`.
#[async_trait]
pub trait MarketDataStream: Send {
    /// Connect to the exchange's real-time data feed.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Subscribe to market data for the given instruments.
    async fn subscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<(), Error>;

    /// Stop receiving market data for the given instruments.
    async fn unsubscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<(), Error>;

    /// Send a heartbeat; the exchange answers with [`MarketEvent::Pong`].
    async fn heartbeat(&mut self) -> Result<(), Error>;

    /// Receive the next event. Returns `None` when the stream is closed.
    async fn next_event(&mut self) -> Option<MarketEvent>;

    /// Channel name for logging ("market", "user").
    fn channel_name(&self) -> &'static str;
}

#[async_trait]
impl MarketDataStream for Box<dyn MarketDataStream> {
    async fn connect(&mut self) -> Result<(), Error> {
        (**self).connect().await
    }

    async fn subscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<(), Error> {
        (**self).subscribe(instrument_ids).await
    }

    async fn unsubscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<(), Error> {
        (**self).unsubscribe(instrument_ids).await
    }

    async fn heartbeat(&mut self) -> Result<(), Error> {
        (**self).heartbeat().await
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        (**self).next_event().await
    }

    fn channel_name(&self) -> &'static str {
        (**self).channel_name()
    }
}
