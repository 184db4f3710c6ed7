//! Typed event bus: one broadcast channel per canonical event type.
//!
//! Registering a listener means taking a receiver with
//! [`EventBus::listen`]; dropping the receiver unregisters it. Every
//! listener sees events in publish order. A listener that falls more than
//! the channel capacity behind skips the oldest events and is told how many.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::domain::{
    EventKind, Fill, InstrumentId, InstrumentResolved, NewInstrument, PriceUpdate, TradePrint,
};

/// Instruments purged by the reaper.
///
/// Listeners holding per-instrument state should drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentsEvicted {
    pub instruments: Vec<InstrumentId>,
    pub timestamp_ms: i64,
}

/// An event type carried by the bus.
pub trait HubEvent: Clone + Send + 'static {
    /// Event name for logs.
    const NAME: &'static str;

    #[doc(hidden)]
    fn channel(bus: &EventBus) -> &broadcast::Sender<Self>;
}

/// Broadcast channels for every hub event type.
#[derive(Debug)]
pub struct EventBus {
    price: broadcast::Sender<PriceUpdate>,
    trade: broadcast::Sender<TradePrint>,
    new_instrument: broadcast::Sender<NewInstrument>,
    fill: broadcast::Sender<Fill>,
    resolved: broadcast::Sender<InstrumentResolved>,
    evicted: broadcast::Sender<InstrumentsEvicted>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            price: broadcast::channel(capacity).0,
            trade: broadcast::channel(capacity).0,
            new_instrument: broadcast::channel(capacity).0,
            fill: broadcast::channel(capacity).0,
            resolved: broadcast::channel(capacity).0,
            evicted: broadcast::channel(capacity).0,
        }
    }

    /// Register a listener for `E`.
    #[must_use]
    pub fn listen<E: HubEvent>(&self) -> broadcast::Receiver<E> {
        E::channel(self).subscribe()
    }

    /// Publish to every current listener; returns how many received it.
    pub fn publish<E: HubEvent>(&self, event: E) -> usize {
        // No listeners is not an error.
        E::channel(self).send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn listener_count<E: HubEvent>(&self) -> usize {
        E::channel(self).receiver_count()
    }
}

impl HubEvent for PriceUpdate {
    const NAME: &'static str = EventKind::PriceUpdate.as_str();

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.price
    }
}

impl HubEvent for TradePrint {
    const NAME: &'static str = EventKind::Trade.as_str();

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.trade
    }
}

impl HubEvent for NewInstrument {
    const NAME: &'static str = EventKind::NewInstrument.as_str();

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.new_instrument
    }
}

impl HubEvent for Fill {
    const NAME: &'static str = EventKind::Fill.as_str();

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.fill
    }
}

impl HubEvent for InstrumentResolved {
    const NAME: &'static str = EventKind::InstrumentResolved.as_str();

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.resolved
    }
}

impl HubEvent for InstrumentsEvicted {
    const NAME: &'static str = "instruments_evicted";

    fn channel(bus: &EventBus) -> &broadcast::Sender<Self> {
        &bus.evicted
    }
}

/// Receive the next event, logging and skipping over lag.
///
/// Returns `None` once the bus is gone. Cancel-safe.
pub async fn recv_event<E: HubEvent>(rx: &mut broadcast::Receiver<E>) -> Option<E> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(event = E::NAME, skipped, "Listener lagged, skipping events");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::price_update;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn every_listener_receives_in_order() {
        let bus = EventBus::new(16);
        let mut a = bus.listen::<PriceUpdate>();
        let mut b = bus.listen::<PriceUpdate>();

        bus.publish(price_update("t1", dec!(0.40), 1_000));
        bus.publish(price_update("t1", dec!(0.41), 2_000));

        for rx in [&mut a, &mut b] {
            assert_eq!(recv_event(rx).await.map(|e| e.price), Some(dec!(0.40)));
            assert_eq!(recv_event(rx).await.map(|e| e.price), Some(dec!(0.41)));
        }
    }

    #[tokio::test]
    async fn dropping_receiver_unregisters() {
        let bus = EventBus::new(16);
        let rx = bus.listen::<TradePrint>();
        assert_eq!(bus.listener_count::<TradePrint>(), 1);

        drop(rx);
        assert_eq!(bus.listener_count::<TradePrint>(), 0);
    }

    #[tokio::test]
    async fn publish_without_listeners_is_fine() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(price_update("t1", dec!(0.5), 1)), 0);
    }

    #[tokio::test]
    async fn lagged_listener_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut rx = bus.listen::<PriceUpdate>();
        for i in 1..=5 {
            bus.publish(price_update("t1", dec!(0.40), i));
        }

        let first = recv_event(&mut rx).await.map(|e| e.timestamp_ms);
        assert_eq!(first, Some(4));
    }
}
