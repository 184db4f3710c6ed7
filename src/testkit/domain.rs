//! Builders for domain primitives used across tests.
//!
//! Concise factories for hub events and detections so tests focus on
//! assertions rather than construction boilerplate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{
    DetectionEvent, DetectionMetadata, InstrumentId, InstrumentMetadata, NewInstrument,
    OrderSide, PriceUpdate, Strategy, TradePrint, Trigger,
};
use crate::port::outbound::exchange::MarketEvent;

/// 2023-11-14 14:00:00 UTC.
pub const AFTERNOON_MS: i64 = 1_699_970_400_000;
/// 2023-11-14 02:00:00 UTC.
pub const NIGHT_MS: i64 = 1_699_927_200_000;

/// Price tick without bid/ask or volume.
pub fn price_update(id: &str, price: Decimal, timestamp_ms: i64) -> PriceUpdate {
    PriceUpdate {
        instrument_id: InstrumentId::from(id),
        condition_id: None,
        price,
        best_bid: None,
        best_ask: None,
        volume: None,
        timestamp_ms,
    }
}

/// Price tick that carries traded volume.
pub fn traded_update(id: &str, price: Decimal, volume: Decimal, timestamp_ms: i64) -> PriceUpdate {
    PriceUpdate {
        volume: Some(volume),
        ..price_update(id, price, timestamp_ms)
    }
}

pub fn price_event(id: &str, price: Decimal, timestamp_ms: i64) -> MarketEvent {
    MarketEvent::Price(price_update(id, price, timestamp_ms))
}

pub fn disconnect_event(reason: &str) -> MarketEvent {
    MarketEvent::Disconnected {
        reason: reason.to_string(),
    }
}

pub fn trade_print(
    id: &str,
    side: OrderSide,
    price: Decimal,
    size: Decimal,
    timestamp_ms: i64,
) -> TradePrint {
    TradePrint {
        instrument_id: InstrumentId::from(id),
        condition_id: None,
        side,
        price,
        size,
        maker: None,
        taker: None,
        transaction_hash: None,
        timestamp_ms,
    }
}

/// Public trade by `wallet` with a transaction hash, as the polled feed returns it.
pub fn wallet_trade(id: &str, wallet: &str, tx: &str, timestamp_ms: i64) -> TradePrint {
    TradePrint {
        taker: Some(wallet.to_string()),
        transaction_hash: Some(tx.to_string()),
        ..trade_print(id, OrderSide::Buy, dec!(0.50), dec!(10), timestamp_ms)
    }
}

pub fn new_instrument_event(id: &str, question: &str, timestamp_ms: i64) -> MarketEvent {
    MarketEvent::NewInstrument(NewInstrument {
        metadata: metadata(id, question),
        timestamp_ms,
    })
}

pub fn metadata(id: &str, question: &str) -> InstrumentMetadata {
    InstrumentMetadata {
        instrument_id: InstrumentId::from(id),
        condition_id: None,
        question: question.to_string(),
        image: None,
        slug: None,
        outcome: Some("Yes".to_string()),
        placeholder: false,
    }
}

/// Start a [`DetectionEvent`] for `id`: a 0.50 → 0.53 long move with 0.9
/// confidence, risk hint 20 and no volatility, at [`AFTERNOON_MS`].
pub fn detection(id: &str) -> DetectionBuilder {
    DetectionBuilder {
        instrument_id: InstrumentId::from(id),
        old_price: dec!(0.50),
        new_price: dec!(0.53),
        velocity: 0.06,
        momentum: 0.0,
        volume_spike: 0.0,
        confidence: 0.9,
        hint: 20.0,
        volatility: 0.0,
        timestamp_ms: AFTERNOON_MS,
    }
}

#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    instrument_id: InstrumentId,
    old_price: Decimal,
    new_price: Decimal,
    velocity: f64,
    momentum: f64,
    volume_spike: f64,
    confidence: f64,
    hint: f64,
    volatility: f64,
    timestamp_ms: i64,
}

impl DetectionBuilder {
    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn volume_spike(mut self, volume_spike: f64) -> Self {
        self.volume_spike = volume_spike;
        self
    }

    pub fn hint(mut self, hint: f64) -> Self {
        self.hint = hint;
        self
    }

    pub fn prices(mut self, old_price: Decimal, new_price: Decimal) -> Self {
        self.old_price = old_price;
        self.new_price = new_price;
        self
    }

    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn build(self) -> DetectionEvent {
        let mut triggers = vec![Trigger::Velocity];
        if self.volume_spike > 0.0 {
            triggers.push(Trigger::VolumeSpike);
        }
        DetectionEvent {
            instrument_id: self.instrument_id,
            condition_id: None,
            old_price: self.old_price,
            new_price: self.new_price,
            velocity: self.velocity,
            momentum: self.momentum,
            volume_spike: self.volume_spike,
            confidence: self.confidence,
            risk_score_hint: self.hint,
            strategy_hint: Strategy::Aggressive,
            timestamp_ms: self.timestamp_ms,
            metadata: DetectionMetadata {
                triggers,
                micro_velocity: None,
                volatility: self.volatility,
                samples: 2,
                window_ms: 2_000,
                best_bid: None,
                best_ask: None,
            },
        }
    }
}
