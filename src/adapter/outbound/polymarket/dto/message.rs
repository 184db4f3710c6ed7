//! Polymarket WebSocket messages.
//!
//! Market-channel frames arrive either as a single object or as a JSON array
//! of objects, each tagged with an `event_type`. Activity frames carry trade
//! prints with wallet identity under a `payload`. Numeric fields may be JSON
//! strings or numbers.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{
    ConditionId, Fill, InstrumentId, InstrumentMetadata, InstrumentResolved, NewInstrument,
    OrderId, OrderSide, PriceUpdate, TradePrint,
};
use crate::port::outbound::exchange::MarketEvent;

/// Text heartbeat sent to the server.
pub const PING: &str = "PING";
/// Text heartbeat reply from the server.
pub const PONG: &str = "PONG";

/// Subscription request for the market channel.
#[derive(Debug, Serialize)]
pub struct MarketSubscribe {
    pub assets_ids: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

impl MarketSubscribe {
    pub fn new(assets_ids: Vec<String>) -> Self {
        Self {
            assets_ids,
            msg_type: "market",
        }
    }
}

/// Unsubscribe request for the market channel.
#[derive(Debug, Serialize)]
pub struct MarketUnsubscribe {
    pub assets_ids: Vec<String>,
    pub operation: &'static str,
}

impl MarketUnsubscribe {
    pub fn new(assets_ids: Vec<String>) -> Self {
        Self {
            assets_ids,
            operation: "unsubscribe",
        }
    }
}

/// Authentication payload for the user channel.
#[derive(Debug, Serialize)]
pub struct UserAuth<'a> {
    pub auth: UserAuthCredentials<'a>,
    pub markets: Vec<String>,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserAuthCredentials<'a> {
    #[serde(rename = "apiKey")]
    pub api_key: &'a str,
    pub secret: &'a str,
    pub passphrase: &'a str,
}

/// A number sent as either a JSON string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Text(String),
    Number(serde_json::Number),
}

impl WireNumber {
    pub fn decimal(&self) -> Option<Decimal> {
        let raw = match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
    }

    /// Epoch milliseconds; values small enough to be seconds are scaled.
    pub fn timestamp_ms(&self) -> Option<i64> {
        let value = match self {
            Self::Text(s) => s.trim().parse::<i64>().ok()?,
            Self::Number(n) => n.as_i64()?,
        };
        Some(if value < 10_000_000_000 { value * 1_000 } else { value })
    }
}

fn stamp(timestamp: Option<&WireNumber>, received_ms: i64) -> i64 {
    timestamp
        .and_then(WireNumber::timestamp_ms)
        .unwrap_or(received_ms)
}

fn side(raw: Option<&str>) -> Option<OrderSide> {
    match raw?.to_ascii_uppercase().as_str() {
        "BUY" => Some(OrderSide::Buy),
        "SELL" => Some(OrderSide::Sell),
        _ => None,
    }
}

fn midpoint(best_bid: Option<Decimal>, best_ask: Option<Decimal>) -> Option<Decimal> {
    match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

/// One frame from the market channel.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MarketFrame {
    Activity(ActivityMessage),
    Batch(Vec<MarketMessage>),
    Single(MarketMessage),
}

impl MarketFrame {
    /// Canonical events carried by this frame.
    pub fn into_events(self, received_ms: i64) -> Vec<MarketEvent> {
        match self {
            Self::Activity(activity) => activity.into_event(received_ms).into_iter().collect(),
            Self::Batch(messages) => messages
                .into_iter()
                .flat_map(|m| m.into_events(received_ms))
                .collect(),
            Self::Single(message) => message.into_events(received_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketMessage {
    Book(BookMessage),
    PriceChange(PriceChangeMessage),
    LastTradePrice(LastTradeMessage),
    NewMarket(NewMarketMessage),
    MarketResolved(MarketResolvedMessage),
    #[serde(other)]
    Other,
}

impl MarketMessage {
    pub fn into_events(self, received_ms: i64) -> Vec<MarketEvent> {
        match self {
            Self::Book(book) => book.into_update(received_ms).map(MarketEvent::Price).into_iter().collect(),
            Self::PriceChange(change) => change
                .into_updates(received_ms)
                .into_iter()
                .map(MarketEvent::Price)
                .collect(),
            Self::LastTradePrice(trade) => trade.into_events(received_ms),
            Self::NewMarket(listing) => listing
                .into_instruments(received_ms)
                .into_iter()
                .map(MarketEvent::NewInstrument)
                .collect(),
            Self::MarketResolved(resolved) => vec![MarketEvent::Resolved(resolved.into_event(received_ms))],
            Self::Other => Vec::new(),
        }
    }
}

/// Price level as received (strings, not decimals).
#[derive(Debug, Clone, Deserialize)]
pub struct WireLevel {
    pub price: WireNumber,
    pub size: WireNumber,
}

/// Full book snapshot for one asset.
#[derive(Debug, Deserialize)]
pub struct BookMessage {
    pub asset_id: String,
    pub market: Option<String>,
    #[serde(default)]
    pub bids: Vec<WireLevel>,
    #[serde(default)]
    pub asks: Vec<WireLevel>,
    pub timestamp: Option<WireNumber>,
}

impl BookMessage {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().filter_map(|l| l.price.decimal()).max()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().filter_map(|l| l.price.decimal()).min()
    }

    /// Midpoint tick, or `None` for an empty book.
    pub fn into_update(self, received_ms: i64) -> Option<PriceUpdate> {
        let best_bid = self.best_bid();
        let best_ask = self.best_ask();
        let price = midpoint(best_bid, best_ask)?;
        Some(PriceUpdate {
            instrument_id: InstrumentId::from(self.asset_id),
            condition_id: self.market.map(ConditionId::from),
            price,
            best_bid,
            best_ask,
            volume: None,
            timestamp_ms: stamp(self.timestamp.as_ref(), received_ms),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceChangeMessage {
    pub market: Option<String>,
    #[serde(default)]
    pub price_changes: Vec<PriceChange>,
    pub timestamp: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
pub struct PriceChange {
    pub asset_id: String,
    pub price: WireNumber,
    pub best_bid: Option<WireNumber>,
    pub best_ask: Option<WireNumber>,
}

impl PriceChangeMessage {
    pub fn into_updates(self, received_ms: i64) -> Vec<PriceUpdate> {
        let timestamp_ms = stamp(self.timestamp.as_ref(), received_ms);
        let market = self.market;
        self.price_changes
            .into_iter()
            .filter_map(|change| {
                let best_bid = change.best_bid.as_ref().and_then(WireNumber::decimal);
                let best_ask = change.best_ask.as_ref().and_then(WireNumber::decimal);
                let price = midpoint(best_bid, best_ask).or_else(|| change.price.decimal())?;
                Some(PriceUpdate {
                    instrument_id: InstrumentId::from(change.asset_id),
                    condition_id: market.clone().map(ConditionId::from),
                    price,
                    best_bid,
                    best_ask,
                    volume: None,
                    timestamp_ms,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct LastTradeMessage {
    pub asset_id: String,
    pub market: Option<String>,
    pub price: WireNumber,
    pub size: Option<WireNumber>,
    pub side: Option<String>,
    pub timestamp: Option<WireNumber>,
    pub transaction_hash: Option<String>,
}

impl LastTradeMessage {
    /// A price tick carrying the traded size, plus the anonymous trade print.
    pub fn into_events(self, received_ms: i64) -> Vec<MarketEvent> {
        let Some(price) = self.price.decimal() else {
            trace!(asset_id = %self.asset_id, "Dropping last trade without price");
            return Vec::new();
        };
        let size = self.size.as_ref().and_then(WireNumber::decimal);
        let timestamp_ms = stamp(self.timestamp.as_ref(), received_ms);
        let instrument_id = InstrumentId::from(self.asset_id);
        let condition_id = self.market.map(ConditionId::from);

        let mut events = vec![MarketEvent::Price(PriceUpdate {
            instrument_id: instrument_id.clone(),
            condition_id: condition_id.clone(),
            price,
            best_bid: None,
            best_ask: None,
            volume: size,
            timestamp_ms,
        })];
        if let (Some(size), Some(side)) = (size, side(self.side.as_deref())) {
            events.push(MarketEvent::Trade(TradePrint {
                instrument_id,
                condition_id,
                side,
                price,
                size,
                maker: None,
                taker: None,
                transaction_hash: self.transaction_hash,
                timestamp_ms,
            }));
        }
        events
    }
}

#[derive(Debug, Deserialize)]
pub struct NewMarketMessage {
    #[serde(default)]
    pub question: String,
    /// Condition id.
    pub market: Option<String>,
    pub slug: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub assets_ids: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    pub timestamp: Option<WireNumber>,
}

impl NewMarketMessage {
    pub fn into_instruments(self, received_ms: i64) -> Vec<NewInstrument> {
        let timestamp_ms = stamp(self.timestamp.as_ref(), received_ms);
        self.assets_ids
            .iter()
            .enumerate()
            .map(|(i, asset)| NewInstrument {
                metadata: InstrumentMetadata {
                    instrument_id: InstrumentId::from(asset.as_str()),
                    condition_id: self.market.clone().map(ConditionId::from),
                    question: self.question.clone(),
                    image: self.image.clone(),
                    slug: self.slug.clone(),
                    outcome: self.outcomes.get(i).cloned(),
                    placeholder: false,
                },
                timestamp_ms,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketResolvedMessage {
    pub market: String,
    #[serde(default)]
    pub assets_ids: Vec<String>,
    pub winning_asset_id: Option<String>,
    pub winning_outcome: Option<String>,
    pub timestamp: Option<WireNumber>,
}

impl MarketResolvedMessage {
    pub fn into_event(self, received_ms: i64) -> InstrumentResolved {
        InstrumentResolved {
            condition_id: ConditionId::from(self.market),
            instruments: self.assets_ids.into_iter().map(InstrumentId::from).collect(),
            winning_instrument: self.winning_asset_id.map(InstrumentId::from),
            winning_outcome: self.winning_outcome,
            timestamp_ms: stamp(self.timestamp.as_ref(), received_ms),
        }
    }
}

/// Activity feed frame with a wallet-attributed trade.
#[derive(Debug, Deserialize)]
pub struct ActivityMessage {
    pub topic: String,
    pub payload: WireTrade,
}

impl ActivityMessage {
    pub fn into_event(self, received_ms: i64) -> Option<MarketEvent> {
        if self.topic != "activity" {
            return None;
        }
        self.payload.into_print(received_ms).map(MarketEvent::Trade)
    }
}

/// Wallet-attributed trade, shared by the activity feed and the Data API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTrade {
    pub asset: String,
    pub condition_id: Option<String>,
    pub side: String,
    pub price: WireNumber,
    pub size: WireNumber,
    pub proxy_wallet: Option<String>,
    pub transaction_hash: Option<String>,
    pub timestamp: Option<WireNumber>,
}

impl WireTrade {
    pub fn into_print(self, received_ms: i64) -> Option<TradePrint> {
        Some(TradePrint {
            instrument_id: InstrumentId::from(self.asset),
            condition_id: self.condition_id.map(ConditionId::from),
            side: side(Some(&self.side))?,
            price: self.price.decimal()?,
            size: self.size.decimal()?,
            maker: None,
            taker: self.proxy_wallet,
            transaction_hash: self.transaction_hash,
            timestamp_ms: stamp(self.timestamp.as_ref(), received_ms),
        })
    }
}

/// One frame from the user channel.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserFrame {
    Batch(Vec<UserMessage>),
    Single(UserMessage),
}

impl UserFrame {
    pub fn into_messages(self) -> Vec<UserMessage> {
        match self {
            Self::Batch(messages) => messages,
            Self::Single(message) => vec![message],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum UserMessage {
    Trade(UserTrade),
    Order(UserOrder),
    #[serde(other)]
    Other,
}

/// A match on one of our orders.
#[derive(Debug, Deserialize)]
pub struct UserTrade {
    pub id: String,
    pub asset_id: String,
    pub side: String,
    pub price: WireNumber,
    pub size: WireNumber,
    pub taker_order_id: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<WireNumber>,
}

impl UserTrade {
    pub fn into_fill(self, received_ms: i64) -> Option<Fill> {
        Some(Fill {
            order_id: OrderId::from(self.taker_order_id.unwrap_or(self.id)),
            instrument_id: InstrumentId::from(self.asset_id),
            side: side(Some(&self.side))?,
            price: self.price.decimal()?,
            size: self.size.decimal()?,
            timestamp_ms: stamp(self.timestamp.as_ref(), received_ms),
        })
    }
}

/// Order placement, update or cancellation.
#[derive(Debug, Deserialize)]
pub struct UserOrder {
    pub id: String,
    pub asset_id: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const NOW: i64 = 1_700_000_000_000;

    fn market(json: &str) -> Vec<MarketEvent> {
        serde_json::from_str::<MarketFrame>(json)
            .unwrap()
            .into_events(NOW)
    }

    #[test]
    fn subscribe_and_unsubscribe_serialize() {
        let json = serde_json::to_string(&MarketSubscribe::new(vec!["t1".into()])).unwrap();
        assert_eq!(json, r#"{"assets_ids":["t1"],"type":"market"}"#);

        let json = serde_json::to_string(&MarketUnsubscribe::new(vec!["t1".into()])).unwrap();
        assert_eq!(json, r#"{"assets_ids":["t1"],"operation":"unsubscribe"}"#);
    }

    #[test]
    fn user_auth_uses_camel_case_key() {
        let auth = UserAuth {
            auth: UserAuthCredentials {
                api_key: "k",
                secret: "s",
                passphrase: "p",
            },
            markets: Vec::new(),
            msg_type: "user",
        };
        let json = serde_json::to_string(&auth).unwrap();
        assert!(json.contains(r#""apiKey":"k""#));
        assert!(json.contains(r#""type":"user""#));
    }

    #[test]
    fn book_becomes_midpoint_tick() {
        let events = market(
            r#"[{"event_type":"book","asset_id":"t1","market":"0xc",
                "bids":[{"price":"0.44","size":"10"},{"price":"0.45","size":"5"}],
                "asks":[{"price":"0.56","size":"10"},{"price":"0.55","size":"5"}],
                "timestamp":"1700000000123"}]"#,
        );

        let [MarketEvent::Price(update)] = events.as_slice() else {
            panic!("expected one price update, got {events:?}");
        };
        assert_eq!(update.price, dec!(0.50));
        assert_eq!(update.best_bid, Some(dec!(0.45)));
        assert_eq!(update.best_ask, Some(dec!(0.55)));
        assert_eq!(update.timestamp_ms, 1_700_000_000_123);
        assert_eq!(update.condition_id, Some(ConditionId::from("0xc")));
    }

    #[test]
    fn empty_book_is_dropped() {
        assert!(market(r#"{"event_type":"book","asset_id":"t1","bids":[],"asks":[]}"#).is_empty());
    }

    #[test]
    fn price_change_emits_one_update_per_asset() {
        let events = market(
            r#"{"event_type":"price_change","market":"0xc","timestamp":"1700000000000",
                "price_changes":[
                  {"asset_id":"t1","price":"0.40","best_bid":"0.39","best_ask":"0.41"},
                  {"asset_id":"t2","price":"0.60"}]}"#,
        );
        assert_eq!(events.len(), 2);
        let MarketEvent::Price(second) = &events[1] else {
            panic!("expected price update");
        };
        assert_eq!(second.price, dec!(0.60));
    }

    #[test]
    fn last_trade_yields_tick_and_print() {
        let events = market(
            r#"{"event_type":"last_trade_price","asset_id":"t1","market":"0xc",
                "price":"0.52","size":"100","side":"BUY","timestamp":"1700000000000"}"#,
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], MarketEvent::Price(p) if p.volume == Some(dec!(100))));
        assert!(matches!(&events[1], MarketEvent::Trade(t) if t.side == OrderSide::Buy));
    }

    #[test]
    fn new_market_pairs_assets_with_outcomes() {
        let events = market(
            r#"{"event_type":"new_market","question":"Will it rain?","market":"0xc",
                "assets_ids":["yes-id","no-id"],"outcomes":["Yes","No"]}"#,
        );
        assert_eq!(events.len(), 2);
        let MarketEvent::NewInstrument(no) = &events[1] else {
            panic!("expected new instrument");
        };
        assert_eq!(no.metadata.outcome.as_deref(), Some("No"));
        assert_eq!(no.timestamp_ms, NOW);
    }

    #[test]
    fn resolution_names_the_winner() {
        let events = market(
            r#"{"event_type":"market_resolved","market":"0xc","assets_ids":["a","b"],
                "winning_asset_id":"a","winning_outcome":"Yes"}"#,
        );
        let [MarketEvent::Resolved(resolved)] = events.as_slice() else {
            panic!("expected resolution");
        };
        assert_eq!(resolved.winning_instrument, Some(InstrumentId::from("a")));
        assert_eq!(resolved.instruments.len(), 2);
    }

    #[test]
    fn activity_trade_carries_wallet() {
        let events = market(
            r#"{"topic":"activity","type":"trades","payload":{
                "asset":"t1","conditionId":"0xc","side":"SELL","price":0.31,"size":12.5,
                "proxyWallet":"0xabc","transactionHash":"0xhash","timestamp":1700000000}}"#,
        );
        let [MarketEvent::Trade(trade)] = events.as_slice() else {
            panic!("expected trade");
        };
        assert_eq!(trade.taker.as_deref(), Some("0xabc"));
        assert_eq!(trade.price, dec!(0.31));
        assert_eq!(trade.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        assert!(market(r#"{"event_type":"tick_size_change","asset_id":"t1"}"#).is_empty());
    }

    #[test]
    fn user_trade_becomes_fill() {
        let frame: UserFrame = serde_json::from_str(
            r#"{"event_type":"trade","id":"m1","asset_id":"t1","side":"BUY",
                "price":"0.5","size":"10","taker_order_id":"o1","status":"MATCHED"}"#,
        )
        .unwrap();
        let mut messages = frame.into_messages();
        let Some(UserMessage::Trade(trade)) = messages.pop() else {
            panic!("expected a trade message");
        };
        let fill = trade.into_fill(NOW).unwrap();
        assert_eq!(fill.order_id, OrderId::from("o1"));
        assert_eq!(fill.size, dec!(10));
    }
}
