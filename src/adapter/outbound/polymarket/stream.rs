//! Polymarket WebSocket streams.
//!
//! One [`PolymarketStream`] drives either the public market channel or the
//! authenticated user channel. A single text frame may carry many events;
//! extras are queued and handed out on subsequent `next_event` calls.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::dto::message::{
    MarketFrame, MarketSubscribe, MarketUnsubscribe, UserAuth, UserAuthCredentials, UserFrame,
    UserMessage, PING, PONG,
};
use super::settings::PolymarketCredentials;
use crate::domain::InstrumentId;
use crate::error::{Error, Result};
use crate::port::outbound::exchange::{MarketDataStream, MarketEvent};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Channel {
    Market,
    User(PolymarketCredentials),
}

/// Polymarket channel implementing [`MarketDataStream`].
pub struct PolymarketStream {
    url: String,
    channel: Channel,
    ws: Option<Socket>,
    pending: VecDeque<MarketEvent>,
}

impl PolymarketStream {
    /// Public market channel.
    #[must_use]
    pub fn market(url: impl Into<String>) -> Self {
        Self::with_channel(url.into(), Channel::Market)
    }

    /// Authenticated user channel (fills on our own orders).
    #[must_use]
    pub fn user(url: impl Into<String>, credentials: PolymarketCredentials) -> Self {
        Self::with_channel(url.into(), Channel::User(credentials))
    }

    fn with_channel(url: String, channel: Channel) -> Self {
        Self {
            url,
            channel,
            ws: None,
            pending: VecDeque::new(),
        }
    }

    fn socket(&mut self) -> Result<&mut Socket> {
        self.ws
            .as_mut()
            .ok_or_else(|| Error::Connection("Not connected".into()))
    }

    async fn send_json<T: serde::Serialize>(&mut self, msg: &T) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.socket()?.send(Message::Text(json)).await?;
        Ok(())
    }

    fn decode(&self, text: &str) -> Vec<MarketEvent> {
        if text.trim() == PONG {
            return vec![MarketEvent::Pong];
        }
        let received_ms = chrono::Utc::now().timestamp_millis();
        match &self.channel {
            Channel::Market => match serde_json::from_str::<MarketFrame>(text) {
                Ok(frame) => frame.into_events(received_ms),
                Err(e) => {
                    warn!(error = %e, bytes = text.len(), "Failed to parse market message");
                    Vec::new()
                }
            },
            Channel::User(_) => match serde_json::from_str::<UserFrame>(text) {
                Ok(frame) => frame
                    .into_messages()
                    .into_iter()
                    .filter_map(|message| match message {
                        UserMessage::Trade(trade) => {
                            trade.into_fill(received_ms).map(MarketEvent::Fill)
                        }
                        UserMessage::Order(order) => {
                            debug!(order_id = %order.id, status = ?order.status, "Order update");
                            None
                        }
                        UserMessage::Other => None,
                    })
                    .collect(),
                Err(e) => {
                    warn!(error = %e, bytes = text.len(), "Failed to parse user message");
                    Vec::new()
                }
            },
        }
    }
}

fn preview(ids: &[InstrumentId]) -> (Vec<&str>, usize) {
    let shown = ids.iter().take(5).map(InstrumentId::as_str).collect();
    (shown, ids.len().saturating_sub(5))
}

#[async_trait]
impl MarketDataStream for PolymarketStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, channel = self.channel_name(), "Connecting to WebSocket");
        let (ws_stream, response) = connect_async(&self.url).await?;
        info!(status = %response.status(), "WebSocket connected");
        self.ws = Some(ws_stream);
        self.pending.clear();

        if let Channel::User(creds) = &self.channel {
            let auth = UserAuth {
                auth: UserAuthCredentials {
                    api_key: &creds.api_key,
                    secret: &creds.secret,
                    passphrase: &creds.passphrase,
                },
                markets: Vec::new(),
                msg_type: "user",
            };
            let json = serde_json::to_string(&auth)?;
            self.socket()?.send(Message::Text(json)).await?;
            debug!("User channel authenticated");
        }
        Ok(())
    }

    async fn subscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<()> {
        if matches!(self.channel, Channel::User(_)) {
            trace!("User channel is account-wide, ignoring subscribe");
            return Ok(());
        }
        let (shown, more) = preview(instrument_ids);
        info!(assets = ?shown, more, "Subscribing to assets");
        let ids = instrument_ids.iter().map(|id| id.as_str().to_string()).collect();
        self.send_json(&MarketSubscribe::new(ids)).await
    }

    async fn unsubscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<()> {
        if matches!(self.channel, Channel::User(_)) {
            return Ok(());
        }
        let (shown, more) = preview(instrument_ids);
        info!(assets = ?shown, more, "Unsubscribing from assets");
        let ids = instrument_ids.iter().map(|id| id.as_str().to_string()).collect();
        self.send_json(&MarketUnsubscribe::new(ids)).await
    }

    async fn heartbeat(&mut self) -> Result<()> {
        trace!(channel = self.channel_name(), "Sending heartbeat");
        self.socket()?.send(Message::Text(PING.into())).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        loop {
            let ws = self.ws.as_mut()?;
            let Some(frame) = ws.next().await else {
                self.ws = None;
                return Some(MarketEvent::Disconnected {
                    reason: "stream ended".into(),
                });
            };
            match frame {
                Ok(Message::Text(text)) => {
                    trace!(bytes = text.len(), "Received WebSocket text frame");
                    let events = self.decode(&text);
                    self.pending.extend(events);
                    if let Some(event) = self.pending.pop_front() {
                        return Some(event);
                    }
                }
                Ok(Message::Ping(data)) => {
                    trace!("Received WebSocket ping");
                    if ws.send(Message::Pong(data)).await.is_err() {
                        self.ws = None;
                        return Some(MarketEvent::Disconnected {
                            reason: "Failed to send pong".into(),
                        });
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    self.ws = None;
                    return Some(MarketEvent::Disconnected {
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    });
                }
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "WebSocket error");
                    self.ws = None;
                    return Some(MarketEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn channel_name(&self) -> &'static str {
        match self.channel {
            Channel::Market => "market",
            Channel::User(_) => "user",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> PolymarketCredentials {
        PolymarketCredentials {
            api_key: "key".into(),
            secret: "secret".into(),
            passphrase: "pass".into(),
        }
    }

    #[test]
    fn channel_names() {
        assert_eq!(PolymarketStream::market("wss://test").channel_name(), "market");
        assert_eq!(PolymarketStream::user("wss://test", creds()).channel_name(), "user");
    }

    #[test]
    fn text_pong_is_heartbeat_reply() {
        let stream = PolymarketStream::market("wss://test");
        assert_eq!(stream.decode("PONG"), vec![MarketEvent::Pong]);
    }

    #[test]
    fn market_batch_decodes_every_event() {
        let stream = PolymarketStream::market("wss://test");
        let events = stream.decode(
            r#"[{"event_type":"last_trade_price","asset_id":"a","price":"0.5"},
                {"event_type":"last_trade_price","asset_id":"b","price":"0.6"}]"#,
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn malformed_frames_decode_to_nothing() {
        let stream = PolymarketStream::market("wss://test");
        assert!(stream.decode("{not json").is_empty());
    }

    #[test]
    fn user_channel_turns_trades_into_fills() {
        let stream = PolymarketStream::user("wss://test", creds());
        let events = stream.decode(
            r#"[{"event_type":"order","id":"o1","status":"LIVE"},
                {"event_type":"trade","id":"m1","asset_id":"a","side":"SELL","price":"0.4","size":"3"}]"#,
        );
        assert!(matches!(events.as_slice(), [MarketEvent::Fill(_)]));
    }

    #[tokio::test]
    async fn operations_fail_before_connect() {
        let mut stream = PolymarketStream::market("wss://test");
        assert!(stream.heartbeat().await.is_err());
        assert!(stream.subscribe(&[InstrumentId::from("a")]).await.is_err());
        assert!(stream.next_event().await.is_none());
    }
}
