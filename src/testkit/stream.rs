//! Test doubles for [`MarketDataStream`].
//!
//! [`ScriptedStream`] plays back one scripted session per connection attempt,
//! which suits reconnect and backoff tests that run to completion without
//! outside input. [`ChannelStream`] is driven live from the test through a
//! [`ChannelStreamHandle`] and answers heartbeats on request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::InstrumentId;
use crate::error::{Error, Result};
use crate::port::outbound::exchange::{MarketDataStream, MarketEvent};

/// What happens on one connection attempt.
enum Session {
    Refused(String),
    Open(VecDeque<MarketEvent>),
}

/// Stream that replays a fixed list of connection sessions.
///
/// Every `connect()` consumes the next session. A refused session fails the
/// connect; an open one yields its events and then ends. Once the script is
/// exhausted, connects succeed onto an empty session.
#[derive(Default)]
pub struct ScriptedStream {
    sessions: VecDeque<Session>,
    current: VecDeque<MarketEvent>,
    connects: Arc<AtomicU32>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection attempt that fails with `reason`.
    pub fn refuse(mut self, reason: &str) -> Self {
        self.sessions.push_back(Session::Refused(reason.to_string()));
        self
    }

    /// Append a connection that delivers `events` and then closes.
    pub fn session(mut self, events: Vec<MarketEvent>) -> Self {
        self.sessions.push_back(Session::Open(events.into()));
        self
    }

    /// Shared connect counter, readable after the stream is handed off.
    pub fn connects(&self) -> Arc<AtomicU32> {
        self.connects.clone()
    }
}

#[async_trait]
impl MarketDataStream for ScriptedStream {
    async fn connect(&mut self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.sessions.pop_front() {
            Some(Session::Refused(reason)) => {
                self.current.clear();
                Err(Error::Connection(reason))
            }
            Some(Session::Open(events)) => {
                self.current = events;
                Ok(())
            }
            None => {
                self.current.clear();
                Ok(())
            }
        }
    }

    async fn subscribe(&mut self, _instrument_ids: &[InstrumentId]) -> Result<()> {
        Ok(())
    }

    async fn unsubscribe(&mut self, _instrument_ids: &[InstrumentId]) -> Result<()> {
        Ok(())
    }

    async fn heartbeat(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        self.current.pop_front()
    }

    fn channel_name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
struct ChannelState {
    connect_count: AtomicU32,
    subscribe_count: AtomicU32,
    heartbeat_count: AtomicU32,
    /// Set while heartbeats should go unanswered.
    mute_heartbeats: AtomicBool,
    subscribed: Mutex<Vec<InstrumentId>>,
    unsubscribed: Mutex<Vec<InstrumentId>>,
}

/// Stream fed by a test through its [`ChannelStreamHandle`].
///
/// Each heartbeat queues a [`MarketEvent::Pong`] ahead of pending data unless
/// the handle has muted heartbeats.
pub struct ChannelStream {
    event_rx: mpsc::Receiver<Option<MarketEvent>>,
    pending_pongs: u32,
    state: Arc<ChannelState>,
}

/// Test-side end of a [`ChannelStream`]: feeds events and reads counters.
#[derive(Clone)]
pub struct ChannelStreamHandle {
    event_tx: mpsc::Sender<Option<MarketEvent>>,
    state: Arc<ChannelState>,
}

impl ChannelStreamHandle {
    /// Deliver `event` on the current connection.
    pub async fn send(&self, event: MarketEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Drop the current connection; the stream reports end-of-data.
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }

    /// Stop (or resume) answering heartbeats.
    pub fn set_answer_heartbeats(&self, answer: bool) {
        self.state.mute_heartbeats.store(!answer, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> u32 {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> u32 {
        self.state.subscribe_count.load(Ordering::SeqCst)
    }

    pub fn heartbeat_count(&self) -> u32 {
        self.state.heartbeat_count.load(Ordering::SeqCst)
    }

    /// Instruments passed to the most recent `subscribe()`.
    pub fn subscribed(&self) -> Vec<InstrumentId> {
        self.state.subscribed.lock().clone()
    }

    /// Every instrument ever passed to `unsubscribe()`, in order.
    pub fn unsubscribed(&self) -> Vec<InstrumentId> {
        self.state.unsubscribed.lock().clone()
    }
}

/// Build a live stream and the handle that drives it.
pub fn channel_stream(buffer: usize) -> (ChannelStream, ChannelStreamHandle) {
    let (event_tx, event_rx) = mpsc::channel(buffer);
    let state = Arc::new(ChannelState::default());
    (
        ChannelStream {
            event_rx,
            pending_pongs: 0,
            state: state.clone(),
        },
        ChannelStreamHandle { event_tx, state },
    )
}

#[async_trait]
impl MarketDataStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        self.state.connect_count.fetch_add(1, Ordering::SeqCst);
        self.pending_pongs = 0;
        Ok(())
    }

    async fn subscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<()> {
        self.state.subscribe_count.fetch_add(1, Ordering::SeqCst);
        *self.state.subscribed.lock() = instrument_ids.to_vec();
        Ok(())
    }

    async fn unsubscribe(&mut self, instrument_ids: &[InstrumentId]) -> Result<()> {
        self.state
            .unsubscribed
            .lock()
            .extend_from_slice(instrument_ids);
        Ok(())
    }

    async fn heartbeat(&mut self) -> Result<()> {
        self.state.heartbeat_count.fetch_add(1, Ordering::SeqCst);
        if !self.state.mute_heartbeats.load(Ordering::SeqCst) {
            self.pending_pongs += 1;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        if self.pending_pongs > 0 {
            self.pending_pongs -= 1;
            return Some(MarketEvent::Pong);
        }
        self.event_rx.recv().await.flatten()
    }

    fn channel_name(&self) -> &'static str {
        "mock"
    }
}
