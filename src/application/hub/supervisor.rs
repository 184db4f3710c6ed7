//! Channel supervisor: owns one exchange stream and keeps it alive.
//!
//! The supervisor connects, replays subscriptions, forwards events, sends
//! heartbeats, and reconnects with capped exponential backoff. After
//! `max_reconnect_attempts` consecutive failures without a data event in
//! between, it publishes [`ChannelStatus::Failed`] and stops for good.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use super::config::ReconnectionConfig;
use crate::domain::InstrumentId;
use crate::error::Error;
use crate::port::outbound::exchange::{MarketDataStream, MarketEvent};

/// Connection state of a hub channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not started.
    Idle,
    Connecting,
    Connected,
    /// Waiting to retry after `attempt` consecutive failures.
    Reconnecting { attempt: u32 },
    /// Gave up after exhausting reconnect attempts.
    Failed,
    /// Shut down on request.
    Stopped,
}

/// Requests sent to a running supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Subscribe(Vec<InstrumentId>),
    Unsubscribe(Vec<InstrumentId>),
    Shutdown,
}

/// Where a supervisor sends events and finds its replay set.
pub trait ChannelSink: Send + Sync + 'static {
    /// Instruments to subscribe after every successful connect.
    fn replay_set(&self) -> Vec<InstrumentId>;

    /// Hand a data event to the hub.
    fn deliver(&self, event: MarketEvent);
}

/// Exponential backoff with jitter and a bounded failure count.
#[derive(Debug)]
pub struct Backoff {
    config: ReconnectionConfig,
    consecutive_failures: u32,
    current_delay_ms: u64,
}

impl Backoff {
    #[must_use]
    pub fn new(config: ReconnectionConfig) -> Self {
        let current_delay_ms = config.initial_delay_ms;
        Self {
            config,
            consecutive_failures: 0,
            current_delay_ms,
        }
    }

    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
    }

    /// Count a failure. Returns true once the attempt budget is spent.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures >= self.config.max_reconnect_attempts
    }

    /// Delay before the next attempt; advances the backoff.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current_delay_ms;
        let delay = base + self.jitter_ms(base);

        let next = (base as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next.min(self.config.max_delay_ms);

        Duration::from_millis(delay)
    }

    fn jitter_ms(&self, base_ms: u64) -> u64 {
        let range = (base_ms as f64 * self.config.jitter_pct.clamp(0.0, 1.0)) as u64;
        if range == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..=range)
    }
}

enum SessionEnd {
    Dropped(String),
    Shutdown,
}

/// Supervises one channel until shutdown or terminal failure.
pub struct ChannelSupervisor<S, K> {
    stream: S,
    sink: Arc<K>,
    commands: mpsc::UnboundedReceiver<ChannelCommand>,
    status: watch::Sender<ChannelStatus>,
    backoff: Backoff,
    heartbeat_interval: Duration,
}

impl<S, K> ChannelSupervisor<S, K>
where
    S: MarketDataStream,
    K: ChannelSink,
{
    pub fn new(
        stream: S,
        sink: Arc<K>,
        commands: mpsc::UnboundedReceiver<ChannelCommand>,
        status: watch::Sender<ChannelStatus>,
        reconnection: ReconnectionConfig,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            stream,
            sink,
            commands,
            status,
            backoff: Backoff::new(reconnection),
            heartbeat_interval,
        }
    }

    /// Run until shutdown (`Ok`) or until reconnects are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReconnectExhausted`] after too many consecutive
    /// failures.
    pub async fn run(mut self) -> Result<(), Error> {
        let channel = self.stream.channel_name();
        loop {
            let attempt = self.backoff.failures();
            self.status.send_replace(if attempt == 0 {
                ChannelStatus::Connecting
            } else {
                ChannelStatus::Reconnecting { attempt }
            });

            let reason = match self.establish().await {
                Ok(()) => {
                    info!(channel, "Channel connected");
                    self.status.send_replace(ChannelStatus::Connected);
                    match self.session().await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Dropped(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            warn!(channel, reason = %reason, "Channel dropped");
            if self.backoff.record_failure() {
                let attempts = self.backoff.failures();
                error!(channel, attempts, "Reconnect attempts exhausted, giving up");
                self.status.send_replace(ChannelStatus::Failed);
                return Err(Error::ReconnectExhausted { channel, attempts });
            }

            let delay = self.backoff.next_delay();
            self.status.send_replace(ChannelStatus::Reconnecting {
                attempt: self.backoff.failures(),
            });
            info!(
                channel,
                delay_ms = delay.as_millis() as u64,
                attempt = self.backoff.failures() + 1,
                "Reconnecting after delay"
            );
            if self.wait(delay).await {
                break;
            }
        }

        info!(channel, "Channel stopped");
        self.status.send_replace(ChannelStatus::Stopped);
        Ok(())
    }

    async fn establish(&mut self) -> Result<(), Error> {
        self.stream.connect().await?;
        let replay = self.sink.replay_set();
        if !replay.is_empty() {
            debug!(
                channel = self.stream.channel_name(),
                instruments = replay.len(),
                "Replaying subscriptions"
            );
            self.stream.subscribe(&replay).await?;
        }
        Ok(())
    }

    /// Sleep out a backoff delay. Returns true if shutdown was requested.
    ///
    /// Subscription changes that arrive meanwhile are covered by the replay
    /// on the next connect.
    async fn wait(&mut self, delay: Duration) -> bool {
        let deadline = sleep(delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => return false,
                command = self.commands.recv() => match command {
                    Some(ChannelCommand::Shutdown) | None => return true,
                    Some(_) => {}
                },
            }
        }
    }

    async fn session(&mut self) -> SessionEnd {
        let channel = self.stream.channel_name();
        let period = self.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                event = self.stream.next_event() => match event {
                    None => return SessionEnd::Dropped("stream ended".into()),
                    Some(MarketEvent::Disconnected { reason }) => {
                        return SessionEnd::Dropped(reason);
                    }
                    Some(MarketEvent::Pong) => awaiting_pong = false,
                    Some(MarketEvent::Connected) => {}
                    Some(event) => {
                        if self.backoff.failures() > 0 {
                            debug!(channel, "Data received, resetting backoff");
                            self.backoff.reset();
                        }
                        self.sink.deliver(event);
                    }
                },
                command = self.commands.recv() => match command {
                    Some(ChannelCommand::Subscribe(ids)) => {
                        if let Err(e) = self.stream.subscribe(&ids).await {
                            return SessionEnd::Dropped(format!("subscribe failed: {e}"));
                        }
                    }
                    Some(ChannelCommand::Unsubscribe(ids)) => {
                        if let Err(e) = self.stream.unsubscribe(&ids).await {
                            warn!(channel, error = %e, "Unsubscribe failed");
                        }
                    }
                    Some(ChannelCommand::Shutdown) | None => return SessionEnd::Shutdown,
                },
                _ = heartbeat.tick() => {
                    if awaiting_pong {
                        return SessionEnd::Dropped("heartbeat unanswered".into());
                    }
                    if let Err(e) = self.stream.heartbeat().await {
                        return SessionEnd::Dropped(format!("heartbeat failed: {e}"));
                    }
                    awaiting_pong = true;
                }
            }
        }
    }
}
