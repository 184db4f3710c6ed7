//! Ingestion hub: one shared connection per exchange channel, fanned out to
//! any number of per-account consumers.
//!
//! The hub is built once per process and cloned by handle into every
//! service. It owns:
//!
//! - a [`ChannelSupervisor`] task per channel (market, optionally user),
//! - the [`EventBus`] consumers listen on,
//! - the subscription registry, replayed on every reconnect,
//! - the instrument table (metadata cache, last-seen times, mutes),
//! - the reaper and, when configured, the polling fallback.
//!
//! Consumers only ever receive copies of events; no mutable state crosses
//! the hub boundary.

mod bus;
mod config;
mod metadata;
mod poller;
mod reaper;
mod registry;
mod supervisor;

pub use bus::{recv_event, EventBus, HubEvent, InstrumentsEvicted};
pub use config::{HubConfig, PollingConfig, ReconnectionConfig};
pub use metadata::{InstrumentTable, Sighting};
pub use registry::SubscriptionRegistry;
pub use supervisor::{Backoff, ChannelCommand, ChannelSink, ChannelStatus, ChannelSupervisor};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::TradeDeduplicator;
use super::clock::Clock;
use crate::domain::{InstrumentId, InstrumentMetadata};
use crate::port::outbound::exchange::{MarketDataStream, MarketEvent};
use crate::port::outbound::feed::TradeFeed;
use crate::port::outbound::metadata::{MetadataFetcher, MetadataLookup};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared by the hub handle and its background tasks.
pub(crate) struct HubShared {
    config: HubConfig,
    clock: Clock,
    bus: EventBus,
    registry: Mutex<SubscriptionRegistry>,
    instruments: Mutex<InstrumentTable>,
    dedup: TradeDeduplicator,
    metadata: Option<Arc<dyn MetadataFetcher>>,
    trade_feed: Option<Arc<dyn TradeFeed>>,
    market_commands: Mutex<Option<mpsc::UnboundedSender<ChannelCommand>>>,
    user_commands: Mutex<Option<mpsc::UnboundedSender<ChannelCommand>>>,
    market_status: watch::Sender<ChannelStatus>,
    user_status: watch::Sender<ChannelStatus>,
    channel_tasks: Mutex<Vec<JoinHandle<()>>>,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HubShared {
    fn send_market(&self, command: ChannelCommand) {
        if let Some(tx) = self.market_commands.lock().as_ref() {
            // A closed channel means the supervisor is gone; replay covers it.
            let _ = tx.send(command);
        }
    }

    /// Record activity for an instrument, starting a metadata fetch on first
    /// sight. Returns false if the instrument is muted.
    fn observe(self: &Arc<Self>, instrument_id: &InstrumentId) -> bool {
        let now = self.clock.now_ms();
        let (sighting, evicted) = self.instruments.lock().observe(instrument_id, now);
        if let Some(evicted) = evicted {
            self.forget(vec![evicted], now);
        }
        match sighting {
            Sighting::Muted => false,
            Sighting::Known => true,
            Sighting::NeedsFetch => {
                self.spawn_fetch(instrument_id.clone());
                true
            }
        }
    }

    fn spawn_fetch(self: &Arc<Self>, instrument_id: InstrumentId) {
        let Some(fetcher) = self.metadata.clone() else {
            return;
        };
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let lookup = fetcher.fetch(&instrument_id).await;
            shared.apply_lookup(instrument_id, lookup);
        });
    }

    fn apply_lookup(
        &self,
        instrument_id: InstrumentId,
        lookup: crate::error::Result<MetadataLookup>,
    ) {
        let now = self.clock.now_ms();
        match lookup {
            Ok(MetadataLookup::Found(metadata)) => {
                debug!(instrument_id = %instrument_id, question = %metadata.question, "Metadata cached");
                let evicted = self.instruments.lock().record(metadata, now);
                if let Some(evicted) = evicted {
                    self.forget(vec![evicted], now);
                }
            }
            Ok(MetadataLookup::NotFound) => {
                warn!(instrument_id = %instrument_id, "Instrument not found, muting");
                self.instruments.lock().mute(&instrument_id, now);
                if self.registry.lock().purge(&instrument_id) {
                    self.send_market(ChannelCommand::Unsubscribe(vec![instrument_id]));
                }
            }
            Err(e) => {
                debug!(instrument_id = %instrument_id, error = %e, "Metadata fetch failed, will retry");
                self.instruments.lock().fetch_failed(&instrument_id);
            }
        }
    }

    /// Drop subscriptions for evicted instruments and tell listeners.
    fn forget(&self, instruments: Vec<InstrumentId>, now_ms: i64) {
        let unsubscribe: Vec<InstrumentId> = {
            let mut registry = self.registry.lock();
            instruments
                .iter()
                .filter(|id| registry.purge(id))
                .cloned()
                .collect()
        };
        if !unsubscribe.is_empty() {
            self.send_market(ChannelCommand::Unsubscribe(unsubscribe));
        }
        self.bus.publish(InstrumentsEvicted {
            instruments,
            timestamp_ms: now_ms,
        });
    }

    fn reap(&self) -> Vec<InstrumentId> {
        let now = self.clock.now_ms();
        let stale = self.instruments.lock().evict_idle(now);
        if stale.is_empty() {
            return stale;
        }
        info!(count = stale.len(), "Reaped idle instruments");
        self.forget(stale.clone(), now);
        stale
    }

    /// Normalize and publish one event from any channel.
    fn dispatch(self: &Arc<Self>, event: MarketEvent) {
        match event {
            MarketEvent::Price(mut update) => {
                if !self.observe(&update.instrument_id) {
                    return;
                }
                if update.condition_id.is_none() {
                    update.condition_id = self.instruments.lock().condition_id(&update.instrument_id);
                }
                self.bus.publish(update);
            }
            MarketEvent::Trade(mut trade) => {
                if !self.observe(&trade.instrument_id) || self.dedup.is_duplicate(&trade) {
                    return;
                }
                if trade.condition_id.is_none() {
                    trade.condition_id = self.instruments.lock().condition_id(&trade.instrument_id);
                }
                self.bus.publish(trade);
            }
            MarketEvent::NewInstrument(listing) => {
                let id = listing.metadata.instrument_id.clone();
                if self.instruments.lock().is_muted(&id) {
                    return;
                }
                let now = self.clock.now_ms();
                let evicted = self.instruments.lock().record(listing.metadata.clone(), now);
                if let Some(evicted) = evicted {
                    self.forget(vec![evicted], now);
                }
                if self.config.auto_subscribe_new_instruments && self.registry.lock().add(&id) {
                    info!(instrument_id = %id, "Auto-subscribing new instrument");
                    self.send_market(ChannelCommand::Subscribe(vec![id]));
                }
                self.bus.publish(listing);
            }
            MarketEvent::Fill(fill) => {
                self.bus.publish(fill);
            }
            MarketEvent::Resolved(resolution) => {
                info!(condition_id = %resolution.condition_id, "Market resolved");
                self.bus.publish(resolution);
            }
            MarketEvent::Pong | MarketEvent::Connected | MarketEvent::Disconnected { .. } => {}
        }
    }
}

struct MarketSink(Arc<HubShared>);

impl ChannelSink for MarketSink {
    fn replay_set(&self) -> Vec<InstrumentId> {
        self.0.registry.lock().snapshot()
    }

    fn deliver(&self, event: MarketEvent) {
        self.0.dispatch(event);
    }
}

struct UserSink(Arc<HubShared>);

impl ChannelSink for UserSink {
    fn replay_set(&self) -> Vec<InstrumentId> {
        Vec::new()
    }

    fn deliver(&self, event: MarketEvent) {
        self.0.dispatch(event);
    }
}

/// Builder for [`IngestionHub`].
pub struct HubBuilder {
    config: HubConfig,
    clock: Option<Clock>,
    metadata: Option<Arc<dyn MetadataFetcher>>,
    trade_feed: Option<Arc<dyn TradeFeed>>,
}

impl HubBuilder {
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn metadata_fetcher(mut self, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        self.metadata = Some(fetcher);
        self
    }

    #[must_use]
    pub fn trade_feed(mut self, feed: Arc<dyn TradeFeed>) -> Self {
        self.trade_feed = Some(feed);
        self
    }

    #[must_use]
    pub fn build(self) -> IngestionHub {
        let config = self.config;
        let clock = self.clock.unwrap_or_default();
        let idle_ttl_ms = (config.instrument_idle_secs * 1_000) as i64;
        let shared = HubShared {
            bus: EventBus::new(config.channel_capacity),
            registry: Mutex::new(SubscriptionRegistry::new()),
            instruments: Mutex::new(InstrumentTable::new(
                config.max_tracked_instruments,
                config.max_muted_instruments,
                idle_ttl_ms,
            )),
            dedup: TradeDeduplicator::new(
                Duration::from_secs(config.polling.dedup_ttl_secs),
                config.polling.dedup_max_entries,
            ),
            metadata: self.metadata,
            trade_feed: self.trade_feed,
            market_commands: Mutex::new(None),
            user_commands: Mutex::new(None),
            market_status: watch::channel(ChannelStatus::Idle).0,
            user_status: watch::channel(ChannelStatus::Idle).0,
            channel_tasks: Mutex::new(Vec::new()),
            background_tasks: Mutex::new(Vec::new()),
            clock,
            config,
        };
        IngestionHub {
            shared: Arc::new(shared),
        }
    }
}

/// Handle to the shared ingestion hub. Cheap to clone.
#[derive(Clone)]
pub struct IngestionHub {
    shared: Arc<HubShared>,
}

impl IngestionHub {
    #[must_use]
    pub fn builder(config: HubConfig) -> HubBuilder {
        HubBuilder {
            config,
            clock: None,
            metadata: None,
            trade_feed: None,
        }
    }

    /// Start the channel supervisors and background tasks.
    ///
    /// Idempotent while the market channel is running: later calls drop the
    /// given streams and return false. Must be called inside a tokio runtime.
    pub fn connect(
        &self,
        market: Box<dyn MarketDataStream>,
        user: Option<Box<dyn MarketDataStream>>,
    ) -> bool {
        let shared = &self.shared;
        let mut market_commands = shared.market_commands.lock();
        if market_commands.as_ref().is_some_and(|tx| !tx.is_closed()) {
            debug!("Hub already connected");
            return false;
        }

        let config = &shared.config;
        let heartbeat = Duration::from_secs(config.heartbeat_interval_secs);
        let mut channel_tasks = shared.channel_tasks.lock();
        channel_tasks.retain(|task| !task.is_finished());

        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = ChannelSupervisor::new(
            market,
            Arc::new(MarketSink(Arc::clone(shared))),
            rx,
            shared.market_status.clone(),
            config.reconnection.clone(),
            heartbeat,
        );
        *market_commands = Some(tx);
        channel_tasks.push(tokio::spawn(async move {
            // Terminal failure is already logged and published as status.
            let _ = supervisor.run().await;
        }));

        let has_user_channel = user.is_some();
        if let Some(user) = user {
            let (tx, rx) = mpsc::unbounded_channel();
            let supervisor = ChannelSupervisor::new(
                user,
                Arc::new(UserSink(Arc::clone(shared))),
                rx,
                shared.user_status.clone(),
                config.reconnection.clone(),
                heartbeat,
            );
            *shared.user_commands.lock() = Some(tx);
            channel_tasks.push(tokio::spawn(async move {
                let _ = supervisor.run().await;
            }));
        }

        let mut background = shared.background_tasks.lock();
        if background.is_empty() {
            let period = Duration::from_secs(config.reaper_interval_secs);
            background.push(tokio::spawn(reaper::run(Arc::clone(shared), period)));

            if let (true, Some(feed)) = (config.polling.enabled, shared.trade_feed.clone()) {
                background.push(tokio::spawn(poller::run(
                    Arc::clone(shared),
                    feed,
                    config.polling.wallets.clone(),
                    config.polling.limit,
                    Duration::from_secs(config.polling.interval_secs),
                )));
            }
        }

        info!(
            user_channel = has_user_channel,
            polling = config.polling.enabled,
            "Hub connected"
        );
        true
    }

    /// Register interest in an instrument.
    pub fn subscribe(&self, instrument_id: &InstrumentId) {
        let shared = &self.shared;
        if !shared.observe(instrument_id) {
            debug!(instrument_id = %instrument_id, "Ignoring subscribe to muted instrument");
            return;
        }
        if shared.registry.lock().add(instrument_id) {
            shared.send_market(ChannelCommand::Subscribe(vec![instrument_id.clone()]));
        }
    }

    /// Withdraw interest in an instrument.
    pub fn unsubscribe(&self, instrument_id: &InstrumentId) {
        let shared = &self.shared;
        if shared.registry.lock().remove(instrument_id) {
            shared.send_market(ChannelCommand::Unsubscribe(vec![instrument_id.clone()]));
        }
    }

    /// Register a listener for one event type.
    #[must_use]
    pub fn listen<E: HubEvent>(&self) -> broadcast::Receiver<E> {
        self.shared.bus.listen::<E>()
    }

    /// Market channel status.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.shared.market_status.subscribe()
    }

    /// User channel status.
    #[must_use]
    pub fn user_status(&self) -> watch::Receiver<ChannelStatus> {
        self.shared.user_status.subscribe()
    }

    #[must_use]
    pub fn metadata(&self, instrument_id: &InstrumentId) -> Option<InstrumentMetadata> {
        self.shared.instruments.lock().metadata(instrument_id)
    }

    #[must_use]
    pub fn is_muted(&self, instrument_id: &InstrumentId) -> bool {
        self.shared.instruments.lock().is_muted(instrument_id)
    }

    /// True while the instrument has recent activity.
    #[must_use]
    pub fn is_tracked(&self, instrument_id: &InstrumentId) -> bool {
        self.shared.instruments.lock().is_tracked(instrument_id)
    }

    #[must_use]
    pub fn subscriptions(&self) -> Vec<InstrumentId> {
        self.shared.registry.lock().snapshot()
    }

    /// Run one reaper sweep immediately.
    pub fn reap_now(&self) -> Vec<InstrumentId> {
        self.shared.reap()
    }

    /// Inject an event as if it arrived on a channel.
    pub fn ingest(&self, event: MarketEvent) {
        self.shared.dispatch(event);
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.shared.clock
    }

    /// Stop supervisors and background tasks.
    pub async fn shutdown(&self) {
        for commands in [&self.shared.market_commands, &self.shared.user_commands] {
            if let Some(tx) = commands.lock().take() {
                let _ = tx.send(ChannelCommand::Shutdown);
            }
        }

        let background: Vec<JoinHandle<()>> = self.shared.background_tasks.lock().drain(..).collect();
        for task in background {
            task.abort();
            let _ = task.await;
        }

        let channels: Vec<JoinHandle<()>> = self.shared.channel_tasks.lock().drain(..).collect();
        for mut task in channels {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("Channel did not stop in time, aborting");
                task.abort();
            }
        }
        info!("Hub shut down");
    }
}
