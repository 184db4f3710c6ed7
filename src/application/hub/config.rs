//! Hub configuration.

use serde::Deserialize;

/// Reconnection policy for a hub channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Ceiling for the backoff delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failure.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum random jitter as a fraction of the delay.
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,
    /// Consecutive failures after which the channel gives up for good.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter_pct() -> f64 {
    0.2
}

const fn default_max_reconnect_attempts() -> u32 {
    10
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_pct: default_jitter_pct(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

/// Polling fallback used while the market channel is down.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Wallets whose trades are polled.
    #[serde(default)]
    pub wallets: Vec<String>,
    /// Trades requested per wallet per poll.
    #[serde(default = "default_poll_limit")]
    pub limit: usize,
    /// How long a seen trade is remembered for deduplication.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "default_dedup_max_entries")]
    pub dedup_max_entries: usize,
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_poll_limit() -> usize {
    50
}

const fn default_dedup_ttl_secs() -> u64 {
    300
}

const fn default_dedup_max_entries() -> usize {
    100_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_poll_interval_secs(),
            wallets: Vec::new(),
            limit: default_poll_limit(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            dedup_max_entries: default_dedup_max_entries(),
        }
    }
}

/// Ingestion hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Capacity of each event broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds between heartbeats on each channel.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds between reaper sweeps.
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Instruments untouched for this long are purged.
    #[serde(default = "default_instrument_idle_secs")]
    pub instrument_idle_secs: u64,
    /// Upper bound on tracked instruments.
    #[serde(default = "default_max_tracked_instruments")]
    pub max_tracked_instruments: usize,
    /// Upper bound on remembered not-found instruments.
    #[serde(default = "default_max_muted_instruments")]
    pub max_muted_instruments: usize,
    /// Subscribe newly listed instruments automatically.
    #[serde(default)]
    pub auto_subscribe_new_instruments: bool,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

const fn default_channel_capacity() -> usize {
    4_096
}

const fn default_heartbeat_interval_secs() -> u64 {
    15
}

const fn default_reaper_interval_secs() -> u64 {
    300
}

const fn default_instrument_idle_secs() -> u64 {
    600
}

const fn default_max_tracked_instruments() -> usize {
    20_000
}

const fn default_max_muted_instruments() -> usize {
    10_000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reaper_interval_secs: default_reaper_interval_secs(),
            instrument_idle_secs: default_instrument_idle_secs(),
            max_tracked_instruments: default_max_tracked_instruments(),
            max_muted_instruments: default_max_muted_instruments(),
            auto_subscribe_new_instruments: false,
            reconnection: ReconnectionConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}
