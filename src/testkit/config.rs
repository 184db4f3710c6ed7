//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::application::hub::{HubConfig, ReconnectionConfig};

/// Reconnection config with zero delays and no jitter.
pub fn fast_reconnection(max_reconnect_attempts: u32) -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 0,
        max_delay_ms: 0,
        backoff_multiplier: 1.0,
        jitter_pct: 0.0,
        max_reconnect_attempts,
    }
}

/// Hub config with fast reconnection and a small bus.
pub fn hub() -> HubConfig {
    HubConfig {
        channel_capacity: 256,
        reconnection: fast_reconnection(5),
        ..HubConfig::default()
    }
}
