//! Polymarket endpoint configuration.

use serde::Deserialize;

/// Polymarket HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketHttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Maximum number of attempts for transient failures.
    #[serde(default = "default_http_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Backoff between retries in milliseconds.
    #[serde(default = "default_http_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_http_timeout_ms() -> u64 {
    5000
}

const fn default_http_connect_timeout_ms() -> u64 {
    2000
}

const fn default_http_retry_max_attempts() -> u32 {
    3
}

const fn default_http_retry_backoff_ms() -> u64 {
    500
}

impl Default for PolymarketHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            retry_max_attempts: default_http_retry_max_attempts(),
            retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}

/// Polymarket endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    /// WebSocket URL for the public market channel.
    #[serde(default = "default_market_ws_url")]
    pub market_ws_url: String,
    /// WebSocket URL for the authenticated user channel.
    #[serde(default = "default_user_ws_url")]
    pub user_ws_url: String,
    /// Gamma REST API URL (instrument metadata).
    #[serde(default = "default_gamma_api_url")]
    pub gamma_api_url: String,
    /// Data REST API URL (wallet trade history).
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,
    #[serde(default)]
    pub http: PolymarketHttpConfig,
}

fn default_market_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/market".into()
}

fn default_user_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/user".into()
}

fn default_gamma_api_url() -> String {
    "https://gamma-api.polymarket.com".into()
}

fn default_data_api_url() -> String {
    "https://data-api.polymarket.com".into()
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            market_ws_url: default_market_ws_url(),
            user_ws_url: default_user_ws_url(),
            gamma_api_url: default_gamma_api_url(),
            data_api_url: default_data_api_url(),
            http: PolymarketHttpConfig::default(),
        }
    }
}

/// API credentials for the user channel. Read from the environment only.
#[derive(Clone)]
pub struct PolymarketCredentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for PolymarketCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolymarketCredentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}
