//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; user-channel credentials come
//! only from the environment (`POLY_API_KEY`, `POLY_API_SECRET`,
//! `POLY_API_PASSPHRASE`).
//!
//! # Example
//!
//! ```no_run
//! use flashmirror::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use crate::adapter::outbound::polymarket::{PolymarketConfig, PolymarketCredentials};
use crate::application::detector::DetectorConfig;
use crate::application::execution::ExecutionConfig;
use crate::application::hub::HubConfig;
use crate::application::mirror::SizingConfig;
use crate::application::risk::RiskConfig;
use crate::application::service::FlashConfig;
use crate::domain::{AccountId, InstrumentId};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Account the flash service trades for.
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Ingestion hub settings, including reconnection and polling.
    #[serde(default)]
    pub hub: HubConfig,

    /// Exchange endpoints.
    #[serde(default)]
    pub polymarket: PolymarketConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Copy-trade sizing.
    #[serde(default)]
    pub sizing: SizingConfig,

    /// Instruments watched for flash moves.
    #[serde(default)]
    pub instruments: Vec<String>,

    /// Route orders to the paper adapter instead of the exchange.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Starting USD balance of the paper adapter.
    #[serde(default = "default_paper_balance_usd")]
    pub paper_balance_usd: Decimal,

    /// Loaded from the environment, never from the file.
    #[serde(skip)]
    pub credentials: Option<PolymarketCredentials>,
}

fn default_account_id() -> String {
    "default".into()
}

const fn default_dry_run() -> bool {
    true
}

fn default_paper_balance_usd() -> Decimal {
    dec!(1000)
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn credentials_from_env() -> Option<PolymarketCredentials> {
    let api_key = std::env::var("POLY_API_KEY").ok()?;
    let secret = std::env::var("POLY_API_SECRET").ok()?;
    let passphrase = std::env::var("POLY_API_PASSPHRASE").ok()?;
    Some(PolymarketCredentials {
        api_key,
        secret,
        passphrase,
    })
}

impl Config {
    /// Parse configuration from TOML content and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.credentials = credentials_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails
    /// validation.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Range checks on every section.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "account_id" }.into());
        }
        if self.polymarket.market_ws_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "market_ws_url",
            }
            .into());
        }
        let endpoints = [
            ("market_ws_url", &self.polymarket.market_ws_url),
            ("user_ws_url", &self.polymarket.user_ws_url),
            ("gamma_api_url", &self.polymarket.gamma_api_url),
            ("data_api_url", &self.polymarket.data_api_url),
        ];
        for (field, raw) in endpoints {
            Url::parse(raw).map_err(|e| invalid(field, &e.to_string()))?;
        }

        let hub = &self.hub;
        if hub.channel_capacity == 0 {
            return Err(invalid("channel_capacity", "must be greater than 0").into());
        }
        if hub.heartbeat_interval_secs == 0 {
            return Err(invalid("heartbeat_interval_secs", "must be greater than 0").into());
        }
        if hub.reaper_interval_secs == 0 {
            return Err(invalid("reaper_interval_secs", "must be greater than 0").into());
        }
        if hub.polling.enabled && hub.polling.interval_secs == 0 {
            return Err(invalid("interval_secs", "must be greater than 0").into());
        }

        let reconnection = &hub.reconnection;
        if reconnection.initial_delay_ms == 0 {
            return Err(invalid("initial_delay_ms", "must be greater than 0").into());
        }
        if reconnection.max_delay_ms < reconnection.initial_delay_ms {
            return Err(invalid("max_delay_ms", "must be >= initial_delay_ms").into());
        }
        if reconnection.backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be >= 1.0").into());
        }
        if !(0.0..=1.0).contains(&reconnection.jitter_pct) {
            return Err(invalid("jitter_pct", "must be between 0 and 1").into());
        }
        if reconnection.max_reconnect_attempts == 0 {
            return Err(invalid("max_reconnect_attempts", "must be greater than 0").into());
        }

        let detector = &self.detector;
        // A zero threshold would fire its trigger on every tick.
        for (field, threshold) in [
            ("velocity_threshold", detector.velocity_threshold),
            ("micro_tick_threshold", detector.micro_tick_threshold),
            ("momentum_threshold", detector.momentum_threshold),
            ("volume_spike_threshold", detector.volume_spike_threshold),
        ] {
            if threshold <= 0.0 {
                return Err(invalid(field, "must be greater than 0").into());
            }
        }
        if detector.lookback_ms <= 0 || detector.micro_tick_window_ms <= 0 {
            return Err(invalid("lookback_ms", "windows must be greater than 0").into());
        }
        if detector.liquidity_floor < 0.0 {
            return Err(invalid("liquidity_floor", "must be 0 or greater").into());
        }
        if detector.max_samples < 2 {
            return Err(invalid("max_samples", "must be at least 2").into());
        }

        let risk = &self.risk;
        if !(0.0..=1.0).contains(&risk.min_confidence) {
            return Err(invalid("min_confidence", "must be between 0 and 1").into());
        }
        if !(0.0..=100.0).contains(&risk.kill_switch_score) {
            return Err(invalid("kill_switch_score", "must be between 0 and 100").into());
        }
        if risk.max_slippage_pct < Decimal::ZERO || risk.max_slippage_pct > Decimal::ONE {
            return Err(invalid("max_slippage_pct", "must be between 0 and 1").into());
        }
        if risk.base_size_usd <= Decimal::ZERO {
            return Err(invalid("base_size_usd", "must be greater than 0").into());
        }
        if risk.min_size_usd < Decimal::ZERO || risk.min_size_usd > risk.base_size_usd {
            return Err(invalid("min_size_usd", "must be between 0 and base_size_usd").into());
        }
        if risk.portfolio.max_exposure_usd <= Decimal::ZERO {
            return Err(invalid("max_exposure_usd", "must be greater than 0").into());
        }

        let execution = &self.execution;
        if execution.max_concurrent_positions == 0 {
            return Err(invalid("max_concurrent_positions", "must be greater than 0").into());
        }
        if execution.max_position_usd <= Decimal::ZERO {
            return Err(invalid("max_position_usd", "must be greater than 0").into());
        }
        if execution.take_profit_pct <= Decimal::ZERO {
            return Err(invalid("take_profit_pct", "must be greater than 0").into());
        }
        if execution.stop_loss_pct <= Decimal::ZERO || execution.stop_loss_pct >= Decimal::ONE {
            return Err(invalid("stop_loss_pct", "must be between 0 and 1 (exclusive)").into());
        }
        if execution.exit_slippage_pct < Decimal::ZERO || execution.exit_slippage_pct > Decimal::ONE
        {
            return Err(invalid("exit_slippage_pct", "must be between 0 and 1").into());
        }
        if execution.monitor_interval_ms == 0 {
            return Err(invalid("monitor_interval_ms", "must be greater than 0").into());
        }

        let sizing = &self.sizing;
        if sizing.multiplier <= Decimal::ZERO {
            return Err(invalid("multiplier", "must be greater than 0").into());
        }
        if sizing.max_cap_usd < Decimal::ZERO {
            return Err(invalid("max_cap_usd", "must be 0 or greater").into());
        }
        if sizing.min_order_size <= Decimal::ZERO {
            return Err(invalid("min_order_size", "must be greater than 0").into());
        }

        if self.paper_balance_usd < Decimal::ZERO {
            return Err(invalid("paper_balance_usd", "must be 0 or greater").into());
        }
        Ok(())
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        AccountId::from(self.account_id.as_str())
    }

    /// Settings for one flash service.
    #[must_use]
    pub fn flash(&self) -> FlashConfig {
        FlashConfig {
            detector: self.detector.clone(),
            risk: self.risk.clone(),
            execution: self.execution.clone(),
            instruments: self
                .instruments
                .iter()
                .map(|id| InstrumentId::from(id.as_str()))
                .collect(),
        }
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
