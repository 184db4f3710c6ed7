//! Composition root for the `run` command.

use std::sync::Arc;

use tracing::{debug, info};

use super::config::Config;
use crate::adapter::outbound::audit::TracingAuditSink;
use crate::adapter::outbound::paper::PaperOrderAdapter;
use crate::adapter::outbound::polymarket::{
    DataApiTradeFeed, GammaMetadataFetcher, PolymarketClient, PolymarketStream,
};
use crate::application::hub::IngestionHub;
use crate::application::service::FlashService;
use crate::error::{ConfigError, Result};
use crate::port::outbound::exchange::MarketDataStream;

/// A hub plus one flash service trading against the paper adapter.
///
/// The paper adapter is quoted by the flash pipeline itself, tick by tick.
pub struct Runtime {
    hub: IngestionHub,
    service: FlashService,
    paper: Arc<PaperOrderAdapter>,
}

impl Runtime {
    /// Wire adapters from configuration. Nothing is connected yet.
    ///
    /// # Errors
    ///
    /// Fails when live routing is requested; only paper trading is wired.
    #[allow(clippy::result_large_err)]
    pub fn build(config: &Config) -> Result<Self> {
        if !config.dry_run {
            return Err(ConfigError::InvalidValue {
                field: "dry_run",
                reason: "no live order adapter is available; set dry_run = true".into(),
            }
            .into());
        }

        let client = PolymarketClient::from_config(&config.polymarket);
        let hub = IngestionHub::builder(config.hub.clone())
            .metadata_fetcher(Arc::new(GammaMetadataFetcher::new(client.clone())))
            .trade_feed(Arc::new(DataApiTradeFeed::new(client)))
            .build();

        let paper = Arc::new(PaperOrderAdapter::new(config.paper_balance_usd));
        let service = FlashService::new(
            config.account(),
            hub.clone(),
            config.flash(),
            paper.clone(),
            Arc::new(TracingAuditSink),
        );

        Ok(Self {
            hub,
            service,
            paper,
        })
    }

    /// Connect the exchange channels and enable the flash service.
    ///
    /// # Errors
    ///
    /// Returns the service's capability error, if any.
    pub fn start(&mut self, config: &Config) -> Result<()> {
        let market: Box<dyn MarketDataStream> =
            Box::new(PolymarketStream::market(&config.polymarket.market_ws_url));
        let user = config.credentials.clone().map(|creds| {
            Box::new(PolymarketStream::user(&config.polymarket.user_ws_url, creds))
                as Box<dyn MarketDataStream>
        });
        if user.is_none() {
            debug!("No user-channel credentials, fills will not be streamed");
        }

        self.hub.connect(market, user);
        self.service.enable()?;
        info!(
            account_id = %self.service.account_id(),
            instruments = config.instruments.len(),
            "Flash service running (paper)"
        );
        Ok(())
    }

    /// Disable the service, then stop the hub.
    pub async fn stop(&mut self) {
        self.service.disable().await;
        self.hub.shutdown().await;
        info!(balance = %self.paper.balance(), "Runtime stopped");
    }
}
