//! Wallet trade history from the Data API, used by the polling fallback.

use async_trait::async_trait;

use super::client::PolymarketClient;
use crate::domain::TradePrint;
use crate::error::Result;
use crate::port::outbound::feed::TradeFeed;

/// [`TradeFeed`] backed by `GET /trades?user=&limit=`.
pub struct DataApiTradeFeed {
    client: PolymarketClient,
}

impl DataApiTradeFeed {
    #[must_use]
    pub const fn new(client: PolymarketClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TradeFeed for DataApiTradeFeed {
    async fn recent_trades(&self, wallet: &str, limit: usize) -> Result<Vec<TradePrint>> {
        let received_ms = chrono::Utc::now().timestamp_millis();
        let trades = self.client.trades_for_user(wallet, limit).await?;
        Ok(trades
            .into_iter()
            .filter_map(|trade| trade.into_print(received_ms))
            .take(limit)
            .collect())
    }
}
