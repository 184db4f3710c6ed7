//! Polled trade feed used while the streaming channel is down.

use async_trait::async_trait;

use crate::domain::TradePrint;
use crate::error::Error;

#[async_trait]
pub trait TradeFeed: Send + Sync {
    /// Most recent trades involving `wallet`, newest first, at most `limit`.
    async fn recent_trades(&self, wallet: &str, limit: usize) -> Result<Vec<TradePrint>, Error>;
}
