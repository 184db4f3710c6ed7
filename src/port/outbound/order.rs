//! Order routing port.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{InstrumentId, OrderAck, OrderRequest, OrderSide, PriceUpdate};
use crate::error::Error;

/// Features an order adapter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterCapabilities {
    pub limit_orders: bool,
    pub fill_or_kill: bool,
    pub fill_and_kill: bool,
    pub market_price: bool,
}

impl AdapterCapabilities {
    /// Every capability enabled.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            limit_orders: true,
            fill_or_kill: true,
            fill_and_kill: true,
            market_price: true,
        }
    }

    /// First capability required for flash trading that is missing.
    #[must_use]
    pub const fn missing_for_flash(&self) -> Option<&'static str> {
        if !self.limit_orders {
            Some("limit_orders")
        } else if !self.fill_or_kill {
            Some("fill_or_kill")
        } else if !self.fill_and_kill {
            Some("fill_and_kill")
        } else if !self.market_price {
            Some("market_price")
        } else {
            None
        }
    }
}

/// Submits orders to an exchange on behalf of one account.
#[async_trait]
pub trait OrderAdapter: Send + Sync {
    /// Submit an order. Exchange-side rejections are `Ok` with
    /// `success == false`; `Err` means the adapter itself failed.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, Error>;

    /// Current executable price for `side`.
    async fn market_price(&self, instrument_id: &InstrumentId, side: OrderSide)
        -> Result<Decimal, Error>;

    /// The tick the caller is about to act on.
    ///
    /// Simulated adapters quote from it so `market_price` never lags the
    /// pipeline; adapters backed by a real book ignore it.
    fn observe_price(&self, _update: &PriceUpdate) {}

    /// USD available for new entries.
    async fn available_balance(&self) -> Result<Decimal, Error>;

    fn capabilities(&self) -> AdapterCapabilities;

    /// Adapter name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_missing_capability() {
        let mut caps = AdapterCapabilities::full();
        assert_eq!(caps.missing_for_flash(), None);
        caps.fill_or_kill = false;
        caps.market_price = false;
        assert_eq!(caps.missing_for_flash(), Some("fill_or_kill"));
    }
}
