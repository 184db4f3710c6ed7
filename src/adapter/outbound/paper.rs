//! Paper-trading order adapter used in dry-run mode.
//!
//! Quotes follow the ticks the flash pipeline observes; every order fills in
//! full at its limit price (or the last quote for unpriced orders) against a
//! simulated USD balance.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{InstrumentId, OrderAck, OrderRequest, OrderSide, OrderSize, PriceUpdate};
use crate::error::{Error, Result};
use crate::port::outbound::order::{AdapterCapabilities, OrderAdapter};

#[derive(Debug, Clone, Copy)]
struct Quote {
    price: Decimal,
    timestamp_ms: i64,
}

pub struct PaperOrderAdapter {
    quotes: DashMap<InstrumentId, Quote>,
    balance: Mutex<Decimal>,
}

impl PaperOrderAdapter {
    #[must_use]
    pub fn new(balance: Decimal) -> Self {
        Self {
            quotes: DashMap::new(),
            balance: Mutex::new(balance),
        }
    }

    /// Quote `update`'s price unless a newer tick is already recorded.
    ///
    /// Several services may share one adapter and reach the same tick at
    /// different times, so quotes only move forward.
    pub fn mark(&self, update: &PriceUpdate) {
        let quote = Quote {
            price: update.price,
            timestamp_ms: update.timestamp_ms,
        };
        self.quotes
            .entry(update.instrument_id.clone())
            .and_modify(|current| {
                if quote.timestamp_ms >= current.timestamp_ms {
                    *current = quote;
                }
            })
            .or_insert(quote);
    }

    fn quote(&self, instrument_id: &InstrumentId) -> Option<Decimal> {
        self.quotes.get(instrument_id).map(|q| q.price)
    }

    #[must_use]
    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }
}

#[async_trait]
impl OrderAdapter for PaperOrderAdapter {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let Some(price) = request.price_limit.or_else(|| self.quote(&request.instrument_id)) else {
            return Ok(OrderAck::rejected("no price for instrument"));
        };
        if price <= Decimal::ZERO {
            return Ok(OrderAck::rejected("non-positive price"));
        }
        let shares = match request.size {
            OrderSize::Shares(shares) => shares,
            OrderSize::Usd(usd) => (usd / price).round_dp(2),
        };
        let notional = shares * price;

        {
            let mut balance = self.balance.lock();
            match request.side {
                OrderSide::Buy if notional > *balance => {
                    debug!(%notional, balance = %*balance, "Paper order exceeds balance");
                    return Ok(OrderAck::rejected("insufficient balance"));
                }
                OrderSide::Buy => *balance -= notional,
                OrderSide::Sell => *balance += notional,
            }
        }

        let order_id = format!("paper-{}", Uuid::new_v4());
        info!(
            order_id = %order_id,
            instrument_id = %request.instrument_id,
            side = %request.side,
            %shares,
            %price,
            fulfillment = request.fulfillment.as_str(),
            "Paper order filled"
        );
        Ok(OrderAck::filled(order_id, shares, price))
    }

    async fn market_price(&self, instrument_id: &InstrumentId, _side: OrderSide) -> Result<Decimal> {
        self.quote(instrument_id)
            .ok_or_else(|| Error::Parse(format!("no quote for {instrument_id}")))
    }

    fn observe_price(&self, update: &PriceUpdate) {
        self.mark(update);
    }

    async fn available_balance(&self) -> Result<Decimal> {
        Ok(self.balance())
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities::full()
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FulfillmentMode;
    use crate::testkit::domain::price_update;
    use rust_decimal_macros::dec;

    fn request(side: OrderSide, size: OrderSize, limit: Option<Decimal>) -> OrderRequest {
        OrderRequest {
            instrument_id: InstrumentId::from("t1"),
            outcome: None,
            side,
            size,
            price_limit: limit,
            fulfillment: FulfillmentMode::FillAndKill,
        }
    }

    #[tokio::test]
    async fn fills_at_limit_and_debits_balance() {
        let paper = PaperOrderAdapter::new(dec!(100));
        let ack = paper
            .create_order(&request(OrderSide::Buy, OrderSize::Shares(dec!(10)), Some(dec!(0.5))))
            .await
            .unwrap();

        assert!(ack.success);
        assert_eq!(ack.price_filled, dec!(0.5));
        assert_eq!(paper.balance(), dec!(95));
    }

    #[tokio::test]
    async fn sells_credit_balance() {
        let paper = PaperOrderAdapter::new(dec!(10));
        paper
            .create_order(&request(OrderSide::Sell, OrderSize::Shares(dec!(10)), Some(dec!(0.4))))
            .await
            .unwrap();
        assert_eq!(paper.balance(), dec!(14));
    }

    #[tokio::test]
    async fn usd_orders_use_last_quote() {
        let paper = PaperOrderAdapter::new(dec!(100));
        paper.mark(&price_update("t1", dec!(0.25), 1_000));

        let ack = paper
            .create_order(&request(OrderSide::Buy, OrderSize::Usd(dec!(5)), None))
            .await
            .unwrap();
        assert_eq!(ack.shares_filled, dec!(20));
        assert_eq!(
            paper.market_price(&InstrumentId::from("t1"), OrderSide::Buy).await.unwrap(),
            dec!(0.25)
        );
    }

    #[tokio::test]
    async fn rejects_without_price_or_funds() {
        let paper = PaperOrderAdapter::new(dec!(1));
        let ack = paper
            .create_order(&request(OrderSide::Buy, OrderSize::Usd(dec!(5)), None))
            .await
            .unwrap();
        assert!(!ack.success);

        let ack = paper
            .create_order(&request(OrderSide::Buy, OrderSize::Shares(dec!(10)), Some(dec!(0.5))))
            .await
            .unwrap();
        assert_eq!(ack.error.as_deref(), Some("insufficient balance"));
        assert!(paper.market_price(&InstrumentId::from("zz"), OrderSide::Buy).await.is_err());
    }

    #[tokio::test]
    async fn late_tick_does_not_rewind_the_quote() {
        let paper = PaperOrderAdapter::new(dec!(100));
        let t1 = InstrumentId::from("t1");
        paper.observe_price(&price_update("t1", dec!(0.53), 2_000));
        paper.observe_price(&price_update("t1", dec!(0.50), 1_000));

        assert_eq!(paper.market_price(&t1, OrderSide::Buy).await.unwrap(), dec!(0.53));

        paper.observe_price(&price_update("t1", dec!(0.55), 3_000));
        assert_eq!(paper.market_price(&t1, OrderSide::Buy).await.unwrap(), dec!(0.55));
    }
}
