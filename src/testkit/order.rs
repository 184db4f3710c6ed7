//! Mock outbound adapters: orders, metadata, polled trades and audit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{
    InstrumentId, InstrumentMetadata, OrderAck, OrderRequest, OrderSide, OrderSize, TradePrint,
};
use crate::error::{Error, Result};
use crate::port::outbound::audit::{AuditRecord, AuditSink};
use crate::port::outbound::feed::TradeFeed;
use crate::port::outbound::metadata::{MetadataFetcher, MetadataLookup};
use crate::port::outbound::order::{AdapterCapabilities, OrderAdapter};

// ---------------------------------------------------------------------------
// MockOrderAdapter
// ---------------------------------------------------------------------------

/// Order adapter that records every request and fills it at its limit.
///
/// `market_price` fails for instruments without a [`quote`](Self::quote).
pub struct MockOrderAdapter {
    balance: Decimal,
    quotes: Mutex<HashMap<InstrumentId, Decimal>>,
    orders: Mutex<Vec<OrderRequest>>,
    rejection: Mutex<Option<String>>,
    failing: AtomicBool,
    capabilities: AdapterCapabilities,
}

impl MockOrderAdapter {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance,
            quotes: Mutex::new(HashMap::new()),
            orders: Mutex::new(Vec::new()),
            rejection: Mutex::new(None),
            failing: AtomicBool::new(false),
            capabilities: AdapterCapabilities::full(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: AdapterCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn quote(&self, id: &str, price: Decimal) {
        self.quotes.lock().insert(InstrumentId::from(id), price);
    }

    /// Reject every later order with `message`.
    pub fn reject_with(&self, message: &str) {
        *self.rejection.lock() = Some(message.to_string());
    }

    /// Make every later order fail at the adapter level.
    pub fn fail_orders(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Every request submitted so far, in order.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }
}

#[async_trait]
impl OrderAdapter for MockOrderAdapter {
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck> {
        let seq = {
            let mut orders = self.orders.lock();
            orders.push(request.clone());
            orders.len()
        };
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Connection("order endpoint unavailable".into()));
        }
        if let Some(message) = self.rejection.lock().clone() {
            return Ok(OrderAck::rejected(message));
        }

        let quote = self.quotes.lock().get(&request.instrument_id).copied();
        let Some(price) = request.price_limit.or(quote) else {
            return Ok(OrderAck::rejected("no price"));
        };
        let shares = match request.size {
            OrderSize::Shares(shares) => shares,
            OrderSize::Usd(usd) => (usd / price).round_dp(2),
        };
        Ok(OrderAck::filled(format!("mock-{seq}"), shares, price))
    }

    async fn market_price(&self, instrument_id: &InstrumentId, _side: OrderSide) -> Result<Decimal> {
        self.quotes
            .lock()
            .get(instrument_id)
            .copied()
            .ok_or_else(|| Error::Parse(format!("no quote for {instrument_id}")))
    }

    async fn available_balance(&self) -> Result<Decimal> {
        Ok(self.balance)
    }

    fn capabilities(&self) -> AdapterCapabilities {
        self.capabilities
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockMetadataFetcher
// ---------------------------------------------------------------------------

/// Metadata fetcher backed by a map; unknown instruments are `NotFound`.
#[derive(Default)]
pub struct MockMetadataFetcher {
    entries: Mutex<HashMap<InstrumentId, InstrumentMetadata>>,
    failing: AtomicBool,
    calls: AtomicU32,
}

impl MockMetadataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, metadata: InstrumentMetadata) -> Self {
        self.entries
            .lock()
            .insert(metadata.instrument_id.clone(), metadata);
        self
    }

    /// Fail every later lookup with a transient error (or stop failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockMetadataFetcher {
    async fn fetch(&self, instrument_id: &InstrumentId) -> Result<MetadataLookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Connection("metadata service unavailable".into()));
        }
        Ok(self
            .entries
            .lock()
            .get(instrument_id)
            .cloned()
            .map_or(MetadataLookup::NotFound, MetadataLookup::Found))
    }
}

// ---------------------------------------------------------------------------
// MockTradeFeed
// ---------------------------------------------------------------------------

/// Trade feed that returns the same scripted trades on every poll.
#[derive(Default)]
pub struct MockTradeFeed {
    trades: Mutex<HashMap<String, Vec<TradePrint>>>,
    calls: AtomicU32,
}

impl MockTradeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the trades returned for `wallet`, newest first.
    pub fn set_trades(&self, wallet: &str, trades: Vec<TradePrint>) {
        self.trades.lock().insert(wallet.to_string(), trades);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeFeed for MockTradeFeed {
    async fn recent_trades(&self, wallet: &str, limit: usize) -> Result<Vec<TradePrint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .trades
            .lock()
            .get(wallet)
            .map(|trades| trades.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditSink
// ---------------------------------------------------------------------------

/// Audit sink that keeps every record in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
