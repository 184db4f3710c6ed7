//! TTL deduplication for trade prints arriving over more than one path.
//!
//! The streaming channel and the polling fallback can both report the same
//! trade. Prints are keyed by transaction hash, instrument and side; a key
//! seen within the TTL is a duplicate.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::domain::TradePrint;

/// Thread-safe trade deduplicator.
pub struct TradeDeduplicator {
    cache: DashMap<String, Instant>,
    ttl: Duration,
    max_entries: usize,
}

impl TradeDeduplicator {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Dedup key for a print. Prints without a transaction hash fall back to
    /// their timestamp, price and size.
    fn make_key(trade: &TradePrint) -> String {
        let side = trade.side.as_str();
        match trade.transaction_hash.as_deref() {
            Some(hash) => format!("{hash}:{}:{side}", trade.instrument_id),
            None => format!(
                "{}:{}:{side}:{}:{}",
                trade.timestamp_ms, trade.instrument_id, trade.price, trade.size
            ),
        }
    }

    /// Check whether `trade` was seen recently and record it.
    pub fn is_duplicate(&self, trade: &TradePrint) -> bool {
        let key = Self::make_key(trade);
        let now = Instant::now();

        if let Some(seen) = self.cache.get(&key) {
            if now.duration_since(*seen) < self.ttl {
                return true;
            }
        }

        self.cache.insert(key, now);
        if self.cache.len() > self.max_entries {
            self.gc();
        }
        false
    }

    /// Drop expired entries, then the oldest ones while over capacity.
    pub fn gc(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.cache
            .retain(|_, seen| now.duration_since(*seen) < ttl);

        if self.cache.len() > self.max_entries {
            let mut entries: Vec<(String, Instant)> = self
                .cache
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect();
            entries.sort_by(|a, b| a.1.cmp(&b.1));

            let excess = entries.len().saturating_sub(self.max_entries);
            for (key, _) in entries.into_iter().take(excess) {
                self.cache.remove(&key);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
