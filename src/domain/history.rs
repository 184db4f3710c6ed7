//! Per-instrument rolling price/volume history.
//!
//! A [`RollingHistory`] keeps a bounded, strictly time-ordered window of
//! [`PriceSample`]s plus a short tail of recent trade volumes. Samples are
//! evicted from the front when the window overflows its capacity or when
//! they age past the configured horizon.

use std::collections::VecDeque;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::error::DomainError;
use super::id::InstrumentId;

/// Default number of price samples kept per instrument.
pub const DEFAULT_MAX_SAMPLES: usize = 100;
/// Default maximum sample age (5 minutes).
pub const DEFAULT_MAX_AGE_MS: i64 = 300_000;
/// Default number of recent volumes kept per instrument.
pub const DEFAULT_MAX_VOLUMES: usize = 20;

/// A single observed price for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    instrument_id: InstrumentId,
    price: Decimal,
    timestamp_ms: i64,
    best_bid: Option<Decimal>,
    best_ask: Option<Decimal>,
}

impl PriceSample {
    /// Create a validated sample.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::PriceOutOfRange`] unless `0 < price < 1`, and
    /// [`DomainError::InvalidTimestamp`] for non-positive timestamps.
    pub fn try_new(
        instrument_id: InstrumentId,
        price: Decimal,
        timestamp_ms: i64,
        best_bid: Option<Decimal>,
        best_ask: Option<Decimal>,
    ) -> Result<Self, DomainError> {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Err(DomainError::PriceOutOfRange { price });
        }
        if timestamp_ms <= 0 {
            return Err(DomainError::InvalidTimestamp { timestamp_ms });
        }
        Ok(Self {
            instrument_id,
            price,
            timestamp_ms,
            best_bid,
            best_ask,
        })
    }

    #[must_use]
    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Price as `f64` for signal arithmetic.
    #[must_use]
    pub fn price_f64(&self) -> f64 {
        self.price.to_f64().unwrap_or(0.0)
    }

    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[must_use]
    pub const fn best_bid(&self) -> Option<Decimal> {
        self.best_bid
    }

    #[must_use]
    pub const fn best_ask(&self) -> Option<Decimal> {
        self.best_ask
    }
}

/// Bounds applied to a [`RollingHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Maximum number of price samples.
    pub max_samples: usize,
    /// Maximum age of the oldest sample relative to the newest.
    pub max_age_ms: i64,
    /// Maximum number of recent volumes.
    pub max_volumes: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            max_volumes: DEFAULT_MAX_VOLUMES,
        }
    }
}

/// What happened to a sample handed to [`RollingHistory::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended as the newest sample.
    Appended,
    /// Same timestamp as the newest sample; the newest sample's quote was replaced.
    Coalesced,
    /// Older than the newest sample; discarded.
    Stale,
}

/// Bounded, strictly time-ordered history for one instrument.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    limits: HistoryLimits,
    samples: VecDeque<PriceSample>,
    volumes: VecDeque<Decimal>,
}

impl RollingHistory {
    #[must_use]
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            limits,
            samples: VecDeque::with_capacity(limits.max_samples.min(128)),
            volumes: VecDeque::with_capacity(limits.max_volumes.min(32)),
        }
    }

    /// Append a sample, keeping timestamps strictly increasing.
    pub fn push(&mut self, sample: PriceSample) -> PushOutcome {
        if let Some(last) = self.samples.back_mut() {
            if sample.timestamp_ms < last.timestamp_ms {
                return PushOutcome::Stale;
            }
            if sample.timestamp_ms == last.timestamp_ms {
                last.price = sample.price;
                last.best_bid = sample.best_bid;
                last.best_ask = sample.best_ask;
                return PushOutcome::Coalesced;
            }
        }

        let newest = sample.timestamp_ms;
        self.samples.push_back(sample);

        while self.samples.len() > self.limits.max_samples {
            self.samples.pop_front();
        }
        let cutoff = newest - self.limits.max_age_ms;
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp_ms < cutoff)
        {
            self.samples.pop_front();
        }

        PushOutcome::Appended
    }

    /// Record a traded volume.
    pub fn push_volume(&mut self, volume: Decimal) {
        self.volumes.push_back(volume);
        while self.volumes.len() > self.limits.max_volumes {
            self.volumes.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    /// Iterate samples from oldest to newest.
    pub fn samples(&self) -> impl DoubleEndedIterator<Item = &PriceSample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Iterate recorded volumes from oldest to newest.
    pub fn volumes(&self) -> impl DoubleEndedIterator<Item = &Decimal> + ExactSizeIterator {
        self.volumes.iter()
    }

    /// Oldest sample at or after `cutoff_ms`, excluding the newest sample.
    #[must_use]
    pub fn oldest_since(&self, cutoff_ms: i64) -> Option<&PriceSample> {
        let end = self.samples.len().checked_sub(1)?;
        self.samples
            .iter()
            .take(end)
            .find(|s| s.timestamp_ms >= cutoff_ms)
    }

    /// The last `n` samples, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &PriceSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip)
    }

    /// Standard deviation of consecutive returns for samples at or after `cutoff_ms`.
    #[must_use]
    pub fn realized_volatility(&self, cutoff_ms: i64) -> f64 {
        let prices: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.timestamp_ms >= cutoff_ms)
            .map(PriceSample::price_f64)
            .collect();
        if prices.len() < 3 {
            return 0.0;
        }

        let returns: Vec<f64> = prices
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}
