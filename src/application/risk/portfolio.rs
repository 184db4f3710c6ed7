//! Account-wide exposure bookkeeping.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use tracing::warn;

use super::PortfolioConfig;
use crate::error::LimitBreach;

/// Aggregate exposure, open count and recent entry times for one account.
#[derive(Debug)]
pub struct PortfolioLimits {
    config: PortfolioConfig,
    exposure: Decimal,
    open: usize,
    recent_entries: VecDeque<i64>,
}

impl PortfolioLimits {
    #[must_use]
    pub fn new(config: PortfolioConfig) -> Self {
        Self {
            config,
            exposure: Decimal::ZERO,
            open: 0,
            recent_entries: VecDeque::new(),
        }
    }

    /// Check whether a new entry of `notional` would breach any limit.
    ///
    /// # Errors
    ///
    /// Returns the first [`LimitBreach`] found, checking exposure, then the
    /// open-position count, then correlated entries.
    pub fn check(&mut self, notional: Decimal, now_ms: i64) -> Result<(), LimitBreach> {
        self.prune(now_ms);

        let breach = if self.exposure + notional > self.config.max_exposure_usd {
            Some(LimitBreach::Exposure {
                current: self.exposure,
                additional: notional,
                limit: self.config.max_exposure_usd,
            })
        } else if self.open >= self.config.max_positions {
            Some(LimitBreach::ConcurrentPositions {
                open: self.open,
                limit: self.config.max_positions,
            })
        } else if self.recent_entries.len() >= self.config.max_correlated_entries {
            Some(LimitBreach::CorrelatedEntries {
                recent: self.recent_entries.len(),
                window_secs: self.config.correlation_window_secs,
                limit: self.config.max_correlated_entries,
            })
        } else {
            None
        };

        match breach {
            Some(breach) => {
                warn!(error = %breach, "Portfolio limit breached");
                Err(breach)
            }
            None => Ok(()),
        }
    }

    pub fn record_entry(&mut self, notional: Decimal, now_ms: i64) {
        self.exposure += notional;
        self.open += 1;
        self.recent_entries.push_back(now_ms);
    }

    pub fn record_exit(&mut self, notional: Decimal) {
        self.exposure = (self.exposure - notional).max(Decimal::ZERO);
        self.open = self.open.saturating_sub(1);
    }

    #[must_use]
    pub const fn exposure(&self) -> Decimal {
        self.exposure
    }

    #[must_use]
    pub const fn open_positions(&self) -> usize {
        self.open
    }

    fn prune(&mut self, now_ms: i64) {
        let window_ms = i64::try_from(self.config.correlation_window_secs.saturating_mul(1_000))
            .unwrap_or(i64::MAX);
        let cutoff = now_ms.saturating_sub(window_ms);
        while self.recent_entries.front().is_some_and(|t| *t < cutoff) {
            self.recent_entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> PortfolioLimits {
        PortfolioLimits::new(PortfolioConfig {
            max_exposure_usd: dec!(100),
            max_positions: 2,
            max_correlated_entries: 2,
            correlation_window_secs: 30,
        })
    }

    #[test]
    fn exposure_limit_includes_the_new_entry() {
        let mut limits = limits();
        limits.record_entry(dec!(80), 0);

        let err = limits.check(dec!(30), 60_000).unwrap_err();

        assert_eq!(
            err,
            LimitBreach::Exposure {
                current: dec!(80),
                additional: dec!(30),
                limit: dec!(100),
            }
        );
        assert!(limits.check(dec!(20), 60_000).is_ok());
    }

    #[test]
    fn open_positions_are_capped() {
        let mut limits = limits();
        limits.record_entry(dec!(10), 0);
        limits.record_entry(dec!(10), 40_000);

        let err = limits.check(dec!(10), 100_000).unwrap_err();
        assert_eq!(err, LimitBreach::ConcurrentPositions { open: 2, limit: 2 });

        limits.record_exit(dec!(10));
        assert!(limits.check(dec!(10), 100_000).is_ok());
        assert_eq!(limits.exposure(), dec!(10));
    }

    #[test]
    fn entries_inside_window_are_correlated() {
        let mut limits = PortfolioLimits::new(PortfolioConfig {
            max_positions: 10,
            ..limits().config
        });
        limits.record_entry(dec!(5), 0);
        limits.record_entry(dec!(5), 10_000);

        assert!(matches!(
            limits.check(dec!(5), 20_000),
            Err(LimitBreach::CorrelatedEntries { recent: 2, .. })
        ));
        // first entry ages out of the 30s window
        assert!(limits.check(dec!(5), 30_001).is_ok());
    }

    #[test]
    fn exits_never_go_negative() {
        let mut limits = limits();
        limits.record_exit(dec!(50));
        assert_eq!(limits.exposure(), Decimal::ZERO);
        assert_eq!(limits.open_positions(), 0);
    }
}
