//! Polling fallback for trade prints while the market channel is down.
//!
//! Polled prints go through the same dispatch path as streamed ones, so the
//! hub's deduplicator guarantees each print is published once even when
//! both paths report it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::supervisor::ChannelStatus;
use super::HubShared;
use crate::port::outbound::exchange::MarketEvent;
use crate::port::outbound::feed::TradeFeed;

pub(super) async fn run(
    shared: Arc<HubShared>,
    feed: Arc<dyn TradeFeed>,
    wallets: Vec<String>,
    limit: usize,
    period: Duration,
) {
    let mut ticker = shared.clock.ticker(period);
    loop {
        ticker.tick().await;
        if *shared.market_status.borrow() == ChannelStatus::Connected {
            continue;
        }

        for wallet in &wallets {
            match feed.recent_trades(wallet, limit).await {
                Ok(trades) => {
                    debug!(wallet = %wallet, count = trades.len(), "Polled trades");
                    // Feed returns newest first; publish oldest first.
                    for trade in trades.into_iter().rev() {
                        shared.dispatch(MarketEvent::Trade(trade));
                    }
                }
                Err(e) => warn!(wallet = %wallet, error = %e, "Trade poll failed"),
            }
        }
    }
}
