//! Background sweep purging state for idle instruments.

use std::sync::Arc;
use std::time::Duration;

use super::HubShared;

/// Sweep on every tick until the task is aborted.
pub(super) async fn run(shared: Arc<HubShared>, period: Duration) {
    let mut ticker = shared.clock.ticker(period);
    loop {
        ticker.tick().await;
        shared.reap();
    }
}
