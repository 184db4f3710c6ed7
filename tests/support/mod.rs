//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::broadcast;

/// Poll `check` until it holds, yielding to the runtime in between.
///
/// Works under a paused clock: each sleep auto-advances time.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Next event on `rx`, failing the test after one second.
pub async fn next<E: Clone>(rx: &mut broadcast::Receiver<E>) -> E {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("bus closed")
}
