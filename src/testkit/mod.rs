//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`] - Mock [`MarketDataStream`](crate::port::outbound::exchange::MarketDataStream)
//!   implementations: `ScriptedStream`, `ChannelStream`.
//! - [`domain`] - Builders for events and detections.
//! - [`order`] - Mock order adapter, metadata fetcher, trade feed and audit sink.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod order;
pub mod stream;
