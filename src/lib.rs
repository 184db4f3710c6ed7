//! Flashmirror - flash-move detection and mirrored execution for prediction markets.
//!
//! The crate ingests streaming prices for binary-outcome instruments, detects
//! sudden moves ("flash moves"), scores them for risk and opens small
//! protected positions through a pluggable order adapter.
//!
//! # Architecture
//!
//! - **[`domain`]** - Exchange-agnostic value types, rolling history and the
//!   proportional sizer. No I/O.
//! - **[`port`]** - Traits the core depends on: market data streams,
//!   metadata lookups, polled trade feeds, order routing and audit sinks.
//! - **[`application`]** - The ingestion hub, anomaly detector, risk engine,
//!   execution engine, mirror planner and the per-account flash service.
//! - **[`adapter`]** - Polymarket stream/REST adapters, a paper order
//!   adapter and a tracing audit sink.
//! - **[`infrastructure`]** - Configuration, logging and runtime wiring.
//!
//! # Features
//!
//! - `testkit` - Scripted streams, mock adapters and fixtures for tests.
//!
//! # Example
//!
//! ```no_run
//! use flashmirror::application::detector::{Detector, DetectorConfig};
//! use flashmirror::domain::{InstrumentId, PriceUpdate};
//! use rust_decimal_macros::dec;
//!
//! let mut detector = Detector::new(DetectorConfig::default());
//! let update = PriceUpdate {
//!     instrument_id: InstrumentId::new("token-1"),
//!     condition_id: None,
//!     price: dec!(0.50),
//!     best_bid: None,
//!     best_ask: None,
//!     volume: None,
//!     timestamp_ms: 0,
//! };
//! // A single sample never fires.
//! assert!(detector.detect(&update).is_none());
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
