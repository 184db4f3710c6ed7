//! Application services.
//!
//! The ingestion hub fans exchange events out to consumers; the flash
//! service chains detector, risk engine and execution engine per account.

pub mod cache;
pub mod clock;
pub mod detector;
pub mod execution;
pub mod hub;
pub mod mirror;
pub mod risk;
pub mod service;
