//! Outbound adapters (driven side).

pub mod audit;
pub mod paper;
pub mod polymarket;
