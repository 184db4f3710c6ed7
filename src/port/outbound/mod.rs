//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the infrastructure the decision core depends on:
//! streaming market data, instrument metadata, order routing, polled trade
//! feeds, and audit storage.

pub mod audit;
pub mod exchange;
pub mod feed;
pub mod metadata;
pub mod order;
