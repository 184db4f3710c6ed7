//! In-memory caches used by the hub and detector.

mod bounded;
mod dedup;

pub use bounded::BoundedCache;
pub use dedup::TradeDeduplicator;
