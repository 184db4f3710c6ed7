//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors and other methods
//! that validate domain rules.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Prices on a binary outcome must lie strictly between 0 and 1.
    #[error("price must be in (0, 1), got {price}")]
    PriceOutOfRange {
        /// The invalid price that was provided.
        price: Decimal,
    },

    /// Timestamps must be positive epoch milliseconds.
    #[error("invalid timestamp {timestamp_ms}")]
    InvalidTimestamp {
        /// The invalid timestamp in milliseconds.
        timestamp_ms: i64,
    },
}
