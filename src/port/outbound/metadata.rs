//! Instrument metadata lookup port.

use async_trait::async_trait;

use crate::domain::{InstrumentId, InstrumentMetadata};
use crate::error::Error;

/// Outcome of a metadata lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataLookup {
    Found(InstrumentMetadata),
    /// The exchange confirmed the instrument does not exist.
    NotFound,
}

/// Looks up descriptive data for an instrument.
///
/// Transient failures are returned as `Err`; only a definitive "no such
/// instrument" answer is [`MetadataLookup::NotFound`].
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, instrument_id: &InstrumentId) -> Result<MetadataLookup, Error>;
}
