//! Instrument metadata from the Gamma API.

use async_trait::async_trait;
use tracing::debug;

use super::client::{Fetched, PolymarketClient};
use crate::domain::InstrumentId;
use crate::error::Result;
use crate::port::outbound::metadata::{MetadataFetcher, MetadataLookup};

/// [`MetadataFetcher`] backed by `GET /markets?clob_token_ids=`.
pub struct GammaMetadataFetcher {
    client: PolymarketClient,
}

impl GammaMetadataFetcher {
    #[must_use]
    pub const fn new(client: PolymarketClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for GammaMetadataFetcher {
    async fn fetch(&self, instrument_id: &InstrumentId) -> Result<MetadataLookup> {
        let markets = match self.client.markets_for_token(instrument_id.as_str()).await? {
            Fetched::Body(markets) => markets,
            Fetched::NotFound => return Ok(MetadataLookup::NotFound),
        };

        let found = markets
            .iter()
            .find_map(|market| market.metadata_for(instrument_id));
        match found {
            Some(metadata) => Ok(MetadataLookup::Found(metadata)),
            None => {
                debug!(instrument_id = %instrument_id, "Gamma has no market for token");
                Ok(MetadataLookup::NotFound)
            }
        }
    }
}
