//! Polymarket exchange integration.
//!
//! Streams for the market and user WebSocket channels, plus REST adapters for
//! instrument metadata (Gamma API) and wallet trade history (Data API).

mod client;
pub mod dto;
mod metadata;
mod settings;
mod stream;
mod trades;

pub use client::PolymarketClient;
pub use metadata::GammaMetadataFetcher;
pub use settings::{PolymarketConfig, PolymarketCredentials, PolymarketHttpConfig};
pub use stream::PolymarketStream;
pub use trades::DataApiTradeFeed;
