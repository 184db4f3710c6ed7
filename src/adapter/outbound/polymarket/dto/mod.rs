//! Polymarket data transfer objects.
//!
//! - WebSocket messages for the market and user channels
//! - REST responses from the Gamma and Data APIs

pub mod message;
pub mod response;
