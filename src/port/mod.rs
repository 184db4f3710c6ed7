//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The application layer talks to the exchange, metadata service, order
//! routing and audit storage exclusively through these traits, so tests can
//! drive the whole pipeline with scripted implementations.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │       Application        │
//!                 │  hub → detector → risk   │
//!                 │        → execution       │
//!                 └────────────┬─────────────┘
//!        ┌──────────────┬──────┴───────┬──────────────┐
//!        ▼              ▼              ▼              ▼
//!  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐
//!  │MarketData │  │ Metadata  │  │  Order    │  │  Audit    │
//!  │  Stream   │  │ Fetcher   │  │ Adapter   │  │   Sink    │
//!  └───────────┘  └───────────┘  └───────────┘  └───────────┘
//! ```

pub mod outbound;
