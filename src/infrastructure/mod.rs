//! Infrastructure layer.
//!
//! Configuration, logging and the composition root that wires adapters into
//! the hub and the flash service.

pub mod bootstrap;
pub mod config;
