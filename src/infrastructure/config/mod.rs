//! Infrastructure configuration modules.

pub mod logging;
pub mod settings;

pub use logging::{LogFormat, LoggingConfig};
pub use settings::Config;
