use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("order adapter '{adapter}' lacks required capability: {capability}")]
    MissingCapability {
        adapter: &'static str,
        capability: &'static str,
    },
}

/// Portfolio limits that veto a new entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimitBreach {
    #[error("exposure limit exceeded: {current} + {additional} > {limit}")]
    Exposure {
        current: Decimal,
        additional: Decimal,
        limit: Decimal,
    },

    #[error("concurrent position limit reached: {open} >= {limit}")]
    ConcurrentPositions { open: usize, limit: usize },

    #[error("too many correlated entries: {recent} entries within {window_secs}s (limit {limit})")]
    CorrelatedEntries {
        recent: usize,
        window_secs: u64,
        limit: usize,
    },
}

/// Execution-related errors with structured variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("assessment vetoed the trade: {reasons}")]
    Vetoed { reasons: String },

    #[error("kill switch active: risk score {score:.1} above ceiling")]
    KillSwitch { score: f64 },

    #[error("position already open for instrument {instrument_id}")]
    DuplicatePosition { instrument_id: String },

    #[error("max concurrent positions reached: {open}")]
    PositionCeiling { open: usize },

    #[error(transparent)]
    Limit(#[from] LimitBreach),

    #[error("order size below exchange minimum: {reason}")]
    Unsizeable { reason: String },

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("slippage exceeded: {actual} > {max}")]
    SlippageExceeded { actual: Decimal, max: Decimal },

    #[error("adapter failure: {0}")]
    Adapter(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("{channel} channel gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { channel: &'static str, attempts: u32 },

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_breach_converts_into_execution_error() {
        let breach = LimitBreach::ConcurrentPositions { open: 3, limit: 3 };
        let err: ExecutionError = breach.clone().into();
        assert_eq!(err, ExecutionError::Limit(breach));
        assert!(err.to_string().contains("3 >= 3"));
    }

    #[test]
    fn reconnect_exhausted_names_the_channel() {
        let err = Error::ReconnectExhausted {
            channel: "market",
            attempts: 10,
        };
        assert_eq!(
            err.to_string(),
            "market channel gave up after 10 reconnect attempts"
        );
    }

    #[test]
    fn slippage_message_includes_bounds() {
        let err = ExecutionError::SlippageExceeded {
            actual: dec!(0.05),
            max: dec!(0.02),
        };
        assert_eq!(err.to_string(), "slippage exceeded: 0.05 > 0.02");
    }
}
