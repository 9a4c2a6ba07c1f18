use thiserror::Error;

/// Errors raised when building value objects from exchange-provided text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("empty numeric string")]
    Empty,
    #[error("negative value not allowed: {0}")]
    Negative(String),
    #[error("invalid value: {0}")]
    Invalid(String),
    #[error("value out of range: {0}")]
    Overflow(String),
    #[error("unsupported trading pair: {0}")]
    UnsupportedPair(String),
    #[error("unsupported kline interval: {0}")]
    UnsupportedInterval(String),
}
