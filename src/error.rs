//! Error types for the exchange

use rust_decimal::Decimal;
use thiserror::Error;

/// Exchange errors
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Order quantity out of range, got {0}")]
    InvalidQuantity(Decimal),

    #[error("Order price out of range, got {0}")]
    InvalidPrice(Decimal),

    #[error("Unsupported order kind: {0}")]
    UnsupportedOrderKind(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Client directory error: {0}")]
    ClientDirectoryError(String),

    #[error("Reserved client identifier: {0}")]
    ReservedClientId(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Exchange service is not running")]
    ServiceUnavailable,
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        ExchangeError::IpcError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for ExchangeError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ExchangeError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
