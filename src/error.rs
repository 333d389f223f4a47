//! Error types for the simulation client.

use thiserror::Error;

/// Main error type for connection operations.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection is closed")]
    Closed,
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Serialization(e.to_string())
    }
}

/// Errors raised while interpreting a received buffer.
///
/// A decode error only ever drops the message that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Truncated message: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Datum index {index} outside definition of {count} entries")]
    UnknownDatumIndex { index: u32, count: usize },

    #[error("Data type {0} has no fixed width")]
    UnsizedDataType(u32),

    #[error("Unknown directive id {0}")]
    InvalidDirective(u32),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

/// Errors reported by the engine transport.
///
/// Everything except `WouldBlock` is fatal to the current call and is never
/// retried by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No message queued")]
    WouldBlock,

    #[error("Failed to open connection: {0}")]
    Open(String),

    #[error("Failed to send directive: {0}")]
    Send(String),

    #[error("Failed to receive: {0}")]
    Receive(String),

    #[error("Transport closed")]
    Closed,
}

/// Result type for connection operations.
pub type Result<T> = std::result::Result<T, SimError>;
