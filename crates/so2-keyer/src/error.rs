//! Error types for the keyer link

use thiserror::Error;

/// Errors that can occur while talking to the keyer
#[derive(Debug, Error)]
pub enum KeyerError {
    /// Serial link could not be opened or configured
    #[error("connection error: {0}")]
    Connection(String),

    /// Handshake did not reach the opened state
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Write or read failure on an established link
    #[error("transport fault: {0}")]
    Transport(#[from] std::io::Error),

    /// Argument rejected locally, no I/O attempted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Keyer is not open
    #[error("keyer is not open")]
    NotOpen,
}
