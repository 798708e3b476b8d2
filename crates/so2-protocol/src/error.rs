//! Error types for protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Invalid mode name or raw value
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Invalid frequency value
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Malformed frame or reply line
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Radio index outside the two supported radios
    #[error("invalid radio index: {0}")]
    InvalidRadio(usize),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Device rejected a command
    #[error("command rejected: {0}")]
    Rejected(String),

    /// Invalid response from device
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
