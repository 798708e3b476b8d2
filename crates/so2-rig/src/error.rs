//! Error types for rig control

use thiserror::Error;

/// Errors that can occur while talking to a radio
#[derive(Debug, Error)]
pub enum RigError {
    /// Transport could not be opened or configured
    #[error("connection failed: {0}")]
    Connection(String),

    /// Read or write failure on an open transport
    #[error("transport fault: {0}")]
    Transport(#[from] std::io::Error),

    /// Radio answered with an error or something unparseable
    #[error("protocol error: {0}")]
    Protocol(#[from] so2_protocol::ProtocolError),

    /// Request rejected locally; no I/O attempted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Radio is not open
    #[error("radio not open")]
    NotOpen,

    /// Backend has no way to do this
    #[error("not supported: {0}")]
    Unsupported(String),
}

impl RigError {
    /// Returns whether this error means the transport is no longer usable
    pub fn is_fault(&self) -> bool {
        matches!(self, RigError::Transport(_) | RigError::NotOpen)
    }
}
