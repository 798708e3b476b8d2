//! SO2 Protocol Library
//!
//! This crate provides the wire-level pieces shared by the station core:
//!
//! - **Keyer protocol**: WinKeyer-compatible binary commands (admin commands,
//!   speed, output port, sidetone, paddle options) and classification of the
//!   bytes the keyer sends back (status, speed-pot telemetry, echo)
//! - **Rig vocabulary**: radio indices, raw rig-control modes, the semantic
//!   mode groups contest logic works with, and passband requests
//! - **Rig wire formats**: the rigctld line protocol and the Kenwood CAT
//!   subset used for direct serial control
//!
//! # Architecture
//!
//! The keyer stream has no delimiters. Host → keyer traffic is framed by the
//! command byte (each command has a fixed argument count), and keyer → host
//! traffic is one byte per message, classified by its two high bits:
//!
//! - `11xxxxxx` status byte (bit 2 set while the keyer is sending)
//! - `10xxxxxx` speed-pot reading in the low six bits
//! - anything else is an echo of a character the keyer just sent
//!
//! # Example
//!
//! ```rust
//! use so2_protocol::{EncodeCommand, InboundByte, KeyerCommand};
//!
//! assert_eq!(KeyerCommand::SetSpeed(32).encode(), vec![0x02, 32]);
//!
//! match InboundByte::classify(0xC4) {
//!     InboundByte::Status(status) => assert!(status.busy),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod error;
pub mod kenwood;
pub mod keyer;
pub mod mode;
pub mod radio;
pub mod rigctl;

pub use error::{ParseError, ProtocolError};
pub use kenwood::{KenwoodCodec, KenwoodCommand, KenwoodInfo};
pub use keyer::{
    HostCodec, InboundByte, KeyerCommand, KeyerStatus, PaddleMode, PortSelect, ECHO_TEST_BYTE,
};
pub use mode::{ModeGroup, Passband, RigMode};
pub use radio::Radio;
pub use rigctl::RigctlCommand;

/// Trait for protocol codecs that can parse incoming data streams
pub trait ProtocolCodec {
    /// The command type produced by this codec
    type Command;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete command from the buffer
    fn next_command(&mut self) -> Option<Self::Command>;

    /// Clear the internal buffer
    fn clear(&mut self);
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}
