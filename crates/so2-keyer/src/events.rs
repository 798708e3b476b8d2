//! Events emitted by the keyer link

use so2_protocol::Radio;

/// Keyer event delivered to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyerEvent {
    /// Handshake completed; carries the firmware version byte
    Version(u8),
    /// Keyer started or stopped sending on the active radio
    Transmit {
        /// Radio selected on the keyer's output port
        radio: Radio,
        /// Whether the keyer is now sending
        sending: bool,
    },
    /// Echo of a character the keyer has just sent
    Echo(u8),
    /// Connection or handshake failure
    Error(String),
}

impl KeyerEvent {
    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, KeyerEvent::Error(_))
    }
}
