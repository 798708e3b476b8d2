//! Events emitted by the radio link

use so2_protocol::{Passband, Radio, RigMode};

/// Radio event delivered to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// Transport opened
    Opened(Radio),
    /// Transport closed on request
    Closed(Radio),
    /// Status poll saw a frequency or mode change
    Status {
        /// Radio polled
        radio: Radio,
        /// Frequency in Hz
        frequency_hz: Option<u64>,
        /// Raw mode
        mode: RigMode,
        /// Passband
        passband: Passband,
    },
    /// Open failure or transport fault
    Error {
        /// Radio affected
        radio: Radio,
        /// Human-readable cause
        message: String,
    },
}

impl RadioEvent {
    /// Radio this event is about
    pub fn radio(&self) -> Radio {
        match self {
            RadioEvent::Opened(radio) | RadioEvent::Closed(radio) => *radio,
            RadioEvent::Status { radio, .. } | RadioEvent::Error { radio, .. } => *radio,
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, RadioEvent::Error { .. })
    }
}
