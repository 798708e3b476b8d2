//! Cached radio state

use std::time::Instant;

use serde::{Deserialize, Serialize};
use so2_protocol::{ModeGroup, Passband, Radio, RigMode};

/// Connection state of one radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkState {
    /// No transport
    #[default]
    Closed,
    /// Transport is being opened
    Opening,
    /// Transport open and healthy
    Open,
    /// Transport failed while open; close or reopen to recover
    Error,
}

impl LinkState {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            LinkState::Closed => "closed",
            LinkState::Opening => "opening",
            LinkState::Open => "open",
            LinkState::Error => "error",
        }
    }
}

/// Cached view of one radio
///
/// The frequency is only ever a value the radio reported or a value that was
/// successfully sent to it.
#[derive(Debug, Clone)]
pub struct RadioState {
    /// Which radio this is
    pub radio: Radio,
    /// Connection state
    pub link: LinkState,
    /// Last confirmed frequency in Hz
    pub frequency_hz: Option<u64>,
    /// Raw mode
    pub mode: RigMode,
    /// Passband that goes with the mode
    pub passband: Passband,
    /// Last IF offset reading in Hz
    pub if_frequency: i32,
    /// Last status poll or command succeeded
    pub healthy: bool,
    /// Last time the radio answered
    pub last_activity: Option<Instant>,
}

impl RadioState {
    /// Closed radio with nothing known
    pub fn new(radio: Radio) -> Self {
        Self {
            radio,
            link: LinkState::Closed,
            frequency_hz: None,
            mode: RigMode::None,
            passband: Passband::Normal,
            if_frequency: 0,
            healthy: false,
            last_activity: None,
        }
    }

    /// Semantic mode group
    pub fn mode_group(&self) -> ModeGroup {
        self.mode.group()
    }

    /// Forget everything learned from the radio
    pub fn reset(&mut self, link: LinkState) {
        *self = Self {
            link,
            ..Self::new(self.radio)
        };
    }

    /// Record that the radio answered
    pub fn touch(&mut self) {
        self.healthy = true;
        self.last_activity = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_identity() {
        let mut state = RadioState::new(Radio::B);
        state.frequency_hz = Some(14_000_000);
        state.mode = RigMode::Cw;
        state.touch();

        state.reset(LinkState::Error);
        assert_eq!(state.radio, Radio::B);
        assert_eq!(state.link, LinkState::Error);
        assert_eq!(state.frequency_hz, None);
        assert_eq!(state.mode_group(), ModeGroup::Unknown);
        assert!(!state.healthy);
    }
}
