//! Saved keyer settings pushed to the device after the handshake

use std::time::Duration;

use serde::{Deserialize, Serialize};
use so2_protocol::keyer::{MAX_WPM, MIN_WPM};
use so2_protocol::{KeyerCommand, PaddleMode};

/// Keyer configuration, supplied once when the link is created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyerConfig {
    /// Serial device path (`/dev/ttyUSB0`, `COM3`)
    pub device: String,
    /// Sidetone only while keying from the paddle
    pub sidetone_paddle_only: bool,
    /// Sidetone frequency code (1-10, see the keyer manual)
    pub sidetone_frequency: u8,
    /// Contest (CT) letter spacing
    pub ct_spacing: bool,
    /// Swap dit and dah paddles
    pub paddle_swap: bool,
    /// Paddle keying mode
    pub paddle_mode: PaddleMode,
    /// Speed pot minimum in WPM
    pub pot_min_wpm: u8,
    /// Speed pot range above the minimum in WPM
    pub pot_range_wpm: u8,
    /// Speed set right after opening
    pub speed_wpm: u8,
    /// Bound on each handshake wait in milliseconds
    pub step_timeout_ms: u64,
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            sidetone_paddle_only: false,
            sidetone_frequency: 5,
            ct_spacing: false,
            paddle_swap: false,
            paddle_mode: PaddleMode::IambicB,
            // The pot must be set up or paddle speed misbehaves
            pot_min_wpm: 10,
            pot_range_wpm: 80,
            speed_wpm: 28,
            step_timeout_ms: 500,
        }
    }
}

impl KeyerConfig {
    /// Configuration for a device path with default settings
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Handshake step timeout
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Commands written after a successful handshake, in order
    pub fn startup_commands(&self) -> [KeyerCommand; 4] {
        [
            KeyerCommand::sidetone(self.sidetone_paddle_only, self.sidetone_frequency),
            KeyerCommand::options(self.ct_spacing, self.paddle_swap, self.paddle_mode),
            KeyerCommand::SpeedPotSetup {
                min: self.pot_min_wpm,
                range: self.pot_range_wpm,
            },
            KeyerCommand::SetSpeed(self.speed_wpm.clamp(MIN_WPM, MAX_WPM)),
        ]
    }
}
