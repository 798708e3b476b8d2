//! Radio configuration
//!
//! Supplied once when the link is built; the core never writes it back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use so2_protocol::rigctl::RIGCTLD_PORT;
use so2_protocol::Radio;

/// Default drain tick in milliseconds
pub const DEFAULT_TICK_MS: u64 = 20;

/// How a radio is reached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RigTransport {
    /// Direct Kenwood CAT over a serial port
    Serial {
        /// Serial device path
        device: String,
        /// Baud rate
        baud: u32,
    },
    /// rigctld over TCP
    Network {
        /// Host name or address
        host: String,
        /// TCP port
        port: u16,
    },
}

impl Default for RigTransport {
    fn default() -> Self {
        RigTransport::Network {
            host: "localhost".to_string(),
            port: RIGCTLD_PORT,
        }
    }
}

/// Configuration for one radio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RadioConfig {
    /// Rig model id from the model catalog (informational for network rigs)
    pub model: u32,
    /// Transport selection
    pub transport: RigTransport,
    /// Bound on each command round trip in milliseconds
    pub timeout_ms: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            model: 0,
            transport: RigTransport::default(),
            timeout_ms: 1000,
        }
    }
}

impl RadioConfig {
    /// rigctld at `host:port`
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Self {
            transport: RigTransport::Network {
                host: host.into(),
                port,
            },
            ..Default::default()
        }
    }

    /// Kenwood CAT on a serial device
    pub fn serial(device: impl Into<String>, baud: u32) -> Self {
        Self {
            transport: RigTransport::Serial {
                device: device.into(),
                baud,
            },
            ..Default::default()
        }
    }

    /// Command timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the two-radio link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RadioLinkConfig {
    /// Per-radio settings; `None` leaves that radio unused
    pub radios: [Option<RadioConfig>; 2],
    /// Drain tick interval in milliseconds
    pub tick_ms: u64,
    /// Poll radio status every this many ticks (0 disables polling)
    pub poll_every: u32,
}

impl Default for RadioLinkConfig {
    fn default() -> Self {
        Self {
            radios: [None, None],
            tick_ms: DEFAULT_TICK_MS,
            poll_every: 10,
        }
    }
}

impl RadioLinkConfig {
    /// Settings for `radio`, if configured
    pub fn radio(&self, radio: Radio) -> Option<&RadioConfig> {
        self.radios[radio.index()].as_ref()
    }

    /// Drain tick interval
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
