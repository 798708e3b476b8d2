//! Virtual keyer simulation
//!
//! Parses host commands with the same codec a traffic monitor would use and
//! answers the way WinKeyer firmware does: the echo test byte comes back
//! verbatim, host open answers with the firmware version, and text can be
//! echoed framed by busy/idle status bytes.

use serde::{Deserialize, Serialize};
use so2_protocol::keyer::{PORT_KEY1, PORT_KEY2};
use so2_protocol::{HostCodec, KeyerCommand, KeyerStatus, ProtocolCodec, Radio};
use tracing::debug;

/// Behaviour of a virtual keyer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VirtualKeyerConfig {
    /// Firmware version reported on host open
    pub version: u8,
    /// Answer the echo test
    pub answer_echo: bool,
    /// Answer host open with the version
    pub answer_version: bool,
    /// Echo text back framed by busy and idle status bytes
    pub echo_text: bool,
}

impl Default for VirtualKeyerConfig {
    fn default() -> Self {
        Self {
            version: 31,
            answer_echo: true,
            answer_version: true,
            echo_text: false,
        }
    }
}

impl VirtualKeyerConfig {
    /// A keyer that never answers anything
    pub fn silent() -> Self {
        Self {
            answer_echo: false,
            answer_version: false,
            ..Default::default()
        }
    }

    /// A keyer that passes the echo test but never reports a version
    pub fn no_version() -> Self {
        Self {
            answer_version: false,
            ..Default::default()
        }
    }
}

/// A simulated WinKeyer-compatible keyer
#[derive(Debug)]
pub struct VirtualKeyer {
    config: VirtualKeyerConfig,
    codec: HostCodec,
    received: Vec<KeyerCommand>,
    host_open: bool,
    speed_wpm: u8,
    port_bits: u8,
}

impl VirtualKeyer {
    /// Create a keyer with the given behaviour
    pub fn new(config: VirtualKeyerConfig) -> Self {
        Self {
            config,
            codec: HostCodec::new(),
            received: Vec::new(),
            host_open: false,
            speed_wpm: 0,
            port_bits: 0,
        }
    }

    /// Feed bytes from the host; returns the bytes the keyer sends back
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        self.codec.push_bytes(data);

        let mut reply = Vec::new();
        while let Some(cmd) = self.codec.next_command() {
            debug!("Virtual keyer received {:?}", cmd);
            match &cmd {
                KeyerCommand::EchoTest(b) if self.config.answer_echo => reply.push(*b),
                KeyerCommand::HostOpen => {
                    self.host_open = true;
                    if self.config.answer_version {
                        reply.push(self.config.version);
                    }
                }
                KeyerCommand::HostClose => self.host_open = false,
                KeyerCommand::SetSpeed(wpm) => self.speed_wpm = *wpm,
                KeyerCommand::SetPort(bits) => self.port_bits = *bits,
                KeyerCommand::Char(c) if self.host_open && self.config.echo_text => {
                    reply.push(Self::status(true));
                    reply.push(*c);
                    reply.push(Self::status(false));
                }
                _ => {}
            }
            self.received.push(cmd);
        }
        reply
    }

    /// Status byte as the keyer would send it
    pub fn status(busy: bool) -> u8 {
        KeyerStatus {
            busy,
            ..Default::default()
        }
        .to_byte()
    }

    /// Every command received so far, in order
    pub fn received(&self) -> &[KeyerCommand] {
        &self.received
    }

    /// Whether the host has opened the keyer
    pub fn host_open(&self) -> bool {
        self.host_open
    }

    /// Last speed set by the host
    pub fn speed_wpm(&self) -> u8 {
        self.speed_wpm
    }

    /// Radio currently keyed by the output port, if any
    pub fn keyed_radio(&self) -> Option<Radio> {
        if self.port_bits & PORT_KEY2 != 0 {
            Some(Radio::B)
        } else if self.port_bits & PORT_KEY1 != 0 {
            Some(Radio::A)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_replies() {
        let mut keyer = VirtualKeyer::new(VirtualKeyerConfig::default());

        assert!(keyer.process(&[0x13, 0x13, 0x13]).is_empty());
        assert_eq!(keyer.process(&[0x00, 0x04, 0x55]), vec![0x55]);
        assert_eq!(keyer.process(&[0x00, 0x02]), vec![31]);
        assert!(keyer.host_open());
    }

    #[test]
    fn test_silent() {
        let mut keyer = VirtualKeyer::new(VirtualKeyerConfig::silent());
        assert!(keyer.process(&[0x00, 0x04, 0x55, 0x00, 0x02]).is_empty());
        assert_eq!(keyer.received().len(), 2);
    }

    #[test]
    fn test_split_commands() {
        let mut keyer = VirtualKeyer::new(VirtualKeyerConfig::default());
        keyer.process(&[0x02]);
        assert_eq!(keyer.speed_wpm(), 0);
        keyer.process(&[35, 0x09, 0x0b]);
        assert_eq!(keyer.speed_wpm(), 35);
        assert_eq!(keyer.keyed_radio(), Some(Radio::B));
    }

    #[test]
    fn test_text_echo() {
        let mut keyer = VirtualKeyer::new(VirtualKeyerConfig {
            echo_text: true,
            ..Default::default()
        });
        keyer.process(&[0x00, 0x02]);
        assert_eq!(keyer.process(b"K"), vec![0xc4, b'K', 0xc0]);
    }
}
