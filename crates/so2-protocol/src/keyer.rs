//! WinKeyer-compatible keyer protocol
//!
//! The keyer speaks a binary protocol over a 1200 baud, 8N2 serial link.
//!
//! # Host → keyer
//!
//! Every byte below `0x20` starts a command with a fixed number of argument
//! bytes; bytes from `0x20` upward are text to be sent in Morse. Admin
//! commands start with `0x00` followed by a function byte:
//!
//! - `00 02` host open, `00 03` host close
//! - `00 04 b` echo test: the keyer echoes `b` back
//!
//! Direct commands used by the station: `01` sidetone, `02` speed, `05` speed
//! pot setup, `09` output port (radio select + PTT), `0A` cancel, `0E` paddle
//! options, `13` no-op used for resynchronization.
//!
//! # Keyer → host
//!
//! One byte per message, see [`InboundByte::classify`].

use tracing::trace;

use crate::radio::Radio;
use crate::{EncodeCommand, ProtocolCodec};

/// Admin command prefix
pub const ADMIN: u8 = 0x00;
/// Admin function: host open
pub const ADMIN_HOST_OPEN: u8 = 0x02;
/// Admin function: host close
pub const ADMIN_HOST_CLOSE: u8 = 0x03;
/// Admin function: echo test
pub const ADMIN_ECHO: u8 = 0x04;
/// Byte sent with the echo test and expected back verbatim
pub const ECHO_TEST_BYTE: u8 = 0x55;

/// Sidetone control command
pub const CMD_SIDETONE: u8 = 0x01;
/// Set speed command
pub const CMD_SPEED: u8 = 0x02;
/// Speed pot setup command
pub const CMD_POT_SETUP: u8 = 0x05;
/// Output port (PTT and key line select) command
pub const CMD_PORT: u8 = 0x09;
/// Cancel (clear buffer) command
pub const CMD_CANCEL: u8 = 0x0a;
/// Paddle/keyer options command
pub const CMD_OPTIONS: u8 = 0x0e;
/// No-op, used to resynchronize the command parser
pub const CMD_NULL: u8 = 0x13;

/// Output port bit: PTT enable
pub const PORT_PTT: u8 = 0x01;
/// Output port bit: sidetone enable
pub const PORT_SIDETONE: u8 = 0x02;
/// Output port bit: key output 1 (radio A)
pub const PORT_KEY1: u8 = 0x04;
/// Output port bit: key output 2 (radio B)
pub const PORT_KEY2: u8 = 0x08;

/// Lowest speed the keyer accepts, in WPM
pub const MIN_WPM: u8 = 5;
/// Highest speed the keyer accepts, in WPM
pub const MAX_WPM: u8 = 99;

/// Returns whether `wpm` is a speed the keyer accepts
pub fn speed_in_range(wpm: u32) -> bool {
    (u32::from(MIN_WPM)..=u32::from(MAX_WPM)).contains(&wpm)
}

/// Number of argument bytes following a direct command byte
fn argument_count(code: u8) -> usize {
    match code {
        0x07 | 0x08 | 0x0a | 0x13 | 0x15 | 0x1e | 0x1f => 0,
        0x04 | 0x1b => 2,
        0x05 => 3,
        0x0f => 15,
        0x01..=0x1f => 1,
        _ => 0,
    }
}

/// Number of argument bytes following an admin function byte
fn admin_argument_count(function: u8) -> usize {
    match function {
        0x00 | ADMIN_ECHO => 1,
        _ => 0,
    }
}

/// Paddle mode, bits 5..4 of the options byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaddleMode {
    /// Iambic B
    #[default]
    IambicB,
    /// Iambic A
    IambicA,
    /// Ultimatic
    Ultimatic,
    /// Bug (semi-automatic)
    Bug,
}

impl PaddleMode {
    /// Two-bit code used in the options byte
    pub fn bits(self) -> u8 {
        match self {
            PaddleMode::IambicB => 0,
            PaddleMode::IambicA => 1,
            PaddleMode::Ultimatic => 2,
            PaddleMode::Bug => 3,
        }
    }

    /// Decode the two-bit paddle mode code
    pub fn from_bits(bits: u8) -> PaddleMode {
        match bits & 0x03 {
            0 => PaddleMode::IambicB,
            1 => PaddleMode::IambicA,
            2 => PaddleMode::Ultimatic,
            _ => PaddleMode::Bug,
        }
    }
}

/// Output port selection for one radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSelect(pub Radio);

impl PortSelect {
    /// Port bits: the radio's key line plus PTT and sidetone
    pub fn bits(self) -> u8 {
        let key = match self.0 {
            Radio::A => PORT_KEY1,
            Radio::B => PORT_KEY2,
        };
        key | PORT_PTT | PORT_SIDETONE
    }
}

/// Host → keyer command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyerCommand {
    /// Admin echo test: keyer echoes the byte back
    EchoTest(u8),
    /// Admin host open
    HostOpen,
    /// Admin host close
    HostClose,
    /// Any other admin function
    Admin { function: u8, args: Vec<u8> },
    /// Sidetone control byte
    Sidetone(u8),
    /// Set speed in WPM
    SetSpeed(u8),
    /// Speed pot setup: minimum WPM and range above it
    SpeedPotSetup { min: u8, range: u8 },
    /// Output port bits
    SetPort(u8),
    /// Cancel sending and clear the keyer's buffer
    Cancel,
    /// Paddle/keyer options byte
    Options(u8),
    /// Resync no-op
    Null,
    /// Text character to send in Morse
    Char(u8),
    /// Any other direct command
    Other { code: u8, args: Vec<u8> },
}

impl KeyerCommand {
    /// Sidetone command: bit 7 limits sidetone to paddle keying, the low
    /// nibble selects the tone frequency
    pub fn sidetone(paddle_only: bool, frequency: u8) -> Self {
        let mut bits = frequency & 0x0f;
        if paddle_only {
            bits |= 0x80;
        }
        KeyerCommand::Sidetone(bits)
    }

    /// Options command from contest spacing, paddle swap and paddle mode
    pub fn options(ct_spacing: bool, paddle_swap: bool, mode: PaddleMode) -> Self {
        let mut bits = mode.bits() << 4;
        if ct_spacing {
            bits |= 0x01;
        }
        if paddle_swap {
            bits |= 0x08;
        }
        KeyerCommand::Options(bits)
    }

    /// Output port command selecting `radio` for keying and PTT
    pub fn select_radio(radio: Radio) -> Self {
        KeyerCommand::SetPort(PortSelect(radio).bits())
    }
}

impl EncodeCommand for KeyerCommand {
    fn encode(&self) -> Vec<u8> {
        match self {
            KeyerCommand::EchoTest(b) => vec![ADMIN, ADMIN_ECHO, *b],
            KeyerCommand::HostOpen => vec![ADMIN, ADMIN_HOST_OPEN],
            KeyerCommand::HostClose => vec![ADMIN, ADMIN_HOST_CLOSE],
            KeyerCommand::Admin { function, args } => {
                let mut out = vec![ADMIN, *function];
                out.extend_from_slice(args);
                out
            }
            KeyerCommand::Sidetone(bits) => vec![CMD_SIDETONE, *bits],
            KeyerCommand::SetSpeed(wpm) => vec![CMD_SPEED, *wpm],
            // Trailing byte is only meaningful on first-generation keyers
            KeyerCommand::SpeedPotSetup { min, range } => vec![CMD_POT_SETUP, *min, *range, 0x00],
            KeyerCommand::SetPort(bits) => vec![CMD_PORT, *bits],
            KeyerCommand::Cancel => vec![CMD_CANCEL],
            KeyerCommand::Options(bits) => vec![CMD_OPTIONS, *bits],
            KeyerCommand::Null => vec![CMD_NULL],
            KeyerCommand::Char(c) => vec![*c],
            KeyerCommand::Other { code, args } => {
                let mut out = vec![*code];
                out.extend_from_slice(args);
                out
            }
        }
    }
}

/// Streaming parser for host → keyer traffic
///
/// Used by simulated keyers and traffic logging; the host side never needs to
/// parse its own commands.
#[derive(Debug, Default)]
pub struct HostCodec {
    buffer: Vec<u8>,
}

impl HostCodec {
    /// Create an empty codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Total length of the command at the head of the buffer, if known yet
    fn head_len(&self) -> Option<usize> {
        let code = *self.buffer.first()?;
        if code == ADMIN {
            let function = *self.buffer.get(1)?;
            Some(2 + admin_argument_count(function))
        } else {
            Some(1 + argument_count(code))
        }
    }

    fn decode(frame: &[u8]) -> KeyerCommand {
        match frame {
            [ADMIN, ADMIN_ECHO, b] => KeyerCommand::EchoTest(*b),
            [ADMIN, ADMIN_HOST_OPEN] => KeyerCommand::HostOpen,
            [ADMIN, ADMIN_HOST_CLOSE] => KeyerCommand::HostClose,
            [ADMIN, function, args @ ..] => KeyerCommand::Admin {
                function: *function,
                args: args.to_vec(),
            },
            [CMD_SIDETONE, bits] => KeyerCommand::Sidetone(*bits),
            [CMD_SPEED, wpm] => KeyerCommand::SetSpeed(*wpm),
            [CMD_POT_SETUP, min, range, _] => KeyerCommand::SpeedPotSetup {
                min: *min,
                range: *range,
            },
            [CMD_PORT, bits] => KeyerCommand::SetPort(*bits),
            [CMD_CANCEL] => KeyerCommand::Cancel,
            [CMD_OPTIONS, bits] => KeyerCommand::Options(*bits),
            [CMD_NULL] => KeyerCommand::Null,
            [c] if *c >= 0x20 => KeyerCommand::Char(*c),
            [code, args @ ..] => KeyerCommand::Other {
                code: *code,
                args: args.to_vec(),
            },
            [] => KeyerCommand::Null,
        }
    }
}

impl ProtocolCodec for HostCodec {
    type Command = KeyerCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_command(&mut self) -> Option<KeyerCommand> {
        let len = self.head_len()?;
        if self.buffer.len() < len {
            trace!(
                "Partial keyer command: have {} of {} bytes",
                self.buffer.len(),
                len
            );
            return None;
        }
        let frame: Vec<u8> = self.buffer.drain(..len).collect();
        Some(Self::decode(&frame))
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Decoded keyer status byte (`110xxxxx`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyerStatus {
    /// Input buffer is more than two thirds full
    pub xoff: bool,
    /// Paddle break-in active
    pub break_in: bool,
    /// Keyer is busy sending Morse
    pub busy: bool,
    /// Keydown status (tune)
    pub key_down: bool,
    /// Keyer is waiting for an internal event to finish
    pub wait: bool,
}

impl KeyerStatus {
    /// Decode the low five bits of a status byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            xoff: byte & 0x01 != 0,
            break_in: byte & 0x02 != 0,
            busy: byte & 0x04 != 0,
            key_down: byte & 0x08 != 0,
            wait: byte & 0x10 != 0,
        }
    }

    /// Encode as a status byte
    pub fn to_byte(self) -> u8 {
        let mut byte = 0xc0;
        if self.xoff {
            byte |= 0x01;
        }
        if self.break_in {
            byte |= 0x02;
        }
        if self.busy {
            byte |= 0x04;
        }
        if self.key_down {
            byte |= 0x08;
        }
        if self.wait {
            byte |= 0x10;
        }
        byte
    }
}

/// Classified keyer → host byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundByte {
    /// Status byte (top bits `11`)
    Status(KeyerStatus),
    /// Speed pot reading (top bits `10`), low six bits
    SpeedPot(u8),
    /// Echo of a character the keyer has sent
    Echo(u8),
}

impl InboundByte {
    /// Classify a byte by its two high bits
    ///
    /// Pure: the result depends only on `byte`.
    pub fn classify(byte: u8) -> InboundByte {
        match byte & 0xc0 {
            0xc0 => InboundByte::Status(KeyerStatus::from_byte(byte)),
            0x80 => InboundByte::SpeedPot(byte & 0x3f),
            _ => InboundByte::Echo(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_admin() {
        assert_eq!(KeyerCommand::EchoTest(ECHO_TEST_BYTE).encode(), vec![0x00, 0x04, 0x55]);
        assert_eq!(KeyerCommand::HostOpen.encode(), vec![0x00, 0x02]);
        assert_eq!(KeyerCommand::HostClose.encode(), vec![0x00, 0x03]);
    }

    #[test]
    fn test_encode_direct() {
        assert_eq!(KeyerCommand::Cancel.encode(), vec![0x0a]);
        assert_eq!(KeyerCommand::Null.encode(), vec![0x13]);
        assert_eq!(
            KeyerCommand::SpeedPotSetup { min: 10, range: 80 }.encode(),
            vec![0x05, 10, 80, 0]
        );
    }

    #[test]
    fn test_port_bits() {
        assert_eq!(KeyerCommand::select_radio(Radio::A).encode(), vec![0x09, 0x07]);
        assert_eq!(KeyerCommand::select_radio(Radio::B).encode(), vec![0x09, 0x0b]);
    }

    #[test]
    fn test_sidetone_and_options() {
        assert_eq!(KeyerCommand::sidetone(false, 5), KeyerCommand::Sidetone(0x05));
        assert_eq!(KeyerCommand::sidetone(true, 5), KeyerCommand::Sidetone(0x85));
        assert_eq!(
            KeyerCommand::options(true, true, PaddleMode::Ultimatic),
            KeyerCommand::Options(0x01 | 0x08 | 0x20)
        );
        assert_eq!(
            KeyerCommand::options(false, false, PaddleMode::IambicB),
            KeyerCommand::Options(0)
        );
    }

    #[test]
    fn test_speed_range() {
        assert!(!speed_in_range(4));
        assert!(speed_in_range(5));
        assert!(speed_in_range(99));
        assert!(!speed_in_range(100));
    }

    #[test]
    fn test_streaming_parse() {
        let mut codec = HostCodec::new();

        codec.push_bytes(&[0x00]);
        assert!(codec.next_command().is_none());

        codec.push_bytes(&[0x04]);
        assert!(codec.next_command().is_none());

        codec.push_bytes(&[0x55, 0x02]);
        assert_eq!(codec.next_command(), Some(KeyerCommand::EchoTest(0x55)));
        assert!(codec.next_command().is_none());

        codec.push_bytes(&[30]);
        assert_eq!(codec.next_command(), Some(KeyerCommand::SetSpeed(30)));
    }

    #[test]
    fn test_parse_mixed_stream() {
        let mut codec = HostCodec::new();
        codec.push_bytes(&[0x13, 0x00, 0x02, b'C', b'Q', 0x0a, 0x05, 10, 80, 0, 0x12, 50]);

        assert_eq!(codec.next_command(), Some(KeyerCommand::Null));
        assert_eq!(codec.next_command(), Some(KeyerCommand::HostOpen));
        assert_eq!(codec.next_command(), Some(KeyerCommand::Char(b'C')));
        assert_eq!(codec.next_command(), Some(KeyerCommand::Char(b'Q')));
        assert_eq!(codec.next_command(), Some(KeyerCommand::Cancel));
        assert_eq!(
            codec.next_command(),
            Some(KeyerCommand::SpeedPotSetup { min: 10, range: 80 })
        );
        assert_eq!(
            codec.next_command(),
            Some(KeyerCommand::Other {
                code: 0x12,
                args: vec![50]
            })
        );
        assert_eq!(codec.next_command(), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            InboundByte::classify(0xc4),
            InboundByte::Status(KeyerStatus {
                busy: true,
                ..Default::default()
            })
        );
        assert_eq!(InboundByte::classify(0xc0), InboundByte::Status(KeyerStatus::default()));
        assert_eq!(InboundByte::classify(0x9e), InboundByte::SpeedPot(0x1e));
        assert_eq!(InboundByte::classify(b'T'), InboundByte::Echo(b'T'));
        assert_eq!(InboundByte::classify(0x55), InboundByte::Echo(0x55));
    }

    #[test]
    fn test_status_byte_roundtrip() {
        let status = KeyerStatus {
            busy: true,
            wait: true,
            ..Default::default()
        };
        assert_eq!(status.to_byte(), 0xd4);
        assert_eq!(KeyerStatus::from_byte(0xd4), status);
    }
}
