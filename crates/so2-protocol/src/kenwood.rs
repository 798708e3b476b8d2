//! Kenwood CAT Protocol
//!
//! The Kenwood protocol uses ASCII semicolon-terminated commands with
//! 2-letter command prefixes. Only the subset the station drives directly
//! over serial is modeled here.
//!
//! # Format
//! - Commands: `XXppppp;` where XX is command code, ppppp is parameters
//! - Responses: Same format as commands
//! - Terminator: `;` (0x3B)
//!
//! # Commands used
//! - `FA` - VFO A frequency
//! - `MD` - Mode
//! - `TX` / `RX` - Transmit / receive
//! - `RC` - RIT clear
//! - `IF` - Information (status)

use tracing::warn;

use crate::error::ParseError;
use crate::mode::RigMode;
use crate::{EncodeCommand, ProtocolCodec};

/// Maximum command length (reasonable limit to prevent buffer overflow)
const MAX_COMMAND_LEN: usize = 64;

/// Kenwood protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KenwoodCommand {
    /// Set/get VFO A frequency: FA00014250000;
    FrequencyA(Option<u64>),
    /// Set/get mode: MD1; (1=LSB, 2=USB, 3=CW, etc.)
    Mode(Option<u8>),
    /// Transmit: TX;
    Transmit,
    /// Receive: RX;
    Receive,
    /// Clear RIT offset: RC;
    RitClear,
    /// Information/status query: IF...;
    Info(Option<KenwoodInfo>),
    /// Unknown/unrecognized command
    Unknown(String),
}

/// Parsed IF (information) response data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KenwoodInfo {
    /// Current frequency in Hz
    pub frequency_hz: u64,
    /// RIT/XIT offset in Hz
    pub rit_offset: i32,
    /// RIT enabled
    pub rit_on: bool,
    /// TX enabled (PTT)
    pub tx: bool,
    /// Operating mode digit
    pub mode: u8,
}

/// Streaming Kenwood protocol codec
#[derive(Debug, Default)]
pub struct KenwoodCodec {
    buffer: Vec<u8>,
}

impl KenwoodCodec {
    /// Create a new Kenwood codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Parse a complete command string (without terminator)
    pub fn parse_command(cmd: &str) -> Result<KenwoodCommand, ParseError> {
        if cmd.len() < 2 || !cmd.is_char_boundary(2) {
            return Err(ParseError::InvalidFrame("command too short".into()));
        }

        let prefix = &cmd[..2];
        let params = &cmd[2..];

        match prefix {
            "FA" => {
                if params.is_empty() {
                    Ok(KenwoodCommand::FrequencyA(None))
                } else {
                    let freq = params
                        .parse::<u64>()
                        .map_err(|_| ParseError::InvalidFrequency(params.into()))?;
                    Ok(KenwoodCommand::FrequencyA(Some(freq)))
                }
            }
            "MD" => {
                if params.is_empty() {
                    Ok(KenwoodCommand::Mode(None))
                } else {
                    let mode = params
                        .parse::<u8>()
                        .map_err(|_| ParseError::InvalidMode(params.into()))?;
                    Ok(KenwoodCommand::Mode(Some(mode)))
                }
            }
            "TX" => Ok(KenwoodCommand::Transmit),
            "RX" => Ok(KenwoodCommand::Receive),
            "RC" => Ok(KenwoodCommand::RitClear),
            "IF" => {
                if params.is_empty() {
                    Ok(KenwoodCommand::Info(None))
                } else {
                    Ok(KenwoodCommand::Info(Some(Self::parse_info(params)?)))
                }
            }
            _ => Ok(KenwoodCommand::Unknown(cmd.to_string())),
        }
    }

    /// Parse IF response parameters
    fn parse_info(params: &str) -> Result<KenwoodInfo, ParseError> {
        // IF response format (TS-2000 style):
        // - 0..11: frequency
        // - 11..16: step size (skipped)
        // - 16..21: signed RIT/XIT offset
        // - 21: RIT on/off
        // - 27: TX status
        // - 28: mode
        if params.len() < 29 || !params.is_ascii() {
            return Err(ParseError::InvalidFrame(format!(
                "IF response too short: {} chars",
                params.len()
            )));
        }

        let frequency_hz = params[0..11]
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidFrequency(params[0..11].into()))?;
        let rit_offset = params[16..21].parse::<i32>().unwrap_or(0);
        let rit_on = &params[21..22] == "1";
        let tx = &params[27..28] != "0";
        let mode = params[28..29].parse::<u8>().unwrap_or(0);

        Ok(KenwoodInfo {
            frequency_hz,
            rit_offset,
            rit_on,
            tx,
            mode,
        })
    }
}

impl ProtocolCodec for KenwoodCodec {
    type Command = KenwoodCommand;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Keep only the tail if a terminator never shows up
        if self.buffer.len() > MAX_COMMAND_LEN * 4 {
            let start = self.buffer.len() - MAX_COMMAND_LEN;
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    fn next_command(&mut self) -> Option<KenwoodCommand> {
        let term_pos = self.buffer.iter().position(|&b| b == b';')?;
        let cmd_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();
        let cmd_str = String::from_utf8_lossy(&cmd_bytes[..cmd_bytes.len() - 1]);

        let cmd = match Self::parse_command(&cmd_str) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("Failed to parse Kenwood command: {}", e);
                KenwoodCommand::Unknown(cmd_str.into_owned())
            }
        };
        Some(cmd)
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl EncodeCommand for KenwoodCommand {
    fn encode(&self) -> Vec<u8> {
        let cmd = match self {
            KenwoodCommand::FrequencyA(Some(hz)) => format!("FA{:011}", hz),
            KenwoodCommand::FrequencyA(None) => "FA".to_string(),
            KenwoodCommand::Mode(Some(m)) => format!("MD{}", m),
            KenwoodCommand::Mode(None) => "MD".to_string(),
            KenwoodCommand::Transmit => "TX".to_string(),
            KenwoodCommand::Receive => "RX".to_string(),
            KenwoodCommand::RitClear => "RC".to_string(),
            KenwoodCommand::Info(_) => "IF".to_string(),
            KenwoodCommand::Unknown(s) => s.clone(),
        };
        format!("{};", cmd).into_bytes()
    }
}

/// Convert a Kenwood mode digit to a rig mode
pub fn kenwood_to_rig_mode(mode: u8) -> RigMode {
    match mode {
        1 => RigMode::Lsb,
        2 => RigMode::Usb,
        3 => RigMode::Cw,
        4 => RigMode::Fm,
        5 => RigMode::Am,
        6 => RigMode::Rtty,
        7 => RigMode::CwR,
        9 => RigMode::RttyR,
        _ => RigMode::None,
    }
}

/// Convert a rig mode to the nearest Kenwood mode digit
///
/// Returns `None` for modes the radio has no equivalent for.
pub fn rig_mode_to_kenwood(mode: RigMode) -> Option<u8> {
    match mode {
        RigMode::Lsb | RigMode::EcssLsb | RigMode::PktLsb => Some(1),
        RigMode::Usb | RigMode::EcssUsb | RigMode::PktUsb => Some(2),
        RigMode::Cw => Some(3),
        RigMode::Fm | RigMode::Wfm | RigMode::PktFm => Some(4),
        RigMode::Am | RigMode::Ams | RigMode::Sam | RigMode::Sal | RigMode::Sah => Some(5),
        RigMode::Rtty => Some(6),
        RigMode::CwR => Some(7),
        RigMode::RttyR => Some(9),
        RigMode::None | RigMode::Fax | RigMode::Dsb => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frequency() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"FA00014250000;");

        let cmd = codec.next_command().unwrap();
        assert_eq!(cmd, KenwoodCommand::FrequencyA(Some(14_250_000)));
    }

    #[test]
    fn test_streaming_parse() {
        let mut codec = KenwoodCodec::new();

        codec.push_bytes(b"FA000142");
        assert!(codec.next_command().is_none());

        codec.push_bytes(b"50000;MD3;");
        assert_eq!(
            codec.next_command(),
            Some(KenwoodCommand::FrequencyA(Some(14_250_000)))
        );
        assert_eq!(codec.next_command(), Some(KenwoodCommand::Mode(Some(3))));
        assert!(codec.next_command().is_none());
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            KenwoodCommand::FrequencyA(Some(7_025_000)).encode(),
            b"FA00007025000;"
        );
        assert_eq!(KenwoodCommand::FrequencyA(None).encode(), b"FA;");
        assert_eq!(KenwoodCommand::Mode(Some(2)).encode(), b"MD2;");
        assert_eq!(KenwoodCommand::Transmit.encode(), b"TX;");
        assert_eq!(KenwoodCommand::Receive.encode(), b"RX;");
        assert_eq!(KenwoodCommand::RitClear.encode(), b"RC;");
    }

    #[test]
    fn test_parse_info() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"IF00014025000     -0120100000030000000;");

        match codec.next_command() {
            Some(KenwoodCommand::Info(Some(info))) => {
                assert_eq!(info.frequency_hz, 14_025_000);
                assert_eq!(info.rit_offset, -120);
                assert!(info.rit_on);
                assert!(!info.tx);
                assert_eq!(info.mode, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_short_info_is_unknown() {
        let mut codec = KenwoodCodec::new();
        codec.push_bytes(b"IF0001;");
        assert!(matches!(
            codec.next_command(),
            Some(KenwoodCommand::Unknown(_))
        ));
    }

    #[test]
    fn test_mode_mapping() {
        assert_eq!(kenwood_to_rig_mode(3), RigMode::Cw);
        assert_eq!(kenwood_to_rig_mode(0), RigMode::None);
        assert_eq!(rig_mode_to_kenwood(RigMode::PktUsb), Some(2));
        assert_eq!(rig_mode_to_kenwood(RigMode::Fax), None);
        for digit in [1, 2, 3, 4, 5, 6, 7, 9] {
            assert_eq!(rig_mode_to_kenwood(kenwood_to_rig_mode(digit)), Some(digit));
        }
    }
}
