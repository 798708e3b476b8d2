//! rigctld network protocol
//!
//! Line-oriented text protocol spoken by a rig-control daemon over TCP. Each
//! command is one line; set commands answer `RPRT n` (0 on success, negative
//! error codes otherwise), get commands answer one value per line or an
//! `RPRT n` error line instead.
//!
//! # Commands used
//! - `F hz` / `f` - frequency
//! - `M MODE pb` / `m` - mode and passband
//! - `T 0|1` / `t` - PTT
//! - `J offset` - RIT offset (`J 0` clears it)
//! - `w raw` - send a raw command string to the radio

use crate::error::{ParseError, ProtocolError};
use crate::mode::{Passband, RigMode};
use crate::EncodeCommand;

/// Default rigctld TCP port
pub const RIGCTLD_PORT: u16 = 4532;

/// Command sent to rigctld
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigctlCommand {
    /// Set frequency in Hz
    SetFrequency(u64),
    /// Query frequency
    GetFrequency,
    /// Set mode and passband
    SetMode { mode: RigMode, passband: Passband },
    /// Query mode and passband
    GetMode,
    /// Key or unkey the transmitter
    SetPtt(bool),
    /// Query PTT
    GetPtt,
    /// Set RIT offset in Hz
    SetRit(i32),
    /// Pass a raw command string through to the radio
    SendRaw(String),
}

impl RigctlCommand {
    /// Number of reply lines a successful answer carries
    pub fn reply_lines(&self) -> usize {
        match self {
            RigctlCommand::GetMode => 2,
            _ => 1,
        }
    }

    /// Returns whether the command only reports a status code
    pub fn is_set(&self) -> bool {
        !matches!(
            self,
            RigctlCommand::GetFrequency | RigctlCommand::GetMode | RigctlCommand::GetPtt
        )
    }
}

impl EncodeCommand for RigctlCommand {
    fn encode(&self) -> Vec<u8> {
        let line = match self {
            RigctlCommand::SetFrequency(hz) => format!("F {}", hz),
            RigctlCommand::GetFrequency => "f".to_string(),
            RigctlCommand::SetMode { mode, passband } => {
                format!("M {} {}", mode.name(), passband.as_rigctl())
            }
            RigctlCommand::GetMode => "m".to_string(),
            RigctlCommand::SetPtt(on) => format!("T {}", u8::from(*on)),
            RigctlCommand::GetPtt => "t".to_string(),
            RigctlCommand::SetRit(hz) => format!("J {}", hz),
            RigctlCommand::SendRaw(raw) => format!("w {}", raw),
        };
        format!("{}\n", line).into_bytes()
    }
}

/// Status code carried by an `RPRT n` line, if the line is one
pub fn report_code(line: &str) -> Option<i32> {
    line.trim().strip_prefix("RPRT")?.trim().parse().ok()
}

/// Check an `RPRT n` line, turning negative codes into an error
pub fn check_report(line: &str) -> Result<(), ProtocolError> {
    match report_code(line) {
        Some(0) => Ok(()),
        Some(code) if code > 0 => Ok(()),
        Some(code) => Err(ProtocolError::Rejected(format!("RPRT {}", code))),
        None => Err(ProtocolError::InvalidResponse(line.trim().to_string())),
    }
}

/// Parse a frequency reply line
///
/// Some daemons print a fractional part; it is truncated to whole Hz.
pub fn parse_frequency(line: &str) -> Result<u64, ProtocolError> {
    reject_report(line)?;
    let text = line.trim();
    if let Ok(hz) = text.parse::<u64>() {
        return Ok(hz);
    }
    match text.parse::<f64>() {
        Ok(hz) if hz.is_finite() && hz >= 0.0 => Ok(hz as u64),
        _ => Err(ParseError::InvalidFrequency(text.to_string()).into()),
    }
}

/// Parse the two reply lines of a mode query
pub fn parse_mode(mode_line: &str, passband_line: &str) -> Result<(RigMode, Passband), ProtocolError> {
    reject_report(mode_line)?;
    let mode = mode_line.parse::<RigMode>()?;
    let passband = passband_line
        .trim()
        .parse::<i64>()
        .map(Passband::from_rigctl)
        .map_err(|_| ParseError::InvalidFrame(passband_line.trim().to_string()))?;
    Ok((mode, passband))
}

/// Parse a PTT reply line
pub fn parse_ptt(line: &str) -> Result<bool, ProtocolError> {
    reject_report(line)?;
    match line.trim() {
        "0" => Ok(false),
        "1" | "2" | "3" => Ok(true),
        other => Err(ParseError::InvalidFrame(other.to_string()).into()),
    }
}

fn reject_report(line: &str) -> Result<(), ProtocolError> {
    match report_code(line) {
        Some(code) => Err(ProtocolError::Rejected(format!("RPRT {}", code))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(RigctlCommand::SetFrequency(14_025_000).encode(), b"F 14025000\n");
        assert_eq!(RigctlCommand::GetFrequency.encode(), b"f\n");
        assert_eq!(
            RigctlCommand::SetMode {
                mode: RigMode::Cw,
                passband: Passband::Hz(500)
            }
            .encode(),
            b"M CW 500\n"
        );
        assert_eq!(
            RigctlCommand::SetMode {
                mode: RigMode::PktUsb,
                passband: Passband::NoChange
            }
            .encode(),
            b"M PKTUSB -1\n"
        );
        assert_eq!(RigctlCommand::SetPtt(true).encode(), b"T 1\n");
        assert_eq!(RigctlCommand::SetRit(0).encode(), b"J 0\n");
        assert_eq!(RigctlCommand::SendRaw("FA;".into()).encode(), b"w FA;\n");
    }

    #[test]
    fn test_reports() {
        assert_eq!(report_code("RPRT 0\n"), Some(0));
        assert_eq!(report_code("RPRT -8"), Some(-8));
        assert_eq!(report_code("14025000"), None);

        assert!(check_report("RPRT 0").is_ok());
        assert!(matches!(
            check_report("RPRT -1"),
            Err(ProtocolError::Rejected(_))
        ));
        assert!(matches!(
            check_report("garbage"),
            Err(ProtocolError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_frequency("14025000\n"), Ok(14_025_000));
        assert_eq!(parse_frequency("7025000.000000"), Ok(7_025_000));
        assert!(parse_frequency("RPRT -11").is_err());
        assert!(parse_frequency("abc").is_err());

        assert_eq!(
            parse_mode("USB\n", "2400\n"),
            Ok((RigMode::Usb, Passband::Hz(2400)))
        );
        assert!(parse_mode("SSB", "0").is_err());

        assert_eq!(parse_ptt("0"), Ok(false));
        assert_eq!(parse_ptt("1\n"), Ok(true));
        assert!(parse_ptt("x").is_err());
    }

    #[test]
    fn test_reply_shape() {
        assert_eq!(RigctlCommand::GetMode.reply_lines(), 2);
        assert_eq!(RigctlCommand::GetFrequency.reply_lines(), 1);
        assert!(RigctlCommand::SetPtt(false).is_set());
        assert!(!RigctlCommand::GetPtt.is_set());
    }
}
