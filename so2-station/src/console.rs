//! Line-oriented operator commands

use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use so2_protocol::{Passband, Radio, RigMode};

/// One console line, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Open the keyer and every configured radio
    Open,
    /// Close everything
    Close,
    /// Buffer text and send it
    Cw(String),
    /// Abort sending
    Cancel,
    /// Keyer speed in WPM
    Speed(u32),
    /// Route keying to a radio
    Focus(Radio),
    Ptt(Radio, bool),
    /// Absolute frequency in Hz
    Qsy(Radio, u64),
    /// Relative move in Hz
    QsyDelta(Radio, i64),
    Mode(Radio, RigMode, Passband),
    ClearRit(Radio),
    Raw(Radio, String),
    /// Print the state of both radios and the keyer
    Status,
    /// List the model catalog
    Models,
    Help,
    Quit,
}

pub const HELP: &str = "\
open | close | status | models | quit
cw <text> | cancel | speed <wpm> | focus <a|b>
ptt <a|b> <on|off> | qsy <a|b> <hz|+hz|-hz> | mode <a|b> <MODE> [passband]
rit <a|b> | raw <a|b> <text>";

fn radio(word: Option<&str>) -> Result<Radio> {
    match word.map(str::to_ascii_lowercase).as_deref() {
        Some("a") | Some("0") => Ok(Radio::A),
        Some("b") | Some("1") => Ok(Radio::B),
        Some(other) => bail!("unknown radio '{}'", other),
        None => bail!("missing radio"),
    }
}

fn on_off(word: Option<&str>) -> Result<bool> {
    match word.map(str::to_ascii_lowercase).as_deref() {
        Some("on") | Some("1") => Ok(true),
        Some("off") | Some("0") => Ok(false),
        _ => bail!("expected on or off"),
    }
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "open" => ConsoleCommand::Open,
            "close" => ConsoleCommand::Close,
            "cw" if !rest.is_empty() => ConsoleCommand::Cw(rest.to_uppercase()),
            "cw" => bail!("nothing to send"),
            "cancel" => ConsoleCommand::Cancel,
            "speed" => {
                let wpm = args.next().ok_or_else(|| anyhow!("missing speed"))?;
                ConsoleCommand::Speed(wpm.parse()?)
            }
            "focus" => ConsoleCommand::Focus(radio(args.next())?),
            "ptt" => {
                let r = radio(args.next())?;
                ConsoleCommand::Ptt(r, on_off(args.next())?)
            }
            "qsy" => {
                let r = radio(args.next())?;
                let value = args.next().ok_or_else(|| anyhow!("missing frequency"))?;
                if value.starts_with('+') || value.starts_with('-') {
                    ConsoleCommand::QsyDelta(r, value.parse()?)
                } else {
                    ConsoleCommand::Qsy(r, value.parse()?)
                }
            }
            "mode" => {
                let r = radio(args.next())?;
                let mode: RigMode = args.next().ok_or_else(|| anyhow!("missing mode"))?.parse()?;
                let passband = match args.next() {
                    Some(width) => Passband::Hz(width.parse()?),
                    None => Passband::Normal,
                };
                ConsoleCommand::Mode(r, mode, passband)
            }
            "rit" => ConsoleCommand::ClearRit(radio(args.next())?),
            "raw" => {
                let r = radio(args.next())?;
                let text = rest.split_once(' ').map(|(_, t)| t.trim()).unwrap_or("");
                if text.is_empty() {
                    bail!("nothing to send");
                }
                ConsoleCommand::Raw(r, text.to_string())
            }
            "status" => ConsoleCommand::Status,
            "models" => ConsoleCommand::Models,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => bail!("unknown command '{}'", other),
        };
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyer_commands() {
        assert_eq!(
            "cw cq test de w1aw".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Cw("CQ TEST DE W1AW".into())
        );
        assert_eq!("speed 32".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Speed(32));
        assert_eq!(
            "focus B".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Focus(Radio::B)
        );
        assert!("cw".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_radio_commands() {
        assert_eq!(
            "qsy a 14025000".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Qsy(Radio::A, 14_025_000)
        );
        assert_eq!(
            "qsy 1 -500".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::QsyDelta(Radio::B, -500)
        );
        assert_eq!(
            "mode b usb 2400".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Mode(Radio::B, RigMode::Usb, Passband::Hz(2400))
        );
        assert_eq!(
            "ptt a on".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Ptt(Radio::A, true)
        );
        assert_eq!(
            "raw b FA; MD;".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Raw(Radio::B, "FA; MD;".into())
        );
    }

    #[test]
    fn test_bad_input() {
        assert!("qsy c 14000000".parse::<ConsoleCommand>().is_err());
        assert!("mode a banana".parse::<ConsoleCommand>().is_err());
        assert!("ptt a maybe".parse::<ConsoleCommand>().is_err());
        assert!("launch".parse::<ConsoleCommand>().is_err());
    }
}
