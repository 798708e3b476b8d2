//! Rig operating modes and their semantic grouping
//!
//! [`RigMode`] mirrors the raw mode vocabulary of the rig-control layer
//! (one bit per mode, as used by hamlib and rigctld). Contest logic should not
//! care about that vocabulary, so every raw value maps onto a [`ModeGroup`].

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Raw operating mode as reported by the rig-control layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RigMode {
    /// No mode / not yet known
    None,
    /// Amplitude modulation
    Am,
    /// Continuous wave
    Cw,
    /// Upper sideband
    Usb,
    /// Lower sideband
    Lsb,
    /// Radio teletype
    Rtty,
    /// Narrow FM
    Fm,
    /// Wide FM
    Wfm,
    /// CW reverse
    CwR,
    /// RTTY reverse
    RttyR,
    /// AM stereo
    Ams,
    /// Packet on LSB
    PktLsb,
    /// Packet on USB
    PktUsb,
    /// Packet on FM
    PktFm,
    /// Exalted carrier USB
    EcssUsb,
    /// Exalted carrier LSB
    EcssLsb,
    /// Facsimile
    Fax,
    /// Synchronous AM, double sideband
    Sam,
    /// Synchronous AM, lower sideband
    Sal,
    /// Synchronous AM, upper sideband
    Sah,
    /// Double sideband suppressed carrier
    Dsb,
}

/// (mode, raw bit value, rig-control name, short display name)
const MODE_TABLE: [(RigMode, u64, &str, &str); 21] = [
    (RigMode::None, 0, "NONE", "NONE"),
    (RigMode::Am, 1 << 0, "AM", "AM"),
    (RigMode::Cw, 1 << 1, "CW", "CW"),
    (RigMode::Usb, 1 << 2, "USB", "USB"),
    (RigMode::Lsb, 1 << 3, "LSB", "LSB"),
    (RigMode::Rtty, 1 << 4, "RTTY", "RTTY"),
    (RigMode::Fm, 1 << 5, "FM", "FM"),
    (RigMode::Wfm, 1 << 6, "WFM", "WFM"),
    (RigMode::CwR, 1 << 7, "CWR", "CWR"),
    (RigMode::RttyR, 1 << 8, "RTTYR", "RTTYR"),
    (RigMode::Ams, 1 << 9, "AMS", "AMS"),
    (RigMode::PktLsb, 1 << 10, "PKTLSB", "PKT"),
    (RigMode::PktUsb, 1 << 11, "PKTUSB", "PKT"),
    (RigMode::PktFm, 1 << 12, "PKTFM", "PKT"),
    (RigMode::EcssUsb, 1 << 13, "ECSSUSB", "USB"),
    (RigMode::EcssLsb, 1 << 14, "ECSSLSB", "LSB"),
    (RigMode::Fax, 1 << 15, "FAX", "FAX"),
    (RigMode::Sam, 1 << 16, "SAM", "SAM"),
    (RigMode::Sal, 1 << 17, "SAL", "SAL"),
    (RigMode::Sah, 1 << 18, "SAH", "SAH"),
    (RigMode::Dsb, 1 << 19, "DSB", "DSB"),
];

impl RigMode {
    fn entry(self) -> &'static (RigMode, u64, &'static str, &'static str) {
        // The table covers every variant, indexed in declaration order
        &MODE_TABLE[self as usize]
    }

    /// Raw bit value used on the rig-control interface
    pub fn raw(self) -> u64 {
        self.entry().1
    }

    /// Look up a mode by its raw bit value
    pub fn from_raw(raw: u64) -> Option<RigMode> {
        MODE_TABLE
            .iter()
            .find(|(_, value, _, _)| *value == raw)
            .map(|(mode, _, _, _)| *mode)
    }

    /// Name used by the rig-control text protocol (`USB`, `PKTUSB`, ...)
    pub fn name(self) -> &'static str {
        self.entry().2
    }

    /// Short display name; all packet variants show as `PKT`
    pub fn short_name(self) -> &'static str {
        self.entry().3
    }

    /// Semantic group for contest logic
    pub fn group(self) -> ModeGroup {
        match self {
            RigMode::Cw | RigMode::CwR => ModeGroup::Cw,
            RigMode::Usb
            | RigMode::Lsb
            | RigMode::EcssUsb
            | RigMode::EcssLsb
            | RigMode::Am
            | RigMode::Ams
            | RigMode::Sam
            | RigMode::Sal
            | RigMode::Sah
            | RigMode::Dsb => ModeGroup::Phone,
            RigMode::Fm | RigMode::Wfm => ModeGroup::Fm,
            RigMode::Rtty
            | RigMode::RttyR
            | RigMode::PktLsb
            | RigMode::PktUsb
            | RigMode::PktFm
            | RigMode::Fax => ModeGroup::Digital,
            RigMode::None => ModeGroup::Unknown,
        }
    }
}

impl FromStr for RigMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MODE_TABLE
            .iter()
            .find(|(_, _, name, _)| name.eq_ignore_ascii_case(s))
            .map(|(mode, _, _, _)| *mode)
            .ok_or_else(|| ParseError::InvalidMode(s.to_string()))
    }
}

impl fmt::Display for RigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Semantic mode group used by exchange and scoring logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeGroup {
    /// CW and CW reverse
    Cw,
    /// Sideband and AM-family voice
    Phone,
    /// FM voice
    Fm,
    /// RTTY, packet and other data modes
    Digital,
    /// No mode, or a raw value outside the table
    #[default]
    Unknown,
}

impl ModeGroup {
    /// Classify a raw mode value; unmapped values are `Unknown`
    pub fn from_raw(raw: u64) -> ModeGroup {
        RigMode::from_raw(raw)
            .map(RigMode::group)
            .unwrap_or(ModeGroup::Unknown)
    }

    /// Returns whether this group is a voice mode
    pub fn is_voice(self) -> bool {
        matches!(self, ModeGroup::Phone | ModeGroup::Fm)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            ModeGroup::Cw => "CW",
            ModeGroup::Phone => "Phone",
            ModeGroup::Fm => "FM",
            ModeGroup::Digital => "Digital",
            ModeGroup::Unknown => "Unknown",
        }
    }
}

/// Passband (receive filter width) requested with a mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Passband {
    /// Radio's default filter for the mode
    #[default]
    Normal,
    /// Leave the current filter alone
    NoChange,
    /// Explicit width in Hz
    Hz(u32),
}

impl Passband {
    /// Value used by the rig-control text protocol
    pub fn as_rigctl(self) -> i64 {
        match self {
            Passband::Normal => 0,
            Passband::NoChange => -1,
            Passband::Hz(hz) => i64::from(hz),
        }
    }

    /// Parse a rig-control passband value
    pub fn from_rigctl(value: i64) -> Passband {
        match value {
            0 => Passband::Normal,
            v if v < 0 => Passband::NoChange,
            v => Passband::Hz(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }
}
