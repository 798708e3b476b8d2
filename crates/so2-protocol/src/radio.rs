//! Radio addressing
//!
//! The station hard-codes exactly two radios. Everything indexed per radio
//! uses a `[T; 2]` addressed through [`Radio::index`].

use std::fmt;

use crate::error::ParseError;

/// One of the two radios of the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Radio {
    /// First radio (index 0)
    #[default]
    A,
    /// Second radio (index 1)
    B,
}

impl Radio {
    /// Both radios, in index order
    pub const ALL: [Radio; 2] = [Radio::A, Radio::B];

    /// Array index of this radio
    pub fn index(self) -> usize {
        match self {
            Radio::A => 0,
            Radio::B => 1,
        }
    }

    /// The other radio
    pub fn other(self) -> Radio {
        match self {
            Radio::A => Radio::B,
            Radio::B => Radio::A,
        }
    }
}

impl TryFrom<usize> for Radio {
    type Error = ParseError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Radio::A),
            1 => Ok(Radio::B),
            n => Err(ParseError::InvalidRadio(n)),
        }
    }
}

impl fmt::Display for Radio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "radio {}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for radio in Radio::ALL {
            assert_eq!(Radio::try_from(radio.index()), Ok(radio));
        }
        assert_eq!(Radio::try_from(2), Err(ParseError::InvalidRadio(2)));
    }

    #[test]
    fn test_other() {
        assert_eq!(Radio::A.other(), Radio::B);
        assert_eq!(Radio::B.other(), Radio::A);
    }
}
