//! Slot identifiers
//!
//! Inputs and outputs are fixed-size, enum-indexed. String and numeric ids
//! coming from the wire are validated here, at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MixError, Result};

/// Number of input slots
pub const INPUT_SLOT_COUNT: usize = 4;

/// Number of output slots
pub const OUTPUT_SLOT_COUNT: usize = 2;

/// One of the four input positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputSlot {
    One,
    Two,
    Three,
    Four,
}

impl InputSlot {
    pub const ALL: [InputSlot; INPUT_SLOT_COUNT] =
        [InputSlot::One, InputSlot::Two, InputSlot::Three, InputSlot::Four];

    /// Zero-based array index
    pub fn index(self) -> usize {
        match self {
            InputSlot::One => 0,
            InputSlot::Two => 1,
            InputSlot::Three => 2,
            InputSlot::Four => 3,
        }
    }

    /// Wire id, `1` through `4`
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl TryFrom<u8> for InputSlot {
    type Error = MixError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(InputSlot::One),
            2 => Ok(InputSlot::Two),
            3 => Ok(InputSlot::Three),
            4 => Ok(InputSlot::Four),
            other => Err(MixError::InvalidSlot {
                slot: other.to_string(),
            }),
        }
    }
}

impl FromStr for InputSlot {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(|n| InputSlot::try_from(n).ok())
            .ok_or_else(|| MixError::InvalidSlot {
                slot: s.to_string(),
            })
    }
}

impl TryFrom<String> for InputSlot {
    type Error = MixError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InputSlot> for String {
    fn from(slot: InputSlot) -> Self {
        slot.to_string()
    }
}

impl fmt::Display for InputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One of the two output positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputSlot {
    #[default]
    First,
    Second,
}

impl OutputSlot {
    pub const ALL: [OutputSlot; OUTPUT_SLOT_COUNT] = [OutputSlot::First, OutputSlot::Second];

    pub fn index(self) -> usize {
        match self {
            OutputSlot::First => 0,
            OutputSlot::Second => 1,
        }
    }

    /// Port number used by `target_output`
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Registry key, `output_1` or `output_2`
    pub fn key(self) -> &'static str {
        match self {
            OutputSlot::First => "output_1",
            OutputSlot::Second => "output_2",
        }
    }
}

impl TryFrom<u8> for OutputSlot {
    type Error = MixError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(OutputSlot::First),
            2 => Ok(OutputSlot::Second),
            other => Err(MixError::InvalidOutputKey {
                key: other.to_string(),
            }),
        }
    }
}

impl FromStr for OutputSlot {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "output_1" => Ok(OutputSlot::First),
            "output_2" => Ok(OutputSlot::Second),
            other => Err(MixError::InvalidOutputKey {
                key: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for OutputSlot {
    type Error = MixError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OutputSlot> for String {
    fn from(slot: OutputSlot) -> Self {
        slot.key().to_string()
    }
}

impl fmt::Display for OutputSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1", InputSlot::One)]
    #[test_case("2", InputSlot::Two)]
    #[test_case(" 3 ", InputSlot::Three)]
    #[test_case("4", InputSlot::Four)]
    fn test_parse_input_slot(input: &str, expected: InputSlot) {
        assert_eq!(input.parse::<InputSlot>().unwrap(), expected);
    }

    #[test_case("0")]
    #[test_case("5")]
    #[test_case("one")]
    #[test_case("")]
    fn test_reject_input_slot(input: &str) {
        let err = input.parse::<InputSlot>().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SLOT");
    }

    #[test]
    fn test_output_slot_keys() {
        assert_eq!("output_2".parse::<OutputSlot>().unwrap(), OutputSlot::Second);
        assert_eq!(OutputSlot::try_from(1).unwrap(), OutputSlot::First);
        assert!(matches!(
            "output_3".parse::<OutputSlot>(),
            Err(MixError::InvalidOutputKey { .. })
        ));
        assert!(OutputSlot::try_from(3).is_err());
    }

    #[test]
    fn test_slot_serde_uses_wire_ids() {
        let json = serde_json::to_string(&(InputSlot::Three, OutputSlot::Second)).unwrap();
        assert_eq!(json, r#"["3","output_2"]"#);
        let back: (InputSlot, OutputSlot) = serde_json::from_str(&json).unwrap();
        assert_eq!(back, (InputSlot::Three, OutputSlot::Second));
    }
}
