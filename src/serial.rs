use std::fmt;
use std::str::FromStr;

/// Length of a well-formed canonical serial: 2 tag characters + 12 digits.
pub const SERIAL_LEN: usize = 14;
const TAG_LEN: usize = 2;
const GROUP_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerialError {
    #[error("serial is empty")]
    Empty,
    #[error("serial {0:?} should be 14 characters long")]
    Length(String),
    #[error("bad serial {0:?}: digit groups must be numeric")]
    Digits(String),
}

/// Canonical serial: lower-case, no separators, no surrounding whitespace.
///
/// This is the only form used as a store key. Use [`prettify`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(String);

impl Serial {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form `XX-NNNN-NNNN-NNNN`.
    pub fn pretty(&self) -> Result<String, SerialError> {
        prettify(&self.0)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Serial {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Lower-case, drop `-` separators, trim surrounding whitespace.
pub fn normalize(input: &str) -> Result<Serial, SerialError> {
    let canonical = input.to_lowercase().replace('-', "");
    let canonical = canonical.trim();
    if canonical.is_empty() {
        return Err(SerialError::Empty);
    }
    Ok(Serial(canonical.to_string()))
}

/// Render any accepted serial input as `TAG-NNNN-NNNN-NNNN`.
///
/// Each digit group goes through an integer parse and is re-padded to four
/// digits, so the output is always canonical even for odd-looking input.
pub fn prettify(input: &str) -> Result<String, SerialError> {
    let serial = normalize(input)?;
    let chars: Vec<char> = serial.as_str().chars().collect();
    if chars.len() != SERIAL_LEN {
        return Err(SerialError::Length(serial.0));
    }

    let tag: String = chars[..TAG_LEN].iter().collect::<String>().to_uppercase();
    let mut groups = Vec::with_capacity(3);
    for group in chars[TAG_LEN..].chunks(GROUP_LEN) {
        if !group.iter().all(|c| c.is_ascii_digit()) {
            return Err(SerialError::Digits(serial.0));
        }
        let value: u16 = group
            .iter()
            .collect::<String>()
            .parse()
            .map_err(|_| SerialError::Digits(serial.0.clone()))?;
        groups.push(format!("{value:04}"));
    }

    Ok(format!("{tag}-{}", groups.join("-")))
}
