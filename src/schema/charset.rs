//! Character encodings supported for field names and values
//!
//! Fixed-width fields are measured in bytes, so the encoding decides how many
//! characters fit in a field. Decoding never fails: bytes that are not valid
//! in the configured encoding become U+FFFD.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported character encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Charset {
    /// 7-bit ASCII, one byte per character
    #[default]
    #[serde(rename = "us-ascii")]
    UsAscii,
    /// ISO-8859-1, one byte per character, covers U+0000..=U+00FF
    #[serde(rename = "iso-8859-1")]
    Latin1,
    /// UTF-8, one to four bytes per character
    #[serde(rename = "utf-8")]
    Utf8,
}

impl Charset {
    /// Returns the canonical encoding name
    pub fn name(&self) -> &'static str {
        match self {
            Charset::UsAscii => "us-ascii",
            Charset::Latin1 => "iso-8859-1",
            Charset::Utf8 => "utf-8",
        }
    }

    /// Encode a string, or `None` if a character has no representation.
    pub fn encode(&self, value: &str) -> Option<Vec<u8>> {
        match self {
            Charset::UsAscii => value.is_ascii().then(|| value.as_bytes().to_vec()),
            Charset::Latin1 => value
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect(),
            Charset::Utf8 => Some(value.as_bytes().to_vec()),
        }
    }

    /// Decode bytes, replacing anything unrepresentable with U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::UsAscii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        char::from(b)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
