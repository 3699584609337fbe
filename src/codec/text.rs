//! Text encoding of wire lines.
//!
//! The server negotiates the character set through the `CHARSET` option.
//! Lines are split on the terminator byte before decoding, which is safe for
//! every supported encoding because the terminator is ASCII.
//!
//! # Example
//!
//! ```
//! use epi_client::codec::TextEncoding;
//!
//! let enc = TextEncoding::Latin1;
//! let bytes = enc.encode("Müller").unwrap();
//! assert_eq!(bytes, b"M\xfcller");
//! assert_eq!(enc.decode(&bytes).unwrap(), "Müller");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EpiError, Result};

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    /// ISO-8859-1, the server default.
    #[default]
    #[serde(rename = "iso-8859-1", alias = "ISO-8859-1", alias = "latin1")]
    Latin1,
    /// UTF-8.
    #[serde(rename = "utf-8", alias = "UTF-8", alias = "utf8")]
    Utf8,
    /// 7-bit US-ASCII.
    #[serde(rename = "us-ascii", alias = "US-ASCII", alias = "ascii")]
    Ascii,
}

impl TextEncoding {
    /// Name sent as `CHARSET` option value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Latin1 => "iso-8859-1",
            Self::Utf8 => "utf-8",
            Self::Ascii => "us-ascii",
        }
    }

    /// Encode text to wire bytes.
    ///
    /// # Errors
    ///
    /// Returns an encoding error for characters outside the character set.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => self.encode_single_byte(text, 0xFF),
            Self::Ascii => self.encode_single_byte(text, 0x7F),
        }
    }

    fn encode_single_byte(self, text: &str, max: u32) -> Result<Vec<u8>> {
        text.chars()
            .map(|c| {
                let code = u32::from(c);
                if code <= max {
                    Ok(code as u8)
                } else {
                    Err(EpiError::Encoding(format!(
                        "character {c:?} can't be encoded as {}",
                        self.name()
                    )))
                }
            })
            .collect()
    }

    /// Decode wire bytes to text.
    ///
    /// # Errors
    ///
    /// Returns an encoding error for byte sequences invalid in the character set.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                EpiError::Encoding(format!("received data is not valid utf-8: {e}"))
            }),
            Self::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(EpiError::Encoding(format!(
                        "received byte 0x{:02x} at offset {pos} is not us-ascii",
                        bytes[pos]
                    )));
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = EpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso-8859-1" | "latin1" => Ok(Self::Latin1),
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            other => Err(EpiError::Usage(format!("unsupported encoding {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_round_trip() {
        let enc = TextEncoding::Latin1;
        let text = "Größe|ÄÖÜ";
        assert_eq!(enc.decode(&enc.encode(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn test_latin1_rejects_wide_chars() {
        let err = TextEncoding::Latin1.encode("€").unwrap_err();
        assert!(matches!(err, EpiError::Encoding(_)));
    }

    #[test]
    fn test_ascii() {
        let enc = TextEncoding::Ascii;
        assert_eq!(enc.encode("ACK|1|").unwrap(), b"ACK|1|");
        assert!(enc.encode("ä").is_err());
        assert!(enc.decode(&[0x41, 0xE4]).is_err());
    }

    #[test]
    fn test_utf8() {
        let enc = TextEncoding::Utf8;
        assert_eq!(enc.decode("€".as_bytes()).unwrap(), "€");
        assert!(enc.decode(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(TextEncoding::default(), TextEncoding::Latin1);
        assert_eq!(TextEncoding::Utf8.to_string(), "utf-8");
        assert_eq!("ISO-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let enc: TextEncoding = serde_json::from_str("\"utf-8\"").unwrap();
        assert_eq!(enc, TextEncoding::Utf8);
        assert_eq!(serde_json::to_string(&TextEncoding::Ascii).unwrap(), "\"us-ascii\"");
    }
}
