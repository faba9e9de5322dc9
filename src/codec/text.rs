//! Text encodings understood by a block

use std::{fmt, str::FromStr};

use crate::error::{Result, ShmError};

/// Substitute written for characters an encoding cannot represent
pub const REPLACEMENT_BYTE: u8 = b'?';

/// Text encoding used when a block is not serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// Variable width, 1 to 4 bytes per character
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// ISO-8859-1, one byte per code point below U+0100
    Latin1,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::Utf8
    }
}

impl TextEncoding {
    /// Canonical label
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Whether a single character may take more than one byte
    pub fn is_multibyte(&self) -> bool {
        matches!(self, TextEncoding::Utf8)
    }

    /// Largest number of bytes one character can occupy
    pub fn max_char_width(&self) -> usize {
        match self {
            TextEncoding::Utf8 => crate::config::MULTIBYTE_SLOT_WIDTH,
            TextEncoding::Ascii | TextEncoding::Latin1 => 1,
        }
    }

    /// Encode text, substituting `?` for unrepresentable characters. Never fails.
    pub fn encode_lossy(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT_BYTE })
                .collect(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT_BYTE))
                .collect(),
        }
    }

    /// Encode a single character, or `None` if it is not representable
    pub fn encode_char(&self, c: char) -> Option<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => {
                let mut buf = [0u8; 4];
                Some(c.encode_utf8(&mut buf).as_bytes().to_vec())
            }
            TextEncoding::Ascii => c.is_ascii().then(|| vec![c as u8]),
            TextEncoding::Latin1 => u8::try_from(u32::from(c)).ok().map(|b| vec![b]),
        }
    }

    /// Strict decode; any invalid byte sequence is an error
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| ShmError::encoding(format!("invalid utf-8: {}", e))),
            TextEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(ShmError::encoding(format!(
                    "byte {:#04x} at position {} is not ascii",
                    bytes[pos], pos
                ))),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Strict decode that tolerates a multi-byte character cut off by the end
    /// of `bytes`; the partial character is dropped.
    pub fn decode_span(&self, bytes: &[u8]) -> Result<String> {
        if let TextEncoding::Utf8 = self {
            if let Err(e) = std::str::from_utf8(bytes) {
                if e.error_len().is_none() {
                    return self.decode(&bytes[..e.valid_up_to()]);
                }
            }
        }
        self.decode(bytes)
    }
}

impl FromStr for TextEncoding {
    type Err = ShmError;

    fn from_str(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(ShmError::invalid_parameter(
                "encoding",
                format!("unsupported encoding '{}'", label),
            )),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
