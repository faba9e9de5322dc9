//! Payload codecs
//!
//! A block either stores text under a [`TextEncoding`] or structured values
//! under a [`SerialFormat`]. The choice is made once when the block is
//! constructed and carried as a [`Codec`].

pub mod serial;
pub mod text;

pub use serial::SerialFormat;
pub use text::TextEncoding;

use crate::error::Result;

/// Encode/decode strategy bound to a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Lossy encode, strict decode
    Text(TextEncoding),
    /// Reversible structured serialization
    Serialized(SerialFormat),
}

impl Codec {
    /// Encode a text payload. Only the serialized path can fail.
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Codec::Text(encoding) => Ok(encoding.encode_lossy(text)),
            Codec::Serialized(format) => format.encode(text),
        }
    }

    /// Decode a text payload
    pub fn decode_text(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Codec::Text(encoding) => encoding.decode(bytes),
            Codec::Serialized(format) => format.decode(bytes),
        }
    }
}
