//! Structured value serialization formats

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Result, ShmError};

/// Wire format for serialized blocks.
///
/// `Json` never emits a raw zero byte, so it is safe in terminated blocks.
/// Every JSON payload is wrapped in a one-element array so that it carries its
/// own end marker and fixed-length padding after it is never parsed.
/// `Bincode` is compact but length-prefixed with zero-padded integers; use it
/// with fixed-length blocks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerialFormat {
    Json,
    Bincode,
}

impl Default for SerialFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl SerialFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SerialFormat::Json => "json",
            SerialFormat::Bincode => "bincode",
        }
    }

    /// Whether encoded output can contain a zero byte
    pub fn may_emit_zero(&self) -> bool {
        matches!(self, SerialFormat::Bincode)
    }

    /// Serialize a value to bytes
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            SerialFormat::Json => serde_json::to_vec(&(value,))
                .map_err(|e| ShmError::serialization(format!("JSON error: {}", e))),
            SerialFormat::Bincode => bincode::serialize(value)
                .map_err(|e| ShmError::serialization(format!("Bincode error: {}", e))),
        }
    }

    /// Deserialize the first value in `bytes`. Trailing bytes (fill padding,
    /// zero bytes or stale content in fixed-length blocks) are ignored.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            SerialFormat::Json => serde_json::Deserializer::from_slice(bytes)
                .into_iter::<(T,)>()
                .next()
                .ok_or_else(|| ShmError::decode("JSON error: no value in payload"))?
                .map(|(value,)| value)
                .map_err(ShmError::from),
            SerialFormat::Bincode => bincode::deserialize(bytes).map_err(ShmError::from),
        }
    }
}
