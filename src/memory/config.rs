//! Configuration types for shared memory blocks

use serde::{Deserialize, Serialize};

use crate::{
    codec::{Codec, SerialFormat, TextEncoding},
    error::{Result, ShmError},
};

/// Framing discipline of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingMode {
    /// Fixed-length slots addressed by character position, no end marker
    FixedLength,
    /// Variable-length records ended by a zero byte
    Terminated,
}

impl Default for FramingMode {
    fn default() -> Self {
        Self::Terminated
    }
}

impl FramingMode {
    pub fn name(&self) -> &'static str {
        match self {
            FramingMode::FixedLength => "fixed-length",
            FramingMode::Terminated => "terminated",
        }
    }
}

/// Configuration for a shared memory block. Fixed once the block is created.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockConfig {
    /// Number of addressable character slots
    pub capacity: usize,
    /// Framing discipline
    pub mode: FramingMode,
    /// Character used to blank a fixed-length block
    pub fill_char: char,
    /// Text encoding used when `serialize` is false
    pub encoding: TextEncoding,
    /// Run values through `format` instead of the text encoding
    pub serialize: bool,
    /// Serialization format used when `serialize` is true
    pub format: SerialFormat,
    /// Free-form label identifying what the block carries
    pub label: String,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            mode: FramingMode::default(),
            fill_char: ' ',
            encoding: TextEncoding::default(),
            serialize: false,
            format: SerialFormat::default(),
            label: String::new(),
        }
    }
}

impl BlockConfig {
    /// Create a configuration with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the framing mode
    pub fn with_mode(mut self, mode: FramingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `with_mode(FramingMode::FixedLength)`
    pub fn fixed_length(self) -> Self {
        self.with_mode(FramingMode::FixedLength)
    }

    pub fn with_fill_char(mut self, fill_char: char) -> Self {
        self.fill_char = fill_char;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the encoding from a label such as `"utf-8"` or `"latin-1"`
    pub fn with_encoding_label(mut self, label: &str) -> Result<Self> {
        self.encoding = label.parse()?;
        Ok(self)
    }

    pub fn with_serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    /// Enable serialization with an explicit format
    pub fn with_format(mut self, format: SerialFormat) -> Self {
        self.serialize = true;
        self.format = format;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Bytes reserved per slot.
    ///
    /// 4 for fixed-length blocks under a multi-byte encoding, 1 otherwise.
    /// Both sides of a channel must agree on this.
    pub fn char_width(&self) -> usize {
        if self.mode == FramingMode::FixedLength && self.encoding.is_multibyte() {
            self.encoding.max_char_width()
        } else {
            1
        }
    }

    /// Total bytes addressable by slots
    pub fn byte_capacity(&self) -> usize {
        self.capacity * self.char_width()
    }

    /// Single-byte encoding of the fill character
    pub fn fill_byte(&self) -> Result<u8> {
        match self.encoding.encode_char(self.fill_char).as_deref() {
            Some([byte]) => Ok(*byte),
            _ => Err(ShmError::invalid_parameter(
                "fill_char",
                format!(
                    "fill character {:?} must encode to a single byte in {}",
                    self.fill_char, self.encoding
                ),
            )),
        }
    }

    /// The codec selected by this configuration
    pub fn codec(&self) -> Codec {
        if self.serialize {
            Codec::Serialized(self.format)
        } else {
            Codec::Text(self.encoding)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ShmError::invalid_parameter(
                "capacity",
                "Block capacity must be greater than 0",
            ));
        }

        if self.capacity.checked_mul(self.char_width()).is_none() {
            return Err(ShmError::invalid_parameter(
                "capacity",
                "Block capacity overflows the address space",
            ));
        }

        self.fill_byte()?;

        Ok(())
    }
}
