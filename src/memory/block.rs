//! Framed read/write access to a shared memory block

use std::path::Path;

use log::{debug, trace, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    codec::Codec,
    config::{DEFAULT_BASE_PATH, TERMINATOR},
    error::{Result, ShmError},
};

use super::{
    config::{BlockConfig, FramingMode},
    regions::{BackingPath, MappedRegion},
};

/// Lifecycle of a block relative to its mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Configured, not mapped yet
    Unbound,
    /// Mapped and usable
    Bound,
    /// Mapping released
    Closed,
}

impl BlockState {
    pub fn name(&self) -> &'static str {
        match self {
            BlockState::Unbound => "unbound",
            BlockState::Bound => "bound",
            BlockState::Closed => "closed",
        }
    }
}

/// A shared memory channel endpoint.
///
/// Two processes that create blocks with the same base, segment, file name
/// and configuration see the same bytes. There is no locking; callers must
/// order writes and reads themselves.
#[derive(Debug)]
pub struct SharedMemoryBlock {
    config: BlockConfig,
    codec: Codec,
    char_width: usize,
    fill_byte: u8,
    state: BlockState,
    region: Option<MappedRegion>,
}

impl SharedMemoryBlock {
    /// Build an unbound block from a validated configuration
    pub fn new(config: BlockConfig) -> Result<Self> {
        config.validate()?;
        let fill_byte = config.fill_byte()?;

        if let (FramingMode::Terminated, Codec::Serialized(format)) = (config.mode, config.codec()) {
            if format.may_emit_zero() {
                warn!(
                    "block '{}' uses {} in terminated mode; payloads containing zero bytes will read back truncated",
                    config.label,
                    format.name()
                );
            }
        }

        Ok(Self {
            codec: config.codec(),
            char_width: config.char_width(),
            fill_byte,
            config,
            state: BlockState::Unbound,
            region: None,
        })
    }

    /// Bind the block to `<base>/<segment>/<file_name>`, creating the
    /// directory and seeding a new file with `default_value`.
    pub fn create(
        &mut self,
        base: impl AsRef<Path>,
        segment: &str,
        file_name: &str,
        default_value: impl AsRef<[u8]>,
    ) -> Result<()> {
        if self.state != BlockState::Unbound {
            return Err(ShmError::invalid_state("create", self.state.name()));
        }

        let location = BackingPath::new(base.as_ref(), segment, file_name);
        let region = MappedRegion::open_or_create(
            &location,
            default_value.as_ref(),
            self.config.byte_capacity(),
        )?;

        debug!(
            "bound block '{}' to {} ({}, {} slots x {} bytes)",
            self.config.label,
            region.path().display(),
            self.config.mode.name(),
            self.config.capacity,
            self.char_width
        );

        self.region = Some(region);
        self.state = BlockState::Bound;
        Ok(())
    }

    /// [`create`](Self::create) under the fixed system base directory
    pub fn create_in_default_base(
        &mut self,
        segment: &str,
        file_name: &str,
        default_value: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.create(DEFAULT_BASE_PATH, segment, file_name, default_value)
    }

    /// Read text starting at slot `start`.
    ///
    /// Fixed-length blocks read `count` slots and return the first `count`
    /// characters; terminated blocks ignore `count` and read up to the next
    /// zero byte. An empty span yields an empty string.
    pub fn read(&self, count: usize, start: usize) -> Result<String> {
        let bytes = self.read_span(count, start, "read")?;
        if bytes.is_empty() {
            return Ok(String::new());
        }

        match (self.codec, self.config.mode) {
            (Codec::Text(encoding), FramingMode::FixedLength) => {
                let text = encoding.decode_span(bytes)?;
                Ok(text.chars().take(count).collect())
            }
            (codec, _) => codec.decode_text(bytes),
        }
    }

    /// Read a structured value starting at slot `start`. `None` means the
    /// span was empty.
    pub fn read_value<T: DeserializeOwned>(&self, count: usize, start: usize) -> Result<Option<T>> {
        let format = match self.codec {
            Codec::Serialized(format) => format,
            Codec::Text(_) => return Err(Self::not_serialized("read_value")),
        };

        let bytes = self.read_span(count, start, "read_value")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        format.decode(bytes).map(Some)
    }

    /// Write text at slot `start`. On a serialized block the text is stored
    /// as a serialized string.
    pub fn write(&mut self, text: &str, start: usize) -> Result<()> {
        let bytes = self.codec.encode_text(text)?;
        self.write_bytes(&bytes, start, "write")
    }

    /// Serialize `value` and write it at slot `start`
    pub fn write_value<T: Serialize + ?Sized>(&mut self, value: &T, start: usize) -> Result<()> {
        let bytes = match self.codec {
            Codec::Serialized(format) => format.encode(value)?,
            Codec::Text(_) => return Err(Self::not_serialized("write_value")),
        };
        self.write_bytes(&bytes, start, "write_value")
    }

    /// Blank the block.
    ///
    /// Fixed-length blocks are refilled from the first byte with the fill
    /// character, `start` is ignored. Terminated blocks get a terminator at
    /// slot `start`; at the very end of the mapping there is nothing left to
    /// truncate and the call is a no-op.
    pub fn clear(&mut self, start: usize) -> Result<()> {
        let mode = self.config.mode;
        let byte_capacity = self.config.byte_capacity();
        let fill_byte = self.fill_byte;
        let offset = self.byte_offset(start);
        let region = self.region_mut("clear")?;

        match mode {
            FramingMode::FixedLength => {
                let limit = byte_capacity.min(region.len());
                if byte_capacity > limit {
                    return Err(ShmError::capacity(0, byte_capacity, limit));
                }
                region.as_mut_slice()[..byte_capacity].fill(fill_byte);
                debug!("cleared {} bytes with {:#04x}", byte_capacity, fill_byte);
            }
            FramingMode::Terminated => {
                let offset = offset?;
                if offset > region.len() {
                    return Err(ShmError::capacity(offset, offset, region.len()));
                }
                if offset == region.len() {
                    debug!("clear at end of region ({} bytes), nothing to truncate", offset);
                    return Ok(());
                }
                region.as_mut_slice()[offset] = TERMINATOR;
                debug!("terminated record at byte {}", offset);
            }
        }
        Ok(())
    }

    /// Release the mapping. Every later operation fails with `InvalidState`.
    pub fn close(&mut self) -> Result<()> {
        if self.state != BlockState::Bound {
            return Err(ShmError::invalid_state("close", self.state.name()));
        }
        if let Some(region) = self.region.take() {
            debug!("closing {}", region.path().display());
        }
        self.state = BlockState::Closed;
        Ok(())
    }

    /// Flush written bytes to the backing file
    pub fn flush(&self) -> Result<()> {
        self.region("flush")?.flush()
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.state == BlockState::Bound
    }

    /// Bytes reserved per slot
    pub fn char_width(&self) -> usize {
        self.char_width
    }

    /// Backing file path while bound
    pub fn path(&self) -> Option<&Path> {
        self.region.as_ref().map(MappedRegion::path)
    }

    /// Mapped length in bytes while bound
    pub fn mapped_len(&self) -> Option<usize> {
        self.region.as_ref().map(MappedRegion::len)
    }

    fn not_serialized(operation: &str) -> ShmError {
        ShmError::invalid_parameter(
            "serialize",
            format!("{} requires a block configured with serialization", operation),
        )
    }

    fn region(&self, operation: &'static str) -> Result<&MappedRegion> {
        match (&self.state, &self.region) {
            (BlockState::Bound, Some(region)) => Ok(region),
            (state, _) => Err(ShmError::invalid_state(operation, state.name())),
        }
    }

    fn region_mut(&mut self, operation: &'static str) -> Result<&mut MappedRegion> {
        match (&self.state, &mut self.region) {
            (BlockState::Bound, Some(region)) => Ok(region),
            (state, _) => Err(ShmError::invalid_state(operation, state.name())),
        }
    }

    fn byte_offset(&self, start: usize) -> Result<usize> {
        start
            .checked_mul(self.char_width)
            .ok_or_else(|| ShmError::capacity(usize::MAX, usize::MAX, self.config.byte_capacity()))
    }

    /// Raw payload bytes for a read, excluding any terminator
    fn read_span(&self, count: usize, start: usize, operation: &'static str) -> Result<&[u8]> {
        let region = self.region(operation)?;
        let offset = self.byte_offset(start)?;
        let data = region.as_slice();

        let span = match self.config.mode {
            FramingMode::FixedLength => {
                let limit = self.config.byte_capacity().min(data.len());
                let end = count
                    .checked_mul(self.char_width)
                    .and_then(|len| offset.checked_add(len))
                    .ok_or_else(|| ShmError::capacity(offset, usize::MAX, limit))?;
                if end > limit {
                    return Err(ShmError::capacity(offset, end, limit));
                }
                &data[offset..end]
            }
            FramingMode::Terminated => {
                if offset > data.len() {
                    return Err(ShmError::capacity(offset, offset, data.len()));
                }
                let rest = &data[offset..];
                let len = rest
                    .iter()
                    .position(|&b| b == TERMINATOR)
                    .unwrap_or(rest.len());
                &rest[..len]
            }
        };

        trace!("{} {} bytes at offset {}", operation, span.len(), offset);
        Ok(span)
    }

    /// Bounds-check then copy an encoded payload. Nothing is written on error.
    fn write_bytes(&mut self, bytes: &[u8], start: usize, operation: &'static str) -> Result<()> {
        let mode = self.config.mode;
        let byte_capacity = self.config.byte_capacity();
        let offset = self.byte_offset(start);
        let region = self.region_mut(operation)?;
        let offset = offset?;

        let framed_len = match mode {
            FramingMode::FixedLength => bytes.len(),
            FramingMode::Terminated => bytes.len() + 1,
        };
        let limit = match mode {
            FramingMode::FixedLength => byte_capacity.min(region.len()),
            FramingMode::Terminated => region.len(),
        };
        let end = offset
            .checked_add(framed_len)
            .ok_or_else(|| ShmError::capacity(offset, usize::MAX, limit))?;
        if end > limit {
            return Err(ShmError::capacity(offset, end, limit));
        }

        let target = &mut region.as_mut_slice()[offset..end];
        match mode {
            FramingMode::FixedLength => target.copy_from_slice(bytes),
            FramingMode::Terminated => {
                if bytes.contains(&TERMINATOR) {
                    warn!(
                        "{} payload contains a terminator byte; readers will see it truncated",
                        operation
                    );
                }
                target[..bytes.len()].copy_from_slice(bytes);
                target[bytes.len()] = TERMINATOR;
            }
        }

        trace!("{} {} bytes at offset {}", operation, framed_len, offset);
        Ok(())
    }
}

impl Drop for SharedMemoryBlock {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            warn!(
                "block at {} dropped without close; releasing mapping",
                region.path().display()
            );
        }
    }
}
