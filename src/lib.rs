//! # shmblock - Framed exchange through a shared memory block
//!
//! A [`SharedMemoryBlock`] maps a file at a well-known location so that two
//! independent processes can pass text or structured values to each other.
//! Each block uses one of two framing disciplines:
//!
//! - **Fixed-length**: `capacity` slots addressed by character position. Under
//!   UTF-8 every slot reserves 4 bytes so any character fits at a stable offset.
//! - **Terminated**: variable-length records ended by a single `0x00` byte.
//!
//! Values go through either a text encoding (lossy encode, strict decode) or a
//! serialization format, chosen once when the block is configured.
//!
//! ```text
//!  process A                 <base>/<segment>/<file>               process B
//! ┌──────────┐  write   ┌───────────────────────────────┐  read  ┌──────────┐
//! │  block   │ ───────► │ h e l l o \0 . . . . . . . .  │ ─────► │  block   │
//! └──────────┘          └───────────────────────────────┘        └──────────┘
//! ```
//!
//! There is no locking or handshake. Whoever coordinates the two processes
//! must make sure a reader only looks after the writer is done.

pub mod codec;
pub mod error;
pub mod memory;

pub use codec::{Codec, SerialFormat, TextEncoding};
pub use error::{Result, ShmError};
pub use memory::{BackingPath, BlockConfig, BlockState, FramingMode, MappedRegion, SharedMemoryBlock};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants shared by every process using a block
pub mod config {
    /// Base directory for backing files
    pub const DEFAULT_BASE_PATH: &str = "/run/obmc/sharememory";

    /// Content written into a newly created backing file
    pub const DEFAULT_VALUE: &str = "00000000";

    /// End-of-record marker in terminated blocks
    pub const TERMINATOR: u8 = 0x00;

    /// Bytes per slot in fixed-length blocks under a multi-byte encoding
    pub const MULTIBYTE_SLOT_WIDTH: usize = 4;
}
