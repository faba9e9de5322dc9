//! Shared memory block management and operations

pub mod block;
pub mod config;
pub mod regions;

pub use block::{BlockState, SharedMemoryBlock};
pub use config::{BlockConfig, FramingMode};
pub use regions::{BackingPath, MappedRegion};
