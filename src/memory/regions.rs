//! File-backed mapped region

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;
use memmap2::{MmapMut, MmapOptions};

use crate::error::{Result, ShmError};

/// Location of a backing file: `<base>/<segment>/<file_name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingPath {
    pub base: PathBuf,
    pub segment: String,
    pub file_name: String,
}

impl BackingPath {
    pub fn new(base: impl Into<PathBuf>, segment: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            segment: segment.into(),
            file_name: file_name.into(),
        }
    }

    /// Directory holding the backing file. A leading `/` on the segment is
    /// treated as relative to the base.
    pub fn directory(&self) -> PathBuf {
        let segment = self.segment.trim_start_matches('/');
        if segment.is_empty() {
            self.base.clone()
        } else {
            self.base.join(segment)
        }
    }

    /// Full path of the backing file
    pub fn file(&self) -> PathBuf {
        self.directory().join(&self.file_name)
    }
}

/// A memory-mapped backing file
#[derive(Debug)]
pub struct MappedRegion {
    path: PathBuf,
    mmap: MmapMut,
}

impl MappedRegion {
    /// Create the directory and file if needed, then map the whole file.
    ///
    /// A new file is seeded with `default_value`. The file is grown with zero
    /// bytes to at least `min_len`; existing content is never truncated.
    pub fn open_or_create(location: &BackingPath, default_value: &[u8], min_len: usize) -> Result<Self> {
        if location.file_name.is_empty() {
            return Err(ShmError::creation_msg("backing file name cannot be empty"));
        }

        let directory = location.directory();
        fs::create_dir_all(&directory)
            .map_err(|e| ShmError::creation(e, &format!("Failed to create {}", directory.display())))?;

        let path = location.file();
        Self::seed_file(&path, default_value)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| ShmError::creation(e, &format!("Failed to open {}", path.display())))?;

        let current_len = file
            .metadata()
            .map_err(|e| ShmError::creation(e, "Failed to stat backing file"))?
            .len();
        if current_len < min_len as u64 {
            debug!(
                "growing {} from {} to {} bytes",
                path.display(),
                current_len,
                min_len
            );
            file.set_len(min_len as u64)
                .map_err(|e| ShmError::creation(e, "Failed to set backing file size"))?;
        }

        let len = usize::try_from(current_len.max(min_len as u64))
            .map_err(|_| ShmError::creation_msg("backing file too large to map"))?;
        if len == 0 {
            return Err(ShmError::creation_msg(format!(
                "backing file {} is empty",
                path.display()
            )));
        }

        // SAFETY: the file stays open for the mapping's lifetime via memmap2.
        // Concurrent modification by cooperating processes is the point of the
        // mapping; callers sequence access externally.
        let mmap = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|e| ShmError::creation(e, "Failed to create memory mapping"))?;

        debug!("mapped {} ({} bytes)", path.display(), len);
        Ok(Self { path, mmap })
    }

    /// Write the default value into a file that does not exist yet
    fn seed_file(path: &Path, default_value: &[u8]) -> Result<()> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => {
                return Err(ShmError::creation(e, &format!("Failed to create {}", path.display())))
            }
        };
        file.write_all(default_value)
            .map_err(|e| ShmError::creation(e, "Failed to write default value"))?;
        debug!("seeded {} with {} bytes", path.display(), default_value.len());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Flush changes to the backing file
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| ShmError::from_io(e, "Failed to flush memory mapping"))
    }
}
