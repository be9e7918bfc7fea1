// medium.rs — SnapshotMedium trait and its file and in-memory backends.
//
// The draft store holds exactly one serialized document. The medium
// underneath only has to provide three things: read what was last written
// (or nothing), replace it atomically, and remove it. The file backend
// writes a temp file in the target directory and renames it over the
// snapshot, so a reader sees either the old or the new snapshot in full.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Raw byte storage for a single draft snapshot.
pub trait SnapshotMedium {
    /// Read the last written snapshot, or `None` if nothing is stored.
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the stored snapshot. Must be atomic per call: on failure the
    /// previous snapshot is left intact.
    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove the stored snapshot. Returns whether anything was removed.
    fn remove(&mut self) -> Result<bool, StoreError>;

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Device-local snapshot file.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl SnapshotMedium for FileMedium {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::IoError {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(|source| StoreError::IoError {
            path: dir.clone(),
            source,
        })?;

        // The temp file is deleted on drop, so an early return below leaves
        // nothing behind and the old snapshot untouched.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| StoreError::IoError {
            path: dir.clone(),
            source,
        })?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| StoreError::IoError {
                path: tmp.path().to_path_buf(),
                source,
            })?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::IoError {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }

    fn remove(&mut self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::IoError {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process snapshot slot. Useful for tests and for embedding the engine
/// where another layer owns durability.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    slot: Option<Vec<u8>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that already holds `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Some(bytes.into()),
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.slot.as_deref()
    }
}

impl SnapshotMedium for MemoryMedium {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.slot.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.slot = Some(bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self) -> Result<bool, StoreError> {
        Ok(self.slot.take().is_some())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
