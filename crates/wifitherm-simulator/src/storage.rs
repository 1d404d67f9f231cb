use std::io::ErrorKind;
use std::path::PathBuf;

use log::error;
use wifitherm_core::config::{ConfigStorage, StorageError};

/// The configuration record as a file on the host.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStorage for FileStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!("Reading {} failed: {}", self.path.display(), e);
                return Err(StorageError::Io { operation: "read" });
            }
        };

        if bytes.len() > buf.len() {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: buf.len(),
            });
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(Some(bytes.len()))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        std::fs::write(&self.path, bytes).map_err(|e| {
            error!("Writing {} failed: {}", self.path.display(), e);
            StorageError::Io { operation: "write" }
        })
    }
}
