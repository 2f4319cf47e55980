//! File storage collaborator
//!
//! The player never touches the filesystem itself. It asks a [`Storage`]
//! for the whole file and hands the buffer back through
//! [`Storage::release`] once it is done with it, exactly once per buffer.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by a storage provider
#[derive(Debug, Error)]
pub enum StorageError {
    /// No file with this name
    #[error("file not found: {name}")]
    NotFound {
        /// Requested name
        name: String,
    },
    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-buffer provider
pub trait Storage: Send {
    /// Read a whole file into memory
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Take back a buffer obtained from [`Storage::read_file`]
    fn release(&mut self, buffer: Vec<u8>);
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read_file(name)
    }

    fn release(&mut self, buffer: Vec<u8>) {
        (**self).release(buffer)
    }
}

/// Storage backed by a directory on the host filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    base: PathBuf,
}

impl FsStorage {
    /// Resolve names relative to `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FsStorage { base: base.into() }
    }

    /// Resolve names relative to the working directory
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    /// Base directory
    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl Storage for FsStorage {
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.base.join(name);
        std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound {
                name: name.to_string(),
            },
            _ => StorageError::Io(err),
        })
    }

    fn release(&mut self, buffer: Vec<u8>) {
        drop(buffer);
    }
}
