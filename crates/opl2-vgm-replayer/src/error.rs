//! Error handling for VGM loading and playback control.

use crate::header::format_version;
use crate::storage::StorageError;
use thiserror::Error;

/// Convenient result alias for VGM loading and playback.
pub type Result<T> = std::result::Result<T, VgmError>;

/// Errors that may occur while loading a VGM file or controlling playback.
///
/// Every load-time failure is recoverable; the controller is left without a
/// track and the caller may try another file.
#[derive(Debug, Error)]
pub enum VgmError {
    /// No chip answered detection.
    #[error("OPL2 not detected")]
    ChipNotFound,
    /// The storage collaborator could not provide the file.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// File does not start with the `Vgm ` marker.
    #[error("VGM header error: bad magic {found:02x?}")]
    BadMagic {
        /// First four bytes of the file.
        found: [u8; 4],
    },
    /// The end-of-file offset disagrees with the actual file size.
    #[error("VGM format error: eof offset {eof_offset:#x} but file size is {file_size:#x}")]
    SizeMismatch {
        /// `eofOffset` header field.
        eof_offset: u32,
        /// Number of bytes actually read.
        file_size: usize,
    },
    /// File predates VGM 1.51.
    #[error("only VGM >= 1.51 is supported (file is {})", version_text(.version))]
    UnsupportedVersion {
        /// Raw BCD version field.
        version: u32,
    },
    /// Gzip-compressed (`.vgz`) data is rejected, not decoded.
    #[error("compressed VGZ data is not supported")]
    Compressed,
    /// Buffer ends before the header fields this player reads.
    #[error("VGM header truncated: {len} bytes")]
    HeaderTooShort {
        /// Size of the buffer.
        len: usize,
    },
    /// Data offset is zero or points outside the file.
    #[error("invalid VGM data offset {data_offset:#x} for file size {file_size:#x}")]
    InvalidDataOffset {
        /// `dataOffset` header field.
        data_offset: u32,
        /// Size of the buffer.
        file_size: usize,
    },
    /// Playback requested with no track loaded.
    #[error("no VGM track loaded")]
    NotLoaded,
    /// Invalid player configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn version_text(version: &u32) -> String {
    format_version(*version)
}
