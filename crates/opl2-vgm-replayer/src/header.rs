//! VGM header parsing and validation.
//!
//! Only the leading 0x38 bytes of the header are read: identification,
//! size, version, the informational length/loop fields and the data offset.
//! Chip clock fields are ignored; the player always drives a single OPL2.

use crate::error::{Result, VgmError};
use nom::bytes::complete::take;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;

/// File identification marker.
pub const VGM_MAGIC: &[u8; 4] = b"Vgm ";
/// Oldest accepted version (BCD).
pub const MIN_VERSION: u32 = 0x0000_0151;
/// Address of the `dataOffset` field; the offset is relative to it.
pub const DATA_OFFSET_FIELD: usize = 0x34;
/// Number of header bytes read by this player.
pub const HEADER_READ_LEN: usize = DATA_OFFSET_FIELD + 4;
/// The `eofOffset` value excludes the magic.
const EOF_OFFSET_BASE: usize = 4;
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Header fields used by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VgmHeader {
    /// Identification bytes (`Vgm ` on valid files).
    pub magic: [u8; 4],
    /// Relative offset of the end of file (file size - 4).
    pub eof_offset: u32,
    /// BCD version, e.g. `0x151` for 1.51.
    pub version: u32,
    /// Relative offset of the GD3 tag (not parsed).
    pub gd3_offset: u32,
    /// Total number of 44.1 kHz samples in the song.
    pub total_samples: u32,
    /// Relative offset of the loop point (informational; playback loops to start).
    pub loop_offset: u32,
    /// Number of samples in one loop.
    pub loop_samples: u32,
    /// Recording rate in Hz (informational).
    pub rate: u32,
    /// Command stream offset relative to [`DATA_OFFSET_FIELD`].
    pub data_offset: u32,
}

/// Location of the command stream inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBounds {
    /// First byte of the command stream.
    pub start: usize,
    /// Stream length in bytes; `start + len` is the file size.
    pub len: usize,
}

impl VgmHeader {
    /// Read the header fields from the start of `data`.
    ///
    /// Gzip data, a wrong magic and buffers shorter than [`HEADER_READ_LEN`]
    /// are rejected, in that order; no other field is validated yet.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.starts_with(&GZIP_MAGIC) {
            return Err(VgmError::Compressed);
        }
        if let Some(found) = data.get(..4).and_then(|id| <[u8; 4]>::try_from(id).ok()) {
            if &found != VGM_MAGIC {
                return Err(VgmError::BadMagic { found });
            }
        }
        match raw_header(data) {
            Ok((_, header)) => Ok(header),
            Err(_) => Err(VgmError::HeaderTooShort { len: data.len() }),
        }
    }

    /// Check the header against the size of the file it came from.
    ///
    /// Checks run in order: magic, end-of-file offset, version, data offset.
    pub fn validate(&self, file_size: usize) -> Result<StreamBounds> {
        if &self.magic != VGM_MAGIC {
            return Err(VgmError::BadMagic { found: self.magic });
        }

        if file_size < EOF_OFFSET_BASE || self.eof_offset as usize != file_size - EOF_OFFSET_BASE
        {
            return Err(VgmError::SizeMismatch {
                eof_offset: self.eof_offset,
                file_size,
            });
        }

        if self.version < MIN_VERSION {
            return Err(VgmError::UnsupportedVersion {
                version: self.version,
            });
        }

        // Zero is the legacy "right after the header" sentinel; not accepted
        let start = DATA_OFFSET_FIELD
            .checked_add(self.data_offset as usize)
            .filter(|&start| self.data_offset != 0 && start < file_size)
            .ok_or(VgmError::InvalidDataOffset {
                data_offset: self.data_offset,
                file_size,
            })?;

        Ok(StreamBounds {
            start,
            len: file_size - start,
        })
    }

    /// Version in `major.minor` form.
    pub fn version_string(&self) -> String {
        format_version(self.version)
    }

    /// Absolute loop point, if the header records one.
    pub fn loop_start(&self) -> Option<usize> {
        // loopOffset is relative to its own field at 0x1C
        (self.loop_offset != 0).then(|| 0x1C + self.loop_offset as usize)
    }
}

/// Parse and validate a complete VGM file.
pub fn validate(data: &[u8]) -> Result<(VgmHeader, StreamBounds)> {
    let header = VgmHeader::parse(data)?;
    let bounds = header.validate(data.len())?;
    Ok((header, bounds))
}

/// Render a BCD version as `major.minor` (`0x171` becomes `1.71`).
pub fn format_version(version: u32) -> String {
    format!("{:x}.{:02x}", version >> 8, version & 0xFF)
}

fn raw_header(input: &[u8]) -> IResult<&[u8], VgmHeader> {
    let (input, magic) = take(4usize)(input)?;
    let (
        input,
        (
            eof_offset,
            version,
            _sn76489_clock,
            _ym2413_clock,
            gd3_offset,
            total_samples,
            loop_offset,
            loop_samples,
            rate,
        ),
    ) = tuple((
        le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32, le_u32,
    ))(input)?;
    // SN76489 feedback/shift/flags, YM2612 and YM2151 clocks
    let (input, _) = take(DATA_OFFSET_FIELD - 0x28)(input)?;
    let (input, data_offset) = le_u32(input)?;

    let mut id = [0u8; 4];
    id.copy_from_slice(magic);
    Ok((
        input,
        VgmHeader {
            magic: id,
            eof_offset,
            version,
            gd3_offset,
            total_samples,
            loop_offset,
            loop_samples,
            rate,
            data_offset,
        },
    ))
}
