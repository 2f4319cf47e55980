//! VGM command records
//!
//! [`decode`] reads exactly one record at a position in the command stream.
//! It never reads past the end of the slice: a record cut short by the end
//! of the stream decodes as `None`, the same as running off the end.

use crate::timing::{SAMPLES_PER_50HZ_FRAME, SAMPLES_PER_60HZ_FRAME};
use std::fmt;

/// YM3812 register write
pub const OP_YM3812_WRITE: u8 = 0x5A;
/// Wait n samples (u16 operand)
pub const OP_WAIT: u8 = 0x61;
/// Wait one 60 Hz frame
pub const OP_WAIT_60HZ: u8 = 0x62;
/// Wait one 50 Hz frame
pub const OP_WAIT_50HZ: u8 = 0x63;
/// End of sound data
pub const OP_END: u8 = 0x66;
/// Data block
pub const OP_DATA_BLOCK: u8 = 0x67;

/// Opcode, data-block marker, type byte and 32-bit size
const DATA_BLOCK_HEADER_LEN: usize = 7;

/// One decoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write `value` to OPL2 register `reg`
    Write {
        /// Register number
        reg: u8,
        /// Value
        value: u8,
    },
    /// Wait a number of native samples
    Wait(u32),
    /// End of stream; playback loops to the start
    End,
    /// Opaque data block, skipped
    DataBlock {
        /// Block type byte
        kind: u8,
        /// Payload size in bytes
        size: u32,
    },
    /// Record for another chip or an unassigned opcode, skipped
    Foreign {
        /// Opcode byte
        opcode: u8,
        /// Samples to wait after the record (0x8n only)
        wait: u32,
    },
}

impl Command {
    /// Wait carried by the record, if any
    pub fn wait_samples(&self) -> Option<u32> {
        match *self {
            Command::Wait(samples) => Some(samples),
            Command::Foreign { wait, .. } if wait > 0 => Some(wait),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Write { reg, value } => write!(f, "write reg {reg:#04x} = {value:#04x}"),
            Command::Wait(samples) => write!(f, "wait {samples} samples"),
            Command::End => f.write_str("end of stream"),
            Command::DataBlock { kind, size } => {
                write!(f, "data block type {kind:#04x}, {size} bytes")
            }
            Command::Foreign { opcode, wait: 0 } => write!(f, "skip opcode {opcode:#04x}"),
            Command::Foreign { opcode, wait } => {
                write!(f, "skip opcode {opcode:#04x}, wait {wait} samples")
            }
        }
    }
}

/// Total length of a record for another chip (VGM 1.71 command table)
///
/// Opcodes without a defined length count as one byte.
pub fn foreign_record_len(opcode: u8) -> usize {
    match opcode {
        0x30..=0x3F | 0x4F | 0x50 | 0x94 => 2,
        0x40..=0x4E | 0x51..=0x5F | 0xA0..=0xBF => 3,
        0x64 | 0xC0..=0xDF => 4,
        0x90 | 0x91 | 0x95 | 0xE0..=0xFF => 5,
        0x92 => 6,
        0x93 => 11,
        0x68 => 12,
        _ => 1,
    }
}

/// Decode the record at `pos`, returning it with its length in bytes
pub fn decode(stream: &[u8], pos: usize) -> Option<(Command, usize)> {
    let rest = stream.get(pos..)?;
    let (&opcode, operands) = rest.split_first()?;

    match opcode {
        OP_YM3812_WRITE => match operands {
            [reg, value, ..] => Some((
                Command::Write {
                    reg: *reg,
                    value: *value,
                },
                3,
            )),
            _ => None,
        },
        OP_WAIT => match operands {
            [lo, hi, ..] => Some((Command::Wait(u16::from_le_bytes([*lo, *hi]) as u32), 3)),
            _ => None,
        },
        OP_WAIT_60HZ => Some((Command::Wait(SAMPLES_PER_60HZ_FRAME), 1)),
        OP_WAIT_50HZ => Some((Command::Wait(SAMPLES_PER_50HZ_FRAME), 1)),
        0x70..=0x7F => Some((Command::Wait(1 + u32::from(opcode & 0x0F)), 1)),
        OP_END => Some((Command::End, 1)),
        OP_DATA_BLOCK => {
            let header = rest.get(..DATA_BLOCK_HEADER_LEN)?;
            let size = u32::from_le_bytes([header[3], header[4], header[5], header[6]]);
            let len = DATA_BLOCK_HEADER_LEN.checked_add(size as usize)?;
            if len > rest.len() {
                return None;
            }
            Some((
                Command::DataBlock {
                    kind: header[2],
                    size,
                },
                len,
            ))
        }
        _ => {
            let len = foreign_record_len(opcode);
            if len > rest.len() {
                return None;
            }
            let wait = match opcode {
                0x80..=0x8F => u32::from(opcode & 0x0F),
                _ => 0,
            };
            Some((Command::Foreign { opcode, wait }, len))
        }
    }
}
