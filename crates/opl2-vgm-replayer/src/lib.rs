//! VGM replayer for the OPL2.
//!
//! This crate plays VGM (Video Game Music) logs on a YM3812 from a periodic
//! timer tick:
//! - Header validation (magic, end-of-file offset, version >= 1.51, data offset)
//! - A tick-driven stream decoder that issues register writes and converts
//!   44.1 kHz wait commands into host ticks
//! - A playback controller with `load`/`start`/`stop`/`unload`
//! - Collaborator traits for file storage and the tick source, with host
//!   implementations ([`FsStorage`], [`ThreadTicker`]) and a [`ManualTicker`]
//!   for hosts that fire ticks themselves
//!
//! Compressed `.vgz` files are rejected. Records for other chips are skipped.
//!
//! # Example
//! ```
//! use opl2::{DriverConfig, EmulatedOpl2, Opl2Driver};
//! use opl2_vgm_replayer::{FsStorage, ManualTicker, PlayerState, VgmPlayer};
//!
//! # fn main() -> opl2_vgm_replayer::Result<()> {
//! // Key on, wait one 60 Hz frame, loop
//! let mut file = vec![0u8; 0x40];
//! file.extend_from_slice(&[0x5A, 0xB0, 0x31, 0x62, 0x66]);
//! let eof = (file.len() - 4) as u32;
//! file[0..4].copy_from_slice(b"Vgm ");
//! file[4..8].copy_from_slice(&eof.to_le_bytes());
//! file[8..12].copy_from_slice(&0x151u32.to_le_bytes());
//! file[0x34..0x38].copy_from_slice(&0x0Cu32.to_le_bytes());
//!
//! let bus = EmulatedOpl2::new();
//! let chip = Opl2Driver::new(bus.clone(), DriverConfig::instant_detect());
//! let ticker = ManualTicker::new();
//! let mut player = VgmPlayer::new(chip, FsStorage::current_dir(), ticker.clone());
//!
//! player.load_bytes(file)?;
//! player.start()?;
//! ticker.fire();
//! assert_eq!(bus.register(0xB0), 0x31);
//!
//! player.stop();
//! assert_eq!(player.state(), PlayerState::Loaded);
//! assert!(bus.is_silent());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod decoder;
pub mod error;
pub mod header;
pub mod player;
pub mod storage;
pub mod timer;
pub mod timing;

pub use crate::command::Command;
pub use crate::decoder::{DecoderStats, StreamDecoder};
pub use crate::error::{Result, VgmError};
pub use crate::header::{StreamBounds, VgmHeader};
pub use crate::player::{PlayerState, TrackInfo, VgmPlayer};
pub use crate::storage::{FsStorage, Storage, StorageError};
pub use crate::timer::{ManualTicker, ThreadTicker, TickCallback, TickSource};
pub use crate::timing::TimingConfig;
