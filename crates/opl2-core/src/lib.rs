//! OPL2 (YM3812) register driver
//!
//! Drives a Yamaha YM3812 FM synthesizer (AdLib / Sound Blaster FM section)
//! through its two I/O ports: an address port that selects a register and a
//! data port that latches the value. The chip needs idle bus cycles after each
//! of those steps before it accepts the next one; the driver inserts them as
//! fixed busy-poll reads of the status port, never as timers, so a register
//! write is safe to issue from interrupt context.
//!
//! # Features
//! - Register writes with configurable select/data settle cycles
//! - Timer-based chip presence detection
//! - Full 256-register reset to silence
//! - Shadow copy of every value written
//! - In-memory port model for hosts without the chip (`emulated` feature)
//!
//! # Crate feature flags
//! - `emulated` (default): [`EmulatedOpl2`], a port-level model of the chip
//!
//! # Backend Trait
//! The [`ChipBackend`] trait is the seam the VGM replayer drives. [`Opl2Driver`]
//! implements it for any [`PortIo`] bus.
//!
//! # Quick start
//! ```
//! use opl2::{ChipBackend, DriverConfig, EmulatedOpl2, Opl2Driver};
//!
//! let bus = EmulatedOpl2::new();
//! let mut chip = Opl2Driver::new(bus.clone(), DriverConfig::instant_detect());
//! assert!(chip.detect());
//! chip.write_register(0x20, 0x01); // Modulator multiplier
//! chip.write_register(0xB0, 0x31); // Key on, block 4
//! assert_eq!(bus.register(0xB0), 0x31);
//! chip.reset();
//! assert_eq!(bus.register(0xB0), 0x00);
//! ```

#![warn(missing_docs)]

pub mod backend; // Backend trait abstraction
pub mod driver; // Register driver (settle cycles, detect, reset)
#[cfg(feature = "emulated")]
pub mod emulated; // Port-level chip model
pub mod port; // Port I/O collaborator
pub mod registers; // Register map and status bits

/// Error types for OPL2 driver operations
#[derive(thiserror::Error, Debug)]
pub enum Opl2Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Opl2Error>;

// Public API exports
pub use backend::ChipBackend;
pub use driver::{DriverConfig, Opl2Driver};
#[cfg(feature = "emulated")]
pub use emulated::EmulatedOpl2;
pub use port::PortIo;
pub use registers::{RegisterBank, StatusFlags, TimerControl, REGISTER_COUNT};
