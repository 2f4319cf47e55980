//! OPL2 Register Definitions
//!
//! The YM3812 exposes an 8-bit register address space. Only a subset is
//! populated, but reset clears all 256 addresses so every latch, including
//! the undocumented ones, ends in a known state.

use bitflags::bitflags;

/// Number of addressable registers
pub const REGISTER_COUNT: usize = 256;

/// Test / waveform-select enable register
pub const REG_TEST: u8 = 0x01;
/// Timer 1 preset (80 µs resolution)
pub const REG_TIMER1: u8 = 0x02;
/// Timer control / IRQ reset
pub const REG_TIMER_CONTROL: u8 = 0x04;

bitflags! {
    /// Status port bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Interrupt request (set when either unmasked timer overflows)
        const IRQ = 0x80;
        /// Timer 1 overflowed
        const TIMER1 = 0x40;
        /// Timer 2 overflowed
        const TIMER2 = 0x20;
    }
}

impl StatusFlags {
    /// Bits that carry timer state; the low five bits are undefined
    pub const TIMER_MASK: StatusFlags = StatusFlags::all();

    /// Decode a raw status byte
    pub fn from_status(value: u8) -> Self {
        StatusFlags::from_bits_truncate(value)
    }
}

bitflags! {
    /// Timer control register (0x04) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u8 {
        /// Clear the timer and IRQ flags (all other bits ignored)
        const IRQ_RESET = 0x80;
        /// Mask timer 1
        const MASK_TIMER1 = 0x40;
        /// Mask timer 2
        const MASK_TIMER2 = 0x20;
        /// Start timer 2
        const START_TIMER2 = 0x02;
        /// Start timer 1
        const START_TIMER1 = 0x01;
    }
}

/// Shadow copy of all register values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    registers: [u8; REGISTER_COUNT],
}

impl RegisterBank {
    /// Create a new register bank with all values set to 0
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; REGISTER_COUNT],
        }
    }

    /// Read a register value
    pub fn read(&self, addr: u8) -> u8 {
        self.registers[addr as usize]
    }

    /// Write a register value
    pub fn write(&mut self, addr: u8, value: u8) {
        self.registers[addr as usize] = value;
    }

    /// True when every register holds zero
    pub fn is_silent(&self) -> bool {
        self.registers.iter().all(|&v| v == 0)
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}
