//! Backend trait abstraction for chips driven by a register-write log
//!
//! The replayer only needs three things from a chip: write a register, prove
//! the chip is there, and silence it. Hardware drivers, emulators and test
//! doubles all implement this interface.

/// Common interface for register-programmed synthesizer chips
///
/// # Example
///
/// ```
/// use opl2::{ChipBackend, DriverConfig, EmulatedOpl2, Opl2Driver};
///
/// fn key_on<B: ChipBackend>(chip: &mut B) {
///     chip.write_register(0xA0, 0x41); // F-number low
///     chip.write_register(0xB0, 0x32); // Key on, block 4, F-number high
/// }
///
/// let mut chip = Opl2Driver::new(EmulatedOpl2::new(), DriverConfig::instant_detect());
/// key_on(&mut chip);
/// ```
pub trait ChipBackend: Send {
    /// Write to a register
    ///
    /// Must not block on wall-clock time; it is called from the playback tick.
    fn write_register(&mut self, addr: u8, value: u8);

    /// Check that the chip is present
    ///
    /// May block for a short real-time delay. Foreground use only.
    fn detect(&mut self) -> bool;

    /// Reset every register to zero, returning the chip to silence
    fn reset(&mut self);
}

impl<B: ChipBackend + ?Sized> ChipBackend for Box<B> {
    fn write_register(&mut self, addr: u8, value: u8) {
        (**self).write_register(addr, value);
    }

    fn detect(&mut self) -> bool {
        (**self).detect()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
