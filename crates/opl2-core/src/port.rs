//! Port I/O collaborator
//!
//! The driver stipulates when and what is written; the bus mechanics live
//! behind this trait. On DOS-era hardware an implementation maps straight to
//! `outb`/`inb` on the ISA bus; on a host it can be a USB bridge, a logging
//! shim or [`crate::EmulatedOpl2`].

/// Single-byte access to device ports
///
/// Implementations must not block: the driver calls them from the playback
/// tick, which may run in interrupt context.
pub trait PortIo: Send {
    /// Write one byte to a device port
    fn write(&mut self, port: u16, value: u8);

    /// Read one byte from a device port
    fn read(&mut self, port: u16) -> u8;
}

impl<P: PortIo + ?Sized> PortIo for Box<P> {
    fn write(&mut self, port: u16, value: u8) {
        (**self).write(port, value);
    }

    fn read(&mut self, port: u16) -> u8 {
        (**self).read(port)
    }
}
