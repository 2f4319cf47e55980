//! OPL2 register driver
//!
//! Every register write is a two-step bus transaction:
//!
//! 1. write the register number to the address port, then idle for the
//!    register-select settle time (3.3 µs on a YM3812);
//! 2. write the value to the data port, then idle for the data-write settle
//!    time (23 µs).
//!
//! Idle time is produced by reading the status port a fixed number of times.
//! The counts are tuned hardware constants, not a portable timing guarantee,
//! and are therefore part of [`DriverConfig`].

use crate::backend::ChipBackend;
use crate::port::PortIo;
use crate::registers::{
    RegisterBank, StatusFlags, TimerControl, REGISTER_COUNT, REG_TEST, REG_TIMER1,
    REG_TIMER_CONTROL,
};
use crate::{Opl2Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// AdLib-compatible address/status port
pub const DEFAULT_ADDRESS_PORT: u16 = 0x388;
/// AdLib-compatible data port
pub const DEFAULT_DATA_PORT: u16 = 0x389;

/// Driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Address (register select) port; status is read from the same port
    pub address_port: u16,
    /// Data port
    pub data_port: u16,
    /// Status reads after selecting a register
    pub select_settle_reads: u16,
    /// Status reads after writing a value
    pub data_settle_reads: u16,
    /// Real-time wait for timer 1 to overflow during detection
    pub detect_delay: Duration,
}

impl DriverConfig {
    /// AdLib timing at 0x388/0x389
    pub fn adlib() -> Self {
        DriverConfig {
            address_port: DEFAULT_ADDRESS_PORT,
            data_port: DEFAULT_DATA_PORT,
            select_settle_reads: 24,
            data_settle_reads: 99,
            detect_delay: Duration::from_millis(80),
        }
    }

    /// AdLib ports with no detection delay (emulated chips)
    pub fn instant_detect() -> Self {
        DriverConfig {
            detect_delay: Duration::ZERO,
            ..Self::adlib()
        }
    }

    /// Check the configuration for obviously broken values
    pub fn validate(&self) -> Result<()> {
        if self.address_port == self.data_port {
            return Err(Opl2Error::ConfigError(format!(
                "address and data port are both {:#06x}",
                self.address_port
            )));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::adlib()
    }
}

/// OPL2 register driver over a port bus
pub struct Opl2Driver<P: PortIo> {
    port: P,
    config: DriverConfig,
    shadow: RegisterBank,
}

impl<P: PortIo> Opl2Driver<P> {
    /// Create a driver with the given bus and configuration
    pub fn new(port: P, config: DriverConfig) -> Self {
        Opl2Driver {
            port,
            config,
            shadow: RegisterBank::new(),
        }
    }

    /// Create a driver after validating the configuration
    pub fn with_config(port: P, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(port, config))
    }

    /// Write `value` to register `reg`, including both settle delays
    pub fn write(&mut self, reg: u8, value: u8) {
        self.port.write(self.config.address_port, reg);
        self.settle(self.config.select_settle_reads);

        self.port.write(self.config.data_port, value);
        self.settle(self.config.data_settle_reads);

        self.shadow.write(reg, value);
    }

    /// Read the status port
    pub fn status(&mut self) -> StatusFlags {
        StatusFlags::from_status(self.port.read(self.config.address_port))
    }

    /// Detect the chip with the timer 1 overflow check
    ///
    /// Resets both timers, samples the status (all timer bits must be clear),
    /// starts timer 1 at its fastest preset, waits [`DriverConfig::detect_delay`]
    /// and samples again (IRQ and timer 1 must be set, timer 2 clear). The timers
    /// are reset again before returning.
    pub fn detect(&mut self) -> bool {
        let masked = TimerControl::MASK_TIMER1 | TimerControl::MASK_TIMER2;

        self.write(REG_TEST, 0x00);
        self.write(REG_TIMER_CONTROL, masked.bits());
        self.write(REG_TIMER_CONTROL, TimerControl::IRQ_RESET.bits());
        let before = self.status();

        self.write(REG_TIMER1, 0xFF);
        self.write(
            REG_TIMER_CONTROL,
            (TimerControl::MASK_TIMER2 | TimerControl::START_TIMER1).bits(),
        );
        if !self.config.detect_delay.is_zero() {
            std::thread::sleep(self.config.detect_delay);
        }
        let after = self.status();

        self.write(REG_TIMER_CONTROL, masked.bits());
        self.write(REG_TIMER_CONTROL, TimerControl::IRQ_RESET.bits());

        let found = before.intersection(StatusFlags::TIMER_MASK).is_empty()
            && after.intersection(StatusFlags::TIMER_MASK)
                == StatusFlags::IRQ | StatusFlags::TIMER1;
        log::debug!(
            "OPL2 detection at {:#06x}: before={:#04x} after={:#04x} found={}",
            self.config.address_port,
            before.bits(),
            after.bits(),
            found
        );
        found
    }

    /// Write zero to all 256 registers
    pub fn reset(&mut self) {
        for reg in 0..REGISTER_COUNT {
            self.write(reg as u8, 0x00);
        }
    }

    /// Last value written to `reg`
    pub fn shadow(&self) -> &RegisterBank {
        &self.shadow
    }

    /// Get the configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Access the bus (immutable)
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Access the bus (mutable)
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn settle(&mut self, reads: u16) {
        for _ in 0..reads {
            let _ = self.port.read(self.config.address_port);
        }
    }
}

impl<P: PortIo> ChipBackend for Opl2Driver<P> {
    fn write_register(&mut self, addr: u8, value: u8) {
        self.write(addr, value);
    }

    fn detect(&mut self) -> bool {
        Opl2Driver::detect(self)
    }

    fn reset(&mut self) {
        Opl2Driver::reset(self);
    }
}
