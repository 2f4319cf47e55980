//! In-memory OPL2 port model
//!
//! Models what is visible on the bus: the address latch, the register file
//! and the timer/status logic used by detection. No sound is produced.
//! Timers overflow as soon as they are started, so detection succeeds
//! without a real-time delay.
//!
//! The model is a shared handle: clones observe the same chip, so a test can
//! hand one clone to the driver and inspect the other. Only access counts are
//! kept by default; the per-write log is opt-in ([`EmulatedOpl2::with_write_log`]).

use crate::driver::{DEFAULT_ADDRESS_PORT, DEFAULT_DATA_PORT};
use crate::port::PortIo;
use crate::registers::{RegisterBank, StatusFlags, TimerControl, REG_TIMER_CONTROL};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct ChipState {
    present: bool,
    latch: u8,
    registers: RegisterBank,
    status: StatusFlags,
    log_writes: bool,
    write_log: Vec<(u8, u8)>,
    address_writes: usize,
    data_writes: usize,
    status_reads: usize,
}

/// Port-level OPL2 model
#[derive(Debug, Clone)]
pub struct EmulatedOpl2 {
    address_port: u16,
    data_port: u16,
    state: Arc<Mutex<ChipState>>,
}

impl EmulatedOpl2 {
    /// Create a chip answering on the AdLib ports
    pub fn new() -> Self {
        Self::with_ports(DEFAULT_ADDRESS_PORT, DEFAULT_DATA_PORT)
    }

    /// Create a chip answering on custom ports
    pub fn with_ports(address_port: u16, data_port: u16) -> Self {
        EmulatedOpl2 {
            address_port,
            data_port,
            state: Arc::new(Mutex::new(ChipState {
                present: true,
                latch: 0,
                registers: RegisterBank::new(),
                status: StatusFlags::empty(),
                log_writes: false,
                write_log: Vec::new(),
                address_writes: 0,
                data_writes: 0,
                status_reads: 0,
            })),
        }
    }

    /// Create an empty slot: writes vanish, reads float high
    pub fn absent() -> Self {
        let chip = Self::new();
        chip.set_present(false);
        chip
    }

    /// Record every `(register, value)` data write for [`EmulatedOpl2::take_write_log`]
    pub fn with_write_log(self) -> Self {
        self.state.lock().log_writes = true;
        self
    }

    /// Plug or unplug the chip
    pub fn set_present(&self, present: bool) {
        self.state.lock().present = present;
    }

    /// Current value of a register
    pub fn register(&self, addr: u8) -> u8 {
        self.state.lock().registers.read(addr)
    }

    /// True when every register holds zero
    pub fn is_silent(&self) -> bool {
        self.state.lock().registers.is_silent()
    }

    /// Snapshot of the register file
    pub fn registers(&self) -> RegisterBank {
        self.state.lock().registers.clone()
    }

    /// Number of completed data writes
    pub fn data_writes(&self) -> usize {
        self.state.lock().data_writes
    }

    /// Number of register selects
    pub fn address_writes(&self) -> usize {
        self.state.lock().address_writes
    }

    /// Number of status port reads (including settle reads)
    pub fn status_reads(&self) -> usize {
        self.state.lock().status_reads
    }

    /// Drain the `(register, value)` log of data writes (empty unless enabled)
    pub fn take_write_log(&self) -> Vec<(u8, u8)> {
        std::mem::take(&mut self.state.lock().write_log)
    }

    /// Forget logged writes and access counters (register contents stay)
    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.write_log.clear();
        state.address_writes = 0;
        state.data_writes = 0;
        state.status_reads = 0;
    }
}

impl ChipState {
    fn write_data(&mut self, value: u8) {
        let reg = self.latch;
        self.registers.write(reg, value);
        if self.log_writes {
            self.write_log.push((reg, value));
        }
        self.data_writes += 1;

        if reg == REG_TIMER_CONTROL {
            self.timer_control(TimerControl::from_bits_truncate(value));
        }
    }

    fn timer_control(&mut self, control: TimerControl) {
        if control.contains(TimerControl::IRQ_RESET) {
            self.status = StatusFlags::empty();
            return;
        }
        if control.contains(TimerControl::START_TIMER1)
            && !control.contains(TimerControl::MASK_TIMER1)
        {
            self.status |= StatusFlags::IRQ | StatusFlags::TIMER1;
        }
        if control.contains(TimerControl::START_TIMER2)
            && !control.contains(TimerControl::MASK_TIMER2)
        {
            self.status |= StatusFlags::IRQ | StatusFlags::TIMER2;
        }
    }
}

impl Default for EmulatedOpl2 {
    fn default() -> Self {
        Self::new()
    }
}

impl PortIo for EmulatedOpl2 {
    fn write(&mut self, port: u16, value: u8) {
        let mut state = self.state.lock();
        if !state.present {
            return;
        }
        if port == self.address_port {
            state.latch = value;
            state.address_writes += 1;
        } else if port == self.data_port {
            state.write_data(value);
        }
    }

    fn read(&mut self, port: u16) -> u8 {
        let mut state = self.state.lock();
        if !state.present {
            return 0xFF;
        }
        if port == self.address_port {
            state.status_reads += 1;
            // Undefined low bits read back as 0x06 on a real YM3812
            state.status.bits() | 0x06
        } else {
            0xFF
        }
    }
}
