//! Tick timing
//!
//! VGM waits are expressed in 44.1 kHz samples. The host calls the decoder
//! at its own tick rate, so each tick accounts for a fixed number of native
//! samples, the tick quantum.

use crate::error::{Result, VgmError};
use serde::{Deserialize, Serialize};

/// Sample rate all VGM wait durations are expressed in
pub const VGM_SAMPLE_RATE: u32 = 44_100;
/// Samples in one 60 Hz frame (opcode 0x62)
pub const SAMPLES_PER_60HZ_FRAME: u32 = 735;
/// Samples in one 50 Hz frame (opcode 0x63)
pub const SAMPLES_PER_50HZ_FRAME: u32 = 882;

/// Timing configuration of the tick-driven decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Time base of the stream's wait commands
    pub native_sample_rate: u32,
    /// Rate at which the host invokes the tick callback
    pub tick_rate_hz: u32,
    /// Upper bound on records decoded in one tick
    pub max_commands_per_tick: u32,
}

impl TimingConfig {
    /// 100 Hz timer interrupt (quantum 441)
    pub fn pit_100hz() -> Self {
        TimingConfig {
            native_sample_rate: VGM_SAMPLE_RATE,
            tick_rate_hz: 100,
            max_commands_per_tick: 4096,
        }
    }

    /// 60 Hz vertical blank (quantum 735)
    pub fn vsync_60hz() -> Self {
        TimingConfig {
            tick_rate_hz: 60,
            ..Self::pit_100hz()
        }
    }

    /// Native samples per tick, truncated
    pub fn tick_quantum(&self) -> u32 {
        self.native_sample_rate
            .checked_div(self.tick_rate_hz)
            .unwrap_or(0)
    }

    /// Convert native samples to seconds
    pub fn samples_to_secs(&self, samples: u64) -> f64 {
        if self.native_sample_rate == 0 {
            return 0.0;
        }
        samples as f64 / f64::from(self.native_sample_rate)
    }

    /// Reject configurations the decoder cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 {
            return Err(VgmError::InvalidConfig(
                "tick rate cannot be zero".to_string(),
            ));
        }
        if self.tick_quantum() == 0 {
            return Err(VgmError::InvalidConfig(format!(
                "tick rate {} Hz exceeds the native sample rate {} Hz",
                self.tick_rate_hz, self.native_sample_rate
            )));
        }
        if self.max_commands_per_tick == 0 {
            return Err(VgmError::InvalidConfig(
                "max_commands_per_tick cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::pit_100hz()
    }
}
