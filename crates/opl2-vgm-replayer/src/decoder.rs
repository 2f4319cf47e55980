//! Tick-driven VGM stream decoder
//!
//! Called once per host timer tick. A tick either lets an outstanding wait
//! run down by one quantum, or parses forward through the command stream
//! until a wait longer than the quantum comes up, the stream loops or ends,
//! or the per-tick record bound is reached.
//!
//! The wait counter is signed and wait commands add to it rather than
//! overwrite it. Waits that fit within the current tick are absorbed without
//! yielding but stay charged against the tick, so the effective resolution is
//! one tick while the long-run timing does not drift: N frame waits take
//! exactly N * 735 samples of ticks. The negative carry is floored at one
//! quantum.
//!
//! The decoder never allocates, never blocks and never fails: records for
//! other chips are skipped and a truncated record ends playback.

use crate::command::{decode, Command};
use crate::timing::TimingConfig;
use opl2::ChipBackend;

/// Running counters of a decoder since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Ticks received
    pub ticks: u64,
    /// Records decoded
    pub records: u64,
    /// Register writes issued to the chip
    pub register_writes: u64,
    /// Data blocks skipped
    pub data_blocks: u64,
    /// Records for other chips or unassigned opcodes skipped
    pub skipped: u64,
    /// End-of-stream loops taken
    pub loops: u64,
    /// Native samples of playback time elapsed (one quantum per active tick)
    pub samples_elapsed: u64,
    /// Native samples of wait commands decoded
    pub stream_samples: u64,
}

/// Per-tick stream decoder
#[derive(Debug, Clone)]
pub struct StreamDecoder {
    quantum: i64,
    max_records: u32,
    cursor: usize,
    pending: i64,
    finished: bool,
    stats: DecoderStats,
}

impl StreamDecoder {
    /// Create a decoder for the given timing
    ///
    /// The configuration should have passed [`TimingConfig::validate`]; a
    /// zero quantum or record bound is clamped to one.
    pub fn new(timing: &TimingConfig) -> Self {
        StreamDecoder {
            quantum: i64::from(timing.tick_quantum().max(1)),
            max_records: timing.max_commands_per_tick.max(1),
            cursor: 0,
            pending: 0,
            finished: false,
            stats: DecoderStats::default(),
        }
    }

    /// Rewind to the start of the stream and clear all counters
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pending = 0;
        self.finished = false;
        self.stats = DecoderStats::default();
    }

    /// Advance playback by one tick
    pub fn tick<C: ChipBackend + ?Sized>(&mut self, stream: &[u8], chip: &mut C) {
        self.stats.ticks += 1;
        if self.finished {
            return;
        }

        if self.pending > 0 {
            self.pending -= self.quantum;
            self.stats.samples_elapsed += self.quantum as u64;
            return;
        }

        for _ in 0..self.max_records {
            let Some((command, len)) = decode(stream, self.cursor) else {
                // Exhausted or truncated: park at the end
                self.cursor = stream.len();
                self.finished = true;
                break;
            };
            self.cursor += len;
            self.stats.records += 1;

            match command {
                Command::Write { reg, value } => {
                    chip.write_register(reg, value);
                    self.stats.register_writes += 1;
                }
                Command::End => {
                    self.cursor = 0;
                    self.stats.loops += 1;
                    break;
                }
                Command::DataBlock { .. } => self.stats.data_blocks += 1,
                Command::Wait(_) => {}
                Command::Foreign { .. } => self.stats.skipped += 1,
            }

            if let Some(samples) = command.wait_samples() {
                self.pending += i64::from(samples);
                self.stats.stream_samples += u64::from(samples);
                if self.pending > self.quantum {
                    break;
                }
            }
        }

        self.pending = (self.pending - self.quantum).max(-self.quantum);
        self.stats.samples_elapsed += self.quantum as u64;
    }

    /// Byte offset of the next record
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Outstanding wait in native samples (negative when carried over)
    pub fn pending_samples(&self) -> i64 {
        self.pending
    }

    /// True once the stream ran out without an end command
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Native samples accounted per tick
    pub fn quantum(&self) -> u32 {
        self.quantum as u32
    }

    /// Counters since the last reset
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(&TimingConfig::default())
    }
}
