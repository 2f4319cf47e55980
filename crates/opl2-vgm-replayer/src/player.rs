//! Playback controller
//!
//! Lifecycle: `Unloaded -> Loaded (load) -> Playing (start) -> Loaded (stop)
//! -> Unloaded (unload)`. Loading while a track is active discards it first.
//!
//! The chip, the decoder and the loaded track live together in one engine
//! behind an `Arc<Mutex<_>>`. The tick callback holds a clone of the `Arc`
//! and only ever uses `try_lock`, so a tick that finds the foreground busy
//! is skipped instead of blocking. Foreground operations that replace or
//! drop the track uninstall the callback before touching it.

use crate::command::{decode, Command};
use crate::decoder::{DecoderStats, StreamDecoder};
use crate::error::{Result, VgmError};
use crate::header::{self, StreamBounds, VgmHeader};
use crate::storage::Storage;
use crate::timer::TickSource;
use crate::timing::TimingConfig;
use opl2::ChipBackend;
use parking_lot::Mutex;
use std::sync::Arc;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No track loaded
    Unloaded,
    /// Track loaded, tick callback not installed
    Loaded,
    /// Tick callback installed
    Playing,
}

/// Facts about the loaded track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackInfo {
    /// BCD version (`0x151` for 1.51)
    pub version: u32,
    /// File size in bytes
    pub file_size: usize,
    /// Offset of the command stream in the file
    pub stream_start: usize,
    /// Length of the command stream
    pub stream_length: usize,
    /// Song length in native samples, as recorded in the header
    pub total_samples: u32,
    /// Loop offset field as recorded (playback always loops to the start)
    pub loop_offset: u32,
    /// Loop length in native samples, as recorded
    pub loop_samples: u32,
}

impl TrackInfo {
    fn new(header: &VgmHeader, bounds: StreamBounds) -> Self {
        TrackInfo {
            version: header.version,
            file_size: bounds.start + bounds.len,
            stream_start: bounds.start,
            stream_length: bounds.len,
            total_samples: header.total_samples,
            loop_offset: header.loop_offset,
            loop_samples: header.loop_samples,
        }
    }

    /// Version in `major.minor` form
    pub fn version_string(&self) -> String {
        header::format_version(self.version)
    }
}

struct LoadedTrack {
    buffer: Vec<u8>,
    info: TrackInfo,
}

impl LoadedTrack {
    fn stream(&self) -> &[u8] {
        self.buffer.get(self.info.stream_start..).unwrap_or(&[])
    }
}

struct Engine<C> {
    chip: C,
    decoder: StreamDecoder,
    track: Option<LoadedTrack>,
}

impl<C: ChipBackend> Engine<C> {
    fn tick(&mut self) {
        let Engine {
            chip,
            decoder,
            track,
        } = self;
        if let Some(track) = track {
            decoder.tick(track.stream(), chip);
        }
    }
}

/// VGM player driving one OPL2 from a periodic tick
pub struct VgmPlayer<C: ChipBackend + 'static, S: Storage, T: TickSource> {
    engine: Arc<Mutex<Engine<C>>>,
    storage: S,
    ticker: T,
    timing: TimingConfig,
    playing: bool,
}

impl<C: ChipBackend + 'static, S: Storage, T: TickSource> VgmPlayer<C, S, T> {
    /// Create a player with the default 100 Hz timing
    pub fn new(chip: C, storage: S, ticker: T) -> Self {
        let timing = TimingConfig::default();
        VgmPlayer {
            engine: Arc::new(Mutex::new(Engine {
                chip,
                decoder: StreamDecoder::new(&timing),
                track: None,
            })),
            storage,
            ticker,
            timing,
            playing: false,
        }
    }

    /// Create a player after validating `timing`
    ///
    /// The tick source should fire at `timing.tick_rate_hz`.
    pub fn with_timing(chip: C, storage: S, ticker: T, timing: TimingConfig) -> Result<Self> {
        timing.validate()?;
        let mut player = Self::new(chip, storage, ticker);
        player.engine.lock().decoder = StreamDecoder::new(&timing);
        player.timing = timing;
        Ok(player)
    }

    /// Load a file through the storage provider
    ///
    /// Detects the chip, discards the current track, then reads and
    /// validates the file. On a validation failure the buffer goes back to
    /// the storage provider and the player is left unloaded. Playback does
    /// not start.
    pub fn load(&mut self, name: &str) -> Result<TrackInfo> {
        self.detect_chip()?;
        self.discard_track();

        let buffer = self.storage.read_file(name).map_err(|err| {
            log::warn!("cannot read {name}: {err}");
            VgmError::from(err)
        })?;
        self.install_track(buffer)
    }

    /// Load an already-read file
    ///
    /// Same as [`VgmPlayer::load`]; the buffer is handed to the storage
    /// provider when it is released.
    pub fn load_bytes(&mut self, buffer: Vec<u8>) -> Result<TrackInfo> {
        self.detect_chip()?;
        self.discard_track();
        self.install_track(buffer)
    }

    /// Start playback from the beginning of the stream
    ///
    /// Does nothing if already playing.
    pub fn start(&mut self) -> Result<()> {
        if self.playing {
            return Ok(());
        }

        {
            let mut engine = self.engine.lock();
            if engine.track.is_none() {
                return Err(VgmError::NotLoaded);
            }
            engine.decoder.reset();
        }

        let engine = Arc::clone(&self.engine);
        self.ticker.install(Box::new(move || {
            if let Some(mut engine) = engine.try_lock() {
                engine.tick();
            }
        }));
        self.playing = true;
        log::info!("playback started at {} Hz", self.timing.tick_rate_hz);
        Ok(())
    }

    /// Stop playback and silence the chip
    ///
    /// No chip write from the tick path happens after this returns.
    pub fn stop(&mut self) {
        self.ticker.uninstall();

        let mut engine = self.engine.lock();
        engine.chip.reset();
        if self.playing {
            let stats = engine.decoder.stats();
            log::info!("playback stopped");
            log::debug!(
                "decoder: {} ticks, {} records, {} writes, {} skipped, {} loops",
                stats.ticks,
                stats.records,
                stats.register_writes,
                stats.skipped,
                stats.loops
            );
        }
        self.playing = false;
    }

    /// Stop playback and release the track
    pub fn unload(&mut self) {
        if self.discard_track() {
            log::info!("track unloaded");
        }
    }

    /// Current controller state
    pub fn state(&self) -> PlayerState {
        if self.playing {
            PlayerState::Playing
        } else if self.engine.lock().track.is_some() {
            PlayerState::Loaded
        } else {
            PlayerState::Unloaded
        }
    }

    /// Facts about the loaded track
    pub fn track_info(&self) -> Option<TrackInfo> {
        self.engine.lock().track.as_ref().map(|track| track.info)
    }

    /// Stream cursor and outstanding wait in native samples
    pub fn position(&self) -> (usize, i64) {
        let engine = self.engine.lock();
        (engine.decoder.cursor(), engine.decoder.pending_samples())
    }

    /// True once the stream ran out without an end command
    pub fn is_finished(&self) -> bool {
        self.engine.lock().decoder.is_finished()
    }

    /// Decoder counters since the last start
    pub fn stats(&self) -> DecoderStats {
        self.engine.lock().decoder.stats()
    }

    /// Playback time since the last start
    pub fn elapsed_seconds(&self) -> f64 {
        self.timing.samples_to_secs(self.stats().samples_elapsed)
    }

    /// Decode the loaded stream up to its first end command
    ///
    /// Every command is logged at debug level. Does not touch the chip or
    /// the playback position.
    pub fn dump(&self) -> Result<Vec<Command>> {
        let engine = self.engine.lock();
        let track = engine.track.as_ref().ok_or(VgmError::NotLoaded)?;
        let stream = track.stream();

        let mut commands = Vec::new();
        let mut pos = 0;
        while let Some((command, len)) = decode(stream, pos) {
            log::debug!("{:#08x}: {}", track.info.stream_start + pos, command);
            commands.push(command);
            if command == Command::End {
                break;
            }
            pos += len;
        }
        Ok(commands)
    }

    /// Run `f` with the chip (the tick path is held off meanwhile)
    pub fn with_chip<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.engine.lock().chip)
    }

    /// Timing configuration
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Storage provider
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Tick source
    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    fn detect_chip(&mut self) -> Result<()> {
        let found = self.engine.lock().chip.detect();
        if !found {
            log::warn!("OPL2 not detected");
            return Err(VgmError::ChipNotFound);
        }
        Ok(())
    }

    /// Stop, then release the current track; true if there was one
    fn discard_track(&mut self) -> bool {
        self.stop();
        let track = self.engine.lock().track.take();
        match track {
            Some(track) => {
                self.storage.release(track.buffer);
                true
            }
            None => false,
        }
    }

    fn install_track(&mut self, buffer: Vec<u8>) -> Result<TrackInfo> {
        let (header, bounds) = match header::validate(&buffer) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("rejected VGM file: {err}");
                self.storage.release(buffer);
                return Err(err);
            }
        };

        let info = TrackInfo::new(&header, bounds);
        {
            let mut engine = self.engine.lock();
            engine.decoder.reset();
            engine.track = Some(LoadedTrack { buffer, info });
        }
        log::info!(
            "loaded VGM {} ({} byte stream at {:#x}, {} samples)",
            info.version_string(),
            info.stream_length,
            info.stream_start,
            info.total_samples
        );
        Ok(info)
    }
}

impl<C: ChipBackend + 'static, S: Storage, T: TickSource> Drop for VgmPlayer<C, S, T> {
    fn drop(&mut self) {
        self.unload();
    }
}
