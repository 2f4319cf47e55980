//! End-to-end playback tests against the emulated chip

use approx::assert_relative_eq;
use opl2::{DriverConfig, EmulatedOpl2, Opl2Driver};
use opl2_vgm_replayer::{
    Command, FsStorage, ManualTicker, PlayerState, Storage, StorageError, ThreadTicker,
    TickSource, TimingConfig, VgmError, VgmPlayer,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct MemoryState {
    files: HashMap<String, Vec<u8>>,
    reads: usize,
    releases: usize,
}

/// In-memory storage counting reads and releases
#[derive(Clone, Default)]
struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    fn with_file(name: &str, data: Vec<u8>) -> Self {
        let storage = Self::default();
        storage.add(name, data);
        storage
    }

    fn add(&self, name: &str, data: Vec<u8>) {
        self.state.lock().files.insert(name.to_string(), data);
    }

    fn reads(&self) -> usize {
        self.state.lock().reads
    }

    fn releases(&self) -> usize {
        self.state.lock().releases
    }
}

impl Storage for MemoryStorage {
    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, StorageError> {
        let mut state = self.state.lock();
        let data = state
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })?;
        state.reads += 1;
        Ok(data)
    }

    fn release(&mut self, _buffer: Vec<u8>) {
        self.state.lock().releases += 1;
    }
}

type TestPlayer = VgmPlayer<Opl2Driver<EmulatedOpl2>, MemoryStorage, ManualTicker>;

struct Rig {
    bus: EmulatedOpl2,
    storage: MemoryStorage,
    ticker: ManualTicker,
    player: TestPlayer,
}

fn rig_with(bus: EmulatedOpl2, storage: MemoryStorage, timing: TimingConfig) -> Rig {
    let ticker = ManualTicker::new();
    let chip = Opl2Driver::new(bus.clone(), DriverConfig::instant_detect());
    let player = VgmPlayer::with_timing(chip, storage.clone(), ticker.clone(), timing).unwrap();
    Rig {
        bus,
        storage,
        ticker,
        player,
    }
}

fn rig(storage: MemoryStorage) -> Rig {
    rig_with(
        EmulatedOpl2::new().with_write_log(),
        storage,
        TimingConfig::default(),
    )
}

/// Minimal VGM file: 0x40-byte header followed by `stream`
fn vgm_file(version: u32, stream: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 0x40];
    data.extend_from_slice(stream);
    let eof = (data.len() - 4) as u32;
    data[0x00..0x04].copy_from_slice(b"Vgm ");
    data[0x04..0x08].copy_from_slice(&eof.to_le_bytes());
    data[0x08..0x0C].copy_from_slice(&version.to_le_bytes());
    data[0x34..0x38].copy_from_slice(&0x0Cu32.to_le_bytes());
    data
}

fn assert_rejected(data: Vec<u8>, check: impl FnOnce(&VgmError) -> bool) {
    let mut rig = rig(MemoryStorage::with_file("bad.vgm", data));
    let err = rig.player.load("bad.vgm").unwrap_err();
    assert!(check(&err), "unexpected error {err:?}");
    assert_eq!(rig.player.state(), PlayerState::Unloaded);
    assert_eq!(rig.storage.reads(), 1);
    assert_eq!(rig.storage.releases(), 1);
    assert!(matches!(rig.player.start(), Err(VgmError::NotLoaded)));
}

#[test]
fn minimal_track_loops_without_chip_writes() {
    let mut rig = rig(MemoryStorage::with_file("min.vgm", vgm_file(0x151, &[0x66])));

    let info = rig.player.load("min.vgm").unwrap();
    assert_eq!(info.stream_length, 1);
    assert_eq!(info.stream_start + info.stream_length, info.file_size);
    assert_eq!(rig.player.state(), PlayerState::Loaded);

    rig.player.start().unwrap();
    assert_eq!(rig.player.position(), (0, 0));
    rig.bus.clear_log();

    assert!(rig.ticker.fire());
    assert_eq!(rig.player.position().0, 0);
    assert_eq!(rig.bus.data_writes(), 0);
    assert_eq!(rig.player.stats().loops, 1);
}

#[test]
fn old_version_is_rejected_and_released() {
    assert_rejected(vgm_file(0x100, &[0x66]), |err| {
        matches!(err, VgmError::UnsupportedVersion { version: 0x100 })
    });
}

#[test]
fn header_failures_are_specific() {
    let mut bad_magic = vgm_file(0x151, &[0x66]);
    bad_magic[0..4].copy_from_slice(b"Vgz ");
    assert_rejected(bad_magic, |err| {
        matches!(err, VgmError::BadMagic { found } if found == b"Vgz ")
    });

    let mut bad_eof = vgm_file(0x151, &[0x66]);
    bad_eof[4..8].copy_from_slice(&0x1000u32.to_le_bytes());
    assert_rejected(bad_eof, |err| {
        matches!(
            err,
            VgmError::SizeMismatch {
                eof_offset: 0x1000,
                file_size: 0x41
            }
        )
    });

    let mut no_offset = vgm_file(0x151, &[0x66]);
    no_offset[0x34..0x38].copy_from_slice(&0u32.to_le_bytes());
    assert_rejected(no_offset, |err| {
        matches!(err, VgmError::InvalidDataOffset { data_offset: 0, .. })
    });

    assert_rejected(vec![0x1F, 0x8B, 0x08, 0x00, 0x00], |err| {
        matches!(err, VgmError::Compressed)
    });

    assert_rejected(b"Vgm ".to_vec(), |err| {
        matches!(err, VgmError::HeaderTooShort { len: 4 })
    });
}

#[test]
fn missing_chip_fails_before_reading() {
    let storage = MemoryStorage::with_file("song.vgm", vgm_file(0x151, &[0x66]));
    let mut rig = rig_with(EmulatedOpl2::absent(), storage, TimingConfig::default());

    assert!(matches!(
        rig.player.load("song.vgm"),
        Err(VgmError::ChipNotFound)
    ));
    assert_eq!(rig.storage.reads(), 0);
    assert_eq!(rig.player.state(), PlayerState::Unloaded);
}

#[test]
fn missing_file_propagates_storage_error() {
    let mut rig = rig(MemoryStorage::default());
    match rig.player.load("nope.vgm") {
        Err(VgmError::Storage(StorageError::NotFound { name })) => assert_eq!(name, "nope.vgm"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(rig.storage.releases(), 0);
}

#[test]
fn stop_is_idempotent() {
    let stream = [0x5A, 0x20, 0x01, 0x5A, 0x40, 0x10, 0x5A, 0xB0, 0x31, 0x62, 0x66];
    let mut rig = rig(MemoryStorage::with_file("song.vgm", vgm_file(0x151, &stream)));
    rig.player.load("song.vgm").unwrap();
    rig.player.start().unwrap();
    rig.ticker.fire_n(3);
    assert!(!rig.bus.is_silent());

    rig.player.stop();
    let once = rig.bus.registers();
    assert!(once.is_silent());
    assert_eq!(rig.player.state(), PlayerState::Loaded);

    rig.player.stop();
    assert_eq!(rig.bus.registers(), once);
    assert_eq!(rig.player.state(), PlayerState::Loaded);
    assert!(!rig.ticker.is_installed());
}

#[test]
fn frame_waits_advance_time_exactly() {
    let frames = 60;
    let stream = vec![0x62; frames];
    let storage = MemoryStorage::with_file("frames.vgm", vgm_file(0x151, &stream));
    let mut rig = rig_with(EmulatedOpl2::new(), storage, TimingConfig::vsync_60hz());
    rig.player.load("frames.vgm").unwrap();
    rig.player.start().unwrap();

    rig.ticker.fire_n(frames);
    let stats = rig.player.stats();
    let expected = (frames * 735) as i64;
    assert!((stats.stream_samples as i64 - expected).abs() <= 735);
    assert_eq!(stats.samples_elapsed as i64, expected);
    assert_relative_eq!(rig.player.elapsed_seconds(), 1.0, epsilon = 1e-9);
}

#[test]
fn frame_waits_at_100hz_do_not_drift() {
    let frames = 60;
    let stream = vec![0x62; frames];
    let mut rig = rig(MemoryStorage::with_file(
        "frames.vgm",
        vgm_file(0x151, &stream),
    ));
    rig.player.load("frames.vgm").unwrap();
    rig.player.start().unwrap();

    // 60 frames of 735 samples are exactly 100 ticks of 441
    rig.ticker.fire_n(100);
    let stats = rig.player.stats();
    assert_eq!(stats.stream_samples, 60 * 735);
    assert_eq!(stats.samples_elapsed, 100 * 441);
    assert_relative_eq!(rig.player.elapsed_seconds(), 1.0, epsilon = 1e-9);

    // The hundredth tick ran out of stream; time stops there
    assert!(rig.player.is_finished());
    rig.ticker.fire_n(5);
    assert_eq!(rig.player.stats().ticks, 105);
    assert_eq!(rig.player.stats().samples_elapsed, 100 * 441);
    assert_eq!(rig.player.position().0, frames);
    assert_eq!(rig.player.state(), PlayerState::Playing);
}

#[test]
fn end_of_stream_loops_without_revalidating() {
    let stream = [0x5A, 0x20, 0x01, 0x62, 0x66];
    let mut rig = rig(MemoryStorage::with_file("loop.vgm", vgm_file(0x151, &stream)));
    rig.player.load("loop.vgm").unwrap();
    rig.player.start().unwrap();
    rig.bus.clear_log();

    rig.ticker.fire();
    assert_eq!(rig.bus.take_write_log(), vec![(0x20, 0x01)]);
    assert_eq!(rig.player.position(), (4, 735 - 441));

    rig.ticker.fire();
    assert!(rig.bus.take_write_log().is_empty());

    rig.ticker.fire();
    assert_eq!(rig.player.position().0, 0);
    assert_eq!(rig.player.stats().loops, 1);

    rig.ticker.fire();
    assert_eq!(rig.bus.take_write_log(), vec![(0x20, 0x01)]);
    assert_eq!(rig.storage.reads(), 1);
}

#[test]
fn data_block_payload_is_not_decoded() {
    let stream = [
        0x67, 0x66, 0x00, 0x04, 0x00, 0x00, 0x00, 0x5A, 0xB0, 0x31, 0x62, 0x66,
    ];
    let mut rig = rig(MemoryStorage::with_file("block.vgm", vgm_file(0x151, &stream)));
    rig.player.load("block.vgm").unwrap();

    assert_eq!(
        rig.player.dump().unwrap(),
        vec![Command::DataBlock { kind: 0, size: 4 }, Command::End]
    );

    rig.player.start().unwrap();
    rig.bus.clear_log();
    rig.ticker.fire();
    assert_eq!(rig.bus.data_writes(), 0);
    assert_eq!(rig.player.position().0, 0);
    let stats = rig.player.stats();
    assert_eq!(stats.data_blocks, 1);
    assert_eq!(stats.loops, 1);
}

#[test]
fn loading_replaces_active_track() {
    let storage = MemoryStorage::default();
    storage.add("a.vgm", vgm_file(0x151, &[0x5A, 0xB0, 0x31, 0x62, 0x66]));
    storage.add("b.vgm", vgm_file(0x161, &[0x62, 0x66]));
    let mut rig = rig(storage);

    rig.player.load("a.vgm").unwrap();
    rig.player.start().unwrap();
    rig.ticker.fire();
    assert_eq!(rig.bus.register(0xB0), 0x31);

    let info = rig.player.load("b.vgm").unwrap();
    assert_eq!(info.version_string(), "1.61");
    assert_eq!(rig.storage.releases(), 1);
    assert_eq!(rig.player.state(), PlayerState::Loaded);
    assert!(!rig.ticker.is_installed());
    assert!(rig.bus.is_silent());

    // A rejected replacement leaves nothing loaded
    rig.storage.add("c.vgm", vgm_file(0x150, &[0x66]));
    assert!(rig.player.load("c.vgm").is_err());
    assert_eq!(rig.player.state(), PlayerState::Unloaded);
    assert_eq!(rig.storage.releases(), 3);
}

#[test]
fn failed_detection_keeps_current_track_playing() {
    let storage = MemoryStorage::default();
    storage.add("a.vgm", vgm_file(0x151, &[0x5A, 0x20, 0x01, 0x62, 0x66]));
    storage.add("b.vgm", vgm_file(0x151, &[0x66]));
    let mut rig = rig(storage);

    let info = rig.player.load("a.vgm").unwrap();
    rig.player.start().unwrap();
    rig.ticker.fire();
    let ticks = rig.player.stats().ticks;

    rig.bus.set_present(false);
    assert!(matches!(
        rig.player.load("b.vgm"),
        Err(VgmError::ChipNotFound)
    ));
    assert_eq!(rig.player.state(), PlayerState::Playing);
    assert_eq!(rig.player.track_info(), Some(info));
    assert_eq!(rig.storage.reads(), 1);
    assert_eq!(rig.storage.releases(), 0);
    assert!(rig.ticker.is_installed());

    rig.bus.set_present(true);
    rig.bus.clear_log();
    rig.ticker.fire_n(3);
    assert_eq!(rig.player.stats().ticks, ticks + 3);
    assert_eq!(rig.bus.take_write_log(), vec![(0x20, 0x01)]);
}

#[test]
fn restart_rewinds_stream() {
    let stream = [0x5A, 0x20, 0x01, 0x62, 0x5A, 0x20, 0x02, 0x62, 0x66];
    let mut rig = rig(MemoryStorage::with_file("song.vgm", vgm_file(0x151, &stream)));
    rig.player.load("song.vgm").unwrap();
    rig.player.start().unwrap();
    rig.ticker.fire_n(3);
    assert_ne!(rig.player.position(), (0, 0));

    // Starting while playing keeps the position
    let before = rig.player.position();
    rig.player.start().unwrap();
    assert_eq!(rig.player.position(), before);

    rig.player.stop();
    rig.player.start().unwrap();
    assert_eq!(rig.player.position(), (0, 0));
    assert_eq!(rig.player.stats().ticks, 0);
}

#[test]
fn unload_and_drop_release_once() {
    let storage = MemoryStorage::with_file("song.vgm", vgm_file(0x151, &[0x62, 0x66]));
    let mut rig = rig(storage.clone());
    rig.player.load("song.vgm").unwrap();
    rig.player.unload();
    rig.player.unload();
    assert_eq!(storage.releases(), 1);

    rig.player.load("song.vgm").unwrap();
    rig.player.start().unwrap();
    drop(rig);
    assert_eq!(storage.releases(), 2);
}

#[test]
fn invalid_timing_is_rejected() {
    let chip = Opl2Driver::new(EmulatedOpl2::new(), DriverConfig::instant_detect());
    let timing = TimingConfig {
        tick_rate_hz: 0,
        ..TimingConfig::default()
    };
    let result = VgmPlayer::with_timing(chip, MemoryStorage::default(), ManualTicker::new(), timing);
    assert!(matches!(result, Err(VgmError::InvalidConfig(_))));
}

#[test]
fn plays_from_disk_on_thread_ticker() {
    let dir = tempfile::tempdir().unwrap();
    let stream = [0x5A, 0x20, 0x01, 0x5A, 0xB0, 0x31, 0x7F, 0x5A, 0xB0, 0x11, 0x66];
    std::fs::write(dir.path().join("song.vgm"), vgm_file(0x171, &stream)).unwrap();

    let bus = EmulatedOpl2::new();
    let chip = Opl2Driver::new(bus.clone(), DriverConfig::instant_detect());
    let mut player = VgmPlayer::new(chip, FsStorage::new(dir.path()), ThreadTicker::new(100));

    player.load("song.vgm").unwrap();
    player.start().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    player.stop();

    let stats = player.stats();
    assert!(stats.ticks > 0);
    assert!(stats.loops > 0);
    assert!(stats.register_writes >= 3);
    assert!(bus.is_silent());

    let settled = bus.data_writes();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(bus.data_writes(), settled);
}
