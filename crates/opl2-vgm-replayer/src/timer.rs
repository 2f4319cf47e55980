//! Periodic tick sources
//!
//! A [`TickSource`] invokes one installed callback at a fixed rate. The
//! player installs the decoder on `start` and uninstalls it on `stop`;
//! once [`TickSource::uninstall`] returns the callback is never invoked
//! again.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callback invoked once per tick
///
/// It must not block: it runs in interrupt-like context.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Periodic timer facility
pub trait TickSource: Send {
    /// Install `callback`, replacing any installed one
    fn install(&mut self, callback: TickCallback);

    /// Remove the installed callback; synchronous
    fn uninstall(&mut self);

    /// True while a callback is installed
    fn is_installed(&self) -> bool;
}

impl<T: TickSource + ?Sized> TickSource for Box<T> {
    fn install(&mut self, callback: TickCallback) {
        (**self).install(callback)
    }

    fn uninstall(&mut self) {
        (**self).uninstall()
    }

    fn is_installed(&self) -> bool {
        (**self).is_installed()
    }
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Tick source backed by a dedicated host thread
pub struct ThreadTicker {
    period: Duration,
    worker: Option<Worker>,
}

impl ThreadTicker {
    /// Create a ticker firing `rate_hz` times per second (at least once)
    pub fn new(rate_hz: u32) -> Self {
        ThreadTicker {
            period: Duration::from_secs(1) / rate_hz.max(1),
            worker: None,
        }
    }

    /// Interval between ticks
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for ThreadTicker {
    fn install(&mut self, mut callback: TickCallback) {
        self.uninstall();

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let period = self.period;

        let handle = std::thread::spawn(move || {
            let mut next = Instant::now() + period;
            'ticks: loop {
                // Woken early by uninstall
                loop {
                    if !running_clone.load(Ordering::Acquire) {
                        break 'ticks;
                    }
                    let now = Instant::now();
                    if now >= next {
                        break;
                    }
                    std::thread::park_timeout(next - now);
                }
                callback();
                next += period;
            }
        });

        self.worker = Some(Worker { running, handle });
    }

    fn uninstall(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.running.store(false, Ordering::Release);
            worker.handle.thread().unpark();
            if worker.handle.join().is_err() {
                log::warn!("tick thread panicked");
            }
        }
    }

    fn is_installed(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Tick source fired explicitly by the host
///
/// Clones share the installed callback, so one handle can be given to the
/// player while another drives it.
#[derive(Clone, Default)]
pub struct ManualTicker {
    slot: Arc<Mutex<Option<TickCallback>>>,
}

impl ManualTicker {
    /// Create a ticker with nothing installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the installed callback once; false if none is installed
    pub fn fire(&self) -> bool {
        match self.slot.lock().as_mut() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Fire `ticks` times, returning how many ticks reached a callback
    pub fn fire_n(&self, ticks: usize) -> usize {
        (0..ticks).filter(|_| self.fire()).count()
    }
}

impl TickSource for ManualTicker {
    fn install(&mut self, callback: TickCallback) {
        *self.slot.lock() = Some(callback);
    }

    fn uninstall(&mut self) {
        self.slot.lock().take();
    }

    fn is_installed(&self) -> bool {
        self.slot.lock().is_some()
    }
}
