//! # Shared Engine State
//!
//! Everything the four concurrent activities read or write, each field
//! behind its own lock or atomic.
//!
//! | Field | Written by | Read by |
//! |-------|-----------|---------|
//! | running | dispatch loop (`end`), Ctrl+C | all |
//! | ready | dispatcher (false), response receiver (true) | dispatch loop |
//! | last command | dispatcher | response receiver, watch rows |
//! | device state / info | telemetry + response receivers | `info`, watch rows |
//! | watch log | dispatch loop (selection), telemetry receiver (rows) | `log` |
//! | timers | dispatcher, scheduler, dispatch loop | scheduler, dispatch loop |
//! | frames remaining | scheduler, `state n` | telemetry receiver |
//! | queue | dispatch loop | dispatch loop |
//!
//! Locks are never held across an `.await`. When two are needed the order
//! is device, then watch.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::warn;

use super::queue::CommandQueue;
use crate::error::{Result, TelloError};
use crate::telemetry::state::{DeviceInfo, DeviceState};
use crate::telemetry::watch::{WatchFormat, WatchLog};

/// Lock a mutex, recovering the data if another task panicked while
/// holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest telemetry plus its numeric projection.
#[derive(Debug, Clone, Default)]
pub struct DeviceSnapshot {
    pub state: DeviceState,
    pub info: DeviceInfo,
}

/// Longest accepted telemetry sampling period, in seconds.
pub const MAX_SAMPLE_PERIOD_S: f64 = 86_400.0;

/// Convert a sampling period in seconds.
///
/// Zero, negative and negative-infinite values turn sampling off (`None`).
///
/// # Errors
///
/// Returns [`TelloError::InvalidArgument`] for NaN or anything above
/// [`MAX_SAMPLE_PERIOD_S`].
pub fn sample_period(period_s: f64) -> Result<Option<Duration>> {
    if period_s.is_nan() || period_s > MAX_SAMPLE_PERIOD_S {
        return Err(TelloError::InvalidArgument {
            command: "watchperiod",
            reason: format!("period must be a number of at most {} seconds", MAX_SAMPLE_PERIOD_S),
        });
    }
    if period_s <= 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(period_s)
        .map(Some)
        .map_err(|e| TelloError::InvalidArgument {
            command: "watchperiod",
            reason: e.to_string(),
        })
}

/// Keepalive, sampling and deferred-wake deadlines.
#[derive(Debug, Clone)]
pub struct Timers {
    pub keepalive: Instant,
    pub next_sample: Instant,
    pub sample_period: Option<Duration>,
    pub wake: Option<Instant>,
}

impl Timers {
    /// An unusable `period_s` leaves sampling off.
    #[must_use]
    pub fn new(now: Instant, keepalive_interval: Duration, period_s: f64) -> Self {
        let sample_period = sample_period(period_s).unwrap_or_else(|e| {
            warn!("{}, sampling off", e);
            None
        });
        Self {
            keepalive: now + keepalive_interval,
            next_sample: now,
            sample_period,
            wake: None,
        }
    }

    /// Set the sampling period in seconds; see [`sample_period`]. A new
    /// period takes its first sample on the next scheduler tick.
    ///
    /// # Errors
    ///
    /// Returns [`TelloError::InvalidArgument`] and keeps the current period
    /// if `period_s` is unusable.
    pub fn set_sample_period(&mut self, period_s: f64, now: Instant) -> Result<()> {
        self.sample_period = sample_period(period_s)?;
        self.next_sample = now;
        Ok(())
    }

    #[must_use]
    pub fn wake_pending(&self) -> bool {
        self.wake.is_some()
    }
}

/// State shared between the receivers, the scheduler and the dispatch loop.
pub struct SharedState {
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    ready: AtomicBool,
    frames_remaining: AtomicU32,
    last_command: Mutex<String>,
    device: Mutex<DeviceSnapshot>,
    watch: Mutex<WatchLog>,
    timers: Mutex<Timers>,
    queue: Mutex<CommandQueue>,
    console: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("running", &self.is_running())
            .field("ready", &self.is_ready())
            .field("frames_remaining", &self.frames_remaining())
            .finish_non_exhaustive()
    }
}

impl SharedState {
    pub fn new(watch_format: WatchFormat, timers: Timers, console: Box<dyn Write + Send>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            running: AtomicBool::new(true),
            shutdown,
            ready: AtomicBool::new(true),
            frames_remaining: AtomicU32::new(0),
            last_command: Mutex::new(String::new()),
            device: Mutex::new(DeviceSnapshot::default()),
            watch: Mutex::new(WatchLog::new(watch_format)),
            timers: Mutex::new(timers),
            queue: Mutex::new(CommandQueue::new()),
            console: Mutex::new(console),
        }
    }

    // ==================== Lifecycle ====================

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wake every task waiting on shutdown.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
    }

    /// Receiver that changes to `true` once [`SharedState::stop`] is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    // ==================== Readiness ====================

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    // ==================== Frames remaining ====================

    pub fn request_frames(&self, frames: u32) {
        self.frames_remaining.store(frames, Ordering::SeqCst);
    }

    pub fn frames_remaining(&self) -> u32 {
        self.frames_remaining.load(Ordering::SeqCst)
    }

    /// Consume one pending frame. Returns false if none was pending.
    pub fn take_frame(&self) -> bool {
        self.frames_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    // ==================== Locked fields ====================

    pub fn last_command(&self) -> String {
        lock(&self.last_command).clone()
    }

    pub fn set_last_command(&self, command: &str) {
        let mut last = lock(&self.last_command);
        last.clear();
        last.push_str(command);
    }

    pub fn device(&self) -> MutexGuard<'_, DeviceSnapshot> {
        lock(&self.device)
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.device().info
    }

    pub fn watch(&self) -> MutexGuard<'_, WatchLog> {
        lock(&self.watch)
    }

    pub fn timers(&self) -> MutexGuard<'_, Timers> {
        lock(&self.timers)
    }

    pub fn queue(&self) -> MutexGuard<'_, CommandQueue> {
        lock(&self.queue)
    }

    // ==================== Console ====================

    /// Write one line of user-facing output.
    pub fn say(&self, line: &str) {
        let mut console = lock(&self.console);
        if let Err(e) = writeln!(console, "{}", line).and_then(|_| console.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }

    /// Write the watch log to the console. Returns the number of records.
    pub fn flush_watch_log(&self) -> io::Result<usize> {
        let watch = self.watch();
        let mut console = lock(&self.console);
        watch.flush_to(&mut **console)
    }
}
