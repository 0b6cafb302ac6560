//! State shared between a player handle, its worker and its dispatcher.

use super::config::{OutputFormat, PlayerConfig};
use super::events::Signal;
use super::state::{PlayerState, StateCell};
use crate::codec::{Interrupt, SourceLocator};
use crate::effects::EffectSet;
use crate::framing::{SecureFramer, UdpTransport};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Host commands waiting for the worker.
#[derive(Debug)]
pub(crate) struct Control {
    pub source: Option<SourceLocator>,
    pub output: OutputFormat,
    pub effects: EffectSet,
    pub stop: bool,
    pub start: bool,
    pub paused: bool,
    pub seek: Option<f64>,
    pub bitrate_dirty: bool,
    /// A worker thread exists for this player.
    pub running: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Secure {
    pub framer: Option<SecureFramer>,
    pub transport: Option<UdpTransport>,
}

/// An `f64` stored as bits.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// Counters readable from any thread.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub time: AtomicF64,
    pub duration: AtomicF64,
    pub dropped_samples: AtomicU64,
    pub total_samples: AtomicU64,
    pub total_packets: AtomicU64,
    pub skipped_frames: AtomicU64,
    pub failed_transmits: AtomicU64,
    pub passthrough: AtomicBool,
}

impl Stats {
    pub(crate) fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

pub(crate) struct Shared {
    pub config: PlayerConfig,
    control: Mutex<Control>,
    cond: Condvar,
    pub destroyed: Interrupt,
    pub state: StateCell,
    pub stats: Stats,
    pub secure: Mutex<Secure>,
    signal: Mutex<Option<Signal>>,
}

impl Shared {
    pub(crate) fn new(config: PlayerConfig) -> Self {
        let control = Control {
            source: None,
            output: config.output,
            effects: EffectSet::new(),
            stop: false,
            start: false,
            paused: false,
            seek: None,
            bitrate_dirty: false,
            running: false,
        };
        Self {
            config,
            control: Mutex::new(control),
            cond: Condvar::new(),
            destroyed: Interrupt::new(),
            state: StateCell::new(PlayerState::Idle),
            stats: Stats::default(),
            secure: Mutex::new(Secure::default()),
            signal: Mutex::new(None),
        }
    }

    pub(crate) fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.is_triggered()
    }

    /// Wake the worker from any condition wait.
    pub(crate) fn notify(&self) {
        let _guard = self.control.lock();
        self.cond.notify_all();
    }

    /// Block while `blocked` holds and the player is not destroyed.
    pub(crate) fn wait_while<F>(&self, mut blocked: F) -> MutexGuard<'_, Control>
    where
        F: FnMut(&Control) -> bool,
    {
        let mut control = self.control.lock();
        while !self.is_destroyed() && blocked(&control) {
            self.cond.wait(&mut control);
        }
        control
    }

    /// Sleep until `deadline` unless stopped or destroyed first.
    ///
    /// Returns `false` if the sleep was cut short.
    pub(crate) fn sleep_until(&self, deadline: Instant) -> bool {
        let mut control = self.control.lock();
        loop {
            if self.is_destroyed() || control.stop {
                return false;
            }
            if self.cond.wait_until(&mut control, deadline).timed_out() {
                return !self.is_destroyed() && !control.stop;
            }
        }
    }

    pub(crate) fn put_signal(&self, signal: Signal) {
        *self.signal.lock() = Some(signal);
    }

    pub(crate) fn take_signal(&self) -> Option<Signal> {
        self.signal.lock().take()
    }
}
