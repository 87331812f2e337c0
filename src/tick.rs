//! Tick service: a free-running 100 µs counter plus named stopwatches.
//!
//! The periodic timer interrupt calls [`TickService::advance`]; everything
//! else only ever reads differences, so counter wraparound is harmless
//! (2^32 ticks is roughly five days, far beyond any measured interval).
//!
//! Stopwatch marks are atomics because their owners live in different
//! contexts: the PWM mark in the tick ISR, the edge mark in the RPM ISR,
//! the dimmer and check marks in the main loop.

use core::sync::atomic::{AtomicU32, Ordering};

/// Named stopwatch slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StopwatchId {
    /// PWM period tracking (tick ISR).
    Pwm = 0,
    /// Time since the last RPM edge (edge ISR + staleness check).
    RpmEdge = 1,
    /// Pulse-phase timing of the active dimmer (main loop).
    Dimmer = 2,
    /// Coarse periodic check interval (main loop).
    Check = 3,
}

impl StopwatchId {
    pub const COUNT: usize = 4;
}

/// Monotonic tick counter with independent stopwatch marks.
pub struct TickService {
    now: AtomicU32,
    marks: [AtomicU32; StopwatchId::COUNT],
}

impl TickService {
    pub const fn new() -> Self {
        Self {
            now: AtomicU32::new(0),
            marks: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Advance by one tick.  Called only from the periodic timer ISR.
    pub fn advance(&self) {
        self.now.fetch_add(1, Ordering::Relaxed);
    }

    /// Current tick count.
    pub fn now(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }

    /// Record the current tick in stopwatch `id`.
    pub fn reset(&self, id: StopwatchId) {
        self.marks[id as usize].store(self.now(), Ordering::Relaxed);
    }

    /// Ticks since stopwatch `id` was last reset (wraparound-safe).
    pub fn elapsed(&self, id: StopwatchId) -> u32 {
        self.now()
            .wrapping_sub(self.marks[id as usize].load(Ordering::Relaxed))
    }
}

impl Default for TickService {
    fn default() -> Self {
        Self::new()
    }
}
