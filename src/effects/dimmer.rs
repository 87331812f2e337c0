//! RPM-windowed dimmer with a four-phase brightness pulse.
//!
//! ```text
//!  1.0 ┤     ┌────┐            ┌────
//!      │    ╱      ╲          ╱
//!  0.0 ┤───╱        ╲────────╱
//!        Rise  High  Fall  Low  Rise …
//! ```
//!
//! Phase durations come from the selected [`Dimmer`] in ticks and are
//! measured on the `Dimmer` stopwatch.

use crate::config::{ConfigRecord, DIMMER_COUNT, Dimmer};
use crate::tick::{StopwatchId, TickService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Rise,
    High,
    Fall,
    Low,
}

/// Pulse generator state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    phase: Phase,
    value: f64,
}

impl Pulse {
    pub const fn new() -> Self {
        Self {
            phase: Phase::High,
            value: 1.0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start over at the top of the High phase.
    pub fn restart(&mut self, ticks: &TickService) {
        self.phase = Phase::High;
        self.value = 1.0;
        ticks.reset(StopwatchId::Dimmer);
    }

    /// Evaluate the current phase and advance when its duration is spent.
    /// Returns the brightness multiplier in `0.0..=1.0`.
    pub fn step(&mut self, dimmer: &Dimmer, ticks: &TickService) -> f64 {
        let e = ticks.elapsed(StopwatchId::Dimmer);
        let (value, duration, next) = match self.phase {
            Phase::Rise => (ramp(e, dimmer.rise_ticks), dimmer.rise_ticks, Phase::High),
            Phase::High => (1.0, dimmer.high_ticks, Phase::Fall),
            Phase::Fall => (1.0 - ramp(e, dimmer.fall_ticks), dimmer.fall_ticks, Phase::Low),
            Phase::Low => (0.0, dimmer.low_ticks, Phase::Rise),
        };
        self.value = value.clamp(0.0, 1.0);
        if e >= u32::from(duration) {
            self.phase = next;
            ticks.reset(StopwatchId::Dimmer);
        }
        self.value
    }
}

impl Default for Pulse {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction of a phase elapsed.  A zero-length phase counts as complete.
fn ramp(elapsed: u32, duration: u16) -> f64 {
    if duration == 0 {
        1.0
    } else {
        f64::from(elapsed) / f64::from(duration)
    }
}

/// Whether the dimmer at `index` no longer covers `rpm` (window widened by
/// the dimmer hysteresis), or no dimmer is selected at all.
pub fn needs_reselect(index: u8, rpm: u16, record: &ConfigRecord) -> bool {
    let Some(dimmer) = record.dimmers.get(usize::from(index)) else {
        return true;
    };
    let hyst = u16::from(record.dim_hysteresis);
    rpm < dimmer.rpm_low.saturating_sub(hyst) || rpm > dimmer.rpm_high.saturating_add(hyst)
}

/// First dimmer whose un-widened window contains `rpm`.
pub fn find_window(rpm: u16, record: &ConfigRecord) -> Option<u8> {
    record
        .dimmers
        .iter()
        .position(|d| (d.rpm_low..=d.rpm_high).contains(&rpm))
        .map(|i| i as u8)
}

/// Index stored when no window matches.
pub const NO_DIMMER: u8 = DIMMER_COUNT as u8;
