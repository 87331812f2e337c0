//! Engine-speed estimator.
//!
//! Combines three activities that run in different contexts:
//!
//! - **Edge ISR** ([`RpmEstimator::on_edge`]): converts the period since
//!   the previous rising edge into a fresh target RPM.
//! - **Tick ISR** ([`RpmEstimator::filter_tick`]): slews the published RPM
//!   one unit toward the target every `filter_step` ticks.
//! - **Main loop** ([`RpmEstimator::check_stale`]): zeroes the target when
//!   edges stop arriving, so the reading ramps down instead of freezing.
//!
//! All state is atomic; no operation needs a critical section.

use core::sync::atomic::{AtomicU8, AtomicU16, Ordering};

use crate::config::{MIN_RPM_TICKS, RPM_TO_NUM};
use crate::tick::{StopwatchId, TickService};

pub struct RpmEstimator {
    /// Latest measurement (filter target).
    target: AtomicU16,
    /// Filtered RPM seen by the effect engine.
    current: AtomicU16,
    /// Ticks accumulated since the last one-unit step.
    accumulator: AtomicU8,
    /// Copy of the active record's filter step, published on promotion.
    filter_step: AtomicU8,
}

impl RpmEstimator {
    pub const fn new() -> Self {
        Self {
            target: AtomicU16::new(0),
            current: AtomicU16::new(0),
            accumulator: AtomicU8::new(0),
            filter_step: AtomicU8::new(1),
        }
    }

    /// Rising edge on the RPM input.
    pub fn on_edge(&self, ticks: &TickService) {
        let period = ticks.elapsed(StopwatchId::RpmEdge);
        ticks.reset(StopwatchId::RpmEdge);
        if let Some(rpm) = rpm_from_period(period) {
            self.target.store(rpm, Ordering::Relaxed);
        }
    }

    /// One step of the bounded-slew filter.  Runs once per tick.
    pub fn filter_tick(&self) {
        let acc = self.accumulator.load(Ordering::Relaxed).saturating_add(1);
        if acc < self.filter_step.load(Ordering::Relaxed) {
            self.accumulator.store(acc, Ordering::Relaxed);
            return;
        }
        self.accumulator.store(0, Ordering::Relaxed);

        let target = self.target.load(Ordering::Relaxed);
        let current = self.current.load(Ordering::Relaxed);
        if target > current {
            self.current.store(current + 1, Ordering::Relaxed);
        } else if target < current {
            self.current.store(current - 1, Ordering::Relaxed);
        }
    }

    /// Coarse staleness check.  Returns `true` when this call dropped a
    /// nonzero target to zero.
    pub fn check_stale(&self, ticks: &TickService) -> bool {
        if ticks.elapsed(StopwatchId::RpmEdge) > MIN_RPM_TICKS {
            return self.target.swap(0, Ordering::Relaxed) != 0;
        }
        false
    }

    /// Publish the active record's filter step to the tick ISR.
    pub fn set_filter_step(&self, step: u8) {
        self.filter_step.store(step, Ordering::Relaxed);
    }

    /// Filtered engine speed.
    pub fn rpm(&self) -> u16 {
        self.current.load(Ordering::Relaxed)
    }

    /// Most recent unfiltered measurement.
    pub fn target(&self) -> u16 {
        self.target.load(Ordering::Relaxed)
    }

    /// Jump both target and filtered value to `rpm`, skipping the slew.
    /// For bench setups and simulation.
    pub fn preset(&self, rpm: u16) {
        self.target.store(rpm, Ordering::Relaxed);
        self.current.store(rpm, Ordering::Relaxed);
    }
}

impl Default for RpmEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// `RPM_TO_NUM / period`, saturated to `u16`.  `None` for a zero period.
pub fn rpm_from_period(period_ticks: u32) -> Option<u16> {
    if period_ticks == 0 {
        return None;
    }
    Some(u16::try_from(RPM_TO_NUM / period_ticks).unwrap_or(u16::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(ticks: &TickService, n: u32) {
        for _ in 0..n {
            ticks.advance();
        }
    }

    #[test]
    fn period_converts_to_rpm() {
        // 100 ticks = 10 ms between edges, two edges per revolution → 3000 rpm.
        assert_eq!(rpm_from_period(100), Some(3000));
        assert_eq!(rpm_from_period(300_000), Some(1));
        assert_eq!(rpm_from_period(0), None);
        assert_eq!(rpm_from_period(1), Some(u16::MAX));
    }

    #[test]
    fn zero_period_edge_keeps_previous_target() {
        let ticks = TickService::new();
        let est = RpmEstimator::new();
        advance(&ticks, 100);
        est.on_edge(&ticks);
        assert_eq!(est.target(), 3000);
        est.on_edge(&ticks);
        assert_eq!(est.target(), 3000);
    }

    #[test]
    fn filter_moves_one_unit_per_step() {
        let est = RpmEstimator::new();
        est.target.store(10, Ordering::Relaxed);
        est.set_filter_step(3);
        for _ in 0..2 {
            est.filter_tick();
        }
        assert_eq!(est.rpm(), 0);
        est.filter_tick();
        assert_eq!(est.rpm(), 1);
        for _ in 0..300 {
            est.filter_tick();
        }
        assert_eq!(est.rpm(), 10);
    }

    #[test]
    fn filter_step_zero_moves_every_tick() {
        let est = RpmEstimator::new();
        est.set_filter_step(0);
        est.target.store(5, Ordering::Relaxed);
        for _ in 0..5 {
            est.filter_tick();
        }
        assert_eq!(est.rpm(), 5);
    }

    #[test]
    fn stale_signal_ramps_down() {
        let ticks = TickService::new();
        let est = RpmEstimator::new();
        est.set_filter_step(1);
        est.current.store(4, Ordering::Relaxed);
        est.target.store(4, Ordering::Relaxed);
        advance(&ticks, MIN_RPM_TICKS);
        assert!(!est.check_stale(&ticks));
        ticks.advance();
        assert!(est.check_stale(&ticks));
        assert_eq!(est.target(), 0);
        assert!(!est.check_stale(&ticks));
        for _ in 0..4 {
            est.filter_tick();
        }
        assert_eq!(est.rpm(), 0);
    }
}
