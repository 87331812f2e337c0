//! State shared between interrupt context and the main loop.
//!
//! Everything here is atomic or otherwise ISR-safe, so a single `static`
//! instance can be reached from the tick callback, the RPM edge ISR and
//! the main loop without locking.

use embedded_hal::digital::OutputPin;

use crate::drivers::pwm::{DutyLatch, PwmDriver};
use crate::rpm::RpmEstimator;
use crate::tick::TickService;

pub struct Shared {
    pub ticks: TickService,
    pub rpm: RpmEstimator,
    pub duties: DutyLatch,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            ticks: TickService::new(),
            rpm: RpmEstimator::new(),
            duties: DutyLatch::new(),
        }
    }

    /// Periodic tick: advance time, filter RPM, then drive the outputs.
    pub fn on_tick<P: OutputPin>(&self, pwm: &mut PwmDriver<P>) {
        self.ticks.advance();
        self.rpm.filter_tick();
        pwm.tick(&self.ticks, &self.duties);
    }

    /// Rising edge on the RPM input.
    pub fn on_rpm_edge(&self) {
        self.rpm.on_edge(&self.ticks);
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
