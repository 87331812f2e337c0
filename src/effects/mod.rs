//! Effect engine: RPM → colour duties and starter enable.
//!
//! Two cadences:
//!
//! - [`EffectEngine::select`] runs on the coarse check interval and moves
//!   the breakpoint / dimmer selection with hysteresis.
//! - [`EffectEngine::compute`] runs every main-loop pass and turns the
//!   current selection into a [`DutyCycles`] set for the PWM driver.

pub mod breakpoint;
pub mod dimmer;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::{ConfigRecord, PWM_PERIOD};
use crate::tick::TickService;

use breakpoint::Coefficients;
use dimmer::{NO_DIMMER, Pulse};

/// One PWM period's worth of output, in ticks of `PWM_PERIOD`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DutyCycles {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// `0` (inhibit) or `PWM_PERIOD` (enabled).
    pub starter: u8,
}

impl DutyCycles {
    pub const OFF: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
        starter: 0,
    };

    pub fn colours(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Runtime effect state derived from the active record.
pub struct EffectEngine {
    breakpoint: u8,
    dimmer: u8,
    dimmer_enabled: bool,
    coefficients: Coefficients,
    pulse: Pulse,
    starter_on: bool,
}

impl EffectEngine {
    pub const fn new() -> Self {
        Self {
            breakpoint: 0,
            dimmer: NO_DIMMER,
            dimmer_enabled: false,
            coefficients: Coefficients {
                channels: [breakpoint::Line {
                    slope: 0.0,
                    offset: 0.0,
                }; 3],
            },
            pulse: Pulse::new(),
            starter_on: false,
        }
    }

    /// Adopt the selection stored in a freshly promoted record.
    pub fn resync(&mut self, active: &ConfigRecord) {
        self.breakpoint = active.active_breakpoint;
        self.dimmer = active.active_dimmer;
        self.dimmer_enabled = active.dimmer_enabled;
        self.coefficients = Coefficients::compute(self.breakpoint, active);
    }

    /// Coarse-interval selection update.
    pub fn select(
        &mut self,
        rpm: u16,
        active: &ConfigRecord,
        ticks: &TickService,
        sink: &mut impl EventSink,
    ) {
        let next = breakpoint::select(self.breakpoint, rpm, active);
        if next != self.breakpoint {
            sink.emit(&AppEvent::BreakpointChanged {
                from: self.breakpoint,
                to: next,
                rpm,
            });
            self.breakpoint = next;
            self.coefficients = Coefficients::compute(next, active);
        }

        if dimmer::needs_reselect(self.dimmer, rpm, active) {
            let found = dimmer::find_window(rpm, active);
            self.dimmer = found.unwrap_or(NO_DIMMER);
            self.dimmer_enabled = found.is_some();
            self.pulse.restart(ticks);
            sink.emit(&AppEvent::DimmerChanged { to: found, rpm });
        }
    }

    /// Per-pass output computation.
    pub fn compute(&mut self, rpm: u16, active: &ConfigRecord, ticks: &TickService) -> DutyCycles {
        let mut values = self.coefficients.eval(rpm);

        let profile = active.dimmers.get(usize::from(self.dimmer));
        if let (true, Some(profile)) = (self.dimmer_enabled, profile) {
            let level = self.pulse.step(profile, ticks);
            for v in &mut values {
                *v *= level;
            }
        }

        if rpm >= active.starter_off_rpm {
            self.starter_on = false;
        } else if rpm <= active.starter_on_rpm {
            self.starter_on = true;
        }

        let [red, green, blue] = values.map(to_duty);
        DutyCycles {
            red,
            green,
            blue,
            starter: if self.starter_on { PWM_PERIOD } else { 0 },
        }
    }

    pub fn breakpoint(&self) -> u8 {
        self.breakpoint
    }

    /// Selected dimmer, if any and enabled.
    pub fn dimmer(&self) -> Option<u8> {
        (self.dimmer_enabled && self.dimmer < NO_DIMMER).then_some(self.dimmer)
    }

    pub fn starter_on(&self) -> bool {
        self.starter_on
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounding slack of a line evaluation.  `rpm * slope` reaches ~6.5e6, so
/// the error stays in the low 1e-9s; a segment's exact value is never
/// closer than `1 / u16::MAX` to an integer without being one.
const DUTY_SNAP: f64 = 1e-6;

/// Truncate a channel value to whole duty ticks within one period.
///
/// Values within [`DUTY_SNAP`] below an integer count as that integer, so a
/// segment evaluated at either of its nodes yields the stored duty.
fn to_duty(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value + DUTY_SNAP).clamp(0.0, f64::from(PWM_PERIOD)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::NullSink;

    fn demo() -> ConfigRecord {
        let mut rec = ConfigRecord::default();
        rec.apply_demo();
        rec
    }

    #[test]
    fn idle_engine_shows_first_node() {
        let mut rec = demo();
        rec.dimmer_enabled = false;
        let ticks = TickService::new();
        let mut fx = EffectEngine::new();
        fx.resync(&rec);
        assert_eq!(fx.compute(0, &rec, &ticks).colours(), [0, 0, 100]);
    }

    #[test]
    fn starter_holds_between_thresholds() {
        let mut rec = ConfigRecord::default();
        rec.starter_on_rpm = 400;
        rec.starter_off_rpm = 600;
        let ticks = TickService::new();
        let mut fx = EffectEngine::new();
        fx.resync(&rec);

        assert_eq!(fx.compute(500, &rec, &ticks).starter, 0);
        assert_eq!(fx.compute(400, &rec, &ticks).starter, PWM_PERIOD);
        assert_eq!(fx.compute(599, &rec, &ticks).starter, PWM_PERIOD);
        assert_eq!(fx.compute(600, &rec, &ticks).starter, 0);
        assert_eq!(fx.compute(401, &rec, &ticks).starter, 0);
    }

    #[test]
    fn selection_walks_one_node_per_check() {
        let mut rec = demo();
        rec.active_breakpoint = 0;
        let ticks = TickService::new();
        let mut fx = EffectEngine::new();
        fx.resync(&rec);
        let mut sink = NullSink;

        for expected in 1..=4 {
            fx.select(3000, &rec, &ticks, &mut sink);
            assert_eq!(fx.breakpoint(), expected);
        }
        fx.select(3000, &rec, &ticks, &mut sink);
        assert_eq!(fx.breakpoint(), 4);
        assert_eq!(fx.compute(3000, &rec, &ticks).colours(), [100, 0, 0]);
    }

    #[test]
    fn dimmer_scales_colours() {
        let mut rec = demo();
        rec.breakpoints[0] = crate::config::Breakpoint::new(0, 80, 80, 80);
        rec.dimmers[0] = crate::config::Dimmer {
            rpm_low: 0,
            rpm_high: 100,
            rise_ticks: 10,
            high_ticks: 0,
            fall_ticks: 10,
            low_ticks: 10,
        };
        let ticks = TickService::new();
        let mut fx = EffectEngine::new();
        fx.resync(&rec);
        assert_eq!(fx.dimmer(), Some(0));

        // High with zero duration → Fall on the first pass, at full level.
        assert_eq!(fx.compute(50, &rec, &ticks).colours(), [80; 3]);
        for _ in 0..5 {
            ticks.advance();
        }
        assert_eq!(fx.compute(50, &rec, &ticks).colours(), [40; 3]);
    }

    #[test]
    fn segment_hits_stored_duty_at_both_nodes() {
        let mut rec = ConfigRecord::default();
        rec.breakpoints[1] = crate::config::Breakpoint::new(37, 33, 0, 100);
        rec.breakpoints[2] = crate::config::Breakpoint::new(1093, 7, 100, 0);
        rec.active_breakpoint = 2;
        rec.active_dimmer = crate::config::DIMMER_COUNT as u8;
        let ticks = TickService::new();
        let mut fx = EffectEngine::new();
        fx.resync(&rec);

        assert_eq!(fx.compute(37, &rec, &ticks).colours(), [33, 0, 100]);
        assert_eq!(fx.compute(1093, &rec, &ticks).colours(), [7, 100, 0]);
    }

    #[test]
    fn duty_conversion_truncates_and_clamps() {
        assert_eq!(to_duty(49.99), 49);
        assert_eq!(to_duty(6.999_999_999_999_996), 7);
        assert_eq!(to_duty(100.000_000_000_01), PWM_PERIOD);
        assert_eq!(to_duty(-3.0), 0);
        assert_eq!(to_duty(250.0), PWM_PERIOD);
        assert_eq!(to_duty(f64::NAN), 0);
    }
}
