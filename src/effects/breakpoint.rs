//! Breakpoint selection and piecewise-linear colour interpolation.
//!
//! The active index `i` names the node *above* the current segment: the
//! colour follows the line through nodes `i - 1` and `i`.  The first and
//! last nodes have no segment and hold their duty flat; an index past the
//! table turns all channels off.

use crate::config::{BREAKPOINT_COUNT, ConfigRecord};

/// `duty = rpm * slope + offset` for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub offset: f64,
}

impl Line {
    const fn flat(offset: f64) -> Self {
        Self { slope: 0.0, offset }
    }

    pub fn eval(&self, rpm: u16) -> f64 {
        f64::from(rpm) * self.slope + self.offset
    }
}

/// Precomputed lines for the red, green and blue channels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coefficients {
    pub channels: [Line; 3],
}

impl Coefficients {
    /// Lines for breakpoint `index` of `record`.
    pub fn compute(index: u8, record: &ConfigRecord) -> Self {
        let i = usize::from(index);
        if i >= BREAKPOINT_COUNT {
            return Self::default();
        }

        let upper = &record.breakpoints[i];
        if i == 0 || i == BREAKPOINT_COUNT - 1 {
            return Self {
                channels: upper.duties().map(|d| Line::flat(f64::from(d))),
            };
        }

        let lower = &record.breakpoints[i - 1];
        let run = f64::from(upper.rpm) - f64::from(lower.rpm);
        let mut channels = [Line::default(); 3];
        for ((line, hi), lo) in channels.iter_mut().zip(upper.duties()).zip(lower.duties()) {
            let hi = f64::from(hi);
            // Coincident nodes: hold the upper duty.
            let slope = if run == 0.0 {
                0.0
            } else {
                (hi - f64::from(lo)) / run
            };
            *line = Line {
                slope,
                offset: hi - f64::from(upper.rpm) * slope,
            };
        }
        Self { channels }
    }

    /// Raw channel values at `rpm`.  Not clamped.
    pub fn eval(&self, rpm: u16) -> [f64; 3] {
        self.channels.map(|line| line.eval(rpm))
    }
}

/// One hysteresis-gated step of the breakpoint index.
///
/// Moves down if `rpm` fell below the lower node minus the margin,
/// otherwise up if it rose above the upper node plus the margin.  A call
/// moves at most one node; larger jumps settle over several check
/// intervals.
pub fn select(index: u8, rpm: u16, record: &ConfigRecord) -> u8 {
    let hyst = u16::from(record.break_hysteresis);
    let i = usize::from(index).min(BREAKPOINT_COUNT);

    if i > 0 && rpm < record.breakpoints[i - 1].rpm.saturating_sub(hyst) {
        return (i - 1) as u8;
    }
    if i < BREAKPOINT_COUNT - 1 && rpm > record.breakpoints[i].rpm.saturating_add(hyst) {
        return (i + 1) as u8;
    }
    i as u8
}
