//! Software PWM for the three colour channels and the starter enable.
//!
//! Runs from the tick callback.  The effect engine publishes a pending
//! [`DutyCycles`] set through a [`DutyLatch`]; the driver latches it as a
//! whole at the start of each period, so a period never mixes channels
//! from two different updates.
//!
//! ```text
//!  tick:  0 ........ duty ........ PWM_PERIOD
//!  pin:   ▔▔▔▔▔▔▔▔▔▔▔▔|_______________|▔▔▔  (next period)
//! ```
//!
//! Pins are any `embedded-hal` [`OutputPin`]; on the host the tests drive
//! recording pins.

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::{OutputPin, PinState};

use crate::config::PWM_PERIOD;
use crate::effects::DutyCycles;
use crate::tick::{StopwatchId, TickService};

/// Single-word mailbox for the pending duty set.
pub struct DutyLatch {
    packed: AtomicU32,
}

impl DutyLatch {
    pub const fn new() -> Self {
        Self {
            packed: AtomicU32::new(0),
        }
    }

    /// Publish the next period's duty set.
    pub fn set_pending(&self, duties: DutyCycles) {
        let word = u32::from_le_bytes([duties.red, duties.green, duties.blue, duties.starter]);
        self.packed.store(word, Ordering::Release);
    }

    pub fn pending(&self) -> DutyCycles {
        let [red, green, blue, starter] = self.packed.load(Ordering::Acquire).to_le_bytes();
        DutyCycles {
            red,
            green,
            blue,
            starter,
        }
    }
}

impl Default for DutyLatch {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PwmDriver<P: OutputPin> {
    /// Red, green, blue.
    colours: [P; 3],
    /// Mirrored starter-enable pair.
    starters: [P; 2],
    committed: DutyCycles,
}

impl<P: OutputPin> PwmDriver<P> {
    /// Take ownership of the pins and drive them all low.
    pub fn new(colours: [P; 3], starters: [P; 2]) -> Self {
        let mut driver = Self {
            colours,
            starters,
            committed: DutyCycles::OFF,
        };
        for pin in driver.colours.iter_mut().chain(driver.starters.iter_mut()) {
            let _ = pin.set_low();
        }
        driver
    }

    /// Advance the waveform by one tick.
    pub fn tick(&mut self, ticks: &TickService, latch: &DutyLatch) {
        if ticks.elapsed(StopwatchId::Pwm) > u32::from(PWM_PERIOD) {
            self.committed = latch.pending();
            for (pin, duty) in self.colours.iter_mut().zip(self.committed.colours()) {
                if duty > 0 {
                    let _ = pin.set_high();
                }
            }
            ticks.reset(StopwatchId::Pwm);

            let state = PinState::from(self.committed.starter > 0);
            for pin in &mut self.starters {
                let _ = pin.set_state(state);
            }
        }

        let elapsed = ticks.elapsed(StopwatchId::Pwm);
        for (pin, duty) in self.colours.iter_mut().zip(self.committed.colours()) {
            if duty < PWM_PERIOD && elapsed >= u32::from(duty) {
                let _ = pin.set_low();
            }
        }
    }

    /// Duty set in force for the current period.
    pub fn committed(&self) -> DutyCycles {
        self.committed
    }

    pub fn colour_pins(&self) -> &[P; 3] {
        &self.colours
    }

    pub fn starter_pins(&self) -> &[P; 2] {
        &self.starters
    }
}
