//! 100 µs tick timer using ESP-IDF's esp_timer API.
//!
//! The callback runs the whole tick path (time base, RPM filter, PWM), so
//! it is dispatched from the esp_timer task rather than ISR context and
//! must stay short.  On simulation targets there is no timer; tests call
//! [`Shared::on_tick`](crate::shared::Shared::on_tick) directly.

#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::TICK_PERIOD_US;
use crate::error::Error;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: TICK_TIMER is written once in `start_tick_timer()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn tick_timer() -> esp_timer_handle_t { unsafe { TICK_TIMER } }

/// Start the periodic tick timer, invoking `callback` every
/// `TICK_PERIOD_US` microseconds.
#[cfg(target_os = "espidf")]
pub fn start_tick_timer(
    callback: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), Error> {
    // SAFETY: TICK_TIMER is written here once at boot from the single
    // main-task context before the callback can fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(callback),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"tick\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK {
            return Err(Error::Timer(ret));
        }
        let ret = esp_timer_start_periodic(tick_timer(), TICK_PERIOD_US);
        if ret != ESP_OK {
            return Err(Error::Timer(ret));
        }
    }
    info!("hw_timer: tick@{}us started", TICK_PERIOD_US);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timer(
    _callback: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), Error> {
    log::info!("hw_timer(sim): tick@{}us not started (driven by caller)", TICK_PERIOD_US);
    Ok(())
}
