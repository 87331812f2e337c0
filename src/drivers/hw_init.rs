//! One-shot hardware peripheral initialization.
//!
//! Configures the output GPIOs and the RPM edge interrupt using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts.  On the host every function is a logging no-op and
//! [`GpioOut`] only remembers its level.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the tick timer starts; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_rpm_input()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in pins::COLOUR_GPIOS.iter().chain(&pins::STARTER_GPIOS) {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured (rgb + starter pair)");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_rpm_input() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RPM_INPUT_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: RPM input configured (rising edge)");
    Ok(())
}

/// Push-pull output addressed by GPIO number.  The tick callback owns the
/// set handed to the PWM driver.
pub struct GpioOut {
    pin: i32,
    #[cfg(not(target_os = "espidf"))]
    high: bool,
}

impl GpioOut {
    pub const fn new(pin: i32) -> Self {
        Self {
            pin,
            #[cfg(not(target_os = "espidf"))]
            high: false,
        }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_high(&self) -> bool {
        self.high
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) {
        // SAFETY: the pin was configured as an output in init_gpio_outputs();
        // gpio_set_level is a single register write.
        unsafe { gpio_set_level(self.pin, u32::from(high)); }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) {
        self.high = high;
    }
}

impl ErrorType for GpioOut {
    type Error = Infallible;
}

impl OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.write(true);
        Ok(())
    }
}

/// Colour and starter outputs in the order the PWM driver expects.
pub fn output_pins() -> ([GpioOut; 3], [GpioOut; 2]) {
    (
        pins::COLOUR_GPIOS.map(GpioOut::new),
        pins::STARTER_GPIOS.map(GpioOut::new),
    )
}

// ── GPIO ISR Service ──────────────────────────────────────────

/// Install the GPIO ISR service and attach `handler` to the RPM input's
/// rising edge.  Call after init_peripherals().
#[cfg(target_os = "espidf")]
pub fn init_isr_service(
    handler: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handler only touches
    // atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(pins::RPM_INPUT_GPIO, Some(handler), core::ptr::null_mut());
        check_isr(ret)?;
        check_isr(gpio_intr_enable(pins::RPM_INPUT_GPIO))?;

        info!("hw_init: ISR service installed (rpm edge)");
    }
    Ok(())
}

/// Map an ISR setup return code.  Without the edge handler the RPM input
/// reads zero forever, which keeps the starter enabled.
#[cfg(any(target_os = "espidf", test))]
fn check_isr(ret: i32) -> Result<(), HwInitError> {
    if ret == 0 { Ok(()) } else { Err(HwInitError::IsrInstallFailed(ret)) }
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(
    _handler: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
