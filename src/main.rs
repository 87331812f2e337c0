//! Kombi controller firmware main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │   NvsEeprom (StoragePort)  UartPort (SerialTx)  LogEventSink │
//! │                                                              │
//! │  ─────────────────── Port trait boundary ─────────────────   │
//! │                                                              │
//! │   ┌──────────────────────────────────────────────────────┐   │
//! │   │ Controller: ConfigStore · EffectEngine · Protocol    │   │
//! │   └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! │   esp_timer tick (100 µs) ─▶ Shared::on_tick ─▶ PwmDriver    │
//! │   GPIO edge ISR           ─▶ Shared::on_rpm_edge             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::ffi::c_void;

use anyhow::Result;
use critical_section::Mutex;
use esp_idf_hal::delay::FreeRtos;
use log::{error, info};

use kombi::adapters::log_sink::LogEventSink;
use kombi::adapters::nvs::NvsEeprom;
use kombi::adapters::uart::UartPort;
use kombi::app::service::Controller;
use kombi::config::IO_BUFFER_SIZE;
use kombi::drivers::hw_init::{self, GpioOut};
use kombi::drivers::hw_timer;
use kombi::drivers::pwm::PwmDriver;
use kombi::error::Error;
use kombi::ring::ByteRing;
use kombi::serial::{Outbox, TxDrain};
use kombi::shared::Shared;

// ── Interrupt-shared state ────────────────────────────────────

static SHARED: Shared = Shared::new();
static RX_RING: ByteRing<IO_BUFFER_SIZE> = ByteRing::new();
static TX_RING: ByteRing<IO_BUFFER_SIZE> = ByteRing::new();
static TX_DRAIN: TxDrain<'static, IO_BUFFER_SIZE> = TxDrain::new();
static PWM: Mutex<RefCell<Option<PwmDriver<GpioOut>>>> = Mutex::new(RefCell::new(None));

/// esp_timer callback, every `TICK_PERIOD_US`.
unsafe extern "C" fn on_tick(_arg: *mut c_void) {
    critical_section::with(|cs| {
        if let Some(pwm) = PWM.borrow_ref_mut(cs).as_mut() {
            SHARED.on_tick(pwm);
        }
    });
}

/// GPIO ISR on the RPM input's rising edge.
unsafe extern "C" fn on_rpm_edge(_arg: *mut c_void) {
    SHARED.on_rpm_edge();
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Kombi controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, halting", e);
        return Err(Error::from(e).into());
    }
    let (colours, starters) = hw_init::output_pins();
    critical_section::with(|cs| {
        *PWM.borrow_ref_mut(cs) = Some(PwmDriver::new(colours, starters));
    });

    let (mut rx_in, mut rx) = RX_RING
        .split()
        .ok_or_else(|| anyhow::anyhow!("rx ring already split"))?;
    let (tx_in, tx_out) = TX_RING
        .split()
        .ok_or_else(|| anyhow::anyhow!("tx ring already split"))?;
    TX_DRAIN.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &TX_DRAIN);
    let mut uart = UartPort::new()?;

    // ── 3. Configuration ──────────────────────────────────────
    let nvs = NvsEeprom::new().map_err(Error::from)?;
    let mut sink = LogEventSink::new();
    let mut controller = Controller::new(nvs);
    controller.start(&SHARED, &mut sink);

    // ── 4. Interrupt sources ──────────────────────────────────
    hw_timer::start_tick_timer(on_tick)?;
    hw_init::init_isr_service(on_rpm_edge).map_err(Error::from)?;

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        uart.pump_rx(&mut rx_in);
        controller.run_once(&SHARED, &mut rx, &mut outbox, &mut uart, &mut sink);
        uart.pump_tx(&TX_DRAIN);
        // Yield so the idle task can feed the task watchdog.
        FreeRtos::delay_ms(1);
    }
}
