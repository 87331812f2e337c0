//! Mock hardware adapters for integration tests.
//!
//! Byte-addressable storage, a capturing serial transmitter, a recording
//! event sink and an `embedded-hal` output pin, plus [`exchange`] which
//! pushes request bytes through a controller the way the main loop does.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use kombi::app::events::AppEvent;
use kombi::app::ports::{EventSink, SerialTx, StoragePort};
use kombi::app::service::Controller;
use kombi::config::{ConfigRecord, IO_BUFFER_SIZE};
use kombi::effects::DutyCycles;
use kombi::ring::ByteRing;
use kombi::serial::{Outbox, TxDrain};
use kombi::shared::Shared;

// ── MemEeprom ─────────────────────────────────────────────────

pub struct MemEeprom {
    pub cells: [u8; 512],
    pub commits: u32,
}

impl MemEeprom {
    pub fn erased() -> Self {
        Self {
            cells: [0xFF; 512],
            commits: 0,
        }
    }
}

impl StoragePort for MemEeprom {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.cells[usize::from(address)]
    }

    fn write_byte(&mut self, address: u16, byte: u8) {
        self.cells[usize::from(address)] = byte;
    }

    fn commit(&mut self) {
        self.commits += 1;
    }
}

// ── CapturePort ───────────────────────────────────────────────

/// Transmitter that completes every byte as soon as the test asks.
#[derive(Default)]
pub struct CapturePort {
    pub bytes: Vec<u8>,
}

impl CapturePort {
    /// Play the transmit-complete interrupt until the drain goes idle.
    pub fn flush<const N: usize>(&mut self, drain: &TxDrain<'_, N>) {
        while drain.is_sending() {
            drain.on_transmit_complete(self);
        }
    }
}

impl SerialTx for CapturePort {
    fn write_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockPin ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockPin {
    pub high: bool,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Fresh controller over erased storage, already started.
pub fn started() -> (Controller<MemEeprom>, Shared, RecordingSink) {
    let shared = Shared::new();
    let mut sink = RecordingSink::default();
    let mut ctl = Controller::new(MemEeprom::erased());
    ctl.start(&shared, &mut sink);
    (ctl, shared, sink)
}

/// `l<record>e`
pub fn load_frame(record: &ConfigRecord) -> Vec<u8> {
    let mut frame = vec![b'l'];
    frame.extend_from_slice(&record.to_bytes());
    frame.push(b'e');
    frame
}

/// Feed `input` and run main-loop passes until it is consumed (or no
/// further progress is possible).  Returns every reply byte.
pub fn exchange(
    ctl: &mut Controller<MemEeprom>,
    shared: &Shared,
    input: &[u8],
    sink: &mut RecordingSink,
) -> Vec<u8> {
    exchange_in_bursts(ctl, shared, &[input], sink)
}

/// Like [`exchange`], but each burst reaches the receive ring only after
/// the previous one has been processed as far as it goes.
pub fn exchange_in_bursts(
    ctl: &mut Controller<MemEeprom>,
    shared: &Shared,
    bursts: &[&[u8]],
    sink: &mut RecordingSink,
) -> Vec<u8> {
    let rx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let tx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let (mut rx_in, mut rx) = rx_ring.split().unwrap();
    let (tx_in, tx_out) = tx_ring.split().unwrap();
    let drain = TxDrain::new();
    drain.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &drain);
    let mut port = CapturePort::default();

    for burst in bursts {
        assert_eq!(rx_in.push_slice(burst), burst.len(), "input must fit the ring");
        while rx.available() > 0 {
            let before = rx.available();
            ctl.run_once(shared, &mut rx, &mut outbox, &mut port, sink);
            port.flush(&drain);
            if rx.available() == before {
                break;
            }
        }
    }
    port.bytes
}

/// One main-loop pass with nothing received.
pub fn idle_pass(
    ctl: &mut Controller<MemEeprom>,
    shared: &Shared,
    sink: &mut RecordingSink,
) -> DutyCycles {
    let rx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let tx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let (_rx_in, mut rx) = rx_ring.split().unwrap();
    let (tx_in, tx_out) = tx_ring.split().unwrap();
    let drain = TxDrain::new();
    drain.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &drain);
    let mut port = CapturePort::default();
    ctl.run_once(shared, &mut rx, &mut outbox, &mut port, sink)
}
