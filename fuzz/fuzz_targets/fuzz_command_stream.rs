//! Fuzz target: `Controller::run_once` over an arbitrary serial stream.
//!
//! Feeds the input in receive-sized bursts through the full controller
//! (framing, record decode, storage, promotion, effects) and asserts that
//! it never panics, every published duty stays within the PWM period, and
//! the receive ring never stalls on a byte it could process.
//!
//! cargo fuzz run fuzz_command_stream

#![no_main]

use kombi::app::ports::{NullSink, SerialTx, StoragePort};
use kombi::app::service::Controller;
use kombi::config::{IO_BUFFER_SIZE, PWM_PERIOD};
use kombi::ring::ByteRing;
use kombi::serial::{Outbox, TxDrain};
use kombi::shared::Shared;
use libfuzzer_sys::fuzz_target;

struct Ram([u8; 256]);

impl StoragePort for Ram {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.0[usize::from(address) % 256]
    }

    fn write_byte(&mut self, address: u16, byte: u8) {
        self.0[usize::from(address) % 256] = byte;
    }
}

struct Sink;

impl SerialTx for Sink {
    fn write_byte(&mut self, _byte: u8) {}
}

fuzz_target!(|data: &[u8]| {
    let shared = Shared::new();
    let mut ctl = Controller::new(Ram([0xFF; 256]));
    ctl.start(&shared, &mut NullSink);

    let rx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let tx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let (mut rx_in, mut rx) = rx_ring.split().unwrap();
    let (tx_in, tx_out) = tx_ring.split().unwrap();
    let drain = TxDrain::new();
    drain.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &drain);
    let mut port = Sink;

    for burst in data.chunks(24) {
        rx_in.push_slice(burst);
        for _ in 0..=burst.len() {
            // Let RPM estimation and selection run on something.
            for _ in 0..37 {
                shared.ticks.advance();
            }
            shared.on_rpm_edge();
            let duties = ctl.run_once(&shared, &mut rx, &mut outbox, &mut port, &mut NullSink);
            assert!(duties.colours().iter().all(|&d| d <= PWM_PERIOD));
            while drain.is_sending() {
                drain.on_transmit_complete(&mut port);
            }
        }
    }
});
