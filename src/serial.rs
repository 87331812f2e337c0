//! Interrupt-driven transmit path.
//!
//! ```text
//!  main loop ──▶ Outbox ──▶ ByteRing ──▶ TxDrain ──▶ SerialTx (UART)
//!                   │                       ▲
//!                   └──── prime (if idle) ──┘  ◀── transmit-complete ISR
//! ```
//!
//! The main loop is the only writer of the outbound ring.  Bytes leave the
//! ring one per transmit-complete interrupt.  The very first byte of a
//! burst has no interrupt to pull it, so whoever observes "not sending"
//! primes the UART directly.  Priming and the ISR both run inside a
//! critical section, which makes the sending flag and the pop a single
//! step from either side.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::app::ports::SerialTx;
use crate::ring::{Consumer, Producer};

/// Read side of the outbound ring, shared by the main loop and the
/// transmit-complete ISR.
pub struct TxDrain<'a, const N: usize> {
    consumer: Mutex<RefCell<Option<Consumer<'a, N>>>>,
    sending: AtomicBool,
}

impl<'a, const N: usize> TxDrain<'a, N> {
    pub const fn new() -> Self {
        Self {
            consumer: Mutex::new(RefCell::new(None)),
            sending: AtomicBool::new(false),
        }
    }

    /// Install the consumer half of the outbound ring.
    pub fn attach(&self, consumer: Consumer<'a, N>) {
        critical_section::with(|cs| {
            *self.consumer.borrow_ref_mut(cs) = Some(consumer);
        });
    }

    /// Start a transmission if none is in flight.
    pub fn prime(&self, port: &mut impl SerialTx) {
        critical_section::with(|cs| {
            if self.sending.load(Ordering::Relaxed) {
                return;
            }
            let mut slot = self.consumer.borrow_ref_mut(cs);
            if let Some(byte) = slot.as_mut().and_then(Consumer::pop) {
                self.sending.store(true, Ordering::Relaxed);
                port.write_byte(byte);
            }
        });
    }

    /// Transmit-complete interrupt: send the next byte or go idle.
    pub fn on_transmit_complete(&self, port: &mut impl SerialTx) {
        critical_section::with(|cs| {
            let mut slot = self.consumer.borrow_ref_mut(cs);
            match slot.as_mut().and_then(Consumer::pop) {
                Some(byte) => port.write_byte(byte),
                None => self.sending.store(false, Ordering::Relaxed),
            }
        });
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for TxDrain<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-loop handle for queuing replies.
pub struct Outbox<'a, 'd, const N: usize> {
    producer: Producer<'a, N>,
    drain: &'d TxDrain<'a, N>,
}

impl<'a, 'd, const N: usize> Outbox<'a, 'd, N> {
    pub fn new(producer: Producer<'a, N>, drain: &'d TxDrain<'a, N>) -> Self {
        Self { producer, drain }
    }

    /// Queue `bytes` and kick the transmitter.  Bytes beyond the ring's
    /// free space are dropped.
    pub fn send(&mut self, bytes: &[u8], port: &mut impl SerialTx) {
        self.producer.push_slice(bytes);
        self.drain.prime(port);
    }

    /// Bytes still waiting in the ring (not counting one in flight).
    pub fn pending(&self) -> usize {
        self.producer.len()
    }
}
