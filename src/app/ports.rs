//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (storage, serial transmitter, event sinks) implement
//! these traits.  The [`Controller`](super::service::Controller) consumes
//! them via generics, so the domain core never touches registers directly.
//! Output pins use the `embedded-hal` traits instead of a local port.

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ byte-addressable storage)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile storage.
///
/// The contract is deliberately minimal: there is no error channel.  A
/// failed write is indistinguishable from a successful one, and an
/// uninitialised cell reads back as whatever the hardware returns.
/// Implementations own any settling / write-enable timing.
pub trait StoragePort {
    /// Read the byte at `address`.
    fn read_byte(&mut self, address: u16) -> u8;

    /// Write `byte` at `address`.
    fn write_byte(&mut self, address: u16, byte: u8);

    /// Make preceding writes durable.  Called once after a save sequence.
    fn commit(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Serial transmit port (driven adapter: domain → UART data register)
// ───────────────────────────────────────────────────────────────

/// Hardware side of the transmitter: accepts one byte for the wire.
///
/// After a byte is accepted, the transport signals completion by calling
/// [`TxDrain::on_transmit_complete`](crate::serial::TxDrain::on_transmit_complete).
pub trait SerialTx {
    fn write_byte(&mut self, byte: u8);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}
