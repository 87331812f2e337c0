//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  They are diagnostics for
//! the developer console only; nothing here reaches the serial protocol.

use super::commands::Opcode;
use crate::protocol::FrameError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot finished: storage loaded and promoted.
    Started,

    /// Cache was promoted to active.
    Promoted {
        breakpoint: u8,
        dimmer: u8,
        dimmer_enabled: bool,
    },

    /// Hysteresis selection moved to another breakpoint.
    BreakpointChanged { from: u8, to: u8, rpm: u16 },

    /// Dimmer window re-selected (`None` = no window matches).
    DimmerChanged { to: Option<u8>, rpm: u16 },

    /// Starter-enable output flipped.
    StarterChanged { enabled: bool, rpm: u16 },

    /// A valid command frame was executed.
    CommandExecuted(Opcode),

    /// A frame was rejected and resynchronised past.
    FramingError(FrameError),

    /// Cache written to storage.
    StorageSaved,

    /// Cache reloaded from storage.
    StorageLoaded,

    /// Promoted breakpoints are not in ascending RPM order.
    UnorderedBreakpoints { index: usize },

    /// RPM edges stopped arriving; target forced to zero.
    SignalLost,
}
