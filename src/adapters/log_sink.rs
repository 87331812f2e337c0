//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (USB-CDC console on the board, stderr on the host).  The
//! configuration UART never carries these lines.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the developer console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | controller running"),
            AppEvent::Promoted { breakpoint, dimmer, dimmer_enabled } => {
                info!(
                    "CONFIG | promoted | bp={} dimmer={} dimming={}",
                    breakpoint,
                    dimmer,
                    if *dimmer_enabled { "on" } else { "off" },
                );
            }
            AppEvent::BreakpointChanged { from, to, rpm } => {
                info!("EFFECT | breakpoint {} -> {} @ {}rpm", from, to, rpm);
            }
            AppEvent::DimmerChanged { to: Some(index), rpm } => {
                info!("EFFECT | dimmer window {} @ {}rpm", index, rpm);
            }
            AppEvent::DimmerChanged { to: None, rpm } => {
                info!("EFFECT | dimmer off @ {}rpm", rpm);
            }
            AppEvent::StarterChanged { enabled, rpm } => {
                info!(
                    "STARTER | {} @ {}rpm",
                    if *enabled { "enabled" } else { "inhibited" },
                    rpm
                );
            }
            AppEvent::CommandExecuted(opcode) => {
                info!("CMD | '{}' ok", *opcode as u8 as char);
            }
            AppEvent::FramingError(e) => warn!("CMD | {}", e),
            AppEvent::StorageSaved => info!("STORE | cache saved"),
            AppEvent::StorageLoaded => info!("STORE | cache loaded"),
            AppEvent::UnorderedBreakpoints { index } => {
                warn!("CONFIG | breakpoint {} below its predecessor", index);
            }
            AppEvent::SignalLost => warn!("RPM | signal lost, target forced to 0"),
        }
    }
}
