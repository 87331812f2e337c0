//! Application core: configuration, effects and protocol glue, zero I/O.
//!
//! The [`service::Controller`] ties the command protocol, the persisted
//! configuration and the effect engine together.  All interaction with
//! hardware happens through the **port traits** in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
