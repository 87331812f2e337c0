//! Kombi controller firmware library.
//!
//! RPM-driven RGB illumination and starter inhibit.  Exposes the
//! pure-logic modules for integration testing; all ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod effects;
pub mod protocol;
pub mod ring;
pub mod rpm;
pub mod serial;
pub mod shared;
pub mod store;
pub mod tick;

pub mod error;
pub mod pins;

// The ESP-only halves are cfg-guarded inside; the host halves back the
// simulation and the tests.
pub mod adapters;
pub mod drivers;

mod esp_link_shims;
