//! Unified error types for the firmware glue.
//!
//! The control core is infallible: framing problems become status replies
//! and bad values are clamped on entry.  What can fail is bringing up the
//! ESP-IDF peripherals around it, and every such failure funnels into
//! [`Error`].  All variants are `Copy` and carry the raw `esp_err_t` code
//! where there is one.

use core::fmt;

pub use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// GPIO or interrupt setup failed.
    Init(HwInitError),
    /// The storage backend could not be opened or written.
    Storage(StorageError),
    /// The UART driver could not be installed or configured.
    Serial(i32),
    /// The periodic tick timer could not be created or started.
    Timer(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Serial(rc) => write!(f, "serial: UART setup failed (rc={rc})"),
            Self::Timer(rc) => write!(f, "timer: tick timer setup failed (rc={rc})"),
        }
    }
}

impl std::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Flash partition could not be initialised (even after erase).
    FlashInit(i32),
    /// Namespace could not be opened.
    Open(i32),
    /// Blob read failed for a reason other than "not found".
    Read(i32),
    /// Blob write or commit failed.
    Write(i32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlashInit(rc) => write!(f, "flash init failed (rc={rc})"),
            Self::Open(rc) => write!(f, "namespace open failed (rc={rc})"),
            Self::Read(rc) => write!(f, "blob read failed (rc={rc})"),
            Self::Write(rc) => write!(f, "blob write failed (rc={rc})"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
