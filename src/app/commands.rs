//! Inbound commands to the application core.
//!
//! Each serial frame is `<opcode><payload><'e'>`.  The opcode table fixes
//! the total frame length per opcode, so a frame can be recognised before
//! its payload has fully arrived.

use crate::config::{ConfigRecord, RECORD_SIZE};

/// Terminator byte closing every request and reply frame.
pub const TERMINATOR: u8 = b'e';

/// Wire opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Write the cache to storage.
    Save = b's',
    /// Reload the cache from storage.
    Read = b'r',
    /// Replace the cache with the record carried in the payload.
    LoadCache = b'l',
    /// Reply with the cache as a data frame.
    GetCache = b'g',
    /// Copy the cache into the active configuration.
    Promote = b't',
    /// Overlay the built-in demo profile onto the cache.
    LoadDemo = b'd',
    /// Enable (`'1'`) or disable the unknown-command echo.
    SetEcho = b'a',
}

impl Opcode {
    /// Lookup table in match priority order.
    pub const TABLE: [Opcode; 7] = [
        Opcode::Save,
        Opcode::Read,
        Opcode::LoadCache,
        Opcode::GetCache,
        Opcode::Promote,
        Opcode::LoadDemo,
        Opcode::SetEcho,
    ];

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::TABLE.into_iter().find(|op| *op as u8 == byte)
    }

    /// Total frame length including opcode and terminator.
    pub const fn frame_len(self) -> usize {
        match self {
            Self::LoadCache => RECORD_SIZE + 2,
            Self::SetEcho => 3,
            _ => 2,
        }
    }
}

/// A fully framed, validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Save,
    Read,
    LoadCache(ConfigRecord),
    GetCache,
    Promote,
    LoadDemo,
    SetEcho(bool),
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Save => Opcode::Save,
            Self::Read => Opcode::Read,
            Self::LoadCache(_) => Opcode::LoadCache,
            Self::GetCache => Opcode::GetCache,
            Self::Promote => Opcode::Promote,
            Self::LoadDemo => Opcode::LoadDemo,
            Self::SetEcho(_) => Opcode::SetEcho,
        }
    }
}

/// Two-byte status codes carried in `s<code>e` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = b'0',
    Unknown = b'1',
    Invalid = b'2',
}

impl Status {
    pub const fn frame(self) -> [u8; 3] {
        [b's', self as u8, TERMINATOR]
    }
}

/// Reply produced by executing a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(Status),
    /// `d<record>e`
    Data(ConfigRecord),
}

impl Reply {
    /// Serialize into a wire frame.
    pub fn encode(&self) -> heapless::Vec<u8, { RECORD_SIZE + 2 }> {
        let mut out = heapless::Vec::new();
        // Capacity covers the largest reply, so these pushes cannot fail.
        match self {
            Self::Status(status) => {
                let _ = out.extend_from_slice(&status.frame());
            }
            Self::Data(record) => {
                let _ = out.push(b'd');
                let _ = out.extend_from_slice(&record.to_bytes());
                let _ = out.push(TERMINATOR);
            }
        }
        out
    }
}
