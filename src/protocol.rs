//! Fixed-grammar command framing over the receive ring.
//!
//! Wire format:
//! ```text
//! ┌────────┬──────────────────────────────┬─────┐
//! │ opcode │ payload (opcode-fixed length)│ 'e' │
//! └────────┴──────────────────────────────┴─────┘
//! ```
//!
//! [`CommandEngine::poll`] looks at the head of the ring at most once per
//! main-loop iteration.  Nothing is consumed until a frame is either
//! complete or known to be bad, so a frame split across many receive
//! interrupts is picked up on whichever pass sees its last byte.
//!
//! Recovery is bounded: an unknown opcode costs one byte, a frame with a
//! wrong terminator costs exactly its own length.

use core::fmt;

use crate::app::commands::{Command, Opcode, Reply, Status, TERMINATOR};
use crate::config::{ConfigRecord, RECORD_SIZE};
use crate::ring::Consumer;

/// Why a frame at the head of the ring was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The head byte matches no opcode.  One byte was discarded.
    UnknownOpcode(u8),
    /// A full frame arrived but its last byte was `found`, not `'e'`.
    MissingTerminator { opcode: Opcode, found: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode(byte) => write!(f, "unknown opcode 0x{byte:02x}"),
            Self::MissingTerminator { opcode, found } => write!(
                f,
                "frame '{}' ends in 0x{found:02x}, expected terminator",
                *opcode as u8 as char
            ),
        }
    }
}

/// Executes decoded commands.  Implemented by the controller.
pub trait CommandHandler {
    fn execute(&mut self, command: &Command) -> Reply;
}

/// What one [`CommandEngine::poll`] pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Ring empty or the head frame is still arriving.
    Idle,
    Executed(Opcode),
    Rejected(FrameError),
}

/// Frame recogniser and dispatcher.
pub struct CommandEngine {
    /// Echo unknown opcode bytes back for diagnostics.
    echo_unknown: bool,
}

impl CommandEngine {
    pub const fn new() -> Self {
        Self {
            echo_unknown: false,
        }
    }

    pub fn echo_unknown(&self) -> bool {
        self.echo_unknown
    }

    /// Handle at most one frame from the head of `rx`.
    ///
    /// Reply bytes are passed to `reply` in wire order.  `SetEcho` is
    /// answered here; every other command goes to `handler`.
    pub fn poll<const N: usize>(
        &mut self,
        rx: &mut Consumer<'_, N>,
        handler: &mut impl CommandHandler,
        mut reply: impl FnMut(&[u8]),
    ) -> Dispatch {
        let Some(head) = rx.peek(0) else {
            return Dispatch::Idle;
        };

        let Some(opcode) = Opcode::from_byte(head) else {
            reply(&Status::Unknown.frame());
            if self.echo_unknown {
                reply(b"\r\n");
                reply(&[head]);
                reply(b"\r\n");
            }
            rx.consume(1);
            return Dispatch::Rejected(FrameError::UnknownOpcode(head));
        };

        let len = opcode.frame_len();
        if rx.available() < len {
            return Dispatch::Idle;
        }

        let last = rx.peek(len - 1).unwrap_or(0);
        if last != TERMINATOR {
            rx.consume(len);
            reply(&Status::Invalid.frame());
            return Dispatch::Rejected(FrameError::MissingTerminator {
                opcode,
                found: last,
            });
        }

        let command = decode(opcode, rx);
        let response = match command {
            Command::SetEcho(on) => {
                self.echo_unknown = on;
                Reply::Status(Status::Ok)
            }
            ref other => handler.execute(other),
        };
        reply(&response.encode());
        rx.consume(len);
        Dispatch::Executed(opcode)
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a [`Command`] from a complete, terminated frame still in the ring.
fn decode<const N: usize>(opcode: Opcode, rx: &Consumer<'_, N>) -> Command {
    match opcode {
        Opcode::Save => Command::Save,
        Opcode::Read => Command::Read,
        Opcode::GetCache => Command::GetCache,
        Opcode::Promote => Command::Promote,
        Opcode::LoadDemo => Command::LoadDemo,
        Opcode::SetEcho => Command::SetEcho(rx.peek(1) == Some(b'1')),
        Opcode::LoadCache => {
            let mut bytes = [0u8; RECORD_SIZE];
            rx.copy_out(1, &mut bytes);
            Command::LoadCache(ConfigRecord::from_bytes(&bytes))
        }
    }
}
