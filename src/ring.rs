//! Fixed-capacity byte FIFO shared between an interrupt and the main loop.
//!
//! ```text
//!   ISR / main ──▶ Producer ──▶ ┌────────────┐ ──▶ Consumer ──▶ main / ISR
//!                               │ ByteRing<N> │
//!                               └────────────┘
//! ```
//!
//! Head and tail are free-running counters; the fill level is their
//! wrapping difference, so all `N` slots are usable.  The ring hands out
//! exactly one [`Producer`] and one [`Consumer`], which makes the
//! single-writer / single-reader discipline a property of the types.
//!
//! Overflow policy: a push into a full ring drops the incoming byte.  The
//! producer usually runs in interrupt context and must never stall.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Lock-free SPSC byte ring with capacity `N`.
pub struct ByteRing<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    /// Total bytes ever written (wrapping).
    head: AtomicUsize,
    /// Total bytes ever consumed (wrapping).
    tail: AtomicUsize,
    split: AtomicBool,
}

// SAFETY: slot `i` is written only by the single Producer while it is
// outside `[tail, head)` and read only by the single Consumer while it is
// inside.  Release/Acquire on head/tail publishes the slot contents.
unsafe impl<const N: usize> Sync for ByteRing<N> {}

impl<const N: usize> ByteRing<N> {
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            split: AtomicBool::new(false),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Hand out the producer and consumer halves.
    ///
    /// Returns `None` on every call after the first.
    pub fn split(&self) -> Option<(Producer<'_, N>, Consumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((Producer { ring: self }, Consumer { ring: self }))
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half of a [`ByteRing`].
pub struct Producer<'a, const N: usize> {
    ring: &'a ByteRing<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte.  Returns `false` (and drops the byte) when full.
    pub fn push(&mut self, byte: u8) -> bool {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= N {
            return false;
        }
        // SAFETY: the slot at `head` is outside the readable window, and
        // this is the only Producer for the ring.
        unsafe {
            (*self.ring.buf.get())[head % N] = byte;
        }
        self.ring.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Append every byte in order.  Returns how many were stored.
    pub fn push_slice(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.push(b)).count()
    }

    /// Number of bytes waiting to be consumed.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= N
    }
}

/// Read half of a [`ByteRing`].
pub struct Consumer<'a, const N: usize> {
    ring: &'a ByteRing<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Count of unread bytes.  Only grows between calls to
    /// [`consume`](Self::consume) on this half.
    pub fn available(&self) -> usize {
        self.ring.len()
    }

    /// Byte `offset` positions from the head, without consuming it.
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.available() {
            return None;
        }
        let tail = self.ring.tail.load(Ordering::Relaxed);
        // SAFETY: `tail + offset` lies inside `[tail, head)`, which the
        // Producer never writes.
        Some(unsafe { (*self.ring.buf.get())[tail.wrapping_add(offset) % N] })
    }

    /// Remove and return the head byte.
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek(0)?;
        self.consume(1);
        Some(byte)
    }

    /// Discard up to `count` bytes from the head.  Returns the number
    /// actually discarded.
    pub fn consume(&mut self, count: usize) -> usize {
        let n = count.min(self.available());
        let tail = self.ring.tail.load(Ordering::Relaxed);
        self.ring.tail.store(tail.wrapping_add(n), Ordering::Release);
        n
    }

    /// Copy `out.len()` bytes starting at `offset` without consuming.
    /// Returns `false` if not enough bytes are available.
    pub fn copy_out(&self, offset: usize, out: &mut [u8]) -> bool {
        if offset + out.len() > self.available() {
            return false;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            // Bounds checked above.
            *slot = self.peek(offset + i).unwrap_or(0);
        }
        true
    }
}
