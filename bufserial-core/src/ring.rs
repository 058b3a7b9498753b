//! Fixed-capacity byte ring shared between one producer and one consumer
//!
//! `head` is the next slot to write, `tail` the next slot to read. Both stay
//! in `0..N` and wrap modulo `N`; one slot is always left unused so that
//! `head == tail` means empty and `head + 1 == tail` means full. Usable
//! capacity is therefore `N - 1`.
//!
//! `head` is only ever stored by the producer and `tail` only by the
//! consumer. Slots are atomics too, which keeps the whole structure in safe
//! code: the producer writes a slot and then publishes it with a `Release`
//! store of `head`, the consumer `Acquire`-loads `head` before reading the
//! slot, and the mirror-image ordering hands slots back through `tail`.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// Lock-free single-producer/single-consumer byte ring
///
/// Calling [`try_push`](Self::try_push) from two contexts at once, or
/// [`try_pop`](Self::try_pop) from two contexts at once, can lose or
/// duplicate bytes. It cannot cause memory unsafety.
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_OK: () = assert!(N >= 2, "ring needs at least two slots");

    /// Create an empty ring
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Number of bytes the ring can hold at once
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    const fn next(index: usize) -> usize {
        (index + 1) % N
    }

    /// Append a byte
    ///
    /// Returns the byte back if the ring is full; nothing is modified in
    /// that case. Producer side only.
    pub fn try_push(&self, byte: u8) -> Result<(), u8> {
        let head = self.head.load(Ordering::Relaxed);
        let next = Self::next(head);
        if next == self.tail.load(Ordering::Acquire) {
            return Err(byte);
        }
        self.slots[head].store(byte, Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Remove the oldest byte, if any. Consumer side only.
    pub fn try_pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.slots[tail].load(Ordering::Relaxed);
        self.tail.store(Self::next(tail), Ordering::Release);
        Some(byte)
    }

    /// Check if no byte is pending
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Check if `capacity()` bytes are pending
    pub fn is_full(&self) -> bool {
        Self::next(self.head.load(Ordering::Acquire)) == self.tail.load(Ordering::Acquire)
    }

    /// Number of pending bytes
    ///
    /// Racing with the other side gives a momentarily stale count, never an
    /// out-of-range one.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Number of bytes that can still be pushed
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }
}
