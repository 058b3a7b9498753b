//! Deferred receive re-arm
//!
//! When the receive ring is full, spinning inside the receive interrupt
//! would stall every other interrupt, and returning with the interrupt
//! still enabled would re-enter it immediately. Instead the handler masks
//! its own interrupt and posts a request here. The request is picked up by
//! [`SerialPorts::run_deferred_work`](crate::SerialPorts::run_deferred_work)
//! (or [`Channel::run_deferred_work`](crate::Channel::run_deferred_work))
//! from the mainline idle loop, which retries the receive and unmasks the
//! interrupt.
//!
//! Each channel owns exactly one slot, so at most one request per channel
//! is ever outstanding.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Single-slot pending-task queue
pub struct RearmSlot {
    pending: AtomicBool,
    posts: AtomicU32,
}

impl Default for RearmSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RearmSlot {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            posts: AtomicU32::new(0),
        }
    }

    /// Queue the request
    ///
    /// Returns `false` without queueing anything if a request is already
    /// pending.
    pub fn post(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.posts.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Claim the pending request, if there is one
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Check if a request is waiting
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Requests accepted by [`post`](Self::post) so far
    pub fn posts(&self) -> u32 {
        self.posts.load(Ordering::Relaxed)
    }
}
