//! `crossbeam_queue::ArrayQueue` behind the ring contract.
//!
//! Useful as a baseline when comparing the in-crate strategies. Never
//! blocks; shutdown is checked once, up front.

use std::fmt;

use crossbeam_queue::ArrayQueue;

use crate::error::RingError;
use crate::shutdown::Shutdown;
use crate::trace::{debug, trace};
use crate::{CallerId, RingBuffer};

/// A bounded MPMC ring backed by [`ArrayQueue`].
pub struct ArrayRingBuffer<T> {
    queue: ArrayQueue<T>,
}

impl<T> ArrayRingBuffer<T> {
    /// Creates a ring holding up to `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }

        debug!(capacity, "array ring created");

        Ok(Self {
            queue: ArrayQueue::new(capacity),
        })
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
impl<T: Send> RingBuffer<T> for ArrayRingBuffer<T> {
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        if shutdown.is_requested() {
            trace!(%caller, reason = "shutdown", "produce rejected");
            return false;
        }

        if self.queue.push(item).is_err() {
            trace!(%caller, reason = "full", "produce rejected");
            return false;
        }
        true
    }

    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        if shutdown.is_requested() {
            trace!(%caller, reason = "shutdown", "consume rejected");
            return None;
        }

        let item = self.queue.pop();
        if item.is_none() {
            trace!(%caller, reason = "empty", "consume rejected");
        }
        item
    }

    #[inline]
    fn count(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn wake_all(&self) {}
}

impl<T> fmt::Debug for ArrayRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRingBuffer")
            .field("capacity", &self.queue.capacity())
            .field("count", &self.queue.len())
            .finish()
    }
}
