//! Mutex + condition variable bounded ring.
//!
//! ```text
//! produce:                              consume:
//! ──────────────────────────            ──────────────────────────
//! lock                                  lock
//! wait(not_full, window)                wait(not_empty, window)
//!   until !full || shutdown               until !empty || shutdown
//! shutdown? -> false                    shutdown? -> None
//! still full? -> false (timed out)      still empty? -> None (timed out)
//! write at tail, len += 1               read at head, len -= 1
//! unlock, notify(not_empty)             unlock, notify(not_full)
//! ```
//!
//! The wait window only bounds how long a caller sits inside one call; it
//! is not a correctness mechanism. A timed-out wait is backpressure and the
//! caller is expected to retry.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_utils::CachePadded;

use crate::error::RingError;
use crate::shutdown::Shutdown;
use crate::storage::Cells;
use crate::sync::{AtomicUsize, Ordering};
use crate::trace::{debug, trace};
use crate::{CallerId, RingBuffer};

/// Default bound on a single wait inside `produce`/`consume`.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// A bounded ring guarded by a mutex, with "not full" and "not empty"
/// condition variables.
///
/// Once shutdown is requested both sides stop: `consume` returns `None`
/// without draining what is left.
///
/// # Example
///
/// ```
/// use nexus_ring::{BlockingRingBuffer, CallerId, RingBuffer, Shutdown};
/// use std::time::Duration;
///
/// let ring = BlockingRingBuffer::<u32>::with_wait(2, Duration::from_millis(5)).unwrap();
/// let shutdown = Shutdown::new();
///
/// assert!(ring.produce(1, CallerId(0), &shutdown));
/// assert!(ring.produce(2, CallerId(0), &shutdown));
///
/// // Full: waits up to 5ms for space, then reports backpressure
/// assert!(!ring.produce(3, CallerId(0), &shutdown));
///
/// assert_eq!(ring.consume(CallerId(1), &shutdown), Some(1));
/// ```
pub struct BlockingRingBuffer<T> {
    cells: Mutex<Cells<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    /// Mirror of `cells.len()` so `count` never takes the lock.
    count: CachePadded<AtomicUsize>,
    capacity: usize,
    wait: Duration,
}

impl<T> BlockingRingBuffer<T> {
    /// Creates a ring holding up to `capacity` items, waiting at most
    /// [`DEFAULT_WAIT`] per call.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] if `capacity` is zero and
    /// [`RingError::Allocation`] if the storage cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        Self::with_wait(capacity, DEFAULT_WAIT)
    }

    /// Creates a ring holding up to `capacity` items, waiting at most
    /// `wait` per call before reporting backpressure.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] if `capacity` is zero and
    /// [`RingError::Allocation`] if the storage cannot be reserved.
    pub fn with_wait(capacity: usize, wait: Duration) -> Result<Self, RingError> {
        let cells = Cells::new(capacity)?;

        debug!(capacity, ?wait, "blocking ring created");

        Ok(Self {
            cells: Mutex::new(cells),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            count: CachePadded::new(AtomicUsize::new(0)),
            capacity,
            wait,
        })
    }

    /// The bound on a single wait inside `produce`/`consume`.
    #[inline]
    pub const fn wait(&self) -> Duration {
        self.wait
    }

    // Critical sections only move items between cells and cursors, so a
    // panic elsewhere cannot leave them torn.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Cells<T>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
impl<T: Send> RingBuffer<T> for BlockingRingBuffer<T> {
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        let (mut cells, _) = self
            .not_full
            .wait_timeout_while(self.lock(), self.wait, |cells| {
                cells.is_full() && !shutdown.is_requested()
            })
            .unwrap_or_else(PoisonError::into_inner);

        if shutdown.is_requested() {
            trace!(%caller, reason = "shutdown", "produce rejected");
            return false;
        }

        if cells.push(item).is_err() {
            trace!(%caller, reason = "timeout", "produce rejected");
            return false;
        }

        self.count.store(cells.len(), Ordering::Release);
        drop(cells);
        self.not_empty.notify_one();
        true
    }

    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        let (mut cells, _) = self
            .not_empty
            .wait_timeout_while(self.lock(), self.wait, |cells| {
                cells.is_empty() && !shutdown.is_requested()
            })
            .unwrap_or_else(PoisonError::into_inner);

        if shutdown.is_requested() {
            trace!(%caller, reason = "shutdown", "consume rejected");
            return None;
        }

        let Some(item) = cells.pop() else {
            trace!(%caller, reason = "timeout", "consume rejected");
            return None;
        };

        self.count.store(cells.len(), Ordering::Release);
        drop(cells);
        self.not_full.notify_one();
        Some(item)
    }

    #[inline]
    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn wake_all(&self) {
        // Passing through the lock guarantees every waiter that checked the
        // predicate before shutdown was requested is now parked on a condvar.
        drop(self.lock());

        debug!(capacity = self.capacity, "waking all blocked callers");
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

impl<T> fmt::Debug for BlockingRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingRingBuffer")
            .field("capacity", &self.capacity)
            .field("count", &self.count.load(Ordering::Relaxed))
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}
