//! Lock-free bounded MPMC ring using per-slot stamps.
//!
//! Producers claim positions by CAS on `tail`, consumers by CAS on `head`.
//! A position packs a lap and a slot index, `pos = lap + index`, where one
//! lap is the smallest power of two above the capacity. Stepping past the
//! last index jumps to index 0 of the next lap, so any capacity works and a
//! cursor overflowing `usize` keeps its index intact.
//!
//! Each slot carries a stamp that says what may happen to it next:
//!
//! ```text
//! producer at pos:                         consumer at pos:
//!   stamp == pos     -> CAS tail, write,     stamp == pos + 1 -> CAS head, read,
//!                       stamp = pos + 1                         stamp = pos + lap
//!   stamp <  pos     -> full                 stamp <  pos + 1 -> empty
//!   stamp >  pos     -> stale tail, retry    stamp >  pos + 1 -> stale head, retry
//! ```
//!
//! The readable stamp `pos + 1` has index at most `capacity`, which is
//! below one lap, so it never equals a writable stamp, even with a single
//! slot.
//!
//! The `Release` store of a new stamp publishes the slot contents to
//! whoever observes it with an `Acquire` load. Stamps are compared by
//! signed wrapping distance.
//!
//! Nothing here ever parks: contended callers spin, then yield. Every loop
//! iteration rechecks the shutdown flag.

use std::fmt;
use std::mem::MaybeUninit;

use crossbeam_utils::CachePadded;

use crate::error::RingError;
use crate::shutdown::Shutdown;
use crate::storage::{Slot, allocate};
use crate::sync::{AtomicUsize, Backoff, Ordering};
use crate::trace::{debug, trace};
use crate::{CallerId, RingBuffer};

/// A bounded MPMC ring coordinated purely through atomics.
///
/// Full and empty are reported immediately; only contention with other
/// producers (or consumers) causes a retry.
///
/// # Example
///
/// ```
/// use nexus_ring::{CallerId, LockFreeRingBuffer, RingBuffer, Shutdown};
///
/// let ring = LockFreeRingBuffer::<u32>::new(2).unwrap();
/// let shutdown = Shutdown::new();
///
/// assert!(ring.produce(1, CallerId(0), &shutdown));
/// assert!(ring.produce(2, CallerId(0), &shutdown));
/// assert!(!ring.produce(3, CallerId(0), &shutdown));
///
/// assert_eq!(ring.consume(CallerId(1), &shutdown), Some(1));
/// assert_eq!(ring.consume(CallerId(1), &shutdown), Some(2));
/// assert_eq!(ring.consume(CallerId(1), &shutdown), None);
/// ```
pub struct LockFreeRingBuffer<T> {
    /// Next position a consumer will claim.
    head: CachePadded<AtomicUsize>,
    /// Next position a producer will claim.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    capacity: usize,
    /// Power of two above `capacity`; the low bits of a position are its
    /// slot index.
    one_lap: usize,
}

// Safety: slot contents are only accessed by the thread that won the CAS
// for that position, and handed over through the slot's stamp.
unsafe impl<T: Send> Send for LockFreeRingBuffer<T> {}
unsafe impl<T: Send> Sync for LockFreeRingBuffer<T> {}

impl<T> LockFreeRingBuffer<T> {
    /// Creates a ring holding up to `capacity` items.
    ///
    /// Any capacity is accepted as-is (no rounding).
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] if `capacity` is zero and
    /// [`RingError::Allocation`] if the slots cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        Self::starting_at(capacity, 0)
    }

    /// Creates an empty ring whose cursors both start at index 0 of the lap
    /// containing `start`.
    fn starting_at(capacity: usize, start: usize) -> Result<Self, RingError> {
        let one_lap = lap_size(capacity);
        let lap = start & !(one_lap - 1);
        let slots = allocate(capacity, |index| Slot::new(lap.wrapping_add(index)))?;

        debug!(capacity, one_lap, "lock-free ring created");

        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(lap)),
            tail: CachePadded::new(AtomicUsize::new(lap)),
            slots,
            capacity,
            one_lap,
        })
    }

    #[inline]
    fn slot(&self, pos: usize) -> &Slot<T> {
        &self.slots[pos & (self.one_lap - 1)]
    }

    /// The position after `pos`: next index, or index 0 of the next lap.
    #[inline]
    fn next(&self, pos: usize) -> usize {
        let index = pos & (self.one_lap - 1);
        if index + 1 < self.capacity {
            pos.wrapping_add(1)
        } else {
            (pos & !(self.one_lap - 1)).wrapping_add(self.one_lap)
        }
    }
}

/// Smallest power of two strictly above `capacity`.
///
/// Saturates at the top bit; capacities that large never allocate.
const fn lap_size(capacity: usize) -> usize {
    const TOP: usize = 1 << (usize::BITS - 1);

    match capacity.checked_add(1) {
        Some(n) => match n.checked_next_power_of_two() {
            Some(lap) => lap,
            None => TOP,
        },
        None => TOP,
    }
}

/// Signed distance from `b` to `a`, tolerant of cursor wraparound.
#[inline]
#[allow(clippy::cast_possible_wrap)]
const fn distance(a: usize, b: usize) -> isize {
    a.wrapping_sub(b) as isize
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
impl<T: Copy + Send> RingBuffer<T> for LockFreeRingBuffer<T> {
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        let backoff = Backoff::new();
        let mut tail = self.tail.load(Ordering::Relaxed);

        while !shutdown.is_requested() {
            let slot = self.slot(tail);
            let stamp = slot.sequence.load(Ordering::Acquire);
            let diff = distance(stamp, tail);

            if diff == 0 {
                match self.tail.compare_exchange_weak(
                    tail,
                    self.next(tail),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: winning the CAS for `tail` makes us the only
                        // writer of this slot until the stamp is published.
                        slot.value
                            .with_mut(|value| unsafe { value.write(MaybeUninit::new(item)) });
                        slot.sequence
                            .store(tail.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => {
                        tail = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                // Slot still holds last lap's item
                trace!(%caller, reason = "full", "produce rejected");
                return false;
            } else {
                tail = self.tail.load(Ordering::Relaxed);
                backoff.snooze();
            }
        }

        trace!(%caller, reason = "shutdown", "produce rejected");
        false
    }

    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);

        while !shutdown.is_requested() {
            let slot = self.slot(head);
            let stamp = slot.sequence.load(Ordering::Acquire);
            let diff = distance(stamp, head.wrapping_add(1));

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    head,
                    self.next(head),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: the readable stamp was loaded with Acquire,
                        // pairing with the producer's Release publish, and
                        // winning the CAS makes us the only reader of it.
                        let item = slot.value.with(|value| unsafe { value.read().assume_init() });
                        slot.sequence
                            .store(head.wrapping_add(self.one_lap), Ordering::Release);
                        return Some(item);
                    }
                    Err(current) => {
                        head = current;
                        backoff.spin();
                    }
                }
            } else if diff < 0 {
                trace!(%caller, reason = "empty", "consume rejected");
                return None;
            } else {
                head = self.head.load(Ordering::Relaxed);
                backoff.snooze();
            }
        }

        trace!(%caller, reason = "shutdown", "consume rejected");
        None
    }

    fn count(&self) -> usize {
        let mask = self.one_lap - 1;

        loop {
            // Retry until tail is unchanged around the head load, so both
            // belong to one instant.
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);

            if self.tail.load(Ordering::Acquire) == tail {
                let (hix, tix) = (head & mask, tail & mask);

                return if hix < tix {
                    tix - hix
                } else if hix > tix {
                    self.capacity - hix + tix
                } else if tail == head {
                    0
                } else {
                    self.capacity
                };
            }
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn wake_all(&self) {
        // Callers never park; shutdown is seen on the next loop iteration.
        debug!(capacity = self.capacity, "wake_all on lock-free ring (no-op)");
    }
}

impl<T> fmt::Debug for LockFreeRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockFreeRingBuffer")
            .field("capacity", &self.capacity)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
