//! # nexus-ring
//!
//! Bounded, fixed-capacity MPMC ring buffers of `Copy` items with
//! interchangeable synchronization strategies behind one trait.
//!
//! ## Strategies
//!
//! - [`LockFreeRingBuffer`]: per-slot sequence numbers and CAS on the
//!   cursors. Never parks; spins and yields while contended.
//! - [`BlockingRingBuffer`]: mutex plus "not full" / "not empty" condition
//!   variables, with a bounded wait window.
//! - [`ArrayRingBuffer`]: `crossbeam_queue::ArrayQueue` behind the same
//!   contract, as a reference point.
//!
//! All three implement [`RingBuffer`], so callers can pick a strategy at
//! runtime through [`RingConfig`] and swap it without touching call sites.
//!
//! ## Contract
//!
//! - Delivery is a single global FIFO: items come out in the order their
//!   `produce` calls completed.
//! - `produce` returning `false` / `consume` returning `None` means "not
//!   transferred". That is either backpressure (full / empty, try again)
//!   or shutdown; callers tell them apart by checking their [`Shutdown`].
//! - `count` is a momentary snapshot and never blocks.
//! - `wake_all` unblocks waiters; call it once after requesting shutdown,
//!   before joining worker threads.
//!
//! ## Example
//!
//! ```
//! use nexus_ring::{CallerId, RingConfig, RingKind, Shutdown};
//! use std::thread;
//!
//! let ring = RingConfig::new(RingKind::LockFree, 16).build::<u64>().unwrap();
//! let shutdown = Shutdown::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..100 {
//!             while !ring.produce(i, CallerId(1), &shutdown) {
//!                 std::hint::spin_loop();
//!             }
//!         }
//!     });
//!
//!     let mut expected = 0;
//!     while expected < 100 {
//!         if let Some(value) = ring.consume(CallerId(2), &shutdown) {
//!             assert_eq!(value, expected);
//!             expected += 1;
//!         }
//!     }
//! });
//!
//! shutdown.request();
//! ring.wake_all();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod array;
mod blocking;
mod config;
mod error;
pub mod harness;
mod lockfree;
mod shutdown;
mod storage;
mod sync;
mod trace;

use std::fmt;
use std::sync::Arc;

pub use array::ArrayRingBuffer;
pub use blocking::{BlockingRingBuffer, DEFAULT_WAIT};
pub use config::{RingConfig, RingKind};
pub use error::RingError;
pub use lockfree::LockFreeRingBuffer;
pub use shutdown::Shutdown;
pub use trace::init_tracing;

/// Identifies the producer or consumer making a call.
///
/// Only used to tag log events; it has no effect on synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CallerId(pub u32);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bounded FIFO shared by any number of producers and consumers.
///
/// Implementations differ only in how they synchronize; the observable
/// contract is the same. The trait is object safe so strategies can be
/// selected at runtime as `Box<dyn RingBuffer<T>>`.
pub trait RingBuffer<T>: Send + Sync {
    /// Attempts to insert `item`.
    ///
    /// Returns `true` once the item is visible to future
    /// [`consume`](Self::consume) calls. Returns `false` if the ring stayed
    /// full (try again later) or `shutdown` was observed (stop).
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool;

    /// Attempts to remove the oldest item.
    ///
    /// Returns `None` if the ring stayed empty (try again later) or
    /// `shutdown` was observed (stop).
    ///
    /// Shutdown does not drain: once it is requested, `consume` returns
    /// `None` even while items remain, and they stay in the ring. Callers
    /// that need every item should consume until [`count`](Self::count) is
    /// zero before requesting shutdown.
    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T>;

    /// Number of occupied cells, as of some recent instant.
    ///
    /// Never blocks and never exceeds [`capacity`](Self::capacity).
    fn count(&self) -> usize;

    /// The fixed capacity chosen at construction.
    fn capacity(&self) -> usize;

    /// Unblocks every caller waiting inside `produce` or `consume`.
    ///
    /// Safe to call any number of times from any thread.
    fn wake_all(&self);
}

impl<T, R: RingBuffer<T> + ?Sized> RingBuffer<T> for &R {
    #[inline]
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        (**self).produce(item, caller, shutdown)
    }

    #[inline]
    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        (**self).consume(caller, shutdown)
    }

    #[inline]
    fn count(&self) -> usize {
        (**self).count()
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    fn wake_all(&self) {
        (**self).wake_all();
    }
}

impl<T, R: RingBuffer<T> + ?Sized> RingBuffer<T> for Box<R> {
    #[inline]
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        (**self).produce(item, caller, shutdown)
    }

    #[inline]
    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        (**self).consume(caller, shutdown)
    }

    #[inline]
    fn count(&self) -> usize {
        (**self).count()
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    fn wake_all(&self) {
        (**self).wake_all();
    }
}

impl<T, R: RingBuffer<T> + ?Sized> RingBuffer<T> for Arc<R> {
    #[inline]
    fn produce(&self, item: T, caller: CallerId, shutdown: &Shutdown) -> bool {
        (**self).produce(item, caller, shutdown)
    }

    #[inline]
    fn consume(&self, caller: CallerId, shutdown: &Shutdown) -> Option<T> {
        (**self).consume(caller, shutdown)
    }

    #[inline]
    fn count(&self) -> usize {
        (**self).count()
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    fn wake_all(&self) {
        (**self).wake_all();
    }
}
