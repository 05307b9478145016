//! Cooperative shutdown signal shared by every caller of a ring.

use std::fmt;

use crate::sync::{AtomicBool, Ordering};

/// A monotonic stop flag.
///
/// Producers and consumers pass the same `Shutdown` into every
/// [`produce`](crate::RingBuffer::produce) and
/// [`consume`](crate::RingBuffer::consume) call. Once [`request`](Self::request)
/// has been called, no operation blocks or spins indefinitely; it returns
/// the "not transferred" outcome instead.
///
/// The flag is never cleared. Running again means creating a new
/// `Shutdown` (and usually a new ring).
///
/// # Example
///
/// ```
/// use nexus_ring::{BlockingRingBuffer, CallerId, RingBuffer, Shutdown};
///
/// let ring = BlockingRingBuffer::<u32>::new(4).unwrap();
/// let shutdown = Shutdown::new();
///
/// assert!(ring.produce(1, CallerId(0), &shutdown));
///
/// shutdown.request();
/// ring.wake_all();
///
/// assert!(!ring.produce(2, CallerId(0), &shutdown));
/// ```
pub struct Shutdown {
    requested: AtomicBool,
}

impl Shutdown {
    /// Creates a signal in the "running" state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    /// Requests shutdown.
    ///
    /// Returns `true` if this call flipped the flag, `false` if shutdown
    /// had already been requested.
    #[inline]
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` once shutdown has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("requested", &self.is_requested())
            .finish()
    }
}
