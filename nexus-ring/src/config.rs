//! Runtime selection of a ring strategy.
//!
//! Orchestration code holds a [`RingConfig`] and calls
//! [`build`](RingConfig::build) to get a `Box<dyn RingBuffer<T>>`. Changing
//! strategy or capacity means building a new ring; a built ring never
//! changes shape.

use std::fmt;
use std::mem;
use std::str::FromStr;
use std::time::Duration;

use crate::RingBuffer;
use crate::array::ArrayRingBuffer;
use crate::blocking::{BlockingRingBuffer, DEFAULT_WAIT};
use crate::error::RingError;
use crate::lockfree::LockFreeRingBuffer;

/// Which synchronization strategy a ring uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RingKind {
    /// [`BlockingRingBuffer`]: mutex + condition variables.
    Blocking,
    /// [`LockFreeRingBuffer`]: per-slot sequence numbers + CAS.
    #[default]
    LockFree,
    /// [`ArrayRingBuffer`]: `crossbeam_queue::ArrayQueue`.
    Array,
}

impl RingKind {
    /// Every strategy, in a stable order.
    pub const ALL: [Self; 3] = [Self::Blocking, Self::LockFree, Self::Array];

    /// Canonical name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::LockFree => "lockfree",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for RingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RingKind {
    type Err = RingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "mutex" => Ok(Self::Blocking),
            "lockfree" | "lock-free" | "lock_free" => Ok(Self::LockFree),
            "array" | "concurrent_queue" => Ok(Self::Array),
            _ => Err(RingError::UnknownKind(s.to_owned())),
        }
    }
}

/// Strategy and sizing for a ring.
///
/// # Example
///
/// ```
/// use nexus_ring::{RingConfig, RingKind};
///
/// let kind: RingKind = "mutex".parse().unwrap();
/// let ring = RingConfig::new(kind, 64).build::<u32>().unwrap();
///
/// assert_eq!(ring.capacity(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RingConfig {
    /// Synchronization strategy.
    pub kind: RingKind,
    /// Number of cells.
    pub capacity: usize,
    /// Bound on a single wait in the blocking strategy. Ignored by the
    /// others.
    pub wait: Duration,
}

impl RingConfig {
    /// Default number of cells.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a config with the default wait window.
    #[must_use]
    pub const fn new(kind: RingKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            wait: DEFAULT_WAIT,
        }
    }

    /// Sizes the ring so its cells occupy at most `bytes` (at least one
    /// cell).
    #[must_use]
    pub const fn for_byte_budget<T>(kind: RingKind, bytes: usize) -> Self {
        let size = if mem::size_of::<T>() == 0 {
            1
        } else {
            mem::size_of::<T>()
        };
        let capacity = bytes / size;
        Self::new(kind, if capacity == 0 { 1 } else { capacity })
    }

    /// Replaces the blocking wait window.
    #[must_use]
    pub const fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Builds a ring of this shape.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::ZeroCapacity`] if `capacity` is zero and
    /// [`RingError::Allocation`] if the storage cannot be reserved.
    pub fn build<T: Copy + Send + 'static>(&self) -> Result<Box<dyn RingBuffer<T>>, RingError> {
        let ring: Box<dyn RingBuffer<T>> = match self.kind {
            RingKind::Blocking => Box::new(BlockingRingBuffer::with_wait(self.capacity, self.wait)?),
            RingKind::LockFree => Box::new(LockFreeRingBuffer::new(self.capacity)?),
            RingKind::Array => Box::new(ArrayRingBuffer::new(self.capacity)?),
        };
        Ok(ring)
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(RingKind::default(), Self::DEFAULT_CAPACITY)
    }
}
