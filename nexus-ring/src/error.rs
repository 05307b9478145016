//! Construction errors.
//!
//! Ring operations themselves never fail with an error: a rejected
//! `produce`/`consume` is backpressure or shutdown, reported as `false` /
//! `None`. Only building a ring can fail.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors that can occur when building a ring buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    /// A ring must hold at least one item.
    #[error("ring capacity must be non-zero")]
    ZeroCapacity,
    /// The backing storage could not be reserved.
    #[error("failed to allocate storage for {capacity} cells")]
    Allocation {
        /// The requested capacity.
        capacity: usize,
        /// The allocator's report.
        #[source]
        source: TryReserveError,
    },
    /// A ring kind name did not match any strategy.
    #[error("unknown ring kind `{0}` (expected blocking, lockfree or array)")]
    UnknownKind(String),
}
