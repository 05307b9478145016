//! Backing storage shared by the ring implementations.
//!
//! - [`allocate`] builds the fixed-length cell array, failing at
//!   construction (never later) on zero capacity or allocation failure.
//! - [`Slot`] is a cell with a sequence number, used by the lock-free ring.
//! - [`Cells`] is a plain array with read/write cursors, used by the
//!   blocking ring under its mutex.

use std::mem::MaybeUninit;

use crate::error::RingError;
use crate::sync::{AtomicUsize, UnsafeCell};

/// Allocates `capacity` cells, initializing cell `i` with `init(i)`.
pub(crate) fn allocate<C>(
    capacity: usize,
    init: impl FnMut(usize) -> C,
) -> Result<Box<[C]>, RingError> {
    if capacity == 0 {
        return Err(RingError::ZeroCapacity);
    }

    let mut cells = Vec::new();
    cells
        .try_reserve_exact(capacity)
        .map_err(|source| RingError::Allocation { capacity, source })?;
    cells.extend((0..capacity).map(init));

    Ok(cells.into_boxed_slice())
}

/// A cell in the sequenced ring.
///
/// The sequence number encodes who may touch the cell next. With `pos` the
/// cursor position currently mapped to this cell and `lap` the lap size:
/// - `sequence == pos`: empty, the producer claiming `pos` may write
/// - `sequence == pos + 1`: written, the consumer claiming `pos` may read
/// - `sequence == pos + lap`: read, writable again on the next lap
pub(crate) struct Slot<T> {
    pub(crate) sequence: AtomicUsize,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(sequence: usize) -> Self {
        Self {
            sequence: AtomicUsize::new(sequence),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// A fixed array of cells addressed by wrapping read/write cursors.
///
/// Holds items in `[head, head + len)` modulo capacity. Not synchronized;
/// callers provide exclusion.
#[derive(Debug)]
pub(crate) struct Cells<T> {
    cells: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Cells<T> {
    pub(crate) fn new(capacity: usize) -> Result<Self, RingError> {
        Ok(Self {
            cells: allocate(capacity, |_| None)?,
            head: 0,
            tail: 0,
            len: 0,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Writes at the write cursor. Returns the item back if full.
    #[inline]
    pub(crate) fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.cells[self.tail] = Some(item);
        self.tail = self.advance(self.tail);
        self.len += 1;
        Ok(())
    }

    /// Takes the oldest item.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.cells[self.head].take();
        debug_assert!(item.is_some(), "occupied cell was empty");
        self.head = self.advance(self.head);
        self.len -= 1;
        item
    }

    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.capacity() { 0 } else { next }
    }
}
