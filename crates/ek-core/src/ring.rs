//! Lock-free single-producer/single-consumer ring primitive
//!
//! `SpscRing` owns a fixed block of `capacity` slots and two positions:
//! `head` (next slot to read, written only by the consumer) and `tail`
//! (next slot to write, written only by the producer). Positions run over
//! `[0, 2 * capacity)` so a completely full ring is distinguishable from an
//! empty one without reserving a slot; the storage index of a position is
//! the position modulo `capacity`.
//!
//! Each side loads its own position `Relaxed` and the peer's position
//! `Acquire`, moves data, and only then publishes its own position with
//! `Release`. That pairing is the whole synchronization contract: the slots
//! inside a side's window are never touched by the other side.
//!
//! The data-moving methods are `unsafe` because the ring cannot check the
//! single-producer/single-consumer discipline itself. The typed halves in
//! `ek-audio` and `ek-input` uphold it statically.

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use crate::error::RingError;

/// Fixed-capacity SPSC ring of `Copy` slots
pub struct SpscRing<T> {
    capacity: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<T>]>,
}

// SAFETY: slots are only reached through the unsafe methods below, whose
// contracts keep the producer and consumer windows disjoint.
unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T: Copy> SpscRing<T> {
    /// Create a ring of `capacity` slots, each initialized to `fill`.
    pub fn new(capacity: usize, fill: T) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }
        // Positions need `2 * capacity`; storage must fit one allocation.
        let bytes = capacity.checked_mul(std::mem::size_of::<T>());
        if capacity > usize::MAX / 2 || bytes.map_or(true, |b| b > isize::MAX as usize) {
            return Err(RingError::CapacityOverflow(capacity));
        }

        let slots = (0..capacity).map(|_| UnsafeCell::new(fill)).collect();

        Ok(Self {
            capacity,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
        })
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the number of readable slots.
    pub fn available_read(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        self.occupied(head, tail)
    }

    /// Snapshot of the number of writable slots.
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read()
    }

    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Copy all of `src` into the ring, or nothing if it does not fit.
    ///
    /// Returns the number of slots written: `src.len()` or 0.
    ///
    /// # Safety
    /// The caller must be the only producer of this ring for the duration
    /// of the call, and must not run concurrently with [`Self::reset`].
    pub unsafe fn push_slice(&self, src: &[T]) -> usize {
        let len = src.len();
        if len == 0 {
            return 0;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if self.capacity - self.occupied(head, tail) < len {
            return 0;
        }

        let start = self.slot(tail);
        let first = len.min(self.capacity - start);
        let base = self.base_ptr();
        ptr::copy_nonoverlapping(src.as_ptr(), base.add(start), first);
        ptr::copy_nonoverlapping(src.as_ptr().add(first), base, len - first);

        self.tail.store(self.advance(tail, len), Ordering::Release);
        len
    }

    /// Fill all of `dst` from the ring, or nothing if not enough is readable.
    ///
    /// Returns the number of slots read: `dst.len()` or 0.
    ///
    /// # Safety
    /// The caller must be the only consumer of this ring for the duration
    /// of the call, and must not run concurrently with [`Self::reset`].
    pub unsafe fn pop_slice(&self, dst: &mut [T]) -> usize {
        let len = dst.len();
        if len == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if self.occupied(head, tail) < len {
            return 0;
        }

        let start = self.slot(head);
        let first = len.min(self.capacity - start);
        let base = self.base_ptr();
        ptr::copy_nonoverlapping(base.add(start), dst.as_mut_ptr(), first);
        ptr::copy_nonoverlapping(base, dst.as_mut_ptr().add(first), len - first);

        self.head.store(self.advance(head, len), Ordering::Release);
        len
    }

    /// Write a single slot. Returns false, leaving the ring untouched, when full.
    ///
    /// # Safety
    /// Same contract as [`Self::push_slice`].
    pub unsafe fn push(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if self.occupied(head, tail) == self.capacity {
            return false;
        }

        self.base_ptr().add(self.slot(tail)).write(value);
        self.tail.store(self.advance(tail, 1), Ordering::Release);
        true
    }

    /// Deliver exactly the slots readable at entry, oldest first.
    ///
    /// Each slot is copied out and released back to the producer before
    /// `sink` sees it, so `sink` may push into the ring. Anything pushed
    /// after the entry snapshot is left for the next call. Returns the
    /// number of slots delivered.
    ///
    /// # Safety
    /// Same contract as [`Self::pop_slice`].
    pub unsafe fn drain<F>(&self, mut sink: F) -> usize
    where
        F: FnMut(T),
    {
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let available = self.occupied(head, tail);

        let base = self.base_ptr();
        for _ in 0..available {
            let value = base.add(self.slot(head)).read();
            head = self.advance(head, 1);
            self.head.store(head, Ordering::Release);
            sink(value);
        }

        available
    }

    /// Rewind both positions to zero, discarding any readable slots.
    ///
    /// # Safety
    /// Neither the producer nor the consumer may be inside any other method
    /// of this ring while the reset runs.
    pub unsafe fn reset(&self) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
    }

    #[inline]
    fn base_ptr(&self) -> *mut T {
        UnsafeCell::raw_get(self.slots.as_ptr())
    }

    /// Size of the position space
    #[inline]
    fn span(&self) -> usize {
        self.capacity * 2
    }

    #[inline]
    fn occupied(&self, head: usize, tail: usize) -> usize {
        if tail >= head {
            tail - head
        } else {
            self.span() - head + tail
        }
    }

    /// `pos + n` wrapped into the position space, for `n <= capacity`.
    #[inline]
    fn advance(&self, pos: usize, n: usize) -> usize {
        let to_end = self.span() - pos;
        if n >= to_end {
            n - to_end
        } else {
            pos + n
        }
    }

    #[inline]
    fn slot(&self, pos: usize) -> usize {
        if pos >= self.capacity {
            pos - self.capacity
        } else {
            pos
        }
    }
}

impl<T> fmt::Debug for SpscRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscRing")
            .field("capacity", &self.capacity)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}
