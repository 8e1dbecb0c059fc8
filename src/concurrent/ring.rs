//! Lock-free single-producer / single-consumer ring buffer
//!
//! Bounded FIFO with one designated writer and one designated reader. The
//! indices wrap modulo a power-of-two capacity and one slot is intentionally
//! wasted so that full and empty are distinguishable without a separate
//! counter: empty when `head == tail`, full when `(tail + 1) & mask == head`.
//!
//! ## Memory ordering
//!
//! The producer's release-store of `tail` establishes happens-before with the
//! consumer's acquire-load of `tail`, so the slot write is visible before the
//! index advance. An owner's load of its own index is relaxed; only one
//! thread ever writes it.
//!
//! ## Layout
//!
//! `head` and `tail` each occupy their own cache line (`CachePadded`).
//! Co-locating them would have every producer-side store invalidate the
//! consumer's cached line and vice versa, costing roughly an order of
//! magnitude per operation under contention. The slot array lives in a
//! separate allocation.
//!
//! ## Misuse
//!
//! More than one producer or more than one consumer is unrepresentable: the
//! endpoints are handed out once by [`ring`] and are not `Clone`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::error::{Result, TradeflowError};

/// Create a bounded SPSC ring with the given capacity.
///
/// Capacity must be a power of two and at least 2; one slot is reserved, so
/// at most `capacity - 1` items are in flight at once.
pub fn ring<T: Send>(capacity: usize) -> Result<(Producer<T>, Consumer<T>)> {
    if capacity < 2 || !capacity.is_power_of_two() {
        return Err(TradeflowError::config(format!(
            "ring capacity must be a power of two >= 2, got {capacity}"
        )));
    }

    let slots: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();

    let shared = Arc::new(Shared {
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
        slots,
        mask: capacity - 1,
    });

    Ok((
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    ))
}

struct Shared<T> {
    /// Consumer-owned index, isolated on its own cache line
    head: CachePadded<AtomicUsize>,
    /// Producer-owned index, isolated on its own cache line
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
}

unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Both endpoints are gone; drain whatever was pushed but not popped.
        let mut head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        while head != tail {
            unsafe {
                (*self.slots[head].get()).assume_init_drop();
            }
            head = (head + 1) & self.mask;
        }
    }
}

/// Writing endpoint of the ring; exactly one exists per ring
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

unsafe impl<T: Send> Send for Producer<T> {}

impl<T> Producer<T> {
    /// Attempt to enqueue an item.
    ///
    /// Returns the item back on a full ring so the caller decides whether to
    /// yield, spin or apply back-pressure. Never blocks.
    #[inline]
    pub fn try_push(&mut self, item: T) -> std::result::Result<(), T> {
        let shared = &*self.shared;
        // Own index: only this thread stores it.
        let tail = shared.tail.load(Ordering::Relaxed);
        let next = (tail + 1) & shared.mask;

        if next == shared.head.load(Ordering::Acquire) {
            return Err(item);
        }

        unsafe {
            (*shared.slots[tail].get()).write(item);
        }
        // Publishes the slot write to the consumer.
        shared.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Ring capacity including the reserved slot
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }

    /// True when the consumer endpoint has been dropped
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}

/// Reading endpoint of the ring; exactly one exists per ring
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Attempt to dequeue the oldest item. Never blocks.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let shared = &*self.shared;
        // Own index: only this thread stores it.
        let head = shared.head.load(Ordering::Relaxed);

        if head == shared.tail.load(Ordering::Acquire) {
            return None;
        }

        let item = unsafe { (*shared.slots[head].get()).assume_init_read() };
        shared.head.store((head + 1) & shared.mask, Ordering::Release);
        Some(item)
    }

    /// Ring capacity including the reserved slot
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }

    /// True when the producer endpoint has been dropped
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        Arc::strong_count(&self.shared) == 1
    }
}
