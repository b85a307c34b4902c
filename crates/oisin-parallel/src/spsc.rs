// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lock-free single-producer single-consumer ring
//!
//! The transport between pipeline stages. One thread owns the producer
//! half, one owns the consumer half; the ring itself is a fixed array of
//! slots indexed by two monotonically increasing cursors. The producer
//! publishes with a release store of its cursor, the consumer retires
//! with a release store of its own, and each side acquires the other's
//! cursor before touching a slot. No slot is ever accessed by both sides
//! at the same time.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

struct RingShared<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Next slot index the consumer will read
    head: AtomicUsize,
    /// Next slot index the producer will write
    tail: AtomicUsize,
    producer_gone: AtomicBool,
    consumer_gone: AtomicBool,
}

// SAFETY: slot access is partitioned by the head/tail protocol: the
// producer only writes slots in [tail, head + capacity), the consumer
// only reads slots in [head, tail), and cursor updates use release/acquire
// pairs. T crossing threads needs Send only.
unsafe impl<T: Send> Sync for RingShared<T> {}
unsafe impl<T: Send> Send for RingShared<T> {}

impl<T> Drop for RingShared<T> {
    fn drop(&mut self) {
        // Exclusive access here: drain whatever was produced but never
        // consumed
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let capacity = self.slots.len();
        for index in head..tail {
            // SAFETY: slots in [head, tail) hold initialised values that
            // no other thread can touch any more.
            unsafe {
                (*self.slots[index % capacity].get()).assume_init_drop();
            }
        }
    }
}

/// Sending half of a ring; exactly one exists per channel
pub struct Producer<T> {
    shared: Arc<RingShared<T>>,
}

/// Receiving half of a ring; exactly one exists per channel
pub struct Consumer<T> {
    shared: Arc<RingShared<T>>,
}

impl<T> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").finish_non_exhaustive()
    }
}

/// Create a bounded ring with room for `capacity` in-flight values
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn ring<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "ring capacity must be non-zero");
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let shared = Arc::new(RingShared {
        slots,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
        producer_gone: AtomicBool::new(false),
        consumer_gone: AtomicBool::new(false),
    });
    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

impl<T: Send> Producer<T> {
    /// Attempt to enqueue without blocking
    ///
    /// # Errors
    ///
    /// Returns the value back when the ring is full or the consumer is
    /// gone.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let shared = &self.shared;
        if shared.consumer_gone.load(Ordering::Acquire) {
            return Err(TrySendError::Disconnected(value));
        }
        let tail = shared.tail.load(Ordering::Relaxed);
        let head = shared.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) == shared.slots.len() {
            return Err(TrySendError::Full(value));
        }
        // SAFETY: the slot at tail is outside [head, tail) so the consumer
        // will not touch it until the release store below publishes it.
        unsafe {
            (*shared.slots[tail % shared.slots.len()].get()).write(value);
        }
        shared.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Enqueue, spinning (with yields) while the ring is full
    ///
    /// # Errors
    ///
    /// Returns the value back when the consumer has disconnected.
    pub fn send(&self, value: T) -> Result<(), T> {
        let mut pending = value;
        loop {
            match self.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(v)) => return Err(v),
                Err(TrySendError::Full(v)) => {
                    pending = v;
                    std::thread::yield_now();
                }
            }
        }
    }
}

impl<T: Send> Consumer<T> {
    /// Attempt to dequeue without blocking; `None` when the ring is empty
    #[must_use]
    pub fn try_recv(&self) -> Option<T> {
        let shared = &self.shared;
        let head = shared.head.load(Ordering::Relaxed);
        let tail = shared.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        // SAFETY: the slot at head is inside [head, tail), fully written
        // and published by the producer's release store.
        let value = unsafe { (*shared.slots[head % shared.slots.len()].get()).assume_init_read() };
        shared.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Dequeue, spinning (with yields) while the ring is empty
    ///
    /// Returns `None` once the producer has disconnected and the ring has
    /// drained.
    #[must_use]
    pub fn recv(&self) -> Option<T> {
        loop {
            if let Some(value) = self.try_recv() {
                return Some(value);
            }
            if self.shared.producer_gone.load(Ordering::Acquire) {
                // One more look: the producer may have published between
                // the empty check and the flag read
                return self.try_recv();
            }
            std::thread::yield_now();
        }
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.shared.producer_gone.store(true, Ordering::Release);
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.shared.consumer_gone.store(true, Ordering::Release);
    }
}

/// Failure modes of [`Producer::try_send`]
#[derive(Debug, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// Every slot is occupied
    Full(T),
    /// The consumer half was dropped
    Disconnected(T),
}
