//! Single-producer/single-consumer byte ring buffer.
//!
//! The UART receive interrupt owns the `Producer`, the main loop owns the
//! `Consumer`. Storage is a `heapless::spsc::Queue`, which keeps one slot
//! empty: usable capacity is `N - 1`. On top of it sits a drop counter for
//! bytes the interrupt could not enqueue.

use core::sync::atomic::{AtomicU16, Ordering};

use heapless::spsc;

/// Receive buffer size used by the serial channel.
/// Must hold at least one full command burst between two main-loop passes.
pub const RX_BUFFER_SIZE: usize = 64;

/// Fixed-capacity circular byte buffer. `N` must be a power of two.
pub struct RingBuffer<const N: usize> {
    queue: spsc::Queue<u8, N>,
    dropped: AtomicU16,
}

impl<const N: usize> RingBuffer<N> {
    const SIZE_OK: () = {
        assert!(N.is_power_of_two(), "ring buffer size must be a power of two");
        assert!(N >= 2, "ring buffer needs at least two slots");
    };

    pub const fn new() -> Self {
        let () = Self::SIZE_OK;
        Self {
            queue: spsc::Queue::new(),
            dropped: AtomicU16::new(0),
        }
    }

    /// Split into the interrupt-side and main-loop-side handles.
    ///
    /// Taking `&mut self` means there can only ever be one pair alive.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let (producer, consumer) = self.queue.split();
        let dropped = &self.dropped;
        (
            Producer {
                queue: producer,
                dropped,
            },
            Consumer {
                queue: consumer,
                dropped,
            },
        )
    }

    /// Usable capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write handle, owned by the receive interrupt.
pub struct Producer<'a, const N: usize> {
    queue: spsc::Producer<'a, u8, N>,
    dropped: &'a AtomicU16,
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte. Returns false and counts a dropped byte when full.
    /// O(1), never blocks.
    pub fn try_push(&mut self, byte: u8) -> bool {
        if self.queue.enqueue(byte).is_ok() {
            return true;
        }
        // Only this side writes the counter; wrapping, it is diagnostic only
        let dropped = self.dropped.load(Ordering::Relaxed);
        self.dropped.store(dropped.wrapping_add(1), Ordering::Relaxed);
        false
    }

    /// Number of bytes that can still be pushed before the buffer is full.
    pub fn available_to_write(&self) -> usize {
        self.queue.capacity() - self.queue.len()
    }
}

/// Read handle, owned by the main loop.
pub struct Consumer<'a, const N: usize> {
    queue: spsc::Consumer<'a, u8, N>,
    dropped: &'a AtomicU16,
}

impl<const N: usize> Consumer<'_, N> {
    /// Take the oldest byte, if any. Never blocks.
    pub fn pop_if_ready(&mut self) -> Option<u8> {
        self.queue.dequeue()
    }

    /// Number of bytes ready to read.
    pub fn available_to_read(&self) -> usize {
        self.queue.len()
    }

    /// Bytes dropped because the buffer was full. Monotonic (wrapping) for uptime.
    pub fn dropped(&self) -> u16 {
        self.dropped.load(Ordering::Relaxed)
    }
}
