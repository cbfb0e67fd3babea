//! [`RingBuffer`]: the dual-queue chunk recycler shared by a pipeline's
//! producer and consumer threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::chunk::Chunk;

/// A bounded recycler of [`Chunk`]s shared between exactly one producer and
/// one consumer thread.
///
/// Internally it is two bounded channels of capacity `N`: `full` carries
/// chunks the producer has finished filling, `empty` carries chunks the
/// consumer has finished writing out. At any instant the number of chunks
/// owned by `full`, `empty`, and whichever thread currently holds one
/// in-flight sums to exactly `N` — chunks are neither created nor destroyed
/// after construction.
pub struct RingBuffer {
    full_tx: Sender<Chunk>,
    full_rx: Receiver<Chunk>,
    empty_tx: Sender<Chunk>,
    empty_rx: Receiver<Chunk>,
    exit: AtomicBool,
}

impl RingBuffer {
    /// Preallocates `n` chunks of `chunk_size` bytes and seeds the `empty`
    /// queue with all of them.
    pub fn new(n: usize, chunk_size: usize) -> facq_core::Result<Self> {
        let (full_tx, full_rx) = bounded(n.max(1));
        let (empty_tx, empty_rx) = bounded(n.max(1));
        for _ in 0..n {
            empty_tx
                .send(Chunk::new(chunk_size)?)
                .expect("empty queue has room for every preallocated chunk");
        }
        Ok(RingBuffer {
            full_tx,
            full_rx,
            empty_tx,
            empty_rx,
            exit: AtomicBool::new(false),
        })
    }

    /// Producer: appends a full chunk to the `full` queue. Never blocks in
    /// practice, since a chunk pushed here was always first obtained via
    /// [`Self::get_recycled`] or [`Self::try_get_recycled`].
    pub fn push(&self, chunk: Chunk) {
        let _ = self.full_tx.send(chunk);
    }

    /// Consumer: blocks until a full chunk is available.
    pub fn pop(&self) -> Option<Chunk> {
        self.full_rx.recv().ok()
    }

    /// Consumer: non-blocking variant of [`Self::pop`].
    pub fn try_pop(&self) -> Option<Chunk> {
        self.full_rx.try_recv().ok()
    }

    /// Consumer: waits up to `timeout` for a full chunk.
    pub fn timeout_pop(&self, timeout: Duration) -> Option<Chunk> {
        match self.full_rx.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Producer: blocks until an empty (recycled) chunk is available.
    pub fn get_recycled(&self) -> Option<Chunk> {
        self.empty_rx.recv().ok()
    }

    /// Producer: non-blocking variant of [`Self::get_recycled`]. Callers
    /// must treat `None` as "no chunk available right now", not as an error.
    pub fn try_get_recycled(&self) -> Option<Chunk> {
        self.empty_rx.try_recv().ok()
    }

    /// Consumer: clears `chunk` and returns it to the `empty` queue.
    pub fn recycle(&self, mut chunk: Chunk) {
        chunk.clear();
        let _ = self.empty_tx.send(chunk);
    }

    /// Sets the monotonic exit flag. Once set it is never cleared.
    pub fn set_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    /// Whether [`Self::set_exit`] has been called.
    pub fn exit(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_ring_seeds_empty_queue() {
        let ring = RingBuffer::new(4, 16).unwrap();
        for _ in 0..4 {
            assert!(ring.try_get_recycled().is_some());
        }
        assert!(ring.try_get_recycled().is_none());
    }

    #[test]
    fn push_then_pop_round_trips_a_chunk() {
        let ring = RingBuffer::new(2, 16).unwrap();
        let mut chunk = ring.get_recycled().unwrap();
        chunk.add_used(4);
        ring.push(chunk);
        let popped = ring.pop().unwrap();
        assert_eq!(popped.used(), 4);
    }

    #[test]
    fn recycle_clears_watermark() {
        let ring = RingBuffer::new(1, 16).unwrap();
        let mut chunk = ring.get_recycled().unwrap();
        chunk.add_used(8);
        ring.recycle(chunk);
        let recycled = ring.try_get_recycled().unwrap();
        assert_eq!(recycled.used(), 0);
    }

    #[test]
    fn exit_flag_is_monotonic() {
        let ring = RingBuffer::new(1, 16).unwrap();
        assert!(!ring.exit());
        ring.set_exit();
        assert!(ring.exit());
        ring.set_exit();
        assert!(ring.exit());
    }

    #[test]
    fn timeout_pop_returns_none_when_empty() {
        let ring = RingBuffer::new(1, 16).unwrap();
        assert!(ring
            .timeout_pop(Duration::from_millis(10))
            .is_none());
    }

    #[test]
    fn ring_of_one_pings_pongs_between_threads() {
        let ring = Arc::new(RingBuffer::new(1, 8).unwrap());
        let producer_ring = Arc::clone(&ring);
        let producer = thread::spawn(move || {
            for i in 0..5u8 {
                let mut chunk = producer_ring.get_recycled().unwrap();
                chunk.write_position()[0] = i;
                chunk.add_used(1);
                producer_ring.push(chunk);
            }
        });
        let mut seen = Vec::new();
        for _ in 0..5 {
            let chunk = ring.pop().unwrap();
            seen.push(chunk.used_bytes()[0]);
            ring.recycle(chunk);
        }
        producer.join().unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn shutdown_drains_every_pushed_chunk_with_a_slow_consumer() {
        let ring = Arc::new(RingBuffer::new(4, 8).unwrap());
        let producer_ring = Arc::clone(&ring);
        let producer = thread::spawn(move || {
            for i in 0..10u8 {
                let mut chunk = producer_ring.get_recycled().unwrap();
                chunk.write_position()[0] = i;
                chunk.add_used(1);
                producer_ring.push(chunk);
            }
            producer_ring.set_exit();
        });

        let mut seen = Vec::new();
        loop {
            match ring.timeout_pop(Duration::from_millis(100)) {
                Some(chunk) => {
                    thread::sleep(Duration::from_millis(50));
                    seen.push(chunk.used_bytes()[0]);
                    ring.recycle(chunk);
                }
                None if ring.exit() => break,
                None => continue,
            }
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<u8>>());
        assert!(ring.exit());
    }
}
