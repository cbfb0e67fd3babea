#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-buffer` provides the two data structures that give the acquisition
//! pipeline its bounded-memory backpressure: [`Chunk`], a fixed-capacity byte
//! buffer with a used-bytes watermark, and [`RingBuffer`], the dual-queue
//! recycler that hands chunks back and forth between a producer and a
//! consumer thread.
//!
//! # Design
//!
//! A `RingBuffer` of size `N` never allocates after construction: all `N`
//! chunks are created up front and only ever move between the `full` queue,
//! the `empty` queue, and whichever thread currently holds one, using the
//! same `crossbeam-channel` bounded-channel primitive as the rest of this
//! workspace's producer/consumer plumbing.
//!
//! # Invariants
//!
//! - `0 <= chunk.used() <= chunk.capacity()` always.
//! - `|full| + |empty| + in_flight == N` at every instant, where `in_flight`
//!   counts chunks currently checked out by the producer or consumer.
//! - [`RingBuffer::exit`] is monotonic: once set, it is never cleared.

mod chunk;
mod ring;

pub use chunk::Chunk;
pub use ring::RingBuffer;
