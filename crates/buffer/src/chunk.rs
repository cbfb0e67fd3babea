//! [`Chunk`]: a fixed-capacity byte buffer with a monotonic used-bytes
//! watermark, the unit of transfer between producer and consumer.

use facq_core::{Error, Result};

/// A contiguous, fixed-capacity byte buffer with a monotonic watermark
/// `used <= capacity`. Chunks carry no type tag of their own; whether their
/// bytes are raw source samples or converted `f64`s is contextual to the
/// pipeline stage holding them.
#[derive(Debug, Clone)]
pub struct Chunk {
    data: Vec<u8>,
    used: usize,
}

impl Chunk {
    /// Allocates a zeroed buffer of exactly `capacity` bytes. Returns
    /// [`Error::Resource`] instead of aborting the process if the
    /// allocation cannot be satisfied.
    pub fn new(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).map_err(|_| {
            Error::Resource(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("failed to allocate a {capacity}-byte chunk"),
            ))
        })?;
        data.resize(capacity, 0);
        Ok(Chunk { data, used: 0 })
    }

    /// Total capacity of this chunk, in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes currently considered valid/written.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Resets the watermark to zero. Buffer contents are left as-is but are
    /// logically undefined until overwritten.
    pub fn clear(&mut self) {
        self.used = 0;
    }

    /// Advances the watermark by `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `used + n` would exceed `capacity` — this is a programming
    /// error in the caller, not a recoverable condition.
    pub fn add_used(&mut self, n: usize) {
        assert!(
            self.used + n <= self.capacity(),
            "add_used({n}) would overflow chunk of capacity {}",
            self.capacity()
        );
        self.used += n;
    }

    /// Bytes free beyond the current watermark.
    pub fn free_bytes(&self) -> usize {
        self.capacity() - self.used
    }

    /// A mutable slice starting at the current watermark, spanning all
    /// remaining free bytes. Producers write into this and then call
    /// [`Self::add_used`] with the number of bytes actually written.
    pub fn write_position(&mut self) -> &mut [u8] {
        let used = self.used;
        &mut self.data[used..]
    }

    /// The whole valid region, `[0, used)`.
    pub fn used_bytes(&self) -> &[u8] {
        &self.data[..self.used]
    }

    /// The whole valid region, mutable.
    pub fn used_bytes_mut(&mut self) -> &mut [u8] {
        let used = self.used;
        &mut self.data[..used]
    }

    /// Number of whole interleaved slices currently held, given `bps` bytes
    /// per sample and `n_channels` channels per slice.
    pub fn total_slices(&self, bps: usize, n_channels: usize) -> usize {
        let slice_bytes = bps * n_channels;
        if slice_bytes == 0 {
            return 0;
        }
        self.used / slice_bytes
    }

    /// The `i`-th interleaved slice of `bps * n_channels` bytes, or `None`
    /// if that slice would extend past `used`.
    pub fn slice(&self, i: usize, bps: usize, n_channels: usize) -> Option<&[u8]> {
        let slice_bytes = bps * n_channels;
        let start = i.checked_mul(slice_bytes)?;
        let end = start.checked_add(slice_bytes)?;
        if end > self.used {
            return None;
        }
        Some(&self.data[start..end])
    }

    /// Byte-swaps the first `used / 8` doubles held in this chunk to
    /// big-endian, in place. Applying this twice is the identity; applying
    /// it an odd number of times leaves the buffer byte-swapped relative to
    /// its logical value.
    pub fn to_big_endian_f64(&mut self) {
        let whole = (self.used / 8) * 8;
        facq_core::endian::bytes_to_be_f64(&mut self.data[..whole]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_starts_empty() {
        let chunk = Chunk::new(64).unwrap();
        assert_eq!(chunk.used(), 0);
        assert_eq!(chunk.capacity(), 64);
        assert_eq!(chunk.free_bytes(), 64);
    }

    #[test]
    fn add_used_advances_watermark() {
        let mut chunk = Chunk::new(16).unwrap();
        chunk.add_used(10);
        assert_eq!(chunk.used(), 10);
        assert_eq!(chunk.free_bytes(), 6);
    }

    #[test]
    #[should_panic]
    fn add_used_beyond_capacity_panics() {
        let mut chunk = Chunk::new(4).unwrap();
        chunk.add_used(5);
    }

    #[test]
    fn clear_resets_watermark_not_capacity() {
        let mut chunk = Chunk::new(8).unwrap();
        chunk.add_used(8);
        chunk.clear();
        assert_eq!(chunk.used(), 0);
        assert_eq!(chunk.capacity(), 8);
    }

    #[test]
    fn slice_respects_used_watermark() {
        let mut chunk = Chunk::new(32).unwrap();
        // bps=8, n_channels=2 -> 16 bytes per slice, 2 slices fit.
        chunk.add_used(16);
        assert!(chunk.slice(0, 8, 2).is_some());
        assert!(chunk.slice(1, 8, 2).is_none());
    }

    #[test]
    fn total_slices_integer_divides() {
        let mut chunk = Chunk::new(40).unwrap();
        chunk.add_used(33);
        assert_eq!(chunk.total_slices(8, 2), 2);
    }

    #[test]
    fn be_round_trip_is_identity() {
        let mut chunk = Chunk::new(16).unwrap();
        {
            let pos = chunk.write_position();
            pos[..8].copy_from_slice(&1.5f64.to_ne_bytes());
            pos[8..16].copy_from_slice(&(-2.5f64).to_ne_bytes());
        }
        chunk.add_used(16);
        let before = chunk.used_bytes().to_vec();
        chunk.to_big_endian_f64();
        chunk.to_big_endian_f64();
        assert_eq!(chunk.used_bytes(), before.as_slice());
    }
}
