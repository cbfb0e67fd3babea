//! The polymorphic `Source`, `Sink`, and `Operation` contracts that every
//! concrete acquisition backend implements.

use facq_buffer::Chunk;
use facq_core::{IoStatus, PollStatus, Result};
use facq_stream_data::StreamData;

/// An entity that supplies samples to a pipeline.
///
/// Implementations are free to represent hardware DAQ devices, software
/// waveform generators, file replay, or a remote network plug; the pipeline
/// only ever interacts with a source through this trait.
pub trait Source: Send {
    /// The source-authoritative stream descriptor. Must be stable for the
    /// entire lifetime of one run (from [`Self::start`] to [`Self::stop`]).
    fn stream_data(&self) -> &StreamData;

    /// Whether raw bytes read by [`Self::read`] must be converted to
    /// physical `f64` samples via [`Self::conv`] before entering the
    /// pipeline. `false` means the source already emits native-endian
    /// `f64` slices directly.
    fn needs_conv(&self) -> bool;

    /// Starts the source. Safe to call again after a matching [`Self::stop`].
    fn start(&mut self) -> Result<()>;

    /// Stops the source. Must be safe to call even if [`Self::start`] never
    /// succeeded or [`Self::read`] was never called.
    fn stop(&mut self) -> Result<()>;

    /// A bounded-wait (target <= 500ms) readiness check.
    fn poll(&mut self) -> PollStatus;

    /// Writes at most `buf.len()` bytes into `buf`. Returns the number of
    /// bytes actually written and a status; [`IoStatus::Normal`] does not
    /// require filling the whole buffer.
    fn read(&mut self, buf: &mut [u8]) -> (usize, IoStatus);

    /// Converts a full raw source buffer into physical `f64` samples,
    /// applying the source's own scaling. Only called when
    /// [`Self::needs_conv`] is `true`. `dst.len()` is exactly the number of
    /// samples `src` is expected to decode to.
    fn conv(&self, src: &[u8], dst: &mut [f64]);
}

/// A terminal consumer of samples.
pub trait Sink: Send {
    /// Starts the sink for a run described by `stream_data`.
    fn start(&mut self, stream_data: &StreamData) -> Result<()>;

    /// Stops the sink. Must be safe to call even if [`Self::start`] never
    /// succeeded or [`Self::write`] was never called.
    fn stop(&mut self, stream_data: &StreamData) -> Result<()>;

    /// A bounded-wait readiness check.
    fn poll(&mut self, stream_data: &StreamData) -> PollStatus;

    /// Consumes `chunk`. Must consume exactly `chunk.used()` bytes when it
    /// returns [`IoStatus::Normal`].
    fn write(&mut self, stream_data: &StreamData, chunk: &Chunk) -> IoStatus;
}

/// An in-place transformation applied to every chunk that flows through the
/// consumer side of a pipeline.
///
/// An operation must not change a chunk's `used` watermark or its number of
/// samples, and must not retain a reference to the chunk after `apply`
/// returns.
pub trait Operation: Send {
    /// A short, stable name used in error messages and persistence.
    fn name(&self) -> &str;

    /// Starts the operation for a run described by `stream_data`.
    fn start(&mut self, stream_data: &StreamData) -> Result<()>;

    /// Stops the operation.
    fn stop(&mut self, stream_data: &StreamData) -> Result<()>;

    /// Mutates `chunk` in place.
    fn apply(&mut self, chunk: &mut Chunk, stream_data: &StreamData) -> Result<()>;
}
