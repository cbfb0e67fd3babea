//! [`NullSink`]: discards every chunk it receives.

use facq_buffer::Chunk;
use facq_core::{IoStatus, PollStatus};
use facq_pipeline::Sink;
use facq_stream_data::StreamData;

/// A sink that discards all data. Always ready, always reports
/// [`IoStatus::Normal`]. Useful as the sink of choice when only a tee'd
/// operation (such as an operation-plug) should observe the stream.
#[derive(Debug, Default)]
pub struct NullSink;

impl NullSink {
    /// Builds a new null sink.
    pub fn new() -> Self {
        NullSink
    }
}

impl Sink for NullSink {
    fn start(&mut self, _stream_data: &StreamData) -> facq_core::Result<()> {
        Ok(())
    }

    fn stop(&mut self, _stream_data: &StreamData) -> facq_core::Result<()> {
        Ok(())
    }

    fn poll(&mut self, _stream_data: &StreamData) -> PollStatus {
        PollStatus::Ready
    }

    fn write(&mut self, _stream_data: &StreamData, _chunk: &Chunk) -> IoStatus {
        IoStatus::Normal
    }
}
