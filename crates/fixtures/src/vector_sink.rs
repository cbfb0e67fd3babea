//! [`VectorSink`]: accumulates received samples in-process for assertions.

use std::sync::{Arc, Mutex};

use facq_buffer::Chunk;
use facq_core::{IoStatus, PollStatus};
use facq_pipeline::Sink;
use facq_stream_data::StreamData;

/// A sink that decodes every chunk's native-endian doubles into a
/// mutex-guarded `Vec`, otherwise behaving like [`crate::NullSink`].
#[derive(Debug, Clone, Default)]
pub struct VectorSink {
    samples: Arc<Mutex<Vec<f64>>>,
}

impl VectorSink {
    /// Builds an empty sink.
    pub fn new() -> Self {
        VectorSink::default()
    }

    /// A snapshot of every sample received so far, in arrival order.
    pub fn samples(&self) -> Vec<f64> {
        self.samples.lock().unwrap().clone()
    }

    /// A cheap handle sharing the same backing storage, for assertions made
    /// from outside the pipeline while it still holds the original sink.
    pub fn handle(&self) -> Arc<Mutex<Vec<f64>>> {
        Arc::clone(&self.samples)
    }
}

impl Sink for VectorSink {
    fn start(&mut self, _stream_data: &StreamData) -> facq_core::Result<()> {
        Ok(())
    }

    fn stop(&mut self, _stream_data: &StreamData) -> facq_core::Result<()> {
        Ok(())
    }

    fn poll(&mut self, _stream_data: &StreamData) -> PollStatus {
        PollStatus::Ready
    }

    fn write(&mut self, _stream_data: &StreamData, chunk: &Chunk) -> IoStatus {
        let mut samples = self.samples.lock().unwrap();
        for bytes in chunk.used_bytes().chunks_exact(8) {
            samples.push(f64::from_ne_bytes(bytes.try_into().unwrap()));
        }
        IoStatus::Normal
    }
}
