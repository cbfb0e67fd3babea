//! [`FileSink`]: a [`facq_pipeline::Sink`] backed by [`crate::writer::FileWriter`].

use facq_buffer::Chunk;
use facq_core::{IoStatus, PollStatus, Result};
use facq_pipeline::Sink;
use facq_stream_data::StreamData;

use crate::writer::FileWriter;

/// Writes every chunk it receives to a binary sample file at `path`,
/// finalizing the digest trailer on [`Sink::stop`].
pub struct FileSink {
    path: std::path::PathBuf,
    writer: Option<FileWriter>,
}

impl FileSink {
    /// Targets `path`. The file is not created until [`Sink::start`].
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        FileSink {
            path: path.into(),
            writer: None,
        }
    }
}

impl Sink for FileSink {
    fn start(&mut self, stream_data: &StreamData) -> Result<()> {
        let mut writer = FileWriter::new(&self.path);
        writer.reset()?;
        writer.write_header(stream_data)?;
        self.writer = Some(writer);
        Ok(())
    }

    fn stop(&mut self, _stream_data: &StreamData) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.write_tail()?;
        writer.stop()
    }

    fn poll(&mut self, _stream_data: &StreamData) -> PollStatus {
        match &self.writer {
            Some(writer) => writer.poll(),
            None => PollStatus::Error,
        }
    }

    fn write(&mut self, _stream_data: &StreamData, chunk: &Chunk) -> IoStatus {
        let Some(writer) = self.writer.as_mut() else {
            return IoStatus::Error;
        };
        let mut be_bytes = chunk.used_bytes().to_vec();
        facq_core::endian::bytes_to_be_f64(&mut be_bytes);
        match writer.write_raw_be_samples(&be_bytes) {
            Ok(()) => IoStatus::Normal,
            Err(_) => IoStatus::Error,
        }
    }
}
