//! [`FileWriter`]: the writer half of the binary sample file codec.

use std::io::Write;
use std::path::{Path, PathBuf};

use digest::Digest;
use facq_buffer::Chunk;
use facq_core::{Error, PollStatus, Result};
use facq_logging::tracing::instrument;
use facq_stream_data::StreamData;
use sha2::Sha256;
use tempfile::NamedTempFile;

use crate::format::MAGIC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Reset,
    HeaderWritten,
    TailWritten,
}

/// Writes a self-describing, content-addressed sample file.
///
/// Call order is enforced by an internal state machine mirroring the
/// lifecycle: `new -> reset -> write_header -> (poll -> write_samples)* ->
/// write_tail -> stop`. Samples are written to a temp file in the target's
/// own directory and only renamed into place on [`Self::stop`], so a
/// crash mid-write never leaves a partial file at `path`.
pub struct FileWriter {
    path: PathBuf,
    temp: Option<NamedTempFile>,
    hasher: Option<Sha256>,
    n_channels: usize,
    written_samples: u64,
    state: State,
}

impl FileWriter {
    /// Names the target path. No file is created until [`Self::reset`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileWriter {
            path: path.into(),
            temp: None,
            hasher: None,
            n_channels: 0,
            written_samples: 0,
            state: State::Fresh,
        }
    }

    /// Creates a fresh temp file alongside the target and resets all writer
    /// state. Safe to call again to start a new run at the same path.
    pub fn reset(&mut self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = format!(
            "{}.",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "facq".into())
        );
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(Error::Resource)?;

        self.temp = Some(temp);
        self.hasher = None;
        self.n_channels = 0;
        self.written_samples = 0;
        self.state = State::Reset;
        Ok(())
    }

    /// Writes the file header (magic, then the wire-format `StreamData`
    /// encoding) and seeds the running digest with the same bytes.
    #[instrument(skip_all)]
    pub fn write_header(&mut self, stream_data: &StreamData) -> Result<()> {
        if self.state != State::Reset {
            return Err(Error::Config(
                "write_header called out of order: call reset() first".into(),
            ));
        }
        let temp = self.temp.as_mut().expect("Reset state always has a temp file");
        temp.write_all(&MAGIC.to_be_bytes())?;
        stream_data.write_wire(temp)?;

        let mut hasher = Sha256::new();
        hasher.update(MAGIC.to_be_bytes());
        stream_data.update_checksum(&mut hasher);

        self.hasher = Some(hasher);
        self.n_channels = stream_data.n_channels();
        self.state = State::HeaderWritten;
        Ok(())
    }

    /// A bounded-wait readiness check mirroring the sink contract. Local
    /// temp-file writes never block in practice, so this always reports
    /// readiness.
    pub fn poll(&self) -> PollStatus {
        PollStatus::Ready
    }

    /// Converts `chunk`'s bytes to big-endian doubles in place, feeds them
    /// into the running digest, writes them, and advances the sample count
    /// by `chunk.used() / 8`.
    #[instrument(skip_all)]
    pub fn write_samples(&mut self, chunk: &mut Chunk) -> Result<()> {
        chunk.to_big_endian_f64();
        self.write_raw_be_samples(chunk.used_bytes())
    }

    /// Feeds already big-endian sample bytes into the running digest, writes
    /// them, and advances the sample count by `be_bytes.len() / 8`. Used
    /// directly by callers that cannot hand over a mutable [`Chunk`] (for
    /// instance a `Sink` implementation, which only ever sees `&Chunk`).
    #[instrument(skip_all)]
    pub fn write_raw_be_samples(&mut self, be_bytes: &[u8]) -> Result<()> {
        if self.state != State::HeaderWritten {
            return Err(Error::Config(
                "write_samples called before write_header or after write_tail".into(),
            ));
        }
        let temp = self.temp.as_mut().expect("HeaderWritten state always has a temp file");
        temp.write_all(be_bytes)?;

        let hasher = self.hasher.as_mut().expect("HeaderWritten state always has a hasher");
        hasher.update(be_bytes);

        self.written_samples += (be_bytes.len() / 8) as u64;
        Ok(())
    }

    /// Finalizes the digest over the header, every sample written, and the
    /// big-endian sample count, then writes the 64-bit sample count followed
    /// by the byte-reversed 32-byte digest.
    #[instrument(skip_all)]
    pub fn write_tail(&mut self) -> Result<()> {
        if self.state != State::HeaderWritten {
            return Err(Error::Config(
                "write_tail called before write_header or more than once".into(),
            ));
        }
        let mut hasher = self.hasher.take().expect("HeaderWritten state always has a hasher");
        hasher.update(self.written_samples.to_be_bytes());
        let digest = hasher.finalize();
        let mut reversed = [0u8; 32];
        for (i, b) in digest.iter().rev().enumerate() {
            reversed[i] = *b;
        }

        let temp = self.temp.as_mut().expect("HeaderWritten state always has a temp file");
        temp.write_all(&self.written_samples.to_be_bytes())?;
        temp.write_all(&reversed)?;

        self.state = State::TailWritten;
        Ok(())
    }

    /// Total samples (individual channel values, not slices) written so far.
    pub fn written_samples(&self) -> u64 {
        self.written_samples
    }

    /// Flushes and renames the temp file into place, replacing any existing
    /// file at the target path. Consumes the writer.
    #[instrument(skip_all)]
    pub fn stop(mut self) -> Result<()> {
        if self.state != State::TailWritten {
            return Err(Error::Config(
                "stop called before write_tail completed".into(),
            ));
        }
        let temp = self.temp.take().expect("TailWritten state always has a temp file");
        temp.as_file().sync_all().map_err(Error::Resource)?;

        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(Error::Resource)?;
        }
        temp.persist(&self.path)
            .map_err(|err| Error::Resource(err.error))?;
        Ok(())
    }
}
