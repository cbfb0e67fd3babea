//! [`FileReader`]: the reader half of the binary sample file codec, plus the
//! standalone [`FileReader::verify`] integrity check.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use digest::Digest;
use facq_core::{Error, IntegrityError, Result};
use facq_logging::tracing::{instrument, warn};
use facq_stream_data::StreamData;
use sha2::Sha256;

use crate::format::{first_sample, MAGIC, TRAILER_LEN};

/// Reads a file written by [`crate::writer::FileWriter`].
pub struct FileReader {
    file: File,
    path: PathBuf,
    header: Option<StreamData>,
}

impl FileReader {
    /// Opens `path` and validates the leading magic word. No further parsing
    /// happens here; call [`Self::read_header`] next.
    #[instrument(skip_all)]
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::open(&path).map_err(Error::Resource)?;
        let mut magic_buf = [0u8; 4];
        file.read_exact(&mut magic_buf).map_err(Error::Resource)?;
        let found = u32::from_be_bytes(magic_buf);
        if found != MAGIC {
            return Err(IntegrityError::BadMagic {
                expected: MAGIC,
                found,
            }
            .into());
        }
        Ok(FileReader {
            file,
            path,
            header: None,
        })
    }

    /// Reconstructs the file's `StreamData` header, caching it for
    /// [`Self::to_human`] and [`Self::chunk_iterator`].
    pub fn read_header(&mut self) -> Result<StreamData> {
        let stream_data = StreamData::read_wire(&mut self.file)?;
        self.header = Some(stream_data.clone());
        Ok(stream_data)
    }

    /// Seeks to `EOF - 40` and returns `(written_samples, digest)`, where
    /// `digest` is the 32 bytes exactly as stored on disk (byte-reversed
    /// relative to the digest [`sha2::Sha256`] would produce).
    pub fn read_tail(&mut self) -> Result<(u64, [u8; 32])> {
        self.file
            .seek(SeekFrom::End(-(TRAILER_LEN as i64)))
            .map_err(Error::Resource)?;
        let mut count_buf = [0u8; 8];
        self.file.read_exact(&mut count_buf).map_err(Error::Resource)?;
        let mut digest_buf = [0u8; 32];
        self.file.read_exact(&mut digest_buf).map_err(Error::Resource)?;
        Ok((u64::from_be_bytes(count_buf), digest_buf))
    }

    fn total_slices(&self, n_channels: usize) -> Result<u64> {
        let payload_start = first_sample(n_channels);
        let total_len = self.file.metadata().map_err(Error::Resource)?.len();
        let payload_len = total_len.saturating_sub(payload_start + TRAILER_LEN);
        Ok(payload_len / (8 * n_channels as u64))
    }

    fn header_or_err(&self) -> Result<&StreamData> {
        self.header
            .as_ref()
            .ok_or_else(|| Error::Config("read_header must be called before this method".into()))
    }

    /// Dumps the file as a tab-separated textual table: a sampling-period
    /// line, one `channel N (unit)` line per channel, then one line per
    /// slice.
    #[instrument(skip_all)]
    pub fn to_human<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let stream_data = self.header_or_err()?.clone();
        writeln!(out, "Sampling period {} seconds", stream_data.period()).map_err(Error::Resource)?;
        for (i, unit) in stream_data.units().iter().enumerate() {
            writeln!(out, "channel {i} ({})", unit.label()).map_err(Error::Resource)?;
        }

        let n = stream_data.n_channels();
        let slices = self.total_slices(n)?;
        self.file
            .seek(SeekFrom::Start(first_sample(n)))
            .map_err(Error::Resource)?;

        let mut buf = vec![0u8; 8 * n];
        for _ in 0..slices {
            self.file.read_exact(&mut buf).map_err(Error::Resource)?;
            let fields: Vec<String> = buf
                .chunks_exact(8)
                .map(|b| f64::from_be_bytes(b.try_into().unwrap()).to_string())
                .collect();
            writeln!(out, "{}", fields.join("\t")).map_err(Error::Resource)?;
        }
        Ok(())
    }

    /// Replays `count` slices starting at the `start`-th, invoking `cb` with
    /// each slice decoded to native-endian `f64`. Clamps `count` to the
    /// available remainder (logging a warning if it had to) but fails if
    /// `start` is at or past the end of the file.
    #[instrument(skip(self, cb))]
    pub fn chunk_iterator<F: FnMut(&[f64])>(
        &mut self,
        start: u64,
        count: u64,
        mut cb: F,
    ) -> Result<()> {
        let stream_data = self.header_or_err()?.clone();
        let n = stream_data.n_channels();
        let total = self.total_slices(n)?;
        if start >= total {
            return Err(Error::Config(format!(
                "chunk_iterator start {start} is at or past the last slice ({total})"
            )));
        }
        let clamped = count.min(total - start);
        if clamped < count {
            warn!(requested = count, available = clamped, "clamping chunk_iterator count");
        }

        self.file
            .seek(SeekFrom::Start(first_sample(n) + start * 8 * n as u64))
            .map_err(Error::Resource)?;

        let mut buf = vec![0u8; 8 * n];
        let mut doubles = vec![0f64; n];
        for _ in 0..clamped {
            self.file.read_exact(&mut buf).map_err(Error::Resource)?;
            for (dst, src) in doubles.iter_mut().zip(buf.chunks_exact(8)) {
                *dst = f64::from_be_bytes(src.try_into().unwrap());
            }
            cb(&doubles);
        }
        Ok(())
    }

    /// Recomputes the digest of the file at `path` from its header and
    /// payload and compares it against the trailer, also checking the
    /// trailer's sample count against the payload's actual length.
    #[instrument(skip_all)]
    pub fn verify(path: impl AsRef<Path>) -> Result<()> {
        let mut reader = FileReader::open(path.as_ref().to_path_buf())?;
        let stream_data = reader.read_header()?;
        let n = stream_data.n_channels();

        let mut hasher = Sha256::new();
        hasher.update(MAGIC.to_be_bytes());
        stream_data.update_checksum(&mut hasher);

        let payload_start = first_sample(n);
        let total_len = reader.file.metadata().map_err(Error::Resource)?.len();
        if total_len < payload_start + TRAILER_LEN {
            return Err(IntegrityError::SampleCountMismatch {
                trailer: 0,
                observed: 0,
            }
            .into());
        }
        let payload_len = total_len - TRAILER_LEN - payload_start;
        let observed = payload_len / 8;

        reader
            .file
            .seek(SeekFrom::Start(payload_start))
            .map_err(Error::Resource)?;
        let mut remaining = payload_len;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let to_read = remaining.min(buf.len() as u64) as usize;
            reader
                .file
                .read_exact(&mut buf[..to_read])
                .map_err(Error::Resource)?;
            hasher.update(&buf[..to_read]);
            remaining -= to_read as u64;
        }

        let (trailer_samples, stored_reversed) = reader.read_tail()?;
        if trailer_samples != observed {
            return Err(IntegrityError::SampleCountMismatch {
                trailer: trailer_samples,
                observed,
            }
            .into());
        }

        hasher.update(trailer_samples.to_be_bytes());
        let recomputed = hasher.finalize();
        let mut stored_normal = [0u8; 32];
        for (i, b) in stored_reversed.iter().rev().enumerate() {
            stored_normal[i] = *b;
        }
        if recomputed.as_slice() != stored_normal {
            return Err(IntegrityError::DigestMismatch.into());
        }
        Ok(())
    }

    /// Seeks the read cursor to the start of the `index`-th payload slice.
    pub fn seek_to_slice(&mut self, index: u64) -> Result<()> {
        let n = self.header_or_err()?.n_channels();
        let offset = first_sample(n) + index * 8 * n as u64;
        self.file.seek(SeekFrom::Start(offset)).map_err(Error::Resource)?;
        Ok(())
    }

    /// Reads exactly one slice's raw big-endian bytes at the current cursor.
    /// `buf` must be `n_channels * 8` bytes long.
    pub fn read_slice_be(&mut self, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact(buf).map_err(Error::Resource)
    }

    /// Total number of whole slices in the payload region, computed from the
    /// trailer's sample count.
    pub fn slice_count(&mut self) -> Result<u64> {
        let n = self.header_or_err()?.n_channels() as u64;
        let (written_samples, _digest) = self.read_tail()?;
        Ok(written_samples / n)
    }

    /// The path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
