//! [`FileSource`]: a [`facq_pipeline::Source`] that replays a previously
//! written binary sample file.

use facq_core::{IoStatus, PollStatus, Result};
use facq_pipeline::Source;
use facq_stream_data::StreamData;

use crate::reader::FileReader;

/// Replays the payload of a file written by [`crate::writer::FileWriter`],
/// one slice per [`Source::read`] call, converting from the file's
/// big-endian storage to native-endian bytes as it goes (so
/// [`Source::needs_conv`] is always `false`).
pub struct FileSource {
    reader: FileReader,
    stream_data: StreamData,
    total_slices: u64,
    next_slice: u64,
}

impl FileSource {
    /// Opens `path`, validates its magic, and reads its header and trailer
    /// sample count up front.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self> {
        let mut reader = FileReader::open(path.into())?;
        let stream_data = reader.read_header()?;
        let total_slices = reader.slice_count()?;
        Ok(FileSource {
            reader,
            stream_data,
            total_slices,
            next_slice: 0,
        })
    }
}

impl Source for FileSource {
    fn stream_data(&self) -> &StreamData {
        &self.stream_data
    }

    fn needs_conv(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<()> {
        self.next_slice = 0;
        self.reader.seek_to_slice(0)
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn poll(&mut self) -> PollStatus {
        PollStatus::Ready
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, IoStatus) {
        let slice_bytes = self.stream_data.slice_bytes();
        if self.next_slice >= self.total_slices {
            return (0, IoStatus::Eof);
        }
        if buf.len() < slice_bytes {
            return (0, IoStatus::Again);
        }
        if let Err(_err) = self.reader.read_slice_be(&mut buf[..slice_bytes]) {
            return (0, IoStatus::Error);
        }
        facq_core::endian::bytes_to_be_f64(&mut buf[..slice_bytes]);
        self.next_slice += 1;
        (slice_bytes, IoStatus::Normal)
    }

    fn conv(&self, _src: &[u8], _dst: &mut [f64]) {
        debug_assert!(!self.needs_conv(), "conv should never be called; needs_conv is always false");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FileWriter;
    use facq_buffer::Chunk;
    use facq_stream_data::{Chanlist, ChannelSpec, Direction, Unit};

    fn write_sample_file(path: &std::path::Path, n: usize, slices: &[Vec<f64>]) {
        let chans = (0..n as u16)
            .map(|c| ChannelSpec::new(c, 0, 0, 0, Direction::Input))
            .collect();
        let sd = StreamData::new(
            8,
            0.01,
            Chanlist::new(chans),
            vec![Unit::Volt; n],
            vec![5.0; n],
            vec![-5.0; n],
        )
        .unwrap();
        let mut writer = FileWriter::new(path);
        writer.reset().unwrap();
        writer.write_header(&sd).unwrap();
        for slice in slices {
            let mut chunk = Chunk::new(n * 8).unwrap();
            {
                let pos = chunk.write_position();
                for (dst, v) in pos.chunks_exact_mut(8).zip(slice.iter()) {
                    dst.copy_from_slice(&v.to_ne_bytes());
                }
            }
            chunk.add_used(n * 8);
            writer.write_samples(&mut chunk).unwrap();
        }
        writer.write_tail().unwrap();
        writer.stop().unwrap();
    }

    #[test]
    fn replays_every_slice_then_reports_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.dat");
        write_sample_file(&path, 2, &[vec![1.0, 2.0], vec![3.0, 4.0]]);

        let mut source = FileSource::open(&path).unwrap();
        source.start().unwrap();
        assert_eq!(source.poll(), PollStatus::Ready);

        let mut buf = [0u8; 16];
        let (n, status) = source.read(&mut buf);
        assert_eq!(n, 16);
        assert_eq!(status, IoStatus::Normal);
        assert_eq!(f64::from_ne_bytes(buf[0..8].try_into().unwrap()), 1.0);
        assert_eq!(f64::from_ne_bytes(buf[8..16].try_into().unwrap()), 2.0);

        let (n, status) = source.read(&mut buf);
        assert_eq!(n, 16);
        assert_eq!(status, IoStatus::Normal);
        assert_eq!(f64::from_ne_bytes(buf[0..8].try_into().unwrap()), 3.0);

        let (n, status) = source.read(&mut buf);
        assert_eq!(n, 0);
        assert_eq!(status, IoStatus::Eof);
    }
}
