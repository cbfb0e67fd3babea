//! The producer loop: polls the source, optionally converts raw bytes to
//! `f64`, and pushes filled chunks into the ring buffer.

use std::time::Instant;

use facq_buffer::RingBuffer;
use facq_core::{IoStatus, PollStatus};
use facq_stream_data::StreamData;
use facq_logging::tracing::{debug, warn};

use crate::monitor::MonitorHandle;
use crate::traits::Source;

/// Fills `buf` completely by repeatedly polling and reading `source`,
/// treating `AGAIN` as a retry signal. Returns `Ok(())` once `buf` is full,
/// or `Err(filled)` with the number of leading bytes of `buf` actually
/// written before the source reported EOF or ERROR, or the ring was asked
/// to exit (the monitor has already been notified, except on ring exit).
fn fill_buffer(
    source: &mut dyn Source,
    monitor: &MonitorHandle,
    buf: &mut [u8],
    ring: &RingBuffer,
) -> Result<(), usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        if ring.exit() {
            return Err(filled);
        }
        match source.poll() {
            PollStatus::Ready => {}
            PollStatus::NotReady => continue,
            PollStatus::Error => {
                monitor.post_error("Error while polling the source");
                return Err(filled);
            }
        }
        let (n, status) = source.read(&mut buf[filled..]);
        filled += n;
        match status {
            IoStatus::Normal | IoStatus::Again => continue,
            IoStatus::Eof => {
                monitor.post_stop("End of file in source");
                return Err(filled);
            }
            IoStatus::Error => {
                monitor.post_error("Error while reading the source");
                return Err(filled);
            }
        }
    }
    Ok(())
}

/// Converts the first `n_doubles` source-native samples in `raw` to `f64`
/// via `source.conv`, writing them native-endian into the leading
/// `n_doubles * 8` bytes of `dest`. Leaves the remainder of `dest` untouched.
fn convert_into(source: &mut dyn Source, raw: &[u8], dest: &mut [u8], n_doubles: usize) {
    let mut tmp = vec![0f64; n_doubles];
    source.conv(raw, &mut tmp);
    for (dst, value) in dest[..n_doubles * 8].chunks_exact_mut(8).zip(tmp.iter()) {
        dst.copy_from_slice(&value.to_ne_bytes());
    }
}

/// Runs the producer loop to completion. `stream_data` is the source's own
/// descriptor, captured once at pipeline start.
pub fn run(
    mut source: Box<dyn Source>,
    ring: &RingBuffer,
    monitor: MonitorHandle,
    stream_data: StreamData,
) {
    let needs_conv = source.needs_conv();
    let bps = stream_data.bps() as usize;
    let start = Instant::now();
    let mut slices_produced = 0u64;

    loop {
        if ring.exit() {
            break;
        }
        let mut chunk = match ring.get_recycled() {
            Some(c) => c,
            None => break,
        };

        let cap = chunk.capacity();
        // `used_doubles` is how many complete 8-byte doubles ended up in
        // `chunk.write_position()` before the source ran dry; on a full
        // read this is always `cap / 8`.
        let (used_doubles, source_exhausted) = if needs_conv {
            let n_doubles = cap / 8;
            let mut raw = vec![0u8; bps * n_doubles];
            match fill_buffer(source.as_mut(), &monitor, &mut raw, ring) {
                Ok(()) => {
                    convert_into(source.as_mut(), &raw, chunk.write_position(), n_doubles);
                    (n_doubles, false)
                }
                Err(filled) => {
                    let complete = filled / bps;
                    convert_into(source.as_mut(), &raw[..complete * bps], chunk.write_position(), complete);
                    (complete, true)
                }
            }
        } else {
            let n_doubles = cap / 8;
            let dest = chunk.write_position();
            match fill_buffer(source.as_mut(), &monitor, dest, ring) {
                Ok(()) => (n_doubles, false),
                Err(filled) => (filled / 8, true),
            }
        };

        chunk.add_used(used_doubles * 8);
        if used_doubles > 0 {
            slices_produced += chunk.total_slices(8, stream_data.n_channels()) as u64;
            ring.push(chunk);
        } else {
            ring.recycle(chunk);
        }

        if source_exhausted {
            break;
        }
    }

    ring.set_exit();
    if let Err(err) = source.stop() {
        warn!(error = %err, "source stop failed during producer shutdown");
    }
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        slices_produced, "producer exiting"
    );
}
