//! The consumer loop: pops chunks from the ring buffer, runs the operation
//! list over them, and writes the result to the sink.

use std::time::{Duration, Instant};

use facq_buffer::{Chunk, RingBuffer};
use facq_core::{IoStatus, PollStatus};
use facq_stream_data::StreamData;
use facq_logging::tracing::{debug, warn};

use crate::monitor::MonitorHandle;
use crate::operation_list::OperationList;
use crate::traits::Sink;

const SINK_POLL_RETRIES: u32 = 3;

/// Runs one pass of operations + sink-poll + sink-write over `chunk`.
/// `retries` bounds both the sink-poll retry budget and the number of times
/// an `AGAIN` from `sink.write` is retried (3 in the normal path, 0 while
/// draining after `exit`). The chunk is always recycled before this
/// function returns, whatever the outcome.
fn process_chunk(
    mut chunk: Chunk,
    operations: &mut OperationList,
    sink: &mut dyn Sink,
    monitor: &MonitorHandle,
    stream_data: &StreamData,
    ring: &RingBuffer,
    retries: u32,
) -> Result<(), ()> {
    if let Err(err) = operations.apply(&mut chunk, stream_data) {
        monitor.post_error(format!("operation failed: {err}"));
        ring.recycle(chunk);
        return Err(());
    }

    let mut attempts = 0u32;
    loop {
        match sink.poll(stream_data) {
            PollStatus::Ready => break,
            PollStatus::NotReady => {
                attempts += 1;
                if attempts > retries {
                    monitor.post_error("Error while polling the sink");
                    ring.recycle(chunk);
                    return Err(());
                }
            }
            PollStatus::Error => {
                monitor.post_error("Error while polling the sink");
                ring.recycle(chunk);
                return Err(());
            }
        }
    }

    let mut write_attempts = 0u32;
    loop {
        match sink.write(stream_data, &chunk) {
            IoStatus::Normal => {
                ring.recycle(chunk);
                return Ok(());
            }
            IoStatus::Again => {
                write_attempts += 1;
                if write_attempts > retries {
                    monitor.post_error("Error while writing the sink: exhausted AGAIN retries");
                    ring.recycle(chunk);
                    return Err(());
                }
            }
            IoStatus::Eof => {
                monitor.post_stop("End of file in sink");
                ring.recycle(chunk);
                return Err(());
            }
            IoStatus::Error => {
                monitor.post_error("Error while writing the sink");
                ring.recycle(chunk);
                return Err(());
            }
        }
    }
}

/// Runs the consumer loop to completion.
pub fn run(
    ring: &RingBuffer,
    mut operations: OperationList,
    mut sink: Box<dyn Sink>,
    monitor: MonitorHandle,
    stream_data: StreamData,
) {
    let timeout = Duration::from_secs_f64(stream_data.period()).max(Duration::from_secs(1));
    let start = Instant::now();
    let mut chunks_consumed = 0u64;

    loop {
        if ring.exit() {
            break;
        }
        match ring.timeout_pop(timeout) {
            Some(chunk) => {
                chunks_consumed += 1;
                if process_chunk(
                    chunk,
                    &mut operations,
                    sink.as_mut(),
                    &monitor,
                    &stream_data,
                    ring,
                    SINK_POLL_RETRIES,
                )
                .is_err()
                {
                    ring.set_exit();
                    break;
                }
            }
            None => continue,
        }
    }

    // Drain whatever the producer already pushed before it observed exit.
    while let Some(chunk) = ring.try_pop() {
        chunks_consumed += 1;
        if process_chunk(
            chunk,
            &mut operations,
            sink.as_mut(),
            &monitor,
            &stream_data,
            ring,
            0,
        )
        .is_err()
        {
            break;
        }
    }

    if let Err(err) = operations.stop(&stream_data) {
        warn!(error = %err, "operation list stop reported an error");
    }
    if let Err(err) = sink.stop(&stream_data) {
        warn!(error = %err, "sink stop failed during consumer shutdown");
    }
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        chunks_consumed, "consumer exiting"
    );
}
