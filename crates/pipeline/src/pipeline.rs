//! [`Pipeline`]: the two-thread (producer/consumer) orchestrator that ties a
//! source, an operation list, and a sink together.

use std::sync::Arc;
use std::thread::JoinHandle;

use facq_buffer::RingBuffer;
use facq_core::{Error, Result};
use facq_logging::tracing::instrument;
use facq_stream_data::StreamData;

use crate::monitor::Monitor;
use crate::operation_list::OperationList;
use crate::traits::{Sink, Source};
use crate::{consumer, producer};

/// The pipeline's lifecycle state, `IDLE -> STARTING -> RUNNING -> STOPPING
/// -> IDLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No threads running; safe to call [`Pipeline::start`].
    Idle,
    /// Mid-[`Pipeline::start`]; the source/sink/operations are being
    /// started and the worker threads are being spawned.
    Starting,
    /// Both worker threads are running.
    Running,
    /// Mid-[`Pipeline::stop`]; workers are being joined.
    Stopping,
}

/// Ties one source, an ordered list of operations, and one sink together
/// behind a [`RingBuffer`], spawning a producer thread (owns the source) and
/// a consumer thread (owns the operations and the sink).
pub struct Pipeline {
    state: State,
    ring: Arc<RingBuffer>,
    monitor: Monitor,
    source: Option<Box<dyn Source>>,
    operations: Option<OperationList>,
    sink: Option<Box<dyn Sink>>,
    stream_data: Option<StreamData>,
    producer_handle: Option<JoinHandle<()>>,
    consumer_handle: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Builds an idle pipeline from its three pieces plus ring sizing
    /// (`ring_size` chunks of `chunk_size` bytes each), computed by the
    /// caller from the source's sampling period.
    pub fn new(
        source: Box<dyn Source>,
        operations: OperationList,
        sink: Box<dyn Sink>,
        ring_size: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        let ring = Arc::new(RingBuffer::new(ring_size, chunk_size)?);
        Ok(Pipeline {
            state: State::Idle,
            ring,
            monitor: Monitor::new(),
            source: Some(source),
            operations: Some(operations),
            sink: Some(sink),
            stream_data: None,
            producer_handle: None,
            consumer_handle: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Shared access to the monitor the host application polls.
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Starts the pipeline: starts the operation list, then the sink, then
    /// the source (rolling back in reverse order on any failure), and
    /// spawns the producer and consumer threads.
    #[instrument(skip_all)]
    pub fn start(&mut self) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::Config(
                "pipeline must be idle before it can be started".into(),
            ));
        }
        self.state = State::Starting;
        self.monitor.clear();

        let mut source = self
            .source
            .take()
            .ok_or_else(|| Error::Config("pipeline has no source".into()))?;
        let mut operations = self
            .operations
            .take()
            .ok_or_else(|| Error::Config("pipeline has no operation list".into()))?;
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| Error::Config("pipeline has no sink".into()))?;

        let stream_data = source.stream_data().clone();

        if let Err(err) = operations.start(&stream_data) {
            self.source = Some(source);
            self.operations = Some(operations);
            self.sink = Some(sink);
            self.state = State::Idle;
            return Err(err);
        }

        if let Err(err) = sink.start(&stream_data) {
            let _ = operations.stop(&stream_data);
            self.source = Some(source);
            self.operations = Some(operations);
            self.sink = Some(sink);
            self.state = State::Idle;
            return Err(err);
        }

        if let Err(err) = source.start() {
            let _ = sink.stop(&stream_data);
            let _ = operations.stop(&stream_data);
            self.source = Some(source);
            self.operations = Some(operations);
            self.sink = Some(sink);
            self.state = State::Idle;
            return Err(err);
        }

        let ring_for_producer = Arc::clone(&self.ring);
        let producer_monitor = self.monitor.handle();
        let producer_stream_data = stream_data.clone();
        let producer_handle = std::thread::Builder::new()
            .name("facq-producer".into())
            .spawn(move || {
                producer::run(source, &ring_for_producer, producer_monitor, producer_stream_data);
            })
            .map_err(Error::Resource)?;

        let ring_for_consumer = Arc::clone(&self.ring);
        let consumer_monitor = self.monitor.handle();
        let consumer_handle = std::thread::Builder::new()
            .name("facq-consumer".into())
            .spawn(move || {
                consumer::run(
                    &ring_for_consumer,
                    operations,
                    sink,
                    consumer_monitor,
                    stream_data,
                );
            })
            .map_err(Error::Resource)?;

        self.producer_handle = Some(producer_handle);
        self.consumer_handle = Some(consumer_handle);
        self.stream_data = Some(producer_stream_data);
        self.state = State::Running;
        Ok(())
    }

    /// Stops the pipeline: sets the ring's exit flag, joins both worker
    /// threads in order, and returns to [`State::Idle`].
    ///
    /// Idempotent when already idle.
    #[instrument(skip_all)]
    pub fn stop(&mut self) -> Result<()> {
        if self.state == State::Idle {
            return Ok(());
        }
        self.state = State::Stopping;
        self.ring.set_exit();

        if let Some(handle) = self.producer_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.consumer_handle.take() {
            let _ = handle.join();
        }

        self.state = State::Idle;
        Ok(())
    }
}
