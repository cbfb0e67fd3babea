//! End-to-end scenarios exercising a `Stream` against the built-in catalog:
//! a plain file capture, a replay through the network plug, and a forced
//! mid-run operation failure.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use facq_core::{Error, Result};
use facq_buffer::Chunk;
use facq_net::{Plug, PlugEvent};
use facq_persist::{Catalog, CatalogItem, ItemKind, ParamMap, Stream};
use facq_pipeline::Operation;
use facq_stream_data::StreamData;

fn software_params(n_channels: usize, sample_period: f64) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert("function".into(), "sine".into());
    params.insert("amplitude".into(), "5".into());
    params.insert("wave-period".into(), "1".into());
    params.insert("period".into(), sample_period.to_string());
    params.insert("n-channels".into(), n_channels.to_string());
    params
}

fn wait_for<F: FnMut() -> bool>(mut condition: F, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// A software source running straight into a file sink, no operations.
#[test]
fn software_source_runs_straight_into_a_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("s1.dat");

    let catalog = Catalog::default();
    let params = software_params(3, 0.01);
    let CatalogItem::Source(source) = catalog
        .construct("software", ItemKind::Source, &params)
        .unwrap()
    else {
        unreachable!()
    };

    let mut stream = Stream::new("capture");
    stream.set_source("software", params, source).unwrap();
    let mut sink_params = ParamMap::new();
    sink_params.insert("filename".into(), data_path.to_string_lossy().into_owned());
    stream
        .set_sink("file", sink_params, Box::new(facq_file::FileSink::new(&data_path)))
        .unwrap();

    stream.start().unwrap();
    thread::sleep(Duration::from_secs(1));
    stream.stop().unwrap();

    facq_file::FileReader::verify(&data_path).unwrap();
    let mut reader = facq_file::FileReader::open(&data_path).unwrap();
    reader.read_header().unwrap();
    let mut first_slice = None;
    reader
        .chunk_iterator(0, 1, |slice| first_slice = Some(slice.to_vec()))
        .unwrap();
    let first = first_slice.expect("at least one slice should have been captured");
    assert!(first[0].abs() < 0.5, "t=0 sine sample should be near zero, got {}", first[0]);
}

/// A file source (the output of a prior run) replayed through an
/// `OperationPlug` to a listening `Plug`, with a null sink.
#[test]
fn file_source_replays_through_the_network_plug() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("replay_source.dat");

    // Build the source file the same way a prior capture run would.
    {
        let sd = {
            let chans = (0..2u16)
                .map(|c| facq_stream_data::ChannelSpec::new(c, 0, 0, 0, facq_stream_data::Direction::Input))
                .collect();
            StreamData::new(
                8,
                0.001,
                facq_stream_data::Chanlist::new(chans),
                vec![facq_stream_data::Unit::Volt; 2],
                vec![5.0; 2],
                vec![-5.0; 2],
            )
            .unwrap()
        };
        let mut writer = facq_file::FileWriter::new(&data_path);
        writer.reset().unwrap();
        writer.write_header(&sd).unwrap();
        for i in 0..50u32 {
            let mut chunk = Chunk::new(16).unwrap();
            {
                let pos = chunk.write_position();
                pos[0..8].copy_from_slice(&(i as f64).to_ne_bytes());
                pos[8..16].copy_from_slice(&(i as f64 + 1.0).to_ne_bytes());
            }
            chunk.add_used(16);
            writer.write_samples(&mut chunk).unwrap();
        }
        writer.write_tail().unwrap();
        writer.stop().unwrap();
    }

    let plug = Plug::new(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)).unwrap();
    let addr = plug.listen_addr();
    let received = Mutex::new(0usize);
    let connected_count = AtomicU32::new(0);
    let disconnected_count = AtomicU32::new(0);

    thread::scope(|scope| {
        let drain_thread = scope.spawn(|| {
            let deadline = std::time::Instant::now() + Duration::from_secs(10);
            while std::time::Instant::now() < deadline {
                while let Some(event) = plug.poll_event() {
                    match event {
                        PlugEvent::Connected => {
                            connected_count.fetch_add(1, Ordering::SeqCst);
                        }
                        PlugEvent::Disconnected => {
                            disconnected_count.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
                plug.drain(|_stream_data, samples| {
                    *received.lock().unwrap() += samples.len();
                });
                if disconnected_count.load(Ordering::SeqCst) > 0 {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        });

        let catalog = Catalog::default();
        let mut file_source_params = ParamMap::new();
        file_source_params.insert("filename".into(), data_path.to_string_lossy().into_owned());
        let CatalogItem::Source(source) = catalog
            .construct("file-source", ItemKind::Source, &file_source_params)
            .unwrap()
        else {
            unreachable!()
        };

        let mut plug_params = ParamMap::new();
        plug_params.insert("address".into(), addr.ip().to_string());
        plug_params.insert("port".into(), addr.port().to_string());
        let CatalogItem::Operation(operation) = catalog
            .construct("plug", ItemKind::Operation, &plug_params)
            .unwrap()
        else {
            unreachable!()
        };

        let mut stream = Stream::new("replay");
        stream.set_source("file-source", file_source_params, source).unwrap();
        stream.append_operation("plug", plug_params, operation).unwrap();
        stream
            .set_sink("null", ParamMap::new(), Box::new(facq_fixtures::NullSink::new()))
            .unwrap();

        stream.start().unwrap();
        let finished = wait_for(
            || stream.monitor().poll_once().map(|_| true).unwrap_or(false),
            Duration::from_secs(5),
        );
        assert!(finished, "expected the replay to reach end-of-file");
        stream.stop().unwrap();

        drain_thread.join().unwrap();
    });

    assert_eq!(connected_count.load(Ordering::SeqCst), 1, "connected should fire exactly once");
    assert_eq!(disconnected_count.load(Ordering::SeqCst), 1, "disconnected should fire exactly once");
    assert_eq!(*received.lock().unwrap(), 100, "expected all 100 doubles to arrive");
}

struct FlakyOperation {
    calls: Arc<AtomicU32>,
}

impl Operation for FlakyOperation {
    fn name(&self) -> &str {
        "flaky"
    }
    fn start(&mut self, _stream_data: &StreamData) -> Result<()> {
        Ok(())
    }
    fn stop(&mut self, _stream_data: &StreamData) -> Result<()> {
        Ok(())
    }
    fn apply(&mut self, _chunk: &mut Chunk, _stream_data: &StreamData) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 5 {
            return Err(Error::Config("forced failure on the 5th call".into()));
        }
        Ok(())
    }
}

/// A forced mid-run error from a stub operation.
#[test]
fn a_mid_run_operation_error_stops_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("forced_error.dat");

    let catalog = Catalog::default();
    let params = software_params(1, 0.005);
    let CatalogItem::Source(source) = catalog
        .construct("software", ItemKind::Source, &params)
        .unwrap()
    else {
        unreachable!()
    };

    let calls = Arc::new(AtomicU32::new(0));
    let mut stream = Stream::new("flaky-run");
    stream.set_source("software", params, source).unwrap();
    stream
        .append_operation(
            "flaky",
            ParamMap::new(),
            Box::new(FlakyOperation { calls: Arc::clone(&calls) }),
        )
        .unwrap();
    let mut sink_params = ParamMap::new();
    sink_params.insert("filename".into(), data_path.to_string_lossy().into_owned());
    stream
        .set_sink("file", sink_params, Box::new(facq_file::FileSink::new(&data_path)))
        .unwrap();

    stream.start().unwrap();

    let mut error_seen = false;
    let mut error_count = 0;
    let stopped = wait_for(
        || {
            stream.monitor().drain_with(|message| {
                if message.kind == facq_pipeline::MessageKind::Error {
                    error_seen = true;
                    error_count += 1;
                }
            });
            error_seen
        },
        Duration::from_secs(3),
    );
    assert!(stopped, "expected exactly one ERROR message within the timeout");
    assert_eq!(error_count, 1);

    stream.stop().unwrap();

    facq_file::FileReader::verify(&data_path).unwrap();
}
