//! [`Stream`]: a named, catalog-backed pipeline that can be built up
//! incrementally, started, stopped, and saved to or loaded from a
//! `.stream` file.

use std::path::Path;

use facq_core::{Error, Result};
use facq_pipeline::{Monitor, Operation, OperationList, Pipeline, Sink, Source};

use crate::catalog::{Catalog, CatalogItem, ItemKind, ParamMap};
use crate::keyfile::{self, Section};

/// The ring buffer depth a [`Stream`] hands to [`Pipeline::new`]. Matches the
/// depth [`facq_net::Plug`] uses for its own producer/consumer hand-off.
const RING_SIZE: usize = 4;

struct ConfiguredItem {
    catalog_name: String,
    params: ParamMap,
}

/// A pipeline under construction or running, addressable by name and
/// reproducible from a saved `.stream` file via its [`Catalog`] item names
/// and parameters.
pub struct Stream {
    name: String,
    source: Option<Box<dyn Source>>,
    operations: Vec<Box<dyn Operation>>,
    sink: Option<Box<dyn Sink>>,
    source_meta: Option<ConfiguredItem>,
    operation_metas: Vec<ConfiguredItem>,
    sink_meta: Option<ConfiguredItem>,
    monitor: Monitor,
    pipeline: Option<Pipeline>,
}

impl Stream {
    /// An empty, unstarted stream with no source, operations, or sink yet.
    pub fn new(name: impl Into<String>) -> Self {
        Stream {
            name: name.into(),
            source: None,
            operations: Vec::new(),
            sink: None,
            source_meta: None,
            operation_metas: Vec::new(),
            sink_meta: None,
            monitor: Monitor::new(),
            pipeline: None,
        }
    }

    /// The stream's name, as given to [`Stream::new`] or read from a
    /// `[Stream]` section's `name` key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The monitor a caller should poll for error/stop messages. Delegates
    /// to the running pipeline's own monitor once [`Stream::start`] has
    /// succeeded, since that is the monitor the producer/consumer threads
    /// actually post to.
    pub fn monitor(&self) -> &Monitor {
        match &self.pipeline {
            Some(pipeline) => pipeline.monitor(),
            None => &self.monitor,
        }
    }

    /// A stream is closed once it has both a source and a sink; only a
    /// closed stream can be started.
    pub fn is_closed(&self) -> bool {
        self.source.is_some() && self.sink.is_some()
    }

    /// Sets the source. Requires no source and no sink configured yet.
    pub fn set_source(
        &mut self,
        catalog_name: impl Into<String>,
        params: ParamMap,
        source: Box<dyn Source>,
    ) -> Result<()> {
        if self.source.is_some() || self.sink.is_some() {
            return Err(Error::Config(
                "set_source requires no source and no sink configured yet".into(),
            ));
        }
        self.source = Some(source);
        self.source_meta = Some(ConfiguredItem {
            catalog_name: catalog_name.into(),
            params,
        });
        Ok(())
    }

    /// Appends an operation to the end of the chain. Requires a source and
    /// no sink configured yet.
    pub fn append_operation(
        &mut self,
        catalog_name: impl Into<String>,
        params: ParamMap,
        operation: Box<dyn Operation>,
    ) -> Result<()> {
        if self.source.is_none() || self.sink.is_some() {
            return Err(Error::Config(
                "append_operation requires a source and no sink configured yet".into(),
            ));
        }
        self.operations.push(operation);
        self.operation_metas.push(ConfiguredItem {
            catalog_name: catalog_name.into(),
            params,
        });
        Ok(())
    }

    /// Sets the sink, closing the stream. Requires a source and no sink
    /// configured yet.
    pub fn set_sink(
        &mut self,
        catalog_name: impl Into<String>,
        params: ParamMap,
        sink: Box<dyn Sink>,
    ) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::Config("set_sink requires a source first".into()));
        }
        if self.sink.is_some() {
            return Err(Error::Config("sink already configured".into()));
        }
        self.sink = Some(sink);
        self.sink_meta = Some(ConfiguredItem {
            catalog_name: catalog_name.into(),
            params,
        });
        Ok(())
    }

    /// Removes the sink, reopening the stream. LIFO counterpart of
    /// [`Stream::set_sink`].
    pub fn remove_sink(&mut self) -> Result<()> {
        if self.sink.take().is_none() {
            return Err(Error::Config("no sink to remove".into()));
        }
        self.sink_meta = None;
        Ok(())
    }

    /// Removes the last-appended operation. Requires no sink configured,
    /// since the sink was necessarily appended after all operations.
    pub fn pop_operation(&mut self) -> Result<()> {
        if self.sink.is_some() {
            return Err(Error::Config(
                "remove the sink before popping operations".into(),
            ));
        }
        if self.operations.pop().is_none() {
            return Err(Error::Config("no operation to remove".into()));
        }
        self.operation_metas.pop();
        Ok(())
    }

    /// Removes the source. Requires no operations and no sink configured.
    pub fn remove_source(&mut self) -> Result<()> {
        if !self.operations.is_empty() || self.sink.is_some() {
            return Err(Error::Config(
                "remove operations and the sink before removing the source".into(),
            ));
        }
        if self.source.take().is_none() {
            return Err(Error::Config("no source to remove".into()));
        }
        self.source_meta = None;
        Ok(())
    }

    /// Builds a [`Pipeline`] from the configured source/operations/sink and
    /// starts it. Requires [`Stream::is_closed`]. Consumes the stream's
    /// staged source, operations, and sink; once running, they live inside
    /// the [`Pipeline`] and this stream cannot be reopened with
    /// [`Stream::set_sink`] or similar until [`Stream::stop`] is called and
    /// a fresh source/sink are configured.
    pub fn start(&mut self) -> Result<()> {
        if !self.is_closed() {
            return Err(Error::Config(
                "stream must have both a source and a sink before it can start".into(),
            ));
        }
        self.monitor.clear();

        let source = self.source.take().expect("is_closed just confirmed a source");
        let sink = self.sink.take().expect("is_closed just confirmed a sink");

        let mut operation_list = OperationList::new();
        for operation in self.operations.drain(..) {
            operation_list.push(operation);
        }

        let chunk_size = source.stream_data().recommended_chunk_bytes();
        let mut pipeline = Pipeline::new(source, operation_list, sink, RING_SIZE, chunk_size)?;
        pipeline.start()?;
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// Stops the running pipeline, if any. Idempotent.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut pipeline) = self.pipeline.take() else {
            return Ok(());
        };
        pipeline.stop()
    }

    /// Writes this stream's configuration to `path` as a `.stream` key-value
    /// file: a `[Stream]` section with `name`, then one `[<item>,<index>]`
    /// section per configured item in pipeline order (source first, sink
    /// last).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut sections = Vec::new();

        let mut stream_params = ParamMap::new();
        stream_params.insert("name".into(), self.name.clone());
        sections.push(Section {
            header: "Stream".into(),
            params: stream_params,
        });

        let mut index = 0usize;
        if let Some(meta) = &self.source_meta {
            sections.push(Section {
                header: format!("{},{}", meta.catalog_name, index),
                params: meta.params.clone(),
            });
            index += 1;
        }
        for meta in &self.operation_metas {
            sections.push(Section {
                header: format!("{},{}", meta.catalog_name, index),
                params: meta.params.clone(),
            });
            index += 1;
        }
        if let Some(meta) = &self.sink_meta {
            sections.push(Section {
                header: format!("{},{}", meta.catalog_name, index),
                params: meta.params.clone(),
            });
        }

        std::fs::write(path, keyfile::serialize(&sections)).map_err(Error::Resource)
    }

    /// Reads a `.stream` file written by [`Stream::save`] and constructs a
    /// fresh, unstarted stream from `catalog`.
    pub fn load(path: impl AsRef<Path>, catalog: &Catalog) -> Result<Stream> {
        let text = std::fs::read_to_string(path).map_err(Error::Resource)?;
        let mut sections = keyfile::parse(&text)?.into_iter();

        let header_section = sections
            .next()
            .ok_or_else(|| Error::Config("empty stream file".into()))?;
        if header_section.header != "Stream" {
            return Err(Error::Config(
                "stream file must begin with a [Stream] section".into(),
            ));
        }
        let name = header_section
            .params
            .get("name")
            .cloned()
            .ok_or_else(|| Error::Config("[Stream] section is missing 'name'".into()))?;

        let items: Vec<Section> = sections.collect();
        if items.is_empty() {
            return Err(Error::Config("stream file has no pipeline items".into()));
        }
        let last = items.len() - 1;

        let mut stream = Stream::new(name);
        for (i, section) in items.into_iter().enumerate() {
            let (catalog_name, _index) = section.header.split_once(',').ok_or_else(|| {
                Error::Config(format!(
                    "item section '[{}]' must be '<name>,<index>'",
                    section.header
                ))
            })?;

            if i == 0 {
                let CatalogItem::Source(source) =
                    catalog.construct(catalog_name, ItemKind::Source, &section.params)?
                else {
                    unreachable!("construct with ItemKind::Source always returns CatalogItem::Source");
                };
                stream.set_source(catalog_name, section.params, source)?;
            } else if i == last {
                let CatalogItem::Sink(sink) =
                    catalog.construct(catalog_name, ItemKind::Sink, &section.params)?
                else {
                    unreachable!("construct with ItemKind::Sink always returns CatalogItem::Sink");
                };
                stream.set_sink(catalog_name, section.params, sink)?;
            } else {
                let CatalogItem::Operation(operation) =
                    catalog.construct(catalog_name, ItemKind::Operation, &section.params)?
                else {
                    unreachable!("construct with ItemKind::Operation always returns CatalogItem::Operation");
                };
                stream.append_operation(catalog_name, section.params, operation)?;
            }
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facq_fixtures::{NullSink, SoftwareSource, SoftwareSourceConfig, VectorSink, Waveform};
    use std::thread;
    use std::time::Duration;

    fn software_config() -> SoftwareSourceConfig {
        SoftwareSourceConfig {
            function: Waveform::Sine,
            amplitude: 5.0,
            wave_period: 1.0,
            sample_period: 0.001,
            n_channels: 1,
        }
    }

    #[test]
    fn construction_order_is_enforced() {
        let mut stream = Stream::new("demo");
        assert!(stream
            .append_operation("plug", ParamMap::new(), Box::new(facq_net::OperationPlug::new("x", 1)))
            .is_err());
        assert!(stream.set_sink("null", ParamMap::new(), Box::new(NullSink::new())).is_err());

        stream
            .set_source(
                "software",
                ParamMap::new(),
                Box::new(SoftwareSource::new(software_config()).unwrap()),
            )
            .unwrap();
        assert!(stream
            .set_source(
                "software",
                ParamMap::new(),
                Box::new(SoftwareSource::new(software_config()).unwrap())
            )
            .is_err());
        assert!(!stream.is_closed());

        stream.set_sink("null", ParamMap::new(), Box::new(NullSink::new())).unwrap();
        assert!(stream.is_closed());
        assert!(stream
            .append_operation("plug", ParamMap::new(), Box::new(facq_net::OperationPlug::new("x", 1)))
            .is_err());
    }

    #[test]
    fn lifo_removal_mirrors_construction_order() {
        let mut stream = Stream::new("demo");
        stream
            .set_source(
                "software",
                ParamMap::new(),
                Box::new(SoftwareSource::new(software_config()).unwrap()),
            )
            .unwrap();
        stream.set_sink("null", ParamMap::new(), Box::new(NullSink::new())).unwrap();

        assert!(stream.remove_source().is_err());
        stream.remove_sink().unwrap();
        stream.remove_source().unwrap();
        assert!(stream.source_meta.is_none());
    }

    #[test]
    fn start_then_stop_runs_samples_into_a_vector_sink() {
        let mut stream = Stream::new("demo");
        let vector = VectorSink::new();
        let handle = vector.handle();
        stream
            .set_source(
                "software",
                ParamMap::new(),
                Box::new(SoftwareSource::new(software_config()).unwrap()),
            )
            .unwrap();
        stream.set_sink("vector", ParamMap::new(), Box::new(vector)).unwrap();

        stream.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.stop().unwrap();

        assert!(!handle.lock().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_reproduces_an_equivalent_stream() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("out.dat");
        let stream_path = dir.path().join("demo.stream");

        let mut params = ParamMap::new();
        params.insert("function".into(), "sine".into());
        params.insert("amplitude".into(), "5".into());
        params.insert("wave-period".into(), "1".into());
        params.insert("period".into(), "0.001".into());
        params.insert("n-channels".into(), "1".into());

        let mut sink_params = ParamMap::new();
        sink_params.insert("filename".into(), data_path.to_string_lossy().into_owned());

        let mut stream = Stream::new("demo");
        stream
            .set_source(
                "software",
                params,
                Box::new(SoftwareSource::new(software_config()).unwrap()),
            )
            .unwrap();
        stream
            .set_sink(
                "file",
                sink_params,
                Box::new(facq_file::FileSink::new(&data_path)),
            )
            .unwrap();
        stream.save(&stream_path).unwrap();

        let catalog = Catalog::default();
        let loaded = Stream::load(&stream_path, &catalog).unwrap();
        assert_eq!(loaded.name(), "demo");
        assert!(loaded.is_closed());
    }
}
