//! The [`Catalog`]: a registry mapping a persisted item name (`"software"`,
//! `"file"`, `"plug"`, ...) to a constructor that turns a [`ParamMap`] into a
//! boxed [`facq_pipeline::Source`], [`facq_pipeline::Operation`], or
//! [`facq_pipeline::Sink`].
//!
//! Registration lives here rather than in `facq-fixtures`/`facq-file`/
//! `facq-net` because this is the one crate that already depends on all of
//! them; putting it anywhere else would create a cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use facq_core::{Error, Result};
use facq_fixtures::{NullSink, SoftwareSource, SoftwareSourceConfig, VectorSink, Waveform};
use facq_file::{FileSink, FileSource};
use facq_net::OperationPlug;
use facq_pipeline::{Operation, Sink, Source};

/// The string-keyed construction parameters for one catalog item, as read
/// from or written to a `.stream` file.
pub type ParamMap = BTreeMap<String, String>;

/// Which of the three pipeline roles a catalog entry fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Produces samples.
    Source,
    /// Transforms samples in place.
    Operation,
    /// Consumes samples.
    Sink,
}

/// A freshly constructed catalog item, tagged by role.
pub enum CatalogItem {
    /// A boxed source.
    Source(Box<dyn Source>),
    /// A boxed operation.
    Operation(Box<dyn Operation>),
    /// A boxed sink.
    Sink(Box<dyn Sink>),
}

type Ctor = Arc<dyn Fn(&ParamMap) -> Result<CatalogItem> + Send + Sync>;

struct Entry {
    kind: ItemKind,
    ctor: Ctor,
}

/// A registry of named item constructors, used by [`crate::Stream::load`] to
/// turn a saved `.stream` file back into live pipeline components.
pub struct Catalog {
    entries: HashMap<String, Entry>,
}

impl Catalog {
    /// An empty catalog with nothing registered.
    pub fn new() -> Self {
        Catalog {
            entries: HashMap::new(),
        }
    }

    /// Registers `name` as an item of the given `kind`, built by `ctor`.
    /// A later registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, kind: ItemKind, ctor: F)
    where
        F: Fn(&ParamMap) -> Result<CatalogItem> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Entry { kind, ctor: Arc::new(ctor) });
    }

    fn lookup(&self, name: &str, kind: ItemKind) -> Result<&Entry> {
        match self.entries.get(name) {
            Some(entry) if entry.kind == kind => Ok(entry),
            Some(entry) => Err(Error::Config(format!(
                "catalog item '{name}' is a {:?}, not a {kind:?}",
                entry.kind
            ))),
            None => Err(Error::Config(format!("unknown catalog item '{name}'"))),
        }
    }

    /// Constructs `name` (which must be registered as `kind`) from `params`.
    pub fn construct(&self, name: &str, kind: ItemKind, params: &ParamMap) -> Result<CatalogItem> {
        (self.lookup(name, kind)?.ctor)(params)
    }
}

impl Default for Catalog {
    /// The built-in catalog: the reference fixtures from `facq-fixtures`,
    /// the file codec's source/sink from `facq-file`, and the network tee
    /// operation from `facq-net`.
    fn default() -> Self {
        let mut catalog = Catalog::new();
        catalog.register("software", ItemKind::Source, build_software_source);
        catalog.register("file-source", ItemKind::Source, build_file_source);
        catalog.register("null", ItemKind::Sink, |_| Ok(CatalogItem::Sink(Box::new(NullSink::new()))));
        catalog.register("vector", ItemKind::Sink, |_| Ok(CatalogItem::Sink(Box::new(VectorSink::new()))));
        catalog.register("file", ItemKind::Sink, build_file_sink);
        catalog.register("plug", ItemKind::Operation, build_operation_plug);
        catalog
    }
}

fn get<'a>(params: &'a ParamMap, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::Config(format!("missing required parameter '{key}'")))
}

fn parse_f64(params: &ParamMap, key: &str) -> Result<f64> {
    get(params, key)?
        .parse()
        .map_err(|_| Error::Config(format!("parameter '{key}' must be a number")))
}

fn parse_usize(params: &ParamMap, key: &str) -> Result<usize> {
    get(params, key)?
        .parse()
        .map_err(|_| Error::Config(format!("parameter '{key}' must be a non-negative integer")))
}

fn parse_u16(params: &ParamMap, key: &str) -> Result<u16> {
    get(params, key)?
        .parse()
        .map_err(|_| Error::Config(format!("parameter '{key}' must be a 16-bit port number")))
}

fn build_software_source(params: &ParamMap) -> Result<CatalogItem> {
    let function_str = get(params, "function")?;
    let function = Waveform::parse(function_str)
        .ok_or_else(|| Error::Config(format!("unknown waveform function '{function_str}'")))?;
    let config = SoftwareSourceConfig {
        function,
        amplitude: parse_f64(params, "amplitude")?,
        wave_period: parse_f64(params, "wave-period")?,
        sample_period: parse_f64(params, "period")?,
        n_channels: parse_usize(params, "n-channels")?,
    };
    Ok(CatalogItem::Source(Box::new(SoftwareSource::new(config)?)))
}

fn build_file_sink(params: &ParamMap) -> Result<CatalogItem> {
    let filename = get(params, "filename")?;
    Ok(CatalogItem::Sink(Box::new(FileSink::new(filename))))
}

fn build_file_source(params: &ParamMap) -> Result<CatalogItem> {
    let filename = get(params, "filename")?;
    Ok(CatalogItem::Source(Box::new(FileSource::open(filename)?)))
}

fn build_operation_plug(params: &ParamMap) -> Result<CatalogItem> {
    let address = get(params, "address")?.to_string();
    let port = parse_u16(params, "port")?;
    Ok(CatalogItem::Operation(Box::new(OperationPlug::new(address, port))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_source_is_constructed_from_its_params() {
        let catalog = Catalog::default();
        let mut params = ParamMap::new();
        params.insert("function".into(), "sine".into());
        params.insert("amplitude".into(), "5".into());
        params.insert("wave-period".into(), "1".into());
        params.insert("period".into(), "0.01".into());
        params.insert("n-channels".into(), "2".into());
        let item = catalog.construct("software", ItemKind::Source, &params).unwrap();
        assert!(matches!(item, CatalogItem::Source(_)));
    }

    #[test]
    fn looking_up_the_wrong_kind_is_an_error() {
        let catalog = Catalog::default();
        let params = ParamMap::new();
        assert!(catalog.construct("null", ItemKind::Source, &params).is_err());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let catalog = Catalog::default();
        let params = ParamMap::new();
        assert!(catalog.construct("nonexistent", ItemKind::Sink, &params).is_err());
    }

    #[test]
    fn missing_parameter_is_a_config_error() {
        let catalog = Catalog::default();
        let params = ParamMap::new();
        assert!(catalog.construct("file", ItemKind::Sink, &params).is_err());
    }
}
