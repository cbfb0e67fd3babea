#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-fixtures` provides the minimal `Source`/`Sink` implementations
//! needed to exercise the pipeline, file codec, and network plug without a
//! GUI or hardware backend: [`SoftwareSource`], a free-running waveform
//! generator; [`NullSink`], which discards everything; and [`VectorSink`],
//! which accumulates samples in-process for test assertions.
//!
//! None of these carry catalog registration themselves — `facq-persist`
//! owns the catalog and wires these types (plus the file and net crates'
//! items) into it, since registration is the one place all of those crates
//! need to be visible at once.

mod null_sink;
mod software_source;
mod vector_sink;

pub use null_sink::NullSink;
pub use software_source::{SoftwareSource, SoftwareSourceConfig, Waveform};
pub use vector_sink::VectorSink;
