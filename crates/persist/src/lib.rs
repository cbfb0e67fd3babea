#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-persist` is the declarative layer on top of `facq-pipeline`: a
//! [`Catalog`] of named, parameterized constructors for the sources,
//! operations, and sinks the other crates provide, and a [`Stream`] type
//! that builds a pipeline from catalog items one at a time, starts and
//! stops it, and can round-trip its configuration through a `.stream`
//! key-value file.
//!
//! # Design
//!
//! A [`Stream`] stores each configured item's catalog name and parameters
//! alongside the live trait object, rather than the other way around
//! (deriving parameters back out of a running `Box<dyn Source>`). That
//! keeps [`Stream::save`] a pure data copy with no need for a generic
//! downcast hook on [`facq_pipeline::Source`], [`facq_pipeline::Operation`],
//! or [`facq_pipeline::Sink`].
//!
//! # See also
//!
//! - [`facq_pipeline::Pipeline`], which a [`Stream`] constructs and drives
//!   once closed.

mod catalog;
mod keyfile;
mod stream;

pub use catalog::{Catalog, CatalogItem, ItemKind, ParamMap};
pub use stream::Stream;
