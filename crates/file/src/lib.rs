#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-file` is the binary sample file codec: a self-describing,
//! content-addressed format combining a `StreamData` header with a
//! big-endian payload and a SHA-256 trailer. [`FileWriter`] and
//! [`FileReader`] mirror each half of the on-disk lifecycle.
//!
//! # Design
//!
//! Every seek performed by the reader goes through the offset functions in
//! [`format`], which is the single source of truth for the header's fixed
//! regions (channel list, units, max, min) and the payload start. No reader
//! method recomputes an offset inline.
//!
//! # Invariants
//!
//! - A file that [`FileReader::verify`] accepts has a digest computed over
//!   exactly `magic || header || payload || sample_count`, all big-endian,
//!   with the trailer's 32 digest bytes stored in reverse order.
//! - [`FileWriter`] never leaves a partial file at its target path: writes
//!   land in a temp file, renamed into place only on [`FileWriter::stop`].
//!
//! # See also
//!
//! - [`facq_stream_data::StreamData::write_wire`] /
//!   [`facq_stream_data::StreamData::read_wire`], reused verbatim as the
//!   file header's encoding.

mod file_sink;
mod file_source;
mod format;
mod reader;
mod writer;

pub use file_sink::FileSink;
pub use file_source::FileSource;
pub use format::{first_channel, first_max, first_min, first_sample, first_unit, MAGIC, TRAILER_LEN};
pub use reader::FileReader;
pub use writer::FileWriter;
