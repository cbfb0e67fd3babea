#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-stream-data` defines the immutable descriptor of an acquisition
//! run — [`StreamData`] — along with its building blocks, [`Chanlist`] and
//! [`ChannelSpec`], and the [`Unit`] enumeration. These types cross every
//! boundary in the acquisition core: they travel over the wire handshake,
//! they sit in the file header, and they feed the running SHA-256 digest the
//! file codec maintains.
//!
//! # Design
//!
//! [`StreamData::new`] is the only constructor and validates every invariant
//! (channel count bounds, period positivity, matching array lengths,
//! `max > min`) so a `StreamData` that exists is, by construction, valid.
//! [`StreamData::write_wire`]/[`StreamData::read_wire`] implement the exact
//! byte order the network handshake and file header share; the two formats
//! differ only in what surrounds this common core (the file format also
//! carries a magic word and channel/unit/max/min regions at fixed offsets,
//! owned by `facq-file`).
//!
//! # See also
//!
//! - [`facq_core`] for the shared error type these constructors return.

mod channel;
mod stream_data;
mod units;

pub use channel::{ChannelSpec, Chanlist, Direction};
pub use stream_data::{StreamData, MAX_CHANNELS, WIRE_BPS};
pub use units::Unit;
