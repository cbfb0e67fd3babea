#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-net` carries acquisition data over a TCP connection between two
//! processes. [`Plug`] is the server half: it listens for a single viewer,
//! performs the handshake, and hands decoded samples to the host's own poll
//! loop. [`OperationPlug`] is the client half: an [`facq_pipeline::Operation`]
//! that tees a running capture to a [`Plug`] elsewhere, never failing the
//! capture itself if the viewer is unreachable or drops.
//!
//! # Design
//!
//! Both halves share the handshake encoding with the file format: the first
//! bytes a viewer receives are exactly [`facq_stream_data::StreamData::write_wire`]'s
//! output, and [`Plug`] decodes it with
//! [`facq_stream_data::StreamData::read_wire`]. Both size their buffering
//! from [`facq_stream_data::StreamData::recommended_chunk_bytes`] rather than
//! a hardcoded constant, so a slow stream and a fast stream get proportional
//! latency.
//!
//! # See also
//!
//! - [`facq_pipeline`] for the `Operation` trait `OperationPlug` implements.
//! - [`facq_buffer`] for the `RingBuffer`/`Chunk` types `Plug` reuses
//!   internally to hand off samples from its producer thread.

mod net;
mod operation_plug;
mod plug;

pub use net::{recv_all, send_all};
pub use operation_plug::OperationPlug;
pub use plug::{Plug, PlugEvent};
