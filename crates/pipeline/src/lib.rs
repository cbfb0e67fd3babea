#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-pipeline` defines the polymorphic [`Source`], [`Sink`], and
//! [`Operation`] contracts every acquisition backend implements, the
//! [`OperationList`] that chains operations atomically, and the
//! [`Pipeline`] orchestrator that runs a producer thread (owns the source)
//! and a consumer thread (owns the operations and the sink) against a
//! shared [`facq_buffer::RingBuffer`].
//!
//! # Design
//!
//! The pipeline never unwinds a panic or a `Result` across the thread
//! boundary back to the caller: both worker loops convert every failure
//! into a [`Message`](monitor::Message) posted to a [`Monitor`], which the
//! host application drains on its own 1-second cadence. The pipeline itself
//! never calls `stop()` on error — only the host's delivery callback does,
//! keeping worker-thread failure reporting separate from the CLI's own
//! error-to-exit-code mapping.
//!
//! # Invariants
//!
//! - [`OperationList::start`] is transactional (see its docs).
//! - A chunk that leaves the ring buffer is always either written to the
//!   sink or dropped after the monitor has been notified of the failure
//!   that caused the drop.
//!
//! # See also
//!
//! - [`facq_buffer`] for the chunk and ring-buffer types moved between the
//!   two worker threads.
//! - [`facq_stream_data`] for the descriptor threaded through every
//!   contract method.

mod consumer;
mod monitor;
mod operation_list;
mod pipeline;
mod producer;
mod traits;

pub use monitor::{Message, MessageKind, Monitor, MonitorHandle, POLL_INTERVAL};
pub use operation_list::OperationList;
pub use pipeline::{Pipeline, State};
pub use traits::{Operation, Sink, Source};
