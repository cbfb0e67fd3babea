#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-core` holds the error taxonomy and the small handful of status enums
//! ([`IoStatus`], [`PollStatus`]) that every other `facq-*` crate shares. It has
//! no dependency on the rest of the workspace, so it sits at the bottom of the
//! dependency graph, below the buffer, stream-data, and pipeline layers that
//! build on it.
//!
//! # Design
//!
//! [`Error`] is a single enum with one variant family per failure class named
//! in the acquisition core's error handling design: configuration/invariant
//! violations, resource exhaustion, transient I/O, terminal I/O, operation
//! failures, and file integrity failures. Callers match on the variant they
//! care about and otherwise propagate with `?`.
//!
//! # Errors
//!
//! Every public fallible function in the workspace returns [`Result`].

use std::fmt;
use std::io;

pub mod endian;

/// Crate-wide result alias used throughout the `facq-*` workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The outcome of a non-blocking or bounded-wait I/O attempt on a source or
/// sink, as described by the source/sink contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    /// The call made forward progress; the caller may continue immediately.
    Normal,
    /// No data was available yet; the caller should retry.
    Again,
    /// The stream ended cleanly; no further data will arrive.
    Eof,
    /// The stream failed terminally.
    Error,
}

/// The outcome of polling a source or sink for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// At least one byte (source) or one chunk's worth of capacity (sink) is
    /// available right now.
    Ready,
    /// Nothing is available yet; the bounded wait elapsed without progress.
    NotReady,
    /// Polling failed terminally.
    Error,
}

/// Errors surfaced anywhere in the acquisition core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `StreamData`, channel list, or catalog item failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A resource (memory, file handle, socket) could not be obtained.
    #[error("resource error: {0}")]
    Resource(#[source] io::Error),

    /// A transient or terminal I/O condition from a source, sink, or socket.
    #[error("I/O error ({status:?}): {message}")]
    Io {
        /// Which kind of non-success status was observed.
        status: IoStatus,
        /// A short human-readable description, e.g. `"End of file in source"`.
        message: String,
        /// The underlying OS error, when one is available.
        #[source]
        source: Option<io::Error>,
    },

    /// An operation's `apply` returned an error while the pipeline was
    /// running.
    #[error("operation {operation} failed: {source}")]
    Operation {
        /// The name of the operation that failed.
        operation: String,
        /// The operation's own error, boxed to keep `Error` `Sized`.
        #[source]
        source: Box<Error>,
    },

    /// A file's magic, sample count, or digest failed verification.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
}

impl Error {
    /// Builds an [`Error::Io`] carrying [`IoStatus::Eof`].
    pub fn eof(message: impl Into<String>) -> Self {
        Error::Io {
            status: IoStatus::Eof,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an [`Error::Io`] carrying [`IoStatus::Error`] with an OS cause.
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            status: IoStatus::Error,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Wraps `self` as the cause of an [`Error::Operation`] for `operation`.
    pub fn into_operation(self, operation: impl Into<String>) -> Self {
        Error::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Resource(source)
    }
}

/// File integrity failures reported by the file codec's `verify` routine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// The leading 32-bit magic word did not match `0x075D6D39`.
    #[error("bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// The magic word every valid file must begin with.
        expected: u32,
        /// The magic word actually read from the file.
        found: u32,
    },
    /// The trailer's sample count did not match the number of samples
    /// actually present in the payload region.
    #[error("sample count mismatch: trailer says {trailer}, payload holds {observed}")]
    SampleCountMismatch {
        /// The count recorded in the trailer.
        trailer: u64,
        /// The count derived from the file's actual length.
        observed: u64,
    },
    /// The recomputed SHA-256 digest did not match the one stored in the
    /// trailer.
    #[error("digest mismatch")]
    DigestMismatch,
}

impl fmt::Display for IoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoStatus::Normal => "normal",
            IoStatus::Again => "again",
            IoStatus::Eof => "eof",
            IoStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_error_has_eof_status() {
        let err = Error::eof("End of file in source");
        match err {
            Error::Io { status, message, .. } => {
                assert_eq!(status, IoStatus::Eof);
                assert_eq!(message, "End of file in source");
            }
            _ => panic!("expected Io variant"),
        }
    }

    #[test]
    fn operation_error_wraps_source() {
        let inner = Error::Config("bad n_channels".into());
        let wrapped = inner.into_operation("scale");
        match wrapped {
            Error::Operation { operation, source } => {
                assert_eq!(operation, "scale");
                assert!(matches!(*source, Error::Config(_)));
            }
            _ => panic!("expected Operation variant"),
        }
    }

    #[test]
    fn integrity_error_converts_into_error() {
        let err: Error = IntegrityError::BadMagic {
            expected: 0x075D_6D39,
            found: 0,
        }
        .into();
        assert!(matches!(err, Error::Integrity(_)));
    }
}
