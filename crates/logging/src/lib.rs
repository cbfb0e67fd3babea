#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Overview
//!
//! `facq-logging` re-exports [`tracing`] for every crate in the workspace and,
//! behind the default `subscriber` feature, provides a single entry point for
//! binaries to install a `tracing-subscriber` formatter, so leaf crates never
//! pick their own tracing version.
//!
//! # Design
//!
//! Library crates should depend on `facq-logging` with `default-features =
//! false` and only use the re-exported [`tracing`] macros. Only `facq-cli`
//! (and test harnesses) enable `subscriber` and call [`init`].

/// Re-export of the `tracing` facade so dependants don't need their own
/// direct dependency.
pub use tracing;

#[cfg(feature = "subscriber")]
mod subscriber {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Installs a `tracing-subscriber` formatter reading the `RUST_LOG`
    /// environment variable, defaulting to `info` when unset. Safe to call
    /// more than once; only the first call takes effect.
    pub fn init() {
        INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        });
    }
}

#[cfg(feature = "subscriber")]
pub use subscriber::init;
