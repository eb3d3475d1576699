//! Zero-cost logging helpers.
//!
//! With the `tracing` feature enabled these macros forward to the `tracing` crate.
//! Without it they expand to nothing, so the hot loops of the engine carry no
//! logging cost in default builds.
//!
//! ```bash
//! # Superstep-level diagnostics while running the test suite
//! RUST_LOG=superstep=debug cargo test --features tracing
//! ```

#![allow(unused_macros, unused_imports)]

/// Trace-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

/// Info-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! info_log {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_log {
    ($($arg:tt)*) => {};
}

/// Warn-level logging. No-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use info_log;
pub(crate) use trace_log;
pub(crate) use warn_log;
