use core::convert::Infallible;

use super::executor::EngineState;
use crate::concurrency::TaskError;

/// Errors of the BSP engine.
///
/// Cancellation is not an error: it is reported as
/// [`Outcome::Cancelled`](super::Outcome::Cancelled).
#[derive(Debug, thiserror::Error)]
pub enum PregelError {
    /// A configuration value is out of range.
    #[error("invalid pregel configuration: {0}")]
    InvalidConfig(String),
    /// A configuration document could not be parsed.
    #[error("malformed pregel configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// `run` was called on an engine that is not in its initial state.
    #[error("computation already started (state: {0:?})")]
    AlreadyRan(EngineState),
    /// A partition task panicked, typically inside user compute code.
    #[error(transparent)]
    Task(#[from] TaskError<Infallible>),
    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
