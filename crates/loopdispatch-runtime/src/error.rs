//! Runtime error types

use std::time::Duration;

/// Errors raised while handing work to a dispatcher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The dispatch target refused the work (e.g. torn down mid-post)
    #[error("Dispatch rejected: {0}")]
    Rejected(String),

    /// A suspension helper was used outside a launched task
    #[error("No dispatcher bound to the current task")]
    NoDispatcher,

    /// A scheduled resumption was dropped before it fired
    #[error("Scheduled resumption was dropped before it fired")]
    Abandoned,

    /// No usable main dispatcher could be created
    #[error("Missing main dispatcher: {0}")]
    MissingMain(String),
}

/// Why a job finished without a value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The job was cancelled
    #[error("Job was cancelled")]
    Cancelled,

    /// A pending segment of the job was dropped by its dispatcher
    #[error("Job was dropped by its dispatcher before completion")]
    Dropped,
}

/// Errors returned by `with_timeout`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    /// The deadline passed before the future completed
    #[error("Timed out after {0:?}")]
    Elapsed(Duration),

    /// The timeout could not be registered
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
