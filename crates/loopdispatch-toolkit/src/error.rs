//! Event loop error types

/// Errors reported by the event loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    /// The loop (or the resource bound to it) has been disposed
    #[error("Event loop is disposed")]
    Disposed,

    /// The operation is only valid on the loop's owner thread
    #[error("Invalid thread access: operation requires the loop's owner thread")]
    WrongThread,

    /// The dedicated loop thread could not be started
    #[error("Failed to start loop thread: {0}")]
    Spawn(String),
}

/// Event loop result
pub type LoopResult<T> = Result<T, LoopError>;
