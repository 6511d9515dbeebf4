//! Adapter error types

/// Errors from the scoped launch helpers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopedLaunchError {
    /// Lazy jobs would run against a disposal check made at launch time
    #[error("Lazy start is not supported: disposal is only checked at launch")]
    LazyStart,
}
