//! Error types for Horizon Shell core.

use std::fmt;

/// Errors raised when marshaling work onto the UI-affine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No dispatcher is installed for the target thread (the UI has not
    /// started yet, or has already been torn down).
    NoAffinityContext,
    /// The dispatcher has been closed and accepts no more work.
    ContextClosed,
    /// The queued invocation was dropped before it ran.
    Abandoned,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAffinityContext => write!(f, "No UI affinity context is available"),
            Self::ContextClosed => write!(f, "The UI dispatcher has been closed"),
            Self::Abandoned => {
                write!(f, "The queued invocation was discarded before it executed")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
