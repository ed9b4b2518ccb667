//! Progress tracking errors.

use pathway_storage::StorageError;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors returned by the progress tracker.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Malformed identifier, out-of-range step or inconsistent snapshot
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A step was marked complete while an earlier one is still open
    #[error("cannot complete step {step}: complete step {next_step} first")]
    SequenceViolation {
        /// Step the caller tried to complete
        step: u32,
        /// The only step that may be completed next
        next_step: u32,
    },

    /// A required entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The stored progress moved away from the caller's snapshot
    #[error("progress changed concurrently: expected {expected} completed steps, found {actual}")]
    Conflict {
        /// Value the caller based its update on
        expected: u32,
        /// Value currently stored
        actual: u32,
    },

    /// The store failed
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),
}

impl ProgressError {
    /// Whether the end user can fix this by acting differently
    /// (finishing an earlier step, or refreshing their view).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SequenceViolation { .. } | Self::Conflict { .. })
    }
}

impl From<pathway_core::IdError> for ProgressError {
    fn from(e: pathway_core::IdError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}
