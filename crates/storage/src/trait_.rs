//! Storage trait abstraction.

use async_trait::async_trait;
use pathway_core::{Pathway, PathwayId, ProgressRecord, UserId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result of a conditional progress write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored value matched and the new value was written.
    Applied(ProgressRecord),

    /// The stored value differed; nothing was written.
    Conflict {
        /// Value currently stored (0 when no record exists)
        actual: u32,
    },
}

/// Persistence for pathways and per-user progress.
///
/// Progress writes must be atomic per (user, pathway) key: a reader never
/// observes a half-written record, and `compare_and_set_progress` must
/// compare and write without another writer for the same key in between.
#[async_trait]
pub trait PathwayStore: Send + Sync {
    // === Pathway operations ===

    /// Save a pathway (create or update).
    async fn save_pathway(&self, pathway: &Pathway) -> Result<()>;

    /// Load a pathway by ID.
    async fn load_pathway(&self, id: PathwayId) -> Result<Option<Pathway>>;

    /// Load a pathway by slug.
    async fn load_pathway_by_slug(&self, slug: &str) -> Result<Option<Pathway>>;

    /// List all pathways, oldest first.
    async fn list_pathways(&self) -> Result<Vec<Pathway>>;

    // === Progress operations ===

    /// Load the progress record for a (user, pathway) pair.
    async fn load_progress(&self, user: &UserId, pathway: PathwayId) -> Result<Option<ProgressRecord>>;

    /// List every progress record belonging to a user.
    async fn list_progress(&self, user: &UserId) -> Result<Vec<ProgressRecord>>;

    /// Write `completed_steps` unconditionally, creating the record if absent.
    async fn upsert_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        completed_steps: u32,
    ) -> Result<ProgressRecord>;

    /// Write `completed_steps` only if the stored value equals `expected`.
    ///
    /// A missing record compares equal to `0`.
    async fn compare_and_set_progress(
        &self,
        user: &UserId,
        pathway: PathwayId,
        expected: u32,
        completed_steps: u32,
    ) -> Result<CasOutcome>;
}
