//! Progress tracking service.

use std::sync::Arc;
use async_trait::async_trait;
use pathway_core::{Pathway, PathwayId, UserId};
use pathway_storage::{CasOutcome, PathwayStore};
use tracing::debug;

use crate::cursor::{ProgressCursor, StepAction};
use crate::error::{ProgressError, Result};
use crate::view::{PathwayProgress, PathwayProgressSummary};

/// Configuration for the progress tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How many times `toggle_step` re-reads and retries after losing a
    /// compare-and-set race
    pub max_conflict_retries: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}

/// Progress tracking service.
///
/// Concurrent updates to the same (user, pathway) pair are serialized by the
/// store's compare-and-set; the tracker never writes without checking the
/// value it based the update on.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Completed steps for the pair, `0` when the learner has not started.
    async fn get_progress(&self, user_id: &UserId, pathway_id: PathwayId) -> Result<u32>;

    /// Mark a step complete or incomplete relative to the caller's snapshot.
    ///
    /// `current_completed_steps` is what the caller last saw. If the store
    /// holds something else the update is refused with
    /// [`ProgressError::Conflict`].
    async fn set_step_completion(
        &self,
        user_id: &UserId,
        pathway_id: PathwayId,
        step_number: u32,
        mark_complete: bool,
        current_completed_steps: u32,
        total_steps: u32,
    ) -> Result<u32>;

    /// Mark a step complete or incomplete against the stored value.
    async fn toggle_step(
        &self,
        user_id: &UserId,
        pathway_id: PathwayId,
        step_number: u32,
        mark_complete: bool,
    ) -> Result<u32>;

    /// Everything needed to render one pathway for one learner.
    async fn overview(&self, user_id: &UserId, pathway_id: PathwayId) -> Result<PathwayProgress>;

    /// Pathways the learner has started but not finished, most recent first.
    async fn in_progress(&self, user_id: &UserId) -> Result<Vec<PathwayProgressSummary>>;
}

/// Progress tracker backed by a [`PathwayStore`].
pub struct PathwayProgressTracker<S: PathwayStore> {
    storage: Arc<S>,
    config: TrackerConfig,
}

impl<S: PathwayStore> PathwayProgressTracker<S> {
    /// Create a new progress tracker.
    pub fn new(storage: S) -> Self {
        Self::from_arc(Arc::new(storage))
    }

    /// Create a tracker sharing an existing store.
    pub fn from_arc(storage: Arc<S>) -> Self {
        Self {
            storage,
            config: TrackerConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying store.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    async fn require_pathway(&self, pathway_id: PathwayId) -> Result<Pathway> {
        self.storage
            .load_pathway(pathway_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("pathway {}", pathway_id)))
    }

    async fn stored_steps(&self, user_id: &UserId, pathway_id: PathwayId) -> Result<u32> {
        Ok(self
            .storage
            .load_progress(user_id, pathway_id)
            .await?
            .map_or(0, |r| r.completed_steps))
    }
}

#[async_trait]
impl<S: PathwayStore + 'static> ProgressTracker for PathwayProgressTracker<S> {
    async fn get_progress(&self, user_id: &UserId, pathway_id: PathwayId) -> Result<u32> {
        self.stored_steps(user_id, pathway_id).await
    }

    async fn set_step_completion(
        &self,
        user_id: &UserId,
        pathway_id: PathwayId,
        step_number: u32,
        mark_complete: bool,
        current_completed_steps: u32,
        total_steps: u32,
    ) -> Result<u32> {
        let pathway = self.require_pathway(pathway_id).await?;
        if total_steps != pathway.total_steps() {
            return Err(ProgressError::InvalidArgument(format!(
                "pathway {} has {} steps, caller supplied {}",
                pathway_id,
                pathway.total_steps(),
                total_steps
            )));
        }

        let next = ProgressCursor::new(current_completed_steps, total_steps)?
            .apply(step_number, StepAction::from_mark(mark_complete))?;

        match self
            .storage
            .compare_and_set_progress(user_id, pathway_id, current_completed_steps, next.completed())
            .await?
        {
            CasOutcome::Applied(record) => {
                debug!(
                    "Progress {}/{}: {} -> {}",
                    user_id, pathway_id, current_completed_steps, record.completed_steps
                );
                Ok(record.completed_steps)
            }
            CasOutcome::Conflict { actual } => Err(ProgressError::Conflict {
                expected: current_completed_steps,
                actual,
            }),
        }
    }

    async fn toggle_step(
        &self,
        user_id: &UserId,
        pathway_id: PathwayId,
        step_number: u32,
        mark_complete: bool,
    ) -> Result<u32> {
        let total = self.require_pathway(pathway_id).await?.total_steps();
        let action = StepAction::from_mark(mark_complete);
        let mut retries = 0;

        loop {
            let stored = self.stored_steps(user_id, pathway_id).await?;
            let next = ProgressCursor::new(stored.min(total), total)?.apply(step_number, action)?;

            match self
                .storage
                .compare_and_set_progress(user_id, pathway_id, stored, next.completed())
                .await?
            {
                CasOutcome::Applied(record) => {
                    debug!(
                        "Progress {}/{}: {} -> {}",
                        user_id, pathway_id, stored, record.completed_steps
                    );
                    return Ok(record.completed_steps);
                }
                CasOutcome::Conflict { actual } => {
                    if retries >= self.config.max_conflict_retries {
                        return Err(ProgressError::Conflict {
                            expected: stored,
                            actual,
                        });
                    }
                    retries += 1;
                    debug!(
                        "Progress {}/{} changed to {} underneath us, retry {}",
                        user_id, pathway_id, actual, retries
                    );
                }
            }
        }
    }

    async fn overview(&self, user_id: &UserId, pathway_id: PathwayId) -> Result<PathwayProgress> {
        let pathway = self.require_pathway(pathway_id).await?;
        let record = self.storage.load_progress(user_id, pathway_id).await?;
        let total = pathway.total_steps();
        let completed = record.as_ref().map_or(0, |r| r.completed_steps).min(total);

        Ok(PathwayProgress::new(
            &pathway,
            ProgressCursor::new(completed, total)?,
            record.map(|r| r.updated_at),
        ))
    }

    async fn in_progress(&self, user_id: &UserId) -> Result<Vec<PathwayProgressSummary>> {
        let mut summaries = Vec::new();

        for record in self.storage.list_progress(user_id).await? {
            // Progress for a pathway that has since been removed is skipped.
            let Some(pathway) = self.storage.load_pathway(record.pathway_id).await? else {
                continue;
            };
            let total = pathway.total_steps();
            let cursor = ProgressCursor::new(record.completed_steps.min(total), total)?;
            if cursor.is_in_progress() {
                summaries.push(PathwayProgressSummary::new(&pathway, cursor, &record));
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
