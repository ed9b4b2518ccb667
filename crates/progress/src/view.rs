//! Read models handed to callers for rendering.

use pathway_core::{Pathway, PathwayId, ProgressRecord, Time};
use serde::{Deserialize, Serialize};

use crate::cursor::{ProgressCursor, StepStatus, Timeline, DEFAULT_TIMELINE_STEPS};

/// One step as the learner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    /// 1-based position
    pub number: u32,
    /// Step title
    pub title: String,
    /// Free-text duration
    pub estimated_time: String,
    /// Completed, current or locked
    pub status: StepStatus,
}

/// Full progress picture for one learner on one pathway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayProgress {
    /// Pathway
    pub pathway_id: PathwayId,
    /// Pathway slug
    pub slug: String,
    /// Pathway title
    pub title: String,
    /// Leading steps done
    pub completed_steps: u32,
    /// Steps in the pathway
    pub total_steps: u32,
    /// Steps still open
    pub remaining_steps: u32,
    /// Rounded percentage
    pub percent: u8,
    /// Next step to work on
    pub current_step: Option<u32>,
    /// Every step with its status
    pub steps: Vec<StepView>,
    /// Condensed view of the first steps
    pub timeline: Timeline,
    /// Last progress write, if the learner has started
    pub updated_at: Option<Time>,
}

impl PathwayProgress {
    /// Build the view from a pathway and the learner's cursor.
    pub fn new(pathway: &Pathway, cursor: ProgressCursor, updated_at: Option<Time>) -> Self {
        let steps = pathway
            .steps
            .iter()
            .zip(1u32..)
            .map(|(step, number)| StepView {
                number,
                title: step.title.clone(),
                estimated_time: step.estimated_time.clone(),
                status: cursor.step_status(number),
            })
            .collect();

        Self {
            pathway_id: pathway.id,
            slug: pathway.slug.clone(),
            title: pathway.title.clone(),
            completed_steps: cursor.completed(),
            total_steps: cursor.total(),
            remaining_steps: cursor.remaining_steps(),
            percent: cursor.progress_percent(),
            current_step: cursor.current_step(),
            steps,
            timeline: cursor.timeline(DEFAULT_TIMELINE_STEPS),
            updated_at,
        }
    }
}

/// Dashboard entry for a pathway the learner is part-way through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayProgressSummary {
    /// Pathway
    pub pathway_id: PathwayId,
    /// Pathway slug
    pub slug: String,
    /// Pathway title
    pub title: String,
    /// Leading steps done
    pub completed_steps: u32,
    /// Steps in the pathway
    pub total_steps: u32,
    /// Rounded percentage
    pub percent: u8,
    /// Title of the next step
    pub next_step_title: Option<String>,
    /// Last progress write
    pub updated_at: Time,
}

impl PathwayProgressSummary {
    pub(crate) fn new(pathway: &Pathway, cursor: ProgressCursor, record: &ProgressRecord) -> Self {
        Self {
            pathway_id: pathway.id,
            slug: pathway.slug.clone(),
            title: pathway.title.clone(),
            completed_steps: cursor.completed(),
            total_steps: cursor.total(),
            percent: cursor.progress_percent(),
            next_step_title: cursor
                .current_step()
                .and_then(|n| pathway.step(n))
                .map(|s| s.title.clone()),
            updated_at: record.updated_at,
        }
    }
}
