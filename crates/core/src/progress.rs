//! Per-user progress through a pathway.

use serde::{Deserialize, Serialize};
use crate::id::{PathwayId, UserId};
use crate::Time;

/// How far a user has got through a pathway.
///
/// `completed_steps` counts leading steps: a value of `n` means steps
/// `1..=n` are done and nothing after them is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Learner
    pub user_id: UserId,

    /// Pathway being followed
    pub pathway_id: PathwayId,

    /// Number of leading steps completed
    pub completed_steps: u32,

    /// First write
    pub created_at: Time,

    /// Last write
    pub updated_at: Time,
}

impl ProgressRecord {
    /// Create a fresh record stamped with the current time.
    pub fn new(user_id: UserId, pathway_id: PathwayId, completed_steps: u32) -> Self {
        let now = chrono::Utc::now();
        Self {
            user_id,
            pathway_id,
            completed_steps,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the cursor, keeping `created_at` and refreshing `updated_at`.
    pub fn advance_to(&mut self, completed_steps: u32) {
        self.completed_steps = completed_steps;
        self.updated_at = chrono::Utc::now();
    }
}
