//! Completed-steps cursor and its transitions.
//!
//! Progress through a pathway of `total` steps is one of `total + 1` states,
//! `0..=total`, counting how many leading steps are done. From state `k`
//! the only forward move is completing step `k + 1`; unmarking step
//! `j <= k` moves back to `j - 1`.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

/// Steps shown on a timeline before the rest are folded into a count.
pub const DEFAULT_TIMELINE_STEPS: u32 = 10;

/// What the caller wants to do with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Mark the step done
    Complete,
    /// Mark the step not done
    Uncomplete,
}

impl StepAction {
    /// `true` maps to `Complete`, `false` to `Uncomplete`.
    pub fn from_mark(mark_complete: bool) -> Self {
        if mark_complete {
            Self::Complete
        } else {
            Self::Uncomplete
        }
    }
}

/// Display state of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Within the completed prefix
    Completed,
    /// The next step to work on
    Current,
    /// Not reachable until earlier steps are done
    Locked,
}

/// Compact timeline of the first few steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// `(step number, status)` for each visible step
    pub steps: Vec<(u32, StepStatus)>,
    /// Steps past the visible window
    pub hidden_steps: u32,
}

/// Position within a pathway: how many leading steps are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressCursor {
    completed: u32,
    total: u32,
}

impl ProgressCursor {
    /// Create a cursor, rejecting `completed > total`.
    pub fn new(completed: u32, total: u32) -> Result<Self> {
        if completed > total {
            return Err(ProgressError::InvalidArgument(format!(
                "completed steps {} exceed total steps {}",
                completed, total
            )));
        }
        Ok(Self { completed, total })
    }

    /// Cursor for a pathway nobody has started.
    pub fn start(total: u32) -> Self {
        Self { completed: 0, total }
    }

    /// Leading steps completed.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Steps in the pathway.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Apply an action to a 1-based step and return the resulting cursor.
    ///
    /// Completing a step that is already done, or unmarking one that is not,
    /// leaves the cursor where it is.
    pub fn apply(self, step: u32, action: StepAction) -> Result<Self> {
        if step == 0 || step > self.total {
            return Err(ProgressError::InvalidArgument(format!(
                "step {} is outside 1..={}",
                step, self.total
            )));
        }

        let completed = match action {
            StepAction::Complete => {
                let next_step = self.completed + 1;
                if step > next_step {
                    return Err(ProgressError::SequenceViolation { step, next_step });
                }
                self.completed.max(step)
            }
            StepAction::Uncomplete => self.completed.min(step.saturating_sub(1)),
        };

        Ok(Self {
            completed: completed.min(self.total),
            total: self.total,
        })
    }

    /// Percentage complete, rounded half up; 0 for an empty pathway.
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let completed = u64::from(self.completed);
        let total = u64::from(self.total);
        // round(c / t * 100) == floor((200c + t) / 2t)
        let percent = (200 * completed + total) / (2 * total);
        u8::try_from(percent).unwrap_or(100)
    }

    /// Whether step `n` is inside the completed prefix.
    pub fn is_step_completed(&self, n: u32) -> bool {
        n >= 1 && n <= self.completed
    }

    /// Whether step `n` is the next one to work on.
    pub fn is_current_step(&self, n: u32) -> bool {
        n == self.completed + 1 && n <= self.total
    }

    /// Steps still to do.
    pub fn remaining_steps(&self) -> u32 {
        self.total - self.completed
    }

    /// The next step to work on, if any remain.
    pub fn current_step(&self) -> Option<u32> {
        (!self.is_finished()).then_some(self.completed + 1)
    }

    /// All steps done. An empty pathway counts as finished.
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }

    /// Started but not finished.
    pub fn is_in_progress(&self) -> bool {
        self.completed > 0 && !self.is_finished()
    }

    /// Status of step `n`.
    pub fn step_status(&self, n: u32) -> StepStatus {
        if self.is_step_completed(n) {
            StepStatus::Completed
        } else if self.is_current_step(n) {
            StepStatus::Current
        } else {
            StepStatus::Locked
        }
    }

    /// Statuses of the first `max_visible` steps.
    pub fn timeline(&self, max_visible: u32) -> Timeline {
        let visible = self.total.min(max_visible);
        Timeline {
            steps: (1..=visible).map(|n| (n, self.step_status(n))).collect(),
            hidden_steps: self.total - visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(completed: u32, total: u32) -> ProgressCursor {
        ProgressCursor::new(completed, total).unwrap()
    }

    #[test]
    fn test_new_rejects_overflowing_cursor() {
        assert!(matches!(
            ProgressCursor::new(4, 3),
            Err(ProgressError::InvalidArgument(_))
        ));
        assert_eq!(ProgressCursor::start(3).completed(), 0);
    }

    #[test]
    fn test_walkthrough_of_five_step_pathway() {
        let c = ProgressCursor::start(5);
        let c = c.apply(1, StepAction::Complete).unwrap();
        assert_eq!(c.completed(), 1);

        let err = c.apply(3, StepAction::Complete).unwrap_err();
        assert!(matches!(err, ProgressError::SequenceViolation { step: 3, next_step: 2 }));
        assert_eq!(c.completed(), 1);

        let c = c.apply(2, StepAction::Complete).unwrap();
        assert_eq!(c.completed(), 2);
        assert_eq!(c.progress_percent(), 40);

        let c = c.apply(3, StepAction::Complete).unwrap();
        assert_eq!(c.completed(), 3);

        let c = c.apply(3, StepAction::Uncomplete).unwrap();
        assert_eq!(c.completed(), 2);
    }

    #[test]
    fn test_out_of_range_steps_are_invalid() {
        let c = cursor(1, 3);
        for action in [StepAction::Complete, StepAction::Uncomplete] {
            assert!(matches!(c.apply(0, action), Err(ProgressError::InvalidArgument(_))));
            assert!(matches!(c.apply(4, action), Err(ProgressError::InvalidArgument(_))));
        }
        assert!(ProgressCursor::start(0).apply(1, StepAction::Complete).is_err());
    }

    #[test]
    fn test_every_transition_stays_in_bounds() {
        for total in 0..=6 {
            for completed in 0..=total {
                let c = cursor(completed, total);
                for step in 1..=total {
                    for action in [StepAction::Complete, StepAction::Uncomplete] {
                        if let Ok(next) = c.apply(step, action) {
                            assert!(next.completed() <= total);
                            assert_eq!(next.total(), total);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_only_forward_move_is_next_step() {
        for total in 1..=6 {
            for completed in 0..=total {
                let c = cursor(completed, total);
                for step in 1..=total {
                    match c.apply(step, StepAction::Complete) {
                        Ok(next) if step == completed + 1 => assert_eq!(next.completed(), step),
                        Ok(next) => {
                            assert!(step <= completed);
                            assert_eq!(next.completed(), completed);
                        }
                        Err(ProgressError::SequenceViolation { next_step, .. }) => {
                            assert!(step > completed + 1);
                            assert_eq!(next_step, completed + 1);
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_uncomplete_moves_back_to_before_step() {
        for total in 1..=6 {
            for completed in 0..=total {
                let c = cursor(completed, total);
                for step in 1..=total {
                    let next = c.apply(step, StepAction::Uncomplete).unwrap();
                    if step <= completed {
                        assert_eq!(next.completed(), step - 1);
                    } else {
                        assert_eq!(next.completed(), completed);
                    }
                }
            }
        }
        assert_eq!(cursor(1, 4).apply(1, StepAction::Uncomplete).unwrap().completed(), 0);
    }

    #[test]
    fn test_in_order_completion_reaches_end() {
        for total in 0..=8 {
            let mut c = ProgressCursor::start(total);
            for _ in 0..total {
                let step = c.completed() + 1;
                c = c.apply(step, StepAction::Complete).unwrap();
            }
            assert_eq!(c.completed(), total);
            assert!(c.is_finished());
            assert_eq!(c.current_step(), None);
        }
    }

    #[test]
    fn test_finished_cursor_can_roll_back() {
        let c = cursor(4, 4).apply(4, StepAction::Uncomplete).unwrap();
        assert_eq!(c.completed(), 3);
        assert_eq!(c.current_step(), Some(4));
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(cursor(3, 4).progress_percent(), 75);
        assert_eq!(cursor(2, 5).progress_percent(), 40);
        assert_eq!(cursor(0, 0).progress_percent(), 0);
        assert_eq!(cursor(1, 3).progress_percent(), 33);
        assert_eq!(cursor(2, 3).progress_percent(), 67);
        assert_eq!(cursor(1, 8).progress_percent(), 13);
        assert_eq!(cursor(7, 7).progress_percent(), 100);
    }

    #[test]
    fn test_step_predicates() {
        let c = cursor(2, 4);
        assert!(c.is_step_completed(1));
        assert!(c.is_step_completed(2));
        assert!(!c.is_step_completed(3));
        assert!(!c.is_step_completed(0));
        assert!(c.is_current_step(3));
        assert!(!c.is_current_step(4));
        assert_eq!(c.remaining_steps(), 2);
        assert!(c.is_in_progress());
        assert!(!cursor(4, 4).is_current_step(5));
        assert!(!cursor(0, 4).is_in_progress());
    }

    #[test]
    fn test_timeline_folds_extra_steps() {
        let c = cursor(3, 12);
        let timeline = c.timeline(DEFAULT_TIMELINE_STEPS);
        assert_eq!(timeline.steps.len(), 10);
        assert_eq!(timeline.hidden_steps, 2);
        assert_eq!(timeline.steps[2], (3, StepStatus::Completed));
        assert_eq!(timeline.steps[3], (4, StepStatus::Current));
        assert_eq!(timeline.steps[4], (5, StepStatus::Locked));

        let short = cursor(0, 2).timeline(DEFAULT_TIMELINE_STEPS);
        assert_eq!(short.steps, vec![(1, StepStatus::Current), (2, StepStatus::Locked)]);
        assert_eq!(short.hidden_steps, 0);
    }
}
