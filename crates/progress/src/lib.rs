//! Pathway Progress Tracking
//!
//! Sequential step completion, progress views and completion estimates.

#![warn(missing_docs)]

pub mod cursor;
pub mod error;
pub mod tracker;
pub mod view;
pub mod estimator;

pub use cursor::{ProgressCursor, StepAction, StepStatus, Timeline, DEFAULT_TIMELINE_STEPS};
pub use error::{ProgressError, Result};
pub use tracker::{ProgressTracker, PathwayProgressTracker, TrackerConfig};
pub use view::{PathwayProgress, PathwayProgressSummary, StepView};
pub use estimator::CompletionEstimator;
