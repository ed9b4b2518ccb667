//! Pathway core data models.
//!
//! This crate defines learning pathways and the per-user progress records
//! that the tracker maintains against them.

#![warn(missing_docs)]

// Core identities
mod id;

// Pathway definitions
mod pathway;

// Learner progress
mod progress;

// Re-exports
pub use id::{IdError, PathwayId, UserId};
pub use pathway::{Pathway, PathwayStep, StepResource};
pub use progress::ProgressRecord;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
