//! Pathway model - an ordered list of learning steps.

use serde::{Deserialize, Serialize};
use crate::id::PathwayId;
use crate::Time;

/// A learning pathway.
///
/// Step order is fixed once the pathway is created: step `i` (1-based)
/// depends on steps `1..i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    /// Unique identifier
    #[serde(default)]
    pub id: PathwayId,

    /// URL-friendly unique handle
    #[serde(default = "new_slug")]
    pub slug: String,

    /// Title
    pub title: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Rough total duration, free text
    #[serde(default)]
    pub estimated_time: String,

    /// Difficulty label
    #[serde(default)]
    pub difficulty: String,

    /// Things the learner should know beforehand
    #[serde(default)]
    pub prerequisites: Vec<String>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<PathwayStep>,

    /// Created at
    #[serde(default = "chrono::Utc::now")]
    pub created_at: Time,
}

/// One unit of a pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayStep {
    /// Step title
    pub title: String,

    /// What the step covers
    #[serde(default)]
    pub description: String,

    /// Reading and practice material
    #[serde(default)]
    pub resources: Vec<StepResource>,

    /// Free-text duration such as "2 hours" or "1-2 weeks"
    #[serde(default)]
    pub estimated_time: String,
}

/// A resource attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResource {
    /// Display title
    pub title: String,

    /// Link, when the resource has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Pathway {
    /// Create an empty pathway with a fresh id and slug.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: PathwayId::new(),
            slug: new_slug(),
            title: title.into(),
            description: description.into(),
            estimated_time: String::new(),
            difficulty: String::new(),
            prerequisites: Vec::new(),
            steps: Vec::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Append a step.
    pub fn with_step(mut self, step: PathwayStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Give the pathway a new id, slug and creation time.
    ///
    /// Used when importing a document that may carry identifiers from
    /// another installation.
    pub fn reissue(mut self) -> Self {
        self.id = PathwayId::new();
        self.slug = new_slug();
        self.created_at = chrono::Utc::now();
        self
    }

    /// Number of steps.
    pub fn total_steps(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    /// Look up a step by its 1-based number.
    pub fn step(&self, number: u32) -> Option<&PathwayStep> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.steps.get(index)
    }
}

impl PathwayStep {
    /// Create a step with no resources.
    pub fn new(title: impl Into<String>, estimated_time: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            resources: Vec::new(),
            estimated_time: estimated_time.into(),
        }
    }
}

fn new_slug() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}
