//! Completion time estimation from step duration labels.

use chrono::{DateTime, Duration, Utc};
use pathway_core::Pathway;
use regex::Regex;
use tracing::warn;

const DURATION_PATTERN: &str = r"(?i)(\d+(?:\.\d+)?)\s*(?:-|to|–)?\s*(\d+(?:\.\d+)?)?\s*(months?|mos?|minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|wks?|w)\b";

/// Completion time estimator.
///
/// Step durations are free text written for humans ("2 hours",
/// "1-2 weeks"). Ranges count at their upper bound; labels that do not
/// parse are ignored.
pub struct CompletionEstimator {
    pattern: Option<Regex>,
}

impl CompletionEstimator {
    /// Create an estimator.
    pub fn new() -> Self {
        let pattern = match Regex::new(DURATION_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Duration pattern failed to compile, estimates disabled: {}", e);
                None
            }
        };
        Self { pattern }
    }

    /// Parse a duration label.
    pub fn parse_duration(&self, label: &str) -> Option<Duration> {
        let caps = self.pattern.as_ref()?.captures(label)?;
        let amount: f64 = caps
            .get(2)
            .or_else(|| caps.get(1))?
            .as_str()
            .parse()
            .ok()?;

        let unit = caps.get(3)?.as_str().to_lowercase();
        let minutes_per_unit = match unit.as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => 1.0,
            "h" | "hr" | "hrs" | "hour" | "hours" => 60.0,
            "d" | "day" | "days" => 60.0 * 24.0,
            "w" | "wk" | "wks" | "week" | "weeks" => 60.0 * 24.0 * 7.0,
            "mo" | "mos" | "month" | "months" => 60.0 * 24.0 * 30.0,
            _ => return None,
        };

        Some(Duration::minutes((amount * minutes_per_unit).round() as i64))
    }

    /// Total estimated time of the steps after the first `completed_steps`.
    ///
    /// `None` when no remaining step has a parseable estimate.
    pub fn remaining_time(&self, pathway: &Pathway, completed_steps: u32) -> Option<Duration> {
        let skip = usize::try_from(completed_steps).unwrap_or(usize::MAX);
        pathway
            .steps
            .iter()
            .skip(skip)
            .filter_map(|step| self.parse_duration(&step.estimated_time))
            .reduce(|total, d| total + d)
    }

    /// When the learner would finish if they started on the rest now.
    pub fn estimate_completion(
        &self,
        pathway: &Pathway,
        completed_steps: u32,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if completed_steps >= pathway.total_steps() {
            return Some(now);
        }
        self.remaining_time(pathway, completed_steps).map(|d| now + d)
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self::new()
    }
}
