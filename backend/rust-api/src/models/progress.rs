use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::student::validate_username;

/// One row of the "progress" collection, keyed by (username, problem_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub username: String,
    pub problem_id: String,
    pub section_id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Zeroed record, as written by the section bootstrapper.
    pub fn zeroed(username: &str, problem_id: &str, section_id: &str) -> Self {
        Self {
            username: username.to_string(),
            problem_id: problem_id.to_string(),
            section_id: section_id.to_string(),
            completed: false,
            score: 0,
            attempts: 0,
            hints_used: 0,
            last_attempt_at: None,
        }
    }
}

/// POST /students/{username}/attempt
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProblemAttempt {
    #[validate(length(min = 1, max = 64, message = "problem_id is required"))]
    pub problem_id: String,
    #[validate(length(max = 500, message = "Answer is too long"))]
    pub answer: String,
    #[serde(default)]
    pub hints_used: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResponse {
    pub correct: bool,
    pub score: u32,
    pub attempts: u32,
    pub progress: ProgressRecord,
}

/// Client-reported stage state for POST /updateProgress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Complete,
    #[serde(alias = "in_progress", alias = "started", alias = "pending")]
    Incomplete,
}

/// POST /updateProgress
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressUpdate {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(length(min = 1, message = "section is required"))]
    pub section: String,
    #[validate(length(min = 1, message = "stage is required"))]
    pub stage: String,
    pub status: StageStatus,
}

/// Cell of the progress grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStatus {
    pub completed: bool,
    pub score: u32,
    pub attempts: u32,
}

impl From<&ProgressRecord> for ProblemStatus {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            completed: record.completed,
            score: record.score,
            attempts: record.attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstSteps,
    PracticeMaster,
    AssessmentAce,
    InequalityExpert,
}

/// section_id -> problem_id -> status
pub type ProgressGrid = BTreeMap<String, BTreeMap<String, ProblemStatus>>;

/// GET /students/{username}/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRollup {
    pub progress: ProgressGrid,
    pub total_points: u32,
    pub badges: Vec<Badge>,
}
