use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{progress::ProblemStatus, student::ClassName};

#[derive(Debug, Deserialize)]
pub struct ClassFilterQuery {
    /// A class label, `all`, or absent.
    pub class_filter: Option<String>,
}

/// Per-student aggregate for the teacher views.
#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub username: String,
    pub class_name: ClassName,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub completed_problems: u32,
    pub total_problems: u32,
    pub progress_percentage: f64,
    pub weighted_score: f64,
    pub total_attempts: u32,
    pub problems: BTreeMap<String, ProblemStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub class_filter: Option<ClassName>,
    pub total_students: usize,
    pub active_students: usize,
    pub average_progress: f64,
    pub average_score: f64,
    pub total_attempts: u32,
    pub students_per_class: BTreeMap<ClassName, usize>,
    /// problem_id -> number of students who completed it
    pub problem_completion: BTreeMap<String, usize>,
    pub students: Vec<StudentReport>,
}
