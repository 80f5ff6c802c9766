//! Persistence seams. The service talks to these traits only; `MongoStore`
//! backs them in production and `MemoryStore` in tests and local runs.
//!
//! Progress writes are single conditional upserts so that `completed`,
//! `score` and `attempts` stay monotone without a per-student lock.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ClassName, Problem, ProgressRecord, Section, Student};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const STUDENTS: &str = "students";
pub const PROGRESS: &str = "progress";
pub const PROBLEMS: &str = "problems";
pub const SECTIONS: &str = "sections";

/// Monotone write produced by one graded attempt.
#[derive(Debug, Clone)]
pub struct AttemptWrite<'a> {
    pub username: &'a str,
    pub problem_id: &'a str,
    pub section_id: &'a str,
    pub correct: bool,
    /// Kept only if it beats the stored score.
    pub candidate_score: u32,
    pub hints_used: u32,
    pub at: DateTime<Utc>,
}

/// Explicit stage marker; `completed` only ever moves to true.
#[derive(Debug, Clone)]
pub struct StageMark<'a> {
    pub username: &'a str,
    pub problem_id: &'a str,
    pub section_id: &'a str,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LearnerWipe {
    pub students_deleted: u64,
    pub progress_deleted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub students: u64,
    pub progress: u64,
    pub problems: u64,
    pub sections: u64,
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Creates the student on first login, otherwise bumps `last_login_at`.
    /// Returns the stored student and whether it was created.
    async fn record_login(
        &self,
        username: &str,
        class_name: ClassName,
        at: DateTime<Utc>,
    ) -> Result<(Student, bool)>;

    async fn find_student(&self, username: &str) -> Result<Option<Student>>;

    async fn list_students(&self, class_filter: Option<ClassName>) -> Result<Vec<Student>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find_progress(&self, username: &str, problem_id: &str)
        -> Result<Option<ProgressRecord>>;

    async fn list_progress(&self, username: &str) -> Result<Vec<ProgressRecord>>;

    async fn list_progress_for(&self, usernames: &[String]) -> Result<Vec<ProgressRecord>>;

    /// `attempts += 1`; on a correct attempt `completed = true` and
    /// `score = max(score, candidate)`. Returns the stored record.
    async fn apply_attempt(&self, write: AttemptWrite<'_>) -> Result<ProgressRecord>;

    async fn mark_stage(&self, mark: StageMark<'_>) -> Result<ProgressRecord>;

    /// Inserts a zeroed record unless one exists. Returns true when inserted.
    async fn insert_progress_if_absent(
        &self,
        username: &str,
        problem_id: &str,
        section_id: &str,
    ) -> Result<bool>;
}

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    async fn section_exists(&self, section_id: &str) -> Result<bool>;

    async fn insert_curriculum(&self, sections: &[Section], problems: &[Problem]) -> Result<()>;

    /// Ordered by ordinal.
    async fn load_sections(&self) -> Result<Vec<Section>>;

    /// Ordered by section, then position.
    async fn load_problems(&self) -> Result<Vec<Problem>>;
}

#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn clear_learners(&self) -> Result<LearnerWipe>;

    /// Removes students whose username starts with `prefix` (ASCII case-insensitive)
    /// together with their progress.
    async fn clear_learners_with_prefix(&self, prefix: &str) -> Result<LearnerWipe>;

    async fn clear_curriculum(&self) -> Result<()>;

    async fn counts(&self) -> Result<CollectionCounts>;

    async fn shutdown(&self) {}
}

/// Everything the application needs from storage.
pub trait CourseStore: StudentStore + ProgressStore + CurriculumStore + MaintenanceStore {}

impl<T> CourseStore for T where T: StudentStore + ProgressStore + CurriculumStore + MaintenanceStore {}
