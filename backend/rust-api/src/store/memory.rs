use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use super::{
    AttemptWrite, CollectionCounts, CurriculumStore, LearnerWipe, MaintenanceStore, ProgressStore,
    StageMark, StudentStore,
};
use crate::models::{ClassName, Problem, ProgressRecord, Section, Student};

#[derive(Default)]
struct State {
    students: BTreeMap<String, Student>,
    progress: BTreeMap<(String, String), ProgressRecord>,
    sections: Vec<Section>,
    problems: Vec<Problem>,
}

/// Process-local store with the same update semantics as Mongo.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(username: &str, problem_id: &str) -> (String, String) {
    (username.to_string(), problem_id.to_string())
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn record_login(
        &self,
        username: &str,
        class_name: ClassName,
        at: DateTime<Utc>,
    ) -> Result<(Student, bool)> {
        let mut state = self.state.write().await;
        if let Some(student) = state.students.get_mut(username) {
            student.last_login_at = at;
            return Ok((student.clone(), false));
        }

        let student = Student {
            username: username.to_string(),
            class_name,
            created_at: at,
            last_login_at: at,
        };
        state
            .students
            .insert(username.to_string(), student.clone());
        Ok((student, true))
    }

    async fn find_student(&self, username: &str) -> Result<Option<Student>> {
        Ok(self.state.read().await.students.get(username).cloned())
    }

    async fn list_students(&self, class_filter: Option<ClassName>) -> Result<Vec<Student>> {
        let state = self.state.read().await;
        Ok(state
            .students
            .values()
            .filter(|student| class_filter.is_none_or(|class| student.class_name == class))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn find_progress(
        &self,
        username: &str,
        problem_id: &str,
    ) -> Result<Option<ProgressRecord>> {
        let state = self.state.read().await;
        Ok(state.progress.get(&key(username, problem_id)).cloned())
    }

    async fn list_progress(&self, username: &str) -> Result<Vec<ProgressRecord>> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .values()
            .filter(|record| record.username == username)
            .cloned()
            .collect())
    }

    async fn list_progress_for(&self, usernames: &[String]) -> Result<Vec<ProgressRecord>> {
        let wanted: HashSet<&str> = usernames.iter().map(String::as_str).collect();
        let state = self.state.read().await;
        Ok(state
            .progress
            .values()
            .filter(|record| wanted.contains(record.username.as_str()))
            .cloned()
            .collect())
    }

    async fn apply_attempt(&self, write: AttemptWrite<'_>) -> Result<ProgressRecord> {
        let mut state = self.state.write().await;
        let record = state
            .progress
            .entry(key(write.username, write.problem_id))
            .or_insert_with(|| {
                ProgressRecord::zeroed(write.username, write.problem_id, write.section_id)
            });

        record.attempts = record.attempts.saturating_add(1);
        if write.correct {
            record.completed = true;
            record.score = record.score.max(write.candidate_score);
        }
        record.hints_used = write.hints_used;
        record.last_attempt_at = Some(write.at);
        record.section_id = write.section_id.to_string();

        Ok(record.clone())
    }

    async fn mark_stage(&self, mark: StageMark<'_>) -> Result<ProgressRecord> {
        let mut state = self.state.write().await;
        let record = state
            .progress
            .entry(key(mark.username, mark.problem_id))
            .or_insert_with(|| {
                ProgressRecord::zeroed(mark.username, mark.problem_id, mark.section_id)
            });

        if mark.complete {
            record.completed = true;
        }
        record.section_id = mark.section_id.to_string();

        Ok(record.clone())
    }

    async fn insert_progress_if_absent(
        &self,
        username: &str,
        problem_id: &str,
        section_id: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let entry_key = key(username, problem_id);
        if state.progress.contains_key(&entry_key) {
            return Ok(false);
        }
        state.progress.insert(
            entry_key,
            ProgressRecord::zeroed(username, problem_id, section_id),
        );
        Ok(true)
    }
}

#[async_trait]
impl CurriculumStore for MemoryStore {
    async fn section_exists(&self, section_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.sections.iter().any(|section| section.id == section_id))
    }

    async fn insert_curriculum(&self, sections: &[Section], problems: &[Problem]) -> Result<()> {
        let mut state = self.state.write().await;
        for section in sections {
            if state.sections.iter().any(|existing| existing.id == section.id) {
                bail!("Duplicate section id {}", section.id);
            }
        }
        for problem in problems {
            if state.problems.iter().any(|existing| existing.id == problem.id) {
                bail!("Duplicate problem id {}", problem.id);
            }
        }
        state.sections.extend_from_slice(sections);
        state.problems.extend_from_slice(problems);
        Ok(())
    }

    async fn load_sections(&self) -> Result<Vec<Section>> {
        let mut sections = self.state.read().await.sections.clone();
        sections.sort_by_key(|section| section.ordinal);
        Ok(sections)
    }

    async fn load_problems(&self) -> Result<Vec<Problem>> {
        let state = self.state.read().await;
        let ordinals: BTreeMap<&str, u8> = state
            .sections
            .iter()
            .map(|section| (section.id.as_str(), section.ordinal))
            .collect();
        let mut problems = state.problems.clone();
        problems.sort_by_key(|problem| {
            (
                ordinals.get(problem.section_id.as_str()).copied().unwrap_or(u8::MAX),
                problem.position,
            )
        });
        Ok(problems)
    }
}

#[async_trait]
impl MaintenanceStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn clear_learners(&self) -> Result<LearnerWipe> {
        let mut state = self.state.write().await;
        let wipe = LearnerWipe {
            students_deleted: state.students.len() as u64,
            progress_deleted: state.progress.len() as u64,
        };
        state.students.clear();
        state.progress.clear();
        Ok(wipe)
    }

    async fn clear_learners_with_prefix(&self, prefix: &str) -> Result<LearnerWipe> {
        let prefix = prefix.to_ascii_lowercase();
        let matches = |username: &str| username.to_ascii_lowercase().starts_with(&prefix);

        let mut state = self.state.write().await;
        let students_before = state.students.len();
        state.students.retain(|username, _| !matches(username.as_str()));
        let progress_before = state.progress.len();
        state.progress.retain(|(username, _), _| !matches(username.as_str()));

        Ok(LearnerWipe {
            students_deleted: (students_before - state.students.len()) as u64,
            progress_deleted: (progress_before - state.progress.len()) as u64,
        })
    }

    async fn clear_curriculum(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.sections.clear();
        state.problems.clear();
        Ok(())
    }

    async fn counts(&self) -> Result<CollectionCounts> {
        let state = self.state.read().await;
        Ok(CollectionCounts {
            students: state.students.len() as u64,
            progress: state.progress.len() as u64,
            problems: state.problems.len() as u64,
            sections: state.sections.len() as u64,
        })
    }
}
