use std::collections::BTreeMap;
use validator::Validate;

use crate::models::curriculum::section_id_for;
use crate::models::progress::{
    Badge, ProblemStatus, ProgressGrid, ProgressRecord, ProgressRollup, ProgressUpdate,
    StageStatus,
};
use crate::models::student::validate_username;
use crate::services::catalog::Catalog;
use crate::services::error::TutorError;
use crate::services::section_bootstrap::SectionBootstrapper;
use crate::store::{ProgressStore, StageMark};

/// Score an assessment needs for the `assessment_ace` badge.
const ACE_THRESHOLD: u32 = 80;

pub struct ProgressService<'a, S: ProgressStore + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
}

impl<'a, S: ProgressStore + ?Sized> ProgressService<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    /// Every catalog problem appears in the grid, overlaid with what the
    /// student has stored.
    pub async fn rollup(&self, username: &str) -> Result<ProgressRollup, TutorError> {
        let records = self.store.list_progress(username.trim()).await?;
        Ok(build_rollup(self.catalog, &records))
    }

    /// Applies a client-reported stage marker. Completion is never cleared.
    pub async fn mark_stage(&self, update: &ProgressUpdate) -> Result<ProgressRecord, TutorError> {
        update.validate()?;
        let username = update.username.trim();
        validate_username(username)
            .map_err(|e| TutorError::validation(format!("Validation error: {}", e)))?;

        let problem = self
            .catalog
            .problem(&update.stage)
            .ok_or_else(|| TutorError::not_found("Problem not found"))?;
        if problem.section_id != update.section {
            return Err(TutorError::validation(format!(
                "Stage {} does not belong to {}",
                problem.id, update.section
            )));
        }

        let record = self
            .store
            .mark_stage(StageMark {
                username,
                problem_id: &problem.id,
                section_id: &problem.section_id,
                complete: update.status == StageStatus::Complete,
            })
            .await?;

        tracing::info!(
            username,
            problem_id = %problem.id,
            status = ?update.status,
            "Stage marker recorded"
        );

        SectionBootstrapper::new(self.store, self.catalog)
            .after_write(problem, &record)
            .await;

        Ok(record)
    }
}

pub fn build_rollup(catalog: &Catalog, records: &[ProgressRecord]) -> ProgressRollup {
    let mut progress: ProgressGrid = BTreeMap::new();
    for problem in catalog.problems() {
        progress
            .entry(problem.section_id.clone())
            .or_default()
            .insert(problem.id.clone(), ProblemStatus::default());
    }
    for record in records {
        progress
            .entry(record.section_id.clone())
            .or_default()
            .insert(record.problem_id.clone(), ProblemStatus::from(record));
    }

    let weighted: u64 = records
        .iter()
        .filter(|record| record.completed)
        .map(|record| u64::from(record.score) * u64::from(catalog.weight(&record.problem_id)))
        .sum();
    let total_points = (weighted as f64 / 100.0).round() as u32;

    ProgressRollup {
        badges: badges(catalog, &progress),
        progress,
        total_points,
    }
}

/// Badges are awarded on the first section only.
fn badges(catalog: &Catalog, progress: &ProgressGrid) -> Vec<Badge> {
    let section_id = section_id_for(1);
    let Some(cells) = progress.get(&section_id) else {
        return Vec::new();
    };
    let status = |problem_id: &str| cells.get(problem_id).copied().unwrap_or_default();

    let mut badges = Vec::new();
    if cells.values().any(|cell| cell.completed) {
        badges.push(Badge::FirstSteps);
    }

    let practice = catalog.practice_problems(&section_id);
    if !practice.is_empty() && practice.iter().all(|p| status(&p.id).completed) {
        badges.push(Badge::PracticeMaster);
    }

    if let Some(assessment) = catalog.assessment(&section_id) {
        let cell = status(&assessment.id);
        if cell.completed && cell.score >= ACE_THRESHOLD {
            badges.push(Badge::AssessmentAce);
        }
    }

    let stages: Vec<_> = catalog.problems_in_section(&section_id).collect();
    if !stages.is_empty() && stages.iter().all(|p| status(&p.id).completed) {
        badges.push(Badge::InequalityExpert);
    }

    badges
}
