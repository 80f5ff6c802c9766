//! Stage access control.
//!
//! Assessments open once the section's practice pair is completed; the exam
//! prep opens once the assessment is completed as well. Everything else is
//! always open.

use std::collections::HashSet;

use crate::config::GateFailurePolicy;
use crate::metrics::record_gate_denial;
use crate::models::{Problem, StageType};
use crate::services::catalog::Catalog;
use crate::services::error::{DenialReason, GateDenial, TutorError};
use crate::store::ProgressStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny(GateDenial),
}

pub struct Gatekeeper<'a, S: ProgressStore + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
    policy: GateFailurePolicy,
}

impl<'a, S: ProgressStore + ?Sized> Gatekeeper<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog, policy: GateFailurePolicy) -> Self {
        Self {
            store,
            catalog,
            policy,
        }
    }

    /// Decides whether `username` may read or attempt `problem_id`.
    /// Unknown problems are let through; the caller reports them.
    pub async fn check(
        &self,
        username: Option<&str>,
        problem_id: &str,
    ) -> Result<GateDecision, TutorError> {
        let Some(problem) = self.catalog.problem(problem_id) else {
            return Ok(GateDecision::Allow);
        };
        if !problem.stage.is_gated() {
            return Ok(GateDecision::Allow);
        }

        let username = match username.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Ok(self.deny(
                    DenialReason::AuthenticationRequired,
                    "Please log in to access this stage".to_string(),
                ))
            }
        };

        let completed = match self.completed_problems(username).await {
            Ok(completed) => completed,
            Err(err) => return self.on_store_failure(username, problem, err),
        };

        Ok(self.evaluate(problem, &completed))
    }

    /// Convenience for callers that only care about the denial.
    pub async fn ensure_allowed(
        &self,
        username: Option<&str>,
        problem_id: &str,
    ) -> Result<(), TutorError> {
        match self.check(username, problem_id).await? {
            GateDecision::Allow => Ok(()),
            GateDecision::Deny(denial) => Err(TutorError::Locked(denial)),
        }
    }

    fn evaluate(&self, problem: &Problem, completed: &HashSet<String>) -> GateDecision {
        let section_id = problem.section_id.as_str();
        let ordinal = self
            .catalog
            .section(section_id)
            .map_or(0, |section| section.ordinal);

        let practice_done = self
            .catalog
            .practice_problems(section_id)
            .iter()
            .all(|practice| completed.contains(&practice.id));
        if !practice_done {
            return self.deny(
                DenialReason::PracticeIncomplete,
                format!(
                    "Complete both practice problems in section {} before the assessment",
                    ordinal
                ),
            );
        }

        if problem.stage == StageType::Examprep {
            let assessment_done = self
                .catalog
                .assessment(section_id)
                .is_some_and(|assessment| completed.contains(&assessment.id));
            if !assessment_done {
                return self.deny(
                    DenialReason::AssessmentIncomplete,
                    format!(
                        "Complete the assessment in section {} before the exam preparation",
                        ordinal
                    ),
                );
            }
        }

        GateDecision::Allow
    }

    async fn completed_problems(&self, username: &str) -> anyhow::Result<HashSet<String>> {
        let records = self.store.list_progress(username).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.completed)
            .map(|record| record.problem_id)
            .collect())
    }

    fn on_store_failure(
        &self,
        username: &str,
        problem: &Problem,
        err: anyhow::Error,
    ) -> Result<GateDecision, TutorError> {
        match self.policy {
            GateFailurePolicy::Open => {
                tracing::warn!(
                    username,
                    problem_id = %problem.id,
                    "Progress lookup failed, allowing access: {:#}",
                    err
                );
                Ok(GateDecision::Allow)
            }
            GateFailurePolicy::Closed => {
                tracing::error!(
                    username,
                    problem_id = %problem.id,
                    "Progress lookup failed, refusing access: {:#}",
                    err
                );
                Err(TutorError::Unavailable)
            }
        }
    }

    fn deny(&self, reason: DenialReason, message: String) -> GateDecision {
        record_gate_denial(reason.as_str());
        tracing::debug!(reason = reason.as_str(), "Stage access denied");
        GateDecision::Deny(GateDenial { reason, message })
    }
}
