use chrono::Utc;
use validator::Validate;

use crate::config::GateFailurePolicy;
use crate::metrics::record_attempt;
use crate::models::progress::{AttemptResponse, ProblemAttempt};
use crate::models::student::validate_username;
use crate::services::answer_normalizer::matches_final_answer;
use crate::services::catalog::Catalog;
use crate::services::error::TutorError;
use crate::services::gatekeeper::Gatekeeper;
use crate::services::scorer;
use crate::services::section_bootstrap::SectionBootstrapper;
use crate::store::{AttemptWrite, ProgressStore};

/// Grades submissions and records them.
pub struct AttemptService<'a, S: ProgressStore + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
    gate_policy: GateFailurePolicy,
}

impl<'a, S: ProgressStore + ?Sized> AttemptService<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog, gate_policy: GateFailurePolicy) -> Self {
        Self {
            store,
            catalog,
            gate_policy,
        }
    }

    pub async fn submit(
        &self,
        username: &str,
        attempt: &ProblemAttempt,
    ) -> Result<AttemptResponse, TutorError> {
        let username = username.trim();
        validate_username(username)
            .map_err(|e| TutorError::validation(format!("Validation error: {}", e)))?;
        attempt.validate()?;

        Gatekeeper::new(self.store, self.catalog, self.gate_policy)
            .ensure_allowed(Some(username), &attempt.problem_id)
            .await?;

        let problem = self
            .catalog
            .problem(&attempt.problem_id)
            .ok_or_else(|| TutorError::not_found("Problem not found"))?;

        let previous_attempts = self
            .store
            .find_progress(username, &problem.id)
            .await?
            .map_or(0, |record| record.attempts);
        let attempts = previous_attempts.saturating_add(1);

        let correct = matches_final_answer(problem, &attempt.answer);
        let candidate_score = scorer::score(attempts, attempt.hints_used, correct);

        let record = self
            .store
            .apply_attempt(AttemptWrite {
                username,
                problem_id: &problem.id,
                section_id: &problem.section_id,
                correct,
                candidate_score,
                hints_used: attempt.hints_used,
                at: Utc::now(),
            })
            .await?;

        record_attempt(problem.stage.as_str(), correct);
        tracing::info!(
            username,
            problem_id = %problem.id,
            correct,
            score = candidate_score,
            attempts = record.attempts,
            "Attempt graded"
        );

        SectionBootstrapper::new(self.store, self.catalog)
            .after_write(problem, &record)
            .await;

        Ok(AttemptResponse {
            correct,
            score: candidate_score,
            attempts: record.attempts,
            progress: record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::tests::seeded_catalog;
    use crate::services::error::DenialReason;
    use crate::store::MemoryStore;

    fn attempt(problem_id: &str, answer: &str, hints_used: u32) -> ProblemAttempt {
        ProblemAttempt {
            problem_id: problem_id.to_string(),
            answer: answer.to_string(),
            hints_used,
        }
    }

    #[tokio::test]
    async fn correct_then_retry_keeps_best_score() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let first = service
            .submit("alice", &attempt("prep1", "x > 15", 0))
            .await
            .unwrap();
        assert!(first.correct);
        assert_eq!(first.score, 100);
        assert_eq!(first.attempts, 1);
        assert!(first.progress.completed);

        let second = service
            .submit("alice", &attempt("prep1", "س > ١٥", 2))
            .await
            .unwrap();
        assert!(second.correct);
        assert_eq!(second.score, 60);
        assert_eq!(second.attempts, 2);
        assert_eq!(second.progress.score, 100);
        assert_eq!(second.progress.hints_used, 2);
    }

    #[tokio::test]
    async fn wrong_answer_never_regresses() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        service
            .submit("bob", &attempt("practice1_1", "y < -5", 1))
            .await
            .unwrap();
        let wrong = service
            .submit("bob", &attempt("practice1_1", "y < 5", 0))
            .await
            .unwrap();

        assert!(!wrong.correct);
        assert_eq!(wrong.score, 0);
        assert_eq!(wrong.attempts, 2);
        assert!(wrong.progress.completed);
        assert_eq!(wrong.progress.score, 90);
    }

    #[tokio::test]
    async fn first_wrong_attempt_creates_incomplete_record() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let response = service
            .submit("carol", &attempt("prep3", "x > 5", 0))
            .await
            .unwrap();
        assert!(!response.correct);
        assert!(!response.progress.completed);
        assert_eq!(response.progress.score, 0);
        assert_eq!(response.progress.attempts, 1);
        assert_eq!(response.progress.section_id, "section3");
    }

    #[tokio::test]
    async fn late_correct_answer_scores_with_retry_penalty() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        service
            .submit("dave", &attempt("prep2", "x > 5", 0))
            .await
            .unwrap();
        let response = service
            .submit("dave", &attempt("prep2", "x < 5", 0))
            .await
            .unwrap();
        assert_eq!(response.score, 80);
        assert_eq!(response.progress.score, 80);
    }

    #[tokio::test]
    async fn locked_stage_writes_nothing() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let err = service
            .submit("erin", &attempt("assessment1", "k ≥ 11", 0))
            .await
            .unwrap_err();
        match err {
            TutorError::Locked(denial) => {
                assert_eq!(denial.reason, DenialReason::PracticeIncomplete)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.list_progress("erin").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_problem_is_not_found() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let err = service
            .submit("frank", &attempt("prep9", "x > 1", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::NotFound(_)));
        assert!(store.list_progress("frank").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_username_is_rejected() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let err = service
            .submit("bad name!", &attempt("prep1", "x > 15", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
    }

    #[tokio::test]
    async fn finishing_examprep_opens_next_section() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        for (problem_id, answer) in [
            ("practice1_1", "y < -5"),
            ("practice1_2", "d ≥ 32"),
            ("assessment1", "k ≥ 11"),
            ("examprep1", "m ≥ 70"),
        ] {
            let response = service
                .submit("grace", &attempt(problem_id, answer, 0))
                .await
                .unwrap();
            assert!(response.correct, "{problem_id}");
        }

        let opened = store.find_progress("grace", "prep2").await.unwrap().unwrap();
        assert!(!opened.completed);
        assert_eq!(opened.attempts, 0);
        assert_eq!(opened.section_id, "section2");
    }

    #[tokio::test]
    async fn concurrent_submissions_count_every_attempt() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let service = AttemptService::new(&store, &catalog, GateFailurePolicy::Open);

        let submissions = (0..8).map(|i| {
            let answer = if i % 2 == 0 { "x > 15" } else { "x > 14" };
            let body = attempt("prep1", answer, 0);
            let service = &service;
            async move { service.submit("henry", &body).await }
        });
        let results = futures::future::join_all(submissions).await;
        assert!(results.iter().all(Result::is_ok));

        let stored = store.find_progress("henry", "prep1").await.unwrap().unwrap();
        assert_eq!(stored.attempts, 8);
        assert!(stored.completed);
    }
}
