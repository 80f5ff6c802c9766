use crate::metrics::record_bootstrap;
use crate::models::{Problem, ProgressRecord, StageType};
use crate::services::catalog::Catalog;
use crate::store::ProgressStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Not a completed exam prep.
    NotApplicable,
    /// Final section; nothing follows.
    LastSection,
    Created,
    AlreadyPresent,
    Failed,
}

impl BootstrapOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapOutcome::NotApplicable => "not_applicable",
            BootstrapOutcome::LastSection => "last_section",
            BootstrapOutcome::Created => "created",
            BootstrapOutcome::AlreadyPresent => "already_present",
            BootstrapOutcome::Failed => "failed",
        }
    }
}

/// Opens the next section once a student finishes an exam prep by writing a
/// zeroed record for its first stage.
pub struct SectionBootstrapper<'a, S: ProgressStore + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
}

impl<'a, S: ProgressStore + ?Sized> SectionBootstrapper<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    /// Never fails; storage errors are logged and reported as `Failed`.
    pub async fn after_write(&self, problem: &Problem, record: &ProgressRecord) -> BootstrapOutcome {
        if problem.stage != StageType::Examprep || !record.completed {
            return BootstrapOutcome::NotApplicable;
        }

        let Some(next_section) = self.catalog.next_section(&problem.section_id) else {
            return BootstrapOutcome::LastSection;
        };
        let Some(first) = self.catalog.first_problem(&next_section.id) else {
            return BootstrapOutcome::LastSection;
        };

        let outcome = match self
            .store
            .insert_progress_if_absent(&record.username, &first.id, &next_section.id)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    username = %record.username,
                    section_id = %next_section.id,
                    "Opened next section"
                );
                BootstrapOutcome::Created
            }
            Ok(false) => BootstrapOutcome::AlreadyPresent,
            Err(err) => {
                tracing::warn!(
                    username = %record.username,
                    section_id = %next_section.id,
                    "Failed to open next section: {:#}",
                    err
                );
                BootstrapOutcome::Failed
            }
        };

        record_bootstrap(outcome.as_str());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::tests::seeded_catalog;
    use crate::services::gatekeeper::tests::BrokenStore;
    use crate::store::MemoryStore;

    fn completed(username: &str, problem: &Problem) -> ProgressRecord {
        ProgressRecord {
            completed: true,
            score: 100,
            attempts: 1,
            ..ProgressRecord::zeroed(username, &problem.id, &problem.section_id)
        }
    }

    #[tokio::test]
    async fn completed_examprep_opens_next_section_once() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let bootstrapper = SectionBootstrapper::new(&store, &catalog);
        let examprep = catalog.problem("examprep1").unwrap();
        let record = completed("alice", examprep);

        assert_eq!(
            bootstrapper.after_write(examprep, &record).await,
            BootstrapOutcome::Created
        );
        assert_eq!(
            bootstrapper.after_write(examprep, &record).await,
            BootstrapOutcome::AlreadyPresent
        );

        let opened = store.find_progress("alice", "prep2").await.unwrap().unwrap();
        assert_eq!(opened, ProgressRecord::zeroed("alice", "prep2", "section2"));
    }

    #[tokio::test]
    async fn existing_progress_is_left_alone() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let bootstrapper = SectionBootstrapper::new(&store, &catalog);
        let prep2 = catalog.problem("prep2").unwrap();
        let examprep = catalog.problem("examprep1").unwrap();

        store
            .apply_attempt(crate::store::AttemptWrite {
                username: "alice",
                problem_id: "prep2",
                section_id: &prep2.section_id,
                correct: true,
                candidate_score: 100,
                hints_used: 0,
                at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        bootstrapper
            .after_write(examprep, &completed("alice", examprep))
            .await;

        let stored = store.find_progress("alice", "prep2").await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.score, 100);
    }

    #[tokio::test]
    async fn only_completed_examprep_triggers() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let bootstrapper = SectionBootstrapper::new(&store, &catalog);

        let examprep = catalog.problem("examprep1").unwrap();
        let unfinished = ProgressRecord::zeroed("alice", "examprep1", "section1");
        assert_eq!(
            bootstrapper.after_write(examprep, &unfinished).await,
            BootstrapOutcome::NotApplicable
        );

        let assessment = catalog.problem("assessment1").unwrap();
        assert_eq!(
            bootstrapper
                .after_write(assessment, &completed("alice", assessment))
                .await,
            BootstrapOutcome::NotApplicable
        );
        assert!(store.list_progress("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn final_section_has_no_successor() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let bootstrapper = SectionBootstrapper::new(&store, &catalog);
        let examprep = catalog.problem("examprep5").unwrap();

        assert_eq!(
            bootstrapper
                .after_write(examprep, &completed("alice", examprep))
                .await,
            BootstrapOutcome::LastSection
        );
    }

    #[tokio::test]
    async fn storage_failure_is_swallowed() {
        let catalog = seeded_catalog();
        let bootstrapper = SectionBootstrapper::new(&BrokenStore, &catalog);
        let examprep = catalog.problem("examprep3").unwrap();

        assert_eq!(
            bootstrapper
                .after_write(examprep, &completed("alice", examprep))
                .await,
            BootstrapOutcome::Failed
        );
    }
}
