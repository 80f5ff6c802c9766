use crate::config::Config;
use crate::services::curriculum_seed;
use crate::services::error::TutorError;
use crate::store::{CollectionCounts, CurriculumStore, LearnerWipe, MaintenanceStore};

/// Usernames starting with this (any case) are test accounts.
pub const TEST_ACCOUNT_PREFIX: &str = "test";

pub struct AdminService<'a, S: CurriculumStore + MaintenanceStore + ?Sized> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: CurriculumStore + MaintenanceStore + ?Sized> AdminService<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    pub async fn clear_all_data(&self) -> Result<LearnerWipe, TutorError> {
        let wipe = self.store.clear_learners().await?;
        tracing::warn!(
            students = wipe.students_deleted,
            progress = wipe.progress_deleted,
            "Cleared all learner data"
        );
        Ok(wipe)
    }

    pub async fn clear_test_data(&self, admin_key: Option<&str>) -> Result<LearnerWipe, TutorError> {
        if admin_key != Some(self.config.admin_key.as_str()) {
            return Err(TutorError::Unauthorized("Invalid admin key".to_string()));
        }

        let wipe = self
            .store
            .clear_learners_with_prefix(TEST_ACCOUNT_PREFIX)
            .await?;
        tracing::info!(
            students = wipe.students_deleted,
            progress = wipe.progress_deleted,
            "Cleared test accounts"
        );
        Ok(wipe)
    }

    pub async fn stats(&self) -> Result<CollectionCounts, TutorError> {
        Ok(self.store.counts().await?)
    }

    /// Drops every collection's contents and writes the curriculum again.
    pub async fn reset_db(&self) -> Result<CollectionCounts, TutorError> {
        self.store.clear_learners().await?;
        self.store.clear_curriculum().await?;
        curriculum_seed::write_seed(self.store, self.config).await?;
        tracing::warn!("Database reset and reseeded");
        self.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassName;
    use crate::store::{MemoryStore, ProgressStore, StageMark, StudentStore};
    use chrono::Utc;

    async fn populate(store: &MemoryStore) {
        curriculum_seed::ensure_seeded(store, &Config::default())
            .await
            .unwrap();
        for username in ["alice", "TestUser", "tester_2"] {
            store
                .record_login(username, ClassName::Gr9A, Utc::now())
                .await
                .unwrap();
            store
                .mark_stage(StageMark {
                    username,
                    problem_id: "prep1",
                    section_id: "section1",
                    complete: true,
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn clear_test_data_requires_admin_key() {
        let store = MemoryStore::new();
        let config = Config::default();
        populate(&store).await;
        let service = AdminService::new(&store, &config);

        for key in [None, Some("wrong")] {
            let err = service.clear_test_data(key).await.unwrap_err();
            assert!(matches!(err, TutorError::Unauthorized(_)));
        }
        assert_eq!(service.stats().await.unwrap().students, 3);
    }

    #[tokio::test]
    async fn clear_test_data_removes_prefixed_accounts_only() {
        let store = MemoryStore::new();
        let config = Config::default();
        populate(&store).await;

        let wipe = AdminService::new(&store, &config)
            .clear_test_data(Some("admin123"))
            .await
            .unwrap();
        assert_eq!(wipe.students_deleted, 2);
        assert_eq!(wipe.progress_deleted, 2);
        assert!(store.find_student("alice").await.unwrap().is_some());
        assert_eq!(store.list_progress("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_all_keeps_curriculum() {
        let store = MemoryStore::new();
        let config = Config::default();
        populate(&store).await;
        let service = AdminService::new(&store, &config);

        service.clear_all_data().await.unwrap();
        let counts = service.stats().await.unwrap();
        assert_eq!(counts.students, 0);
        assert_eq!(counts.progress, 0);
        assert_eq!(counts.problems, 30);
        assert_eq!(counts.sections, 5);
    }

    #[tokio::test]
    async fn reset_reseeds_curriculum() {
        let store = MemoryStore::new();
        let config = Config::default();
        populate(&store).await;

        let counts = AdminService::new(&store, &config).reset_db().await.unwrap();
        assert_eq!(
            counts,
            CollectionCounts {
                students: 0,
                progress: 0,
                problems: 30,
                sections: 5,
            }
        );
    }
}
