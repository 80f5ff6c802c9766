use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use std::time::Instant;

use super::{
    AttemptWrite, CollectionCounts, CurriculumStore, LearnerWipe, MaintenanceStore, ProgressStore,
    StageMark, StudentStore, PROBLEMS, PROGRESS, SECTIONS, STUDENTS,
};
use crate::{
    metrics::observe_db_operation,
    models::{ClassName, Problem, ProgressRecord, Section, Student},
    utils::retry::{retry_async_when, RetryConfig},
};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(mongo_url: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongo_url)
            .await
            .context("Failed to create MongoDB client")?;
        let store = Self::new(client, db_name);

        retry_async_when(RetryConfig::startup(), |_| true, || async { store.ping().await })
            .await
            .context("MongoDB did not answer ping")?;
        store.ensure_indexes().await?;

        Ok(store)
    }

    pub fn new(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self { client, db }
    }

    fn students(&self) -> Collection<Student> {
        self.db.collection(STUDENTS)
    }

    fn progress(&self) -> Collection<ProgressRecord> {
        self.db.collection(PROGRESS)
    }

    fn problems(&self) -> Collection<Problem> {
        self.db.collection(PROBLEMS)
    }

    fn sections(&self) -> Collection<Section> {
        self.db.collection(SECTIONS)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.students()
            .create_index(IndexModel::builder().keys(doc! { "username": 1 }).options(unique()).build())
            .await
            .context("Failed to create students index")?;
        self.progress()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1, "problem_id": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .context("Failed to create progress index")?;
        self.problems()
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).options(unique()).build())
            .await
            .context("Failed to create problems index")?;
        self.sections()
            .create_index(IndexModel::builder().keys(doc! { "id": 1 }).options(unique()).build())
            .await
            .context("Failed to create sections index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    /// Upsert on `progress` keyed by (username, problem_id); retried when two
    /// concurrent upserts race on the unique index.
    async fn upsert_progress(
        &self,
        operation: &'static str,
        username: &str,
        problem_id: &str,
        update: Document,
    ) -> Result<ProgressRecord> {
        let started = Instant::now();
        let filter = doc! { "username": username, "problem_id": problem_id };
        let collection = self.progress();

        let result = retry_async_when(RetryConfig::default(), is_duplicate_key, || async {
            collection
                .find_one_and_update(filter.clone(), update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
        })
        .await;
        observe_db_operation(operation, PROGRESS, started, result.is_ok());

        result
            .with_context(|| format!("Failed to {} for {}/{}", operation, username, problem_id))?
            .with_context(|| format!("Upsert returned no document for {}/{}", username, problem_id))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn bson_time(at: &DateTime<Utc>) -> Result<mongodb::bson::Bson> {
    to_bson(at).context("Failed to encode timestamp")
}

#[async_trait]
impl StudentStore for MongoStore {
    async fn record_login(
        &self,
        username: &str,
        class_name: ClassName,
        at: DateTime<Utc>,
    ) -> Result<(Student, bool)> {
        let started = Instant::now();
        let now = bson_time(&at)?;
        let update = doc! {
            "$set": { "last_login_at": now.clone() },
            "$setOnInsert": { "class_name": class_name.as_str(), "created_at": now },
        };
        let collection = self.students();

        let result = retry_async_when(RetryConfig::default(), is_duplicate_key, || async {
            collection
                .find_one_and_update(doc! { "username": username }, update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
        })
        .await;
        observe_db_operation("record_login", STUDENTS, started, result.is_ok());

        let student = result
            .context("Failed to upsert student")?
            .context("Student upsert returned no document")?;
        let created = student.created_at == student.last_login_at;
        Ok((student, created))
    }

    async fn find_student(&self, username: &str) -> Result<Option<Student>> {
        self.students()
            .find_one(doc! { "username": username })
            .await
            .context("Failed to query students")
    }

    async fn list_students(&self, class_filter: Option<ClassName>) -> Result<Vec<Student>> {
        let filter = match class_filter {
            Some(class) => doc! { "class_name": class.as_str() },
            None => doc! {},
        };
        let cursor = self
            .students()
            .find(filter)
            .sort(doc! { "username": 1 })
            .await
            .context("Failed to query students")?;
        cursor
            .try_collect()
            .await
            .context("Student cursor error")
    }
}

#[async_trait]
impl ProgressStore for MongoStore {
    async fn find_progress(
        &self,
        username: &str,
        problem_id: &str,
    ) -> Result<Option<ProgressRecord>> {
        let started = Instant::now();
        let result = self
            .progress()
            .find_one(doc! { "username": username, "problem_id": problem_id })
            .await;
        observe_db_operation("find_progress", PROGRESS, started, result.is_ok());
        result.context("Failed to query progress")
    }

    async fn list_progress(&self, username: &str) -> Result<Vec<ProgressRecord>> {
        let cursor = self
            .progress()
            .find(doc! { "username": username })
            .await
            .context("Failed to query progress")?;
        cursor
            .try_collect()
            .await
            .context("Progress cursor error")
    }

    async fn list_progress_for(&self, usernames: &[String]) -> Result<Vec<ProgressRecord>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .progress()
            .find(doc! { "username": { "$in": usernames.to_vec() } })
            .await
            .context("Failed to query progress")?;
        cursor
            .try_collect()
            .await
            .context("Progress cursor error")
    }

    async fn apply_attempt(&self, write: AttemptWrite<'_>) -> Result<ProgressRecord> {
        let mut set = doc! {
            "section_id": write.section_id,
            "hints_used": write.hints_used as i64,
            "last_attempt_at": bson_time(&write.at)?,
        };
        let update = if write.correct {
            set.insert("completed", true);
            doc! {
                "$set": set,
                "$max": { "score": write.candidate_score as i64 },
                "$inc": { "attempts": 1_i64 },
            }
        } else {
            doc! {
                "$set": set,
                "$setOnInsert": { "completed": false, "score": 0_i64 },
                "$inc": { "attempts": 1_i64 },
            }
        };

        self.upsert_progress("apply_attempt", write.username, write.problem_id, update)
            .await
    }

    async fn mark_stage(&self, mark: StageMark<'_>) -> Result<ProgressRecord> {
        let update = if mark.complete {
            doc! {
                "$set": { "section_id": mark.section_id, "completed": true },
                "$setOnInsert": { "score": 0_i64, "attempts": 0_i64, "hints_used": 0_i64 },
            }
        } else {
            doc! {
                "$set": { "section_id": mark.section_id },
                "$setOnInsert": {
                    "completed": false,
                    "score": 0_i64,
                    "attempts": 0_i64,
                    "hints_used": 0_i64,
                },
            }
        };

        self.upsert_progress("mark_stage", mark.username, mark.problem_id, update)
            .await
    }

    async fn insert_progress_if_absent(
        &self,
        username: &str,
        problem_id: &str,
        section_id: &str,
    ) -> Result<bool> {
        let started = Instant::now();
        let result = self
            .progress()
            .update_one(
                doc! { "username": username, "problem_id": problem_id },
                doc! {
                    "$setOnInsert": {
                        "section_id": section_id,
                        "completed": false,
                        "score": 0_i64,
                        "attempts": 0_i64,
                        "hints_used": 0_i64,
                    }
                },
            )
            .upsert(true)
            .await;
        observe_db_operation("insert_if_absent", PROGRESS, started, result.is_ok());

        match result {
            Ok(update) => Ok(update.upserted_id.is_some()),
            // Lost the race to a concurrent insert; the record exists.
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err).context("Failed to insert progress"),
        }
    }
}

#[async_trait]
impl CurriculumStore for MongoStore {
    async fn section_exists(&self, section_id: &str) -> Result<bool> {
        let found = self
            .sections()
            .find_one(doc! { "id": section_id })
            .await
            .context("Failed to query sections")?;
        Ok(found.is_some())
    }

    async fn insert_curriculum(&self, sections: &[Section], problems: &[Problem]) -> Result<()> {
        self.sections()
            .insert_many(sections)
            .await
            .context("Failed to insert sections")?;
        self.problems()
            .insert_many(problems)
            .await
            .context("Failed to insert problems")?;
        Ok(())
    }

    async fn load_sections(&self) -> Result<Vec<Section>> {
        let cursor = self
            .sections()
            .find(doc! {})
            .sort(doc! { "ordinal": 1 })
            .await
            .context("Failed to query sections")?;
        cursor
            .try_collect()
            .await
            .context("Section cursor error")
    }

    async fn load_problems(&self) -> Result<Vec<Problem>> {
        let cursor = self
            .problems()
            .find(doc! {})
            .sort(doc! { "section_id": 1, "position": 1 })
            .await
            .context("Failed to query problems")?;
        cursor
            .try_collect()
            .await
            .context("Problem cursor error")
    }
}

#[async_trait]
impl MaintenanceStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn clear_learners(&self) -> Result<LearnerWipe> {
        let students = self
            .students()
            .delete_many(doc! {})
            .await
            .context("Failed to clear students")?;
        let progress = self
            .progress()
            .delete_many(doc! {})
            .await
            .context("Failed to clear progress")?;

        Ok(LearnerWipe {
            students_deleted: students.deleted_count,
            progress_deleted: progress.deleted_count,
        })
    }

    async fn clear_learners_with_prefix(&self, prefix: &str) -> Result<LearnerWipe> {
        let pattern = format!("^{}", regex::escape(prefix));
        let filter = doc! { "username": { "$regex": pattern, "$options": "i" } };

        let students = self
            .students()
            .delete_many(filter.clone())
            .await
            .context("Failed to clear test students")?;
        let progress = self
            .progress()
            .delete_many(filter)
            .await
            .context("Failed to clear test progress")?;

        Ok(LearnerWipe {
            students_deleted: students.deleted_count,
            progress_deleted: progress.deleted_count,
        })
    }

    async fn clear_curriculum(&self) -> Result<()> {
        self.problems()
            .delete_many(doc! {})
            .await
            .context("Failed to clear problems")?;
        self.sections()
            .delete_many(doc! {})
            .await
            .context("Failed to clear sections")?;
        Ok(())
    }

    async fn counts(&self) -> Result<CollectionCounts> {
        Ok(CollectionCounts {
            students: self
                .students()
                .count_documents(doc! {})
                .await
                .context("Failed to count students")?,
            progress: self
                .progress()
                .count_documents(doc! {})
                .await
                .context("Failed to count progress")?,
            problems: self
                .problems()
                .count_documents(doc! {})
                .await
                .context("Failed to count problems")?,
            sections: self
                .sections()
                .count_documents(doc! {})
                .await
                .context("Failed to count sections")?,
        })
    }

    async fn shutdown(&self) {
        tracing::info!("Closing MongoDB client");
        self.client.clone().shutdown().await;
    }
}
