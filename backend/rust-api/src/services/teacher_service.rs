use std::collections::{BTreeMap, HashMap};

use crate::models::progress::{ProblemStatus, ProgressRecord};
use crate::models::teacher::{Dashboard, StudentReport};
use crate::models::{ClassName, Student};
use crate::services::catalog::Catalog;
use crate::services::error::TutorError;
use crate::store::{ProgressStore, StudentStore};

/// `all` or an empty value means no filter.
pub fn parse_class_filter(raw: Option<&str>) -> Result<Option<ClassName>, TutorError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(TutorError::Validation),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct TeacherService<'a, S: StudentStore + ProgressStore + ?Sized> {
    store: &'a S,
    catalog: &'a Catalog,
}

impl<'a, S: StudentStore + ProgressStore + ?Sized> TeacherService<'a, S> {
    pub fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    pub async fn student_reports(
        &self,
        class_filter: Option<ClassName>,
    ) -> Result<Vec<StudentReport>, TutorError> {
        let mut students = self.store.list_students(class_filter).await?;
        students.sort_by(|a, b| a.username.cmp(&b.username));

        let usernames: Vec<String> = students.iter().map(|s| s.username.clone()).collect();
        let mut by_student: HashMap<String, Vec<ProgressRecord>> = HashMap::new();
        for record in self.store.list_progress_for(&usernames).await? {
            by_student
                .entry(record.username.clone())
                .or_default()
                .push(record);
        }

        Ok(students
            .into_iter()
            .map(|student| {
                let records = by_student.remove(&student.username).unwrap_or_default();
                self.report(student, &records)
            })
            .collect())
    }

    pub async fn dashboard(&self, class_filter: Option<ClassName>) -> Result<Dashboard, TutorError> {
        let students = self.student_reports(class_filter).await?;

        let mut students_per_class: BTreeMap<ClassName, usize> = ClassName::ALL
            .into_iter()
            .filter(|class| class_filter.is_none_or(|wanted| wanted == *class))
            .map(|class| (class, 0))
            .collect();
        let mut problem_completion: BTreeMap<String, usize> = self
            .catalog
            .problems()
            .iter()
            .map(|problem| (problem.id.clone(), 0))
            .collect();

        for report in &students {
            *students_per_class.entry(report.class_name).or_default() += 1;
            for (problem_id, status) in &report.problems {
                if status.completed {
                    *problem_completion.entry(problem_id.clone()).or_default() += 1;
                }
            }
        }

        let total_students = students.len();
        let mean = |value: fn(&StudentReport) -> f64| {
            if total_students == 0 {
                0.0
            } else {
                round1(students.iter().map(value).sum::<f64>() / total_students as f64)
            }
        };

        Ok(Dashboard {
            class_filter,
            total_students,
            active_students: students.iter().filter(|s| s.total_attempts > 0).count(),
            average_progress: mean(|s| s.progress_percentage),
            average_score: mean(|s| s.weighted_score),
            total_attempts: students
                .iter()
                .fold(0u32, |sum, s| sum.saturating_add(s.total_attempts)),
            students_per_class,
            problem_completion,
            students,
        })
    }

    fn report(&self, student: Student, records: &[ProgressRecord]) -> StudentReport {
        let total_problems = self.catalog.problems().len() as u32;
        let completed: Vec<&ProgressRecord> = records.iter().filter(|r| r.completed).collect();
        let completed_problems = completed.len() as u32;

        let (weighted, weights) = completed.iter().fold((0u64, 0u64), |(sum, total), record| {
            let weight = u64::from(self.catalog.weight(&record.problem_id));
            (sum + u64::from(record.score) * weight, total + weight)
        });
        let weighted_score = if weights == 0 {
            0.0
        } else {
            round1(weighted as f64 / weights as f64)
        };
        let progress_percentage = if total_problems == 0 {
            0.0
        } else {
            round1(f64::from(completed_problems) / f64::from(total_problems) * 100.0)
        };

        StudentReport {
            username: student.username,
            class_name: student.class_name,
            created_at: student.created_at,
            last_login_at: student.last_login_at,
            completed_problems,
            total_problems,
            progress_percentage,
            weighted_score,
            total_attempts: records
                .iter()
                .fold(0u32, |sum, r| sum.saturating_add(r.attempts)),
            problems: records
                .iter()
                .map(|r| (r.problem_id.clone(), ProblemStatus::from(r)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::tests::seeded_catalog;
    use crate::store::{AttemptWrite, MemoryStore};
    use chrono::Utc;

    async fn login(store: &MemoryStore, username: &str, class_name: ClassName) {
        store
            .record_login(username, class_name, Utc::now())
            .await
            .unwrap();
    }

    async fn answer(store: &MemoryStore, catalog: &Catalog, username: &str, id: &str, score: u32) {
        let problem = catalog.problem(id).unwrap();
        store
            .apply_attempt(AttemptWrite {
                username,
                problem_id: id,
                section_id: &problem.section_id,
                correct: score > 0,
                candidate_score: score,
                hints_used: 0,
                at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn class_filter_parsing() {
        assert_eq!(parse_class_filter(None).unwrap(), None);
        assert_eq!(parse_class_filter(Some("")).unwrap(), None);
        assert_eq!(parse_class_filter(Some("ALL")).unwrap(), None);
        assert_eq!(
            parse_class_filter(Some("gr9-b")).unwrap(),
            Some(ClassName::Gr9B)
        );
        assert!(parse_class_filter(Some("GR10-A")).is_err());
    }

    #[tokio::test]
    async fn report_aggregates_weighted_score() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        login(&store, "alice", ClassName::Gr9A).await;
        // prep1 weight 10, practice1_1 weight 15
        answer(&store, &catalog, "alice", "prep1", 100).await;
        answer(&store, &catalog, "alice", "practice1_1", 60).await;
        answer(&store, &catalog, "alice", "practice1_2", 0).await;

        let reports = TeacherService::new(&store, &catalog)
            .student_reports(None)
            .await
            .unwrap();
        let alice = &reports[0];

        assert_eq!(alice.completed_problems, 2);
        assert_eq!(alice.total_problems, 30);
        assert_eq!(alice.progress_percentage, 6.7);
        // (100*10 + 60*15) / 25
        assert_eq!(alice.weighted_score, 76.0);
        assert_eq!(alice.total_attempts, 3);
        assert_eq!(alice.problems.len(), 3);
    }

    #[tokio::test]
    async fn explanation_only_progress_scores_zero() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        login(&store, "bob", ClassName::Gr9B).await;
        answer(&store, &catalog, "bob", "explanation1", 100).await;

        let reports = TeacherService::new(&store, &catalog)
            .student_reports(None)
            .await
            .unwrap();
        assert_eq!(reports[0].weighted_score, 0.0);
        assert_eq!(reports[0].completed_problems, 1);
    }

    #[tokio::test]
    async fn dashboard_respects_class_filter() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        login(&store, "alice", ClassName::Gr9A).await;
        login(&store, "bob", ClassName::Gr9B).await;
        login(&store, "carol", ClassName::Gr9A).await;
        answer(&store, &catalog, "alice", "prep1", 100).await;
        answer(&store, &catalog, "bob", "prep1", 100).await;

        let service = TeacherService::new(&store, &catalog);

        let all = service.dashboard(None).await.unwrap();
        assert_eq!(all.total_students, 3);
        assert_eq!(all.active_students, 2);
        assert_eq!(all.students_per_class[&ClassName::Gr9A], 2);
        assert_eq!(all.students_per_class[&ClassName::Gr9D], 0);
        assert_eq!(all.problem_completion["prep1"], 2);
        assert_eq!(all.problem_completion["examprep5"], 0);

        let class_a = service.dashboard(Some(ClassName::Gr9A)).await.unwrap();
        assert_eq!(class_a.total_students, 2);
        assert_eq!(class_a.active_students, 1);
        assert_eq!(class_a.total_attempts, 1);
        assert_eq!(class_a.students_per_class.len(), 1);
        assert_eq!(class_a.average_score, 50.0);
        let names: Vec<&str> = class_a.students.iter().map(|s| s.username.as_str()).collect();
        assert_eq!(names, ["alice", "carol"]);
    }

    #[tokio::test]
    async fn empty_dashboard_has_zero_averages() {
        let store = MemoryStore::new();
        let catalog = seeded_catalog();
        let dashboard = TeacherService::new(&store, &catalog)
            .dashboard(None)
            .await
            .unwrap();
        assert_eq!(dashboard.total_students, 0);
        assert_eq!(dashboard.average_progress, 0.0);
        assert_eq!(dashboard.average_score, 0.0);
    }
}
