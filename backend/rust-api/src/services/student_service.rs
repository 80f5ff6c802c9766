use chrono::Utc;
use validator::Validate;

use crate::metrics::record_login;
use crate::models::student::{StudentCreate, TeacherLogin, TeacherLoginResponse};
use crate::models::Student;
use crate::services::error::TutorError;
use crate::store::StudentStore;

pub struct StudentService<'a, S: StudentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StudentStore + ?Sized> StudentService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates the student on first login; afterwards only `last_login_at` moves.
    pub async fn login(&self, request: &StudentCreate) -> Result<Student, TutorError> {
        request.validate()?;
        let username = request.username.trim();

        let (student, created) = self
            .store
            .record_login(username, request.class_name, Utc::now())
            .await?;

        record_login(created);
        if created {
            tracing::info!(username, class_name = %student.class_name, "Student registered");
        } else {
            tracing::debug!(username, "Student logged in");
        }

        Ok(student)
    }
}

/// Checks the shared teacher access code.
pub fn teacher_login(
    request: &TeacherLogin,
    access_code: &str,
) -> Result<TeacherLoginResponse, TutorError> {
    request.validate()?;
    if request.access_code != access_code {
        tracing::warn!("Teacher login rejected");
        return Err(TutorError::Unauthorized("Invalid access code".to_string()));
    }

    Ok(TeacherLoginResponse {
        role: "teacher",
        message: "Teacher login successful".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassName;
    use crate::store::MemoryStore;

    fn create(username: &str, class_name: ClassName) -> StudentCreate {
        StudentCreate {
            username: username.to_string(),
            class_name,
        }
    }

    #[tokio::test]
    async fn second_login_keeps_identity() {
        let store = MemoryStore::new();
        let service = StudentService::new(&store);

        let first = service.login(&create("alice", ClassName::Gr9A)).await.unwrap();
        let second = service.login(&create("alice", ClassName::Gr9C)).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.class_name, ClassName::Gr9A);
        assert!(second.last_login_at >= first.last_login_at);
        assert_eq!(store.list_students(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn username_is_trimmed() {
        let store = MemoryStore::new();
        let service = StudentService::new(&store);

        let student = service.login(&create("  سارة ", ClassName::Gr9B)).await.unwrap();
        assert_eq!(student.username, "سارة");
        assert!(store.find_student("سارة").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_username_is_rejected() {
        let store = MemoryStore::new();
        let service = StudentService::new(&store);

        for username in ["", "   ", "semi;colon", &"a".repeat(51)] {
            let err = service
                .login(&create(username, ClassName::Gr9A))
                .await
                .unwrap_err();
            assert!(matches!(err, TutorError::Validation(_)), "{username:?}");
        }
        assert!(store.list_students(None).await.unwrap().is_empty());
    }

    #[test]
    fn teacher_code_must_match() {
        let ok = teacher_login(
            &TeacherLogin {
                access_code: "teacher2024".to_string(),
            },
            "teacher2024",
        )
        .unwrap();
        assert_eq!(ok.role, "teacher");

        let err = teacher_login(
            &TeacherLogin {
                access_code: "guess".to_string(),
            },
            "teacher2024",
        )
        .unwrap_err();
        assert!(matches!(err, TutorError::Unauthorized(_)));
    }
}
