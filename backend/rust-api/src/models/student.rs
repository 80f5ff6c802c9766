use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

/// Grade 9 class labels a student can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ClassName {
    #[default]
    #[serde(rename = "GR9-A")]
    Gr9A,
    #[serde(rename = "GR9-B")]
    Gr9B,
    #[serde(rename = "GR9-C")]
    Gr9C,
    #[serde(rename = "GR9-D")]
    Gr9D,
}

impl ClassName {
    pub const ALL: [ClassName; 4] = [
        ClassName::Gr9A,
        ClassName::Gr9B,
        ClassName::Gr9C,
        ClassName::Gr9D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassName::Gr9A => "GR9-A",
            ClassName::Gr9B => "GR9-B",
            ClassName::Gr9C => "GR9-C",
            ClassName::Gr9D => "GR9-D",
        }
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ClassName::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("Unknown class '{}'", value))
    }
}

/// Student stored in the "students" collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub username: String,
    #[serde(default)]
    pub class_name: ClassName,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// POST /auth/student-login
#[derive(Debug, Deserialize, Validate)]
pub struct StudentCreate {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    pub class_name: ClassName,
}

/// POST /auth/teacher-login
#[derive(Debug, Deserialize, Validate)]
pub struct TeacherLogin {
    #[validate(length(min = 1, message = "Access code is required"))]
    pub access_code: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherLoginResponse {
    pub role: &'static str,
    pub message: String,
}

pub const USERNAME_MAX_CHARS: usize = 50;

/// Usernames are compared after trimming; letters of any script, digits and `_-.` are allowed.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("username_required")
            .with_message("Username is required".into()));
    }
    if trimmed.chars().count() > USERNAME_MAX_CHARS {
        return Err(ValidationError::new("username_too_long")
            .with_message(format!("Username must be at most {} characters", USERNAME_MAX_CHARS).into()));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::new("username_charset")
            .with_message("Username may only contain letters, digits, '_', '-' and '.'".into()));
    }
    Ok(())
}
