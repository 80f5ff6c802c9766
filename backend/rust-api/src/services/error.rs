use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a student may not open a stage yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    AuthenticationRequired,
    PracticeIncomplete,
    AssessmentIncomplete,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::AuthenticationRequired => "authentication_required",
            DenialReason::PracticeIncomplete => "practice_incomplete",
            DenialReason::AssessmentIncomplete => "assessment_incomplete",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDenial {
    pub reason: DenialReason,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{}", .0.message)]
    Locked(GateDenial),
    #[error("{0}")]
    NotFound(String),
    #[error("Progress service temporarily unavailable")]
    Unavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TutorError {
    pub fn validation(message: impl Into<String>) -> Self {
        TutorError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        TutorError::NotFound(message.into())
    }
}

impl From<validator::ValidationErrors> for TutorError {
    fn from(errors: validator::ValidationErrors) -> Self {
        TutorError::Validation(format!("Validation error: {}", errors))
    }
}
