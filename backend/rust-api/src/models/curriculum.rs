use serde::{Deserialize, Serialize};
use std::fmt;

/// Text carried in both course languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub ar: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedList {
    #[serde(default)]
    pub en: Vec<String>,
    #[serde(default)]
    pub ar: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub ordinal: u8,
    pub title: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Preparation,
    Explanation,
    Practice,
    Assessment,
    Examprep,
}

/// Stage layout every section follows, by position.
pub const CANONICAL_STAGES: [StageType; 6] = [
    StageType::Preparation,
    StageType::Explanation,
    StageType::Practice,
    StageType::Practice,
    StageType::Assessment,
    StageType::Examprep,
];

impl StageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageType::Preparation => "preparation",
            StageType::Explanation => "explanation",
            StageType::Practice => "practice",
            StageType::Assessment => "assessment",
            StageType::Examprep => "examprep",
        }
    }

    /// Prefix problem ids of this stage start with.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            StageType::Preparation => "prep",
            StageType::Explanation => "explanation",
            StageType::Practice => "practice",
            StageType::Assessment => "assessment",
            StageType::Examprep => "examprep",
        }
    }

    /// Stages behind the gatekeeper.
    pub fn is_gated(&self) -> bool {
        matches!(self, StageType::Assessment | StageType::Examprep)
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageVariant {
    PracticeWord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRubric {
    pub order: u8,
    pub description: LocalizedText,
    #[serde(default)]
    pub possible_answers: Vec<String>,
    #[serde(default)]
    pub possible_answers_ar: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleLevel {
    Basic,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveExample {
    pub level: ExampleLevel,
    pub problem: LocalizedText,
    pub answer: LocalizedText,
    pub explanation: LocalizedText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub section_id: String,
    pub position: u8,
    pub stage: StageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_type: Option<StageVariant>,
    pub weight: u32,
    pub question: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<LocalizedText>,
    #[serde(default)]
    pub hints: LocalizedList,
    #[serde(default)]
    pub steps: Vec<StepRubric>,
    #[serde(default)]
    pub examples: Vec<InteractiveExample>,
    #[serde(default)]
    pub show_full_solution: bool,
    #[serde(default)]
    pub hide_answer: bool,
    #[serde(default)]
    pub final_answer_required: bool,
}

/// Stage implied by the shape of a problem id. `examprep` wins over `prep`.
pub fn classify_problem_id(problem_id: &str) -> Option<StageType> {
    const BY_PRECEDENCE: [StageType; 5] = [
        StageType::Examprep,
        StageType::Preparation,
        StageType::Explanation,
        StageType::Practice,
        StageType::Assessment,
    ];

    BY_PRECEDENCE
        .into_iter()
        .find(|stage| problem_id.starts_with(stage.id_prefix()))
}

/// First run of decimal digits in an id, e.g. `practice3_2` -> 3.
pub fn section_ordinal_from_id(id: &str) -> Option<u8> {
    let start = id.find(|c: char| c.is_ascii_digit())?;
    let digits: String = id[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub fn section_id_for(ordinal: u8) -> String {
    format!("section{}", ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn examprep_takes_precedence_over_prep() {
        assert_eq!(classify_problem_id("examprep3"), Some(StageType::Examprep));
        assert_eq!(classify_problem_id("prep3"), Some(StageType::Preparation));
        assert_eq!(classify_problem_id("practice2_1"), Some(StageType::Practice));
        assert_eq!(classify_problem_id("assessment5"), Some(StageType::Assessment));
        assert_eq!(classify_problem_id("explanation1"), Some(StageType::Explanation));
        assert_eq!(classify_problem_id("quiz1"), None);
    }

    #[test]
    fn section_ordinal_uses_first_digit_run() {
        assert_eq!(section_ordinal_from_id("practice4_2"), Some(4));
        assert_eq!(section_ordinal_from_id("examprep5"), Some(5));
        assert_eq!(section_ordinal_from_id("section12"), Some(12));
        assert_eq!(section_ordinal_from_id("explanation"), None);
    }

    #[test]
    fn stage_serializes_lowercase() {
        let json = serde_json::to_string(&StageType::Examprep).unwrap();
        assert_eq!(json, "\"examprep\"");
        let variant: StageVariant = serde_json::from_str("\"practice_word\"").unwrap();
        assert_eq!(variant, StageVariant::PracticeWord);
    }
}
