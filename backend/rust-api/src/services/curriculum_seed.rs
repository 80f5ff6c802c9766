use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

use crate::config::Config;
use crate::models::curriculum::section_id_for;
use crate::models::{Problem, Section};
use crate::services::catalog::Catalog;
use crate::store::CurriculumStore;

const EMBEDDED_CURRICULUM: &str = include_str!("../../seed/curriculum.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Curriculum {
    pub sections: Vec<Section>,
    pub problems: Vec<Problem>,
}

/// The curriculum shipped with the binary.
pub fn embedded() -> Result<Curriculum> {
    serde_json::from_str(EMBEDDED_CURRICULUM).context("Failed to parse embedded curriculum")
}

/// Reads the configured seed file, falling back to the embedded curriculum.
pub async fn load(config: &Config) -> Result<Curriculum> {
    let path = match &config.curriculum_seed_file {
        Some(path) if !path.is_empty() => Path::new(path),
        _ => return embedded(),
    };

    tracing::info!("Loading curriculum seed from {}", path.display());
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read curriculum seed file {}", path.display()))?;

    serde_json::from_str(&contents).context("Failed to deserialize curriculum seed payload")
}

/// Inserts the curriculum unless the first section is already stored.
/// Returns true when the seed was written.
pub async fn ensure_seeded<S>(store: &S, config: &Config) -> Result<bool>
where
    S: CurriculumStore + ?Sized,
{
    if store.section_exists(&section_id_for(1)).await? {
        tracing::info!("Curriculum already present, seed skipped");
        return Ok(false);
    }

    write_seed(store, config).await?;
    Ok(true)
}

/// Writes the seed unconditionally. Callers clear the curriculum first.
pub async fn write_seed<S>(store: &S, config: &Config) -> Result<()>
where
    S: CurriculumStore + ?Sized,
{
    let curriculum = load(config).await?;

    // Reject a malformed seed before anything reaches the store.
    Catalog::new(curriculum.sections.clone(), curriculum.problems.clone())
        .context("Curriculum seed failed validation")?;

    store
        .insert_curriculum(&curriculum.sections, &curriculum.problems)
        .await
        .context("Failed to insert curriculum")?;

    tracing::info!(
        sections = curriculum.sections.len(),
        problems = curriculum.problems.len(),
        "Curriculum seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curriculum::StageVariant;
    use crate::services::answer_normalizer::answers_match;
    use crate::store::MemoryStore;

    #[test]
    fn embedded_seed_parses() {
        let curriculum = embedded().unwrap();
        assert_eq!(curriculum.sections.len(), 5);
        assert_eq!(curriculum.problems.len(), 30);
        assert_eq!(curriculum.sections[0].id, "section1");
    }

    #[test]
    fn arabic_answers_normalize_like_english_for_x() {
        let curriculum = embedded().unwrap();
        let prep1 = curriculum.problems.iter().find(|p| p.id == "prep1").unwrap();
        let answer = prep1.answer.as_ref().unwrap();
        assert!(answers_match(&answer.ar, &answer.en));
        assert!(answers_match("س > ١٥", &answer.en));
    }

    #[test]
    fn second_practice_is_a_word_problem() {
        let curriculum = embedded().unwrap();
        for n in 1..=5 {
            let id = format!("practice{}_2", n);
            let problem = curriculum.problems.iter().find(|p| p.id == id).unwrap();
            assert_eq!(problem.stage_type, Some(StageVariant::PracticeWord));
        }
    }

    #[test]
    fn assessments_carry_three_canned_hints_and_hide_answers() {
        let curriculum = embedded().unwrap();
        for problem in curriculum
            .problems
            .iter()
            .filter(|p| p.id.starts_with("assessment"))
        {
            assert_eq!(problem.hints.en.len(), 3, "{}", problem.id);
            assert_eq!(problem.hints.ar.len(), 3, "{}", problem.id);
            assert!(problem.hide_answer);
            assert!(!problem.show_full_solution);
        }
    }

    #[test]
    fn prep2_uses_the_multiplication_form() {
        let curriculum = embedded().unwrap();
        let prep2 = curriculum.problems.iter().find(|p| p.id == "prep2").unwrap();
        assert_eq!(prep2.question.en, "Solve: 4x < 20");
        assert_eq!(prep2.answer.as_ref().unwrap().en, "x < 5");
    }

    #[tokio::test]
    async fn ensure_seeded_runs_once() {
        let store = MemoryStore::new();
        let config = Config::default();

        assert!(ensure_seeded(&store, &config).await.unwrap());
        assert!(!ensure_seeded(&store, &config).await.unwrap());

        assert_eq!(store.load_sections().await.unwrap().len(), 5);
        assert_eq!(store.load_problems().await.unwrap().len(), 30);
    }

    #[tokio::test]
    async fn missing_seed_file_is_an_error() {
        let store = MemoryStore::new();
        let config = Config {
            curriculum_seed_file: Some("/nonexistent/curriculum.json".to_string()),
            ..Config::default()
        };

        assert!(ensure_seeded(&store, &config).await.is_err());
        assert!(!store.section_exists("section1").await.unwrap());
    }
}
