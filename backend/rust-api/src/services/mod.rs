use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::store::CourseStore;

pub mod admin_service;
pub mod answer_normalizer;
pub mod attempt_service;
pub mod catalog;
pub mod curriculum_seed;
pub mod error;
pub mod gatekeeper;
pub mod progress_service;
pub mod scorer;
pub mod section_bootstrap;
pub mod student_service;
pub mod teacher_service;

use catalog::Catalog;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CourseStore>,
    pub catalog: Catalog,
}

impl AppState {
    /// Seeds the curriculum if needed and loads it into the catalog.
    pub async fn new(config: Config, store: Arc<dyn CourseStore>) -> Result<Self> {
        curriculum_seed::ensure_seeded(store.as_ref(), &config).await?;

        let sections = store
            .load_sections()
            .await
            .context("Failed to load sections")?;
        let problems = store
            .load_problems()
            .await
            .context("Failed to load problems")?;
        let catalog = Catalog::new(sections, problems).context("Stored curriculum is invalid")?;

        tracing::info!(
            sections = catalog.sections().len(),
            problems = catalog.problems().len(),
            "Catalog loaded"
        );

        Ok(Self {
            config,
            store,
            catalog,
        })
    }
}
