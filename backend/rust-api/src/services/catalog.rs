use anyhow::{bail, ensure, Result};
use std::collections::{HashMap, HashSet};

use crate::models::curriculum::{
    classify_problem_id, section_ordinal_from_id, ExampleLevel, CANONICAL_STAGES,
};
use crate::models::{Problem, Section, StageType};

pub const SECTION_COUNT: u8 = 5;

/// Read-only view of the curriculum, validated once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    sections: Vec<Section>,
    problems: Vec<Problem>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Validates the curriculum shape and builds lookup indexes.
    pub fn new(mut sections: Vec<Section>, problems: Vec<Problem>) -> Result<Self> {
        sections.sort_by_key(|section| section.ordinal);
        validate_sections(&sections)?;

        let ordinals: HashMap<&str, u8> = sections
            .iter()
            .map(|section| (section.id.as_str(), section.ordinal))
            .collect();

        let mut by_id = HashMap::with_capacity(problems.len());
        for (index, problem) in problems.iter().enumerate() {
            ensure!(
                by_id.insert(problem.id.clone(), index).is_none(),
                "Duplicate problem id {}",
                problem.id
            );
            ensure!(
                ordinals.contains_key(problem.section_id.as_str()),
                "Problem {} belongs to unknown section {}",
                problem.id,
                problem.section_id
            );
            validate_problem(problem, ordinals[problem.section_id.as_str()])?;
        }

        let mut catalog = Self {
            sections,
            problems,
            by_id,
        };
        catalog.sort_problems();
        catalog.validate_stage_layout()?;
        Ok(catalog)
    }

    fn sort_problems(&mut self) {
        let ordinals: HashMap<String, u8> = self
            .sections
            .iter()
            .map(|section| (section.id.clone(), section.ordinal))
            .collect();
        self.problems
            .sort_by_key(|problem| (ordinals[&problem.section_id], problem.position));
        self.by_id = self
            .problems
            .iter()
            .enumerate()
            .map(|(index, problem)| (problem.id.clone(), index))
            .collect();
    }

    fn validate_stage_layout(&self) -> Result<()> {
        for section in &self.sections {
            let stages: Vec<StageType> = self
                .problems_in_section(&section.id)
                .map(|problem| problem.stage)
                .collect();
            ensure!(
                stages == CANONICAL_STAGES,
                "Section {} must contain the six canonical stages in order, found {:?}",
                section.id,
                stages
            );
            for (expected, problem) in (1u8..).zip(self.problems_in_section(&section.id)) {
                ensure!(
                    problem.position == expected,
                    "Problem {} has position {}, expected {}",
                    problem.id,
                    problem.position,
                    expected
                );
            }
        }
        Ok(())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn problem(&self, problem_id: &str) -> Option<&Problem> {
        self.by_id
            .get(problem_id)
            .map(|&index| &self.problems[index])
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == section_id)
    }

    pub fn section_by_ordinal(&self, ordinal: u8) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.ordinal == ordinal)
    }

    /// Problems of a section in position order.
    pub fn problems_in_section<'a, 's>(
        &'a self,
        section_id: &'s str,
    ) -> impl Iterator<Item = &'a Problem> + use<'a, 's> {
        self.problems
            .iter()
            .filter(move |problem| problem.section_id == section_id)
    }

    pub fn stage_problems<'a, 's>(
        &'a self,
        section_id: &'s str,
        stage: StageType,
    ) -> impl Iterator<Item = &'a Problem> + use<'a, 's> {
        self.problems_in_section(section_id)
            .filter(move |problem| problem.stage == stage)
    }

    /// The practice pair an assessment is gated on.
    pub fn practice_problems<'a>(&'a self, section_id: &str) -> Vec<&'a Problem> {
        self.stage_problems(section_id, StageType::Practice).collect()
    }

    pub fn assessment<'a>(&'a self, section_id: &str) -> Option<&'a Problem> {
        self.stage_problems(section_id, StageType::Assessment).next()
    }

    pub fn first_problem<'a>(&'a self, section_id: &str) -> Option<&'a Problem> {
        self.problems_in_section(section_id).next()
    }

    pub fn next_section(&self, section_id: &str) -> Option<&Section> {
        let ordinal = self.section(section_id)?.ordinal;
        self.section_by_ordinal(ordinal.checked_add(1)?)
    }

    pub fn weight(&self, problem_id: &str) -> u32 {
        self.problem(problem_id).map_or(0, |problem| problem.weight)
    }
}

fn validate_sections(sections: &[Section]) -> Result<()> {
    ensure!(
        sections.len() == SECTION_COUNT as usize,
        "Expected {} sections, found {}",
        SECTION_COUNT,
        sections.len()
    );
    let mut seen = HashSet::new();
    for (expected, section) in (1u8..).zip(sections) {
        ensure!(
            section.ordinal == expected,
            "Section ordinals must be dense from 1; {} has {}",
            section.id,
            section.ordinal
        );
        ensure!(seen.insert(section.id.as_str()), "Duplicate section id {}", section.id);
        ensure!(
            section_ordinal_from_id(&section.id) == Some(section.ordinal),
            "Section id {} does not match ordinal {}",
            section.id,
            section.ordinal
        );
    }
    Ok(())
}

fn validate_problem(problem: &Problem, section_ordinal: u8) -> Result<()> {
    let id = problem.id.as_str();

    match classify_problem_id(id) {
        Some(stage) if stage == problem.stage => {}
        Some(stage) => bail!(
            "Problem {} is stored as {} but its id reads as {}",
            id,
            problem.stage,
            stage
        ),
        None => bail!("Problem id {} does not name a stage", id),
    }
    ensure!(
        section_ordinal_from_id(id) == Some(section_ordinal),
        "Problem {} is filed under section {} but its id says otherwise",
        id,
        problem.section_id
    );

    let weight_ok = match problem.stage {
        StageType::Preparation => problem.weight == 10,
        StageType::Explanation => problem.weight == 0,
        StageType::Practice => problem.weight == 15,
        StageType::Assessment => (20..=30).contains(&problem.weight),
        StageType::Examprep => (25..=30).contains(&problem.weight),
    };
    ensure!(
        weight_ok,
        "Problem {} has weight {} which is invalid for a {} stage",
        id,
        problem.weight,
        problem.stage
    );

    if problem.stage == StageType::Explanation {
        let levels: Vec<ExampleLevel> = problem.examples.iter().map(|e| e.level).collect();
        ensure!(
            levels == [ExampleLevel::Basic, ExampleLevel::Intermediate, ExampleLevel::Advanced],
            "Explanation {} needs basic, intermediate and advanced examples",
            id
        );
    } else {
        ensure!(
            problem.answer.is_some(),
            "Problem {} has no final answer",
            id
        );
        for step in &problem.steps {
            ensure!(
                !step.possible_answers.is_empty() && !step.possible_answers_ar.is_empty(),
                "Step {} of {} has no accepted answers",
                step.order,
                id
            );
        }
    }

    for (expected, step) in (1u8..).zip(&problem.steps) {
        ensure!(
            step.order == expected,
            "Steps of {} must be numbered from 1",
            id
        );
    }

    Ok(())
}
