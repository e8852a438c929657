//! Curriculum progress matching.
//!
//! Completed project names and slugs are matched against catalog ids with a
//! deliberately loose rule: after [`normalize`], two identifiers match when
//! either one contains the other. This tolerates API slugs such as
//! `42cursus-ft-printf` against catalog id `ft_printf`, at the price of
//! accepting `minirt2` as a completion of `minirt`.
//!
//! Gating ids are always visited in the catalog's declared order, so the
//! result never depends on hash iteration order.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CurriculumStage};
use crate::models::CompletedProject;

/// Lowercases, trims, maps `_`/`-` to spaces and collapses whitespace runs.
pub fn normalize(identifier: &str) -> String {
    identifier
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bidirectional containment over normalized identifiers.
pub fn names_match(left: &str, right: &str) -> bool {
    let left = normalize(left);
    let right = normalize(right);
    normalized_match(&left, &right)
}

fn normalized_match(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left.contains(right) || right.contains(left)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub current_stage: u32,
    pub current_stage_label: String,
    pub next_stage: Option<u32>,
    pub completed_in_current: usize,
    pub required_in_current: usize,
    pub missing_project_ids: Vec<String>,
    pub on_track: bool,
    /// Highest stage with at least one matched gating project; 0 when none.
    pub highest_stage_reached: u32,
    pub level: f64,
    /// Fractional part of the level, as a percentage with one decimal.
    pub level_progress: f64,
}

impl ProgressState {
    /// Gating projects still needed to reach the current stage's quorum.
    pub fn remaining_required(&self) -> usize {
        self.required_in_current
            .saturating_sub(self.completed_in_current)
            .min(self.missing_project_ids.len())
    }
}

/// Normalized names and slugs of everything the learner has completed.
struct CompletedNames(Vec<String>);

impl CompletedNames {
    fn from_projects(projects: &[CompletedProject]) -> Self {
        let mut names: Vec<String> = projects
            .iter()
            .flat_map(|project| [normalize(&project.name), normalize(&project.slug)])
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    fn contains(&self, gating_id: &str) -> bool {
        let gating = normalize(gating_id);
        self.0.iter().any(|name| normalized_match(name, &gating))
    }

    fn split<'a>(&self, stage: &'a CurriculumStage) -> (Vec<&'a str>, Vec<&'a str>) {
        stage
            .gating_project_ids
            .iter()
            .map(String::as_str)
            .partition(|id| self.contains(id))
    }
}

/// Stage walk accumulator; `Stopped` short-circuits the remaining stages.
#[derive(Debug, Clone, Copy)]
enum Walk {
    Advancing { stage: u32, highest: u32 },
    Stopped { stage: u32, highest: u32 },
}

pub struct ProgressMatcher<'a> {
    catalog: &'a Catalog,
}

impl<'a> ProgressMatcher<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn stage_progress(&self, completed: &[CompletedProject], level: f64) -> ProgressState {
        let names = CompletedNames::from_projects(completed);

        let walk = self.catalog.stages().iter().fold(
            Walk::Advancing { stage: 1, highest: 0 },
            |walk, stage| match walk {
                Walk::Stopped { .. } => walk,
                Walk::Advancing { highest, .. } => {
                    let (done, _) = names.split(stage);
                    let highest = if done.is_empty() { highest } else { stage.ordinal };
                    tracing::debug!(
                        stage = stage.ordinal,
                        done = done.len(),
                        quorum = stage.quorum,
                        "stage walk"
                    );
                    if done.len() >= stage.quorum {
                        Walk::Advancing { stage: stage.ordinal + 1, highest }
                    } else {
                        Walk::Stopped { stage: stage.ordinal, highest }
                    }
                }
            },
        );

        let (walked, highest) = match walk {
            Walk::Advancing { stage, highest } | Walk::Stopped { stage, highest } => {
                (stage, highest)
            }
        };
        let current = walked
            .min(highest + 1)
            .min(self.catalog.last_ordinal())
            .max(1);

        let stage = self
            .catalog
            .stage(current)
            .unwrap_or_else(|| self.catalog.first());
        let (done, missing) = names.split(stage);
        let next_stage = (stage.ordinal < self.catalog.last_ordinal()).then(|| stage.ordinal + 1);

        ProgressState {
            current_stage: stage.ordinal,
            current_stage_label: stage.label.clone(),
            next_stage,
            completed_in_current: done.len(),
            required_in_current: stage.quorum,
            missing_project_ids: missing.into_iter().map(str::to_string).collect(),
            on_track: done.len() >= stage.quorum,
            highest_stage_reached: highest,
            level,
            level_progress: level_progress(level),
        }
    }
}

fn level_progress(level: f64) -> f64 {
    if !level.is_finite() || level <= 0.0 {
        return 0.0;
    }
    (level.fract() * 1000.0).round() / 10.0
}
