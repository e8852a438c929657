//! Curriculum catalog and effort estimate tables.
//!
//! Both tables are static configuration: they are validated once by
//! [`Catalog::new`] / [`EffortTable::new`] and never mutated afterwards.
//! The built-in data describes the 42 common core; any other curriculum can
//! be injected through [`crate::config::EngineConfig`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::progress::normalize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumStage {
    pub ordinal: u32,
    pub label: String,
    pub gating_project_ids: Vec<String>,
    pub quorum: usize,
}

impl CurriculumStage {
    pub fn new(ordinal: u32, label: &str, gating: &[&str], quorum: usize) -> Self {
        Self {
            ordinal,
            label: label.to_string(),
            gating_project_ids: gating.iter().map(|id| id.to_string()).collect(),
            quorum,
        }
    }
}

/// Ordered, validated list of stages. Ordinals run 1..=N without gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    stages: Vec<CurriculumStage>,
}

impl Catalog {
    pub fn new(mut stages: Vec<CurriculumStage>) -> EngineResult<Self> {
        if stages.is_empty() {
            return Err(EngineError::Configuration(
                "curriculum has no stages".to_string(),
            ));
        }
        stages.sort_by_key(|stage| stage.ordinal);

        for (index, stage) in stages.iter_mut().enumerate() {
            let expected = index as u32 + 1;
            if stage.ordinal != expected {
                return Err(EngineError::Configuration(format!(
                    "stage ordinals must be 1..N without gaps: expected {expected}, found {}",
                    stage.ordinal
                )));
            }

            let mut seen = Vec::with_capacity(stage.gating_project_ids.len());
            stage
                .gating_project_ids
                .retain(|id| !normalize(id).is_empty());
            stage.gating_project_ids.retain(|id| {
                let key = normalize(id);
                if seen.contains(&key) {
                    false
                } else {
                    seen.push(key);
                    true
                }
            });

            if stage.gating_project_ids.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "stage {} ({}) has no gating projects",
                    stage.ordinal, stage.label
                )));
            }
            if stage.quorum == 0 {
                return Err(EngineError::Configuration(format!(
                    "stage {} ({}) has quorum 0",
                    stage.ordinal, stage.label
                )));
            }
            if stage.quorum > stage.gating_project_ids.len() {
                return Err(EngineError::Configuration(format!(
                    "stage {} ({}) requires {} of only {} gating projects",
                    stage.ordinal,
                    stage.label,
                    stage.quorum,
                    stage.gating_project_ids.len()
                )));
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[CurriculumStage] {
        &self.stages
    }

    pub fn stage(&self, ordinal: u32) -> Option<&CurriculumStage> {
        ordinal
            .checked_sub(1)
            .and_then(|index| self.stages.get(index as usize))
    }

    pub fn first(&self) -> &CurriculumStage {
        &self.stages[0]
    }

    pub fn last_ordinal(&self) -> u32 {
        self.stages.len() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::VeryHard => "very_hard",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize(value).as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "very hard" | "veryhard" => Ok(Difficulty::VeryHard),
            other => Err(EngineError::Configuration(format!(
                "unknown difficulty {other:?}"
            ))),
        }
    }
}

/// Upper bound for a single estimate's duration (ten years of weeks).
pub const MAX_ESTIMATE_WEEKS: u32 = 520;
/// Upper bound for a single estimate's hours: every hour of every allowed week.
pub const MAX_ESTIMATE_HOURS: u32 = MAX_ESTIMATE_WEEKS * 168;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortEstimate {
    pub project_id: String,
    pub weeks: u32,
    pub hours: u32,
    pub difficulty: Difficulty,
}

impl EffortEstimate {
    pub fn new(project_id: &str, weeks: u32, hours: u32, difficulty: Difficulty) -> Self {
        Self {
            project_id: project_id.to_string(),
            weeks,
            hours,
            difficulty,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        if self.weeks == 0 || self.hours == 0 {
            return Err(EngineError::Configuration(format!(
                "estimate for {:?} must have positive weeks and hours",
                self.project_id
            )));
        }
        if self.weeks > MAX_ESTIMATE_WEEKS || self.hours > MAX_ESTIMATE_HOURS {
            return Err(EngineError::Configuration(format!(
                "estimate for {:?} exceeds {MAX_ESTIMATE_WEEKS} weeks or {MAX_ESTIMATE_HOURS} hours",
                self.project_id
            )));
        }
        Ok(())
    }
}

/// Per-project effort lookup with a fallback estimate for unknown ids.
///
/// When an id appears more than once, the last entry wins, so override rows
/// can simply be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffortTable {
    entries: BTreeMap<String, EffortEstimate>,
    fallback: EffortEstimate,
}

impl EffortTable {
    pub fn new(estimates: Vec<EffortEstimate>, fallback: EffortEstimate) -> EngineResult<Self> {
        fallback.validate()?;
        let mut entries = BTreeMap::new();
        for estimate in estimates {
            estimate.validate()?;
            entries.insert(normalize(&estimate.project_id), estimate);
        }
        Ok(Self { entries, fallback })
    }

    /// Estimate for `project_id`, reported under the id asked for.
    /// Unknown projects get the fallback.
    pub fn estimate(&self, project_id: &str) -> EffortEstimate {
        let base = self
            .entries
            .get(&normalize(project_id))
            .unwrap_or(&self.fallback);
        EffortEstimate {
            project_id: project_id.to_string(),
            ..base.clone()
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &EffortEstimate> {
        self.entries.values()
    }

    pub fn fallback(&self) -> &EffortEstimate {
        &self.fallback
    }
}

pub fn default_fallback_estimate() -> EffortEstimate {
    EffortEstimate::new("default", 2, 40, Difficulty::Medium)
}

pub fn default_stages() -> Vec<CurriculumStage> {
    vec![
        CurriculumStage::new(1, "Circle 0", &["libft"], 1),
        CurriculumStage::new(
            2,
            "Circle 1",
            &["ft_printf", "get_next_line", "born2beroot"],
            3,
        ),
        CurriculumStage::new(
            3,
            "Circle 2",
            &["push_swap", "pipex", "minitalk", "so_long", "fdf", "fract-ol"],
            3,
        ),
        CurriculumStage::new(4, "Circle 3", &["philosophers", "minishell"], 2),
        CurriculumStage::new(
            5,
            "Circle 4",
            &[
                "netpractice",
                "cub3d",
                "minirt",
                "cpp_module_00",
                "cpp_module_01",
                "cpp_module_02",
                "cpp_module_03",
                "cpp_module_04",
            ],
            7,
        ),
        CurriculumStage::new(
            6,
            "Circle 5",
            &[
                "webserv",
                "ft_irc",
                "inception",
                "cpp_module_05",
                "cpp_module_06",
                "cpp_module_07",
                "cpp_module_08",
                "cpp_module_09",
            ],
            7,
        ),
        CurriculumStage::new(7, "Circle 6", &["ft_transcendence"], 1),
    ]
}

pub fn default_estimates() -> Vec<EffortEstimate> {
    use Difficulty::*;

    vec![
        EffortEstimate::new("libft", 3, 70, Medium),
        EffortEstimate::new("ft_printf", 2, 40, Medium),
        EffortEstimate::new("get_next_line", 1, 20, Easy),
        EffortEstimate::new("born2beroot", 1, 25, Easy),
        EffortEstimate::new("push_swap", 3, 60, Hard),
        EffortEstimate::new("pipex", 2, 35, Medium),
        EffortEstimate::new("minitalk", 1, 25, Easy),
        EffortEstimate::new("so_long", 2, 40, Medium),
        EffortEstimate::new("fdf", 2, 45, Medium),
        EffortEstimate::new("fract-ol", 2, 40, Medium),
        EffortEstimate::new("philosophers", 2, 45, Hard),
        EffortEstimate::new("minishell", 6, 160, VeryHard),
        EffortEstimate::new("netpractice", 1, 15, Easy),
        EffortEstimate::new("cub3d", 4, 100, Hard),
        EffortEstimate::new("minirt", 4, 100, Hard),
        EffortEstimate::new("cpp_module_00", 1, 15, Easy),
        EffortEstimate::new("cpp_module_01", 1, 15, Easy),
        EffortEstimate::new("cpp_module_02", 1, 20, Medium),
        EffortEstimate::new("cpp_module_03", 1, 15, Easy),
        EffortEstimate::new("cpp_module_04", 1, 20, Medium),
        EffortEstimate::new("cpp_module_05", 1, 20, Medium),
        EffortEstimate::new("cpp_module_06", 1, 20, Medium),
        EffortEstimate::new("cpp_module_07", 1, 15, Easy),
        EffortEstimate::new("cpp_module_08", 1, 20, Medium),
        EffortEstimate::new("cpp_module_09", 1, 25, Medium),
        EffortEstimate::new("webserv", 6, 180, VeryHard),
        EffortEstimate::new("ft_irc", 4, 110, Hard),
        EffortEstimate::new("inception", 2, 50, Medium),
        EffortEstimate::new("ft_transcendence", 8, 240, VeryHard),
    ]
}
