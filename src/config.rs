use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{
    default_estimates, default_fallback_estimate, default_stages, Catalog, CurriculumStage,
    Difficulty, EffortEstimate, EffortTable,
};
use crate::error::{EngineError, EngineResult};

pub const CONFIG_ENV_VAR: &str = "BLACKHOLE_ESCAPE_CONFIG";

/// Days granted from the stage start when no explicit deadline is recorded.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 392;
/// Deadlines further out than this are treated as effectively unbounded.
pub const DEFAULT_UNBOUNDED_HORIZON_DAYS: i64 = 1000;
/// Upper bound for both day-count settings (one hundred years).
pub const MAX_CONFIGURED_DAYS: i64 = 36_500;

/// Engine tuning and reference tables.
///
/// Config keys (TOML): `grace_period_days`, `unbounded_horizon_days`,
/// `default_estimate`, `stages`, `estimates`. Every key is optional and falls
/// back to the built-in 42 common core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,
    #[serde(default = "default_unbounded_horizon_days")]
    pub unbounded_horizon_days: i64,
    #[serde(default = "default_fallback_estimate")]
    pub default_estimate: EffortEstimate,
    #[serde(default = "default_stages")]
    pub stages: Vec<CurriculumStage>,
    #[serde(default = "default_estimates")]
    pub estimates: Vec<EffortEstimate>,
}

fn default_grace_period_days() -> i64 {
    DEFAULT_GRACE_PERIOD_DAYS
}

fn default_unbounded_horizon_days() -> i64 {
    DEFAULT_UNBOUNDED_HORIZON_DAYS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            unbounded_horizon_days: DEFAULT_UNBOUNDED_HORIZON_DAYS,
            default_estimate: default_fallback_estimate(),
            stages: default_stages(),
            estimates: default_estimates(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        toml::from_str(content).map_err(|err| EngineError::Configuration(err.to_string()))
    }

    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            EngineError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Explicit path, then `BLACKHOLE_ESCAPE_CONFIG`, then built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> EngineResult<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match path {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("using built-in engine config");
                Ok(Self::default())
            }
        }
    }

    /// Validates the tables into the immutable forms the engine consumes.
    pub fn build_tables(&self) -> EngineResult<(Catalog, EffortTable)> {
        check_days("grace_period_days", self.grace_period_days)?;
        check_days("unbounded_horizon_days", self.unbounded_horizon_days)?;
        let catalog = Catalog::new(self.stages.clone())?;
        let efforts = EffortTable::new(self.estimates.clone(), self.default_estimate.clone())?;
        Ok((catalog, efforts))
    }
}

/// Reads `project_id,weeks,hours,difficulty` rows.
pub fn load_estimates_csv(path: &Path) -> EngineResult<Vec<EffortEstimate>> {
    let reader = csv::Reader::from_path(path).map_err(|err| {
        EngineError::Configuration(format!("cannot open {}: {err}", path.display()))
    })?;
    read_estimates(reader)
}

fn read_estimates<R: std::io::Read>(mut reader: csv::Reader<R>) -> EngineResult<Vec<EffortEstimate>> {
    #[derive(Deserialize)]
    struct CsvRow {
        project_id: String,
        weeks: u32,
        hours: u32,
        difficulty: String,
    }

    let mut estimates = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        let row = result.map_err(|err| EngineError::Configuration(err.to_string()))?;
        let difficulty: Difficulty = row.difficulty.parse()?;
        estimates.push(EffortEstimate {
            project_id: row.project_id,
            weeks: row.weeks,
            hours: row.hours,
            difficulty,
        });
    }
    Ok(estimates)
}

fn check_days(key: &str, days: i64) -> EngineResult<()> {
    if days <= 0 || days > MAX_CONFIGURED_DAYS {
        return Err(EngineError::Configuration(format!(
            "{key} must be between 1 and {MAX_CONFIGURED_DAYS}, got {days}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.grace_period_days, 392);
    }

    #[test]
    fn toml_overrides_curriculum() {
        let config = EngineConfig::from_toml_str(
            r#"
            grace_period_days = 200

            [[stages]]
            ordinal = 1
            label = "Basics"
            gating_project_ids = ["hello", "world"]
            quorum = 1

            [[estimates]]
            project_id = "hello"
            weeks = 1
            hours = 10
            difficulty = "easy"
            "#,
        )
        .expect("config");
        assert_eq!(config.grace_period_days, 200);
        let (catalog, efforts) = config.build_tables().expect("tables");
        assert_eq!(catalog.last_ordinal(), 1);
        assert_eq!(efforts.estimate("hello").hours, 10);
        assert_eq!(efforts.estimate("libft").weeks, 2);
    }

    #[test]
    fn zero_quorum_fails_at_load() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[stages]]
            ordinal = 1
            label = "Broken"
            gating_project_ids = ["libft"]
            quorum = 0
            "#,
        )
        .expect("parses");
        assert!(matches!(
            config.build_tables(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn day_counts_outside_bounds_fail_at_load() {
        for (grace, horizon) in [(0, 1000), (200_000_000_000, 1000), (392, -1), (392, i64::MAX)] {
            let config = EngineConfig {
                grace_period_days: grace,
                unbounded_horizon_days: horizon,
                ..EngineConfig::default()
            };
            assert!(
                matches!(config.build_tables(), Err(EngineError::Configuration(_))),
                "grace {grace}, horizon {horizon}"
            );
        }
        let edge = EngineConfig {
            grace_period_days: MAX_CONFIGURED_DAYS,
            unbounded_horizon_days: MAX_CONFIGURED_DAYS,
            ..EngineConfig::default()
        };
        edge.build_tables().expect("bounds are inclusive");
    }

    #[test]
    fn reads_estimate_rows() {
        let data = "project_id,weeks,hours,difficulty\nlibft,1,30,easy\nminishell,8,200,very_hard\n";
        let estimates = read_estimates(csv::Reader::from_reader(data.as_bytes())).expect("rows");
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[1].difficulty, Difficulty::VeryHard);
    }

    #[test]
    fn rejects_unknown_difficulty_rows() {
        let data = "project_id,weeks,hours,difficulty\nlibft,1,30,legendary\n";
        assert!(read_estimates(csv::Reader::from_reader(data.as_bytes())).is_err());
    }
}
