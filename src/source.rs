//! Record-source seam.
//!
//! The engine only ever sees a fully materialized [`LearnerSnapshot`]. Paging,
//! authentication and request pacing belong to whatever implements
//! [`RecordSource`]; [`Analyzer`] fetches one snapshot and hands it over.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::models::{EnrollmentRecord, LearnerSnapshot, ProjectRecord, ProjectRef, UserRecord};
use crate::report::AnalysisReport;

pub trait RecordSource {
    fn user(&self, login: &str) -> EngineResult<Option<UserRecord>>;
    fn enrollments(&self, user_id: i64) -> EngineResult<Vec<EnrollmentRecord>>;
    fn project_records(&self, user_id: i64) -> EngineResult<Vec<ProjectRecord>>;
}

/// Snapshots held in memory, indexed by lowercase login and by user id.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    snapshots: Vec<LearnerSnapshot>,
    by_login: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
}

impl MemorySource {
    /// Fails when two snapshots share a user id or a login (ignoring case).
    pub fn new(snapshots: Vec<LearnerSnapshot>) -> EngineResult<Self> {
        let mut by_login = HashMap::with_capacity(snapshots.len());
        let mut by_id = HashMap::with_capacity(snapshots.len());
        for (index, snapshot) in snapshots.iter().enumerate() {
            let user = &snapshot.user;
            if by_id.insert(user.id, index).is_some() {
                return Err(EngineError::Source(format!(
                    "duplicate user id {} (login {})",
                    user.id, user.login
                )));
            }
            if by_login.insert(user.login.to_lowercase(), index).is_some() {
                return Err(EngineError::Source(format!("duplicate login {}", user.login)));
            }
        }
        Ok(Self {
            snapshots,
            by_login,
            by_id,
        })
    }

    /// Accepts either a single snapshot object or an array of them.
    pub fn from_json_str(content: &str) -> EngineResult<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let snapshots = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        Self::new(snapshots)
    }

    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &LearnerSnapshot> {
        self.snapshots.iter()
    }

    fn by_id(&self, user_id: i64) -> Option<&LearnerSnapshot> {
        self.by_id.get(&user_id).map(|&index| &self.snapshots[index])
    }
}

impl RecordSource for MemorySource {
    fn user(&self, login: &str) -> EngineResult<Option<UserRecord>> {
        Ok(self
            .by_login
            .get(&login.to_lowercase())
            .map(|&index| self.snapshots[index].user.clone()))
    }

    fn enrollments(&self, user_id: i64) -> EngineResult<Vec<EnrollmentRecord>> {
        Ok(self
            .by_id(user_id)
            .map(|snapshot| snapshot.enrollments.clone())
            .unwrap_or_default())
    }

    fn project_records(&self, user_id: i64) -> EngineResult<Vec<ProjectRecord>> {
        Ok(self
            .by_id(user_id)
            .map(|snapshot| snapshot.projects.clone())
            .unwrap_or_default())
    }
}

/// Reads client-supplied `name,slug,status,final_mark` rows for what-if analysis.
pub fn project_records_from_csv<R: std::io::Read>(reader: R) -> EngineResult<Vec<ProjectRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        #[serde(default)]
        slug: String,
        status: String,
        final_mark: Option<i32>,
    }

    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|err| EngineError::Source(format!("csv row {}: {err}", index + 1)))?;
        records.push(ProjectRecord {
            status: row.status,
            final_mark: row.final_mark,
            project: ProjectRef {
                id: index as i64 + 1,
                name: row.name,
                slug: row.slug,
            },
        });
    }
    Ok(records)
}

pub struct Analyzer<S> {
    engine: Engine,
    source: S,
}

impl<S: RecordSource> Analyzer<S> {
    pub fn new(engine: Engine, source: S) -> Self {
        Self { engine, source }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn analyze(&self, login: &str) -> EngineResult<AnalysisReport> {
        self.analyze_at(login, Utc::now())
    }

    pub fn analyze_at(&self, login: &str, now: DateTime<Utc>) -> EngineResult<AnalysisReport> {
        let span = tracing::info_span!("analyze", login);
        let _guard = span.enter();

        let snapshot = self.fetch_snapshot(login)?;
        self.engine.assess(&snapshot, now)
    }

    fn fetch_snapshot(&self, login: &str) -> EngineResult<LearnerSnapshot> {
        let user = self
            .source
            .user(login)?
            .ok_or_else(|| EngineError::NotFound(format!("user {login}")))?;
        let enrollments = self.source.enrollments(user.id)?;
        if enrollments.is_empty() {
            return Err(EngineError::NotFound(format!(
                "no enrollment data for {login}"
            )));
        }
        let projects = self.source.project_records(user.id)?;
        tracing::debug!(
            enrollments = enrollments.len(),
            projects = projects.len(),
            "fetched learner snapshot"
        );
        Ok(LearnerSnapshot {
            user,
            enrollments,
            projects,
        })
    }
}
