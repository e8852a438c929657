use serde::{Deserialize, Serialize};

/// Minimum final mark for a project to count as completed.
pub const PASSING_MARK: i32 = 50;

const COMPLETED_STATUSES: [&str; 2] = ["finished", "success"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub displayname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub cursus_id: i64,
    #[serde(default)]
    pub cursus_name: String,
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub begin_at: Option<String>,
    #[serde(default)]
    pub blackholed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub final_mark: Option<i32>,
    pub project: ProjectRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedProject {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub final_mark: i32,
}

/// Everything one analysis needs, fetched up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub user: UserRecord,
    #[serde(default)]
    pub enrollments: Vec<EnrollmentRecord>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

impl LearnerSnapshot {
    /// The enrollment driving the deadline: the first 42 cursus, else the first record.
    pub fn main_enrollment(&self) -> Option<&EnrollmentRecord> {
        self.enrollments
            .iter()
            .find(|enrollment| {
                enrollment.cursus_name.to_lowercase().contains("42")
                    || enrollment.cursus_id == 1
                    || enrollment.cursus_id == 21
            })
            .or_else(|| self.enrollments.first())
    }
}

pub fn completed_projects(records: &[ProjectRecord]) -> Vec<CompletedProject> {
    records
        .iter()
        .filter(|record| COMPLETED_STATUSES.contains(&record.status.as_str()))
        .filter_map(|record| {
            let mark = record.final_mark?;
            (mark >= PASSING_MARK).then(|| CompletedProject {
                id: record.project.id,
                name: record.project.name.clone(),
                slug: record.project.slug.clone(),
                final_mark: mark,
            })
        })
        .collect()
}
