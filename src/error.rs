use thiserror::Error;

/// Failures surfaced by the analysis engine and its data-source seam.
///
/// `MalformedDate` is produced by timestamp parsing but never escapes an
/// analysis: the deadline resolver downgrades it to a warning.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown login, or a learner with no enrollment records.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed {field} timestamp {value:?}")]
    MalformedDate { field: &'static str, value: String },
    /// Rejected curriculum or estimate tables.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The record source failed to deliver data.
    #[error("record source failure: {0}")]
    Source(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Source(format!("json: {err}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Source(format!("io: {err}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
