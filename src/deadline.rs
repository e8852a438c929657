use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSource {
    Explicit,
    /// Stage start plus the grace period.
    Computed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub instant: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub is_past: bool,
    pub source: DeadlineSource,
}

impl Deadline {
    pub fn unknown() -> Self {
        Self {
            instant: None,
            days_remaining: None,
            is_past: false,
            source: DeadlineSource::Unknown,
        }
    }

    fn at(instant: DateTime<Utc>, now: DateTime<Utc>, source: DeadlineSource) -> Self {
        let days = days_between(now, instant);
        Self {
            instant: Some(instant),
            days_remaining: Some(days),
            is_past: days <= 0,
            source,
        }
    }
}

/// Resolved deadline plus the malformed inputs that were skipped to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub deadline: Deadline,
    pub warnings: Vec<String>,
}

/// Whole days from `now` to `deadline`, rounded toward negative infinity.
pub fn days_between(now: DateTime<Utc>, deadline: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Parses RFC 3339 timestamps; offset-less timestamps are read as UTC.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, EngineError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| EngineError::MalformedDate {
            field,
            value: raw.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineResolver {
    /// `None` when the day count does not fit a `TimeDelta`.
    grace_period: Option<TimeDelta>,
}

impl DeadlineResolver {
    pub fn new(grace_period_days: i64) -> Self {
        Self {
            grace_period: TimeDelta::try_days(grace_period_days),
        }
    }

    /// Explicit deadline first, then start plus grace period, else unknown.
    ///
    /// Unparsable fields are treated as absent; each one is logged and
    /// reported in [`Resolution::warnings`].
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        start: Option<&str>,
        now: DateTime<Utc>,
    ) -> Resolution {
        let mut warnings = Vec::new();

        if let Some(instant) = explicit.and_then(|raw| parse_or_warn("blackholed_at", raw, &mut warnings)) {
            return Resolution {
                deadline: Deadline::at(instant, now, DeadlineSource::Explicit),
                warnings,
            };
        }

        if let Some(begin) = start.and_then(|raw| parse_or_warn("begin_at", raw, &mut warnings)) {
            match self.grace_period.and_then(|grace| begin.checked_add_signed(grace)) {
                Some(deadline) => {
                    return Resolution {
                        deadline: Deadline::at(deadline, now, DeadlineSource::Computed),
                        warnings,
                    };
                }
                None => {
                    tracing::warn!(begin_at = %begin, "grace period overflows the calendar");
                    warnings.push(format!(
                        "begin_at {begin} plus the grace period is out of range"
                    ));
                }
            }
        }

        Resolution {
            deadline: Deadline::unknown(),
            warnings,
        }
    }
}

impl Default for DeadlineResolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GRACE_PERIOD_DAYS)
    }
}

fn parse_or_warn(
    field: &'static str,
    raw: &str,
    warnings: &mut Vec<String>,
) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return None;
    }
    match parse_timestamp(field, raw) {
        Ok(instant) => Some(instant),
        Err(err) => {
            tracing::warn!(field, value = raw, "ignoring unparsable timestamp");
            warnings.push(err.to_string());
            None
        }
    }
}
