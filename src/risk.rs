use std::fmt;

use serde::{Deserialize, Serialize};

/// Urgency tiers, most urgent first. `Unknown` means no deadline is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    BlackHoled,
    Critical,
    High,
    Medium,
    Low,
    Safe,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::BlackHoled => "BLACK_HOLED",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
            RiskLevel::Safe => "SAFE",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First matching rule wins; the day-based tiers always shadow the
/// progress-based ones.
pub fn classify(days_remaining: Option<i64>, on_track: bool, stage: u32, level: f64) -> RiskLevel {
    let Some(days) = days_remaining else {
        return RiskLevel::Unknown;
    };

    match days {
        d if d <= 0 => RiskLevel::BlackHoled,
        d if d <= 30 => RiskLevel::Critical,
        d if d <= 60 => RiskLevel::High,
        d if d <= 90 => RiskLevel::Medium,
        d if d <= 180 && !on_track => RiskLevel::Low,
        d if stage <= 2 && level < 3.0 && d <= 270 => RiskLevel::Low,
        _ => RiskLevel::Safe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_day_thresholds() {
        assert_eq!(classify(None, true, 1, 0.0), RiskLevel::Unknown);
        assert_eq!(classify(Some(-3), true, 5, 10.0), RiskLevel::BlackHoled);
        assert_eq!(classify(Some(0), true, 5, 10.0), RiskLevel::BlackHoled);
        assert_eq!(classify(Some(1), true, 5, 10.0), RiskLevel::Critical);
        assert_eq!(classify(Some(30), true, 5, 10.0), RiskLevel::Critical);
        assert_eq!(classify(Some(31), true, 5, 10.0), RiskLevel::High);
        assert_eq!(classify(Some(60), true, 5, 10.0), RiskLevel::High);
        assert_eq!(classify(Some(61), true, 5, 10.0), RiskLevel::Medium);
        assert_eq!(classify(Some(90), true, 5, 10.0), RiskLevel::Medium);
        assert_eq!(classify(Some(91), true, 5, 10.0), RiskLevel::Safe);
    }

    #[test]
    fn day_tiers_take_precedence_over_progress() {
        assert_eq!(classify(Some(45), true, 5, 10.0), RiskLevel::High);
        assert_eq!(classify(Some(45), false, 1, 0.5), RiskLevel::High);
    }

    #[test]
    fn off_track_learners_are_low_within_half_a_year() {
        assert_eq!(classify(Some(150), false, 5, 10.0), RiskLevel::Low);
        assert_eq!(classify(Some(180), false, 5, 10.0), RiskLevel::Low);
        assert_eq!(classify(Some(181), false, 5, 10.0), RiskLevel::Safe);
    }

    #[test]
    fn early_stage_beginners_are_low_within_270_days() {
        assert_eq!(classify(Some(200), true, 2, 2.9), RiskLevel::Low);
        assert_eq!(classify(Some(200), false, 1, 0.0), RiskLevel::Low);
        assert_eq!(classify(Some(271), true, 2, 2.9), RiskLevel::Safe);
        assert_eq!(classify(Some(200), true, 3, 2.9), RiskLevel::Safe);
        assert_eq!(classify(Some(200), true, 2, 3.0), RiskLevel::Safe);
    }

    #[test]
    fn ordering_runs_from_most_to_least_urgent() {
        assert!(RiskLevel::BlackHoled < RiskLevel::Critical);
        assert!(RiskLevel::Low < RiskLevel::Safe);
        assert!(RiskLevel::Safe < RiskLevel::Unknown);
        assert_eq!(
            serde_json::to_string(&RiskLevel::BlackHoled).unwrap(),
            "\"BLACK_HOLED\""
        );
    }
}
