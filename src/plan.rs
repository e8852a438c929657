use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{EffortEstimate, EffortTable};
use crate::config::DEFAULT_UNBOUNDED_HORIZON_DAYS;
use crate::deadline::Deadline;
use crate::progress::ProgressState;
use crate::risk::RiskLevel;
use crate::scheduler::{self, Schedule, WeeklyBucket};

const PRIORITY_PROJECT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plan {
    Emergency {
        message: String,
        recommendations: Vec<String>,
    },
    SafeForNow {
        message: String,
        recommendations: Vec<String>,
    },
    Full(FullPlan),
}

impl Plan {
    pub fn recommendations(&self) -> &[String] {
        match self {
            Plan::Emergency { recommendations, .. } | Plan::SafeForNow { recommendations, .. } => {
                recommendations
            }
            Plan::Full(plan) => &plan.recommendations,
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            Plan::Full(plan) => Some(&plan.schedule),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekGoals {
    pub week: u32,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPlan {
    pub deadline: Option<DateTime<Utc>>,
    pub days_remaining: i64,
    pub current_stage: u32,
    pub current_stage_label: String,
    pub next_stage: Option<u32>,
    pub required_projects: usize,
    pub recommended_weekly_pace: u32,
    pub recommended_daily_pace: f64,
    pub feasible: bool,
    pub schedule: Schedule,
    pub weekly_goals: Vec<WeekGoals>,
    pub priority_projects: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Qualitative guidance band for a stage ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageBand {
    Foundations,
    Intermediate,
    Advanced,
}

impl StageBand {
    pub fn of(stage: u32) -> Self {
        match stage {
            0..=2 => StageBand::Foundations,
            3..=4 => StageBand::Intermediate,
            _ => StageBand::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanAssembler {
    unbounded_horizon_days: i64,
}

impl Default for PlanAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_UNBOUNDED_HORIZON_DAYS)
    }
}

impl PlanAssembler {
    pub fn new(unbounded_horizon_days: i64) -> Self {
        Self {
            unbounded_horizon_days,
        }
    }

    pub fn assemble(
        &self,
        deadline: &Deadline,
        progress: &ProgressState,
        risk: RiskLevel,
        efforts: &EffortTable,
    ) -> Plan {
        if deadline.is_past {
            return emergency_plan();
        }
        let days = match deadline.days_remaining {
            Some(days) if days <= self.unbounded_horizon_days => days,
            _ => return safe_for_now_plan(),
        };

        let missing: Vec<EffortEstimate> = progress
            .missing_project_ids
            .iter()
            .map(|id| efforts.estimate(id))
            .collect();
        let required = progress.remaining_required();
        let schedule = scheduler::schedule(&missing, Some(days), required);

        let weekly_pace = weekly_pace(required, days);
        let recommendations = recommendations(risk, progress.current_stage, &schedule);
        let weekly_goals = schedule.buckets.iter().map(week_goals).collect();

        Plan::Full(FullPlan {
            deadline: deadline.instant,
            days_remaining: days,
            current_stage: progress.current_stage,
            current_stage_label: progress.current_stage_label.clone(),
            next_stage: progress.next_stage,
            required_projects: required,
            recommended_weekly_pace: weekly_pace,
            recommended_daily_pace: required as f64 / days.max(1) as f64,
            feasible: schedule.feasible,
            schedule,
            weekly_goals,
            priority_projects: progress
                .missing_project_ids
                .iter()
                .take(PRIORITY_PROJECT_COUNT)
                .cloned()
                .collect(),
            recommendations,
        })
    }
}

fn weekly_pace(required: usize, days: i64) -> u32 {
    let weeks = (days as f64 / 7.0).max(1.0);
    (required as f64 / weeks).ceil() as u32
}

fn emergency_plan() -> Plan {
    Plan::Emergency {
        message: "EMERGENCY: the black hole date has passed.".to_string(),
        recommendations: lines(&[
            "Contact your campus staff immediately",
            "Speak with your assigned tutor or referent",
            "Discuss options for appeal or re-entry",
            "Prepare a detailed progress report",
            "Build a recovery plan with staff guidance",
        ]),
    }
}

fn safe_for_now_plan() -> Plan {
    Plan::SafeForNow {
        message: "No pressing black hole date: you're safe for now.".to_string(),
        recommendations: lines(&[
            "Keep completing projects consistently",
            "Aim for at least one project per week",
            "Pair with peers on the difficult projects",
            "Use the available learning resources",
            "Keep a steady pace to avoid future risk",
        ]),
    }
}

fn recommendations(risk: RiskLevel, stage: u32, schedule: &Schedule) -> Vec<String> {
    let mut out = match risk {
        RiskLevel::BlackHoled | RiskLevel::Critical => lines(&[
            "CRITICAL: maximum effort required",
            "Focus exclusively on the gating projects",
            "Dedicate 6-8 hours a day to coding",
            "Ask staff and peers for help now",
            "Schedule regular check-ins with your tutor",
        ]),
        RiskLevel::High => lines(&[
            "HIGH RISK: significant effort needed",
            "Prioritize project completion over everything else",
            "Dedicate 4-6 hours a day to coding",
            "Form a study group for accountability",
            "Track progress daily",
        ]),
        RiskLevel::Medium => lines(&[
            "MEDIUM RISK: stay consistent and focused",
            "Keep a steady project completion pace",
            "Dedicate 3-4 hours a day to coding",
            "Hold regular peer programming sessions",
            "Review progress weekly",
        ]),
        RiskLevel::Low | RiskLevel::Safe | RiskLevel::Unknown => lines(&[
            "You're on track: keep it consistent",
            "Focus on quality project completion",
            "2-3 hours of focused coding a day",
            "Help peers to reinforce what you learn",
            "Challenge yourself with bonus parts",
        ]),
    };

    if !schedule.feasible {
        out.push(format!(
            "Timeline overflow: {} weeks of work against {} weeks left",
            schedule.weeks_required, schedule.weeks_available
        ));
        out.push("Talk to staff about your deadline before it is too late".to_string());
    }
    if !schedule.dropped.is_empty() {
        out.push(format!(
            "Could not fit before the deadline: {}",
            schedule.dropped.join(", ")
        ));
    }

    out.extend(match StageBand::of(stage) {
        StageBand::Foundations => lines(&[
            "Foundations: master the C fundamentals",
            "Understand every line you submit",
            "Practice with small exercises daily",
        ]),
        StageBand::Intermediate => lines(&[
            "Intermediate: build complete systems",
            "Spend time on architecture and design",
            "Get fluent with debuggers and leak checkers",
        ]),
        StageBand::Advanced => lines(&[
            "Advanced: specialize and go deep",
            "Study the concepts behind each subject",
            "Consider mentoring newer students",
        ]),
    });

    out
}

fn week_goals(bucket: &WeeklyBucket) -> WeekGoals {
    let mut goals: Vec<String> = bucket
        .newly_started()
        .map(|a| {
            if a.total_weeks == 1 {
                format!("Complete {} ({}h)", a.project_id, a.hours_this_week)
            } else {
                format!(
                    "Start {} ({} weeks, {}h this week)",
                    a.project_id, a.total_weeks, a.hours_this_week
                )
            }
        })
        .collect();
    goals.extend(bucket.continuing().map(|a| {
        let verb = if a.week_in_progress == a.total_weeks {
            "Finish"
        } else {
            "Continue"
        };
        format!(
            "{verb} {} (week {} of {}, {}h)",
            a.project_id, a.week_in_progress, a.total_weeks, a.hours_this_week
        )
    }));
    goals.push(format!("Budget {} hours this week", bucket.total_hours));

    WeekGoals {
        week: bucket.week_index,
        goals,
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_estimates, default_fallback_estimate};
    use crate::deadline::DeadlineSource;

    fn efforts() -> EffortTable {
        EffortTable::new(default_estimates(), default_fallback_estimate()).expect("table")
    }

    fn deadline(days: Option<i64>) -> Deadline {
        Deadline {
            instant: None,
            days_remaining: days,
            is_past: days.is_some_and(|d| d <= 0),
            source: if days.is_some() {
                DeadlineSource::Explicit
            } else {
                DeadlineSource::Unknown
            },
        }
    }

    fn progress(stage: u32, missing: &[&str], done: usize, quorum: usize) -> ProgressState {
        ProgressState {
            current_stage: stage,
            current_stage_label: format!("Circle {}", stage - 1),
            next_stage: Some(stage + 1),
            completed_in_current: done,
            required_in_current: quorum,
            missing_project_ids: missing.iter().map(|m| m.to_string()).collect(),
            on_track: done >= quorum,
            highest_stage_reached: stage,
            level: 4.2,
            level_progress: 20.0,
        }
    }

    #[test]
    fn past_deadline_gets_emergency_plan_without_schedule() {
        let plan = PlanAssembler::default().assemble(
            &deadline(Some(-2)),
            &progress(3, &["pipex"], 2, 3),
            RiskLevel::BlackHoled,
            &efforts(),
        );
        assert!(matches!(plan, Plan::Emergency { .. }));
        assert!(plan.schedule().is_none());
        assert!(!plan.recommendations().is_empty());
    }

    #[test]
    fn unknown_or_distant_deadline_is_safe_for_now() {
        let assembler = PlanAssembler::default();
        let state = progress(3, &["pipex"], 2, 3);
        for days in [None, Some(1001), Some(5000)] {
            let plan = assembler.assemble(&deadline(days), &state, RiskLevel::Safe, &efforts());
            assert!(matches!(plan, Plan::SafeForNow { .. }), "days {days:?}");
        }
        let plan = assembler.assemble(&deadline(Some(1000)), &state, RiskLevel::Safe, &efforts());
        assert!(matches!(plan, Plan::Full(_)));
    }

    #[test]
    fn full_plan_schedules_only_what_the_quorum_needs() {
        let plan = PlanAssembler::default().assemble(
            &deadline(Some(50)),
            &progress(3, &["push_swap", "pipex", "minitalk", "fdf", "fract-ol"], 1, 3),
            RiskLevel::High,
            &efforts(),
        );
        let Plan::Full(full) = plan else {
            panic!("expected a full plan");
        };
        assert_eq!(full.required_projects, 2);
        assert_eq!(full.schedule.placed, vec!["push_swap", "pipex"]);
        assert!(full.feasible);
        assert_eq!(full.recommended_weekly_pace, 1);
        assert_eq!(full.priority_projects.len(), 5);
        assert_eq!(full.weekly_goals.len(), full.schedule.buckets.len());
        assert!(full.recommendations[0].starts_with("HIGH RISK"));
        assert!(full
            .recommendations
            .iter()
            .any(|r| r.starts_with("Intermediate")));
        assert!(full.weekly_goals[0].goals[0].starts_with("Start push_swap"));
    }

    #[test]
    fn infeasible_timeline_adds_overflow_warning() {
        let plan = PlanAssembler::default().assemble(
            &deadline(Some(20)),
            &progress(4, &["philosophers", "minishell"], 0, 2),
            RiskLevel::Critical,
            &efforts(),
        );
        let Plan::Full(full) = plan else {
            panic!("expected a full plan");
        };
        assert!(!full.feasible);
        assert_eq!(full.schedule.dropped, vec!["minishell"]);
        assert!(full
            .recommendations
            .iter()
            .any(|r| r.starts_with("Timeline overflow")));
        assert!(full
            .recommendations
            .iter()
            .any(|r| r.contains("minishell")));
    }

    #[test]
    fn stage_bands_split_at_two_and_four() {
        assert_eq!(StageBand::of(1), StageBand::Foundations);
        assert_eq!(StageBand::of(2), StageBand::Foundations);
        assert_eq!(StageBand::of(3), StageBand::Intermediate);
        assert_eq!(StageBand::of(4), StageBand::Intermediate);
        assert_eq!(StageBand::of(5), StageBand::Advanced);
    }
}
