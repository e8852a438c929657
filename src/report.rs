use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deadline::Deadline;
use crate::plan::Plan;
use crate::progress::ProgressState;
use crate::risk::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerStatus {
    pub login: String,
    pub display_name: Option<String>,
    pub cursus: String,
    pub level: f64,
    pub begin_at: Option<String>,
    pub blackholed_at: Option<String>,
    pub total_completed: usize,
    pub risk_level: RiskLevel,
    pub deadline: Deadline,
    pub progress: ProgressState,
    /// Degraded inputs that were skipped, such as unparsable timestamps.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub status: LearnerStatus,
    pub plan: Plan,
}

pub fn build_report(report: &AnalysisReport) -> String {
    let status = &report.status;
    let progress = &status.progress;
    let mut output = String::new();

    let _ = writeln!(output, "# Black Hole Escape Plan");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        status.display_name.as_deref().unwrap_or(&status.login),
        status.cursus,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status");
    let _ = writeln!(output, "- Risk level: {}", status.risk_level);
    let _ = writeln!(
        output,
        "- Level: {:.2} ({:.1}% into the current level)",
        status.level, progress.level_progress
    );
    match (status.deadline.instant, status.deadline.days_remaining) {
        (Some(instant), Some(days)) => {
            let _ = writeln!(
                output,
                "- Black hole date: {} ({} days remaining)",
                instant.format("%Y-%m-%d"),
                days
            );
        }
        _ => {
            let _ = writeln!(output, "- Black hole date: not set");
        }
    }
    let _ = writeln!(output, "- Projects completed: {}", status.total_completed);
    let _ = writeln!(
        output,
        "- Stage: {} ({}/{} gating projects done)",
        progress.current_stage_label, progress.completed_in_current, progress.required_in_current
    );

    if !status.warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Data Warnings");
        for warning in &status.warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Plan");

    match &report.plan {
        Plan::Emergency { message, .. } | Plan::SafeForNow { message, .. } => {
            let _ = writeln!(output, "{message}");
        }
        Plan::Full(plan) => {
            let _ = writeln!(
                output,
                "{} gating projects to finish, about {} per week ({:.2} per day).",
                plan.required_projects, plan.recommended_weekly_pace, plan.recommended_daily_pace
            );
            let _ = writeln!(
                output,
                "Timeline: {} weeks of work, {} weeks available ({}).",
                plan.schedule.weeks_required,
                plan.schedule.weeks_available,
                if plan.feasible { "feasible" } else { "not feasible" }
            );

            if plan.weekly_goals.is_empty() {
                let _ = writeln!(output, "No weekly schedule could be built.");
            }
            for week in &plan.weekly_goals {
                let _ = writeln!(output);
                let _ = writeln!(output, "### Week {}", week.week);
                for goal in &week.goals {
                    let _ = writeln!(output, "- {goal}");
                }
            }

            if !plan.priority_projects.is_empty() {
                let _ = writeln!(output);
                let _ = writeln!(output, "## Priority Projects");
                for (rank, project) in plan.priority_projects.iter().enumerate() {
                    let _ = writeln!(output, "{}. {project}", rank + 1);
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for recommendation in report.plan.recommendations() {
        let _ = writeln!(output, "- {recommendation}");
    }

    output
}

/// Progress-only rendering for what-if data.
pub fn build_progress_summary(progress: &ProgressState) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Current stage: {} (stage {})",
        progress.current_stage_label, progress.current_stage
    );
    let _ = writeln!(
        output,
        "Gating projects: {}/{} ({})",
        progress.completed_in_current,
        progress.required_in_current,
        if progress.on_track { "on track" } else { "behind" }
    );
    match progress.next_stage {
        Some(next) => {
            let _ = writeln!(output, "Next stage: {next}");
        }
        None => {
            let _ = writeln!(output, "Next stage: none (final stage)");
        }
    }
    if progress.missing_project_ids.is_empty() {
        let _ = writeln!(output, "Missing: nothing");
    } else {
        let _ = writeln!(output, "Missing: {}", progress.missing_project_ids.join(", "));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> ProgressState {
        ProgressState {
            current_stage: 2,
            current_stage_label: "Circle 1".to_string(),
            next_stage: Some(3),
            completed_in_current: 1,
            required_in_current: 3,
            missing_project_ids: vec!["get_next_line".to_string(), "born2beroot".to_string()],
            on_track: false,
            highest_stage_reached: 2,
            level: 1.5,
            level_progress: 50.0,
        }
    }

    fn report(plan: Plan, warnings: Vec<String>) -> AnalysisReport {
        AnalysisReport {
            run_id: Uuid::nil(),
            generated_at: DateTime::from_timestamp(1_704_067_200, 0).expect("timestamp"),
            status: LearnerStatus {
                login: "avery".to_string(),
                display_name: Some("Avery Lee".to_string()),
                cursus: "42cursus".to_string(),
                level: 1.5,
                begin_at: None,
                blackholed_at: None,
                total_completed: 2,
                risk_level: RiskLevel::Unknown,
                deadline: Deadline::unknown(),
                progress: progress(),
                warnings,
            },
            plan,
        }
    }

    #[test]
    fn renders_terminal_plans() {
        let text = build_report(&report(
            Plan::SafeForNow {
                message: "safe for now".to_string(),
                recommendations: vec!["keep going".to_string()],
            },
            Vec::new(),
        ));
        assert!(text.contains("Generated for Avery Lee (42cursus) on 2024-01-01"));
        assert!(text.contains("- Risk level: UNKNOWN"));
        assert!(text.contains("- Black hole date: not set"));
        assert!(text.contains("safe for now"));
        assert!(text.contains("- keep going"));
        assert!(!text.contains("Data Warnings"));
    }

    #[test]
    fn lists_data_warnings() {
        let text = build_report(&report(
            Plan::Emergency {
                message: "gone".to_string(),
                recommendations: Vec::new(),
            },
            vec!["malformed blackholed_at timestamp \"soon\"".to_string()],
        ));
        assert!(text.contains("## Data Warnings"));
        assert!(text.contains("soon"));
    }

    #[test]
    fn serializes_plan_kind_tag() {
        let json = serde_json::to_value(report(
            Plan::Emergency {
                message: "gone".to_string(),
                recommendations: Vec::new(),
            },
            Vec::new(),
        ))
        .expect("json");
        assert_eq!(json["plan"]["kind"], "emergency");
        assert_eq!(json["status"]["risk_level"], "UNKNOWN");
        assert_eq!(json["status"]["deadline"]["source"], "unknown");
    }

    #[test]
    fn progress_summary_lists_missing_projects() {
        let text = build_progress_summary(&progress());
        assert!(text.contains("Circle 1 (stage 2)"));
        assert!(text.contains("1/3 (behind)"));
        assert!(text.contains("Missing: get_next_line, born2beroot"));
    }
}
