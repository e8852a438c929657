//! Deadline-bounded weekly scheduler.
//!
//! # Algorithm
//!
//! 1. `weeks_available = ceil(days_remaining / 7)`; no time left means an
//!    empty, infeasible schedule.
//! 2. Keep the first `required_count` projects (curriculum priority), then
//!    stable-sort them by duration, longest first.
//! 3. Walk a week cursor from 1. A project occupies the consecutive weeks
//!    `[cursor, cursor + weeks - 1]` if they end inside the horizon, otherwise
//!    it is dropped and the next project is tried.
//!
//! Feasibility compares the ideal total duration with the horizon and is
//! independent of what the placement loop managed to fit.

use serde::{Deserialize, Serialize};

use crate::catalog::{Difficulty, EffortEstimate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekAssignment {
    pub project_id: String,
    pub hours_this_week: u32,
    /// 1-based position of this week within the project's run.
    pub week_in_progress: u32,
    pub total_weeks: u32,
    pub difficulty: Difficulty,
}

impl WeekAssignment {
    pub fn starts_this_week(&self) -> bool {
        self.week_in_progress == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_index: u32,
    pub assigned_projects: Vec<WeekAssignment>,
    pub total_hours: u32,
}

impl WeeklyBucket {
    fn new(week_index: u32) -> Self {
        Self {
            week_index,
            assigned_projects: Vec::new(),
            total_hours: 0,
        }
    }

    fn push(&mut self, assignment: WeekAssignment) {
        self.total_hours = self.total_hours.saturating_add(assignment.hours_this_week);
        self.assigned_projects.push(assignment);
    }

    pub fn newly_started(&self) -> impl Iterator<Item = &WeekAssignment> {
        self.assigned_projects.iter().filter(|a| a.starts_this_week())
    }

    pub fn continuing(&self) -> impl Iterator<Item = &WeekAssignment> {
        self.assigned_projects.iter().filter(|a| !a.starts_this_week())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub weeks_available: u32,
    /// Sum of the selected projects' durations, ignoring the horizon.
    pub weeks_required: u32,
    pub buckets: Vec<WeeklyBucket>,
    pub placed: Vec<String>,
    /// Selected projects that did not fit; they stay outstanding.
    pub dropped: Vec<String>,
    pub feasible: bool,
}

impl Schedule {
    fn empty(weeks_required: u32, dropped: Vec<String>) -> Self {
        Self {
            weeks_available: 0,
            weeks_required,
            buckets: Vec::new(),
            placed: Vec::new(),
            dropped,
            feasible: false,
        }
    }

    pub fn total_hours(&self) -> u32 {
        self.buckets
            .iter()
            .fold(0u32, |total, bucket| total.saturating_add(bucket.total_hours))
    }
}

pub fn weeks_available(days_remaining: Option<i64>) -> Option<u32> {
    match days_remaining {
        Some(days) if days > 0 => {
            let weeks = (days + 6) / 7;
            Some(u32::try_from(weeks).unwrap_or(u32::MAX))
        }
        _ => None,
    }
}

/// Splits `hours` over `weeks` as evenly as integers allow; earlier weeks take the remainder.
pub fn split_hours(hours: u32, weeks: u32) -> Vec<u32> {
    if weeks == 0 {
        return Vec::new();
    }
    let base = hours / weeks;
    let extra = hours % weeks;
    (0..weeks).map(|week| base + u32::from(week < extra)).collect()
}

pub fn schedule(
    projects: &[EffortEstimate],
    days_remaining: Option<i64>,
    required_count: usize,
) -> Schedule {
    match weeks_available(days_remaining) {
        Some(weeks) => schedule_weeks(projects, weeks, required_count),
        None => {
            let selected = &projects[..required_count.min(projects.len())];
            tracing::debug!(?days_remaining, "no time left to schedule");
            Schedule::empty(
                total_weeks(selected),
                selected.iter().map(|p| p.project_id.clone()).collect(),
            )
        }
    }
}

pub fn schedule_weeks(
    projects: &[EffortEstimate],
    weeks_available: u32,
    required_count: usize,
) -> Schedule {
    let mut selected: Vec<&EffortEstimate> =
        projects.iter().take(required_count).collect();
    let weeks_required = total_weeks(selected.iter().copied());
    selected.sort_by(|a, b| b.weeks.cmp(&a.weeks));

    let mut buckets: Vec<WeeklyBucket> = Vec::new();
    let mut placed = Vec::new();
    let mut dropped = Vec::new();
    // Widened so a cursor near u32::MAX cannot wrap.
    let mut week: u64 = 1;

    for project in selected {
        if week > u64::from(weeks_available) {
            dropped.push(project.project_id.clone());
            continue;
        }
        let last_week = week + u64::from(project.weeks) - 1;
        if last_week > u64::from(weeks_available) {
            tracing::debug!(
                project = %project.project_id,
                weeks = project.weeks,
                cursor = week,
                "project does not fit before the deadline"
            );
            dropped.push(project.project_id.clone());
            continue;
        }

        for (offset, hours) in split_hours(project.hours, project.weeks).into_iter().enumerate() {
            let index = week as usize + offset;
            if buckets.len() < index {
                buckets.push(WeeklyBucket::new(index as u32));
            }
            buckets[index - 1].push(WeekAssignment {
                project_id: project.project_id.clone(),
                hours_this_week: hours,
                week_in_progress: offset as u32 + 1,
                total_weeks: project.weeks,
                difficulty: project.difficulty,
            });
        }
        placed.push(project.project_id.clone());
        week = last_week + 1;
    }

    Schedule {
        weeks_available,
        weeks_required,
        buckets,
        placed,
        dropped,
        feasible: weeks_required <= weeks_available,
    }
}

fn total_weeks<'a>(projects: impl IntoIterator<Item = &'a EffortEstimate>) -> u32 {
    projects
        .into_iter()
        .fold(0, |total: u32, p| total.saturating_add(p.weeks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, weeks: u32, hours: u32) -> EffortEstimate {
        EffortEstimate::new(id, weeks, hours, Difficulty::Medium)
    }

    #[test]
    fn overflowing_plan_is_infeasible_and_drops_a_project() {
        let projects = vec![project("A", 3, 60), project("B", 1, 20), project("C", 2, 40)];
        let schedule = schedule_weeks(&projects, 4, 3);

        assert!(!schedule.feasible);
        assert_eq!(schedule.weeks_required, 6);
        assert_eq!(schedule.placed, vec!["A", "B"]);
        assert_eq!(schedule.dropped, vec!["C"]);
        assert_eq!(schedule.buckets.len(), 4);
        assert_eq!(schedule.buckets[3].assigned_projects[0].project_id, "B");
    }

    #[test]
    fn short_projects_fill_consecutive_weeks() {
        let projects = vec![project("A", 1, 20), project("B", 1, 25)];
        let schedule = schedule_weeks(&projects, 4, 2);

        assert!(schedule.feasible);
        assert!(schedule.dropped.is_empty());
        assert_eq!(schedule.buckets.len(), 2);
        assert_eq!(schedule.buckets[0].week_index, 1);
        assert_eq!(schedule.buckets[0].assigned_projects[0].project_id, "A");
        assert_eq!(schedule.buckets[1].week_index, 2);
        assert_eq!(schedule.buckets[1].assigned_projects[0].project_id, "B");
    }

    #[test]
    fn longest_projects_go_first_with_stable_ties() {
        let projects = vec![
            project("short", 1, 10),
            project("long", 3, 30),
            project("mid-a", 2, 20),
            project("mid-b", 2, 20),
        ];
        let schedule = schedule_weeks(&projects, 20, 4);
        assert_eq!(schedule.placed, vec!["long", "mid-a", "mid-b", "short"]);
        assert_eq!(schedule.buckets.len(), 8);
    }

    #[test]
    fn only_required_count_projects_are_considered() {
        let projects = vec![project("A", 1, 10), project("B", 1, 10), project("C", 5, 10)];
        let schedule = schedule_weeks(&projects, 2, 2);
        assert!(schedule.feasible);
        assert_eq!(schedule.placed, vec!["A", "B"]);
        assert!(!schedule.placed.contains(&"C".to_string()));
    }

    #[test]
    fn hours_are_split_evenly_and_sum_to_estimate() {
        let projects = vec![project("minishell", 3, 40)];
        let schedule = schedule_weeks(&projects, 5, 1);
        let hours: Vec<u32> = schedule
            .buckets
            .iter()
            .map(|b| b.assigned_projects[0].hours_this_week)
            .collect();
        assert_eq!(hours, vec![14, 13, 13]);
        assert_eq!(schedule.total_hours(), 40);
        assert_eq!(split_hours(40, 4), vec![10, 10, 10, 10]);
    }

    #[test]
    fn buckets_are_contiguous_and_runs_unbroken() {
        let projects = vec![project("A", 2, 20), project("B", 3, 30), project("C", 1, 5)];
        let schedule = schedule_weeks(&projects, 10, 3);
        for (index, bucket) in schedule.buckets.iter().enumerate() {
            assert_eq!(bucket.week_index as usize, index + 1);
        }
        let weeks_of_a: Vec<u32> = schedule
            .buckets
            .iter()
            .filter(|b| b.assigned_projects.iter().any(|a| a.project_id == "A"))
            .map(|b| b.week_index)
            .collect();
        assert_eq!(weeks_of_a, vec![4, 5]);
    }

    #[test]
    fn distinguishes_new_and_continuing_work() {
        let projects = vec![project("A", 2, 20)];
        let schedule = schedule_weeks(&projects, 3, 1);
        assert_eq!(schedule.buckets[0].newly_started().count(), 1);
        assert_eq!(schedule.buckets[1].newly_started().count(), 0);
        assert_eq!(schedule.buckets[1].continuing().count(), 1);
    }

    #[test]
    fn no_time_left_yields_empty_infeasible_schedule() {
        let projects = vec![project("A", 1, 10)];
        for days in [None, Some(0), Some(-4)] {
            let schedule = schedule(&projects, days, 1);
            assert!(!schedule.feasible);
            assert!(schedule.buckets.is_empty());
            assert_eq!(schedule.dropped, vec!["A"]);
        }
    }

    #[test]
    fn partial_weeks_round_up() {
        assert_eq!(weeks_available(Some(1)), Some(1));
        assert_eq!(weeks_available(Some(7)), Some(1));
        assert_eq!(weeks_available(Some(8)), Some(2));
        assert_eq!(weeks_available(Some(28)), Some(4));
        assert_eq!(weeks_available(Some(0)), None);
    }

    #[test]
    fn extreme_durations_saturate_instead_of_overflowing() {
        let projects = vec![project("huge", u32::MAX, u32::MAX), project("small", 2, 20)];
        let schedule = schedule_weeks(&projects, 4, 2);
        assert_eq!(schedule.weeks_required, u32::MAX);
        assert!(!schedule.feasible);
        assert_eq!(schedule.dropped, vec!["huge"]);
        assert_eq!(schedule.placed, vec!["small"]);

        let wide = schedule_weeks(&[project("long", 3, 30)], u32::MAX, 1);
        assert_eq!(wide.placed, vec!["long"]);
        assert_eq!(wide.total_hours(), 30);
    }

    #[test]
    fn nothing_required_is_trivially_feasible() {
        let schedule = schedule(&[project("A", 1, 10)], Some(30), 0);
        assert!(schedule.feasible);
        assert!(schedule.buckets.is_empty());
    }
}
