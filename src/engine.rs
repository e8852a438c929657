use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::{Catalog, EffortTable};
use crate::config::EngineConfig;
use crate::deadline::DeadlineResolver;
use crate::error::{EngineError, EngineResult};
use crate::models::{completed_projects, CompletedProject, LearnerSnapshot};
use crate::plan::{Plan, PlanAssembler};
use crate::progress::{ProgressMatcher, ProgressState};
use crate::report::{AnalysisReport, LearnerStatus};
use crate::risk;

/// Pure analysis engine over injected curriculum and effort tables.
///
/// Holds no per-learner state, so one instance can serve any number of
/// concurrent analyses.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    efforts: EffortTable,
    resolver: DeadlineResolver,
    assembler: PlanAssembler,
}

impl Engine {
    pub fn new(catalog: Catalog, efforts: EffortTable) -> Self {
        Self {
            catalog,
            efforts,
            resolver: DeadlineResolver::default(),
            assembler: PlanAssembler::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let (catalog, efforts) = config.build_tables()?;
        Ok(Self::new(catalog, efforts)
            .with_grace_period_days(config.grace_period_days)
            .with_unbounded_horizon_days(config.unbounded_horizon_days))
    }

    pub fn with_grace_period_days(mut self, days: i64) -> Self {
        self.resolver = DeadlineResolver::new(days);
        self
    }

    pub fn with_unbounded_horizon_days(mut self, days: i64) -> Self {
        self.assembler = PlanAssembler::new(days);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn efforts(&self) -> &EffortTable {
        &self.efforts
    }

    /// Stage progress from client-supplied completions, without any fetch.
    pub fn stage_progress(&self, completed: &[CompletedProject], level: f64) -> ProgressState {
        ProgressMatcher::new(&self.catalog).stage_progress(completed, level)
    }

    /// Full analysis of one pre-fetched snapshot.
    pub fn assess(&self, snapshot: &LearnerSnapshot, now: DateTime<Utc>) -> EngineResult<AnalysisReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("assess", %run_id, login = %snapshot.user.login);
        let _guard = span.enter();

        let enrollment = snapshot.main_enrollment().ok_or_else(|| {
            EngineError::NotFound(format!("no enrollment data for {}", snapshot.user.login))
        })?;

        let resolution = self.resolver.resolve(
            enrollment.blackholed_at.as_deref(),
            enrollment.begin_at.as_deref(),
            now,
        );
        let mut warnings = resolution.warnings;
        let deadline = resolution.deadline;

        let level = if enrollment.level.is_finite() {
            enrollment.level
        } else {
            tracing::warn!(login = %snapshot.user.login, "ignoring non-finite level");
            warnings.push(format!("non-finite level {} treated as 0", enrollment.level));
            0.0
        };

        let completed = completed_projects(&snapshot.projects);
        let progress = self.stage_progress(&completed, level);
        let risk_level = risk::classify(
            deadline.days_remaining,
            progress.on_track,
            progress.current_stage,
            level,
        );
        let plan = self
            .assembler
            .assemble(&deadline, &progress, risk_level, &self.efforts);
        self.check_plan(&plan)?;

        tracing::info!(
            login = %snapshot.user.login,
            stage = progress.current_stage,
            risk = %risk_level,
            days_remaining = ?deadline.days_remaining,
            "analysis complete"
        );

        Ok(AnalysisReport {
            run_id,
            generated_at: now,
            status: LearnerStatus {
                login: snapshot.user.login.clone(),
                display_name: snapshot.user.displayname.clone(),
                cursus: enrollment.cursus_name.clone(),
                level,
                begin_at: enrollment.begin_at.clone(),
                blackholed_at: enrollment.blackholed_at.clone(),
                total_completed: completed.len(),
                risk_level,
                deadline,
                progress,
                warnings,
            },
            plan,
        })
    }

    /// Every placed project must carry exactly its estimated hours over an unbroken run.
    fn check_plan(&self, plan: &Plan) -> EngineResult<()> {
        let Some(schedule) = plan.schedule() else {
            return Ok(());
        };
        for project in &schedule.placed {
            let weeks: Vec<(u32, u32)> = schedule
                .buckets
                .iter()
                .flat_map(|bucket| {
                    bucket
                        .assigned_projects
                        .iter()
                        .filter(|a| &a.project_id == project)
                        .map(move |a| (bucket.week_index, a.hours_this_week))
                })
                .collect();
            let estimate = self.efforts.estimate(project);
            let hours: u32 = weeks.iter().map(|(_, hours)| hours).sum();
            let unbroken = weeks.windows(2).all(|pair| pair[1].0 == pair[0].0 + 1);
            if hours != estimate.hours || weeks.len() != estimate.weeks as usize || !unbroken {
                return Err(EngineError::Internal(format!(
                    "schedule for {project} does not match its estimate"
                )));
            }
        }
        Ok(())
    }
}
