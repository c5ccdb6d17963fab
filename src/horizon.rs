//! The rolling-horizon loop: build, solve, validate, fold into history, week
//! by week. Weeks are strictly sequential; week k's model reads the state week
//! k-1 left behind, so there is nothing to parallelize across weeks.

use log::{error, info, warn};

use crate::data::{History, RuleToggles, Scenario, WeekData, WeekSchedule, DAYS_PER_WEEK};
use crate::engine::{solve_week, SolveOutcome, SolveSettings, SolveStatus};
use crate::error::{ConfigurationConflict, RunError, ValidationFailure};
use crate::history::advance_history;
use crate::model::{build_week_model, BuildInput};
use crate::validator::ScheduleValidator;

/// The one stable failure signal: a run that could not schedule every week
/// carries this aggregate value, whatever the per-week statuses say.
pub const RUN_FAILURE_VALUE: i64 = 99_999;

/// Status, value and (on accepted weeks) the schedule of one horizon week.
#[derive(Debug, Clone)]
pub struct WeekOutcome {
    pub week: u32,
    pub status: SolveStatus,
    pub value: i64,
    pub schedule: Option<WeekSchedule>,
}

/// Result of a whole run; per-week entries stay available even when the run
/// failed partway through.
#[derive(Debug, Clone)]
pub struct HorizonResult {
    pub weeks: Vec<WeekOutcome>,
    pub aggregate_value: i64,
}

impl HorizonResult {
    pub fn failed(&self) -> bool {
        self.aggregate_value == RUN_FAILURE_VALUE
    }

    /// 0/1 lookup by (nurse, global day, shift, skill) across the horizon.
    pub fn assignment(&self, nurse: usize, global_day: usize, shift: usize, skill: usize) -> bool {
        let week = global_day / DAYS_PER_WEEK;
        let day = global_day % DAYS_PER_WEEK;
        self.weeks
            .get(week)
            .and_then(|w| w.schedule.as_ref())
            .map(|s| s.is_assigned(nurse, day, shift, skill))
            .unwrap_or(false)
    }
}

/// Pre-run veto point. The advisory conflict analysis itself lives outside
/// this crate; whatever implements this trait can stop a run before week 0.
pub trait PreflightCheck {
    fn inspect(&self, toggles: &RuleToggles) -> Result<(), ConfigurationConflict>;
}

/// Default solve budget: a base offset plus a linear term per nurse above a
/// baseline roster size, since larger rosters need proportionally more search.
pub fn default_time_budget(nurse_count: usize) -> f64 {
    10.0 + 0.5 * nurse_count.saturating_sub(20) as f64
}

/// Drives a multi-week run over one scenario and toggle set.
pub struct RollingHorizonSolver<'a> {
    scenario: &'a Scenario,
    toggles: &'a RuleToggles,
    time_budget: Option<f64>,
    random_seed: i32,
    preflight: Vec<Box<dyn PreflightCheck>>,
}

impl<'a> RollingHorizonSolver<'a> {
    pub fn new(scenario: &'a Scenario, toggles: &'a RuleToggles) -> Self {
        RollingHorizonSolver {
            scenario,
            toggles,
            time_budget: None,
            random_seed: 1234,
            preflight: Vec::new(),
        }
    }

    pub fn with_time_budget(mut self, seconds: f64) -> Self {
        self.time_budget = Some(seconds);
        self
    }

    pub fn with_random_seed(mut self, seed: i32) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_preflight_check(mut self, check: Box<dyn PreflightCheck>) -> Self {
        self.preflight.push(check);
        self
    }

    /// Runs the horizon. Infeasible or unsolved weeks end the run with the
    /// sentinel aggregate; build errors, preflight conflicts and validator
    /// disagreement abort with a typed error instead.
    pub fn run(
        &self,
        weeks: &[WeekData],
        initial_history: &History,
    ) -> Result<HorizonResult, RunError> {
        for check in &self.preflight {
            check.inspect(self.toggles)?;
        }

        let total_weeks = weeks.len() as u32;
        let validator = ScheduleValidator::new(self.scenario, self.toggles, total_weeks);
        let settings = SolveSettings {
            time_budget: self
                .time_budget
                .unwrap_or_else(|| default_time_budget(self.scenario.nurses.len())),
            random_seed: self.random_seed,
        };

        // the caller's record stays untouched; this copy is the run's state
        let mut history = initial_history.clone();
        let mut outcomes: Vec<WeekOutcome> = Vec::with_capacity(weeks.len());
        let mut failed = false;

        for week in weeks {
            let week_index = history.week;
            info!("Solving week {week_index} of {total_weeks}...");
            let input = BuildInput {
                scenario: self.scenario,
                week,
                history: &history,
                toggles: self.toggles,
                total_weeks,
            };
            let model = build_week_model(&input)?;

            match solve_week(model, &settings) {
                SolveOutcome::Unsolved { status } => {
                    warn!("Week {week_index} ended with {status}; aborting the horizon");
                    outcomes.push(WeekOutcome {
                        week: week_index,
                        status,
                        value: RUN_FAILURE_VALUE,
                        schedule: None,
                    });
                    failed = true;
                    break;
                }
                SolveOutcome::Solved {
                    status,
                    objective,
                    schedule,
                } => {
                    let report = validator.validate_week(week, &history, &schedule);
                    if !report.is_valid() {
                        return Err(ValidationFailure {
                            week: week_index,
                            violations: report.violations,
                        }
                        .into());
                    }
                    let engine_value = objective.round() as i64;
                    if engine_value != report.penalty {
                        error!(
                            "Week {week_index}: engine objective {engine_value} disagrees with \
                             validator score {}; recording the validator's score",
                            report.penalty
                        );
                    }
                    advance_history(&mut history, &schedule, self.toggles);
                    outcomes.push(WeekOutcome {
                        week: week_index,
                        status,
                        value: report.penalty,
                        schedule: Some(schedule),
                    });
                }
            }
        }

        let aggregate_value = if failed {
            RUN_FAILURE_VALUE
        } else {
            let (violations, horizon_penalty) = validator.horizon_totals(&history);
            if !violations.is_empty() {
                return Err(ValidationFailure {
                    week: history.week,
                    violations,
                }
                .into());
            }
            outcomes.iter().map(|w| w.value).sum::<i64>() + horizon_penalty
        };

        info!("Horizon finished with aggregate value {aggregate_value}");
        Ok(HorizonResult {
            weeks: outcomes,
            aggregate_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ShiftTypeId, SkillId};
    use crate::testkit;

    struct RejectEverything;

    impl PreflightCheck for RejectEverything {
        fn inspect(&self, _toggles: &RuleToggles) -> Result<(), ConfigurationConflict> {
            Err(ConfigurationConflict {
                first: "h1".to_string(),
                second: "h10".to_string(),
                reason: "both day rules active".to_string(),
            })
        }
    }

    #[test]
    fn preflight_vetoes_before_any_week_is_built() {
        let scenario = testkit::scenario(1);
        let toggles = RuleToggles::default();
        let solver = RollingHorizonSolver::new(&scenario, &toggles)
            .with_preflight_check(Box::new(RejectEverything));

        let result = solver.run(&[WeekData::default()], &History::fresh(1));
        assert!(matches!(result, Err(RunError::Conflict(_))));
    }

    #[test]
    fn malformed_history_is_a_build_error() {
        let scenario = testkit::scenario(2);
        let toggles = RuleToggles::default();
        let solver = RollingHorizonSolver::new(&scenario, &toggles);

        let result = solver.run(&[WeekData::default()], &History::fresh(1));
        assert!(matches!(result, Err(RunError::Build(_))));
    }

    #[test]
    fn budget_grows_with_the_roster() {
        assert_eq!(default_time_budget(10), 10.0);
        assert_eq!(default_time_budget(20), 10.0);
        assert_eq!(default_time_budget(30), 15.0);
    }

    #[test]
    fn result_lookup_spans_weeks_and_tolerates_failures() {
        let mut schedule = WeekSchedule::empty(1);
        schedule.assign(0, 2, ShiftTypeId::Late.index(), SkillId::Nurse.index());
        let result = HorizonResult {
            weeks: vec![
                WeekOutcome {
                    week: 0,
                    status: SolveStatus::Optimal,
                    value: 0,
                    schedule: Some(schedule),
                },
                WeekOutcome {
                    week: 1,
                    status: SolveStatus::Infeasible,
                    value: RUN_FAILURE_VALUE,
                    schedule: None,
                },
            ],
            aggregate_value: RUN_FAILURE_VALUE,
        };
        assert!(result.failed());
        assert!(result.assignment(0, 2, 2, 1));
        assert!(!result.assignment(0, 9, 2, 1));
        assert!(!result.assignment(0, 70, 0, 0));
    }
}
