use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use log::info;

use crate::calendar::Boundary;
use crate::data::{
    Contract, History, Nurse, RuleToggles, Scenario, ShiftType, ShiftTypeId, WeekData,
    DAYS_PER_WEEK, SKILL_COUNT, WORKING_SHIFTS,
};
use crate::error::ModelBuildError;
use crate::hard_rules;
use crate::soft_rules;

/// Everything one week's model is built from. Immutable during the build;
/// the history reference is the orchestrator's single mutable record.
pub struct BuildInput<'a> {
    pub scenario: &'a Scenario,
    pub week: &'a WeekData,
    pub history: &'a History,
    pub toggles: &'a RuleToggles,
    pub total_weeks: u32,
}

impl<'a> BuildInput<'a> {
    /// Rejects malformed input shapes up front so rule contributions never fail.
    pub fn check(&self) -> Result<(), ModelBuildError> {
        let count = self.scenario.nurses.len();
        if self.history.nurse_states.len() != count {
            return Err(ModelBuildError::HistoryLengthMismatch {
                history: self.history.nurse_states.len(),
                scenario: count,
            });
        }
        if self.history.week >= self.total_weeks {
            return Err(ModelBuildError::WeekOutOfHorizon {
                week: self.history.week,
                total_weeks: self.total_weeks,
            });
        }
        for nurse in &self.scenario.nurses {
            if self.scenario.contract_of(nurse).is_none() {
                return Err(ModelBuildError::UnknownContract {
                    nurse: nurse.id,
                    contract: nurse.contract,
                });
            }
        }
        for shift in 0..WORKING_SHIFTS {
            let id = ShiftTypeId::from_index(shift).unwrap();
            if self.scenario.shift_type(id).is_none() {
                return Err(ModelBuildError::UnknownShiftType { shift: id });
            }
        }
        for req in &self.week.coverage {
            if !req.shift.is_working() {
                return Err(ModelBuildError::NonWorkingCoverageShift { shift: req.shift });
            }
        }
        for request in &self.week.shift_off_requests {
            if request.nurse >= count {
                return Err(ModelBuildError::UnknownNurse {
                    nurse: request.nurse,
                    count,
                });
            }
        }
        for &nurse in &self.week.vacations {
            if nurse >= count {
                return Err(ModelBuildError::UnknownNurse { nurse, count });
            }
        }
        Ok(())
    }

    pub fn nurse_count(&self) -> usize {
        self.scenario.nurses.len()
    }

    pub fn nurse(&self, nurse: usize) -> &Nurse {
        &self.scenario.nurses[nurse]
    }

    pub fn contract(&self, nurse: usize) -> &Contract {
        // present after check()
        self.scenario.contract_of(self.nurse(nurse)).unwrap()
    }

    pub fn shift_type(&self, shift: usize) -> &ShiftType {
        self.scenario
            .shift_type(ShiftTypeId::from_index(shift).unwrap())
            .unwrap()
    }

    pub fn on_vacation(&self, nurse: usize) -> bool {
        self.toggles.vacations && self.week.vacations.contains(&nurse)
    }

    /// Nurses subject to per-nurse rules this week; vacationers are exempt.
    pub fn active_nurses(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nurse_count()).filter(|&n| !self.on_vacation(n))
    }

    pub fn boundary(&self, nurse: usize) -> Boundary<'_> {
        Boundary::new(&self.history.nurse_states[nurse])
    }

    /// Weeks of the horizon covered once this week is solved.
    pub fn elapsed_weeks(&self) -> u32 {
        self.history.week + 1
    }
}

/// One hard or soft rule contributing to the week model. The registry walks
/// these in catalog order; a disabled rule contributes nothing.
pub trait ModelRule {
    fn name(&self) -> &'static str;
    fn enabled(&self, toggles: &RuleToggles) -> bool;
    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel);
}

/// The drafted week model: decision variables, collected constraints and the
/// penalty objective, still detached from any solver.
pub struct WeekModel {
    pub(crate) problem: ProblemVariables,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Expression,
    pub(crate) assignment: Vec<Variable>,
    pub(crate) assignment_skill: Vec<Variable>,
    pub(crate) working_day: Vec<Variable>,
    pub(crate) nurse_count: usize,
    pub(crate) penalty_terms: usize,
}

impl WeekModel {
    /// Allocates the decision variables and links them: skills sum to their
    /// shift indicator, the working-day indicator is the OR of the day's shifts.
    fn with_base(nurse_count: usize) -> WeekModel {
        let mut problem = ProblemVariables::new();
        let assignment = problem.add_vector(
            variable().binary(),
            nurse_count * DAYS_PER_WEEK * WORKING_SHIFTS,
        );
        let assignment_skill = problem.add_vector(
            variable().binary(),
            nurse_count * DAYS_PER_WEEK * WORKING_SHIFTS * SKILL_COUNT,
        );
        let working_day = problem.add_vector(variable().binary(), nurse_count * DAYS_PER_WEEK);

        let mut model = WeekModel {
            problem,
            constraints: Vec::new(),
            objective: Expression::default(),
            assignment,
            assignment_skill,
            working_day,
            nurse_count,
            penalty_terms: 0,
        };

        for n in 0..nurse_count {
            for d in 0..DAYS_PER_WEEK {
                let mut day_total = Expression::default();
                let work = model.work_var(n, d);
                for s in 0..WORKING_SHIFTS {
                    let shift = model.shift_var(n, d, s);
                    let skills: Expression =
                        (0..SKILL_COUNT).map(|sk| model.skill_var(n, d, s, sk)).sum();
                    model.add(constraint!(skills == shift));
                    model.add(constraint!(work >= shift));
                    day_total += shift;
                }
                model.add(constraint!(work <= day_total));
            }
        }
        model
    }

    pub fn shift_var(&self, nurse: usize, day: usize, shift: usize) -> Variable {
        self.assignment[(nurse * DAYS_PER_WEEK + day) * WORKING_SHIFTS + shift]
    }

    pub fn skill_var(&self, nurse: usize, day: usize, shift: usize, skill: usize) -> Variable {
        self.assignment_skill
            [((nurse * DAYS_PER_WEEK + day) * WORKING_SHIFTS + shift) * SKILL_COUNT + skill]
    }

    pub fn work_var(&self, nurse: usize, day: usize) -> Variable {
        self.working_day[nurse * DAYS_PER_WEEK + day]
    }

    /// Sum of the working-day indicators over an in-week day range.
    pub fn work_sum(&self, nurse: usize, days: std::ops::Range<usize>) -> Expression {
        days.map(|d| self.work_var(nurse, d)).sum()
    }

    /// Sum of one shift type's indicators over an in-week day range.
    pub fn shift_sum(&self, nurse: usize, shift: usize, days: std::ops::Range<usize>) -> Expression {
        days.map(|d| self.shift_var(nurse, d, shift)).sum()
    }

    /// All shift assignments of one day.
    pub fn day_shifts(&self, nurse: usize, day: usize) -> Expression {
        (0..WORKING_SHIFTS).map(|s| self.shift_var(nurse, day, s)).sum()
    }

    /// All shift assignments of the week for one nurse.
    pub fn total_assignments(&self, nurse: usize) -> Expression {
        (0..DAYS_PER_WEEK).map(|d| self.day_shifts(nurse, d)).sum::<Expression>()
    }

    /// Heads on one (day, shift, skill) slot across all nurses.
    pub fn coverage_sum(&self, day: usize, shift: usize, skill: usize) -> Expression {
        (0..self.nurse_count)
            .map(|n| self.skill_var(n, day, shift, skill))
            .sum()
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Fresh non-negative magnitude variable for a soft-rule violation.
    pub fn violation_var(&mut self) -> Variable {
        self.problem.add(variable().min(0.0))
    }

    pub fn indicator_var(&mut self) -> Variable {
        self.problem.add(variable().binary())
    }

    /// Adds `weight * magnitude` to the objective.
    pub fn penalize(&mut self, weight: i64, magnitude: Expression) {
        self.objective += weight as f64 * magnitude;
        self.penalty_terms += 1;
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn penalty_term_count(&self) -> usize {
        self.penalty_terms
    }

    pub fn nurse_count(&self) -> usize {
        self.nurse_count
    }
}

/// The rule catalog in evaluation order: hard rules first, then the penalties.
pub fn rule_registry() -> Vec<Box<dyn ModelRule>> {
    vec![
        Box::new(hard_rules::SingleShiftPerDay),
        Box::new(hard_rules::MinimumCoverage),
        Box::new(hard_rules::ForbiddenSuccessions),
        Box::new(hard_rules::SkillMembership),
        Box::new(hard_rules::ConsecutiveWorkBounds),
        Box::new(hard_rules::ConsecutiveOffBounds),
        Box::new(hard_rules::IncompleteWeekendCap),
        Box::new(hard_rules::TotalAssignmentBounds),
        Box::new(hard_rules::MinimalFreePeriod),
        Box::new(hard_rules::PairedShiftDay::default()),
        Box::new(hard_rules::RestrictedShiftTypes),
        Box::new(hard_rules::Vacations),
        Box::new(soft_rules::OptimalCoverage),
        Box::new(soft_rules::OffRequests),
        Box::new(soft_rules::WorkingWeekendLimit),
        Box::new(soft_rules::IncompleteWeekendPenalty),
        Box::new(soft_rules::AssignmentBalance),
        Box::new(soft_rules::ConsecutiveOverMax),
        Box::new(soft_rules::ConsecutiveUnderMin),
        Box::new(soft_rules::IfNeededSkills),
        Box::new(soft_rules::OvertimeWishes),
    ]
}

/// Builds one week's model from the active rules. Never fails for an
/// unsatisfiable week; infeasibility is the engine's verdict, not the builder's.
pub fn build_week_model(input: &BuildInput<'_>) -> Result<WeekModel, ModelBuildError> {
    input.check()?;

    info!(
        "Setting up week {} model with {} nurses, {} coverage slots...",
        input.history.week,
        input.nurse_count(),
        input.week.coverage.len()
    );
    let mut model = WeekModel::with_base(input.nurse_count());

    for rule in rule_registry() {
        if rule.enabled(input.toggles) {
            let before = model.constraint_count();
            rule.contribute(input, &mut model);
            info!(
                "Adding '{}' contributions ({} constraints)...",
                rule.name(),
                model.constraint_count() - before
            );
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    #[test]
    fn base_model_links_skills_shifts_and_days() {
        let model = WeekModel::with_base(2);
        // per nurse-day: 4 skill sums + 4 OR lower bounds + 1 OR upper bound
        assert_eq!(model.constraint_count(), 2 * DAYS_PER_WEEK * 9);
        assert_eq!(model.penalty_term_count(), 0);
    }

    #[test]
    fn disabled_rules_contribute_nothing() {
        let scenario = testkit::scenario(1);
        let week = WeekData::default();
        let history = History::fresh(1);
        let toggles = RuleToggles::none();
        let input = BuildInput {
            scenario: &scenario,
            week: &week,
            history: &history,
            toggles: &toggles,
            total_weeks: 4,
        };
        let model = build_week_model(&input).unwrap();
        assert_eq!(model.constraint_count(), DAYS_PER_WEEK * 9);
        assert_eq!(model.penalty_term_count(), 0);
    }

    #[test]
    fn build_rejects_history_shape_mismatch() {
        let scenario = testkit::scenario(2);
        let week = WeekData::default();
        let history = History::fresh(3);
        let toggles = RuleToggles::default();
        let input = BuildInput {
            scenario: &scenario,
            week: &week,
            history: &history,
            toggles: &toggles,
            total_weeks: 4,
        };
        assert_eq!(
            build_week_model(&input).unwrap_err(),
            ModelBuildError::HistoryLengthMismatch {
                history: 3,
                scenario: 2
            }
        );
    }

    #[test]
    fn build_rejects_exhausted_horizon() {
        let scenario = testkit::scenario(1);
        let week = WeekData::default();
        let mut history = History::fresh(1);
        history.week = 4;
        let toggles = RuleToggles::default();
        let input = BuildInput {
            scenario: &scenario,
            week: &week,
            history: &history,
            toggles: &toggles,
            total_weeks: 4,
        };
        assert!(matches!(
            build_week_model(&input),
            Err(ModelBuildError::WeekOutOfHorizon { week: 4, .. })
        ));
    }
}
