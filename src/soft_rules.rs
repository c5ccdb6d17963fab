//! The soft-rule catalog. Each rule prices its violations into the objective
//! through non-negative magnitude variables; none of them can make a week
//! infeasible. Weights live in `weights` so the validator prices identically.

use good_lp::{constraint, Expression};
use itertools::iproduct;

use crate::data::{
    RuleToggles, ShiftTypeId, DAYS_PER_WEEK, SATURDAY, SUNDAY, WORKING_SHIFTS,
};
use crate::model::{BuildInput, ModelRule, WeekModel};
use crate::weights;
use crate::weights::prorated_min;

/// s1: staffing below the optimal headcount of a coverage slot.
pub struct OptimalCoverage;

impl ModelRule for OptimalCoverage {
    fn name(&self) -> &'static str {
        "optimal coverage"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.optimal_coverage
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for req in &input.week.coverage {
            if req.optimal == 0 {
                continue;
            }
            let covered =
                model.coverage_sum(req.day.index(), req.shift.index(), req.skill.index());
            let short = model.violation_var();
            let wanted = req.optimal as f64;
            model.add(constraint!(covered + short >= wanted));
            model.penalize(weights::OPTIMAL_COVERAGE, short.into());
        }
    }
}

/// s2: assignments that hit a request to be off.
pub struct OffRequests;

impl ModelRule for OffRequests {
    fn name(&self) -> &'static str {
        "off requests"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.off_requests
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for request in &input.week.shift_off_requests {
            if input.on_vacation(request.nurse) {
                continue;
            }
            let d = request.day.index();
            match request.shift {
                ShiftTypeId::Any => {
                    let worked = model.work_var(request.nurse, d);
                    model.penalize(weights::OFF_REQUEST, worked.into());
                }
                s if s.is_working() => {
                    let assigned = model.shift_var(request.nurse, d, s.index());
                    model.penalize(weights::OFF_REQUEST, assigned.into());
                }
                _ => {}
            }
        }
    }
}

/// s3: a working weekend beyond the contract cap. Weekends already consumed by
/// history are sunk; only the newly incurred excess is priced.
pub struct WorkingWeekendLimit;

impl ModelRule for WorkingWeekendLimit {
    fn name(&self) -> &'static str {
        "working weekend limit"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.working_weekend_limit
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let cap = input.contract(n).maximum_number_of_working_weekends;
            let seen = input.history.nurse_states[n].number_of_working_weekends;
            if seen < cap {
                continue;
            }
            let weekend = model.indicator_var();
            let sat = model.work_var(n, SATURDAY);
            let sun = model.work_var(n, SUNDAY);
            model.add(constraint!(weekend >= sat));
            model.add(constraint!(weekend >= sun));
            model.penalize(weights::WORKING_WEEKENDS_OVER, weekend.into());
        }
    }
}

/// s4: an incomplete weekend under a complete-weekends contract.
pub struct IncompleteWeekendPenalty;

impl ModelRule for IncompleteWeekendPenalty {
    fn name(&self) -> &'static str {
        "incomplete weekend penalty"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.incomplete_weekend_penalty
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            if !input.contract(n).complete_weekends {
                continue;
            }
            let lonely = model.indicator_var();
            let sat = model.work_var(n, SATURDAY);
            let sun = model.work_var(n, SUNDAY);
            model.add(constraint!(lonely >= sat - sun));
            model.add(constraint!(lonely >= sun - sat));
            model.penalize(weights::INCOMPLETE_WEEKEND, lonely.into());
        }
    }
}

/// s5: cumulative assignment totals drifting outside the soft contract bounds.
/// The ceiling prices only newly incurred excess; the floor is prorated so a
/// nurse falling behind is nudged every week.
pub struct AssignmentBalance;

impl ModelRule for AssignmentBalance {
    fn name(&self) -> &'static str {
        "assignment balance"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.assignment_balance
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        let elapsed = input.elapsed_weeks();
        for n in input.active_nurses() {
            let contract = input.contract(n);
            let done = input.history.nurse_states[n].number_of_assignments as i64;

            let room = contract.maximum_number_of_assignments as i64 - done;
            let total = model.total_assignments(n);
            if room <= 0 {
                model.penalize(weights::TOTAL_ASSIGNMENTS, total);
            } else {
                let over = model.violation_var();
                let slack = room as f64;
                let total = model.total_assignments(n);
                model.add(constraint!(over - total >= -slack));
                model.penalize(weights::TOTAL_ASSIGNMENTS, over.into());
            }

            let floor = prorated_min(
                contract.minimum_number_of_assignments,
                elapsed,
                input.total_weeks,
            ) as i64
                - done;
            if floor > 0 {
                let under = model.violation_var();
                let total = model.total_assignments(n);
                let needed = floor as f64;
                model.add(constraint!(under + total >= needed));
                model.penalize(weights::TOTAL_ASSIGNMENTS, under.into());
            }
        }
    }
}

/// s6: consecutive working-day, day-off or same-shift runs beyond their soft
/// maxima; one excess day is priced once via its window ending on that day.
pub struct ConsecutiveOverMax;

impl ModelRule for ConsecutiveOverMax {
    fn name(&self) -> &'static str {
        "consecutive over max"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.consecutive_over_max
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let contract = input.contract(n);
            let boundary = input.boundary(n);

            let max = contract.maximum_number_of_consecutive_working_days;
            for d in 0..DAYS_PER_WEEK {
                let before = (max as i64 - d as i64).max(0) as u32;
                let prior = boundary.worked_in_window(before);
                if d as u32 + 1 + prior <= max {
                    continue;
                }
                let start = (d as i64 - max as i64).max(0) as usize;
                let worked = model.work_sum(n, start..d + 1);
                let excess = model.violation_var();
                let slack = (max - prior) as f64;
                model.add(constraint!(excess - worked >= -slack));
                model.penalize(weights::CONSECUTIVE_DAYS_OVER, excess.into());
            }

            let max_off = contract.maximum_number_of_consecutive_days_off;
            for d in 0..DAYS_PER_WEEK {
                let before = (max_off as i64 - d as i64).max(0) as u32;
                let prior = boundary.off_in_window(before);
                if d as u32 + 1 + prior <= max_off {
                    continue;
                }
                let start = (d as i64 - max_off as i64).max(0) as usize;
                let len = (d + 1 - start) as f64;
                let worked = model.work_sum(n, start..d + 1);
                let excess = model.violation_var();
                let floor = len + prior as f64 - max_off as f64;
                model.add(constraint!(excess + worked >= floor));
                model.penalize(weights::CONSECUTIVE_DAYS_OVER, excess.into());
            }

            for s in 0..WORKING_SHIFTS {
                let smax = input.shift_type(s).maximum_number_of_consecutive_assignments;
                for d in 0..DAYS_PER_WEEK {
                    let before = (smax as i64 - d as i64).max(0) as u32;
                    let prior = boundary.shift_in_window(s, before);
                    if d as u32 + 1 + prior <= smax {
                        continue;
                    }
                    let start = (d as i64 - smax as i64).max(0) as usize;
                    let assigned = model.shift_sum(n, s, start..d + 1);
                    let excess = model.violation_var();
                    let slack = (smax - prior) as f64;
                    model.add(constraint!(excess - assigned >= -slack));
                    model.penalize(weights::CONSECUTIVE_SHIFT_OVER, excess.into());
                }
            }
        }
    }
}

/// s7: runs that end inside the week shorter than their soft minimum, priced
/// linearly in the missing days. Trailing runs that may continue next week
/// are left to next week's model.
pub struct ConsecutiveUnderMin;

impl ConsecutiveUnderMin {
    /// Charges every too-short working-day run pattern of one nurse.
    fn working_runs(&self, input: &BuildInput<'_>, model: &mut WeekModel, n: usize) {
        let min = input.contract(n).minimum_number_of_consecutive_working_days as usize;
        if min <= 1 {
            return;
        }
        let boundary = input.boundary(n);
        let prior = if boundary.worked_yesterday() {
            boundary.prior_working_run() as usize
        } else {
            0
        };

        // runs touching the boundary: prior days carried, terminated at day r
        if prior < min {
            let from = if boundary.worked_yesterday() { 0 } else { 1 };
            for r in from..(min - prior).min(DAYS_PER_WEEK) {
                let shortfall = (min - prior - r) as i64;
                let flag = model.indicator_var();
                let run = model.work_sum(n, 0..r);
                let term = model.work_var(n, r);
                let lhs = flag - run + term;
                let rhs = 1.0 - r as f64;
                model.add(constraint!(lhs >= rhs));
                model.penalize(weights::CONSECUTIVE_DAYS_UNDER * shortfall, flag.into());
            }
        }

        // runs starting mid-week
        for d in 1..DAYS_PER_WEEK {
            for r in 1..min {
                if d + r > DAYS_PER_WEEK - 1 {
                    break;
                }
                let shortfall = (min - r) as i64;
                let flag = model.indicator_var();
                let run = model.work_sum(n, d..d + r);
                let before = model.work_var(n, d - 1);
                let term = model.work_var(n, d + r);
                let lhs = flag - run + before + term;
                let rhs = 1.0 - r as f64;
                model.add(constraint!(lhs >= rhs));
                model.penalize(weights::CONSECUTIVE_DAYS_UNDER * shortfall, flag.into());
            }
        }
    }

    /// Same scheme over day-off runs; a brand-new history leaves the prior
    /// off extent open, so boundary runs are skipped then.
    fn off_runs(&self, input: &BuildInput<'_>, model: &mut WeekModel, n: usize) {
        let min = input.contract(n).minimum_number_of_consecutive_days_off as usize;
        if min <= 1 {
            return;
        }
        let boundary = input.boundary(n);

        if boundary.worked_yesterday() {
            // off runs starting Monday
            for r in 1..min.min(DAYS_PER_WEEK) {
                let shortfall = (min - r) as i64;
                let flag = model.indicator_var();
                let run = model.work_sum(n, 0..r);
                let term = model.work_var(n, r);
                let lhs = flag + run - term;
                model.add(constraint!(lhs >= 0));
                model.penalize(weights::CONSECUTIVE_DAYS_UNDER * shortfall, flag.into());
            }
        } else if boundary.off_extent_known() {
            let prior = boundary.prior_off_run() as usize;
            if prior < min {
                for r in 0..(min - prior).min(DAYS_PER_WEEK) {
                    let shortfall = (min - prior - r) as i64;
                    let flag = model.indicator_var();
                    let run = model.work_sum(n, 0..r);
                    let term = model.work_var(n, r);
                    let lhs = flag + run - term;
                    model.add(constraint!(lhs >= 0));
                    model.penalize(weights::CONSECUTIVE_DAYS_UNDER * shortfall, flag.into());
                }
            }
        }

        for d in 1..DAYS_PER_WEEK {
            for r in 1..min {
                if d + r > DAYS_PER_WEEK - 1 {
                    break;
                }
                let shortfall = (min - r) as i64;
                let flag = model.indicator_var();
                let run = model.work_sum(n, d..d + r);
                let before = model.work_var(n, d - 1);
                let term = model.work_var(n, d + r);
                let lhs = flag + run - before - term;
                model.add(constraint!(lhs >= -1.0));
                model.penalize(weights::CONSECUTIVE_DAYS_UNDER * shortfall, flag.into());
            }
        }
    }

    /// And over same-shift runs, one shift type at a time.
    fn shift_runs(&self, input: &BuildInput<'_>, model: &mut WeekModel, n: usize, s: usize) {
        let min = input.shift_type(s).minimum_number_of_consecutive_assignments as usize;
        if min <= 1 {
            return;
        }
        let prior = input.boundary(n).prior_shift_run(s) as usize;

        if prior < min {
            let from = if prior > 0 { 0 } else { 1 };
            for r in from..(min - prior).min(DAYS_PER_WEEK) {
                let shortfall = (min - prior - r) as i64;
                let flag = model.indicator_var();
                let run = model.shift_sum(n, s, 0..r);
                let term = model.shift_var(n, r, s);
                let lhs = flag - run + term;
                let rhs = 1.0 - r as f64;
                model.add(constraint!(lhs >= rhs));
                model.penalize(weights::CONSECUTIVE_SHIFT_UNDER * shortfall, flag.into());
            }
        }

        for d in 1..DAYS_PER_WEEK {
            for r in 1..min {
                if d + r > DAYS_PER_WEEK - 1 {
                    break;
                }
                let shortfall = (min - r) as i64;
                let flag = model.indicator_var();
                let run = model.shift_sum(n, s, d..d + r);
                let before = model.shift_var(n, d - 1, s);
                let term = model.shift_var(n, d + r, s);
                let lhs = flag - run + before + term;
                let rhs = 1.0 - r as f64;
                model.add(constraint!(lhs >= rhs));
                model.penalize(weights::CONSECUTIVE_SHIFT_UNDER * shortfall, flag.into());
            }
        }
    }
}

impl ModelRule for ConsecutiveUnderMin {
    fn name(&self) -> &'static str {
        "consecutive under min"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.consecutive_under_min
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            self.working_runs(input, model, n);
            self.off_runs(input, model, n);
            for s in 0..WORKING_SHIFTS {
                self.shift_runs(input, model, n, s);
            }
        }
    }
}

/// s8: every use of a skill the nurse only has "if needed".
pub struct IfNeededSkills;

impl ModelRule for IfNeededSkills {
    fn name(&self) -> &'static str {
        "if-needed skills"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.if_needed_skills
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            for &skill in &input.nurse(n).skills_if_needed {
                if !input.nurse(n).has_skill_if_needed(skill) {
                    continue; // also listed as a primary skill
                }
                let uses: Expression = iproduct!(0..DAYS_PER_WEEK, 0..WORKING_SHIFTS)
                    .map(|(d, s)| model.skill_var(n, d, s, skill.index()))
                    .sum();
                model.penalize(weights::IF_NEEDED_SKILL, uses);
            }
        }
    }
}

/// s9: progress toward declared overtime, measured against the prorated
/// target of soft maximum plus the declared extra assignments.
pub struct OvertimeWishes;

impl ModelRule for OvertimeWishes {
    fn name(&self) -> &'static str {
        "overtime wishes"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.overtime_wishes
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        let elapsed = input.elapsed_weeks();
        for n in input.active_nurses() {
            let nurse = input.nurse(n);
            if nurse.desired_overtime == 0 {
                continue;
            }
            let contract = input.contract(n);
            let target = contract.maximum_number_of_assignments + nurse.desired_overtime;
            let done = input.history.nurse_states[n].number_of_assignments as i64;
            let needed = prorated_min(target, elapsed, input.total_weeks) as i64 - done;
            if needed <= 0 {
                continue;
            }
            let unmet = model.violation_var();
            let total = model.total_assignments(n);
            let floor = needed as f64;
            model.add(constraint!(unmet + total >= floor));
            model.penalize(weights::UNMET_OVERTIME, unmet.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{History, RuleToggles, WeekData, Weekday};
    use crate::model::{build_week_model, BuildInput};
    use crate::testkit;

    fn build(
        scenario: &crate::data::Scenario,
        week: &WeekData,
        history: &History,
        toggles: &RuleToggles,
    ) -> crate::model::WeekModel {
        let input = BuildInput {
            scenario,
            week,
            history,
            toggles,
            total_weeks: 4,
        };
        build_week_model(&input).unwrap()
    }

    #[test]
    fn optimal_coverage_adds_one_shortfall_per_slot() {
        let scenario = testkit::scenario(1);
        let mut week = WeekData::default();
        week.coverage.push(testkit::coverage(Weekday::Wednesday, ShiftTypeId::Early, 0, 1));
        week.coverage.push(testkit::coverage(Weekday::Friday, ShiftTypeId::Late, 1, 0));
        let history = History::fresh(1);
        let mut toggles = RuleToggles::none();
        toggles.optimal_coverage = true;

        let model = build(&scenario, &week, &history, &toggles);
        assert_eq!(model.penalty_term_count(), 1);
    }

    #[test]
    fn off_requests_price_day_and_shift_hits() {
        let scenario = testkit::scenario(1);
        let mut week = WeekData::default();
        week.shift_off_requests.push(testkit::off_request(0, Weekday::Monday, ShiftTypeId::Any));
        week.shift_off_requests.push(testkit::off_request(0, Weekday::Tuesday, ShiftTypeId::Night));
        let history = History::fresh(1);
        let mut toggles = RuleToggles::none();
        toggles.off_requests = true;

        let model = build(&scenario, &week, &history, &toggles);
        assert_eq!(model.penalty_term_count(), 2);
        // direct terms, no linking constraints
        assert_eq!(model.constraint_count(), DAYS_PER_WEEK * 9);
    }

    #[test]
    fn weekend_limit_prices_only_once_cap_is_consumed() {
        let mut scenario = testkit::scenario(1);
        scenario.contracts[0].maximum_number_of_working_weekends = 2;
        let week = WeekData::default();
        let mut history = History::fresh(1);
        let mut toggles = RuleToggles::none();
        toggles.working_weekend_limit = true;

        let model = build(&scenario, &week, &history, &toggles);
        assert_eq!(model.penalty_term_count(), 0);

        history.nurse_states[0].number_of_working_weekends = 2;
        let model = build(&scenario, &week, &history, &toggles);
        assert_eq!(model.penalty_term_count(), 1);
    }

    #[test]
    fn under_min_run_patterns_cover_the_boundary_case() {
        let mut scenario = testkit::scenario(1);
        scenario.contracts[0].minimum_number_of_consecutive_working_days = 2;
        let week = WeekData::default();
        let mut history = History::fresh(1);
        history.nurse_states[0].number_of_consecutive_working_days = 1;
        history.nurse_states[0].last_assigned_shift_type = ShiftTypeId::Day;
        history.nurse_states[0].number_of_consecutive_assignments = 1;
        let mut toggles = RuleToggles::none();
        toggles.consecutive_under_min = true;

        let model = build(&scenario, &week, &history, &toggles);
        // working runs: 1 boundary termination (r = 0) + 5 mid-week starts
        assert_eq!(model.penalty_term_count(), 6);
    }

    #[test]
    fn overtime_wish_tracks_prorated_target() {
        let mut scenario = testkit::scenario(1);
        scenario.contracts[0].maximum_number_of_assignments = 8;
        scenario.nurses[0].desired_overtime = 4;
        let week = WeekData::default();
        let history = History::fresh(1);
        let mut toggles = RuleToggles::none();
        toggles.overtime_wishes = true;

        let model = build(&scenario, &week, &history, &toggles);
        // week 1 of 4: target 12/4 = 3, nothing done yet
        assert_eq!(model.penalty_term_count(), 1);
        assert_eq!(model.constraint_count(), DAYS_PER_WEEK * 9 + 1);
    }
}
