//! The hard-rule catalog. Every rule here renders a schedule invalid when
//! violated; each contributes its constraints independently so a toggle set
//! assembles exactly the rules a run asked for.

use good_lp::{constraint, Expression};
use itertools::iproduct;

use crate::data::{
    RuleToggles, ShiftTypeId, SkillId, DAYS_PER_WEEK, SATURDAY, SKILL_COUNT, SUNDAY,
    WORKING_SHIFTS,
};
use crate::model::{BuildInput, ModelRule, WeekModel};
use crate::weights::{prorated_max, prorated_min};

/// h1: at most one shift per nurse per day.
pub struct SingleShiftPerDay;

impl ModelRule for SingleShiftPerDay {
    fn name(&self) -> &'static str {
        "single shift per day"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.single_shift_per_day
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            for d in 0..DAYS_PER_WEEK {
                let day = model.day_shifts(n, d);
                model.add(constraint!(day <= 1));
            }
        }
    }
}

/// h2: minimum skilled headcount per (day, shift, skill) slot.
pub struct MinimumCoverage;

impl ModelRule for MinimumCoverage {
    fn name(&self) -> &'static str {
        "minimum coverage"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.minimum_coverage
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for req in &input.week.coverage {
            if req.minimum == 0 {
                continue;
            }
            let covered =
                model.coverage_sum(req.day.index(), req.shift.index(), req.skill.index());
            let needed = req.minimum as f64;
            model.add(constraint!(covered >= needed));
        }
    }
}

/// h3: forbidden shift-type successions, including across the week boundary.
pub struct ForbiddenSuccessions;

impl ModelRule for ForbiddenSuccessions {
    fn name(&self) -> &'static str {
        "forbidden successions"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.forbidden_successions
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for s in 0..WORKING_SHIFTS {
            let successors: Vec<usize> = input
                .shift_type(s)
                .forbidden_successors
                .iter()
                .filter(|f| f.is_working())
                .map(|f| f.index())
                .collect();
            if successors.is_empty() {
                continue;
            }
            for n in input.active_nurses() {
                for d in 0..DAYS_PER_WEEK - 1 {
                    for &succ in &successors {
                        let today = model.shift_var(n, d, s);
                        let tomorrow = model.shift_var(n, d + 1, succ);
                        model.add(constraint!(today + tomorrow <= 1));
                    }
                }
            }
        }

        // last week's final shift forbids some Monday shifts
        for n in input.active_nurses() {
            let last = input.boundary(n).last_shift();
            if !last.is_working() {
                continue;
            }
            for succ in &input.shift_type(last.index()).forbidden_successors {
                if !succ.is_working() {
                    continue;
                }
                let monday = model.shift_var(n, 0, succ.index());
                model.add(constraint!(monday == 0));
            }
        }
    }
}

/// h4: a nurse may only be assigned skills she owns (if-needed skills count;
/// their use is priced by s8, not forbidden here).
pub struct SkillMembership;

impl ModelRule for SkillMembership {
    fn name(&self) -> &'static str {
        "skill membership"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.skill_membership
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let nurse = input.nurse(n);
            for sk in 0..SKILL_COUNT {
                let skill = SkillId::from_index(sk).unwrap();
                if nurse.has_skill(skill) || nurse.skills_if_needed.contains(&skill) {
                    continue;
                }
                let uses: Expression = iproduct!(0..DAYS_PER_WEEK, 0..WORKING_SHIFTS)
                    .map(|(d, s)| model.skill_var(n, d, s, sk))
                    .sum();
                model.add(constraint!(uses == 0));
            }
        }
    }
}

/// h5: hard bounds on consecutive working days and consecutive same-shift runs.
pub struct ConsecutiveWorkBounds;

impl ModelRule for ConsecutiveWorkBounds {
    fn name(&self) -> &'static str {
        "consecutive work bounds"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.consecutive_work_bounds
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let contract = input.contract(n);
            let boundary = input.boundary(n);

            // max consecutive working days: no window of max+1 days fully worked
            let max = contract.maximum_number_of_consecutive_working_days_hard;
            for d in 0..DAYS_PER_WEEK {
                let before = (max as i64 - d as i64).max(0) as u32;
                let prior = boundary.worked_in_window(before);
                if d as u32 + 1 + prior <= max {
                    continue;
                }
                let start = (d as i64 - max as i64).max(0) as usize;
                let worked = model.work_sum(n, start..d + 1);
                let room = max as f64 - prior as f64;
                model.add(constraint!(worked <= room));
            }

            // min consecutive working days: a started run must continue
            let min = contract.minimum_number_of_consecutive_working_days_hard;
            if min > 1 {
                let prior = boundary.prior_working_run();
                if prior > 0 && prior < min {
                    for j in 0..((min - prior) as usize).min(DAYS_PER_WEEK) {
                        let w = model.work_var(n, j);
                        model.add(constraint!(w == 1));
                    }
                }
                for d in 0..DAYS_PER_WEEK {
                    if d == 0 && boundary.worked_yesterday() {
                        continue;
                    }
                    for j in 1..min as usize {
                        if d + j >= DAYS_PER_WEEK {
                            break;
                        }
                        let later = model.work_var(n, d + j);
                        let start = model.work_var(n, d);
                        if d == 0 {
                            model.add(constraint!(later >= start));
                        } else {
                            let prev = model.work_var(n, d - 1);
                            model.add(constraint!(later - start + prev >= 0));
                        }
                    }
                }
            }

            // same-shift runs, per working shift type
            for s in 0..WORKING_SHIFTS {
                let shift_type = input.shift_type(s);
                let smax = shift_type.maximum_number_of_consecutive_assignments_hard;
                for d in 0..DAYS_PER_WEEK {
                    let before = (smax as i64 - d as i64).max(0) as u32;
                    let prior = boundary.shift_in_window(s, before);
                    if d as u32 + 1 + prior <= smax {
                        continue;
                    }
                    let start = (d as i64 - smax as i64).max(0) as usize;
                    let assigned = model.shift_sum(n, s, start..d + 1);
                    let room = smax as f64 - prior as f64;
                    model.add(constraint!(assigned <= room));
                }

                let smin = shift_type.minimum_number_of_consecutive_assignments_hard;
                if smin > 1 {
                    let prior = boundary.prior_shift_run(s);
                    if prior > 0 && prior < smin {
                        for j in 0..((smin - prior) as usize).min(DAYS_PER_WEEK) {
                            let a = model.shift_var(n, j, s);
                            model.add(constraint!(a == 1));
                        }
                    }
                    for d in 0..DAYS_PER_WEEK {
                        if d == 0 && prior > 0 {
                            continue;
                        }
                        for j in 1..smin as usize {
                            if d + j >= DAYS_PER_WEEK {
                                break;
                            }
                            let later = model.shift_var(n, d + j, s);
                            let start = model.shift_var(n, d, s);
                            if d == 0 {
                                model.add(constraint!(later >= start));
                            } else {
                                let prev = model.shift_var(n, d - 1, s);
                                model.add(constraint!(later - start + prev >= 0));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// h6: hard bounds on consecutive days off, the mirror image of h5.
pub struct ConsecutiveOffBounds;

impl ModelRule for ConsecutiveOffBounds {
    fn name(&self) -> &'static str {
        "consecutive off bounds"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.consecutive_off_bounds
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let contract = input.contract(n);
            let boundary = input.boundary(n);

            let max = contract.maximum_number_of_consecutive_days_off_hard;
            for d in 0..DAYS_PER_WEEK {
                let before = (max as i64 - d as i64).max(0) as u32;
                let prior = boundary.off_in_window(before);
                if d as u32 + 1 + prior <= max {
                    continue;
                }
                let start = (d as i64 - max as i64).max(0) as usize;
                let len = (d + 1 - start) as f64;
                let worked = model.work_sum(n, start..d + 1);
                // off days in the window (prior + len - worked) stay within max
                let floor = len + prior as f64 - max as f64;
                model.add(constraint!(worked >= floor));
            }

            let min = contract.minimum_number_of_consecutive_days_off_hard;
            if min > 1 {
                let prior = boundary.prior_off_run();
                if !boundary.worked_yesterday()
                    && boundary.off_extent_known()
                    && prior < min
                {
                    for j in 0..((min - prior) as usize).min(DAYS_PER_WEEK) {
                        let w = model.work_var(n, j);
                        model.add(constraint!(w == 0));
                    }
                }
                for d in 0..DAYS_PER_WEEK {
                    if d == 0 && !boundary.worked_yesterday() {
                        continue;
                    }
                    for j in 1..min as usize {
                        if d + j >= DAYS_PER_WEEK {
                            break;
                        }
                        let later = model.work_var(n, d + j);
                        let start = model.work_var(n, d);
                        if d == 0 {
                            model.add(constraint!(later <= start));
                        } else {
                            let prev = model.work_var(n, d - 1);
                            model.add(constraint!(later - start + prev <= 1));
                        }
                    }
                }
            }
        }
    }
}

/// h7: once the cumulative incomplete-weekend cap is reached, Saturday and
/// Sunday must be worked together or not at all.
pub struct IncompleteWeekendCap;

impl ModelRule for IncompleteWeekendCap {
    fn name(&self) -> &'static str {
        "incomplete weekend cap"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.incomplete_weekend_cap
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let cap = input.contract(n).maximum_number_of_incomplete_weekends;
            let seen = input.history.nurse_states[n].number_of_incomplete_weekends;
            if seen >= cap {
                let sat = model.work_var(n, SATURDAY);
                let sun = model.work_var(n, SUNDAY);
                model.add(constraint!(sat == sun));
            }
        }
    }
}

/// h8: cumulative assignment totals within the hard contract bounds,
/// prorated by elapsed weeks.
pub struct TotalAssignmentBounds;

impl ModelRule for TotalAssignmentBounds {
    fn name(&self) -> &'static str {
        "total assignment bounds"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.total_assignment_bounds
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        let elapsed = input.elapsed_weeks();
        for n in input.active_nurses() {
            let contract = input.contract(n);
            let done = input.history.nurse_states[n].number_of_assignments as i64;
            let hi = prorated_max(
                contract.maximum_number_of_assignments_hard,
                elapsed,
                input.total_weeks,
            ) as i64;
            let lo = prorated_min(
                contract.minimum_number_of_assignments_hard,
                elapsed,
                input.total_weeks,
            ) as i64;

            let total = model.total_assignments(n);
            let ceiling = (hi - done) as f64;
            model.add(constraint!(total <= ceiling));
            if lo - done > 0 {
                let total = model.total_assignments(n);
                let floor = (lo - done) as f64;
                model.add(constraint!(total >= floor));
            }
        }
    }
}

/// h9: at least one all-off window of the contract's minimal free-period
/// length inside the week.
pub struct MinimalFreePeriod;

impl ModelRule for MinimalFreePeriod {
    fn name(&self) -> &'static str {
        "minimal free period"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.minimal_free_period
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            let len = input
                .contract(n)
                .minimal_free_period
                .min(DAYS_PER_WEEK as u32) as usize;
            if len == 0 {
                continue;
            }
            let mut windows = Expression::default();
            for start in 0..=(DAYS_PER_WEEK - len) {
                let free = model.indicator_var();
                for d in start..start + len {
                    let w = model.work_var(n, d);
                    model.add(constraint!(free + w <= 1));
                }
                windows += free;
            }
            model.add(constraint!(windows >= 1));
        }
    }
}

/// h10: relaxed day rule allowing exactly one two-shift combination.
pub struct PairedShiftDay {
    pub pair: (ShiftTypeId, ShiftTypeId),
}

impl Default for PairedShiftDay {
    fn default() -> Self {
        PairedShiftDay {
            pair: crate::data::PAIRED_SHIFTS,
        }
    }
}

impl ModelRule for PairedShiftDay {
    fn name(&self) -> &'static str {
        "paired shift day"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.paired_shift_day
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            for d in 0..DAYS_PER_WEEK {
                let paired = model.indicator_var();
                let first = model.shift_var(n, d, self.pair.0.index());
                let second = model.shift_var(n, d, self.pair.1.index());
                model.add(constraint!(paired <= first));
                model.add(constraint!(paired <= second));
                let day = model.day_shifts(n, d);
                model.add(constraint!(day - paired <= 1));
            }
        }
    }
}

/// h11: cumulative cap on a nurse's restricted shift types.
pub struct RestrictedShiftTypes;

impl ModelRule for RestrictedShiftTypes {
    fn name(&self) -> &'static str {
        "restricted shift types"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.restricted_shift_types
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for n in input.active_nurses() {
            for restriction in &input.nurse(n).shift_restrictions {
                if !restriction.shift.is_working() {
                    continue;
                }
                let s = restriction.shift.index();
                let used = input.history.nurse_states[n].number_of_assignments_per_shift[s] as i64;
                let assigned = model.shift_sum(n, s, 0..DAYS_PER_WEEK);
                let room = (restriction.maximum_total as i64 - used) as f64;
                model.add(constraint!(assigned <= room));
            }
        }
    }
}

/// h12: vacationing nurses have zero assignments; the other per-nurse rules
/// already exempt them via `BuildInput::active_nurses`.
pub struct Vacations;

impl ModelRule for Vacations {
    fn name(&self) -> &'static str {
        "vacations"
    }

    fn enabled(&self, toggles: &RuleToggles) -> bool {
        toggles.vacations
    }

    fn contribute(&self, input: &BuildInput<'_>, model: &mut WeekModel) {
        for &n in &input.week.vacations {
            let all = model.total_assignments(n);
            model.add(constraint!(all == 0));
        }
    }
}
