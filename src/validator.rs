//! Independent schedule validation. Recomputes every active hard rule and the
//! full penalty total from a raw schedule, without touching the solving
//! engine, so a builder/engine disagreement cannot go unnoticed and accepted
//! schedules are scored uniformly regardless of backend.
//!
//! The weekly score deliberately mirrors the model objective term by term;
//! the horizon pass adds the checks a single week cannot express.

use itertools::iproduct;
use log::debug;
use std::fmt;

use crate::calendar::{scan_runs, Boundary, Run};
use crate::data::{
    History, NurseId, RuleToggles, Scenario, SkillId, WeekData, WeekSchedule, DAYS_PER_WEEK,
    PAIRED_SHIFTS, SATURDAY, SKILL_COUNT, SUNDAY, WORKING_SHIFTS,
};
use crate::history::advance_history;
use crate::weights;
use crate::weights::{prorated_max, prorated_min};

/// One broken hard rule, with enough context to locate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub description: String,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.description)
    }
}

/// Validity and score of one week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekReport {
    pub week: u32,
    pub violations: Vec<RuleViolation>,
    pub penalty: i64,
}

impl WeekReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validity and score of a whole horizon, week reports plus the
/// horizon-total checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonReport {
    pub weeks: Vec<WeekReport>,
    pub horizon_violations: Vec<RuleViolation>,
    pub horizon_penalty: i64,
}

impl HorizonReport {
    pub fn is_valid(&self) -> bool {
        self.horizon_violations.is_empty() && self.weeks.iter().all(WeekReport::is_valid)
    }

    pub fn total_penalty(&self) -> i64 {
        self.weeks.iter().map(|w| w.penalty).sum::<i64>() + self.horizon_penalty
    }
}

/// Recomputes feasibility and quality from scratch for a given scenario and
/// toggle set. Holds no mutable state; two calls on the same input return
/// identical reports.
pub struct ScheduleValidator<'a> {
    scenario: &'a Scenario,
    toggles: &'a RuleToggles,
    total_weeks: u32,
}

impl<'a> ScheduleValidator<'a> {
    pub fn new(scenario: &'a Scenario, toggles: &'a RuleToggles, total_weeks: u32) -> Self {
        ScheduleValidator {
            scenario,
            toggles,
            total_weeks,
        }
    }

    /// Checks one week against the history it was solved under.
    pub fn validate_week(
        &self,
        week: &WeekData,
        history: &History,
        schedule: &WeekSchedule,
    ) -> WeekReport {
        let pass = WeekPass {
            scenario: self.scenario,
            toggles: self.toggles,
            total_weeks: self.total_weeks,
            week,
            history,
            schedule,
            violations: Vec::new(),
            penalty: 0,
        };
        pass.run()
    }

    /// Validates a multi-week schedule end to end: threads a private copy of
    /// the initial history through the updater, then adds the horizon totals.
    pub fn validate_horizon(
        &self,
        weeks: &[WeekData],
        schedules: &[WeekSchedule],
        initial_history: &History,
    ) -> HorizonReport {
        debug_assert_eq!(weeks.len(), schedules.len());
        let mut history = initial_history.clone();
        let mut reports = Vec::with_capacity(weeks.len());
        for (week, schedule) in weeks.iter().zip(schedules) {
            reports.push(self.validate_week(week, &history, schedule));
            advance_history(&mut history, schedule, self.toggles);
        }
        let (horizon_violations, horizon_penalty) = self.horizon_totals(&history);
        HorizonReport {
            weeks: reports,
            horizon_violations,
            horizon_penalty,
        }
    }

    pub fn is_schedule_valid(
        &self,
        weeks: &[WeekData],
        schedules: &[WeekSchedule],
        initial_history: &History,
    ) -> bool {
        self.validate_horizon(weeks, schedules, initial_history).is_valid()
    }

    /// The checks only the finished horizon can answer: totals against the
    /// un-prorated contract bounds, weekends against the contract cap, and
    /// declared overtime.
    pub fn horizon_totals(&self, final_history: &History) -> (Vec<RuleViolation>, i64) {
        let mut violations = Vec::new();
        let mut penalty = 0i64;
        for (n, nurse) in self.scenario.nurses.iter().enumerate() {
            let contract = match self.scenario.contract_of(nurse) {
                Some(c) => c,
                None => continue,
            };
            let state = &final_history.nurse_states[n];
            let total = state.number_of_assignments as i64;

            if self.toggles.total_assignment_bounds {
                let lo = contract.minimum_number_of_assignments_hard as i64;
                let hi = contract.maximum_number_of_assignments_hard as i64;
                if total < lo || total > hi {
                    violations.push(RuleViolation {
                        rule: "total assignment bounds",
                        description: format!(
                            "nurse {n} finished the horizon with {total} assignments, outside [{lo}, {hi}]"
                        ),
                    });
                }
            }

            if self.toggles.assignment_balance {
                let lo = contract.minimum_number_of_assignments as i64;
                let hi = contract.maximum_number_of_assignments as i64;
                penalty += weights::TOTAL_ASSIGNMENTS * ((lo - total).max(0) + (total - hi).max(0));
            }

            if self.toggles.working_weekend_limit {
                let over = state.number_of_working_weekends as i64
                    - contract.maximum_number_of_working_weekends as i64;
                penalty += weights::WORKING_WEEKENDS_OVER * over.max(0);
            }

            if self.toggles.overtime_wishes && nurse.desired_overtime > 0 {
                let target =
                    (contract.maximum_number_of_assignments + nurse.desired_overtime) as i64;
                penalty += weights::UNMET_OVERTIME * (target - total).max(0);
            }
        }
        (violations, penalty)
    }
}

/// One week's validation pass; collects violations and the penalty total.
struct WeekPass<'a> {
    scenario: &'a Scenario,
    toggles: &'a RuleToggles,
    total_weeks: u32,
    week: &'a WeekData,
    history: &'a History,
    schedule: &'a WeekSchedule,
    violations: Vec<RuleViolation>,
    penalty: i64,
}

impl<'a> WeekPass<'a> {
    fn run(mut self) -> WeekReport {
        self.well_formed();
        if self.toggles.single_shift_per_day {
            self.single_shift_per_day();
        }
        if self.toggles.minimum_coverage {
            self.minimum_coverage();
        }
        if self.toggles.forbidden_successions {
            self.forbidden_successions();
        }
        if self.toggles.skill_membership {
            self.skill_membership();
        }
        if self.toggles.consecutive_work_bounds {
            self.consecutive_work_bounds();
        }
        if self.toggles.consecutive_off_bounds {
            self.consecutive_off_bounds();
        }
        if self.toggles.incomplete_weekend_cap {
            self.incomplete_weekend_cap();
        }
        if self.toggles.total_assignment_bounds {
            self.total_assignment_bounds();
        }
        if self.toggles.minimal_free_period {
            self.minimal_free_period();
        }
        if self.toggles.paired_shift_day {
            self.paired_shift_day();
        }
        if self.toggles.restricted_shift_types {
            self.restricted_shift_types();
        }
        if self.toggles.vacations {
            self.vacations();
        }

        if self.toggles.optimal_coverage {
            self.optimal_coverage();
        }
        if self.toggles.off_requests {
            self.off_requests();
        }
        if self.toggles.working_weekend_limit {
            self.working_weekend_limit();
        }
        if self.toggles.incomplete_weekend_penalty {
            self.incomplete_weekend_penalty();
        }
        if self.toggles.assignment_balance {
            self.assignment_balance();
        }
        if self.toggles.consecutive_over_max {
            self.consecutive_over_max();
        }
        if self.toggles.consecutive_under_min {
            self.consecutive_under_min();
        }
        if self.toggles.if_needed_skills {
            self.if_needed_skills();
        }
        if self.toggles.overtime_wishes {
            self.overtime_wishes();
        }

        debug!(
            "week {}: {} violations, penalty {}",
            self.history.week,
            self.violations.len(),
            self.penalty
        );
        WeekReport {
            week: self.history.week,
            violations: self.violations,
            penalty: self.penalty,
        }
    }

    fn violate(&mut self, rule: &'static str, description: String) {
        self.violations.push(RuleViolation { rule, description });
    }

    fn on_vacation(&self, nurse: NurseId) -> bool {
        self.toggles.vacations && self.week.vacations.contains(&nurse)
    }

    fn active_nurses(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.scenario.nurses.len()).filter(|&n| !self.on_vacation(n))
    }

    fn contract(&self, nurse: NurseId) -> &'a crate::data::Contract {
        self.scenario
            .contract_of(&self.scenario.nurses[nurse])
            .unwrap()
    }

    fn boundary(&self, nurse: NurseId) -> Boundary<'a> {
        Boundary::new(&self.history.nurse_states[nurse])
    }

    fn worked_days(&self, nurse: NurseId) -> [bool; DAYS_PER_WEEK] {
        std::array::from_fn(|d| self.schedule.worked(nurse, d))
    }

    fn shift_days(&self, nurse: NurseId, shift: usize) -> [bool; DAYS_PER_WEEK] {
        std::array::from_fn(|d| self.schedule.shift_worked(nurse, d, shift))
    }

    // ---- hard rules ----

    fn well_formed(&mut self) {
        for (n, d, s) in iproduct!(0..self.scenario.nurses.len(), 0..DAYS_PER_WEEK, 0..WORKING_SHIFTS)
        {
            if self.schedule.skill_count(n, d, s) > 1 {
                self.violate(
                    "well-formedness",
                    format!("nurse {n} holds several skills on day {d}, shift {s}"),
                );
            }
        }
    }

    fn single_shift_per_day(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            for d in 0..DAYS_PER_WEEK {
                let count = self.schedule.worked_shifts(n, d).len();
                if count > 1 {
                    self.violate(
                        "single shift per day",
                        format!("nurse {n} works {count} shifts on day {d}"),
                    );
                }
            }
        }
    }

    fn minimum_coverage(&mut self) {
        let week = self.week;
        for req in &week.coverage {
            if req.minimum == 0 || !req.shift.is_working() {
                continue;
            }
            let covered =
                self.schedule
                    .covered_heads(req.day.index(), req.shift.index(), req.skill.index());
            if covered < req.minimum {
                self.violate(
                    "minimum coverage",
                    format!(
                        "day {}, shift {}, skill {}: {covered} of {} required heads",
                        req.day.index(),
                        req.shift,
                        req.skill,
                        req.minimum
                    ),
                );
            }
        }
    }

    fn forbidden_successions(&mut self) {
        let scenario = self.scenario;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let last = self.boundary(n).last_shift();
            if last.is_working() {
                if let Some(shift_type) = scenario.shift_type(last) {
                    for &succ in &shift_type.forbidden_successors {
                        if succ.is_working() && self.schedule.shift_worked(n, 0, succ.index()) {
                            self.violate(
                                "forbidden successions",
                                format!(
                                    "nurse {n} follows last week's {last} with {succ} on Monday"
                                ),
                            );
                        }
                    }
                }
            }
            for d in 0..DAYS_PER_WEEK - 1 {
                for s in self.schedule.worked_shifts(n, d) {
                    let id = crate::data::ShiftTypeId::from_index(s).unwrap();
                    let Some(shift_type) = scenario.shift_type(id) else {
                        continue;
                    };
                    for &succ in &shift_type.forbidden_successors {
                        if succ.is_working() && self.schedule.shift_worked(n, d + 1, succ.index()) {
                            self.violate(
                                "forbidden successions",
                                format!("nurse {n} follows {id} on day {d} with {succ}"),
                            );
                        }
                    }
                }
            }
        }
    }

    fn skill_membership(&mut self) {
        let scenario = self.scenario;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let nurse = &scenario.nurses[n];
            for (d, s, sk) in iproduct!(0..DAYS_PER_WEEK, 0..WORKING_SHIFTS, 0..SKILL_COUNT) {
                if !self.schedule.is_assigned(n, d, s, sk) {
                    continue;
                }
                let skill = SkillId::from_index(sk).unwrap();
                if !nurse.has_skill(skill) && !nurse.skills_if_needed.contains(&skill) {
                    self.violate(
                        "skill membership",
                        format!("nurse {n} is assigned unowned skill {skill} on day {d}"),
                    );
                }
            }
        }
    }

    fn check_runs(
        &mut self,
        nurse: NurseId,
        rule: &'static str,
        what: &str,
        runs: &[Run],
        min: u32,
        max: u32,
        skip_open_boundary: bool,
    ) {
        for run in runs {
            if run.len > max {
                self.violate(
                    rule,
                    format!("nurse {nurse}: {} consecutive {what} exceed the maximum {max}", run.len),
                );
            }
            if run.terminator.is_some() && run.len < min {
                if skip_open_boundary && run.prior == 0 && self.touches_monday(run) {
                    continue;
                }
                self.violate(
                    rule,
                    format!("nurse {nurse}: run of {} {what} is below the minimum {min}", run.len),
                );
            }
        }
    }

    /// Whether the run's first day is Monday (or earlier, for carried runs).
    fn touches_monday(&self, run: &Run) -> bool {
        match run.terminator {
            Some(t) => t as u32 == run.len - run.prior,
            None => run.len - run.prior == DAYS_PER_WEEK as u32,
        }
    }

    fn consecutive_work_bounds(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let (min, max) = (
                contract.minimum_number_of_consecutive_working_days_hard,
                contract.maximum_number_of_consecutive_working_days_hard,
            );
            let worked = self.worked_days(n);
            let runs = scan_runs(&worked, self.boundary(n).prior_working_run());
            self.check_runs(n, "consecutive work bounds", "working days", &runs, min, max, false);

            for s in 0..WORKING_SHIFTS {
                let shift_type = self
                    .scenario
                    .shift_type(crate::data::ShiftTypeId::from_index(s).unwrap());
                let (smin, smax) = match shift_type {
                    Some(t) => (
                        t.minimum_number_of_consecutive_assignments_hard,
                        t.maximum_number_of_consecutive_assignments_hard,
                    ),
                    None => continue,
                };
                let days = self.shift_days(n, s);
                let runs = scan_runs(&days, self.boundary(n).prior_shift_run(s));
                self.check_runs(
                    n,
                    "consecutive work bounds",
                    "same-shift assignments",
                    &runs,
                    smin,
                    smax,
                    false,
                );
            }
        }
    }

    fn consecutive_off_bounds(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let (min, max) = (
                contract.minimum_number_of_consecutive_days_off_hard,
                contract.maximum_number_of_consecutive_days_off_hard,
            );
            let worked = self.worked_days(n);
            let off: [bool; DAYS_PER_WEEK] = std::array::from_fn(|d| !worked[d]);
            let boundary = self.boundary(n);
            let runs = scan_runs(&off, boundary.prior_off_run());
            let open_boundary = !boundary.off_extent_known();
            self.check_runs(n, "consecutive off bounds", "days off", &runs, min, max, open_boundary);
        }
    }

    fn incomplete_weekend_cap(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let cap = self.contract(n).maximum_number_of_incomplete_weekends;
            let seen = self.history.nurse_states[n].number_of_incomplete_weekends;
            let lonely = self.schedule.worked(n, SATURDAY) != self.schedule.worked(n, SUNDAY);
            if seen + lonely as u32 > cap {
                self.violate(
                    "incomplete weekend cap",
                    format!("nurse {n} exceeds the cap of {cap} incomplete weekends"),
                );
            }
        }
    }

    fn total_assignment_bounds(&mut self) {
        let elapsed = self.history.week + 1;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let done = self.history.nurse_states[n].number_of_assignments;
            let total = done + self.schedule.assignments_of(n);
            let hi = prorated_max(
                contract.maximum_number_of_assignments_hard,
                elapsed,
                self.total_weeks,
            );
            let lo = prorated_min(
                contract.minimum_number_of_assignments_hard,
                elapsed,
                self.total_weeks,
            );
            if total > hi || total < lo {
                self.violate(
                    "total assignment bounds",
                    format!(
                        "nurse {n} stands at {total} assignments after week {}, outside [{lo}, {hi}]",
                        self.history.week
                    ),
                );
            }
        }
    }

    fn minimal_free_period(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let len = self
                .contract(n)
                .minimal_free_period
                .min(DAYS_PER_WEEK as u32) as usize;
            if len == 0 {
                continue;
            }
            let worked = self.worked_days(n);
            let found = (0..=DAYS_PER_WEEK - len)
                .any(|start| worked[start..start + len].iter().all(|w| !w));
            if !found {
                self.violate(
                    "minimal free period",
                    format!("nurse {n} has no free period of {len} days this week"),
                );
            }
        }
    }

    fn paired_shift_day(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        let pair = [PAIRED_SHIFTS.0.index(), PAIRED_SHIFTS.1.index()];
        for n in nurses {
            for d in 0..DAYS_PER_WEEK {
                let shifts = self.schedule.worked_shifts(n, d);
                if shifts.len() > 2 {
                    self.violate(
                        "paired shift day",
                        format!("nurse {n} works {} shifts on day {d}", shifts.len()),
                    );
                } else if shifts.len() == 2 && shifts != pair {
                    self.violate(
                        "paired shift day",
                        format!(
                            "nurse {n} works a double day {d} outside the {}+{} exception",
                            PAIRED_SHIFTS.0, PAIRED_SHIFTS.1
                        ),
                    );
                }
            }
        }
    }

    fn restricted_shift_types(&mut self) {
        let scenario = self.scenario;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            for restriction in &scenario.nurses[n].shift_restrictions {
                if !restriction.shift.is_working() {
                    continue;
                }
                let s = restriction.shift.index();
                let used = self.history.nurse_states[n].number_of_assignments_per_shift[s];
                let this_week = (0..DAYS_PER_WEEK)
                    .filter(|&d| self.schedule.shift_worked(n, d, s))
                    .count() as u32;
                if used + this_week > restriction.maximum_total {
                    self.violate(
                        "restricted shift types",
                        format!(
                            "nurse {n} reaches {} {} shifts, over her cap of {}",
                            used + this_week,
                            restriction.shift,
                            restriction.maximum_total
                        ),
                    );
                }
            }
        }
    }

    fn vacations(&mut self) {
        let week = self.week;
        for &n in &week.vacations {
            if n >= self.scenario.nurses.len() {
                continue;
            }
            let count = self.schedule.assignments_of(n);
            if count > 0 {
                self.violate(
                    "vacations",
                    format!("nurse {n} is on vacation but holds {count} assignments"),
                );
            }
        }
    }

    // ---- soft rules; formulas mirror the model objective ----

    fn optimal_coverage(&mut self) {
        let week = self.week;
        for req in &week.coverage {
            if req.optimal == 0 || !req.shift.is_working() {
                continue;
            }
            let covered =
                self.schedule
                    .covered_heads(req.day.index(), req.shift.index(), req.skill.index());
            let short = req.optimal.saturating_sub(covered) as i64;
            self.penalty += weights::OPTIMAL_COVERAGE * short;
        }
    }

    fn off_requests(&mut self) {
        let week = self.week;
        for request in &week.shift_off_requests {
            if self.on_vacation(request.nurse) {
                continue;
            }
            let d = request.day.index();
            let hit = match request.shift {
                crate::data::ShiftTypeId::Any => self.schedule.worked(request.nurse, d),
                s if s.is_working() => self.schedule.shift_worked(request.nurse, d, s.index()),
                _ => false,
            };
            if hit {
                self.penalty += weights::OFF_REQUEST;
            }
        }
    }

    fn working_weekend_limit(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let cap = self.contract(n).maximum_number_of_working_weekends;
            let seen = self.history.nurse_states[n].number_of_working_weekends;
            let weekend = self.schedule.worked(n, SATURDAY) || self.schedule.worked(n, SUNDAY);
            if seen >= cap && weekend {
                self.penalty += weights::WORKING_WEEKENDS_OVER;
            }
        }
    }

    fn incomplete_weekend_penalty(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            if !self.contract(n).complete_weekends {
                continue;
            }
            if self.schedule.worked(n, SATURDAY) != self.schedule.worked(n, SUNDAY) {
                self.penalty += weights::INCOMPLETE_WEEKEND;
            }
        }
    }

    fn assignment_balance(&mut self) {
        let elapsed = self.history.week + 1;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let done = self.history.nurse_states[n].number_of_assignments as i64;
            let this_week = self.schedule.assignments_of(n) as i64;

            let room = (contract.maximum_number_of_assignments as i64 - done).max(0);
            self.penalty += weights::TOTAL_ASSIGNMENTS * (this_week - room).max(0);

            let floor = prorated_min(
                contract.minimum_number_of_assignments,
                elapsed,
                self.total_weeks,
            ) as i64
                - done;
            if floor > 0 {
                self.penalty += weights::TOTAL_ASSIGNMENTS * (floor - this_week).max(0);
            }
        }
    }

    fn window_excess(
        &self,
        days: &[bool; DAYS_PER_WEEK],
        prior_run: u32,
        max: u32,
        count_off: bool,
    ) -> i64 {
        let mut excess = 0i64;
        for d in 0..DAYS_PER_WEEK {
            let before = (max as i64 - d as i64).max(0) as u32;
            let prior = prior_run.min(before);
            let start = (d as i64 - max as i64).max(0) as usize;
            let inside = (start..=d).filter(|&j| days[j] != count_off).count() as i64;
            excess += (inside + prior as i64 - max as i64).max(0);
        }
        excess
    }

    fn consecutive_over_max(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let boundary = self.boundary(n);
            let worked = self.worked_days(n);

            self.penalty += weights::CONSECUTIVE_DAYS_OVER
                * self.window_excess(
                    &worked,
                    boundary.prior_working_run(),
                    contract.maximum_number_of_consecutive_working_days,
                    false,
                );
            self.penalty += weights::CONSECUTIVE_DAYS_OVER
                * self.window_excess(
                    &worked,
                    boundary.prior_off_run(),
                    contract.maximum_number_of_consecutive_days_off,
                    true,
                );

            for s in 0..WORKING_SHIFTS {
                let smax = match self
                    .scenario
                    .shift_type(crate::data::ShiftTypeId::from_index(s).unwrap())
                {
                    Some(t) => t.maximum_number_of_consecutive_assignments,
                    None => continue,
                };
                let days = self.shift_days(n, s);
                self.penalty += weights::CONSECUTIVE_SHIFT_OVER
                    * self.window_excess(&days, boundary.prior_shift_run(s), smax, false);
            }
        }
    }

    fn charge_short_runs(
        &mut self,
        runs: &[Run],
        min: u32,
        weight: i64,
        skip_open_boundary: bool,
    ) {
        for run in runs {
            if run.terminator.is_none() || run.len >= min {
                continue;
            }
            if skip_open_boundary && run.prior == 0 && self.touches_monday(run) {
                continue;
            }
            self.penalty += weight * (min - run.len) as i64;
        }
    }

    fn consecutive_under_min(&mut self) {
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let contract = self.contract(n);
            let boundary = self.boundary(n);
            let worked = self.worked_days(n);

            let runs = scan_runs(&worked, boundary.prior_working_run());
            self.charge_short_runs(
                &runs,
                contract.minimum_number_of_consecutive_working_days,
                weights::CONSECUTIVE_DAYS_UNDER,
                false,
            );

            let off: [bool; DAYS_PER_WEEK] = std::array::from_fn(|d| !worked[d]);
            let off_runs = scan_runs(&off, boundary.prior_off_run());
            let open_boundary = !boundary.off_extent_known();
            self.charge_short_runs(
                &off_runs,
                contract.minimum_number_of_consecutive_days_off,
                weights::CONSECUTIVE_DAYS_UNDER,
                open_boundary,
            );

            for s in 0..WORKING_SHIFTS {
                let smin = match self
                    .scenario
                    .shift_type(crate::data::ShiftTypeId::from_index(s).unwrap())
                {
                    Some(t) => t.minimum_number_of_consecutive_assignments,
                    None => continue,
                };
                let days = self.shift_days(n, s);
                let runs = scan_runs(&days, boundary.prior_shift_run(s));
                self.charge_short_runs(&runs, smin, weights::CONSECUTIVE_SHIFT_UNDER, false);
            }
        }
    }

    fn if_needed_skills(&mut self) {
        let scenario = self.scenario;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let nurse = &scenario.nurses[n];
            for &skill in &nurse.skills_if_needed {
                if !nurse.has_skill_if_needed(skill) {
                    continue;
                }
                let uses = iproduct!(0..DAYS_PER_WEEK, 0..WORKING_SHIFTS)
                    .filter(|&(d, s)| self.schedule.is_assigned(n, d, s, skill.index()))
                    .count() as i64;
                self.penalty += weights::IF_NEEDED_SKILL * uses;
            }
        }
    }

    fn overtime_wishes(&mut self) {
        let elapsed = self.history.week + 1;
        let nurses: Vec<usize> = self.active_nurses().collect();
        for n in nurses {
            let nurse = &self.scenario.nurses[n];
            if nurse.desired_overtime == 0 {
                continue;
            }
            let contract = self.contract(n);
            let target = contract.maximum_number_of_assignments + nurse.desired_overtime;
            let done = self.history.nurse_states[n].number_of_assignments as i64;
            let needed = prorated_min(target, elapsed, self.total_weeks) as i64 - done;
            if needed > 0 {
                let this_week = self.schedule.assignments_of(n) as i64;
                self.penalty += weights::UNMET_OVERTIME * (needed - this_week).max(0);
            }
        }
    }
}
