//! Week-boundary arithmetic derived from a nurse's rolling state.
//!
//! Every rule that looks across the Monday boundary goes through this module:
//! day -1 is worked iff the consecutive-working-days counter is positive, day -k
//! is worked iff k does not exceed that counter, and symmetrically for days off
//! and the same-shift streak. Keeping the resolution here is what lets the model
//! builder and the validator agree on one authoritative boundary formula.

use crate::data::{NurseState, ShiftTypeId, DAYS_PER_WEEK};

/// Read-only view of one nurse's state at the week boundary.
#[derive(Debug, Clone, Copy)]
pub struct Boundary<'a> {
    state: &'a NurseState,
}

impl<'a> Boundary<'a> {
    pub fn new(state: &'a NurseState) -> Boundary<'a> {
        Boundary { state }
    }

    pub fn worked_yesterday(&self) -> bool {
        self.state.number_of_consecutive_working_days > 0
    }

    pub fn prior_working_run(&self) -> u32 {
        self.state.number_of_consecutive_working_days
    }

    pub fn prior_off_run(&self) -> u32 {
        self.state.number_of_consecutive_days_off
    }

    /// Length of the same-shift streak reaching day -1, for one working shift index.
    pub fn prior_shift_run(&self, shift: usize) -> u32 {
        match self.state.last_assigned_shift_type {
            s if s.is_working() && s.index() == shift && self.worked_yesterday() => {
                self.state.number_of_consecutive_assignments
            }
            _ => 0,
        }
    }

    pub fn last_shift(&self) -> ShiftTypeId {
        self.state.last_assigned_shift_type
    }

    /// Whether the off-day extent before day 0 is known. A brand-new history
    /// (all counters zero) leaves it open; day-off runs touching the boundary
    /// are then neither forced nor charged.
    pub fn off_extent_known(&self) -> bool {
        self.worked_yesterday() || self.state.number_of_consecutive_days_off > 0
    }

    /// How many of the `days_before_week` days right before day 0 were worked.
    pub fn worked_in_window(&self, days_before_week: u32) -> u32 {
        self.prior_working_run().min(days_before_week)
    }

    pub fn off_in_window(&self, days_before_week: u32) -> u32 {
        self.prior_off_run().min(days_before_week)
    }

    pub fn shift_in_window(&self, shift: usize, days_before_week: u32) -> u32 {
        self.prior_shift_run(shift).min(days_before_week)
    }
}

/// A maximal run of equal day-status, possibly reaching back across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Total length, including the days before the week when the run crosses day 0.
    pub len: u32,
    /// How many of those days lie before the week.
    pub prior: u32,
    /// First in-week day on which the run has ended, when it ends inside the week.
    pub terminator: Option<usize>,
}

/// Enumerates the maximal true-runs of a week grid. `prior` is the run length
/// reaching day -1 from history; it extends a run containing day 0, and a prior
/// run cut off immediately (day 0 false) is reported with no in-week days.
pub fn scan_runs(days: &[bool; DAYS_PER_WEEK], prior: u32) -> Vec<Run> {
    let mut runs = Vec::new();
    if prior > 0 && !days[0] {
        runs.push(Run {
            len: prior,
            prior,
            terminator: Some(0),
        });
    }
    let mut start = None;
    for day in 0..=DAYS_PER_WEEK {
        let on = day < DAYS_PER_WEEK && days[day];
        match (start, on) {
            (None, true) => start = Some(day),
            (Some(s), false) => {
                let carried = if s == 0 { prior } else { 0 };
                runs.push(Run {
                    len: carried + (day - s) as u32,
                    prior: carried,
                    terminator: if day < DAYS_PER_WEEK { Some(day) } else { None },
                });
                start = None;
            }
            _ => {}
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NurseState;

    fn state(work: u32, off: u32, last: ShiftTypeId, streak: u32) -> NurseState {
        NurseState {
            last_assigned_shift_type: last,
            number_of_consecutive_working_days: work,
            number_of_consecutive_days_off: off,
            number_of_consecutive_assignments: streak,
            ..NurseState::default()
        }
    }

    #[test]
    fn boundary_resolves_negative_days_from_counters() {
        let s = state(3, 0, ShiftTypeId::Late, 2);
        let b = Boundary::new(&s);
        assert!(b.worked_yesterday());
        assert_eq!(b.worked_in_window(2), 2);
        assert_eq!(b.worked_in_window(5), 3);
        assert_eq!(b.off_in_window(4), 0);
        assert_eq!(b.prior_shift_run(ShiftTypeId::Late.index()), 2);
        assert_eq!(b.prior_shift_run(ShiftTypeId::Early.index()), 0);
    }

    #[test]
    fn fresh_history_leaves_off_extent_open() {
        let s = NurseState::default();
        let b = Boundary::new(&s);
        assert!(!b.worked_yesterday());
        assert!(!b.off_extent_known());
        assert_eq!(b.off_in_window(7), 0);

        let rested = state(0, 2, ShiftTypeId::None, 0);
        assert!(Boundary::new(&rested).off_extent_known());
    }

    #[test]
    fn scan_finds_runs_and_terminators() {
        // W W O O W W W
        let days = [true, true, false, false, true, true, true];
        let runs = scan_runs(&days, 0);
        assert_eq!(
            runs,
            vec![
                Run { len: 2, prior: 0, terminator: Some(2) },
                Run { len: 3, prior: 0, terminator: None },
            ]
        );
    }

    #[test]
    fn scan_extends_boundary_run_and_reports_cut_off_prior() {
        let days = [true, false, false, false, false, false, false];
        let runs = scan_runs(&days, 2);
        assert_eq!(runs, vec![Run { len: 3, prior: 2, terminator: Some(1) }]);

        let off_week = [false; 7];
        let runs = scan_runs(&off_week, 1);
        assert_eq!(runs, vec![Run { len: 1, prior: 1, terminator: Some(0) }]);
        assert!(scan_runs(&off_week, 0).is_empty());
    }
}
