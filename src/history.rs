//! Derives next week's rolling state from this week's solved schedule.
//! The history record is mutated in place and its week counter advanced by
//! one; the orchestrator is the only caller.

use log::debug;

use crate::data::{
    History, RuleToggles, ShiftTypeId, WeekSchedule, DAYS_PER_WEEK, SATURDAY, SUNDAY,
};

/// Folds one solved week into the rolling history.
///
/// Counters are recomputed from the week's final day backward: a worked Sunday
/// extends the working-day run and pins the last assigned shift type, an off
/// Sunday extends the off run and resets the shift memory to `None`. Runs that
/// cover the whole week continue the matching counter from last week.
pub fn advance_history(history: &mut History, schedule: &WeekSchedule, toggles: &RuleToggles) {
    for (n, state) in history.nurse_states.iter_mut().enumerate() {
        // day-level view of the week; a paired-shift day keeps its later shift
        let mut worked = [false; DAYS_PER_WEEK];
        let mut day_shift: [Option<usize>; DAYS_PER_WEEK] = [None; DAYS_PER_WEEK];
        let mut new_assignments = 0u32;
        for d in 0..DAYS_PER_WEEK {
            let shifts = schedule.worked_shifts(n, d);
            worked[d] = !shifts.is_empty();
            day_shift[d] = shifts.last().copied();
            new_assignments += shifts.len() as u32;
            for &s in &shifts {
                state.number_of_assignments_per_shift[s] += 1;
            }
        }

        if worked[DAYS_PER_WEEK - 1] {
            let mut run = 0u32;
            for d in (0..DAYS_PER_WEEK).rev() {
                if !worked[d] {
                    break;
                }
                run += 1;
            }
            if run == DAYS_PER_WEEK as u32 {
                run += state.number_of_consecutive_working_days;
            }

            let last = day_shift[DAYS_PER_WEEK - 1].unwrap();
            let mut streak = 0u32;
            for d in (0..DAYS_PER_WEEK).rev() {
                if day_shift[d] != Some(last) {
                    break;
                }
                streak += 1;
            }
            if streak == DAYS_PER_WEEK as u32
                && state.last_assigned_shift_type == ShiftTypeId::from_index(last).unwrap()
            {
                streak += state.number_of_consecutive_assignments;
            }

            state.number_of_consecutive_working_days = run;
            state.number_of_consecutive_days_off = 0;
            state.number_of_consecutive_assignments = streak;
            state.last_assigned_shift_type = ShiftTypeId::from_index(last).unwrap();
        } else {
            let mut run = 0u32;
            for d in (0..DAYS_PER_WEEK).rev() {
                if worked[d] {
                    break;
                }
                run += 1;
            }
            if run == DAYS_PER_WEEK as u32 {
                run += state.number_of_consecutive_days_off;
            }

            state.number_of_consecutive_days_off = run;
            state.number_of_consecutive_working_days = 0;
            state.number_of_consecutive_assignments = 0;
            state.last_assigned_shift_type = ShiftTypeId::None;
        }

        state.number_of_assignments += new_assignments;
        if worked[SATURDAY] || worked[SUNDAY] {
            state.number_of_working_weekends += 1;
        }
        if toggles.incomplete_weekend_cap && (worked[SATURDAY] != worked[SUNDAY]) {
            state.number_of_incomplete_weekends += 1;
        }
        debug!(
            "nurse {n}: {new_assignments} new assignments, work run {}, off run {}",
            state.number_of_consecutive_working_days, state.number_of_consecutive_days_off
        );
    }
    history.week += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NurseState, SkillId};

    fn assign_day(schedule: &mut WeekSchedule, nurse: usize, day: usize, shift: ShiftTypeId) {
        schedule.assign(nurse, day, shift.index(), SkillId::Nurse.index());
    }

    #[test]
    fn trailing_off_days_reset_shift_memory() {
        // worked Monday..Friday, free weekend
        let mut schedule = WeekSchedule::empty(1);
        for d in 0..5 {
            assign_day(&mut schedule, 0, d, ShiftTypeId::Day);
        }
        let mut history = History::fresh(1);
        advance_history(&mut history, &schedule, &RuleToggles::default());

        let state = &history.nurse_states[0];
        assert_eq!(state.number_of_consecutive_days_off, 2);
        assert_eq!(state.number_of_consecutive_working_days, 0);
        assert_eq!(state.last_assigned_shift_type, ShiftTypeId::None);
        assert_eq!(state.number_of_consecutive_assignments, 0);
        assert_eq!(state.number_of_assignments, 5);
        assert_eq!(history.week, 1);
    }

    #[test]
    fn complete_weekend_counts_once_and_is_not_incomplete() {
        // assignments on Saturday and Sunday only
        let mut schedule = WeekSchedule::empty(1);
        assign_day(&mut schedule, 0, SATURDAY, ShiftTypeId::Late);
        assign_day(&mut schedule, 0, SUNDAY, ShiftTypeId::Late);
        let mut history = History::fresh(1);
        advance_history(&mut history, &schedule, &RuleToggles::default());

        let state = &history.nurse_states[0];
        assert_eq!(state.number_of_working_weekends, 1);
        assert_eq!(state.number_of_incomplete_weekends, 0);
        assert_eq!(state.number_of_consecutive_working_days, 2);
        assert_eq!(state.last_assigned_shift_type, ShiftTypeId::Late);
    }

    #[test]
    fn lonely_saturday_is_incomplete_only_under_the_cap_rule() {
        let mut schedule = WeekSchedule::empty(1);
        assign_day(&mut schedule, 0, SATURDAY, ShiftTypeId::Early);

        let mut history = History::fresh(1);
        advance_history(&mut history, &schedule, &RuleToggles::default());
        assert_eq!(history.nurse_states[0].number_of_incomplete_weekends, 1);
        assert_eq!(history.nurse_states[0].number_of_working_weekends, 1);

        let mut history = History::fresh(1);
        let mut toggles = RuleToggles::default();
        toggles.incomplete_weekend_cap = false;
        advance_history(&mut history, &schedule, &toggles);
        assert_eq!(history.nurse_states[0].number_of_incomplete_weekends, 0);
    }

    #[test]
    fn idle_week_extends_the_off_run() {
        let schedule = WeekSchedule::empty(1);
        let mut history = History::fresh(1);
        advance_history(&mut history, &schedule, &RuleToggles::default());

        let state = &history.nurse_states[0];
        assert_eq!(state.number_of_consecutive_days_off, 7);
        assert_eq!(state.number_of_consecutive_working_days, 0);
        assert_eq!(state.last_assigned_shift_type, ShiftTypeId::None);

        // a second idle week keeps accumulating
        advance_history(&mut history, &schedule, &RuleToggles::default());
        assert_eq!(history.nurse_states[0].number_of_consecutive_days_off, 14);
        assert_eq!(history.week, 2);
    }

    #[test]
    fn full_week_continues_runs_and_streaks() {
        let mut schedule = WeekSchedule::empty(1);
        for d in 0..DAYS_PER_WEEK {
            assign_day(&mut schedule, 0, d, ShiftTypeId::Night);
        }
        let mut history = History::fresh(1);
        history.nurse_states[0] = NurseState {
            last_assigned_shift_type: ShiftTypeId::Night,
            number_of_consecutive_working_days: 2,
            number_of_consecutive_assignments: 2,
            ..NurseState::default()
        };
        advance_history(&mut history, &schedule, &RuleToggles::default());

        let state = &history.nurse_states[0];
        assert_eq!(state.number_of_consecutive_working_days, 9);
        assert_eq!(state.number_of_consecutive_assignments, 9);
        assert_eq!(state.number_of_assignments_per_shift[ShiftTypeId::Night.index()], 7);
    }

    #[test]
    fn paired_day_keeps_the_later_shift() {
        let mut schedule = WeekSchedule::empty(1);
        assign_day(&mut schedule, 0, SUNDAY, ShiftTypeId::Early);
        assign_day(&mut schedule, 0, SUNDAY, ShiftTypeId::Night);
        let mut history = History::fresh(1);
        advance_history(&mut history, &schedule, &RuleToggles::default());

        let state = &history.nurse_states[0];
        assert_eq!(state.last_assigned_shift_type, ShiftTypeId::Night);
        assert_eq!(state.number_of_assignments, 2);
        assert_eq!(state.number_of_assignments_per_shift[0], 1);
        assert_eq!(state.number_of_assignments_per_shift[3], 1);
    }
}
