//! End-to-end rolling-horizon runs through the real HiGHS backend: trivially
//! satisfiable weeks, an over-demanding week driving the run to the sentinel,
//! and history coupling across the week boundary.

use roster_solver::{
    Contract, ContractId, CoverageRequirement, History, Nurse, RollingHorizonSolver, RuleToggles,
    Scenario, ScheduleValidator, ShiftType, ShiftTypeId, SkillId, WeekData, WeekSchedule, Weekday,
    RUN_FAILURE_VALUE,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn loose_contract() -> Contract {
    Contract {
        id: ContractId::FullTime,
        minimum_number_of_assignments: 0,
        maximum_number_of_assignments: 100,
        minimum_number_of_assignments_hard: 0,
        maximum_number_of_assignments_hard: 100,
        minimum_number_of_consecutive_working_days: 1,
        maximum_number_of_consecutive_working_days: 7,
        minimum_number_of_consecutive_working_days_hard: 1,
        maximum_number_of_consecutive_working_days_hard: 7,
        minimum_number_of_consecutive_days_off: 1,
        maximum_number_of_consecutive_days_off: 28,
        minimum_number_of_consecutive_days_off_hard: 1,
        maximum_number_of_consecutive_days_off_hard: 28,
        maximum_number_of_working_weekends: 100,
        complete_weekends: false,
        maximum_number_of_incomplete_weekends: 100,
        minimal_free_period: 0,
    }
}

fn shift_type(id: ShiftTypeId) -> ShiftType {
    ShiftType {
        id,
        minimum_number_of_consecutive_assignments: 1,
        maximum_number_of_consecutive_assignments: 7,
        minimum_number_of_consecutive_assignments_hard: 1,
        maximum_number_of_consecutive_assignments_hard: 7,
        forbidden_successors: Vec::new(),
    }
}

fn scenario(nurse_count: usize) -> Scenario {
    Scenario {
        nurses: (0..nurse_count)
            .map(|id| Nurse {
                id,
                name: format!("nurse-{id}"),
                contract: ContractId::FullTime,
                skills: vec![
                    SkillId::HeadNurse,
                    SkillId::Nurse,
                    SkillId::Caretaker,
                    SkillId::Trainee,
                ],
                skills_if_needed: Vec::new(),
                shift_restrictions: Vec::new(),
                desired_overtime: 0,
            })
            .collect(),
        contracts: vec![loose_contract()],
        shift_types: vec![
            shift_type(ShiftTypeId::Early),
            shift_type(ShiftTypeId::Day),
            shift_type(ShiftTypeId::Late),
            shift_type(ShiftTypeId::Night),
        ],
        skills: vec![
            SkillId::HeadNurse,
            SkillId::Nurse,
            SkillId::Caretaker,
            SkillId::Trainee,
        ],
    }
}

fn require(day: Weekday, shift: ShiftTypeId, skill: SkillId, heads: u32) -> CoverageRequirement {
    CoverageRequirement {
        day,
        shift,
        skill,
        minimum: heads,
        optimal: heads,
    }
}

fn extracted_schedules(result: &roster_solver::HorizonResult) -> Vec<WeekSchedule> {
    result
        .weeks
        .iter()
        .map(|w| w.schedule.clone().expect("accepted week has a schedule"))
        .collect()
}

#[test]
fn one_covered_slot_solves_clean() {
    init_logging();
    let scenario = scenario(1);
    let toggles = RuleToggles::default();
    let mut week = WeekData::default();
    week.coverage.push(require(
        Weekday::Monday,
        ShiftTypeId::Early,
        SkillId::HeadNurse,
        1,
    ));

    let solver = RollingHorizonSolver::new(&scenario, &toggles).with_time_budget(10.0);
    let result = solver.run(&[week], &History::fresh(1)).unwrap();

    assert!(!result.failed());
    assert_eq!(result.aggregate_value, 0);
    assert!(result.weeks[0].status.accepted());
    assert!(result.assignment(0, 0, ShiftTypeId::Early.index(), SkillId::HeadNurse.index()));
}

#[test]
fn impossible_coverage_fixes_the_sentinel() {
    init_logging();
    let scenario = scenario(1);
    let toggles = RuleToggles::default();
    let mut week = WeekData::default();
    week.coverage.push(require(
        Weekday::Monday,
        ShiftTypeId::Early,
        SkillId::HeadNurse,
        2,
    ));

    let solver = RollingHorizonSolver::new(&scenario, &toggles).with_time_budget(10.0);
    let result = solver.run(&[week], &History::fresh(1)).unwrap();

    assert!(result.failed());
    assert_eq!(result.aggregate_value, RUN_FAILURE_VALUE);
    assert_eq!(result.weeks.len(), 1);
    assert!(!result.weeks[0].status.accepted());
    assert_eq!(result.weeks[0].value, RUN_FAILURE_VALUE);
}

#[test]
fn history_carries_forbidden_successions_across_weeks() {
    init_logging();
    let mut scenario = scenario(1);
    scenario
        .shift_types
        .iter_mut()
        .find(|s| s.id == ShiftTypeId::Night)
        .unwrap()
        .forbidden_successors = vec![ShiftTypeId::Early];
    let toggles = RuleToggles::default();

    let mut first = WeekData::default();
    first.coverage.push(require(
        Weekday::Sunday,
        ShiftTypeId::Night,
        SkillId::Nurse,
        1,
    ));
    let mut second = WeekData::default();
    second.coverage.push(require(
        Weekday::Monday,
        ShiftTypeId::Early,
        SkillId::Nurse,
        1,
    ));

    let solver = RollingHorizonSolver::new(&scenario, &toggles).with_time_budget(10.0);
    let result = solver
        .run(&[first, second], &History::fresh(1))
        .unwrap();

    // week 0 ends on a Night, so week 1 cannot staff Monday's Early
    assert!(result.failed());
    assert_eq!(result.weeks.len(), 2);
    assert!(result.weeks[0].status.accepted());
    assert!(!result.weeks[1].status.accepted());
    assert!(result.assignment(0, 6, ShiftTypeId::Night.index(), SkillId::Nurse.index()));
}

#[test]
fn solved_horizon_passes_independent_validation() {
    init_logging();
    let scenario = scenario(2);
    let toggles = RuleToggles::default();

    let mut week = WeekData::default();
    for day in [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday] {
        week.coverage
            .push(require(day, ShiftTypeId::Day, SkillId::Nurse, 1));
    }
    let weeks = vec![week.clone(), week];

    let solver = RollingHorizonSolver::new(&scenario, &toggles).with_time_budget(10.0);
    let initial = History::fresh(2);
    let result = solver.run(&weeks, &initial).unwrap();
    assert!(!result.failed());

    let validator = ScheduleValidator::new(&scenario, &toggles, weeks.len() as u32);
    let schedules = extracted_schedules(&result);
    let report = validator.validate_horizon(&weeks, &schedules, &initial);

    assert!(report.is_valid());
    // the aggregate is exactly the validator's uniform score
    assert_eq!(result.aggregate_value, report.total_penalty());
}
