//! Small scenario builders shared by the unit tests. Defaults are loose on
//! purpose: every bound sits where a single test can tighten exactly the rule
//! it wants to see fire.

use crate::data::{
    Contract, ContractId, CoverageRequirement, Nurse, Scenario, ShiftOffRequest, ShiftType,
    ShiftTypeId, SkillId, Weekday,
};

pub(crate) fn contract() -> Contract {
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

pub(crate) fn shift_type(id: ShiftTypeId) -> ShiftType {
    ShiftType {
        id,
        minimum_number_of_consecutive_assignments: 1,
        maximum_number_of_consecutive_assignments: 7,
        minimum_number_of_consecutive_assignments_hard: 1,
        maximum_number_of_consecutive_assignments_hard: 7,
        forbidden_successors: Vec::new(),
    }
}

/// A scenario of `count` identical full-time nurses holding every skill.
pub(crate) fn scenario(count: usize) -> Scenario {
    let nurses = (0..count)
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
        .collect();
    Scenario {
        nurses,
        contracts: vec![contract()],
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

pub(crate) fn coverage(
    day: Weekday,
    shift: ShiftTypeId,
    minimum: u32,
    optimal: u32,
) -> CoverageRequirement {
    CoverageRequirement {
        day,
        shift,
        skill: SkillId::HeadNurse,
        minimum,
        optimal,
    }
}

pub(crate) fn off_request(nurse: usize, day: Weekday, shift: ShiftTypeId) -> ShiftOffRequest {
    ShiftOffRequest { nurse, day, shift }
}
