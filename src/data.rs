use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type NurseId = usize;

/// Days in a scheduling week; weeks always start on Monday.
pub const DAYS_PER_WEEK: usize = 7;
/// Working shift types (Early, Day, Late, Night). `Any` and `None` are markers.
pub const WORKING_SHIFTS: usize = 4;
pub const SKILL_COUNT: usize = 4;
pub const SATURDAY: usize = 5;
pub const SUNDAY: usize = 6;

/// The one two-shift combination a single day may legally hold under the
/// relaxed day rule.
pub const PAIRED_SHIFTS: (ShiftTypeId, ShiftTypeId) = (ShiftTypeId::Early, ShiftTypeId::Night);

/// Shift type ordinals; part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ShiftTypeId {
    Early = 0,
    Day = 1,
    Late = 2,
    Night = 3,
    /// Only valid inside off requests ("any shift that day").
    Any = 4,
    /// Only valid inside history ("nothing assigned").
    None = 5,
}

impl ShiftTypeId {
    pub fn is_working(self) -> bool {
        (self as u8) < WORKING_SHIFTS as u8
    }

    /// Index into the dense working-shift dimension. Callers must hold a working shift.
    pub fn index(self) -> usize {
        debug_assert!(self.is_working());
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ShiftTypeId> {
        match index {
            0 => Some(ShiftTypeId::Early),
            1 => Some(ShiftTypeId::Day),
            2 => Some(ShiftTypeId::Late),
            3 => Some(ShiftTypeId::Night),
            _ => Option::None,
        }
    }
}

impl From<ShiftTypeId> for u8 {
    fn from(s: ShiftTypeId) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for ShiftTypeId {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ShiftTypeId::Early),
            1 => Ok(ShiftTypeId::Day),
            2 => Ok(ShiftTypeId::Late),
            3 => Ok(ShiftTypeId::Night),
            4 => Ok(ShiftTypeId::Any),
            5 => Ok(ShiftTypeId::None),
            _ => Err(format!("unknown shift type ordinal {v}")),
        }
    }
}

impl fmt::Display for ShiftTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShiftTypeId::Early => "Early",
            ShiftTypeId::Day => "Day",
            ShiftTypeId::Late => "Late",
            ShiftTypeId::Night => "Night",
            ShiftTypeId::Any => "Any",
            ShiftTypeId::None => "None",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SkillId {
    HeadNurse = 0,
    Nurse = 1,
    Caretaker = 2,
    Trainee = 3,
}

impl SkillId {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<SkillId> {
        match index {
            0 => Some(SkillId::HeadNurse),
            1 => Some(SkillId::Nurse),
            2 => Some(SkillId::Caretaker),
            3 => Some(SkillId::Trainee),
            _ => None,
        }
    }
}

impl From<SkillId> for u8 {
    fn from(s: SkillId) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for SkillId {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        SkillId::from_index(v as usize).ok_or_else(|| format!("unknown skill ordinal {v}"))
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillId::HeadNurse => "HeadNurse",
            SkillId::Nurse => "Nurse",
            SkillId::Caretaker => "Caretaker",
            SkillId::Trainee => "Trainee",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ContractId {
    FullTime = 0,
    PartTime = 1,
    HalfTime = 2,
}

impl From<ContractId> for u8 {
    fn from(c: ContractId) -> u8 {
        c as u8
    }
}

impl TryFrom<u8> for ContractId {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ContractId::FullTime),
            1 => Ok(ContractId::PartTime),
            2 => Ok(ContractId::HalfTime),
            _ => Err(format!("unknown contract ordinal {v}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Weekday {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

impl Weekday {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<Weekday> for u8 {
    fn from(d: Weekday) -> u8 {
        d as u8
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Weekday::Monday),
            1 => Ok(Weekday::Tuesday),
            2 => Ok(Weekday::Wednesday),
            3 => Ok(Weekday::Thursday),
            4 => Ok(Weekday::Friday),
            5 => Ok(Weekday::Saturday),
            6 => Ok(Weekday::Sunday),
            _ => Err(format!("unknown weekday ordinal {v}")),
        }
    }
}

/// Cumulative cap on how often a nurse may take one particular shift type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRestriction {
    pub shift: ShiftTypeId,
    pub maximum_total: u32,
}

/// A nurse with her contract, skills and personal restrictions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nurse {
    pub id: NurseId,
    pub name: String,
    pub contract: ContractId,
    pub skills: Vec<SkillId>,
    #[serde(default)]
    pub skills_if_needed: Vec<SkillId>,
    #[serde(default)]
    pub shift_restrictions: Vec<ShiftRestriction>,
    /// Extra assignments the nurse wants over the whole horizon; 0 = none declared.
    #[serde(default)]
    pub desired_overtime: u32,
}

impl Nurse {
    pub fn has_skill(&self, skill: SkillId) -> bool {
        self.skills.contains(&skill)
    }

    pub fn has_skill_if_needed(&self, skill: SkillId) -> bool {
        !self.has_skill(skill) && self.skills_if_needed.contains(&skill)
    }
}

/// Work rules attached to a contract type. Assignment totals are horizon totals;
/// all min/max pairs come in a soft and a hard flavor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub minimum_number_of_assignments: u32,
    pub maximum_number_of_assignments: u32,
    pub minimum_number_of_assignments_hard: u32,
    pub maximum_number_of_assignments_hard: u32,
    pub minimum_number_of_consecutive_working_days: u32,
    pub maximum_number_of_consecutive_working_days: u32,
    pub minimum_number_of_consecutive_working_days_hard: u32,
    pub maximum_number_of_consecutive_working_days_hard: u32,
    pub minimum_number_of_consecutive_days_off: u32,
    pub maximum_number_of_consecutive_days_off: u32,
    pub minimum_number_of_consecutive_days_off_hard: u32,
    pub maximum_number_of_consecutive_days_off_hard: u32,
    pub maximum_number_of_working_weekends: u32,
    pub complete_weekends: bool,
    pub maximum_number_of_incomplete_weekends: u32,
    /// Shortest all-off window every nurse needs within a week.
    pub minimal_free_period: u32,
}

/// Consecutive-assignment bounds and succession rules for one shift type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftType {
    pub id: ShiftTypeId,
    pub minimum_number_of_consecutive_assignments: u32,
    pub maximum_number_of_consecutive_assignments: u32,
    pub minimum_number_of_consecutive_assignments_hard: u32,
    pub maximum_number_of_consecutive_assignments_hard: u32,
    #[serde(default)]
    pub forbidden_successors: Vec<ShiftTypeId>,
}

/// Immutable per-run master data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub nurses: Vec<Nurse>,
    pub contracts: Vec<Contract>,
    pub shift_types: Vec<ShiftType>,
    pub skills: Vec<SkillId>,
}

impl Scenario {
    pub fn contract_of(&self, nurse: &Nurse) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == nurse.contract)
    }

    pub fn shift_type(&self, id: ShiftTypeId) -> Option<&ShiftType> {
        self.shift_types.iter().find(|s| s.id == id)
    }
}

/// Minimum and optimal headcount for a (day, shift, skill) slot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRequirement {
    pub day: Weekday,
    pub shift: ShiftTypeId,
    pub skill: SkillId,
    pub minimum: u32,
    pub optimal: u32,
}

/// A request to be off for one shift, or the whole day when `shift` is `Any`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftOffRequest {
    pub nurse: NurseId,
    pub day: Weekday,
    pub shift: ShiftTypeId,
}

/// Everything that varies from week to week.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekData {
    #[serde(default)]
    pub coverage: Vec<CoverageRequirement>,
    #[serde(default)]
    pub shift_off_requests: Vec<ShiftOffRequest>,
    #[serde(default)]
    pub vacations: Vec<NurseId>,
}

/// Rolling per-nurse counters carried across the week boundary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NurseState {
    pub last_assigned_shift_type: ShiftTypeId,
    pub number_of_consecutive_working_days: u32,
    pub number_of_consecutive_days_off: u32,
    /// Run length of the same shift type ending on the last worked day.
    pub number_of_consecutive_assignments: u32,
    pub number_of_assignments: u32,
    pub number_of_assignments_per_shift: [u32; WORKING_SHIFTS],
    pub number_of_working_weekends: u32,
    pub number_of_incomplete_weekends: u32,
}

impl Default for NurseState {
    fn default() -> Self {
        NurseState {
            last_assigned_shift_type: ShiftTypeId::None,
            number_of_consecutive_working_days: 0,
            number_of_consecutive_days_off: 0,
            number_of_consecutive_assignments: 0,
            number_of_assignments: 0,
            number_of_assignments_per_shift: [0; WORKING_SHIFTS],
            number_of_working_weekends: 0,
            number_of_incomplete_weekends: 0,
        }
    }
}

/// The one mutable record of a run: week counter plus one state per nurse.
/// Owned by the orchestrator, advanced in place by the history updater.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub week: u32,
    pub nurse_states: Vec<NurseState>,
}

impl History {
    pub fn fresh(nurse_count: usize) -> History {
        History {
            week: 0,
            nurse_states: vec![NurseState::default(); nurse_count],
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which rules participate in a run. Wire keys are the rule codes h1..h12 / s1..s9;
/// field names say what each code gates. Everything defaults to on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleToggles {
    #[serde(rename = "h1", default = "default_true")]
    pub single_shift_per_day: bool,
    #[serde(rename = "h2", default = "default_true")]
    pub minimum_coverage: bool,
    #[serde(rename = "h3", default = "default_true")]
    pub forbidden_successions: bool,
    #[serde(rename = "h4", default = "default_true")]
    pub skill_membership: bool,
    #[serde(rename = "h5", default = "default_true")]
    pub consecutive_work_bounds: bool,
    #[serde(rename = "h6", default = "default_true")]
    pub consecutive_off_bounds: bool,
    #[serde(rename = "h7", default = "default_true")]
    pub incomplete_weekend_cap: bool,
    #[serde(rename = "h8", default = "default_true")]
    pub total_assignment_bounds: bool,
    #[serde(rename = "h9", default = "default_true")]
    pub minimal_free_period: bool,
    #[serde(rename = "h10", default = "default_true")]
    pub paired_shift_day: bool,
    #[serde(rename = "h11", default = "default_true")]
    pub restricted_shift_types: bool,
    #[serde(rename = "h12", default = "default_true")]
    pub vacations: bool,
    #[serde(rename = "s1", default = "default_true")]
    pub optimal_coverage: bool,
    #[serde(rename = "s2", default = "default_true")]
    pub off_requests: bool,
    #[serde(rename = "s3", default = "default_true")]
    pub working_weekend_limit: bool,
    #[serde(rename = "s4", default = "default_true")]
    pub incomplete_weekend_penalty: bool,
    #[serde(rename = "s5", default = "default_true")]
    pub assignment_balance: bool,
    #[serde(rename = "s6", default = "default_true")]
    pub consecutive_over_max: bool,
    #[serde(rename = "s7", default = "default_true")]
    pub consecutive_under_min: bool,
    #[serde(rename = "s8", default = "default_true")]
    pub if_needed_skills: bool,
    #[serde(rename = "s9", default = "default_true")]
    pub overtime_wishes: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        RuleToggles {
            single_shift_per_day: true,
            minimum_coverage: true,
            forbidden_successions: true,
            skill_membership: true,
            consecutive_work_bounds: true,
            consecutive_off_bounds: true,
            incomplete_weekend_cap: true,
            total_assignment_bounds: true,
            minimal_free_period: true,
            paired_shift_day: true,
            restricted_shift_types: true,
            vacations: true,
            optimal_coverage: true,
            off_requests: true,
            working_weekend_limit: true,
            incomplete_weekend_penalty: true,
            assignment_balance: true,
            consecutive_over_max: true,
            consecutive_under_min: true,
            if_needed_skills: true,
            overtime_wishes: true,
        }
    }
}

impl RuleToggles {
    /// Everything switched off; useful as a base when testing single rules.
    pub fn none() -> RuleToggles {
        RuleToggles {
            single_shift_per_day: false,
            minimum_coverage: false,
            forbidden_successions: false,
            skill_membership: false,
            consecutive_work_bounds: false,
            consecutive_off_bounds: false,
            incomplete_weekend_cap: false,
            total_assignment_bounds: false,
            minimal_free_period: false,
            paired_shift_day: false,
            restricted_shift_types: false,
            vacations: false,
            optimal_coverage: false,
            off_requests: false,
            working_weekend_limit: false,
            incomplete_weekend_penalty: false,
            assignment_balance: false,
            consecutive_over_max: false,
            consecutive_under_min: false,
            if_needed_skills: false,
            overtime_wishes: false,
        }
    }
}

/// Dense 0/1 map over (nurse, day, working shift, skill). Shift and working-day
/// indicators are derived, never stored, so they cannot drift out of sync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WeekSchedule {
    nurse_count: usize,
    bits: Vec<bool>,
}

impl WeekSchedule {
    pub fn empty(nurse_count: usize) -> WeekSchedule {
        WeekSchedule {
            nurse_count,
            bits: vec![false; nurse_count * DAYS_PER_WEEK * WORKING_SHIFTS * SKILL_COUNT],
        }
    }

    pub fn nurse_count(&self) -> usize {
        self.nurse_count
    }

    fn offset(&self, nurse: NurseId, day: usize, shift: usize, skill: usize) -> usize {
        debug_assert!(nurse < self.nurse_count && day < DAYS_PER_WEEK);
        debug_assert!(shift < WORKING_SHIFTS && skill < SKILL_COUNT);
        ((nurse * DAYS_PER_WEEK + day) * WORKING_SHIFTS + shift) * SKILL_COUNT + skill
    }

    pub fn is_assigned(&self, nurse: NurseId, day: usize, shift: usize, skill: usize) -> bool {
        self.bits[self.offset(nurse, day, shift, skill)]
    }

    pub fn set(&mut self, nurse: NurseId, day: usize, shift: usize, skill: usize, value: bool) {
        let at = self.offset(nurse, day, shift, skill);
        self.bits[at] = value;
    }

    pub fn assign(&mut self, nurse: NurseId, day: usize, shift: usize, skill: usize) {
        self.set(nurse, day, shift, skill, true);
    }

    /// Number of skills recorded for one (nurse, day, shift) slot; >1 is malformed.
    pub fn skill_count(&self, nurse: NurseId, day: usize, shift: usize) -> u32 {
        (0..SKILL_COUNT)
            .filter(|&sk| self.is_assigned(nurse, day, shift, sk))
            .count() as u32
    }

    pub fn shift_worked(&self, nurse: NurseId, day: usize, shift: usize) -> bool {
        (0..SKILL_COUNT).any(|sk| self.is_assigned(nurse, day, shift, sk))
    }

    pub fn worked(&self, nurse: NurseId, day: usize) -> bool {
        (0..WORKING_SHIFTS).any(|s| self.shift_worked(nurse, day, s))
    }

    /// Shifts worked on one day, in ordinal order.
    pub fn worked_shifts(&self, nurse: NurseId, day: usize) -> Vec<usize> {
        (0..WORKING_SHIFTS)
            .filter(|&s| self.shift_worked(nurse, day, s))
            .collect()
    }

    /// Total shift assignments of one nurse this week (a double-shift day counts twice).
    pub fn assignments_of(&self, nurse: NurseId) -> u32 {
        (0..DAYS_PER_WEEK)
            .map(|d| self.worked_shifts(nurse, d).len() as u32)
            .sum()
    }

    /// Heads covering one (day, shift, skill) slot across all nurses.
    pub fn covered_heads(&self, day: usize, shift: usize, skill: usize) -> u32 {
        (0..self.nurse_count)
            .filter(|&n| self.is_assigned(n, day, shift, skill))
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_type_ordinals_are_wire_stable() {
        assert_eq!(u8::from(ShiftTypeId::Early), 0);
        assert_eq!(u8::from(ShiftTypeId::Night), 3);
        assert_eq!(u8::from(ShiftTypeId::Any), 4);
        assert_eq!(u8::from(ShiftTypeId::None), 5);
        assert_eq!(ShiftTypeId::try_from(2).unwrap(), ShiftTypeId::Late);
        assert!(ShiftTypeId::try_from(6).is_err());
        assert!(!ShiftTypeId::Any.is_working());
        assert!(ShiftTypeId::Night.is_working());
    }

    #[test]
    fn toggles_serialize_under_rule_codes() {
        let toggles = RuleToggles::default();
        let json = serde_json::to_value(&toggles).unwrap();
        assert_eq!(json["h1"], true);
        assert_eq!(json["s9"], true);

        let parsed: RuleToggles = serde_json::from_str(r#"{"h1": false, "s2": false}"#).unwrap();
        assert!(!parsed.single_shift_per_day);
        assert!(!parsed.off_requests);
        // unnamed toggles default to on
        assert!(parsed.minimum_coverage);
        assert!(parsed.overtime_wishes);
    }

    #[test]
    fn schedule_indicators_are_derived() {
        let mut schedule = WeekSchedule::empty(2);
        schedule.assign(1, 3, ShiftTypeId::Late.index(), SkillId::Nurse.index());

        assert!(schedule.is_assigned(1, 3, 2, 1));
        assert!(schedule.shift_worked(1, 3, 2));
        assert!(schedule.worked(1, 3));
        assert!(!schedule.worked(0, 3));
        assert_eq!(schedule.worked_shifts(1, 3), vec![2]);
        assert_eq!(schedule.assignments_of(1), 1);
        assert_eq!(schedule.covered_heads(3, 2, 1), 1);
        assert_eq!(schedule.skill_count(1, 3, 2), 1);
    }

    #[test]
    fn nurse_documents_round_trip_camel_case() {
        let nurse = Nurse {
            id: 0,
            name: "Patricia".to_string(),
            contract: ContractId::FullTime,
            skills: vec![SkillId::HeadNurse, SkillId::Nurse],
            skills_if_needed: vec![SkillId::Caretaker],
            shift_restrictions: vec![ShiftRestriction {
                shift: ShiftTypeId::Night,
                maximum_total: 10,
            }],
            desired_overtime: 2,
        };
        let json = serde_json::to_value(&nurse).unwrap();
        assert_eq!(json["skillsIfNeeded"], serde_json::json!([2]));
        assert_eq!(json["desiredOvertime"], 2);

        let back: Nurse = serde_json::from_value(json).unwrap();
        assert!(back.has_skill(SkillId::Nurse));
        assert!(back.has_skill_if_needed(SkillId::Caretaker));
        assert!(!back.has_skill_if_needed(SkillId::Nurse));
    }
}
