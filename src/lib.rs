//! Multi-week nurse duty rostering on a rolling horizon.
//!
//! One week is encoded as an ILP (hard rules as constraints, soft rules as
//! weighted penalty terms), handed to the HiGHS backend through `good_lp`,
//! independently re-validated, and folded into the rolling per-nurse history
//! that seeds the next week. A run over W weeks is a strict left-to-right
//! loop: an infeasible week ends it with the sentinel aggregate value 99999.
//!
//! Entry points: [`RollingHorizonSolver`] for full runs,
//! [`build_week_model`] + [`engine::solve_week`] for single weeks, and
//! [`ScheduleValidator`] to check or score any schedule without a solver.

pub mod calendar;
pub mod data;
pub mod engine;
pub mod error;
pub mod hard_rules;
pub mod history;
pub mod horizon;
pub mod model;
pub mod soft_rules;
pub mod validator;
pub mod weights;

#[cfg(test)]
pub(crate) mod testkit;

pub use data::{
    Contract, ContractId, CoverageRequirement, History, Nurse, NurseState, RuleToggles, Scenario,
    ShiftOffRequest, ShiftType, ShiftTypeId, SkillId, WeekData, WeekSchedule, Weekday,
};
pub use engine::{solve_week, SolveOutcome, SolveSettings, SolveStatus};
pub use error::{ConfigurationConflict, ModelBuildError, RunError, ValidationFailure};
pub use history::advance_history;
pub use horizon::{
    default_time_budget, HorizonResult, PreflightCheck, RollingHorizonSolver, WeekOutcome,
    RUN_FAILURE_VALUE,
};
pub use model::{build_week_model, BuildInput, ModelRule, WeekModel};
pub use validator::{HorizonReport, RuleViolation, ScheduleValidator, WeekReport};
