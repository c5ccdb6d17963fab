use crate::data::{ContractId, ShiftTypeId};
use crate::validator::RuleViolation;
use thiserror::Error;

/// Malformed input shape handed to the model builder. Always a programming
/// error in the calling code, never recovered silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelBuildError {
    #[error("history tracks {history} nurses but the scenario has {scenario}")]
    HistoryLengthMismatch { history: usize, scenario: usize },
    #[error("nurse index {nurse} out of range ({count} nurses in the scenario)")]
    UnknownNurse { nurse: usize, count: usize },
    #[error("nurse {nurse} references contract {contract:?} missing from the scenario")]
    UnknownContract { nurse: usize, contract: ContractId },
    #[error("scenario declares no bounds for shift type {shift}")]
    UnknownShiftType { shift: ShiftTypeId },
    #[error("coverage requirement uses non-working shift {shift}")]
    NonWorkingCoverageShift { shift: ShiftTypeId },
    #[error("history is at week {week} but the horizon only has {total_weeks} weeks")]
    WeekOutOfHorizon { week: u32, total_weeks: u32 },
}

/// The validator contradicts the engine's feasibility claim for a solved week.
/// A builder/engine defect; the run aborts loudly instead of trusting the engine.
#[derive(Debug, Clone, Error)]
#[error("week {week}: engine-accepted schedule fails independent validation ({} violations)", .violations.len())]
pub struct ValidationFailure {
    pub week: u32,
    pub violations: Vec<RuleViolation>,
}

/// A toggle combination rejected at the pre-run veto point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting rule toggles {first} and {second}: {reason}")]
pub struct ConfigurationConflict {
    pub first: String,
    pub second: String,
    pub reason: String,
}

/// Anything that aborts a rolling-horizon run. Per-week infeasibility is not
/// an error: it ends the run with the sentinel aggregate value instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Build(#[from] ModelBuildError),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Conflict(#[from] ConfigurationConflict),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_name_the_offender() {
        let err = ModelBuildError::HistoryLengthMismatch {
            history: 3,
            scenario: 5,
        };
        assert_eq!(
            err.to_string(),
            "history tracks 3 nurses but the scenario has 5"
        );
    }

    #[test]
    fn run_error_wraps_the_taxonomy() {
        let err: RunError = ModelBuildError::UnknownNurse { nurse: 9, count: 2 }.into();
        assert!(matches!(err, RunError::Build(_)));
        assert!(err.to_string().contains("nurse index 9"));
    }
}
