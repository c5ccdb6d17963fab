//! Thin wrapper around the ILP backend. The drafted week model is attached to
//! the solver here and nowhere else; the rest of the crate never sees a solver
//! type. Solves are pinned to one worker thread and a fixed seed so
//! comparative runs stay reproducible.

use good_lp::{default_solver, ResolutionError, Solution, SolverModel};
use itertools::iproduct;
use log::{info, warn};
use std::fmt;
use std::time::Instant;

use crate::data::{WeekSchedule, DAYS_PER_WEEK, SKILL_COUNT, WORKING_SHIFTS};
use crate::model::WeekModel;

/// The engine's verdict on one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// Incumbent accepted at the budget limit; reported by backends that can
    /// hand back a partial search result.
    Feasible,
    Infeasible,
    NoSolutionFound,
}

impl SolveStatus {
    /// Whether the orchestrator may keep rolling on this status.
    pub fn accepted(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::NoSolutionFound => "NO_SOLUTION_FOUND",
        };
        write!(f, "{name}")
    }
}

/// Per-call solver knobs. The thread count is not one of them.
#[derive(Debug, Clone, Copy)]
pub struct SolveSettings {
    pub time_budget: f64,
    pub random_seed: i32,
}

impl Default for SolveSettings {
    fn default() -> Self {
        SolveSettings {
            time_budget: 60.0,
            random_seed: 1234,
        }
    }
}

/// Outcome of one week's solve; a schedule exists exactly on accepted statuses.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    Solved {
        status: SolveStatus,
        objective: f64,
        schedule: WeekSchedule,
    },
    Unsolved { status: SolveStatus },
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Solved { status, .. } => *status,
            SolveOutcome::Unsolved { status } => *status,
        }
    }
}

fn failure_status(error: &ResolutionError) -> SolveStatus {
    match error {
        ResolutionError::Infeasible => SolveStatus::Infeasible,
        _ => SolveStatus::NoSolutionFound,
    }
}

/// Hands one drafted week model to the backend and extracts the assignment.
pub fn solve_week(model: WeekModel, settings: &SolveSettings) -> SolveOutcome {
    let start_time = Instant::now();
    let nurse_count = model.nurse_count();

    // extraction handles survive the handoff below
    let skill_vars: Vec<_> = iproduct!(0..nurse_count, 0..DAYS_PER_WEEK, 0..WORKING_SHIFTS, 0..SKILL_COUNT)
        .map(|(n, d, s, sk)| ((n, d, s, sk), model.skill_var(n, d, s, sk)))
        .collect();

    info!(
        "Starting ILP solver: {} constraints, {} penalty terms, {:.1}s budget...",
        model.constraint_count(),
        model.penalty_term_count(),
        settings.time_budget
    );

    let WeekModel {
        problem,
        constraints,
        objective,
        ..
    } = model;

    let mut solver_model = problem
        .minimise(objective.clone())
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", settings.random_seed)
        .set_option("time_limit", settings.time_budget)
        .set_option("log_to_console", false);
    for constraint in constraints {
        solver_model.add_constraint(constraint);
    }

    let solution = match solver_model.solve() {
        Ok(solution) => solution,
        Err(error) => {
            let status = failure_status(&error);
            warn!("Solver returned {status}: {error}");
            return SolveOutcome::Unsolved { status };
        }
    };

    let mut schedule = WeekSchedule::empty(nurse_count);
    for ((n, d, s, sk), var) in &skill_vars {
        if solution.value(*var) > 0.9 {
            schedule.assign(*n, *d, *s, *sk);
        }
    }
    let realized = solution.eval(objective);
    info!(
        "Solution found in {:.2?} with objective {realized:.0}",
        start_time.elapsed()
    );

    SolveOutcome::Solved {
        status: SolveStatus::Optimal,
        objective: realized,
        schedule,
    }
}
