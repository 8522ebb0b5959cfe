use crate::backtrack::BacktrackSolver;
use crate::config::{SolveConfig, SolverEngine};
use crate::data::{
    ClassId, RoomId, ScheduledSlot, SchedulingInput, SchedulingOutput, Session, SessionId,
    SolveStatus,
};
use crate::error::ConfigError;
use crate::expand::expand_curriculum;
use crate::homeroom::allocate_home_rooms;
use crate::model::{Instance, TimetableModel};
use crate::report::score_assignment;
use good_lp::{ResolutionError, Solution, SolverModel, default_solver};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Runs one full solve: session expansion, home-room allocation, model
/// construction, and search under the configured engine and budget.
///
/// Configuration errors are returned before any search is attempted.
/// Infeasibility and budget expiry are not errors; they come back as
/// [`SolveStatus`] values with counts preserved.
pub fn solve(
    input: &SchedulingInput,
    config: &SolveConfig,
) -> Result<SchedulingOutput, ConfigError> {
    let start_time = Instant::now();

    let mut sessions = expand_curriculum(&input.curriculum)?;
    if !config.include_optional_subjects {
        let optional: HashSet<&str> = input
            .subjects
            .iter()
            .filter(|s| s.is_optional)
            .map(|s| s.id.as_str())
            .collect();
        sessions.retain(|s| !optional.contains(s.subject_id.as_str()));
    }

    let home_rooms = allocate_home_rooms(&input.classes, &input.rooms)?;

    let output = match config.engine {
        SolverEngine::Ilp => solve_ilp(input, &sessions, &home_rooms, config),
        SolverEngine::Backtracking => solve_backtracking(input, &sessions, config),
    };
    info!(
        "Solve finished in {:.2?}: {:?}, {}/{} sessions scheduled.",
        start_time.elapsed(),
        output.status,
        output.sessions_scheduled,
        output.sessions_total
    );
    Ok(output)
}

fn solve_ilp(
    input: &SchedulingInput,
    sessions: &[Session],
    home_rooms: &HashMap<ClassId, RoomId>,
    config: &SolveConfig,
) -> SchedulingOutput {
    let instance = Instance::new(input, sessions, home_rooms);
    let TimetableModel {
        problem,
        vars,
        constraints,
        objective,
    } = TimetableModel::build(&instance, config);

    info!("Starting ILP solver...");
    let mut ilp = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", config.threads)
        .set_option("random_seed", config.random_seed)
        .set_option("time_limit", config.time_limit_secs)
        .set_option("log_to_console", false);
    for constraint in constraints {
        ilp.add_constraint(constraint);
    }

    match ilp.solve() {
        Ok(solution) => {
            let mut assignment: BTreeMap<SessionId, ScheduledSlot> = BTreeMap::new();
            for (&(si, ti, ri), var) in &vars.assign {
                if solution.value(*var) > 0.9 {
                    let slot = instance.slots[ti];
                    assignment.insert(
                        sessions[si].id,
                        ScheduledSlot {
                            day: slot.day,
                            period: slot.period,
                            room_id: instance.rooms[ri].id.clone(),
                        },
                    );
                }
            }
            finish(input, sessions, assignment, config)
        }
        Err(ResolutionError::Infeasible) => {
            info!("Model proven infeasible.");
            no_solution(sessions.len())
        }
        Err(e) => {
            warn!("Solver returned no usable solution: {}", e);
            no_solution(sessions.len())
        }
    }
}

fn solve_backtracking(
    input: &SchedulingInput,
    sessions: &[Session],
    config: &SolveConfig,
) -> SchedulingOutput {
    let budget = Duration::from_secs_f64(config.time_limit_secs.max(0.0));
    let result = BacktrackSolver::new(input, sessions, budget).run();
    let assignment: BTreeMap<SessionId, ScheduledSlot> = result
        .assignment
        .into_iter()
        .map(|(sid, (slot, room_id))| {
            (
                sid,
                ScheduledSlot {
                    day: slot.day,
                    period: slot.period,
                    room_id,
                },
            )
        })
        .collect();
    finish(input, sessions, assignment, config)
}

/// Derives the terminal status from the assignment counts and attaches the
/// soft-constraint report.
fn finish(
    input: &SchedulingInput,
    sessions: &[Session],
    assignment: BTreeMap<SessionId, ScheduledSlot>,
    config: &SolveConfig,
) -> SchedulingOutput {
    let (score, unmet_soft_constraints) = score_assignment(input, sessions, &assignment, config);
    let sessions_scheduled = assignment.len();
    let status = if sessions_scheduled == sessions.len() {
        SolveStatus::Success
    } else if sessions_scheduled > 0 {
        SolveStatus::Partial
    } else {
        SolveStatus::Infeasible
    };
    SchedulingOutput {
        status,
        sessions_total: sessions.len(),
        sessions_scheduled,
        assignment,
        score,
        unmet_soft_constraints,
    }
}

fn no_solution(sessions_total: usize) -> SchedulingOutput {
    SchedulingOutput {
        status: SolveStatus::Infeasible,
        sessions_total,
        sessions_scheduled: 0,
        assignment: BTreeMap::new(),
        score: 0,
        unmet_soft_constraints: Vec::new(),
    }
}
