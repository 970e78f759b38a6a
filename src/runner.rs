//! Single-run orchestration: solve, decode, verify, classify.
//!
//! CP and MIP engines optimize natively, so one subprocess settles a run.
//! SAT and SMT only answer decision questions; their optimization runs are
//! a binary search over the imbalance bound, each probe a fresh engine
//! process carved out of the remaining budget. A verified witness tightens
//! the upper end of the window to its actual imbalance, which regularly
//! skips probe bounds outright.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::decode;
use crate::error::{Result, StsError};
use crate::problem::{Paradigm, ProblemSpec};
use crate::report::{self, ResultEntry, RunStatus};
use crate::schedule::Schedule;
use crate::solve::{self, RawAssignment, RawVerdict};
use crate::verify::{self, Violation, ViolationKind};

/// Probes shorter than this cannot say anything useful.
const MIN_PROBE_MS: u64 = 100;

/// Outcome of one configured run; errors are folded into the status.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub status: RunStatus,
    pub schedule: Option<Schedule>,
    pub objective: Option<u32>,
    pub wall_ms: u64,
}

impl RunResult {
    fn status_only(status: RunStatus, wall_ms: u64) -> Self {
        Self {
            status,
            schedule: None,
            objective: None,
            wall_ms,
        }
    }

    pub fn to_entry(&self, spec: &ProblemSpec) -> ResultEntry {
        ResultEntry {
            time: (self.wall_ms / 1000).min(spec.time_limit_ms / 1000),
            status: self.status,
            obj: self.objective,
            sol: self.schedule.as_ref().and_then(Schedule::to_rows),
        }
    }
}

/// Runs one configuration end to end. Never panics and never returns an
/// error: whatever goes wrong becomes the corresponding status.
pub fn execute(spec: &ProblemSpec) -> RunResult {
    let start = Instant::now();
    if let Err(e) = spec.validate() {
        warn!(error = %e, "invalid configuration");
        return RunResult::status_only(RunStatus::ConfigError, 0);
    }
    let result = if spec.optimize && matches!(spec.paradigm, Paradigm::Sat | Paradigm::Smt) {
        minimize_by_probes(spec, start)
    } else {
        single_run(spec, start)
    };
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            let status = report::status_for_error(&e);
            warn!(error = %e, %status, "run failed");
            RunResult::status_only(status, start.elapsed().as_millis() as u64)
        }
    };
    info!(
        solver = %spec.solver,
        n = spec.n_teams,
        status = %result.status,
        wall_ms = result.wall_ms,
        "run finished"
    );
    result
}

/// Decodes and verifies a claimed solution, returning it with its
/// verified maximum imbalance.
fn check(spec: &ProblemSpec, assignment: &RawAssignment) -> Result<(Schedule, u32)> {
    let schedule = decode::decode(spec, assignment)?;
    match verify::verify(spec.n_teams, &schedule) {
        Ok(()) => {
            let imbalance = verify::max_imbalance(&schedule);
            Ok((schedule, imbalance))
        }
        Err(violations) => {
            warn!(count = violations.len(), "schedule failed verification");
            Err(StsError::Verification(violations))
        }
    }
}

fn claimed_assignment(outcome: &solve::RawOutcome) -> Result<&RawAssignment> {
    outcome
        .assignment
        .as_ref()
        .ok_or_else(|| StsError::Engine("satisfiable verdict without an assignment".to_string()))
}

fn single_run(spec: &ProblemSpec, start: Instant) -> Result<RunResult> {
    let outcome = solve::solve(spec)?;
    let wall_ms = start.elapsed().as_millis() as u64;
    match outcome.verdict {
        RawVerdict::Unsat => Ok(RunResult::status_only(RunStatus::ProvenInfeasible, wall_ms)),
        RawVerdict::Unknown => Ok(RunResult::status_only(RunStatus::Unknown, wall_ms)),
        RawVerdict::Sat => {
            let (schedule, imbalance) = check(spec, claimed_assignment(&outcome)?)?;
            if spec.optimize {
                if let Some(claimed) = outcome.objective {
                    if claimed != i64::from(imbalance) {
                        return Err(StsError::Verification(vec![Violation {
                            kind: ViolationKind::Objective,
                            message: format!(
                                "engine reported objective {claimed}, recomputed {imbalance}"
                            ),
                        }]));
                    }
                }
            }
            let status = if spec.optimize && outcome.proved_optimal {
                RunStatus::Optimal
            } else {
                RunStatus::Feasible
            };
            Ok(RunResult {
                status,
                schedule: Some(schedule),
                objective: spec.optimize.then_some(imbalance),
                wall_ms,
            })
        }
    }
}

fn probe(spec: &ProblemSpec, bound: u32, deadline: Instant) -> Result<solve::RawOutcome> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left < Duration::from_millis(MIN_PROBE_MS) {
        return Err(StsError::Timeout {
            limit_ms: spec.time_limit_ms,
        });
    }
    let probe_spec = spec.clone().with_time_limit_ms(left.as_millis() as u64);
    solve::solve_with_bound(&probe_spec, bound)
}

fn minimize_by_probes(spec: &ProblemSpec, start: Instant) -> Result<RunResult> {
    let deadline = Instant::now() + Duration::from_millis(spec.time_limit_ms);
    let weeks = spec.weeks();

    // First probe at the vacuous bound settles feasibility.
    let outcome = probe(spec, weeks, deadline)?;
    let wall = |s: Instant| s.elapsed().as_millis() as u64;
    match outcome.verdict {
        RawVerdict::Unsat => {
            return Ok(RunResult::status_only(RunStatus::ProvenInfeasible, wall(start)))
        }
        RawVerdict::Unknown => return Ok(RunResult::status_only(RunStatus::Unknown, wall(start))),
        RawVerdict::Sat => {}
    }
    let (mut best, mut upper) = check(spec, claimed_assignment(&outcome)?)?;
    // Every team plays an odd number of weeks, so imbalance 0 is out of
    // reach and 1 is the floor of the search window.
    let mut lower = 1u32;

    while lower < upper {
        let mid = lower + (upper - lower) / 2;
        let outcome = match probe(spec, mid, deadline) {
            Ok(o) => o,
            Err(StsError::Timeout { .. }) => break,
            Err(e) => return Err(e),
        };
        match outcome.verdict {
            RawVerdict::Sat => {
                let (schedule, imbalance) = check(spec, claimed_assignment(&outcome)?)?;
                if imbalance > mid {
                    return Err(StsError::Engine(format!(
                        "witness imbalance {imbalance} exceeds probe bound {mid}"
                    )));
                }
                debug!(bound = mid, imbalance, "probe satisfiable");
                best = schedule;
                upper = imbalance;
            }
            RawVerdict::Unsat => {
                debug!(bound = mid, "probe unsatisfiable");
                lower = mid + 1;
            }
            RawVerdict::Unknown => break,
        }
    }

    let status = if lower >= upper {
        RunStatus::Optimal
    } else {
        RunStatus::Feasible
    };
    Ok(RunResult {
        status,
        schedule: Some(best),
        objective: Some(upper),
        wall_ms: wall(start),
    })
}
