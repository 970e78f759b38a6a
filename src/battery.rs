//! Battery driver: the full configuration matrix over a set of sizes.
//!
//! A battery crosses every paradigm with every registered engine, both
//! symmetry-breaking settings, every CP heuristic level, and both the
//! satisfy and optimize goals, for each instance size. Runs are fault
//! tolerant: a missing binary or a timeout becomes a recorded status,
//! never an abort, so one battery invocation always produces a complete
//! result grid.
//!
//! With the `parallel` feature enabled and `jobs > 1`, runs execute on a
//! rayon pool. Results are collected in matrix order and written out
//! after all runs finish, so concurrent runs never contend for the same
//! result file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::error::Result;
use crate::problem::{Paradigm, ProblemSpec, DEFAULT_TIME_LIMIT_MS};
use crate::report::{self, RunStatus};
use crate::runner::{self, RunResult};
use crate::solve::registry;

/// Instance sizes a battery covers unless told otherwise.
pub const DEFAULT_TEAM_SIZES: [u32; 5] = [6, 8, 10, 12, 14];

/// CP search-heuristic levels exercised by the battery.
const CP_HEURISTIC_LEVELS: [u8; 4] = [1, 2, 3, 4];

/// Settings for one battery invocation.
#[derive(Debug, Clone)]
pub struct BatteryConfig {
    /// Team counts to run, in order.
    pub team_sizes: Vec<u32>,
    /// Restrict the battery to one paradigm; `None` runs all four.
    pub paradigm: Option<Paradigm>,
    /// Wall-clock budget per run, in milliseconds.
    pub time_limit_ms: u64,
    /// Directory the result files are written under.
    pub out_dir: PathBuf,
    /// Worker threads; `1` runs sequentially even with `parallel` built in.
    pub jobs: usize,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            team_sizes: DEFAULT_TEAM_SIZES.to_vec(),
            paradigm: None,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            out_dir: PathBuf::from("res"),
            jobs: 1,
        }
    }
}

/// Status counts over a finished battery.
#[derive(Debug, Clone, Default)]
pub struct BatterySummary {
    /// Number of runs executed.
    pub total: usize,
    /// How many runs ended in each status.
    pub by_status: BTreeMap<RunStatus, usize>,
}

impl BatterySummary {
    /// Count of runs that finished with `status`.
    pub fn count(&self, status: RunStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

impl fmt::Display for BatterySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} runs", self.total)?;
        for (status, count) in &self.by_status {
            write!(f, ", {count} {status}")?;
        }
        Ok(())
    }
}

/// Expands the configuration matrix into the run list, in the order runs
/// execute and results are written: paradigm, then size, then engine,
/// symmetry breaking, heuristic level, and goal.
pub fn plan(config: &BatteryConfig) -> Vec<ProblemSpec> {
    let mut specs = Vec::new();
    for paradigm in Paradigm::ALL {
        if config.paradigm.is_some_and(|only| only != paradigm) {
            continue;
        }
        let levels: Vec<Option<u8>> = match paradigm {
            Paradigm::Cp => CP_HEURISTIC_LEVELS.iter().map(|&l| Some(l)).collect(),
            _ => vec![None],
        };
        for &n in &config.team_sizes {
            for solver in registry::solvers_for(paradigm) {
                for sb in [false, true] {
                    for &level in &levels {
                        for opt in [false, true] {
                            let mut spec = ProblemSpec::new(n, paradigm)
                                .with_solver(&solver)
                                .with_symmetry_breaking(sb)
                                .with_optimize(opt)
                                .with_time_limit_ms(config.time_limit_ms);
                            if let Some(level) = level {
                                spec = spec.with_heuristic(level);
                            }
                            specs.push(spec);
                        }
                    }
                }
            }
        }
    }
    specs
}

/// Runs the whole battery and persists every result.
///
/// Individual runs cannot fail the battery; only I/O trouble while
/// writing result files surfaces as an error.
pub fn run(config: &BatteryConfig) -> Result<BatterySummary> {
    let specs = plan(config);
    info!(
        runs = specs.len(),
        sizes = ?config.team_sizes,
        jobs = config.jobs,
        "battery started"
    );
    let results = execute_all(config, &specs);

    let mut summary = BatterySummary {
        total: results.len(),
        ..BatterySummary::default()
    };
    for (spec, result) in specs.iter().zip(&results) {
        *summary.by_status.entry(result.status).or_default() += 1;
        report::save(&config.out_dir, spec, result.to_entry(spec))?;
    }
    info!(total = summary.total, summary = %summary, "battery finished");
    Ok(summary)
}

#[cfg(not(feature = "parallel"))]
fn execute_all(_config: &BatteryConfig, specs: &[ProblemSpec]) -> Vec<RunResult> {
    specs.iter().map(runner::execute).collect()
}

#[cfg(feature = "parallel")]
fn execute_all(config: &BatteryConfig, specs: &[ProblemSpec]) -> Vec<RunResult> {
    use rayon::prelude::*;

    if config.jobs <= 1 {
        return specs.iter().map(runner::execute).collect();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
    {
        Ok(pool) => pool.install(|| specs.par_iter().map(runner::execute).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "thread pool setup failed, running sequentially");
            specs.iter().map(runner::execute).collect()
        }
    }
}
