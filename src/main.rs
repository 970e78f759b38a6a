//! Command-line front end: one configured run, or the whole battery.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::error;

use u_sts::battery::{self, BatteryConfig, DEFAULT_TEAM_SIZES};
use u_sts::problem::{Paradigm, ProblemSpec};
use u_sts::runner;

/// Round-robin tournament scheduling through external CP, SAT, SMT and
/// MIP engines.
#[derive(Debug, Parser)]
#[command(name = "u-sts", version, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["all", "single"])))]
struct Cli {
    /// Run the full configuration battery.
    #[arg(long)]
    all: bool,

    /// Run a single configuration and print the schedule.
    #[arg(long, requires = "model")]
    single: bool,

    /// Paradigm: required with --single, optional filter with --all.
    #[arg(long, value_enum)]
    model: Option<Paradigm>,

    /// Number of teams (even, at least 4).
    #[arg(long, default_value_t = 6)]
    teams: u32,

    /// Engine name; defaults to the paradigm's first engine.
    #[arg(long)]
    solver: Option<String>,

    /// Add symmetry-breaking constraints.
    #[arg(long)]
    sb: bool,

    /// Minimize the maximum home/away imbalance.
    #[arg(long)]
    opt: bool,

    /// CP search-heuristic level.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    hf: Option<u8>,

    /// Wall-clock budget per run, in seconds.
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Directory battery results are written under.
    #[arg(long, default_value = "res")]
    out_dir: PathBuf,

    /// Battery worker threads (needs the `parallel` feature).
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Battery team counts, comma separated.
    #[arg(long, value_delimiter = ',')]
    teams_list: Option<Vec<u32>>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.all {
        run_battery(&cli)
    } else {
        run_single(&cli)
    }
}

fn run_single(cli: &Cli) -> ExitCode {
    let Some(paradigm) = cli.model else {
        // clap enforces this; belt and braces for direct struct use
        eprintln!("--single needs --model");
        return ExitCode::from(2);
    };
    let mut spec = ProblemSpec::new(cli.teams, paradigm)
        .with_symmetry_breaking(cli.sb)
        .with_optimize(cli.opt)
        .with_time_limit_ms(cli.timeout.saturating_mul(1000));
    if let Some(solver) = &cli.solver {
        spec = spec.with_solver(solver);
    }
    if let Some(level) = cli.hf {
        spec = spec.with_heuristic(level);
    }

    let result = runner::execute(&spec);
    println!(
        "{} / {} / n={} / sb={} opt={}",
        spec.paradigm.label(),
        spec.solver,
        spec.n_teams,
        spec.symmetry_breaking as u8,
        spec.optimize as u8,
    );
    println!("status: {} ({} ms)", result.status, result.wall_ms);
    if let Some(obj) = result.objective {
        println!("max imbalance: {obj}");
    }
    if let Some(schedule) = &result.schedule {
        print!("{schedule}");
    }
    ExitCode::from(result.status.exit_code() as u8)
}

fn run_battery(cli: &Cli) -> ExitCode {
    let config = BatteryConfig {
        team_sizes: cli
            .teams_list
            .clone()
            .unwrap_or_else(|| DEFAULT_TEAM_SIZES.to_vec()),
        paradigm: cli.model,
        time_limit_ms: cli.timeout.saturating_mul(1000),
        out_dir: cli.out_dir.clone(),
        jobs: cli.jobs,
    };
    match battery::run(&config) {
        Ok(summary) => {
            println!("battery: {summary}");
            println!("results under {}", config.out_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "battery failed");
            eprintln!("battery failed: {e}");
            ExitCode::from(1)
        }
    }
}

/// Log filter defaults by `-v` count; `RUST_LOG` overrides outright.
fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "u_sts=warn",
        1 => "u_sts=info",
        2 => "u_sts=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
