//! External solver execution.
//!
//! A solve is one subprocess run: encode the instance, write the model into
//! a scratch directory, invoke the engine with its native time limit, then
//! parse whatever it produced. The scratch directory lives exactly as long
//! as the run.

pub mod outcome;
pub mod registry;

mod process;

pub use outcome::{RawAssignment, RawOutcome, RawVerdict};
pub use registry::{EngineSpec, OutputProtocol};

use std::fs;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, StsError};
use crate::model::{self, EncodedModel};
use crate::problem::ProblemSpec;

/// Runs the engine named by `spec` on the plain model.
pub fn solve(spec: &ProblemSpec) -> Result<RawOutcome> {
    run_model(spec, &model::build(spec))
}

/// Runs the engine on a probe with the imbalance bounded by `bound`.
pub fn solve_with_bound(spec: &ProblemSpec, bound: u32) -> Result<RawOutcome> {
    run_model(spec, &model::build_with_bound(spec, bound))
}

fn run_model(spec: &ProblemSpec, encoded: &EncodedModel) -> Result<RawOutcome> {
    let engine = registry::lookup(spec.paradigm, &spec.solver)?;
    let dir = tempfile::tempdir()?;
    let model_path = dir
        .path()
        .join(format!("model.{}", encoded.format.file_ext()));
    fs::write(&model_path, &encoded.text)?;
    let solution_path = dir.path().join("solution.sol");

    let argv = engine.command_line(
        &model_path,
        &solution_path,
        spec.time_limit_ms,
        &encoded.extra_args,
    );
    debug!(solver = %engine.name, model_bytes = encoded.text.len(), "spawning engine");
    let run = process::run(&argv, Duration::from_millis(spec.time_limit_ms), &engine.name)?;

    let solution_text = if engine.solution_file {
        fs::read_to_string(&solution_path).unwrap_or_default()
    } else {
        String::new()
    };
    let parsed = outcome::parse(
        engine.protocol,
        &run.stdout,
        &run.stderr,
        &solution_text,
        run.exit_code,
    );
    let mut out = match parsed {
        Ok(o) => o,
        // A killed engine that left nothing parsable is a timeout, not a
        // protocol violation.
        Err(_) if run.killed => {
            return Err(StsError::Timeout {
                limit_ms: spec.time_limit_ms,
            })
        }
        Err(e) => return Err(e),
    };
    out.wall_ms = run.wall.as_millis() as u64;
    out.timed_out = run.killed;
    if run.killed && out.verdict == RawVerdict::Unknown && out.assignment.is_none() {
        return Err(StsError::Timeout {
            limit_ms: spec.time_limit_ms,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Paradigm;

    fn stub(name: &str, script: &str, protocol: OutputProtocol, solution_file: bool) -> EngineSpec {
        EngineSpec {
            name: name.to_string(),
            paradigm: Paradigm::Sat,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            protocol,
            solution_file,
        }
    }

    #[test]
    fn test_stub_engine_sees_the_model_file() {
        registry::register_stub(stub(
            "stub-model-check",
            "test -s {model} && echo 's UNSATISFIABLE'",
            OutputProtocol::Dimacs,
            false,
        ));
        let spec = ProblemSpec::new(6, Paradigm::Sat).with_solver("stub-model-check");
        let out = solve(&spec).unwrap();
        assert_eq!(out.verdict, RawVerdict::Unsat);
        assert!(!out.timed_out);
    }

    #[test]
    fn test_hung_engine_times_out() {
        registry::register_stub(stub("stub-hang", "sleep 30", OutputProtocol::Dimacs, false));
        let spec = ProblemSpec::new(6, Paradigm::Sat)
            .with_solver("stub-hang")
            .with_time_limit_ms(50);
        match solve(&spec) {
            Err(StsError::Timeout { limit_ms }) => assert_eq!(limit_ms, 50),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_solution_file_protocols_read_the_file() {
        registry::register_stub(stub(
            "stub-solu",
            "printf 'Optimal - objective value 2\\n0 x_1_2_1_1 1 0\\n' > {solution}",
            OutputProtocol::CbcSol,
            true,
        ));
        let spec = ProblemSpec::new(6, Paradigm::Sat).with_solver("stub-solu");
        let out = solve(&spec).unwrap();
        assert_eq!(out.verdict, RawVerdict::Sat);
        assert!(out.proved_optimal);
        assert_eq!(out.objective, Some(2));
    }
}
