//! Run statuses and the persisted result files.
//!
//! Results land under `<out_dir>/<PARADIGM>/<n>.json`, one file per
//! paradigm and instance size, keyed by solver configuration. Files are
//! merged on write so a battery can be rerun piecemeal without losing
//! earlier entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StsError};
use crate::problem::{Paradigm, ProblemSpec};

/// Final classification of one run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The engine proved no schedule exists.
    ProvenInfeasible,
    /// A schedule was found and independently verified.
    Feasible,
    /// A verified schedule with a proved-optimal objective.
    Optimal,
    /// Budget exhausted, nothing proved either way.
    Unknown,
    /// The request itself was invalid.
    ConfigError,
    /// The solver binary could not be started.
    SolverUnavailable,
    /// The engine failed or spoke an unrecognized dialect.
    SolverError,
    /// The engine claimed a solution the verifier rejected.
    VerificationFailure,
}

impl RunStatus {
    /// Process exit code: completed runs exit 0 whatever the verdict,
    /// configuration mistakes 2, missing binaries 3, everything else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::ProvenInfeasible
            | RunStatus::Feasible
            | RunStatus::Optimal
            | RunStatus::Unknown => 0,
            RunStatus::ConfigError => 2,
            RunStatus::SolverUnavailable => 3,
            RunStatus::SolverError | RunStatus::VerificationFailure => 1,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::ProvenInfeasible => "PROVEN_INFEASIBLE",
            RunStatus::Feasible => "FEASIBLE",
            RunStatus::Optimal => "OPTIMAL",
            RunStatus::Unknown => "UNKNOWN",
            RunStatus::ConfigError => "CONFIG_ERROR",
            RunStatus::SolverUnavailable => "SOLVER_UNAVAILABLE",
            RunStatus::SolverError => "SOLVER_ERROR",
            RunStatus::VerificationFailure => "VERIFICATION_FAILURE",
        };
        f.write_str(name)
    }
}

/// Maps a failed run onto the status it is reported under.
pub fn status_for_error(err: &StsError) -> RunStatus {
    match err {
        StsError::Config(_) => RunStatus::ConfigError,
        StsError::Unavailable { .. } => RunStatus::SolverUnavailable,
        StsError::Timeout { .. } => RunStatus::Unknown,
        StsError::Verification(_) => RunStatus::VerificationFailure,
        StsError::Engine(_) | StsError::Io(_) | StsError::Json(_) => RunStatus::SolverError,
    }
}

/// One persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Whole seconds spent, capped at the configured budget.
    pub time: u64,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<u32>,
    /// `sol[week][period] = [home, away]`, weeks and periods zero-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sol: Option<Vec<Vec<[u32; 2]>>>,
}

/// Result-table key for one solver configuration.
pub fn config_key(spec: &ProblemSpec) -> String {
    format!(
        "{}_sb{}_hf{}_opt{}",
        spec.solver,
        u8::from(spec.symmetry_breaking),
        spec.heuristic_level(),
        u8::from(spec.optimize)
    )
}

pub fn result_path(out_dir: &Path, paradigm: Paradigm, n_teams: u32) -> PathBuf {
    out_dir
        .join(paradigm.label())
        .join(format!("{n_teams}.json"))
}

/// Inserts `entry` into the result file for `spec`, merging with whatever
/// the file already holds. A corrupt file is replaced, with a warning.
pub fn save(out_dir: &Path, spec: &ProblemSpec, entry: ResultEntry) -> Result<()> {
    let path = result_path(out_dir, spec.paradigm, spec.n_teams);
    let mut table: BTreeMap<String, ResultEntry> = match fs::read_to_string(&path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "discarding unreadable result file");
            BTreeMap::new()
        }),
        Err(_) => BTreeMap::new(),
    };
    table.insert(config_key(spec), entry);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string_pretty(&table)?)?;
    Ok(())
}

/// Reads a result file back, if present.
pub fn load(out_dir: &Path, paradigm: Paradigm, n_teams: u32) -> Result<BTreeMap<String, ResultEntry>> {
    let path = result_path(out_dir, paradigm, n_teams);
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: RunStatus) -> ResultEntry {
        ResultEntry {
            time: 3,
            status,
            obj: None,
            sol: None,
        }
    }

    #[test]
    fn test_status_serialization_names() {
        let json = serde_json::to_string(&RunStatus::ProvenInfeasible).unwrap();
        assert_eq!(json, "\"PROVEN_INFEASIBLE\"");
        let back: RunStatus = serde_json::from_str("\"VERIFICATION_FAILURE\"").unwrap();
        assert_eq!(back, RunStatus::VerificationFailure);
        assert_eq!(RunStatus::SolverUnavailable.to_string(), "SOLVER_UNAVAILABLE");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Feasible.exit_code(), 0);
        assert_eq!(RunStatus::ProvenInfeasible.exit_code(), 0);
        assert_eq!(RunStatus::Unknown.exit_code(), 0);
        assert_eq!(RunStatus::ConfigError.exit_code(), 2);
        assert_eq!(RunStatus::SolverUnavailable.exit_code(), 3);
        assert_eq!(RunStatus::SolverError.exit_code(), 1);
        assert_eq!(RunStatus::VerificationFailure.exit_code(), 1);
    }

    #[test]
    fn test_error_to_status_mapping() {
        use crate::error::StsError;
        assert_eq!(
            status_for_error(&StsError::Config("bad".into())),
            RunStatus::ConfigError
        );
        assert_eq!(
            status_for_error(&StsError::Unavailable { solver: "z3".into() }),
            RunStatus::SolverUnavailable
        );
        assert_eq!(
            status_for_error(&StsError::Timeout { limit_ms: 10 }),
            RunStatus::Unknown
        );
        assert_eq!(
            status_for_error(&StsError::Engine("eh".into())),
            RunStatus::SolverError
        );
        assert_eq!(
            status_for_error(&StsError::Verification(Vec::new())),
            RunStatus::VerificationFailure
        );
    }

    #[test]
    fn test_config_key_format() {
        use crate::problem::{Paradigm, ProblemSpec};
        let sat = ProblemSpec::new(8, Paradigm::Sat)
            .with_symmetry_breaking(true)
            .with_optimize(true);
        assert_eq!(config_key(&sat), "glucose_sb1_hf0_opt1");
        let cp = ProblemSpec::new(8, Paradigm::Cp).with_heuristic(3);
        assert_eq!(config_key(&cp), "gecode_sb0_hf3_opt0");
    }

    #[test]
    fn test_result_path_layout() {
        let path = result_path(Path::new("res"), Paradigm::Smt, 10);
        assert_eq!(path, PathBuf::from("res/SMT/10.json"));
    }

    #[test]
    fn test_save_merges_entries() {
        use crate::problem::{Paradigm, ProblemSpec};
        let dir = tempfile::tempdir().unwrap();
        let a = ProblemSpec::new(6, Paradigm::Sat);
        let b = ProblemSpec::new(6, Paradigm::Sat).with_solver("cadical");
        save(dir.path(), &a, entry(RunStatus::Feasible)).unwrap();
        save(dir.path(), &b, entry(RunStatus::Unknown)).unwrap();

        let table = load(dir.path(), Paradigm::Sat, 6).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["glucose_sb0_hf0_opt0"].status, RunStatus::Feasible);
        assert_eq!(table["cadical_sb0_hf0_opt0"].status, RunStatus::Unknown);

        // rewriting a key replaces only that entry
        save(dir.path(), &a, entry(RunStatus::Optimal)).unwrap();
        let table = load(dir.path(), Paradigm::Sat, 6).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["glucose_sb0_hf0_opt0"].status, RunStatus::Optimal);
    }

    #[test]
    fn test_save_replaces_corrupt_file() {
        use crate::problem::{Paradigm, ProblemSpec};
        let dir = tempfile::tempdir().unwrap();
        let spec = ProblemSpec::new(6, Paradigm::Mip);
        let path = result_path(dir.path(), Paradigm::Mip, 6);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json at all").unwrap();

        save(dir.path(), &spec, entry(RunStatus::Feasible)).unwrap();
        let table = load(dir.path(), Paradigm::Mip, 6).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let text = serde_json::to_string(&entry(RunStatus::Unknown)).unwrap();
        assert!(!text.contains("obj"));
        assert!(!text.contains("sol"));
    }
}
