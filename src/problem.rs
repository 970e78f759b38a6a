//! Problem parameters and validation.
//!
//! [`ProblemSpec`] carries everything a single run needs: the instance size,
//! the paradigm and engine, the symmetry-breaking / optimization flags, the
//! CP search-heuristic level, and the wall-clock budget. It is validated once
//! per run and passed by value through the pipeline; nothing reads run
//! parameters from process-wide state.

use crate::error::{Result, StsError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four declarative solving families.
///
/// Each paradigm owns a disjoint set of engine names (see
/// [`solve::registry`](crate::solve::registry)); requesting an engine from
/// another paradigm's set is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Paradigm {
    /// Constraint programming via MiniZinc.
    Cp,
    /// Propositional satisfiability via DIMACS CNF.
    Sat,
    /// Satisfiability modulo theories via SMT-LIB 2 (QF_LIA).
    Smt,
    /// Mixed-integer programming via LP-format files.
    Mip,
}

impl Paradigm {
    pub const ALL: [Paradigm; 4] = [Paradigm::Cp, Paradigm::Sat, Paradigm::Smt, Paradigm::Mip];

    /// Lowercase tag used on the CLI and in serialized records.
    pub fn tag(&self) -> &'static str {
        match self {
            Paradigm::Cp => "cp",
            Paradigm::Sat => "sat",
            Paradigm::Smt => "smt",
            Paradigm::Mip => "mip",
        }
    }

    /// Uppercase label used for result directories.
    pub fn label(&self) -> &'static str {
        match self {
            Paradigm::Cp => "CP",
            Paradigm::Sat => "SAT",
            Paradigm::Smt => "SMT",
            Paradigm::Mip => "MIP",
        }
    }

    /// The first engine in this paradigm's registry column.
    pub fn default_solver(&self) -> &'static str {
        match self {
            Paradigm::Cp => "gecode",
            Paradigm::Sat => "glucose",
            Paradigm::Smt => "z3",
            Paradigm::Mip => "cbc",
        }
    }
}

impl fmt::Display for Paradigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Default wall-clock budget per solver invocation: five minutes.
pub const DEFAULT_TIME_LIMIT_MS: u64 = 300_000;

/// Canonical, validated parameters for one scheduling run.
///
/// # Defaults
///
/// ```
/// use u_sts::problem::{Paradigm, ProblemSpec};
///
/// let spec = ProblemSpec::new(8, Paradigm::Sat);
/// assert_eq!(spec.weeks(), 7);
/// assert_eq!(spec.periods(), 4);
/// assert_eq!(spec.solver, "glucose");
/// assert!(spec.validate().is_ok());
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_sts::problem::{Paradigm, ProblemSpec};
///
/// let spec = ProblemSpec::new(10, Paradigm::Cp)
///     .with_solver("chuffed")
///     .with_symmetry_breaking(true)
///     .with_heuristic(3)
///     .with_optimize(true);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSpec {
    /// Number of teams; must be even and at least 4.
    pub n_teams: u32,

    /// Solving paradigm the model is encoded for.
    pub paradigm: Paradigm,

    /// External engine name within the paradigm's set.
    pub solver: String,

    /// Adds the anchor and opponent-order constraints when set.
    pub symmetry_breaking: bool,

    /// Minimizes the maximum home/away imbalance when set.
    pub optimize: bool,

    /// CP search-heuristic level in `1..=4`; meaningless (and rejected)
    /// for the other paradigms. `None` means level 1 (engine default
    /// search).
    pub heuristic: Option<u8>,

    /// Hard wall-clock budget per engine invocation, in milliseconds.
    pub time_limit_ms: u64,
}

impl ProblemSpec {
    /// Creates a spec with the paradigm's default engine and flags off.
    pub fn new(n_teams: u32, paradigm: Paradigm) -> Self {
        Self {
            n_teams,
            paradigm,
            solver: paradigm.default_solver().to_string(),
            symmetry_breaking: false,
            optimize: false,
            heuristic: None,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }

    /// Sets the engine name.
    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    /// Enables or disables symmetry breaking.
    pub fn with_symmetry_breaking(mut self, enabled: bool) -> Self {
        self.symmetry_breaking = enabled;
        self
    }

    /// Enables or disables the fairness objective.
    pub fn with_optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    /// Sets the CP search-heuristic level (1..=4).
    pub fn with_heuristic(mut self, level: u8) -> Self {
        self.heuristic = Some(level);
        self
    }

    /// Sets the wall-clock budget in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Number of weeks, `n - 1`.
    pub fn weeks(&self) -> u32 {
        self.n_teams - 1
    }

    /// Number of periods per week, `n / 2`.
    pub fn periods(&self) -> u32 {
        self.n_teams / 2
    }

    /// Total number of matches, `n (n - 1) / 2`.
    pub fn match_count(&self) -> u32 {
        self.n_teams * (self.n_teams - 1) / 2
    }

    /// Effective heuristic level: the configured level for CP (defaulting
    /// to 1), and 0 for the other paradigms, where no level applies.
    pub fn heuristic_level(&self) -> u8 {
        match self.paradigm {
            Paradigm::Cp => self.heuristic.unwrap_or(1),
            _ => 0,
        }
    }

    /// Checks every parameter rule that does not need the solver registry.
    ///
    /// Engine-name membership in the paradigm's set is checked by the
    /// runner against the registry in use.
    pub fn validate(&self) -> Result<()> {
        if self.n_teams == 2 {
            return Err(StsError::Config(
                "n_teams = 2 is degenerate (single match, no period structure)".into(),
            ));
        }
        if self.n_teams < 4 {
            return Err(StsError::Config(format!(
                "n_teams must be at least 4, got {}",
                self.n_teams
            )));
        }
        if self.n_teams % 2 != 0 {
            return Err(StsError::Config(format!(
                "n_teams must be even for a single round-robin, got {}",
                self.n_teams
            )));
        }
        if let Some(level) = self.heuristic {
            if self.paradigm != Paradigm::Cp {
                return Err(StsError::Config(format!(
                    "search-heuristic level only applies to the cp paradigm, not {}",
                    self.paradigm
                )));
            }
            if !(1..=4).contains(&level) {
                return Err(StsError::Config(format!(
                    "search-heuristic level must be in 1..=4, got {}",
                    level
                )));
            }
        }
        if self.time_limit_ms == 0 {
            return Err(StsError::Config("time limit must be positive".into()));
        }
        if self.solver.is_empty() {
            return Err(StsError::Config("solver name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = ProblemSpec::new(6, Paradigm::Cp);
        assert_eq!(spec.solver, "gecode");
        assert!(!spec.symmetry_breaking);
        assert!(!spec.optimize);
        assert!(spec.heuristic.is_none());
        assert_eq!(spec.time_limit_ms, DEFAULT_TIME_LIMIT_MS);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let spec = ProblemSpec::new(8, Paradigm::Smt)
            .with_solver("cvc5")
            .with_symmetry_breaking(true)
            .with_optimize(true)
            .with_time_limit_ms(5_000);
        assert_eq!(spec.solver, "cvc5");
        assert!(spec.symmetry_breaking);
        assert!(spec.optimize);
        assert_eq!(spec.time_limit_ms, 5_000);
    }

    // ---- Derived dimensions ----

    #[test]
    fn test_smallest_instance_dimensions() {
        // n=4: 3 weeks, 2 periods, 6 matches in total.
        let spec = ProblemSpec::new(4, Paradigm::Sat);
        assert_eq!(spec.weeks(), 3);
        assert_eq!(spec.periods(), 2);
        assert_eq!(spec.match_count(), 6);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_dimensions_n14() {
        let spec = ProblemSpec::new(14, Paradigm::Mip);
        assert_eq!(spec.weeks(), 13);
        assert_eq!(spec.periods(), 7);
        assert_eq!(spec.match_count(), 91);
    }

    // ---- Validation ----

    #[test]
    fn test_validate_odd_teams() {
        let spec = ProblemSpec::new(7, Paradigm::Sat);
        assert!(matches!(spec.validate(), Err(StsError::Config(_))));
    }

    #[test]
    fn test_validate_degenerate_two_teams() {
        let err = ProblemSpec::new(2, Paradigm::Cp).validate().unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn test_validate_zero_teams() {
        assert!(ProblemSpec::new(0, Paradigm::Cp).validate().is_err());
    }

    #[test]
    fn test_validate_heuristic_on_non_cp() {
        let spec = ProblemSpec::new(8, Paradigm::Sat).with_heuristic(2);
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("cp paradigm"));
    }

    #[test]
    fn test_validate_heuristic_range() {
        assert!(ProblemSpec::new(8, Paradigm::Cp).with_heuristic(4).validate().is_ok());
        assert!(ProblemSpec::new(8, Paradigm::Cp).with_heuristic(5).validate().is_err());
        assert!(ProblemSpec::new(8, Paradigm::Cp).with_heuristic(0).validate().is_err());
    }

    #[test]
    fn test_validate_zero_time_limit() {
        let spec = ProblemSpec::new(8, Paradigm::Cp).with_time_limit_ms(0);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_heuristic_level_defaults() {
        assert_eq!(ProblemSpec::new(8, Paradigm::Cp).heuristic_level(), 1);
        assert_eq!(ProblemSpec::new(8, Paradigm::Cp).with_heuristic(3).heuristic_level(), 3);
        assert_eq!(ProblemSpec::new(8, Paradigm::Sat).heuristic_level(), 0);
    }

    // ---- Paradigm ----

    #[test]
    fn test_paradigm_tags() {
        assert_eq!(Paradigm::Cp.tag(), "cp");
        assert_eq!(Paradigm::Mip.label(), "MIP");
        assert_eq!(Paradigm::Smt.to_string(), "smt");
    }

    #[test]
    fn test_paradigm_serde() {
        assert_eq!(serde_json::to_string(&Paradigm::Sat).unwrap(), "\"sat\"");
        let p: Paradigm = serde_json::from_str("\"mip\"").unwrap();
        assert_eq!(p, Paradigm::Mip);
    }
}
