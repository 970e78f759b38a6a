//! Constraint model builders, one per paradigm.
//!
//! All four builders encode the same five feasibility invariants plus the
//! optional symmetry-breaking and fairness-objective layers, through two
//! representational strategies:
//!
//! - **Edge+orientation** (CP, SAT, SMT): a boolean "pair meets in week w"
//!   variable per (pair, week), a period-placement boolean per
//!   (pair, week, period) channelled to it, and a pair of orientation
//!   booleans whose sum equals the chosen-match variable.
//! - **Direct oriented-slot** (MIP): one binary per
//!   (home, away, week, period) with every invariant as a linear row.
//!
//! Builder selection is a pure function of the paradigm tag; downstream
//! components treat the encoded text as opaque and only the decoder knows
//! how to read an assignment back.

pub(crate) mod cp;
pub(crate) mod mip;
pub(crate) mod sat;
pub(crate) mod smt;

pub use sat::VarLayout;

use crate::problem::{Paradigm, ProblemSpec};
use crate::schedule::Team;
use itertools::Itertools;

/// Concrete text format an [`EncodedModel`] is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    MiniZinc,
    Dimacs,
    SmtLib2,
    CplexLp,
}

impl ModelFormat {
    /// File extension the engines expect.
    pub fn file_ext(&self) -> &'static str {
        match self {
            ModelFormat::MiniZinc => "mzn",
            ModelFormat::Dimacs => "cnf",
            ModelFormat::SmtLib2 => "smt2",
            ModelFormat::CplexLp => "lp",
        }
    }
}

/// An encoded constraint model ready to hand to an external engine.
#[derive(Debug, Clone)]
pub struct EncodedModel {
    pub format: ModelFormat,
    pub text: String,
    /// Extra engine arguments this particular model wants (CP level 1
    /// requests the engine's free search with `-f`).
    pub extra_args: Vec<String>,
}

/// Builds the model for the spec's paradigm.
///
/// SAT and SMT models are built with the vacuous imbalance bound `n - 1`,
/// so satisfaction and optimization runs share one model shape; the
/// optimization driver swaps in tighter bounds via [`build_with_bound`].
pub fn build(spec: &ProblemSpec) -> EncodedModel {
    match spec.paradigm {
        Paradigm::Cp => cp::build(spec),
        Paradigm::Sat => sat::build(spec, spec.weeks()),
        Paradigm::Smt => smt::build(spec, spec.weeks()),
        Paradigm::Mip => mip::build(spec),
    }
}

/// Builds a SAT or SMT model constrained to max imbalance `<= bound`.
///
/// Used by the binary-search optimization driver; for CP and MIP the
/// engine minimizes natively and this falls back to [`build`].
pub fn build_with_bound(spec: &ProblemSpec, bound: u32) -> EncodedModel {
    match spec.paradigm {
        Paradigm::Sat => sat::build(spec, bound),
        Paradigm::Smt => smt::build(spec, bound),
        Paradigm::Cp | Paradigm::Mip => build(spec),
    }
}

/// Lexicographic table of the unordered team pairs of an instance.
///
/// Pair `q` (0-based) maps to `(a, b)` with `a < b`; the ordering is
/// `(1,2), (1,3), …, (1,n), (2,3), …` and is shared by every encoding so
/// that variable layouts stay deterministic.
#[derive(Debug, Clone)]
pub struct PairTable {
    n_teams: u32,
    pairs: Vec<(Team, Team)>,
}

impl PairTable {
    pub fn new(n_teams: u32) -> Self {
        let pairs = (1..=n_teams).tuple_combinations().collect();
        Self { n_teams, pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(Team, Team)] {
        &self.pairs
    }

    pub fn get(&self, q: usize) -> (Team, Team) {
        self.pairs[q]
    }

    /// Index of the pair `{a, b}` (either order given).
    pub fn index_of(&self, a: Team, b: Team) -> usize {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let n = self.n_teams as usize;
        let lo = lo as usize;
        let hi = hi as usize;
        (lo - 1) * n - lo * (lo - 1) / 2 + (hi - lo) - 1
    }

    /// Indices of every pair containing `team`.
    pub fn pairs_with(&self, team: Team) -> Vec<usize> {
        self.pairs
            .iter()
            .enumerate()
            .filter(|(_, &(a, b))| a == team || b == team)
            .map(|(q, _)| q)
            .collect()
    }
}
