//! Round-robin sports tournament scheduling through external declarative
//! engines.
//!
//! One scheduling problem, four formalizations, each dispatched to a
//! family of off-the-shelf solvers:
//!
//! - **CP (Constraint Programming)**: MiniZinc models run by `minizinc`
//!   with the Gecode or Chuffed backends, with a four-level ladder of
//!   search annotations.
//! - **SAT**: DIMACS CNF with sequential-counter cardinality encodings,
//!   solved by Glucose or CaDiCaL; optimization is a binary search over
//!   the imbalance bound.
//! - **SMT**: QF_LIA SMT-LIB 2 scripts solved by Z3 or cvc5, with the
//!   same probe scheme as SAT.
//! - **MIP**: CPLEX LP files solved by CBC or HiGHS, which optimize
//!   natively.
//!
//! # Architecture
//!
//! Every run flows through one pipeline: [`problem::ProblemSpec`] fixes
//! the configuration, [`model`] encodes it into solver input, [`solve`]
//! runs the subprocess under a wall-clock budget, [`decode`] rebuilds a
//! schedule from whatever the engine printed, [`verify`] re-checks every
//! invariant independently of the solver, and [`report`] persists the
//! classified outcome. [`runner`] drives one configuration end to end;
//! [`battery`] drives the whole configuration matrix.
//!
//! Engines are external binaries found on the `PATH`; nothing in this
//! crate links against solver libraries. A missing binary is a recorded
//! status, never a crash.

pub mod battery;
pub mod decode;
pub mod error;
pub mod model;
pub mod problem;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod solve;
pub mod verify;
