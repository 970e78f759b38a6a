//! Error taxonomy for the scheduling pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. The taxonomy
//! distinguishes conditions that mean different things downstream:
//! a [`StsError::Timeout`] is recorded as an UNKNOWN outcome and is never a
//! hard failure, while [`StsError::Verification`] always signals a defect in
//! a model builder or decoder and is never downgraded to "infeasible".

use crate::verify::Violation;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StsError>;

/// Errors raised while configuring, dispatching, decoding, or verifying runs.
#[derive(Debug, Error)]
pub enum StsError {
    /// Invalid parameter or flag combination. Aborts a single run immediately.
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested engine binary is not installed or not on the PATH.
    #[error("solver '{solver}' is not available on this system")]
    Unavailable { solver: String },

    /// The wall-clock budget expired with no verdict from the engine.
    #[error("solver exceeded the {limit_ms} ms time budget")]
    Timeout { limit_ms: u64 },

    /// Abnormal engine exit, or output the protocol parser cannot read.
    #[error("solver engine error: {0}")]
    Engine(String),

    /// A decoded schedule violated an invariant despite a feasible claim.
    #[error("schedule verification failed: {}", summarize(.0))]
    Verification(Vec<Violation>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Joins the first few violations into a single display line.
fn summarize(violations: &[Violation]) -> String {
    let mut out = violations
        .iter()
        .take(3)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    if violations.len() > 3 {
        out.push_str(&format!(" (+{} more)", violations.len() - 3));
    }
    out
}
