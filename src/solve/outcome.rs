//! Raw engine outcomes and the per-protocol output parsers.
//!
//! Every engine run is reduced to a [`RawOutcome`]: a verdict, an optional
//! assignment in whatever shape the protocol provides, and timing flags.
//! Interpretation (decoding, verification, status mapping) happens upstream;
//! this module only transcribes what the engine said.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::{Result, StsError};
use crate::solve::registry::OutputProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawVerdict {
    Sat,
    Unsat,
    Unknown,
}

/// Solver assignment, still in protocol shape.
#[derive(Debug, Clone)]
pub enum RawAssignment {
    /// MiniZinc solution block.
    Json(Value),
    /// DIMACS model literals, sign included.
    Literals(HashSet<i32>),
    /// Name-to-value map from an SMT model or a MIP solution file.
    Named(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
pub struct RawOutcome {
    pub verdict: RawVerdict,
    pub proved_optimal: bool,
    pub objective: Option<i64>,
    pub assignment: Option<RawAssignment>,
    pub wall_ms: u64,
    pub timed_out: bool,
}

impl RawOutcome {
    fn new(verdict: RawVerdict) -> Self {
        Self {
            verdict,
            proved_optimal: false,
            objective: None,
            assignment: None,
            wall_ms: 0,
            timed_out: false,
        }
    }
}

pub fn parse(
    protocol: OutputProtocol,
    stdout: &str,
    stderr: &str,
    solution_file: &str,
    exit_code: Option<i32>,
) -> Result<RawOutcome> {
    match protocol {
        OutputProtocol::MiniZinc => parse_minizinc(stdout, stderr),
        OutputProtocol::Dimacs => parse_dimacs(stdout, exit_code),
        OutputProtocol::SmtLib => parse_smt(stdout),
        OutputProtocol::CbcSol => parse_cbc(solution_file),
        OutputProtocol::HighsSol => parse_highs(solution_file),
    }
}

// ---- MiniZinc ----

fn parse_minizinc(stdout: &str, stderr: &str) -> Result<RawOutcome> {
    let mut block = String::new();
    let mut last_json: Option<Value> = None;
    let mut complete = false;
    let mut unsat = false;
    let mut unknown = false;
    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('%') {
            continue;
        }
        match trimmed {
            "----------" => {
                if let Ok(v) = serde_json::from_str::<Value>(&block) {
                    last_json = Some(v);
                }
                block.clear();
            }
            "==========" => complete = true,
            "=====UNSATISFIABLE=====" => unsat = true,
            "=====UNKNOWN=====" => unknown = true,
            "=====ERROR=====" => {
                let detail = stderr.lines().next().unwrap_or("no detail").to_string();
                return Err(StsError::Engine(format!("minizinc error: {detail}")));
            }
            _ => {
                block.push_str(line);
                block.push('\n');
            }
        }
    }
    if let Some(value) = last_json {
        let mut outcome = RawOutcome::new(RawVerdict::Sat);
        outcome.proved_optimal = complete;
        outcome.objective = value.get("max_imb").and_then(Value::as_i64);
        outcome.assignment = Some(RawAssignment::Json(value));
        return Ok(outcome);
    }
    if unsat {
        return Ok(RawOutcome::new(RawVerdict::Unsat));
    }
    if unknown || complete {
        return Ok(RawOutcome::new(RawVerdict::Unknown));
    }
    Err(StsError::Engine("unrecognized minizinc output".to_string()))
}

// ---- DIMACS ----

fn parse_dimacs(stdout: &str, exit_code: Option<i32>) -> Result<RawOutcome> {
    let mut verdict = None;
    let mut lits: HashSet<i32> = HashSet::new();
    let mut model_done = false;
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("s ") {
            verdict = Some(match rest.trim() {
                "SATISFIABLE" => RawVerdict::Sat,
                "UNSATISFIABLE" => RawVerdict::Unsat,
                _ => RawVerdict::Unknown,
            });
        } else if let Some(rest) = line.strip_prefix("v ") {
            if model_done {
                continue;
            }
            for tok in rest.split_whitespace() {
                let lit: i32 = tok
                    .parse()
                    .map_err(|_| StsError::Engine(format!("bad literal '{tok}' in model line")))?;
                if lit == 0 {
                    model_done = true;
                    break;
                }
                lits.insert(lit);
            }
        }
    }
    let verdict = match (verdict, exit_code) {
        (Some(v), _) => v,
        (None, Some(10)) => RawVerdict::Sat,
        (None, Some(20)) => RawVerdict::Unsat,
        _ => return Err(StsError::Engine("no verdict line in solver output".to_string())),
    };
    if verdict == RawVerdict::Sat && lits.is_empty() {
        return Err(StsError::Engine("satisfiable verdict without a model".to_string()));
    }
    let mut outcome = RawOutcome::new(verdict);
    if verdict == RawVerdict::Sat {
        outcome.assignment = Some(RawAssignment::Literals(lits));
    }
    Ok(outcome)
}

// ---- SMT-LIB ----

/// Pulls `define-fun` values out of a `get-model` dump. Parentheses carry
/// no information once the answer line is known, so the scan tokenizes
/// without them; `(- 1)` becomes a sign token followed by a number.
fn scan_model(text: &str) -> HashMap<String, f64> {
    let cleaned = text.replace(['(', ')'], " ");
    let mut toks = cleaned.split_whitespace();
    let mut map = HashMap::new();
    while let Some(tok) = toks.next() {
        if tok != "define-fun" {
            continue;
        }
        let (Some(name), Some(ty)) = (toks.next(), toks.next()) else {
            break;
        };
        let value = match ty {
            "Bool" => match toks.next() {
                Some("true") => 1.0,
                Some("false") => 0.0,
                _ => continue,
            },
            "Int" | "Real" => match toks.next() {
                Some("-") => match toks.next().and_then(|t| t.parse::<f64>().ok()) {
                    Some(v) => -v,
                    None => continue,
                },
                Some(t) => match t.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => continue,
                },
                None => break,
            },
            _ => continue,
        };
        map.insert(name.to_string(), value);
    }
    map
}

fn parse_smt(stdout: &str) -> Result<RawOutcome> {
    let verdict = stdout
        .lines()
        .map(str::trim)
        .find_map(|l| match l {
            "sat" => Some(RawVerdict::Sat),
            "unsat" => Some(RawVerdict::Unsat),
            "unknown" | "timeout" => Some(RawVerdict::Unknown),
            _ => None,
        })
        .ok_or_else(|| StsError::Engine("no verdict line in solver output".to_string()))?;
    let mut outcome = RawOutcome::new(verdict);
    if verdict == RawVerdict::Sat {
        let model = scan_model(stdout);
        if model.is_empty() {
            return Err(StsError::Engine("satisfiable verdict without a model".to_string()));
        }
        outcome.objective = model.get("max_imb").map(|v| *v as i64);
        outcome.assignment = Some(RawAssignment::Named(model));
    }
    Ok(outcome)
}

// ---- CBC solution file ----

fn objective_after(header: &str, marker: &str) -> Option<i64> {
    let rest = header.split(marker).nth(1)?;
    let tok = rest.split_whitespace().next()?;
    tok.parse::<f64>().ok().map(|v| v.round() as i64)
}

fn parse_cbc(solution: &str) -> Result<RawOutcome> {
    let mut lines = solution.lines();
    let header = lines
        .next()
        .ok_or_else(|| StsError::Engine("empty solution file".to_string()))?;
    let lower = header.to_lowercase();

    let mut columns: HashMap<String, f64> = HashMap::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[0].parse::<usize>().is_err() {
            continue;
        }
        if let Ok(v) = fields[2].parse::<f64>() {
            columns.insert(fields[1].to_string(), v);
        }
    }

    if lower.contains("infeasible") {
        return Ok(RawOutcome::new(RawVerdict::Unsat));
    }
    let proved = lower.contains("optimal");
    if !proved && columns.is_empty() {
        return Ok(RawOutcome::new(RawVerdict::Unknown));
    }
    if columns.is_empty() {
        return Err(StsError::Engine("cbc solution file has no columns".to_string()));
    }
    let mut outcome = RawOutcome::new(RawVerdict::Sat);
    outcome.proved_optimal = proved;
    outcome.objective = objective_after(header, "objective value");
    outcome.assignment = Some(RawAssignment::Named(columns));
    Ok(outcome)
}

// ---- HiGHS solution file ----

fn parse_highs(solution: &str) -> Result<RawOutcome> {
    if solution.trim().is_empty() {
        return Err(StsError::Engine("empty solution file".to_string()));
    }
    let mut status = String::new();
    let mut primal_feasible = false;
    let mut objective = None;
    let mut columns: HashMap<String, f64> = HashMap::new();

    let mut lines = solution.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Model status") {
            let rest = rest.trim_start_matches(':').trim();
            status = if rest.is_empty() {
                lines
                    .by_ref()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("")
                    .to_string()
            } else {
                rest.to_string()
            };
        } else if trimmed == "Feasible" {
            primal_feasible = true;
        } else if let Some(rest) = trimmed.strip_prefix("Objective") {
            objective = rest.trim().parse::<f64>().ok().map(|v| v.round() as i64);
        } else if let Some(rest) = trimmed.strip_prefix("# Columns") {
            let count: usize = rest.trim().parse().unwrap_or(0);
            for _ in 0..count {
                let Some(entry) = lines.next() else { break };
                let mut fields = entry.split_whitespace();
                if let (Some(name), Some(value)) = (fields.next(), fields.next()) {
                    if let Ok(v) = value.parse::<f64>() {
                        columns.insert(name.to_string(), v);
                    }
                }
            }
        }
    }

    let lower = status.to_lowercase();
    if lower.contains("infeasible") {
        return Ok(RawOutcome::new(RawVerdict::Unsat));
    }
    if !primal_feasible || columns.is_empty() {
        return Ok(RawOutcome::new(RawVerdict::Unknown));
    }
    let mut outcome = RawOutcome::new(RawVerdict::Sat);
    outcome.proved_optimal = lower.contains("optimal");
    outcome.objective = objective;
    outcome.assignment = Some(RawAssignment::Named(columns));
    Ok(outcome)
}
