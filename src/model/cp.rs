//! MiniZinc model builder.
//!
//! Emits one self-contained `.mzn` per instance: the boolean edge encoding
//! (`m`, `s`, `fwd`, `bwd`) plus integer channel views (`week_of`,
//! `period_of`, `first_home`) that double as the search-annotation targets
//! and the JSON decode surface. Declarations are identical across
//! satisfaction and optimization runs; only the `solve` item changes.

use crate::model::{EncodedModel, ModelFormat, PairTable};
use crate::problem::ProblemSpec;

/// Search budgets for the stronger heuristic levels.
const RESTART_SCALE: u32 = 250;
const LNS_KEEP_PERCENT: u32 = 85;

pub fn build(spec: &ProblemSpec) -> EncodedModel {
    let n = spec.n_teams;
    let weeks = spec.weeks();
    let periods = spec.periods();
    let pairs = PairTable::new(n);
    let lo = pairs
        .pairs()
        .iter()
        .map(|(a, _)| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let hi = pairs
        .pairs()
        .iter()
        .map(|(_, b)| b.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let sb = if spec.symmetry_breaking {
        // Pair row w is {1, w+1}, so this anchors {1,2} to week 1 and fixes
        // the opponent order of team 1 in one sweep.
        "\nconstraint forall(w in 1..W)(week_of[w] = w);\n"
    } else {
        ""
    };

    let level = spec.heuristic_level();
    let mut annotations = String::new();
    if level >= 2 {
        annotations.push_str("\n    :: int_search(week_of ++ period_of, dom_w_deg, indomain_min)");
    }
    if level >= 3 {
        annotations.push_str(&format!("\n    :: restart_luby({RESTART_SCALE})"));
    }
    if level >= 4 {
        annotations.push_str(&format!(
            "\n    :: relax_and_reconstruct(week_of ++ period_of, {LNS_KEEP_PERCENT})"
        ));
    }
    let goal = if spec.optimize {
        "minimize max_imb"
    } else {
        "satisfy"
    };
    let solve = if annotations.is_empty() {
        format!("solve {goal};")
    } else {
        format!("solve{annotations}\n    {goal};")
    };

    let text = format!(
        "\
% round-robin schedule: {n} teams, {weeks} weeks, {periods} periods per week
int: n = {n};
int: W = {weeks};
int: P = {periods};
int: Q = {q};
array[1..Q] of int: lo = [{lo}];
array[1..Q] of int: hi = [{hi}];

array[1..Q, 1..W] of var bool: m;
array[1..Q, 1..W, 1..P] of var bool: s;
array[1..Q, 1..W] of var bool: fwd;
array[1..Q, 1..W] of var bool: bwd;

array[1..Q] of var 1..W: week_of;
array[1..Q] of var 1..P: period_of;
array[1..Q] of var bool: first_home;

constraint forall(q in 1..Q)(sum(w in 1..W)(m[q,w]) = 1);
constraint forall(t in 1..n, w in 1..W)(
    sum(q in 1..Q where lo[q] = t \\/ hi[q] = t)(m[q,w]) = 1);
constraint forall(q in 1..Q, w in 1..W)(sum(p in 1..P)(s[q,w,p]) = m[q,w]);
constraint forall(w in 1..W, p in 1..P)(sum(q in 1..Q)(s[q,w,p]) = 1);
constraint forall(t in 1..n, p in 1..P)(
    sum(q in 1..Q, w in 1..W where lo[q] = t \\/ hi[q] = t)(s[q,w,p]) <= 2);
constraint forall(q in 1..Q, w in 1..W)(fwd[q,w] + bwd[q,w] = m[q,w]);

constraint forall(q in 1..Q)(week_of[q] = sum(w in 1..W)(w * m[q,w]));
constraint forall(q in 1..Q)(
    period_of[q] = sum(w in 1..W, p in 1..P)(p * s[q,w,p]));
constraint forall(q in 1..Q)(first_home[q] <-> (sum(w in 1..W)(fwd[q,w]) = 1));

array[1..n] of var 0..W: home_count;
constraint forall(t in 1..n)(
    home_count[t] = sum(q in 1..Q, w in 1..W where lo[q] = t)(fwd[q,w])
                  + sum(q in 1..Q, w in 1..W where hi[q] = t)(bwd[q,w]));
array[1..n] of var 0..W: imb;
constraint forall(t in 1..n)(imb[t] = abs(2*home_count[t] - W));
var 0..W: max_imb;
constraint max_imb = max(imb);
{sb}
{solve}
",
        q = pairs.len(),
    );

    // Level 1 keeps the model free of annotations and lets the backend
    // pick its own strategy.
    let extra_args = if level == 1 {
        vec!["-f".to_string()]
    } else {
        Vec::new()
    };

    EncodedModel {
        format: ModelFormat::MiniZinc,
        text,
        extra_args,
    }
}
