//! SMT-LIB2 model builder (QF_LIA).
//!
//! Booleans carry the edge encoding under deterministic names
//! (`m_a_b_w`, `s_a_b_w_p`, `f_a_b_w`, `b_a_b_w`); integer counts are tied
//! to them with `ite` sums. The imbalance bound is asserted in every model,
//! vacuously at `weeks`, so an optimization probe differs from a plain
//! satisfaction model by one literal constant.

use crate::model::{EncodedModel, ModelFormat, PairTable};
use crate::problem::ProblemSpec;
use crate::schedule::{Period, Team, Week};

pub(crate) fn match_name(a: Team, b: Team, w: Week) -> String {
    format!("m_{a}_{b}_{w}")
}

pub(crate) fn slot_name(a: Team, b: Team, w: Week, p: Period) -> String {
    format!("s_{a}_{b}_{w}_{p}")
}

pub(crate) fn fwd_name(a: Team, b: Team, w: Week) -> String {
    format!("f_{a}_{b}_{w}")
}

pub(crate) fn bwd_name(a: Team, b: Team, w: Week) -> String {
    format!("b_{a}_{b}_{w}")
}

fn ite(name: &str) -> String {
    format!("(ite {name} 1 0)")
}

fn sum(terms: &[String]) -> String {
    match terms.len() {
        0 => "0".to_string(),
        1 => terms[0].clone(),
        _ => format!("(+ {})", terms.join(" ")),
    }
}

pub fn build(spec: &ProblemSpec, bound: u32) -> EncodedModel {
    let n = spec.n_teams;
    let weeks = spec.weeks();
    let periods = spec.periods();
    let pairs = PairTable::new(n);
    let mut out = String::new();

    out.push_str(&format!(
        "; sts n={} sb={} bound={}\n",
        n,
        u8::from(spec.symmetry_breaking),
        bound
    ));
    out.push_str("(set-option :produce-models true)\n");
    out.push_str("(set-logic QF_LIA)\n");

    for &(a, b) in pairs.pairs() {
        for w in 1..=weeks {
            out.push_str(&format!("(declare-const {} Bool)\n", match_name(a, b, w)));
            out.push_str(&format!("(declare-const {} Bool)\n", fwd_name(a, b, w)));
            out.push_str(&format!("(declare-const {} Bool)\n", bwd_name(a, b, w)));
            for p in 1..=periods {
                out.push_str(&format!("(declare-const {} Bool)\n", slot_name(a, b, w, p)));
            }
        }
    }
    for t in 1..=n {
        out.push_str(&format!("(declare-const home_{t} Int)\n"));
        out.push_str(&format!("(declare-const imb_{t} Int)\n"));
    }
    out.push_str("(declare-const max_imb Int)\n");

    out.push_str("; each pair meets exactly once\n");
    for &(a, b) in pairs.pairs() {
        let terms: Vec<String> = (1..=weeks).map(|w| ite(&match_name(a, b, w))).collect();
        out.push_str(&format!("(assert (= {} 1))\n", sum(&terms)));
    }

    out.push_str("; each team plays once per week\n");
    for t in 1..=n {
        for w in 1..=weeks {
            let terms: Vec<String> = pairs
                .pairs_with(t)
                .iter()
                .map(|&q| {
                    let (a, b) = pairs.get(q);
                    ite(&match_name(a, b, w))
                })
                .collect();
            out.push_str(&format!("(assert (= {} 1))\n", sum(&terms)));
        }
    }

    out.push_str("; a chosen match occupies one period of its week\n");
    for &(a, b) in pairs.pairs() {
        for w in 1..=weeks {
            let terms: Vec<String> = (1..=periods).map(|p| ite(&slot_name(a, b, w, p))).collect();
            out.push_str(&format!(
                "(assert (= {} {}))\n",
                sum(&terms),
                ite(&match_name(a, b, w))
            ));
        }
    }

    out.push_str("; one match per slot\n");
    for w in 1..=weeks {
        for p in 1..=periods {
            let terms: Vec<String> = pairs
                .pairs()
                .iter()
                .map(|&(a, b)| ite(&slot_name(a, b, w, p)))
                .collect();
            out.push_str(&format!("(assert (= {} 1))\n", sum(&terms)));
        }
    }

    out.push_str("; at most two appearances per team and period\n");
    for t in 1..=n {
        for p in 1..=periods {
            let terms: Vec<String> = pairs
                .pairs_with(t)
                .iter()
                .flat_map(|&q| {
                    let (a, b) = pairs.get(q);
                    (1..=weeks).map(move |w| ite(&slot_name(a, b, w, p)))
                })
                .collect();
            out.push_str(&format!("(assert (<= {} 2))\n", sum(&terms)));
        }
    }

    out.push_str("; exactly one side hosts a chosen match\n");
    for &(a, b) in pairs.pairs() {
        for w in 1..=weeks {
            let terms = vec![ite(&fwd_name(a, b, w)), ite(&bwd_name(a, b, w))];
            out.push_str(&format!(
                "(assert (= {} {}))\n",
                sum(&terms),
                ite(&match_name(a, b, w))
            ));
        }
    }

    out.push_str("; home counts and imbalance\n");
    for t in 1..=n {
        let terms: Vec<String> = pairs
            .pairs_with(t)
            .iter()
            .flat_map(|&q| {
                let (a, b) = pairs.get(q);
                (1..=weeks).map(move |w| {
                    if a == t {
                        ite(&fwd_name(a, b, w))
                    } else {
                        ite(&bwd_name(a, b, w))
                    }
                })
            })
            .collect();
        out.push_str(&format!("(assert (= home_{t} {}))\n", sum(&terms)));
        out.push_str(&format!(
            "(assert (>= imb_{t} (- (* 2 home_{t}) {weeks})))\n"
        ));
        out.push_str(&format!(
            "(assert (>= imb_{t} (- {weeks} (* 2 home_{t}))))\n"
        ));
        out.push_str(&format!("(assert (>= max_imb imb_{t}))\n"));
    }
    out.push_str(&format!("(assert (<= max_imb {bound}))\n"));

    if spec.symmetry_breaking {
        out.push_str("; canonical opponent order for team 1\n");
        out.push_str(&format!("(assert {})\n", match_name(1, 2, 1)));
        for w in 2..=weeks {
            out.push_str(&format!("(assert {})\n", match_name(1, w + 1, w)));
        }
    }

    out.push_str("(check-sat)\n(get-model)\n");

    EncodedModel {
        format: ModelFormat::SmtLib2,
        text: out,
        extra_args: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Paradigm, ProblemSpec};

    fn spec(n: u32) -> ProblemSpec {
        ProblemSpec::new(n, Paradigm::Smt)
    }

    #[test]
    fn test_prelude_and_footer() {
        let model = build(&spec(6), 5);
        assert!(model.text.contains("(set-option :produce-models true)"));
        assert!(model.text.contains("(set-logic QF_LIA)"));
        assert!(model.text.trim_end().ends_with("(check-sat)\n(get-model)"));
        assert_eq!(model.format, ModelFormat::SmtLib2);
        assert!(model.extra_args.is_empty());
    }

    #[test]
    fn test_declares_every_variable_family() {
        let model = build(&spec(4), 3);
        for name in [
            "(declare-const m_1_2_1 Bool)",
            "(declare-const s_3_4_2_1 Bool)",
            "(declare-const f_1_2_3 Bool)",
            "(declare-const b_2_3_1 Bool)",
            "(declare-const home_4 Int)",
            "(declare-const imb_1 Int)",
            "(declare-const max_imb Int)",
        ] {
            assert!(model.text.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_bound_is_the_only_probe_difference() {
        let vacuous = build(&spec(6), 5);
        assert_eq!(vacuous.text, crate::model::build(&spec(6)).text);
        assert_eq!(vacuous.text, build(&spec(6).with_optimize(true), 5).text);

        let probe = build(&spec(6), 1);
        assert!(probe.text.contains("(assert (<= max_imb 1))"));
        assert!(vacuous.text.contains("(assert (<= max_imb 5))"));
    }

    #[test]
    fn test_symmetry_units() {
        let on = build(&spec(6).with_symmetry_breaking(true), 5);
        assert!(on.text.contains("(assert m_1_2_1)"));
        assert!(on.text.contains("(assert m_1_3_2)"));
        assert!(on.text.contains("(assert m_1_6_5)"));
        let off = build(&spec(6), 5);
        assert!(!off.text.contains("(assert m_1_2_1)"));
    }

    #[test]
    fn test_parentheses_balance() {
        let model = build(&spec(8), 7);
        let open = model.text.matches('(').count();
        let close = model.text.matches(')').count();
        assert_eq!(open, close);
    }

    #[test]
    fn test_sum_arity() {
        assert_eq!(sum(&[]), "0");
        assert_eq!(sum(&["x".to_string()]), "x");
        assert_eq!(sum(&["x".to_string(), "y".to_string()]), "(+ x y)");
    }
}
