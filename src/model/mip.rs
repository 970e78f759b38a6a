//! CPLEX LP file builder.
//!
//! Uses the direct oriented-slot encoding: one binary `x_h_a_w_p` per
//! ordered team pair and slot, so home assignment needs no separate
//! orientation layer. The objective row is always present; a satisfaction
//! run minimizes the constant zero, which leaves the solver free to return
//! any feasible point.

use crate::model::{EncodedModel, ModelFormat, PairTable};
use crate::problem::ProblemSpec;
use crate::schedule::{Period, Team, Week};

/// Keep emitted lines well under the 255-character limit some LP readers
/// still enforce.
const TERMS_PER_LINE: usize = 8;

fn x(h: Team, a: Team, w: Week, p: Period) -> String {
    format!("x_{h}_{a}_{w}_{p}")
}

fn term(coef: i64, var: &str, first: bool) -> String {
    let mag = coef.abs();
    let body = if mag == 1 {
        var.to_string()
    } else {
        format!("{mag} {var}")
    };
    match (first, coef < 0) {
        (true, false) => body,
        (true, true) => format!("- {body}"),
        (false, false) => format!(" + {body}"),
        (false, true) => format!(" - {body}"),
    }
}

fn push_row(out: &mut String, name: &str, terms: &[(i64, String)], rel: &str, rhs: i64) {
    out.push_str(&format!(" {name}:"));
    for (i, (coef, var)) in terms.iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            out.push_str("\n   ");
        }
        out.push(' ');
        out.push_str(&term(*coef, var, i == 0));
    }
    out.push_str(&format!(" {rel} {rhs}\n"));
}

pub fn build(spec: &ProblemSpec) -> EncodedModel {
    let n = spec.n_teams;
    let weeks = spec.weeks();
    let periods = spec.periods();
    let pairs = PairTable::new(n);
    let mut out = String::new();

    out.push_str(&format!(
        "\\ sts n={} sb={} opt={}\n",
        n,
        u8::from(spec.symmetry_breaking),
        u8::from(spec.optimize)
    ));
    out.push_str("Minimize\n");
    if spec.optimize {
        out.push_str(" obj: M\n");
    } else {
        out.push_str(" obj: 0 M\n");
    }
    out.push_str("Subject To\n");

    // Each unordered pair meets exactly once, in either orientation.
    for &(a, b) in pairs.pairs() {
        let mut terms = Vec::new();
        for w in 1..=weeks {
            for p in 1..=periods {
                terms.push((1, x(a, b, w, p)));
                terms.push((1, x(b, a, w, p)));
            }
        }
        push_row(&mut out, &format!("pair_{a}_{b}"), &terms, "=", 1);
    }

    // Each team appears exactly once per week.
    for t in 1..=n {
        for w in 1..=weeks {
            let mut terms = Vec::new();
            for u in 1..=n {
                if u == t {
                    continue;
                }
                for p in 1..=periods {
                    terms.push((1, x(t, u, w, p)));
                    terms.push((1, x(u, t, w, p)));
                }
            }
            push_row(&mut out, &format!("tw_{t}_{w}"), &terms, "=", 1);
        }
    }

    // Each slot carries exactly one match.
    for w in 1..=weeks {
        for p in 1..=periods {
            let mut terms = Vec::new();
            for h in 1..=n {
                for a in 1..=n {
                    if h != a {
                        terms.push((1, x(h, a, w, p)));
                    }
                }
            }
            push_row(&mut out, &format!("slot_{w}_{p}"), &terms, "=", 1);
        }
    }

    // At most two appearances per team and period.
    for t in 1..=n {
        for p in 1..=periods {
            let mut terms = Vec::new();
            for u in 1..=n {
                if u == t {
                    continue;
                }
                for w in 1..=weeks {
                    terms.push((1, x(t, u, w, p)));
                    terms.push((1, x(u, t, w, p)));
                }
            }
            push_row(&mut out, &format!("cap_{t}_{p}"), &terms, "<=", 2);
        }
    }

    // imb_t >= |2 * home_t - weeks|, M >= imb_t.
    for t in 1..=n {
        let homes: Vec<(i64, String)> = (1..=n)
            .filter(|&u| u != t)
            .flat_map(|u| {
                (1..=weeks).flat_map(move |w| (1..=periods).map(move |p| (u, w, p)))
            })
            .map(|(u, w, p)| (-2, x(t, u, w, p)))
            .collect();
        let mut il = vec![(1, format!("imb_{t}"))];
        il.extend(homes.iter().cloned());
        push_row(&mut out, &format!("il_{t}"), &il, ">=", -i64::from(weeks));

        let mut iu = vec![(1, format!("imb_{t}"))];
        iu.extend(homes.iter().map(|(c, v)| (-c, v.clone())));
        push_row(&mut out, &format!("iu_{t}"), &iu, ">=", i64::from(weeks));

        let mx = vec![(1, "M".to_string()), (-1, format!("imb_{t}"))];
        push_row(&mut out, &format!("mx_{t}"), &mx, ">=", 0);
    }

    // Symmetry breaking: team 1 meets team w+1 in week w (w=1 anchors {1,2}).
    if spec.symmetry_breaking {
        for w in 1..=weeks {
            let v = w + 1;
            let mut terms = Vec::new();
            for p in 1..=periods {
                terms.push((1, x(1, v, w, p)));
                terms.push((1, x(v, 1, w, p)));
            }
            push_row(&mut out, &format!("sb_{w}"), &terms, "=", 1);
        }
    }

    out.push_str("General\n ");
    out.push_str("M");
    for t in 1..=n {
        out.push_str(&format!(" imb_{t}"));
    }
    out.push('\n');

    out.push_str("Binaries\n");
    let mut on_line = 0;
    for h in 1..=n {
        for a in 1..=n {
            if h == a {
                continue;
            }
            for w in 1..=weeks {
                for p in 1..=periods {
                    if on_line == TERMS_PER_LINE {
                        out.push('\n');
                        on_line = 0;
                    }
                    out.push(' ');
                    out.push_str(&x(h, a, w, p));
                    on_line += 1;
                }
            }
        }
    }
    out.push_str("\nEnd\n");

    EncodedModel {
        format: ModelFormat::CplexLp,
        text: out,
        extra_args: Vec::new(),
    }
}
