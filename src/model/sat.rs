//! DIMACS CNF builder.
//!
//! The variable numbering is a pure function of the instance size, laid out
//! in fixed blocks (match, period placement, both orientations, per-team
//! home indicators, then counter auxiliaries). The decoder recomputes the
//! same [`VarLayout`] from `n` alone, so no name map ever travels with the
//! model.
//!
//! Cardinality encodings: pairwise at-most-one for small groups, the
//! sequential-counter (Sinz) at-most-k for the slot groups, the period cap,
//! and the per-team home/away bounds. The bounds are emitted for every
//! model — with the vacuous bound `n - 1` they contribute nothing, keeping
//! satisfaction and optimization-probe models the same shape.

use crate::model::{EncodedModel, ModelFormat, PairTable};
use crate::problem::ProblemSpec;
use crate::schedule::{Period, Team, Week};

/// Deterministic DIMACS variable numbering for an instance of `n` teams.
///
/// Blocks, in order: `m[q,w]`, `s[q,w,p]`, `fwd[q,w]`, `bwd[q,w]`,
/// `h[t,w]`; auxiliary counter variables follow the last block.
#[derive(Debug, Clone)]
pub struct VarLayout {
    weeks: u32,
    periods: u32,
    pairs: PairTable,
    s_base: i32,
    f_base: i32,
    b_base: i32,
    h_base: i32,
    first_aux: i32,
}

impl VarLayout {
    pub fn new(n_teams: u32) -> Self {
        let weeks = n_teams - 1;
        let periods = n_teams / 2;
        let pairs = PairTable::new(n_teams);
        let q = pairs.len() as i32;
        let w = weeks as i32;
        let p = periods as i32;
        let s_base = 1 + q * w;
        let f_base = s_base + q * w * p;
        let b_base = f_base + q * w;
        let h_base = b_base + q * w;
        let first_aux = h_base + n_teams as i32 * w;
        Self {
            weeks,
            periods,
            pairs,
            s_base,
            f_base,
            b_base,
            h_base,
            first_aux,
        }
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    /// Pair `q` meets in week `w`.
    pub fn m(&self, q: usize, w: Week) -> i32 {
        1 + q as i32 * self.weeks as i32 + (w as i32 - 1)
    }

    /// Pair `q` meets in week `w`, period `p`.
    pub fn s(&self, q: usize, w: Week, p: Period) -> i32 {
        self.s_base
            + (q as i32 * self.weeks as i32 + (w as i32 - 1)) * self.periods as i32
            + (p as i32 - 1)
    }

    /// Lower-numbered team of pair `q` hosts in week `w`.
    pub fn fwd(&self, q: usize, w: Week) -> i32 {
        self.f_base + q as i32 * self.weeks as i32 + (w as i32 - 1)
    }

    /// Higher-numbered team of pair `q` hosts in week `w`.
    pub fn bwd(&self, q: usize, w: Week) -> i32 {
        self.b_base + q as i32 * self.weeks as i32 + (w as i32 - 1)
    }

    /// Team `t` plays at home in week `w`.
    pub fn home(&self, t: Team, w: Week) -> i32 {
        self.h_base + (t as i32 - 1) * self.weeks as i32 + (w as i32 - 1)
    }

    /// Number of layout variables, excluding counter auxiliaries.
    pub fn core_vars(&self) -> i32 {
        self.first_aux - 1
    }
}

struct CnfBuilder {
    clauses: Vec<Vec<i32>>,
    next_var: i32,
}

impl CnfBuilder {
    fn new(first_free: i32) -> Self {
        Self {
            clauses: Vec::new(),
            next_var: first_free,
        }
    }

    fn fresh(&mut self) -> i32 {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    fn add(&mut self, clause: Vec<i32>) {
        self.clauses.push(clause);
    }

    /// Exactly-one via pairwise at-most-one; for small groups only.
    fn exactly_one(&mut self, lits: &[i32]) {
        self.add(lits.to_vec());
        for i in 0..lits.len() {
            for j in i + 1..lits.len() {
                self.add(vec![-lits[i], -lits[j]]);
            }
        }
    }

    /// Sequential-counter (Sinz) at-most-k over arbitrary literals.
    fn at_most_k(&mut self, lits: &[i32], k: usize) {
        let n = lits.len();
        if k >= n {
            return;
        }
        if k == 0 {
            for &l in lits {
                self.add(vec![-l]);
            }
            return;
        }
        let regs: Vec<Vec<i32>> = (0..n - 1)
            .map(|_| (0..k).map(|_| self.fresh()).collect())
            .collect();
        self.add(vec![-lits[0], regs[0][0]]);
        for j in 1..k {
            self.add(vec![-regs[0][j]]);
        }
        for i in 1..n - 1 {
            self.add(vec![-lits[i], regs[i][0]]);
            self.add(vec![-regs[i - 1][0], regs[i][0]]);
            for j in 1..k {
                self.add(vec![-lits[i], -regs[i - 1][j - 1], regs[i][j]]);
                self.add(vec![-regs[i - 1][j], regs[i][j]]);
            }
            self.add(vec![-lits[i], -regs[i - 1][k - 1]]);
        }
        self.add(vec![-lits[n - 1], -regs[n - 2][k - 1]]);
    }
}

/// Emits the CNF for `spec` with per-team home and away counts bounded by
/// `(weeks + bound) / 2`; `bound = weeks` is vacuous.
pub fn build(spec: &ProblemSpec, bound: u32) -> EncodedModel {
    let n = spec.n_teams;
    let weeks = spec.weeks();
    let periods = spec.periods();
    let layout = VarLayout::new(n);
    let q_count = layout.pairs().len();
    let mut cnf = CnfBuilder::new(layout.first_aux);

    // Invariant 1: each pair meets in exactly one week.
    for q in 0..q_count {
        let lits: Vec<i32> = (1..=weeks).map(|w| layout.m(q, w)).collect();
        cnf.exactly_one(&lits);
    }

    // Invariant 2: each team plays exactly once per week.
    for t in 1..=n {
        let qs = layout.pairs().pairs_with(t);
        for w in 1..=weeks {
            let lits: Vec<i32> = qs.iter().map(|&q| layout.m(q, w)).collect();
            cnf.exactly_one(&lits);
        }
    }

    // Channelling: a chosen match sits in exactly one period of its week.
    for q in 0..q_count {
        for w in 1..=weeks {
            let m = layout.m(q, w);
            let slots: Vec<i32> = (1..=periods).map(|p| layout.s(q, w, p)).collect();
            for &s in &slots {
                cnf.add(vec![-s, m]);
            }
            let mut picks = vec![-m];
            picks.extend(&slots);
            cnf.add(picks);
            for i in 0..slots.len() {
                for j in i + 1..slots.len() {
                    cnf.add(vec![-slots[i], -slots[j]]);
                }
            }
        }
    }

    // Invariant 3: each slot hosts exactly one match.
    for w in 1..=weeks {
        for p in 1..=periods {
            let lits: Vec<i32> = (0..q_count).map(|q| layout.s(q, w, p)).collect();
            cnf.add(lits.clone());
            cnf.at_most_k(&lits, 1);
        }
    }

    // Invariant 4: each team at most twice per period.
    for t in 1..=n {
        let qs = layout.pairs().pairs_with(t);
        for p in 1..=periods {
            let layout = &layout;
            let lits: Vec<i32> = qs
                .iter()
                .flat_map(|&q| (1..=weeks).map(move |w| layout.s(q, w, p)))
                .collect();
            cnf.at_most_k(&lits, 2);
        }
    }

    // Invariant 5: exactly one orientation for a chosen match, none otherwise.
    for q in 0..q_count {
        for w in 1..=weeks {
            let m = layout.m(q, w);
            let f = layout.fwd(q, w);
            let b = layout.bwd(q, w);
            cnf.add(vec![-f, m]);
            cnf.add(vec![-b, m]);
            cnf.add(vec![-f, -b]);
            cnf.add(vec![-m, f, b]);
        }
    }

    // h[t,w] <-> team t hosts in week w.
    for t in 1..=n {
        let qs = layout.pairs().pairs_with(t);
        for w in 1..=weeks {
            let h = layout.home(t, w);
            let hosts: Vec<i32> = qs
                .iter()
                .map(|&q| {
                    let (a, _) = layout.pairs().get(q);
                    if a == t {
                        layout.fwd(q, w)
                    } else {
                        layout.bwd(q, w)
                    }
                })
                .collect();
            for &l in &hosts {
                cnf.add(vec![-l, h]);
            }
            let mut any = vec![-h];
            any.extend(&hosts);
            cnf.add(any);
        }
    }

    // Imbalance bound: home and away counts both at most (weeks + bound) / 2.
    // Every team plays weekly, so the away indicator is the negated home one.
    let cap = ((weeks + bound) / 2) as usize;
    for t in 1..=n {
        let homes: Vec<i32> = (1..=weeks).map(|w| layout.home(t, w)).collect();
        let aways: Vec<i32> = homes.iter().map(|&h| -h).collect();
        cnf.at_most_k(&homes, cap);
        cnf.at_most_k(&aways, cap);
    }

    // Symmetry breaking: {1,2} in week 1, then team 1 meets w+1 in week w.
    if spec.symmetry_breaking {
        cnf.add(vec![layout.m(layout.pairs().index_of(1, 2), 1)]);
        for w in 2..=weeks {
            cnf.add(vec![layout.m(layout.pairs().index_of(1, w + 1), w)]);
        }
    }

    let mut text = String::new();
    text.push_str(&format!("c sts n={} sb={} bound={}\n", n, u8::from(spec.symmetry_breaking), bound));
    text.push_str(&format!("p cnf {} {}\n", cnf.next_var - 1, cnf.clauses.len()));
    for clause in &cnf.clauses {
        for lit in clause {
            text.push_str(&lit.to_string());
            text.push(' ');
        }
        text.push_str("0\n");
    }

    EncodedModel {
        format: ModelFormat::Dimacs,
        text,
        extra_args: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Paradigm, ProblemSpec};

    fn spec(n: u32) -> ProblemSpec {
        ProblemSpec::new(n, Paradigm::Sat)
    }

    #[test]
    fn test_layout_blocks_are_contiguous() {
        // n=6: Q=15, W=5, P=3.
        let l = VarLayout::new(6);
        assert_eq!(l.m(0, 1), 1);
        assert_eq!(l.m(14, 5), 75);
        assert_eq!(l.s(0, 1, 1), 76);
        assert_eq!(l.s(14, 5, 3), 300);
        assert_eq!(l.fwd(0, 1), 301);
        assert_eq!(l.bwd(0, 1), 376);
        assert_eq!(l.home(1, 1), 451);
        assert_eq!(l.home(6, 5), 480);
        assert_eq!(l.core_vars(), 480);
    }

    #[test]
    fn test_header_counts_match_body() {
        let model = build(&spec(6), 5);
        let mut lines = model.text.lines();
        let comment = lines.next().unwrap();
        assert!(comment.starts_with("c sts n=6"));
        let header = lines.next().unwrap();
        let fields: Vec<&str> = header.split_whitespace().collect();
        assert_eq!(fields[0], "p");
        assert_eq!(fields[1], "cnf");
        let declared_vars: i32 = fields[2].parse().unwrap();
        let declared_clauses: usize = fields[3].parse().unwrap();
        let body: Vec<&str> = lines.collect();
        assert_eq!(body.len(), declared_clauses);
        let max_var = body
            .iter()
            .flat_map(|l| l.split_whitespace())
            .map(|t| t.parse::<i32>().unwrap().abs())
            .max()
            .unwrap();
        assert!(max_var <= declared_vars);
        assert!(declared_vars >= VarLayout::new(6).core_vars());
    }

    #[test]
    fn test_symmetry_units_present() {
        // n=4: pair {1,2} is q=0 so m(0,1)=1; {1,3} is q=1 so m(1,2)=5;
        // {1,4} is q=2 so m(2,3)=9.
        let model = build(&spec(4).with_symmetry_breaking(true), 3);
        let units: Vec<&str> = model.text.lines().filter(|l| *l == "1 0" || *l == "5 0" || *l == "9 0").collect();
        assert_eq!(units.len(), 3);
        let without = build(&spec(4), 3);
        assert!(!without.text.lines().any(|l| l == "5 0"));
    }

    #[test]
    fn test_vacuous_bound_matches_default_build() {
        let plain = crate::model::build(&spec(8));
        let bounded = build(&spec(8), 7);
        assert_eq!(plain.text, bounded.text);
        // The optimize flag changes nothing about the emitted model.
        let opted = build(&spec(8).with_optimize(true), 7);
        assert_eq!(bounded.text, opted.text);
    }

    #[test]
    fn test_tighter_bound_adds_clauses() {
        let loose = build(&spec(6), 5);
        let tight = build(&spec(6), 1);
        let count = |m: &EncodedModel| m.text.lines().count();
        assert!(count(&tight) > count(&loose));
        assert!(tight.text.starts_with("c sts n=6 sb=0 bound=1\n"));
    }

    // ---- Cardinality encodings, checked by exhaustive evaluation ----

    /// True when some assignment of the auxiliary variables satisfies every
    /// clause, given fixed values for the first `n_fixed` variables.
    fn satisfiable_with_aux(clauses: &[Vec<i32>], fixed: &[bool], total_vars: i32) -> bool {
        let n_fixed = fixed.len() as i32;
        let n_aux = (total_vars - n_fixed) as u32;
        'outer: for aux_bits in 0..(1u64 << n_aux) {
            let value = |lit: i32| -> bool {
                let var = lit.abs();
                let val = if var <= n_fixed {
                    fixed[(var - 1) as usize]
                } else {
                    aux_bits >> (var - n_fixed - 1) & 1 == 1
                };
                if lit > 0 {
                    val
                } else {
                    !val
                }
            };
            for clause in clauses {
                if !clause.iter().any(|&l| value(l)) {
                    continue 'outer;
                }
            }
            return true;
        }
        false
    }

    #[test]
    fn test_at_most_k_is_exact() {
        for (n, k) in [(4usize, 2usize), (5, 1), (5, 3), (3, 0)] {
            let mut cnf = CnfBuilder::new(n as i32 + 1);
            let lits: Vec<i32> = (1..=n as i32).collect();
            cnf.at_most_k(&lits, k);
            for bits in 0..(1u32 << n) {
                let fixed: Vec<bool> = (0..n).map(|i| bits >> i & 1 == 1).collect();
                let ones = fixed.iter().filter(|&&b| b).count();
                let sat = satisfiable_with_aux(&cnf.clauses, &fixed, cnf.next_var - 1);
                assert_eq!(sat, ones <= k, "n={} k={} bits={:b}", n, k, bits);
            }
        }
    }

    #[test]
    fn test_at_most_k_on_negated_literals() {
        // at-most-1 over negations = at-least-(n-1) over the variables.
        let mut cnf = CnfBuilder::new(4);
        cnf.at_most_k(&[-1, -2, -3], 1);
        for bits in 0..8u32 {
            let fixed: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            let zeros = fixed.iter().filter(|&&b| !b).count();
            let sat = satisfiable_with_aux(&cnf.clauses, &fixed, cnf.next_var - 1);
            assert_eq!(sat, zeros <= 1, "bits={:b}", bits);
        }
    }

    #[test]
    fn test_exactly_one_pairwise() {
        let mut cnf = CnfBuilder::new(4);
        cnf.exactly_one(&[1, 2, 3]);
        for bits in 0..8u32 {
            let fixed: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            let ones = fixed.iter().filter(|&&b| b).count();
            let sat = satisfiable_with_aux(&cnf.clauses, &fixed, 3);
            assert_eq!(sat, ones == 1, "bits={:b}", bits);
        }
    }
}
