//! Independent schedule verification.
//!
//! The verifier never trusts a solver's self-reported status: every decoded
//! schedule is re-checked against all five feasibility invariants, and the
//! fairness objective is recomputed from scratch. Any violation on a
//! solver-claimed feasible result indicates a builder or decoder defect,
//! which is a distinct condition from a genuinely unsatisfiable instance.

use crate::schedule::{Schedule, Team};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which invariant (or well-formedness rule) a violation falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// An unordered pair is missing, duplicated, or the match count is off.
    PairCoverage,
    /// A team does not play exactly once in some week.
    WeekClash,
    /// A (week, period) slot is empty or double-booked.
    SlotOccupancy,
    /// A team appears more than twice in one period.
    PeriodCap,
    /// A match lacks a proper home/away designation.
    HomeAway,
    /// A match references a team, week, or period outside the instance.
    Range,
    /// The engine-reported objective disagrees with the recomputed one.
    Objective,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::PairCoverage => "PAIR_COVERAGE",
            ViolationKind::WeekClash => "WEEK_CLASH",
            ViolationKind::SlotOccupancy => "SLOT_OCCUPANCY",
            ViolationKind::PeriodCap => "PERIOD_CAP",
            ViolationKind::HomeAway => "HOME_AWAY",
            ViolationKind::Range => "RANGE",
            ViolationKind::Objective => "OBJECTIVE",
        };
        f.write_str(name)
    }
}

/// One broken invariant, with the offending entity named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Recomputes all five invariants for a schedule claimed feasible.
///
/// Collects every violation rather than stopping at the first, so a defect
/// report names everything that is wrong with the decoded schedule.
pub fn verify(n_teams: u32, schedule: &Schedule) -> Result<(), Vec<Violation>> {
    let weeks = n_teams - 1;
    let periods = n_teams / 2;
    let expected = (n_teams * (n_teams - 1) / 2) as usize;
    let mut violations = Vec::new();

    if schedule.len() != expected {
        violations.push(Violation::new(
            ViolationKind::PairCoverage,
            format!("expected {} matches, found {}", expected, schedule.len()),
        ));
    }

    let mut pair_count: BTreeMap<(Team, Team), u32> = BTreeMap::new();
    let mut team_week: BTreeMap<(Team, u32), u32> = BTreeMap::new();
    let mut slot_count: BTreeMap<(u32, u32), u32> = BTreeMap::new();
    let mut team_period: BTreeMap<(Team, u32), u32> = BTreeMap::new();

    for m in schedule.matches() {
        let mut in_range = true;
        for team in [m.home, m.away] {
            if team < 1 || team > n_teams {
                violations.push(Violation::new(
                    ViolationKind::Range,
                    format!("team {} outside 1..={}", team, n_teams),
                ));
                in_range = false;
            }
        }
        if m.week < 1 || m.week > weeks {
            violations.push(Violation::new(
                ViolationKind::Range,
                format!("week {} outside 1..={}", m.week, weeks),
            ));
            in_range = false;
        }
        if m.period < 1 || m.period > periods {
            violations.push(Violation::new(
                ViolationKind::Range,
                format!("period {} outside 1..={}", m.period, periods),
            ));
            in_range = false;
        }
        if m.home == m.away {
            violations.push(Violation::new(
                ViolationKind::HomeAway,
                format!("team {} listed as both home and away in week {}", m.home, m.week),
            ));
            in_range = false;
        }
        if !in_range {
            continue;
        }
        *pair_count.entry(m.pair()).or_default() += 1;
        *team_week.entry((m.home, m.week)).or_default() += 1;
        *team_week.entry((m.away, m.week)).or_default() += 1;
        *slot_count.entry((m.week, m.period)).or_default() += 1;
        *team_period.entry((m.home, m.period)).or_default() += 1;
        *team_period.entry((m.away, m.period)).or_default() += 1;
    }

    for (a, b) in (1..=n_teams).tuple_combinations() {
        match pair_count.get(&(a, b)).copied().unwrap_or(0) {
            1 => {}
            0 => violations.push(Violation::new(
                ViolationKind::PairCoverage,
                format!("pair {{{},{}}} never meets", a, b),
            )),
            k => violations.push(Violation::new(
                ViolationKind::PairCoverage,
                format!("pair {{{},{}}} meets {} times", a, b, k),
            )),
        }
    }

    for team in 1..=n_teams {
        for week in 1..=weeks {
            let k = team_week.get(&(team, week)).copied().unwrap_or(0);
            if k != 1 {
                violations.push(Violation::new(
                    ViolationKind::WeekClash,
                    format!("team {} plays {} matches in week {}", team, k, week),
                ));
            }
        }
    }

    for week in 1..=weeks {
        for period in 1..=periods {
            let k = slot_count.get(&(week, period)).copied().unwrap_or(0);
            if k != 1 {
                violations.push(Violation::new(
                    ViolationKind::SlotOccupancy,
                    format!("slot (week {}, period {}) holds {} matches", week, period, k),
                ));
            }
        }
    }

    for (&(team, period), &k) in &team_period {
        if k > 2 {
            violations.push(Violation::new(
                ViolationKind::PeriodCap,
                format!("team {} appears {} times in period {}", team, k, period),
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Per-team home-game counts, indexed by `team - 1`.
pub fn home_counts(schedule: &Schedule) -> Vec<u32> {
    let mut counts = vec![0u32; schedule.n_teams() as usize];
    for m in schedule.matches() {
        if m.home >= 1 && m.home <= schedule.n_teams() {
            counts[m.home as usize - 1] += 1;
        }
    }
    counts
}

/// Per-team |home - away| imbalances, indexed by `team - 1`.
pub fn imbalances(schedule: &Schedule) -> Vec<u32> {
    let weeks = schedule.weeks();
    home_counts(schedule)
        .into_iter()
        .map(|h| (2 * h as i64 - weeks as i64).unsigned_abs() as u32)
        .collect()
}

/// The fairness objective: the largest per-team imbalance.
pub fn max_imbalance(schedule: &Schedule) -> u32 {
    imbalances(schedule).into_iter().max().unwrap_or(0)
}
