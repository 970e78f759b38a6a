//! Canonical tournament schedule representation.
//!
//! All four solving paradigms decode into the same [`Schedule`] shape: a
//! flat list of [`Match`]es, each carrying its week, period, and home/away
//! designation. Teams, weeks, and periods are 1-based integer identifiers.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Team identifier in `1..=n`.
pub type Team = u32;
/// Week identifier in `1..=n-1`.
pub type Week = u32;
/// Period identifier in `1..=n/2`.
pub type Period = u32;

/// A single fixture: one unordered pair of teams placed in a (week, period)
/// slot, with the first team designated home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub week: Week,
    pub period: Period,
    pub home: Team,
    pub away: Team,
}

impl Match {
    /// The unordered pair of this match, as `(min, max)`.
    pub fn pair(&self) -> (Team, Team) {
        if self.home < self.away {
            (self.home, self.away)
        } else {
            (self.away, self.home)
        }
    }
}

/// A complete (or partially decoded) round-robin schedule for `n_teams`.
///
/// # Examples
///
/// ```
/// use u_sts::schedule::{Match, Schedule};
///
/// let mut schedule = Schedule::new(6);
/// schedule.push(Match { week: 1, period: 1, home: 6, away: 3 });
/// assert_eq!(schedule.weeks(), 5);
/// assert_eq!(schedule.periods(), 3);
/// assert_eq!(schedule.slot(1, 1).map(|m| m.home), Some(6));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    n_teams: u32,
    matches: Vec<Match>,
}

impl Schedule {
    /// Creates an empty schedule for `n_teams`.
    pub fn new(n_teams: u32) -> Self {
        Self {
            n_teams,
            matches: Vec::with_capacity((n_teams * n_teams.saturating_sub(1) / 2) as usize),
        }
    }

    /// Builds a schedule from `rows[week][period] = [home, away]`.
    pub fn from_rows(n_teams: u32, rows: &[Vec<[Team; 2]>]) -> Self {
        let mut schedule = Self::new(n_teams);
        for (w, row) in rows.iter().enumerate() {
            for (p, &[home, away]) in row.iter().enumerate() {
                schedule.push(Match {
                    week: w as Week + 1,
                    period: p as Period + 1,
                    home,
                    away,
                });
            }
        }
        schedule
    }

    /// Appends a match.
    pub fn push(&mut self, m: Match) {
        self.matches.push(m);
    }

    pub fn n_teams(&self) -> u32 {
        self.n_teams
    }

    /// Number of weeks, `n - 1`.
    pub fn weeks(&self) -> u32 {
        self.n_teams.saturating_sub(1)
    }

    /// Number of periods per week, `n / 2`.
    pub fn periods(&self) -> u32 {
        self.n_teams / 2
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The match occupying `(week, period)`, if exactly one was decoded there.
    pub fn slot(&self, week: Week, period: Period) -> Option<&Match> {
        self.matches
            .iter()
            .filter(|m| m.week == week && m.period == period)
            .exactly_one()
            .ok()
    }

    /// Sorts matches into (week, period) order for stable output.
    pub fn sort_slots(&mut self) {
        self.matches.sort_by_key(|m| (m.week, m.period));
    }

    /// The wire form `sol[week][period] = [home, away]`.
    ///
    /// Returns `None` unless every slot holds exactly one match.
    pub fn to_rows(&self) -> Option<Vec<Vec<[Team; 2]>>> {
        let mut rows = vec![vec![None; self.periods() as usize]; self.weeks() as usize];
        for m in &self.matches {
            let cell = rows
                .get_mut(m.week as usize - 1)?
                .get_mut(m.period as usize - 1)?;
            if cell.is_some() {
                return None;
            }
            *cell = Some([m.home, m.away]);
        }
        rows.into_iter()
            .map(|row| row.into_iter().collect::<Option<Vec<_>>>())
            .collect()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for week in 1..=self.weeks() {
            write!(f, "week {:>2}:", week)?;
            for period in 1..=self.periods() {
                match self.slot(week, period) {
                    Some(m) => write!(f, "  {:>2} v {:<2}", m.home, m.away)?,
                    None => write!(f, "   ?? ?? ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
