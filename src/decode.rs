//! Turns raw solver assignments back into schedules.
//!
//! Each paradigm hands back a different shape: MiniZinc a JSON block of
//! the integer channel views, SAT a bag of signed literals, SMT a named
//! model, MIP a column/value map. All paths end in the same [`Schedule`],
//! sorted by slot, which the verifier then judges on its own.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::{Result, StsError};
use crate::model::{smt, PairTable, VarLayout};
use crate::problem::{Paradigm, ProblemSpec};
use crate::schedule::{Match, Schedule};
use crate::solve::RawAssignment;

fn decode_err(msg: String) -> StsError {
    StsError::Engine(format!("decode: {msg}"))
}

pub fn decode(spec: &ProblemSpec, assignment: &RawAssignment) -> Result<Schedule> {
    let mut schedule = match assignment {
        RawAssignment::Json(value) => from_json(spec, value)?,
        RawAssignment::Literals(lits) => from_literals(spec, lits)?,
        RawAssignment::Named(map) => match spec.paradigm {
            Paradigm::Smt => from_smt_model(spec, map)?,
            Paradigm::Mip => from_columns(spec, map)?,
            other => {
                return Err(decode_err(format!("named assignment for a {other} run")));
            }
        },
    };
    if schedule.len() != spec.match_count() as usize {
        return Err(decode_err(format!(
            "expected {} matches, decoded {}",
            spec.match_count(),
            schedule.len()
        )));
    }
    schedule.sort_slots();
    Ok(schedule)
}

fn int_array(value: &Value, key: &str, len: usize) -> Result<Vec<u32>> {
    let arr = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| decode_err(format!("missing array '{key}'")))?;
    if arr.len() != len {
        return Err(decode_err(format!(
            "array '{key}' has {} entries, expected {len}",
            arr.len()
        )));
    }
    arr.iter()
        .map(|v| {
            v.as_u64()
                .map(|x| x as u32)
                .ok_or_else(|| decode_err(format!("non-integer entry in '{key}'")))
        })
        .collect()
}

fn bool_array(value: &Value, key: &str, len: usize) -> Result<Vec<bool>> {
    let arr = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| decode_err(format!("missing array '{key}'")))?;
    if arr.len() != len {
        return Err(decode_err(format!(
            "array '{key}' has {} entries, expected {len}",
            arr.len()
        )));
    }
    arr.iter()
        .map(|v| {
            v.as_bool()
                .ok_or_else(|| decode_err(format!("non-boolean entry in '{key}'")))
        })
        .collect()
}

fn from_json(spec: &ProblemSpec, value: &Value) -> Result<Schedule> {
    let pairs = PairTable::new(spec.n_teams);
    let week_of = int_array(value, "week_of", pairs.len())?;
    let period_of = int_array(value, "period_of", pairs.len())?;
    let first_home = bool_array(value, "first_home", pairs.len())?;
    let mut schedule = Schedule::new(spec.n_teams);
    for (q, &(a, b)) in pairs.pairs().iter().enumerate() {
        let (home, away) = if first_home[q] { (a, b) } else { (b, a) };
        schedule.push(Match {
            week: week_of[q],
            period: period_of[q],
            home,
            away,
        });
    }
    Ok(schedule)
}

fn from_literals(spec: &ProblemSpec, lits: &HashSet<i32>) -> Result<Schedule> {
    let layout = VarLayout::new(spec.n_teams);
    let mut schedule = Schedule::new(spec.n_teams);
    for q in 0..layout.pairs().len() {
        let (a, b) = layout.pairs().get(q);
        let mut placed = None;
        'scan: for w in 1..=spec.weeks() {
            for p in 1..=spec.periods() {
                if lits.contains(&layout.s(q, w, p)) {
                    placed = Some((w, p));
                    break 'scan;
                }
            }
        }
        let (week, period) =
            placed.ok_or_else(|| decode_err(format!("pair {{{a},{b}}} has no slot")))?;
        let home = if lits.contains(&layout.fwd(q, week)) {
            a
        } else if lits.contains(&layout.bwd(q, week)) {
            b
        } else {
            return Err(decode_err(format!("pair {{{a},{b}}} has no orientation")));
        };
        let away = if home == a { b } else { a };
        schedule.push(Match {
            week,
            period,
            home,
            away,
        });
    }
    Ok(schedule)
}

fn from_smt_model(spec: &ProblemSpec, map: &HashMap<String, f64>) -> Result<Schedule> {
    let truthy = |name: &str| map.get(name).copied().unwrap_or(0.0) > 0.5;
    let pairs = PairTable::new(spec.n_teams);
    let mut schedule = Schedule::new(spec.n_teams);
    for &(a, b) in pairs.pairs() {
        let mut placed = None;
        'scan: for w in 1..=spec.weeks() {
            for p in 1..=spec.periods() {
                if truthy(&smt::slot_name(a, b, w, p)) {
                    placed = Some((w, p));
                    break 'scan;
                }
            }
        }
        let (week, period) =
            placed.ok_or_else(|| decode_err(format!("pair {{{a},{b}}} has no slot")))?;
        let home = if truthy(&smt::fwd_name(a, b, week)) {
            a
        } else if truthy(&smt::bwd_name(a, b, week)) {
            b
        } else {
            return Err(decode_err(format!("pair {{{a},{b}}} has no orientation")));
        };
        let away = if home == a { b } else { a };
        schedule.push(Match {
            week,
            period,
            home,
            away,
        });
    }
    Ok(schedule)
}

fn from_columns(spec: &ProblemSpec, map: &HashMap<String, f64>) -> Result<Schedule> {
    let mut schedule = Schedule::new(spec.n_teams);
    for (name, &value) in map {
        if value <= 0.5 || !name.starts_with("x_") {
            continue;
        }
        let fields: Vec<u32> = name
            .split('_')
            .skip(1)
            .map(|f| {
                f.parse::<u32>()
                    .map_err(|_| decode_err(format!("malformed column name '{name}'")))
            })
            .collect::<Result<_>>()?;
        let [home, away, week, period] = fields[..] else {
            return Err(decode_err(format!("malformed column name '{name}'")));
        };
        schedule.push(Match {
            week,
            period,
            home,
            away,
        });
    }
    Ok(schedule)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Positive literals a SAT engine would print for `schedule`.
    pub(crate) fn witness_literals(schedule: &Schedule) -> Vec<i32> {
        let layout = VarLayout::new(schedule.n_teams());
        let mut lits = Vec::new();
        for m in schedule.matches() {
            let (lo, hi) = m.pair();
            let q = layout.pairs().index_of(lo, hi);
            lits.push(layout.m(q, m.week));
            lits.push(layout.s(q, m.week, m.period));
            if m.home < m.away {
                lits.push(layout.fwd(q, m.week));
            } else {
                lits.push(layout.bwd(q, m.week));
            }
        }
        lits.sort_unstable();
        lits
    }

    /// A DIMACS `v` line for `schedule`, zero-terminated.
    pub(crate) fn dimacs_model_line(schedule: &Schedule) -> String {
        let mut line = String::from("v");
        for lit in witness_literals(schedule) {
            line.push(' ');
            line.push_str(&lit.to_string());
        }
        line.push_str(" 0");
        line
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::witness_literals;
    use super::*;
    use crate::schedule::test_support::{fixture_n6, fixture_n8};
    use crate::verify;
    use serde_json::json;

    fn spec(paradigm: Paradigm, n: u32) -> ProblemSpec {
        ProblemSpec::new(n, paradigm)
    }

    fn channel_json(schedule: &Schedule) -> Value {
        let pairs = PairTable::new(schedule.n_teams());
        let mut week_of = vec![0u32; pairs.len()];
        let mut period_of = vec![0u32; pairs.len()];
        let mut first_home = vec![false; pairs.len()];
        for m in schedule.matches() {
            let (lo, hi) = m.pair();
            let q = pairs.index_of(lo, hi);
            week_of[q] = m.week;
            period_of[q] = m.period;
            first_home[q] = m.home == lo;
        }
        json!({ "week_of": week_of, "period_of": period_of, "first_home": first_home })
    }

    #[test]
    fn test_json_channels_round_trip() {
        let fixture = fixture_n6();
        let raw = RawAssignment::Json(channel_json(&fixture));
        let decoded = decode(&spec(Paradigm::Cp, 6), &raw).unwrap();
        assert_eq!(decoded.to_rows(), fixture.to_rows());
        assert!(verify::verify(6, &decoded).is_ok());
    }

    #[test]
    fn test_json_missing_channel_is_rejected() {
        let raw = RawAssignment::Json(json!({ "week_of": [1] }));
        let err = decode(&spec(Paradigm::Cp, 6), &raw).unwrap_err();
        assert!(err.to_string().contains("week_of"));
    }

    #[test]
    fn test_literals_round_trip() {
        let fixture = fixture_n8();
        let lits: HashSet<i32> = witness_literals(&fixture).into_iter().collect();
        let decoded = decode(&spec(Paradigm::Sat, 8), &RawAssignment::Literals(lits)).unwrap();
        assert_eq!(decoded.to_rows(), fixture.to_rows());
        assert!(verify::verify(8, &decoded).is_ok());
    }

    #[test]
    fn test_literals_missing_slot_is_reported() {
        let fixture = fixture_n6();
        let layout = VarLayout::new(6);
        let mut lits: HashSet<i32> = witness_literals(&fixture).into_iter().collect();
        let first = fixture.matches()[0];
        let (lo, hi) = first.pair();
        let q = layout.pairs().index_of(lo, hi);
        lits.remove(&layout.s(q, first.week, first.period));
        let err = decode(&spec(Paradigm::Sat, 6), &RawAssignment::Literals(lits)).unwrap_err();
        assert!(err.to_string().contains("no slot"));
    }

    #[test]
    fn test_smt_model_round_trip() {
        let fixture = fixture_n6();
        let mut map = HashMap::new();
        for m in fixture.matches() {
            let (lo, hi) = m.pair();
            map.insert(smt::slot_name(lo, hi, m.week, m.period), 1.0);
            let orient = if m.home == lo {
                smt::fwd_name(lo, hi, m.week)
            } else {
                smt::bwd_name(lo, hi, m.week)
            };
            map.insert(orient, 1.0);
        }
        map.insert("max_imb".to_string(), 1.0);
        let decoded = decode(&spec(Paradigm::Smt, 6), &RawAssignment::Named(map)).unwrap();
        assert_eq!(decoded.to_rows(), fixture.to_rows());
    }

    #[test]
    fn test_columns_round_trip() {
        let fixture = fixture_n8();
        let mut map = HashMap::new();
        for m in fixture.matches() {
            map.insert(format!("x_{}_{}_{}_{}", m.home, m.away, m.week, m.period), 1.0);
        }
        // solvers list plenty of zero and auxiliary columns too
        map.insert("x_1_2_7_4".to_string(), 0.0);
        map.insert("M".to_string(), 1.0);
        let decoded = decode(&spec(Paradigm::Mip, 8), &RawAssignment::Named(map)).unwrap();
        assert_eq!(decoded.to_rows(), fixture.to_rows());
    }

    #[test]
    fn test_columns_count_mismatch() {
        let fixture = fixture_n6();
        let mut map = HashMap::new();
        for m in fixture.matches().iter().skip(1) {
            map.insert(format!("x_{}_{}_{}_{}", m.home, m.away, m.week, m.period), 1.0);
        }
        let err = decode(&spec(Paradigm::Mip, 6), &RawAssignment::Named(map)).unwrap_err();
        assert!(err.to_string().contains("expected 15 matches"));
    }

    #[test]
    fn test_named_assignment_needs_a_matching_paradigm() {
        let raw = RawAssignment::Named(HashMap::new());
        assert!(decode(&spec(Paradigm::Cp, 6), &raw).is_err());
    }
}
