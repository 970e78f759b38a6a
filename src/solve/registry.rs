//! Known solver engines and their command lines.
//!
//! Every engine is an external binary driven through a command template.
//! Templates use four placeholders, substituted per run: `{model}` and
//! `{solution}` for file paths, `{seconds}` and `{msec}` for the time
//! budget in the unit the engine expects.

use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Result, StsError};
use crate::problem::Paradigm;

/// How an engine reports results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputProtocol {
    /// MiniZinc JSON blocks with `----------` / `==========` markers.
    MiniZinc,
    /// DIMACS `s`/`v` lines, exit code 10/20.
    Dimacs,
    /// `sat`/`unsat`/`unknown` line followed by a `get-model` dump.
    SmtLib,
    /// CBC solution file: status header, then one line per column.
    CbcSol,
    /// HiGHS raw solution file with `Model status` and `# Columns`.
    HighsSol,
}

#[derive(Debug, Clone)]
pub struct EngineSpec {
    pub name: String,
    pub paradigm: Paradigm,
    pub program: String,
    pub args: Vec<String>,
    pub protocol: OutputProtocol,
    /// Engine writes its solution to `{solution}` instead of stdout.
    pub solution_file: bool,
}

impl EngineSpec {
    /// Substitutes placeholders and splices model-specific extra flags in
    /// front of the model path.
    pub fn command_line(
        &self,
        model: &Path,
        solution: &Path,
        budget_ms: u64,
        extra: &[String],
    ) -> Vec<String> {
        let seconds = (budget_ms.div_ceil(1000)).max(1).to_string();
        let msec = budget_ms.to_string();
        let mut argv = vec![self.program.clone()];
        for arg in &self.args {
            if arg == "{model}" {
                argv.extend(extra.iter().cloned());
            }
            argv.push(
                arg.replace("{model}", &model.to_string_lossy())
                    .replace("{solution}", &solution.to_string_lossy())
                    .replace("{seconds}", &seconds)
                    .replace("{msec}", &msec),
            );
        }
        argv
    }
}

fn engine(
    name: &str,
    paradigm: Paradigm,
    program: &str,
    args: &[&str],
    protocol: OutputProtocol,
    solution_file: bool,
) -> EngineSpec {
    EngineSpec {
        name: name.to_string(),
        paradigm,
        program: program.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        protocol,
        solution_file,
    }
}

static ENGINES: LazyLock<Vec<EngineSpec>> = LazyLock::new(|| {
    use OutputProtocol::*;
    vec![
        engine(
            "gecode",
            Paradigm::Cp,
            "minizinc",
            &["--solver", "gecode", "--output-mode", "json", "--time-limit", "{msec}", "{model}"],
            MiniZinc,
            false,
        ),
        engine(
            "chuffed",
            Paradigm::Cp,
            "minizinc",
            &["--solver", "chuffed", "--output-mode", "json", "--time-limit", "{msec}", "{model}"],
            MiniZinc,
            false,
        ),
        engine(
            "glucose",
            Paradigm::Sat,
            "glucose",
            &["-model", "-cpu-lim={seconds}", "{model}"],
            Dimacs,
            false,
        ),
        engine("cadical", Paradigm::Sat, "cadical", &["-t", "{seconds}", "{model}"], Dimacs, false),
        engine("z3", Paradigm::Smt, "z3", &["-T:{seconds}", "{model}"], SmtLib, false),
        engine(
            "cvc5",
            Paradigm::Smt,
            "cvc5",
            &["--produce-models", "--tlimit={msec}", "{model}"],
            SmtLib,
            false,
        ),
        engine(
            "cbc",
            Paradigm::Mip,
            "cbc",
            &["{model}", "sec", "{seconds}", "solve", "solu", "{solution}"],
            CbcSol,
            true,
        ),
        engine(
            "highs",
            Paradigm::Mip,
            "highs",
            &["--time_limit", "{seconds}", "--solution_file", "{solution}", "{model}"],
            HighsSol,
            true,
        ),
    ]
});

#[cfg(test)]
mod stubs {
    use super::EngineSpec;
    use std::collections::HashMap;
    use std::sync::RwLock;

    static TABLE: RwLock<Option<HashMap<String, EngineSpec>>> = RwLock::new(None);

    pub(crate) fn register(engine: EngineSpec) {
        let mut table = TABLE.write().unwrap();
        table
            .get_or_insert_with(HashMap::new)
            .insert(engine.name.clone(), engine);
    }

    pub(crate) fn find(name: &str) -> Option<EngineSpec> {
        TABLE.read().unwrap().as_ref()?.get(name).cloned()
    }
}

/// Registers a scripted engine for tests; looked up ahead of the real table.
#[cfg(test)]
pub(crate) fn register_stub(engine: EngineSpec) {
    stubs::register(engine);
}

pub fn lookup(paradigm: Paradigm, name: &str) -> Result<EngineSpec> {
    #[cfg(test)]
    if let Some(stub) = stubs::find(name) {
        return Ok(stub);
    }
    ENGINES
        .iter()
        .find(|e| e.paradigm == paradigm && e.name == name)
        .cloned()
        .ok_or_else(|| {
            let known: Vec<&str> = ENGINES
                .iter()
                .filter(|e| e.paradigm == paradigm)
                .map(|e| e.name.as_str())
                .collect();
            StsError::Config(format!(
                "unknown {} solver '{}' (known: {})",
                paradigm,
                name,
                known.join(", ")
            ))
        })
}

/// Names of the registered engines for one paradigm, in table order.
pub fn solvers_for(paradigm: Paradigm) -> Vec<String> {
    ENGINES
        .iter()
        .filter(|e| e.paradigm == paradigm)
        .map(|e| e.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lookup_known_engines() {
        for (paradigm, name) in [
            (Paradigm::Cp, "gecode"),
            (Paradigm::Cp, "chuffed"),
            (Paradigm::Sat, "glucose"),
            (Paradigm::Sat, "cadical"),
            (Paradigm::Smt, "z3"),
            (Paradigm::Smt, "cvc5"),
            (Paradigm::Mip, "cbc"),
            (Paradigm::Mip, "highs"),
        ] {
            let engine = lookup(paradigm, name).unwrap();
            assert_eq!(engine.name, name);
            assert_eq!(engine.paradigm, paradigm);
        }
    }

    #[test]
    fn test_lookup_rejects_unknown_and_cross_paradigm() {
        let err = lookup(Paradigm::Sat, "gurobi").unwrap_err();
        assert!(matches!(err, StsError::Config(_)));
        assert!(err.to_string().contains("glucose"));
        // gecode exists, but not as a SAT engine
        assert!(lookup(Paradigm::Sat, "gecode").is_err());
    }

    #[test]
    fn test_command_line_substitution() {
        let engine = lookup(Paradigm::Sat, "glucose").unwrap();
        let argv = engine.command_line(
            &PathBuf::from("/tmp/model.cnf"),
            &PathBuf::from("/tmp/out.sol"),
            10_000,
            &[],
        );
        assert_eq!(argv, vec!["glucose", "-model", "-cpu-lim=10", "/tmp/model.cnf"]);
    }

    #[test]
    fn test_command_line_rounds_seconds_up() {
        let engine = lookup(Paradigm::Smt, "z3").unwrap();
        let argv = engine.command_line(
            &PathBuf::from("m.smt2"),
            &PathBuf::from("s.sol"),
            1_500,
            &[],
        );
        assert_eq!(argv[1], "-T:2");
        let tiny = engine.command_line(&PathBuf::from("m"), &PathBuf::from("s"), 10, &[]);
        assert_eq!(tiny[1], "-T:1");
    }

    #[test]
    fn test_extra_flags_precede_the_model() {
        let engine = lookup(Paradigm::Cp, "gecode").unwrap();
        let argv = engine.command_line(
            &PathBuf::from("/tmp/model.mzn"),
            &PathBuf::from("/tmp/out.sol"),
            60_000,
            &["-f".to_string()],
        );
        let f = argv.iter().position(|a| a == "-f").unwrap();
        let model = argv.iter().position(|a| a == "/tmp/model.mzn").unwrap();
        assert_eq!(f + 1, model);
        assert!(argv.contains(&"60000".to_string()));
    }

    #[test]
    fn test_solvers_for_matches_table_order() {
        assert_eq!(solvers_for(Paradigm::Cp), vec!["gecode", "chuffed"]);
        assert_eq!(solvers_for(Paradigm::Mip), vec!["cbc", "highs"]);
    }
}
