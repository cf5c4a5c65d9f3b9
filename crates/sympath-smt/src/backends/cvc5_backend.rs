use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;

use crate::backends::smtlib_printer::{parse_numeral, sort_to_smtlib, symbol, to_smtlib};
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Non-linear integer arithmetic: symbolic products such as `x * y` are legal.
const LOGIC: &str = "(set-logic QF_NIA)";

#[derive(Debug, Error)]
pub enum Cvc5Error {
    #[error("cvc5 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cvc5 not found: {0}")]
    NotFound(String),
    #[error("cvc5 error: {0}")]
    SolverError(String),
    #[error("Failed to parse cvc5 output: {0}")]
    ParseError(String),
}

/// cvc5 driven as a child process over an incremental SMT-LIB2 session.
pub struct Cvc5Solver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    vars: HashMap<String, SmtSort>,
}

impl Cvc5Solver {
    pub fn new() -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout("cvc5", None)
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout("cvc5", timeout_ms(timeout_secs))
    }

    pub fn with_command(cmd: &str) -> Result<Self, Cvc5Error> {
        Self::with_command_and_timeout(cmd, None)
    }

    /// Spawn `cmd` as the cvc5 binary. A timeout applies to each
    /// `(check-sat)` individually.
    pub fn with_command_and_timeout(
        cmd: &str,
        timeout_ms: Option<u64>,
    ) -> Result<Self, Cvc5Error> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
            "--print-success".to_string(),
        ];
        if let Some(ms) = timeout_ms {
            args.push(format!("--tlimit-per={ms}"));
        }

        tracing::debug!(command = cmd, ?args, "spawning cvc5");
        let mut child = Command::new(cmd)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Cvc5Error::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Cvc5Error::SolverError("failed to capture cvc5 stderr".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            vars: HashMap::new(),
        };

        solver.run_command(LOGIC)?;
        Ok(solver)
    }

    fn send_command(&mut self, cmd: &str) -> Result<String, Cvc5Error> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            let mut stderr = String::new();
            let _ = self.stderr.read_line(&mut stderr);
            return Err(Cvc5Error::SolverError(format!(
                "No response from cvc5 for command `{cmd}`. stderr: {}",
                stderr.trim()
            )));
        }
        let response = response.trim_end().to_string();
        if response.starts_with("(error") {
            return Err(Cvc5Error::SolverError(response));
        }
        Ok(response)
    }

    /// Send a command whose only reply is `success`.
    fn run_command(&mut self, cmd: &str) -> Result<(), Cvc5Error> {
        let response = self.send_command(cmd)?;
        expect_success(cmd, &response)
    }
}

fn expect_success(cmd: &str, response: &str) -> Result<(), Cvc5Error> {
    match response {
        "success" => Ok(()),
        other if other.starts_with("(error") => Err(Cvc5Error::SolverError(other.to_string())),
        other => Err(Cvc5Error::ParseError(format!(
            "expected `success` for `{cmd}`, got `{other}`"
        ))),
    }
}

fn timeout_ms(timeout_secs: u64) -> Option<u64> {
    (timeout_secs > 0).then(|| timeout_secs.saturating_mul(1000))
}

impl Drop for Cvc5Solver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for Cvc5Solver {
    type Error = Cvc5Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Cvc5Error> {
        let sort_str = sort_to_smtlib(sort);
        self.run_command(&format!("(declare-const {} {sort_str})", symbol(name)))?;
        self.vars.insert(name.to_string(), *sort);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Cvc5Error> {
        if let Some(missing) = term.free_vars().into_iter().find(|v| !self.vars.contains_key(*v)) {
            return Err(Cvc5Error::SolverError(format!(
                "variable `{missing}` is not declared"
            )));
        }
        self.run_command(&format!("(assert {})", to_smtlib(term)))
    }

    fn push(&mut self) -> Result<(), Cvc5Error> {
        self.run_command("(push 1)")
    }

    fn pop(&mut self) -> Result<(), Cvc5Error> {
        self.run_command("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, Cvc5Error> {
        let response = self.send_command("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown("cvc5 returned unknown".into())),
            other => Err(Cvc5Error::SolverError(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Cvc5Error> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }

        let mut values = HashMap::new();
        for &(name, sort) in var_names {
            if !self.vars.contains_key(name) {
                continue;
            }
            let response = self.send_command(&format!("(get-value ({}))", symbol(name)))?;
            let value = parse_cvc5_value(&response, sort).ok_or_else(|| {
                Cvc5Error::ParseError(format!("value of `{name}` in `{response}`"))
            })?;
            values.insert(name.to_string(), value);
        }

        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), Cvc5Error> {
        self.run_command("(reset)")?;
        self.run_command(LOGIC)?;
        self.vars.clear();
        Ok(())
    }
}

/// Parse a single-entry `(get-value ...)` response such as `((x (- 7)))`.
fn parse_cvc5_value(response: &str, sort: &SmtSort) -> Option<ModelValue> {
    let inner = response.trim().strip_prefix("((")?.strip_suffix("))")?;
    // Skip the symbol, which may be `|quoted with spaces|`.
    let rest = if let Some(quoted) = inner.strip_prefix('|') {
        let end = quoted.find('|')?;
        &quoted[end + 1..]
    } else {
        let end = inner.find(char::is_whitespace)?;
        &inner[end..]
    };
    let val_str = rest.trim();

    match sort {
        SmtSort::Int => parse_numeral(val_str).map(ModelValue::Int),
        SmtSort::Bool => match val_str {
            "true" => Some(ModelValue::Bool(true)),
            "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
    }
}
