use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use sympath_lang::ast::{AssertId, Span};

use crate::resolve::{serialize_inputs, InputAssignment};
use crate::value::ConcreteValue;

/// One feasible path: the inputs that drive it and what it returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPath {
    #[serde(serialize_with = "serialize_inputs")]
    pub inputs: InputAssignment,
    pub result: ConcreteValue,
}

/// First counterexample found for one `assert` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub assert_id: AssertId,
    /// Function whose body contains the assert.
    pub function: String,
    pub span: Span,
    /// Entry-function inputs that falsify the assert.
    #[serde(serialize_with = "serialize_inputs")]
    pub inputs: InputAssignment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExplorationStats {
    /// Records produced by `return` statements, before resolution.
    pub path_records: usize,
    pub feasible_paths: usize,
    pub infeasible_paths: usize,
    /// Records dropped because the solver answered unknown.
    pub unknown_paths: usize,
    pub solver_queries: usize,
    pub calls_inlined: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorationResult {
    pub entry: String,
    pub paths: Vec<ExecutionPath>,
    pub violations: BTreeMap<AssertId, Violation>,
    pub stats: ExplorationStats,
}

impl ExplorationResult {
    /// Distinct return values over all feasible paths.
    pub fn return_values(&self) -> BTreeSet<ConcreteValue> {
        self.paths.iter().map(|p| p.result.clone()).collect()
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_inputs(f, &self.inputs)?;
        write!(f, " -> {}", self.result)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: ", self.assert_id, self.function)?;
        write_inputs(f, &self.inputs)
    }
}

fn write_inputs(f: &mut fmt::Formatter<'_>, inputs: &InputAssignment) -> fmt::Result {
    f.write_str("{")?;
    for (i, (name, value)) in inputs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name}: {value}")?;
    }
    f.write_str("}")
}
