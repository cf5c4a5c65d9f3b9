//! Turning finished paths into concrete witnesses.
//!
//! Every query runs in its own solver scope: declare the entry inputs,
//! assert the path constraints, check, read the model, pop.

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sympath_smt::solver::{Model, SatResult, SmtSolver};
use sympath_smt::sorts::SmtSort;
use sympath_smt::terms::SmtTerm;
use tracing::warn;

use crate::error::EngineError;
use crate::result::ExecutionPath;
use crate::state::PathRecord;
use crate::value::{serialize_int, ConcreteValue, SymValue};

/// Entry parameter name to concrete value, in declaration order.
pub type InputAssignment = IndexMap<String, BigInt>;

/// Serialize an assignment as a JSON object whose values follow
/// [`serialize_int`].
pub fn serialize_inputs<S: Serializer>(
    inputs: &InputAssignment,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    struct Int<'a>(&'a BigInt);

    impl Serialize for Int<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serialize_int(self.0, serializer)
        }
    }

    let mut map = serializer.serialize_map(Some(inputs.len()))?;
    for (name, value) in inputs {
        map.serialize_entry(name, &Int(value))?;
    }
    map.end()
}

/// Solver variable standing for one entry-function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVar {
    pub param: String,
    pub var: String,
}

impl InputVar {
    pub fn new(param: &str) -> Self {
        Self {
            param: param.to_string(),
            var: format!("in!{param}"),
        }
    }

    pub fn term(&self) -> SmtTerm {
        SmtTerm::var(self.var.clone())
    }
}

/// Answer to one resolution query.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Sat(T),
    Unsat,
    Unknown(String),
}

/// Return value with every symbolic component replaced by a `ret!k` slot.
#[derive(Debug)]
enum Slot {
    Known(ConcreteValue),
    Fresh { var: String, sort: SmtSort },
    Tuple(Vec<Slot>),
}

pub struct SolverSession<'s, S> {
    solver: &'s mut S,
    inputs: Vec<InputVar>,
    queries: usize,
}

impl<'s, S: SmtSolver> SolverSession<'s, S> {
    pub fn new(solver: &'s mut S, params: &[String]) -> Self {
        Self {
            solver,
            inputs: params.iter().map(|p| InputVar::new(p)).collect(),
            queries: 0,
        }
    }

    pub fn inputs(&self) -> &[InputVar] {
        &self.inputs
    }

    /// Number of satisfiability checks issued so far.
    pub fn queries(&self) -> usize {
        self.queries
    }

    /// Find entry inputs satisfying `constraints`.
    pub fn solve_inputs(
        &mut self,
        constraints: &[SmtTerm],
    ) -> Result<Resolution<InputAssignment>, EngineError> {
        let (sat, model) = self.query(constraints, &[])?;
        Ok(match sat {
            SatResult::Sat => match self.read_inputs(model.as_ref()) {
                Ok(inputs) => Resolution::Sat(inputs),
                Err(reason) => Resolution::Unknown(reason),
            },
            SatResult::Unsat => Resolution::Unsat,
            SatResult::Unknown(reason) => Resolution::Unknown(reason),
        })
    }

    /// Resolve one path record into inputs and a concrete return value.
    pub fn resolve_record(
        &mut self,
        record: &PathRecord,
    ) -> Result<Resolution<ExecutionPath>, EngineError> {
        let mut fresh = Vec::new();
        let slot = slot_for(&record.ret, &mut fresh);
        let (sat, model) = self.query(&record.constraints, &fresh)?;
        Ok(match sat {
            SatResult::Sat => {
                match (self.read_inputs(model.as_ref()), fill(&slot, model.as_ref())) {
                    (Ok(inputs), Ok(result)) => Resolution::Sat(ExecutionPath { inputs, result }),
                    (Err(reason), _) | (_, Err(reason)) => Resolution::Unknown(reason),
                }
            }
            SatResult::Unsat => Resolution::Unsat,
            SatResult::Unknown(reason) => Resolution::Unknown(reason),
        })
    }

    fn query(
        &mut self,
        constraints: &[SmtTerm],
        fresh: &[(String, SmtSort, SmtTerm)],
    ) -> Result<(SatResult, Option<Model>), EngineError> {
        self.queries += 1;
        let inputs = &self.inputs;
        self.solver
            .scoped(|solver| {
                for input in inputs {
                    solver.declare_var(&input.var, &SmtSort::Int)?;
                }
                for (var, sort, _) in fresh {
                    solver.declare_var(var, sort)?;
                }
                for term in constraints {
                    solver.assert(term)?;
                }
                for (var, _, term) in fresh {
                    solver.assert(&SmtTerm::var(var.clone()).eq(term.clone()))?;
                }
                let mut wanted: Vec<(&str, &SmtSort)> = inputs
                    .iter()
                    .map(|i| (i.var.as_str(), &SmtSort::Int))
                    .collect();
                wanted.extend(fresh.iter().map(|(var, sort, _)| (var.as_str(), sort)));
                solver.check_sat_with_model(&wanted)
            })
            .map_err(EngineError::solver)
    }

    /// A satisfiable answer whose model lacks an input is no witness.
    fn read_inputs(&self, model: Option<&Model>) -> Result<InputAssignment, String> {
        self.inputs
            .iter()
            .map(|input| match model.and_then(|m| m.get_int(&input.var)) {
                Some(value) => Ok((input.param.clone(), value)),
                None => {
                    warn!(input = %input.param, "model has no value for input");
                    Err(format!("model has no value for input '{}'", input.param))
                }
            })
            .collect()
    }
}

fn slot_for(value: &SymValue, fresh: &mut Vec<(String, SmtSort, SmtTerm)>) -> Slot {
    match value {
        SymValue::Int(n) => Slot::Known(ConcreteValue::Int(n.clone())),
        SymValue::Bool(b) => Slot::Known(ConcreteValue::Bool(*b)),
        SymValue::Term { term, sort } => {
            let var = format!("ret!{}", fresh.len());
            fresh.push((var.clone(), *sort, term.clone()));
            Slot::Fresh { var, sort: *sort }
        }
        SymValue::Tuple(items) => Slot::Tuple(items.iter().map(|v| slot_for(v, fresh)).collect()),
    }
}

fn fill(slot: &Slot, model: Option<&Model>) -> Result<ConcreteValue, String> {
    let value = match slot {
        Slot::Known(value) => Some(value.clone()),
        Slot::Fresh { var, sort } => match sort {
            SmtSort::Int => model.and_then(|m| m.get_int(var)).map(ConcreteValue::Int),
            SmtSort::Bool => model.and_then(|m| m.get_bool(var)).map(ConcreteValue::Bool),
        },
        Slot::Tuple(items) => {
            return items
                .iter()
                .map(|s| fill(s, model))
                .collect::<Result<_, _>>()
                .map(ConcreteValue::Tuple)
        }
    };
    value.ok_or_else(|| {
        warn!(slot = ?slot, "model has no value for return component");
        "model has no value for the return value".to_string()
    })
}
