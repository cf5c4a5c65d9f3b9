//! Statement execution and call inlining.
//!
//! A statement maps one path state to its successors; an empty successor
//! list means the path ended (it returned, or a branch was dropped).

use sympath_lang::ast::{AssertId, AssignTarget, Block, Expr, FunctionDef, Span, Spanned, Stmt};
use sympath_smt::solver::SmtSolver;
use sympath_smt::terms::SmtTerm;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::eval::truth_term;
use crate::explore::Explorer;
use crate::options::ElseFallthrough;
use crate::resolve::Resolution;
use crate::result::Violation;
use crate::state::{extend, Bindings, Outcome, PathRecord, PathState};
use crate::value::SymValue;

impl<'a, S: SmtSolver> Explorer<'a, '_, S> {
    /// Run `function` from `initial` until every path has returned or
    /// ended, and collect its path records.
    pub(crate) fn explore_function(
        &mut self,
        function: &'a FunctionDef,
        initial: PathState,
    ) -> Result<Vec<PathRecord>, EngineError> {
        let mut records = Vec::new();
        let unfinished = self.exec_block(&function.body, initial, &mut records)?;
        if !unfinished.is_empty() {
            debug!(
                function = %function.name,
                paths = unfinished.len(),
                "paths reached the end of the function without returning"
            );
        }
        Ok(records)
    }

    fn exec_block(
        &mut self,
        block: &Block,
        state: PathState,
        records: &mut Vec<PathRecord>,
    ) -> Result<Vec<PathState>, EngineError> {
        let mut states = vec![state];
        for stmt in block {
            if states.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for state in states {
                next.extend(self.exec_stmt(stmt, state, records)?);
            }
            states = next;
        }
        Ok(states)
    }

    fn exec_stmt(
        &mut self,
        stmt: &Spanned<Stmt>,
        state: PathState,
        records: &mut Vec<PathRecord>,
    ) -> Result<Vec<PathState>, EngineError> {
        match &stmt.node {
            Stmt::Return(None) => Err(EngineError::unsupported(
                "return without a value",
                stmt.span,
            )),
            Stmt::Return(Some(value)) => {
                for outcome in self.eval(value, &state.bindings, &state.constraints)? {
                    debug!(
                        function = self.current_function(),
                        constraints = outcome.constraints.len(),
                        "path record"
                    );
                    records.push(PathRecord {
                        constraints: outcome.constraints,
                        ret: outcome.value,
                    });
                }
                Ok(Vec::new())
            }
            Stmt::Assign { targets, value } => {
                let [target] = targets.as_slice() else {
                    return Err(EngineError::unsupported(
                        "assignment to more than one target",
                        stmt.span,
                    ));
                };
                self.eval(value, &state.bindings, &state.constraints)?
                    .into_iter()
                    .map(|outcome| {
                        let updates = bind_target(&target.node, outcome.value, target.span)?;
                        Ok(state.rebind(outcome.constraints, updates))
                    })
                    .collect()
            }
            Stmt::If { test, body, orelse } => self.exec_if(test, body, orelse, &state, records),
            Stmt::Assert { id, test } => {
                self.check_assert(*id, test, stmt.span, &state)?;
                Ok(vec![state])
            }
        }
    }

    fn exec_if(
        &mut self,
        test: &Spanned<Expr>,
        body: &Block,
        orelse: &Block,
        state: &PathState,
        records: &mut Vec<PathRecord>,
    ) -> Result<Vec<PathState>, EngineError> {
        let mut successors = Vec::new();
        for outcome in self.eval(test, &state.bindings, &state.constraints)? {
            let cond = truth_term(&outcome.value, test.span)?;
            debug!(
                function = self.current_function(),
                depth = outcome.constraints.len(),
                "fork"
            );
            let then_state = state.with_constraints(extend(&outcome.constraints, cond.clone()));
            let else_state = state.with_constraints(extend(&outcome.constraints, cond.not()));

            let then_states = self.exec_block(body, then_state, records)?;
            let else_states = if !orelse.is_empty() {
                self.exec_block(orelse, else_state, records)?
            } else if then_states.is_empty()
                || self.options.else_fallthrough == ElseFallthrough::Keep
            {
                vec![else_state]
            } else {
                Vec::new()
            };
            successors.extend(then_states);
            successors.extend(else_states);
        }
        Ok(successors)
    }

    /// Look for a counterexample unless this assert already has one.
    /// Never changes the path state.
    fn check_assert(
        &mut self,
        id: AssertId,
        test: &Spanned<Expr>,
        span: Span,
        state: &PathState,
    ) -> Result<(), EngineError> {
        if self.violations.contains_key(&id) {
            return Ok(());
        }
        for outcome in self.eval(test, &state.bindings, &state.constraints)? {
            if self.violations.contains_key(&id) {
                break;
            }
            let cond = truth_term(&outcome.value, test.span)?;
            if cond == SmtTerm::bool(true) {
                continue;
            }
            let query = extend(&outcome.constraints, cond.not());
            match self.session.solve_inputs(&query)? {
                Resolution::Sat(inputs) => {
                    debug!(assert = %id, function = self.current_function(), "assert violated");
                    let violation = Violation {
                        assert_id: id,
                        function: self.current_function().to_string(),
                        span,
                        inputs,
                    };
                    self.violations.insert(id, violation);
                    break;
                }
                Resolution::Unsat => {}
                Resolution::Unknown(reason) => {
                    warn!(assert = %id, %reason, "solver returned unknown for assert; skipping outcome");
                }
            }
        }
        Ok(())
    }

    /// Evaluate a call by exploring the callee once per combination of
    /// argument outcomes. Each callee path record becomes one outcome.
    pub(crate) fn inline_call(
        &mut self,
        func: &str,
        args: &[Spanned<Expr>],
        span: Span,
        bindings: &Bindings,
        constraints: &[SmtTerm],
    ) -> Result<Vec<Outcome>, EngineError> {
        let program = self.program;
        let callee = program
            .find_function(func)
            .ok_or_else(|| EngineError::lookup(func, Some(span)))?;
        let params = &callee.node.params;
        if params.len() != args.len() {
            return Err(EngineError::arity(
                format!("call to '{func}'"),
                params.len(),
                args.len(),
                span,
            ));
        }

        let mut outcomes = Vec::new();
        for (cs, values) in self.eval_all(args, bindings, constraints)? {
            let callee_bindings: Bindings = params.iter().cloned().zip(values).collect();
            self.stats.calls_inlined += 1;
            debug!(caller = self.current_function(), callee = func, "inlining call");

            self.call_stack.push(&callee.node.name);
            let records = self.explore_function(&callee.node, PathState::new(callee_bindings, cs))?;
            self.call_stack.pop();

            outcomes.extend(
                records
                    .into_iter()
                    .map(|record| Outcome::new(record.constraints, record.ret)),
            );
        }
        Ok(outcomes)
    }
}

fn bind_target(
    target: &AssignTarget,
    value: SymValue,
    span: Span,
) -> Result<Vec<(String, SymValue)>, EngineError> {
    match (target, value) {
        (AssignTarget::Name(name), value) => Ok(vec![(name.clone(), value)]),
        (AssignTarget::Tuple(names), SymValue::Tuple(items)) if items.len() == names.len() => {
            Ok(names.iter().cloned().zip(items).collect())
        }
        (AssignTarget::Tuple(names), SymValue::Tuple(items)) => Err(EngineError::arity(
            "tuple assignment",
            names.len(),
            items.len(),
            span,
        )),
        (AssignTarget::Tuple(names), _) => {
            Err(EngineError::arity("tuple assignment", names.len(), 1, span))
        }
    }
}
