//! Static checks over the functions reachable from an entry point.
//!
//! Exploration refuses to start when any issue is found; `sympath check`
//! reports all of them at once.

use std::collections::{HashSet, VecDeque};

use sympath_lang::ast::{BinOp, Expr, FunctionDef, Program, Span, Spanned, Stmt};

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Reachable functions in discovery order, entry first.
    pub functions: Vec<String>,
    pub issues: Vec<EngineError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// First issue as an error, for callers that stop at one.
    pub fn into_result(self) -> Result<Vec<String>, EngineError> {
        match self.issues.into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(self.functions),
        }
    }
}

/// Validate `entry` and everything it can call.
///
/// Fails outright only when the entry itself is missing; every other problem
/// (including calls to unknown functions) lands in the report.
pub fn validate_program(program: &Program, entry: &str) -> Result<ValidationReport, EngineError> {
    if program.find_function(entry).is_none() {
        return Err(EngineError::lookup(entry, None));
    }

    let mut report = ValidationReport::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(entry);
    queue.push_back(entry);

    while let Some(name) = queue.pop_front() {
        let Some(function) = program.find_function(name) else {
            continue;
        };
        report.functions.push(name.to_string());
        let mut checker = Checker {
            program,
            issues: &mut report.issues,
            callees: Vec::new(),
        };
        checker.block(&function.node.body);
        for callee in checker.callees {
            if seen.insert(callee) {
                queue.push_back(callee);
            }
        }
    }
    Ok(report)
}

struct Checker<'p, 'r> {
    program: &'p Program,
    issues: &'r mut Vec<EngineError>,
    callees: Vec<&'p str>,
}

impl<'p> Checker<'p, '_> {
    fn block(&mut self, block: &'p [Spanned<Stmt>]) {
        for stmt in block {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &'p Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Assign { targets, value } => {
                if targets.len() != 1 {
                    self.issues.push(EngineError::unsupported(
                        "assignment to more than one target",
                        stmt.span,
                    ));
                }
                self.expr(value);
            }
            Stmt::If { test, body, orelse } => {
                self.expr(test);
                self.block(body);
                self.block(orelse);
            }
            Stmt::Return(Some(value)) => self.expr(value),
            Stmt::Return(None) => self
                .issues
                .push(EngineError::unsupported("return without a value", stmt.span)),
            Stmt::Assert { test, .. } => self.expr(test),
        }
    }

    fn expr(&mut self, expr: &'p Spanned<Expr>) {
        match &expr.node {
            Expr::Int(_) | Expr::Bool(_) | Expr::Name(_) => {}
            Expr::Tuple(items) => items.iter().for_each(|e| self.expr(e)),
            Expr::List(_) => self
                .issues
                .push(EngineError::unsupported("list literal", expr.span)),
            Expr::BinOp { op, left, right } => {
                if matches!(op, BinOp::LShift | BinOp::RShift)
                    && !(is_int_literal(left) && is_int_literal(right))
                {
                    self.issues.push(EngineError::unsupported(
                        format!("'{op}' with a non-literal operand"),
                        expr.span,
                    ));
                }
                self.expr(left);
                self.expr(right);
            }
            Expr::UnaryOp { operand, .. } => self.expr(operand),
            Expr::Compare { left, ops } => {
                if ops.len() != 1 {
                    self.issues
                        .push(EngineError::unsupported("chained comparison", expr.span));
                }
                self.expr(left);
                ops.iter().for_each(|(_, e)| self.expr(e));
            }
            Expr::BoolOp { values, .. } => values.iter().for_each(|e| self.expr(e)),
            Expr::Call { func, args } => {
                match self.program.find_function(func) {
                    Some(callee) => {
                        self.check_arity(&callee.node, args.len(), expr.span);
                        self.callees.push(callee.node.name.as_str());
                    }
                    None => self.issues.push(EngineError::lookup(func, Some(expr.span))),
                }
                args.iter().for_each(|e| self.expr(e));
            }
        }
    }

    fn check_arity(&mut self, callee: &FunctionDef, found: usize, span: Span) {
        if callee.params.len() != found {
            self.issues.push(EngineError::arity(
                format!("call to '{}'", callee.name),
                callee.params.len(),
                found,
                span,
            ));
        }
    }
}

fn is_int_literal(expr: &Spanned<Expr>) -> bool {
    matches!(expr.node, Expr::Int(_))
}
