//! Direct execution on concrete inputs, used by `sympath run` and to
//! cross-check exploration.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::Zero;
use sympath_lang::ast::{
    AssignTarget, BinOp, Block, BoolOp, CmpOp, Expr, FunctionDef, Program, Span, Spanned, Stmt,
    UnaryOp,
};

use crate::error::{source_span, EngineError};
use crate::ops::{self, ArithFault};
use crate::validate::validate_program;
use crate::value::ConcreteValue;

type Env = IndexMap<String, ConcreteValue>;

/// Run `entry` with the given integer inputs and return its result.
pub fn run_concrete(
    program: &Program,
    entry: &str,
    inputs: &[BigInt],
) -> Result<ConcreteValue, EngineError> {
    validate_program(program, entry)?.into_result()?;
    let function = program
        .find_function(entry)
        .ok_or_else(|| EngineError::lookup(entry, None))?;
    if function.node.params.len() != inputs.len() {
        return Err(EngineError::arity(
            format!("inputs to '{entry}'"),
            function.node.params.len(),
            inputs.len(),
            function.span,
        ));
    }
    let args = inputs.iter().cloned().map(ConcreteValue::Int).collect();
    Interpreter { program }.call(&function.node, function.span, args)
}

struct Interpreter<'p> {
    program: &'p Program,
}

impl Interpreter<'_> {
    fn call(
        &self,
        function: &FunctionDef,
        def_span: Span,
        args: Vec<ConcreteValue>,
    ) -> Result<ConcreteValue, EngineError> {
        let mut env: Env = function.params.iter().cloned().zip(args).collect();
        match self.exec_block(&function.body, &mut env)? {
            Some(value) => Ok(value),
            None => Err(EngineError::MissingReturn {
                name: function.name.clone(),
                span: source_span(def_span),
            }),
        }
    }

    /// `Some` once a `return` executes.
    fn exec_block(&self, block: &Block, env: &mut Env) -> Result<Option<ConcreteValue>, EngineError> {
        for stmt in block {
            if let Some(value) = self.exec_stmt(stmt, env)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn exec_stmt(
        &self,
        stmt: &Spanned<Stmt>,
        env: &mut Env,
    ) -> Result<Option<ConcreteValue>, EngineError> {
        match &stmt.node {
            Stmt::Return(Some(value)) => Ok(Some(self.eval(value, env)?)),
            Stmt::Return(None) => Err(EngineError::unsupported(
                "return without a value",
                stmt.span,
            )),
            Stmt::Assign { targets, value } => {
                let [target] = targets.as_slice() else {
                    return Err(EngineError::unsupported(
                        "assignment to more than one target",
                        stmt.span,
                    ));
                };
                let value = self.eval(value, env)?;
                match (&target.node, value) {
                    (AssignTarget::Name(name), value) => {
                        env.insert(name.clone(), value);
                    }
                    (AssignTarget::Tuple(names), ConcreteValue::Tuple(items))
                        if names.len() == items.len() =>
                    {
                        env.extend(names.iter().cloned().zip(items));
                    }
                    (AssignTarget::Tuple(names), ConcreteValue::Tuple(items)) => {
                        return Err(EngineError::arity(
                            "tuple assignment",
                            names.len(),
                            items.len(),
                            target.span,
                        ))
                    }
                    (AssignTarget::Tuple(names), _) => {
                        return Err(EngineError::arity(
                            "tuple assignment",
                            names.len(),
                            1,
                            target.span,
                        ))
                    }
                }
                Ok(None)
            }
            Stmt::If { test, body, orelse } => {
                let cond = self.eval(test, env)?;
                if truthy(&cond, test.span)? {
                    self.exec_block(body, env)
                } else {
                    self.exec_block(orelse, env)
                }
            }
            Stmt::Assert { id, test } => {
                let cond = self.eval(test, env)?;
                if truthy(&cond, test.span)? {
                    Ok(None)
                } else {
                    Err(EngineError::AssertionFailed {
                        id: *id,
                        span: source_span(stmt.span),
                    })
                }
            }
        }
    }

    fn eval(&self, expr: &Spanned<Expr>, env: &Env) -> Result<ConcreteValue, EngineError> {
        let span = expr.span;
        match &expr.node {
            Expr::Int(n) => Ok(ConcreteValue::Int(n.clone())),
            Expr::Bool(b) => Ok(ConcreteValue::Bool(*b)),
            Expr::Name(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::undefined(name, span)),
            Expr::Tuple(items) => Ok(ConcreteValue::Tuple(
                items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::List(_) => Err(EngineError::unsupported("list literal", span)),
            Expr::BinOp { op, left, right } => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                binary(*op, &l, &r, span)
            }
            Expr::UnaryOp { op, operand } => {
                let value = self.eval(operand, env)?;
                unary(*op, &value, span)
            }
            Expr::Compare { left, ops } => {
                let [(op, right)] = ops.as_slice() else {
                    return Err(EngineError::unsupported("chained comparison", span));
                };
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                compare(*op, &l, &r, span).map(ConcreteValue::Bool)
            }
            Expr::BoolOp { op, values } => {
                // Every operand is evaluated, as in exploration.
                let mut truths = Vec::with_capacity(values.len());
                for value in values {
                    let v = self.eval(value, env)?;
                    truths.push(truthy(&v, value.span)?);
                }
                Ok(ConcreteValue::Bool(match op {
                    BoolOp::And => truths.iter().all(|t| *t),
                    BoolOp::Or => truths.iter().any(|t| *t),
                }))
            }
            Expr::Call { func, args } => {
                let callee = self
                    .program
                    .find_function(func)
                    .ok_or_else(|| EngineError::lookup(func, Some(span)))?;
                if callee.node.params.len() != args.len() {
                    return Err(EngineError::arity(
                        format!("call to '{func}'"),
                        callee.node.params.len(),
                        args.len(),
                        span,
                    ));
                }
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&callee.node, callee.span, values)
            }
        }
    }
}

fn truthy(value: &ConcreteValue, span: Span) -> Result<bool, EngineError> {
    match value {
        ConcreteValue::Bool(b) => Ok(*b),
        ConcreteValue::Int(n) => Ok(!n.is_zero()),
        ConcreteValue::Tuple(_) => Err(EngineError::type_mismatch(
            "tuple has no truth value",
            span,
        )),
    }
}

fn binary(
    op: BinOp,
    l: &ConcreteValue,
    r: &ConcreteValue,
    span: Span,
) -> Result<ConcreteValue, EngineError> {
    let (ConcreteValue::Int(a), ConcreteValue::Int(b)) = (l, r) else {
        return Err(EngineError::type_mismatch(
            format!("unsupported operand types for '{op}': {} and {}", kind(l), kind(r)),
            span,
        ));
    };
    ops::checked_arith(op, a, b)
        .map(ConcreteValue::Int)
        .map_err(|fault| match fault {
            ArithFault::DivisionByZero => EngineError::DivisionByZero {
                span: source_span(span),
            },
            ArithFault::TooLarge => EngineError::IntegerTooLarge {
                message: format!("{op} result wider than {} bits", ops::MAX_INT_BITS),
                span: source_span(span),
            },
            ArithFault::NegativeExponent => EngineError::unsupported("negative exponent", span),
            ArithFault::NegativeShift => EngineError::unsupported("negative shift count", span),
        })
}

fn unary(op: UnaryOp, value: &ConcreteValue, span: Span) -> Result<ConcreteValue, EngineError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(ConcreteValue::Bool(!truthy(v, span)?)),
        (UnaryOp::Neg, ConcreteValue::Int(n)) => Ok(ConcreteValue::Int(-n)),
        (UnaryOp::Pos, ConcreteValue::Int(n)) => Ok(ConcreteValue::Int(n.clone())),
        (op, v) => Err(EngineError::type_mismatch(
            format!("bad operand type for unary '{op}': {}", kind(v)),
            span,
        )),
    }
}

fn compare(
    op: CmpOp,
    l: &ConcreteValue,
    r: &ConcreteValue,
    span: Span,
) -> Result<bool, EngineError> {
    let equality = matches!(op, CmpOp::Eq | CmpOp::NotEq);
    let equal = match (l, r) {
        (ConcreteValue::Int(a), ConcreteValue::Int(b)) => return Ok(ops::compare_ints(op, a, b)),
        (ConcreteValue::Bool(a), ConcreteValue::Bool(b)) if equality => a == b,
        (ConcreteValue::Tuple(a), ConcreteValue::Tuple(b)) if equality => {
            if a.len() != b.len() {
                false
            } else {
                let mut all = true;
                for (x, y) in a.iter().zip(b) {
                    all &= compare(CmpOp::Eq, x, y, span)?;
                }
                all
            }
        }
        _ => {
            return Err(EngineError::type_mismatch(
                format!(
                    "'{op}' is not supported between {} and {}",
                    kind(l),
                    kind(r)
                ),
                span,
            ))
        }
    };
    Ok(equal == (op == CmpOp::Eq))
}

fn kind(value: &ConcreteValue) -> &'static str {
    match value {
        ConcreteValue::Int(_) => "int",
        ConcreteValue::Bool(_) => "bool",
        ConcreteValue::Tuple(_) => "tuple",
    }
}
