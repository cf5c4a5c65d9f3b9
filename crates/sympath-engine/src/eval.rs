//! Expression evaluation.
//!
//! Evaluating an expression yields every reachable `(constraints, value)`
//! outcome: literals and names yield one, calls yield one per callee path,
//! and compound expressions cross-product their operands left to right.

use num_traits::ToPrimitive;
use sympath_lang::ast::{BinOp, BoolOp, CmpOp, Expr, Span, Spanned, UnaryOp};
use sympath_smt::solver::SmtSolver;
use sympath_smt::terms::SmtTerm;

use crate::error::EngineError;
use crate::explore::Explorer;
use crate::ops::{self, ArithFault};
use crate::state::{Bindings, Outcome};
use crate::value::SymValue;

/// Constraints reached by one branch of a sequence evaluation, with the
/// value of each item in order.
type SequenceOutcome = (Vec<SmtTerm>, Vec<SymValue>);

impl<S: SmtSolver> Explorer<'_, '_, S> {
    pub(crate) fn eval(
        &mut self,
        expr: &Spanned<Expr>,
        bindings: &Bindings,
        constraints: &[SmtTerm],
    ) -> Result<Vec<Outcome>, EngineError> {
        let span = expr.span;
        match &expr.node {
            Expr::Int(n) => Ok(single(constraints, SymValue::Int(n.clone()))),
            Expr::Bool(b) => Ok(single(constraints, SymValue::Bool(*b))),
            Expr::Name(name) => match bindings.get(name) {
                Some(value) => Ok(single(constraints, value.clone())),
                None => Err(EngineError::undefined(name, span)),
            },
            Expr::Tuple(items) => Ok(self
                .eval_all(items.iter(), bindings, constraints)?
                .into_iter()
                .map(|(cs, values)| Outcome::new(cs, SymValue::Tuple(values)))
                .collect()),
            Expr::List(_) => Err(EngineError::unsupported("list literal", span)),
            Expr::BinOp {
                op: op @ (BinOp::LShift | BinOp::RShift),
                left,
                right,
            } => Ok(single(constraints, literal_shift(*op, left, right, span)?)),
            Expr::BinOp { op, left, right } => self
                .eval_all([left.as_ref(), right.as_ref()], bindings, constraints)?
                .into_iter()
                .map(|(cs, values)| Ok(Outcome::new(cs, binary(*op, &values[0], &values[1], span)?)))
                .collect(),
            Expr::UnaryOp { op, operand } => self
                .eval(operand, bindings, constraints)?
                .into_iter()
                .map(|o| Ok(Outcome::new(o.constraints, unary(*op, &o.value, span)?)))
                .collect(),
            Expr::Compare { left, ops } => {
                let [(op, right)] = ops.as_slice() else {
                    return Err(EngineError::unsupported("chained comparison", span));
                };
                self.eval_all([left.as_ref(), right], bindings, constraints)?
                    .into_iter()
                    .map(|(cs, values)| {
                        Ok(Outcome::new(cs, compare(*op, &values[0], &values[1], span)?))
                    })
                    .collect()
            }
            Expr::BoolOp { op, values } => self
                .eval_all(values.iter(), bindings, constraints)?
                .into_iter()
                .map(|(cs, values)| Ok(Outcome::new(cs, combine(*op, &values, span)?)))
                .collect(),
            Expr::Call { func, args } => self.inline_call(func, args, span, bindings, constraints),
        }
    }

    /// Evaluate `items` left to right, threading constraints, and return
    /// the cross product of their outcomes.
    pub(crate) fn eval_all<'e>(
        &mut self,
        items: impl IntoIterator<Item = &'e Spanned<Expr>>,
        bindings: &Bindings,
        constraints: &[SmtTerm],
    ) -> Result<Vec<SequenceOutcome>, EngineError> {
        let mut acc: Vec<SequenceOutcome> = vec![(constraints.to_vec(), Vec::new())];
        for item in items {
            let mut next = Vec::new();
            for (cs, values) in acc {
                for outcome in self.eval(item, bindings, &cs)? {
                    let mut values = values.clone();
                    values.push(outcome.value);
                    next.push((outcome.constraints, values));
                }
            }
            acc = next;
        }
        Ok(acc)
    }
}

fn single(constraints: &[SmtTerm], value: SymValue) -> Vec<Outcome> {
    vec![Outcome::new(constraints.to_vec(), value)]
}

/// Truthiness of a condition or boolean operand.
pub(crate) fn truth(value: &SymValue, span: Span) -> Result<SymValue, EngineError> {
    value.truthy().ok_or_else(|| {
        EngineError::type_mismatch(format!("{} has no truth value", value.kind()), span)
    })
}

/// Truthiness as a boolean solver term, for path constraints.
pub(crate) fn truth_term(value: &SymValue, span: Span) -> Result<SmtTerm, EngineError> {
    truth(value, span)?.as_bool_term().ok_or_else(|| {
        EngineError::type_mismatch(format!("{} has no truth value", value.kind()), span)
    })
}

fn negate(value: SymValue) -> SymValue {
    match value {
        SymValue::Bool(b) => SymValue::Bool(!b),
        SymValue::Term { term, .. } => SymValue::bool_term(term.not()),
        other => other,
    }
}

fn binary(op: BinOp, l: &SymValue, r: &SymValue, span: Span) -> Result<SymValue, EngineError> {
    let (Some(lt), Some(rt)) = (l.as_int_term(), r.as_int_term()) else {
        return Err(EngineError::type_mismatch(
            format!(
                "unsupported operand types for '{op}': {} and {}",
                l.kind(),
                r.kind()
            ),
            span,
        ));
    };

    if let (SymValue::Int(a), SymValue::Int(b)) = (l, r) {
        match ops::checked_arith(op, a, b) {
            Ok(value) => return Ok(SymValue::Int(value)),
            Err(ArithFault::NegativeExponent) => {
                return Err(EngineError::unsupported("negative exponent", span))
            }
            Err(ArithFault::NegativeShift) => {
                return Err(EngineError::unsupported("negative shift count", span))
            }
            Err(ArithFault::TooLarge) => return Err(too_large(span)),
            // The solver decides what division by zero yields.
            Err(ArithFault::DivisionByZero) => {}
        }
    }

    let term = match op {
        BinOp::Add => lt.add(rt),
        BinOp::Sub => lt.sub(rt),
        BinOp::Mul => lt.mul(rt),
        BinOp::Div | BinOp::FloorDiv => lt.div(rt),
        BinOp::Mod => lt.modulo(rt),
        BinOp::Pow => return power(lt, r, span),
        BinOp::LShift | BinOp::RShift => {
            return Err(EngineError::unsupported(
                format!("'{op}' with a non-literal operand"),
                span,
            ))
        }
    };
    Ok(SymValue::int_term(term))
}

fn too_large(span: Span) -> EngineError {
    EngineError::unsupported(
        format!("integer result wider than {} bits", ops::MAX_INT_BITS),
        span,
    )
}

/// `base ** exponent` for a concrete exponent of at most
/// [`ops::MAX_SYMBOLIC_EXPONENT`], as a product.
fn power(base: SmtTerm, exponent: &SymValue, span: Span) -> Result<SymValue, EngineError> {
    let SymValue::Int(exp) = exponent else {
        return Err(EngineError::unsupported("symbolic exponent", span));
    };
    let exp = match exp.to_i64() {
        Some(e) if e < 0 => return Err(EngineError::unsupported("negative exponent", span)),
        Some(0) => return Ok(SymValue::Int(1.into())),
        Some(e) => u32::try_from(e)
            .ok()
            .filter(|e| *e <= ops::MAX_SYMBOLIC_EXPONENT),
        None => None,
    };
    let Some(exp) = exp else {
        return Err(EngineError::unsupported(
            format!(
                "exponent above {} on a symbolic base",
                ops::MAX_SYMBOLIC_EXPONENT
            ),
            span,
        ));
    };
    Ok(SymValue::int_term(square_and_multiply(&base, exp)))
}

/// `base ** exp` for `exp >= 1` by repeated squaring; the term's depth grows
/// with the logarithm of the exponent.
fn square_and_multiply(base: &SmtTerm, exp: u32) -> SmtTerm {
    if exp == 1 {
        return base.clone();
    }
    let half = square_and_multiply(base, exp / 2);
    let square = half.clone().mul(half);
    if exp % 2 == 1 {
        square.mul(base.clone())
    } else {
        square
    }
}

fn literal_shift(
    op: BinOp,
    left: &Spanned<Expr>,
    right: &Spanned<Expr>,
    span: Span,
) -> Result<SymValue, EngineError> {
    let (Expr::Int(a), Expr::Int(b)) = (&left.node, &right.node) else {
        return Err(EngineError::unsupported(
            format!("'{op}' with a non-literal operand"),
            span,
        ));
    };
    match ops::checked_arith(op, a, b) {
        Ok(value) => Ok(SymValue::Int(value)),
        Err(ArithFault::NegativeShift) => Err(EngineError::unsupported("negative shift count", span)),
        Err(_) => Err(EngineError::unsupported("shift count too large", span)),
    }
}

fn unary(op: UnaryOp, value: &SymValue, span: Span) -> Result<SymValue, EngineError> {
    let bad_operand = || {
        EngineError::type_mismatch(
            format!("bad operand type for unary '{op}': {}", value.kind()),
            span,
        )
    };
    match op {
        UnaryOp::Not => Ok(negate(truth(value, span)?)),
        UnaryOp::Neg => match value {
            SymValue::Int(n) => Ok(SymValue::Int(-n)),
            _ => value
                .as_int_term()
                .map(|t| SymValue::int_term(t.neg()))
                .ok_or_else(bad_operand),
        },
        UnaryOp::Pos if value.is_int() => Ok(value.clone()),
        UnaryOp::Pos => Err(bad_operand()),
    }
}

fn compare(op: CmpOp, l: &SymValue, r: &SymValue, span: Span) -> Result<SymValue, EngineError> {
    let equality = matches!(op, CmpOp::Eq | CmpOp::NotEq);
    match (l, r) {
        (SymValue::Int(a), SymValue::Int(b)) => Ok(SymValue::Bool(ops::compare_ints(op, a, b))),
        (SymValue::Bool(a), SymValue::Bool(b)) if equality => {
            Ok(SymValue::Bool((a == b) == (op == CmpOp::Eq)))
        }
        (SymValue::Tuple(a), SymValue::Tuple(b)) if equality => {
            let equal = if a.len() != b.len() {
                SymValue::Bool(false)
            } else {
                let parts = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| compare(CmpOp::Eq, x, y, span))
                    .collect::<Result<Vec<_>, _>>()?;
                combine(BoolOp::And, &parts, span)?
            };
            Ok(if op == CmpOp::Eq { equal } else { negate(equal) })
        }
        _ if l.is_int() && r.is_int() => {
            let (Some(lt), Some(rt)) = (l.as_int_term(), r.as_int_term()) else {
                return Err(EngineError::type_mismatch("expected integers", span));
            };
            let term = match op {
                CmpOp::Eq => lt.eq(rt),
                CmpOp::NotEq => lt.ne(rt),
                CmpOp::Lt => lt.lt(rt),
                CmpOp::LtE => lt.le(rt),
                CmpOp::Gt => lt.gt(rt),
                CmpOp::GtE => lt.ge(rt),
            };
            Ok(SymValue::bool_term(term))
        }
        _ if l.is_bool() && r.is_bool() && equality => {
            let (Some(lt), Some(rt)) = (l.as_bool_term(), r.as_bool_term()) else {
                return Err(EngineError::type_mismatch("expected booleans", span));
            };
            let term = if op == CmpOp::Eq { lt.eq(rt) } else { lt.ne(rt) };
            Ok(SymValue::bool_term(term))
        }
        _ => Err(EngineError::type_mismatch(
            format!(
                "'{op}' is not supported between {} and {}",
                l.kind(),
                r.kind()
            ),
            span,
        )),
    }
}

/// Strict `and` / `or`: every operand has already been evaluated.
fn combine(op: BoolOp, values: &[SymValue], span: Span) -> Result<SymValue, EngineError> {
    // `False` decides an `and`, `True` decides an `or`.
    let decisive = op == BoolOp::Or;
    let mut terms = Vec::new();
    for value in values {
        match truth(value, span)? {
            SymValue::Bool(b) if b == decisive => return Ok(SymValue::Bool(decisive)),
            SymValue::Bool(_) => {}
            other => {
                if let Some(term) = other.as_bool_term() {
                    terms.push(term);
                }
            }
        }
    }
    Ok(match terms.len() {
        0 => SymValue::Bool(!decisive),
        1 => SymValue::bool_term(terms.remove(0)),
        _ => SymValue::bool_term(match op {
            BoolOp::And => SmtTerm::and(terms),
            BoolOp::Or => SmtTerm::or(terms),
        }),
    })
}
