#![allow(unused_assignments)]

//! Expected-result oracle: an optional `expected_result` function whose
//! body is a single `return [v1, v2, ...]` of literals. Exploration matches
//! when its set of return values equals that set.

use std::collections::BTreeSet;

use miette::{Diagnostic, SourceSpan};
use serde::Serialize;
use sympath_lang::ast::{Expr, Program, Span, Spanned, Stmt, UnaryOp};
use thiserror::Error;

use crate::error::source_span;
use crate::value::ConcreteValue;

pub const ORACLE_FUNCTION: &str = "expected_result";

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("Malformed expected_result: {reason}")]
    #[diagnostic(
        code(sympath::oracle::malformed),
        help("write the oracle as `def expected_result():` followed by a single `return [0, 1]`")
    )]
    Malformed {
        reason: String,
        #[label("here")]
        span: SourceSpan,
    },
}

impl OracleError {
    fn malformed(reason: impl Into<String>, span: Span) -> Self {
        OracleError::Malformed {
            reason: reason.into(),
            span: source_span(span),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleVerdict {
    pub matched: bool,
    pub expected: BTreeSet<ConcreteValue>,
    pub actual: BTreeSet<ConcreteValue>,
}

/// The oracle's expected values, or `None` when the program has no oracle.
pub fn expected_results(program: &Program) -> Result<Option<BTreeSet<ConcreteValue>>, OracleError> {
    let Some(function) = program.find_function(ORACLE_FUNCTION) else {
        return Ok(None);
    };
    let [stmt] = function.node.body.as_slice() else {
        return Err(OracleError::malformed(
            "body must be exactly one return statement",
            function.span,
        ));
    };
    let Stmt::Return(Some(value)) = &stmt.node else {
        return Err(OracleError::malformed("expected a return statement", stmt.span));
    };
    let Expr::List(items) = &value.node else {
        return Err(OracleError::malformed("expected a list literal", value.span));
    };
    items.iter().map(literal).collect::<Result<_, _>>().map(Some)
}

fn literal(expr: &Spanned<Expr>) -> Result<ConcreteValue, OracleError> {
    match &expr.node {
        Expr::Int(n) => Ok(ConcreteValue::Int(n.clone())),
        Expr::Bool(b) => Ok(ConcreteValue::Bool(*b)),
        Expr::UnaryOp {
            op: UnaryOp::Neg,
            operand,
        } => match &operand.node {
            Expr::Int(n) => Ok(ConcreteValue::Int(-n)),
            _ => Err(OracleError::malformed("expected a literal", expr.span)),
        },
        Expr::Tuple(items) => items
            .iter()
            .map(literal)
            .collect::<Result<_, _>>()
            .map(ConcreteValue::Tuple),
        _ => Err(OracleError::malformed("expected a literal", expr.span)),
    }
}

/// Compare the oracle with the values exploration produced. `True` and `1`
/// count as the same value.
pub fn compare(expected: &BTreeSet<ConcreteValue>, actual: &BTreeSet<ConcreteValue>) -> OracleVerdict {
    let normalize = |set: &BTreeSet<ConcreteValue>| -> BTreeSet<ConcreteValue> {
        set.iter().map(ConcreteValue::normalized).collect()
    };
    OracleVerdict {
        matched: normalize(expected) == normalize(actual),
        expected: expected.clone(),
        actual: actual.clone(),
    }
}
