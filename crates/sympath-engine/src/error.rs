#![allow(unused_assignments)]

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use sympath_lang::ast::{AssertId, Span};

pub(crate) fn source_span(span: Span) -> SourceSpan {
    (span.start, span.end.saturating_sub(span.start)).into()
}

/// Fatal errors of exploration and concrete execution.
///
/// Spans are byte offsets into the program text; the CLI attaches the source
/// with `miette::Report::with_source_code` for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("Function '{name}' not found")]
    #[diagnostic(code(sympath::engine::lookup))]
    Lookup {
        name: String,
        #[label("called here")]
        span: Option<SourceSpan>,
    },

    #[error("Unsupported construct: {what}")]
    #[diagnostic(code(sympath::engine::unsupported))]
    Unsupported {
        what: String,
        #[label("not supported")]
        span: SourceSpan,
    },

    #[error("Arity mismatch in {context}: expected {expected}, found {found}")]
    #[diagnostic(code(sympath::engine::arity))]
    ArityMismatch {
        context: String,
        expected: usize,
        found: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Type mismatch: {message}")]
    #[diagnostic(code(sympath::engine::type_mismatch))]
    TypeMismatch {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Undefined variable '{name}'")]
    #[diagnostic(code(sympath::engine::undefined_variable))]
    UndefinedVariable {
        name: String,
        #[label("not bound on this path")]
        span: SourceSpan,
    },

    #[error("Solver error: {0}")]
    #[diagnostic(code(sympath::engine::solver))]
    Solver(String),

    #[error("Division by zero")]
    #[diagnostic(code(sympath::engine::division_by_zero))]
    DivisionByZero {
        #[label("divisor is zero")]
        span: SourceSpan,
    },

    #[error("Assertion failed ({id})")]
    #[diagnostic(code(sympath::engine::assertion_failed))]
    AssertionFailed {
        id: AssertId,
        #[label("condition is false")]
        span: SourceSpan,
    },

    #[error("Integer too large: {message}")]
    #[diagnostic(code(sympath::engine::integer_too_large))]
    IntegerTooLarge {
        message: String,
        #[label("result exceeds the integer size limit")]
        span: SourceSpan,
    },

    #[error("Function '{name}' finished without returning a value")]
    #[diagnostic(code(sympath::engine::missing_return))]
    MissingReturn {
        name: String,
        #[label("function defined here")]
        span: SourceSpan,
    },
}

impl EngineError {
    pub fn lookup(name: impl Into<String>, span: Option<Span>) -> Self {
        EngineError::Lookup {
            name: name.into(),
            span: span.map(source_span),
        }
    }

    pub fn unsupported(what: impl Into<String>, span: Span) -> Self {
        EngineError::Unsupported {
            what: what.into(),
            span: source_span(span),
        }
    }

    pub fn arity(context: impl Into<String>, expected: usize, found: usize, span: Span) -> Self {
        EngineError::ArityMismatch {
            context: context.into(),
            expected,
            found,
            span: source_span(span),
        }
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        EngineError::TypeMismatch {
            message: message.into(),
            span: source_span(span),
        }
    }

    pub fn undefined(name: impl Into<String>, span: Span) -> Self {
        EngineError::UndefinedVariable {
            name: name.into(),
            span: source_span(span),
        }
    }

    pub fn solver(err: impl std::fmt::Display) -> Self {
        EngineError::Solver(err.to_string())
    }
}
