#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDiagnosticSeverity {
    Warning,
}

/// Non-fatal finding reported alongside a successfully parsed program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub code: String,
    pub severity: ParseDiagnosticSeverity,
    pub message: String,
    pub suggestion: Option<String>,
    pub span: Option<Span>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(sympath::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Duplicate definition of function '{name}'")]
    #[diagnostic(
        code(sympath::parse::duplicate),
        help("function names must be unique within a program")
    )]
    Duplicate {
        name: String,
        #[label("redefined here")]
        span: miette::SourceSpan,
        #[label("first defined here")]
        first: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

fn source_span(span: Span) -> miette::SourceSpan {
    (span.start, span.end.saturating_sub(span.start)).into()
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: source_span(span),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    pub fn duplicate(
        name: impl Into<String>,
        span: Span,
        first: Span,
        source: &str,
        filename: &str,
    ) -> Self {
        ParseError::Duplicate {
            name: name.into(),
            span: source_span(span),
            first: source_span(first),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    /// Byte offset where the error is reported.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Syntax { span, .. } | ParseError::Duplicate { span, .. } => span.offset(),
        }
    }
}
