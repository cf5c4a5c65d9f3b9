// Shared helpers for the command handlers: flag parsing, source loading and
// turning engine errors into source-annotated reports.

use std::path::Path;

use miette::{Diagnostic, IntoDiagnostic, NamedSource, Report, WrapErr};

use sympath_engine::options::{ElseFallthrough, ExploreOptions, SolverChoice};
use sympath_lang::ast::Program;

use crate::cli::GlobalArgs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn parse_solver_choice(raw: &str) -> miette::Result<SolverChoice> {
    match raw {
        "z3" => Ok(SolverChoice::Z3),
        "cvc5" => Ok(SolverChoice::Cvc5),
        other => miette::bail!("Unknown solver: {other}. Use 'z3' or 'cvc5'."),
    }
}

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => miette::bail!("Unknown output format: {other}. Use 'text' or 'json'."),
    }
}

pub(crate) fn solver_name(solver: SolverChoice) -> &'static str {
    match solver {
        SolverChoice::Z3 => "z3",
        SolverChoice::Cvc5 => "cvc5",
    }
}

/// Build exploration options from the global flags.
pub(crate) fn explore_options(
    global: &GlobalArgs,
    entry: &str,
    keep_else: bool,
) -> miette::Result<ExploreOptions> {
    let mode = if keep_else {
        ElseFallthrough::Keep
    } else {
        ElseFallthrough::Drop
    };
    Ok(ExploreOptions {
        solver: parse_solver_choice(&global.solver)?,
        timeout_secs: global.timeout,
        cvc5_command: global.cvc5_path.as_ref().map(|p| p.display().to_string()),
        ..ExploreOptions::default()
    }
    .with_entry(entry)
    .with_else_fallthrough(mode))
}

/// A loaded program together with the text it came from.
pub(crate) struct LoadedProgram {
    pub(crate) source: String,
    pub(crate) filename: String,
    pub(crate) program: Program,
}

impl LoadedProgram {
    /// Attach this program's source to a diagnostic so its spans render.
    pub(crate) fn report<E>(&self, err: E) -> Report
    where
        E: Diagnostic + Send + Sync + 'static,
    {
        Report::new(err).with_source_code(NamedSource::new(&self.filename, self.source.clone()))
    }

    /// 1-based line where `span` starts.
    pub(crate) fn line_of(&self, span: sympath_lang::ast::Span) -> usize {
        span.line_in(&self.source)
    }
}

pub(crate) fn read_source(path: &Path) -> miette::Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))
}

/// Read and parse `path`; parser warnings are logged.
pub(crate) fn load_program(path: &Path) -> miette::Result<LoadedProgram> {
    let source = read_source(path)?;
    let filename = path.display().to_string();
    let (program, diagnostics) = sympath_lang::parse_with_diagnostics(&source, &filename)?;
    for diag in &diagnostics {
        let line = diag.span.map(|s| s.line_in(&source));
        tracing::warn!(code = %diag.code, line = ?line, "{}", diag.message);
    }
    Ok(LoadedProgram {
        source,
        filename,
        program,
    })
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}
