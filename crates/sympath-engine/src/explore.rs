//! Exploration entry points.

use std::collections::BTreeMap;

use sympath_lang::ast::{AssertId, Program};
use sympath_smt::backends::cvc5_backend::Cvc5Solver;
#[cfg(feature = "z3")]
use sympath_smt::backends::z3_backend::Z3Solver;
use sympath_smt::solver::SmtSolver;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::options::{ExploreOptions, SolverChoice};
use crate::resolve::{Resolution, SolverSession};
use crate::result::{ExplorationResult, ExplorationStats, Violation};
use crate::state::{Bindings, PathState};
use crate::validate::validate_program;
use crate::value::SymValue;

/// State shared by one exploration across the whole call tree.
pub(crate) struct Explorer<'a, 's, S> {
    pub(crate) program: &'a Program,
    pub(crate) options: &'a ExploreOptions,
    pub(crate) session: SolverSession<'s, S>,
    /// Write-once per assert.
    pub(crate) violations: BTreeMap<AssertId, Violation>,
    pub(crate) stats: ExplorationStats,
    pub(crate) call_stack: Vec<&'a str>,
}

impl<S: SmtSolver> Explorer<'_, '_, S> {
    pub(crate) fn current_function(&self) -> &str {
        self.call_stack
            .last()
            .copied()
            .unwrap_or(self.options.entry.as_str())
    }
}

/// Explore every path of `options.entry` with the given solver.
pub fn explore<S: SmtSolver>(
    program: &Program,
    solver: &mut S,
    options: &ExploreOptions,
) -> Result<ExplorationResult, EngineError> {
    validate_program(program, &options.entry)?.into_result()?;
    let entry = program
        .find_function(&options.entry)
        .ok_or_else(|| EngineError::lookup(&options.entry, None))?;

    info!(
        entry = %options.entry,
        inputs = entry.node.params.len(),
        else_fallthrough = ?options.else_fallthrough,
        "Exploring paths..."
    );

    let mut explorer = Explorer {
        program,
        options,
        session: SolverSession::new(solver, &entry.node.params),
        violations: BTreeMap::new(),
        stats: ExplorationStats::default(),
        call_stack: vec![entry.node.name.as_str()],
    };

    let bindings: Bindings = explorer
        .session
        .inputs()
        .iter()
        .map(|input| (input.param.clone(), SymValue::int_term(input.term())))
        .collect();
    let records = explorer.explore_function(&entry.node, PathState::new(bindings, Vec::new()))?;
    explorer.stats.path_records = records.len();

    let mut paths = Vec::new();
    for record in &records {
        match explorer.session.resolve_record(record)? {
            Resolution::Sat(path) => {
                debug!(path = %path, "feasible path");
                explorer.stats.feasible_paths += 1;
                paths.push(path);
            }
            Resolution::Unsat => explorer.stats.infeasible_paths += 1,
            Resolution::Unknown(reason) => {
                warn!(%reason, "solver returned unknown; dropping path");
                explorer.stats.unknown_paths += 1;
            }
        }
    }

    let mut stats = explorer.stats;
    stats.solver_queries = explorer.session.queries();
    stats.violations = explorer.violations.len();
    info!(
        records = stats.path_records,
        feasible = stats.feasible_paths,
        infeasible = stats.infeasible_paths,
        unknown = stats.unknown_paths,
        violations = stats.violations,
        queries = stats.solver_queries,
        calls = stats.calls_inlined,
        "Exploration finished"
    );

    Ok(ExplorationResult {
        entry: options.entry.clone(),
        paths,
        violations: explorer.violations,
        stats,
    })
}

/// Explore with the backend named by `options.solver`.
pub fn explore_with_choice(
    program: &Program,
    options: &ExploreOptions,
) -> Result<ExplorationResult, EngineError> {
    info!(solver = ?options.solver, timeout_secs = options.timeout_secs, "Starting exploration");
    match options.solver {
        #[cfg(feature = "z3")]
        SolverChoice::Z3 => {
            let mut solver = Z3Solver::with_timeout_secs(options.timeout_secs);
            explore(program, &mut solver, options)
        }
        #[cfg(not(feature = "z3"))]
        SolverChoice::Z3 => Err(EngineError::Solver(
            "built without the `z3` feature; use the cvc5 backend".into(),
        )),
        SolverChoice::Cvc5 => {
            let command = options.cvc5_command.as_deref().unwrap_or("cvc5");
            let timeout_ms =
                (options.timeout_secs > 0).then(|| options.timeout_secs.saturating_mul(1000));
            let mut solver = Cvc5Solver::with_command_and_timeout(command, timeout_ms)
                .map_err(EngineError::solver)?;
            explore(program, &mut solver, options)
        }
    }
}
