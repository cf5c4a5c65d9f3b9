// Command handler for: Eval
//
// Explores every path of the entry function, prints violated asserts and the
// concrete inputs of each feasible path, then checks the optional oracle.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use sympath_engine::explore::explore_with_choice;
use sympath_engine::oracle::{compare, expected_results, OracleVerdict};
use sympath_engine::resolve::{serialize_inputs, InputAssignment};
use sympath_engine::result::{ExecutionPath, ExplorationResult, ExplorationStats};
use sympath_engine::value::ConcreteValue;

use super::helpers::{
    explore_options, load_program, parse_output_format, print_json, solver_name,
    LoadedProgram, OutputFormat,
};
use super::CommandStatus;
use crate::cli::GlobalArgs;

#[derive(Debug, Serialize)]
struct EvalReport<'a> {
    file: &'a str,
    entry: &'a str,
    solver: &'static str,
    violations: Vec<ViolationEntry<'a>>,
    paths: &'a [ExecutionPath],
    stats: &'a ExplorationStats,
    oracle: Option<OracleVerdict>,
}

#[derive(Debug, Serialize)]
struct ViolationEntry<'a> {
    assert: String,
    function: &'a str,
    line: usize,
    #[serde(serialize_with = "serialize_input_ref")]
    inputs: &'a InputAssignment,
}

fn serialize_input_ref<S: serde::Serializer>(
    inputs: &&InputAssignment,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serialize_inputs(inputs, serializer)
}

/// Run the `eval` CLI command.
pub(crate) fn run_eval_command(
    global: &GlobalArgs,
    file: PathBuf,
    entry: String,
    format: String,
    keep_else: bool,
) -> miette::Result<CommandStatus> {
    let output_format = parse_output_format(&format)?;
    let options = explore_options(global, &entry, keep_else)?;
    let loaded = load_program(&file)?;
    info!(
        file = %loaded.filename,
        functions = loaded.program.functions.len(),
        asserts = loaded.program.assert_count(),
        "Parsed program"
    );

    let expected = expected_results(&loaded.program).map_err(|e| loaded.report(e))?;
    let result = explore_with_choice(&loaded.program, &options).map_err(|e| loaded.report(e))?;
    let verdict = expected.map(|expected| compare(&expected, &result.return_values()));

    let report = EvalReport {
        file: &loaded.filename,
        entry: &entry,
        solver: solver_name(options.solver),
        violations: violation_entries(&loaded, &result),
        paths: &result.paths,
        stats: &result.stats,
        oracle: verdict,
    };

    match output_format {
        OutputFormat::Text => println!("{}", render_eval_text(&report)),
        OutputFormat::Json => print_json(&report)?,
    }

    Ok(match &report.oracle {
        Some(verdict) if !verdict.matched => CommandStatus::OracleMismatch,
        _ => CommandStatus::Success,
    })
}

fn violation_entries<'a>(
    loaded: &LoadedProgram,
    result: &'a ExplorationResult,
) -> Vec<ViolationEntry<'a>> {
    result
        .violations
        .values()
        .map(|v| ViolationEntry {
            assert: v.assert_id.to_string(),
            function: &v.function,
            line: loaded.line_of(v.span),
            inputs: &v.inputs,
        })
        .collect()
}

fn render_eval_text(report: &EvalReport<'_>) -> String {
    let mut out = String::new();
    if report.violations.is_empty() {
        out.push_str("No assertion violations.\n");
    } else {
        out.push_str("Violated assertions:\n");
        for v in &report.violations {
            out.push_str(&format!(
                "  line {} ({} in {}): {}\n",
                v.line,
                v.assert,
                v.function,
                render_inputs(v.inputs)
            ));
        }
    }

    out.push_str(&format!(
        "Execution paths of {}() ({} feasible, {} infeasible",
        report.entry, report.stats.feasible_paths, report.stats.infeasible_paths
    ));
    if report.stats.unknown_paths > 0 {
        out.push_str(&format!(", {} unknown", report.stats.unknown_paths));
    }
    out.push_str("):\n");
    for path in report.paths {
        out.push_str(&format!("  {path}\n"));
    }

    if let Some(verdict) = &report.oracle {
        let label = if verdict.matched { "MATCH" } else { "MISMATCH" };
        out.push_str(&format!(
            "Oracle: {label} (expected {}, got {})",
            render_set(&verdict.expected),
            render_set(&verdict.actual)
        ));
    } else {
        out.push_str("Oracle: none");
    }
    out
}

fn render_inputs(inputs: &InputAssignment) -> String {
    let fields: Vec<String> = inputs.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", fields.join(", "))
}

fn render_set(values: &BTreeSet<ConcreteValue>) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}
