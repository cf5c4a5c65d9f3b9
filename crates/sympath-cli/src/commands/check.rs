// Command handler for: Check
//
// Validates every function reachable from the entry without touching a
// solver, and reports all issues at once.

use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;

use sympath_engine::oracle::expected_results;
use sympath_engine::validate::validate_program;

use super::helpers::{load_program, parse_output_format, print_json, OutputFormat};
use super::CommandStatus;

#[derive(Debug, Serialize)]
struct CheckIssue {
    code: String,
    message: String,
    line: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    file: String,
    entry: String,
    functions: Vec<String>,
    asserts: usize,
    has_oracle: bool,
    issues: Vec<CheckIssue>,
}

fn issue_from<D: Diagnostic>(diag: &D, source: &str) -> CheckIssue {
    let line = diag
        .labels()
        .and_then(|mut labels| labels.next())
        .map(|label| {
            let offset = label.offset().min(source.len());
            source.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
        });
    CheckIssue {
        code: diag.code().map(|c| c.to_string()).unwrap_or_default(),
        message: diag.to_string(),
        line,
    }
}

/// Run the `check` CLI command.
///
/// Exits with status 2 when any issue is found.
pub(crate) fn run_check_command(
    file: PathBuf,
    entry: String,
    format: String,
) -> miette::Result<CommandStatus> {
    let output_format = parse_output_format(&format)?;
    let loaded = load_program(&file)?;
    let validation =
        validate_program(&loaded.program, &entry).map_err(|e| loaded.report(e))?;

    let mut issues: Vec<CheckIssue> = validation
        .issues
        .iter()
        .map(|issue| issue_from(issue, &loaded.source))
        .collect();
    let has_oracle = match expected_results(&loaded.program) {
        Ok(expected) => expected.is_some(),
        Err(err) => {
            issues.push(issue_from(&err, &loaded.source));
            true
        }
    };

    let report = CheckReport {
        file: loaded.filename.clone(),
        entry,
        functions: validation.functions,
        asserts: loaded.program.assert_count(),
        has_oracle,
        issues,
    };

    match output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            for issue in &report.issues {
                match issue.line {
                    Some(line) => {
                        println!("{}:{line}: [{}] {}", report.file, issue.code, issue.message)
                    }
                    None => println!("{}: [{}] {}", report.file, issue.code, issue.message),
                }
            }
            println!(
                "Checked {} function(s) reachable from {}(): {} issue(s), {} assert(s), oracle {}",
                report.functions.len(),
                report.entry,
                report.issues.len(),
                report.asserts,
                if report.has_oracle { "present" } else { "absent" }
            );
        }
    }

    if !report.issues.is_empty() {
        std::process::exit(2);
    }
    Ok(CommandStatus::Success)
}
