// Command handler for: Run
//
// Interprets the entry function once with every input fixed at zero.

use std::path::PathBuf;

use num_bigint::BigInt;
use sympath_engine::interpreter::run_concrete;

use super::helpers::load_program;
use super::CommandStatus;

/// Run the `run` CLI command.
pub(crate) fn run_run_command(file: PathBuf, entry: String) -> miette::Result<CommandStatus> {
    let loaded = load_program(&file)?;
    let params = loaded
        .program
        .find_function(&entry)
        .map(|f| f.node.params.clone())
        .unwrap_or_default();
    let inputs = vec![BigInt::default(); params.len()];

    let value = run_concrete(&loaded.program, &entry, &inputs).map_err(|e| loaded.report(e))?;

    let shown: Vec<String> = params.iter().map(|p| format!("{p}: 0")).collect();
    println!("Inputs: {{{}}}", shown.join(", "));
    println!("Result: {value}");
    Ok(CommandStatus::Success)
}
