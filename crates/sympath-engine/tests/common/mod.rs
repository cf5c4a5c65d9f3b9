#![allow(dead_code)]

use num_bigint::BigInt;
use sympath_engine::explore::explore;
use sympath_engine::options::ExploreOptions;
use sympath_engine::result::{ExecutionPath, ExplorationResult};
use sympath_engine::value::ConcreteValue;
use sympath_lang::ast::Program;
use sympath_smt::backends::z3_backend::Z3Solver;

pub fn load_demo(name: &str) -> String {
    let path = format!("{}/../../demos/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {path}: {e}"))
}

pub fn parse_source(source: &str) -> Program {
    sympath_lang::parse(source, "test.py").unwrap_or_else(|e| panic!("parse failed: {e}"))
}

pub fn explore_program(program: &Program, options: &ExploreOptions) -> ExplorationResult {
    let mut solver = Z3Solver::with_timeout_secs(options.timeout_secs);
    explore(program, &mut solver, options).unwrap_or_else(|e| panic!("exploration failed: {e}"))
}

pub fn explore_source(source: &str) -> ExplorationResult {
    explore_program(&parse_source(source), &ExploreOptions::default())
}

pub fn explore_demo(name: &str) -> ExplorationResult {
    explore_source(&load_demo(name))
}

pub fn ints(values: &[i64]) -> Vec<ConcreteValue> {
    values.iter().map(|n| ConcreteValue::Int((*n).into())).collect()
}

/// Input values of `path` in parameter order, ready for `run_concrete`.
pub fn input_values(path: &ExecutionPath) -> Vec<BigInt> {
    path.inputs.values().cloned().collect()
}

/// Every path's result, sorted, duplicates kept.
pub fn result_multiset(result: &ExplorationResult) -> Vec<ConcreteValue> {
    let mut results: Vec<ConcreteValue> = result.paths.iter().map(|p| p.result.clone()).collect();
    results.sort();
    results
}

/// Distinct return values, sorted.
pub fn returns(result: &ExplorationResult) -> Vec<ConcreteValue> {
    result.return_values().into_iter().collect()
}
