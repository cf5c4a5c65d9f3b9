use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(format!("{}/../../demos/{name}", env!("CARGO_MANIFEST_DIR")))
}

fn sympath(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sympath"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute sympath")
}

fn write_program(dir: &tempfile::TempDir, source: &str) -> String {
    let path = dir.path().join("program.py");
    std::fs::write(&path, source).expect("write program");
    path.display().to_string()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be JSON (status={}, stderr={}): {e}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[test]
fn help_lists_the_three_subcommands() {
    let output = sympath(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["eval", "run", "check"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn run_uses_all_zero_inputs() {
    let file = demo("divmod.py").display().to_string();
    let output = sympath(&["run", &file]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Inputs: {x: 0}"), "{stdout}");
    assert!(stdout.contains("Result: 0"), "{stdout}");
}

#[test]
fn run_reports_a_failing_assert_with_exit_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "def main(x):\n    assert x != 0\n    return x\n");
    let output = sympath(&["run", &file]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Assertion failed"), "{stderr}");
}

#[test]
fn check_accepts_the_sample_program() {
    let file = demo("large_program.py").display().to_string();
    let output = sympath(&["check", &file, "--format", "json"]);
    assert_eq!(output.status.code(), Some(0));
    let report = stdout_json(&output);
    assert_eq!(report["issues"].as_array().map(Vec::len), Some(0));
    assert_eq!(report["has_oracle"], Value::Bool(true));
    assert_eq!(report["functions"][0], "main");
}

#[test]
fn check_reports_every_unsupported_construct() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(
        &dir,
        "def main(x):\n    if 1 < x < 3:\n        return [x]\n    return 0\n",
    );
    let output = sympath(&["check", &file, "--format", "json"]);
    assert_eq!(output.status.code(), Some(2));
    let report = stdout_json(&output);
    let issues = report["issues"].as_array().expect("issues array");
    assert_eq!(issues.len(), 2, "{issues:?}");
    for issue in issues {
        assert_eq!(issue["code"], "sympath::engine::unsupported");
    }
    assert_eq!(issues[0]["line"], 2);
}

#[test]
fn parse_errors_exit_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_program(&dir, "def main(:\n    return 1\n");
    let output = sympath(&["check", &file]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!output.stderr.is_empty());
}

#[test]
fn unknown_solver_is_an_error() {
    let file = demo("divmod.py").display().to_string();
    let output = sympath(&["eval", &file, "--solver", "yices"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown solver"), "{stderr}");
}

#[cfg(feature = "z3")]
mod eval {
    use super::*;

    #[test]
    fn sample_program_matches_its_oracle() {
        let file = demo("large_program.py").display().to_string();
        let output = sympath(&["eval", &file]);
        assert_eq!(output.status.code(), Some(0));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Oracle: MATCH (expected [0, 1], got [0, 1])"), "{stdout}");
    }

    #[test]
    fn oracle_mismatch_exits_with_code_1() {
        let file = demo("mismatch.py").display().to_string();
        let output = sympath(&["eval", &file, "--format", "json"]);
        assert_eq!(output.status.code(), Some(1));
        let report = stdout_json(&output);
        assert_eq!(report["oracle"]["matched"], Value::Bool(false));
        assert_eq!(report["oracle"]["expected"], serde_json::json!([0, 1, 2]));
        assert_eq!(report["oracle"]["actual"], serde_json::json!([0, 1]));
    }

    #[test]
    fn json_report_carries_violations_with_lines() {
        let file = demo("asserts.py").display().to_string();
        let output = sympath(&["eval", &file, "--format", "json"]);
        assert_eq!(output.status.code(), Some(0));
        let report = stdout_json(&output);

        let violations = report["violations"].as_array().expect("violations array");
        assert_eq!(violations.len(), 1);
        let violation = &violations[0];
        assert_eq!(violation["assert"], "assert#1");
        assert_eq!(violation["function"], "main");
        assert_eq!(violation["line"], 8);
        let a = violation["inputs"]["a"].as_i64().unwrap();
        let b = violation["inputs"]["b"].as_i64().unwrap();
        assert_eq!(a + b, 7);

        assert!(report["oracle"].is_null());
        let paths = report["paths"].as_array().expect("paths array");
        assert!(!paths.is_empty());
        assert_eq!(
            report["stats"]["feasible_paths"].as_u64(),
            Some(paths.len() as u64)
        );
    }

    #[test]
    fn entry_flag_selects_another_function() {
        let file = demo("divmod.py").display().to_string();
        let output = sympath(&["eval", &file, "--entry", "divmod", "--format", "json"]);
        // The oracle describes main(), not divmod().
        assert_eq!(output.status.code(), Some(1));
        let report = stdout_json(&output);
        assert_eq!(report["entry"], "divmod");
        let paths = report["paths"].as_array().expect("paths array");
        assert_eq!(paths.len(), 1);
        let inputs = paths[0]["inputs"].as_object().expect("inputs object");
        assert_eq!(inputs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
