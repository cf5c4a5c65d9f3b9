#![cfg(feature = "z3")]

//! Property: on straight-line programs, the single explored path returns
//! exactly what the concrete interpreter computes for the inputs the solver
//! picked.

mod common;

use common::{explore_program, input_values, parse_source};
use proptest::prelude::*;
use sympath_engine::interpreter::run_concrete;
use sympath_engine::options::ExploreOptions;

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (-20i64..20).prop_map(|n| if n < 0 { format!("({n})") } else { n.to_string() }),
        Just("a".to_string()),
        Just("b".to_string()),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} + {r})")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} - {r})")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} * {r})")),
            (inner.clone(), 1i64..9).prop_map(|(l, d)| format!("({l} // {d})")),
            (inner.clone(), 1i64..9).prop_map(|(l, d)| format!("({l} % {d})")),
            inner.prop_map(|e| format!("(-{e})")),
        ]
    })
}

fn straight_line_program(first: &str, second: &str) -> String {
    format!(
        "def main(a, b):\n    c = {first}\n    d = {second}\n    return c, d, c == d\n"
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn explored_path_matches_concrete_run(first in arb_expr(), second in arb_expr()) {
        let source = straight_line_program(&first, &second);
        let program = parse_source(&source);
        let options = ExploreOptions::default();

        let result = explore_program(&program, &options);
        prop_assert_eq!(result.stats.path_records, 1);
        prop_assert_eq!(result.paths.len(), 1);

        let path = &result.paths[0];
        match run_concrete(&program, "main", &input_values(path)) {
            Ok(value) => prop_assert_eq!(value, path.result.clone()),
            Err(e) => prop_assert!(false, "concrete run failed: {e}"),
        }
    }
}
