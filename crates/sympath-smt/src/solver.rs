use std::collections::HashMap;

use num_bigint::BigInt;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValue {
    Int(BigInt),
    Bool(bool),
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.values.get(name)
    }

    pub fn get_int(&self, name: &str) -> Option<BigInt> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(n.clone()),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Abstract SMT solver interface.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    ///
    /// Backends evaluate with model completion, so a variable the
    /// constraints leave free still gets a (default) value when possible.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Run `f` inside a fresh push/pop scope. The scope is popped even when
    /// `f` fails; the first error wins.
    fn scoped<T, F>(&mut self, f: F) -> Result<T, Self::Error>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, Self::Error>,
    {
        self.push()?;
        let result = f(self);
        let popped = self.pop();
        let value = result?;
        popped?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    struct MockSolver {
        sat_result: SatResult,
        depth: usize,
        max_depth: usize,
        check_sat_calls: usize,
        reset_calls: usize,
    }

    impl MockSolver {
        fn new(sat_result: SatResult) -> Self {
            Self {
                sat_result,
                depth: 0,
                max_depth: 0,
                check_sat_calls: 0,
                reset_calls: 0,
            }
        }
    }

    impl SmtSolver for MockSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), Self::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), Self::Error> {
            Ok(())
        }

        fn push(&mut self) -> Result<(), Self::Error> {
            self.depth += 1;
            self.max_depth = self.max_depth.max(self.depth);
            Ok(())
        }

        fn pop(&mut self) -> Result<(), Self::Error> {
            self.depth -= 1;
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
            self.check_sat_calls += 1;
            Ok(self.sat_result.clone())
        }

        fn check_sat_with_model(
            &mut self,
            _var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            Ok((self.sat_result.clone(), None))
        }

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.reset_calls += 1;
            Ok(())
        }
    }

    #[test]
    fn model_getters_return_typed_values_only() {
        let mut values = HashMap::new();
        values.insert("x".to_string(), ModelValue::Int(42.into()));
        values.insert("flag".to_string(), ModelValue::Bool(true));
        let model = Model { values };

        assert_eq!(model.get_int("x"), Some(42.into()));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_int("flag"), None);
        assert_eq!(model.get_bool("x"), None);
        assert_eq!(model.get_int("missing"), None);
        assert_eq!(model.get("flag"), Some(&ModelValue::Bool(true)));
    }

    #[test]
    fn scoped_pops_after_success() {
        let mut solver = MockSolver::new(SatResult::Sat);
        let result = solver
            .scoped(|s| s.check_sat())
            .expect("scoped check should succeed");
        assert_eq!(result, SatResult::Sat);
        assert_eq!(solver.depth, 0);
        assert_eq!(solver.max_depth, 1);
        assert_eq!(solver.check_sat_calls, 1);
    }

    #[test]
    fn scoped_pops_after_failure() {
        let mut solver = MockSolver::new(SatResult::Unsat);
        let result: Result<(), io::Error> =
            solver.scoped(|_| Err(io::Error::other("translation failed")));
        assert!(result.is_err());
        assert_eq!(solver.depth, 0);
    }

    #[test]
    fn reset_is_callable() {
        let mut solver = MockSolver::new(SatResult::Unknown("timeout".to_string()));
        solver.reset().expect("reset should succeed");
        assert_eq!(solver.reset_calls, 1);
    }
}
