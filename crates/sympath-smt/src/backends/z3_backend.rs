use std::collections::HashMap;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use thiserror::Error;
use z3::SatResult as Z3SatResult;

use crate::backends::smtlib_printer::parse_numeral;
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
}

pub struct Z3Solver {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            params: None,
        }
    }

    /// Solver whose every `check` gives up after `timeout_secs` and reports
    /// `SatResult::Unknown`. Zero disables the limit.
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000).min(u64::from(u32::MAX)) as u32;
        params.set_u32("timeout", timeout_ms);
        solver.set_params(&params);
        Self {
            solver,
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            params: Some(params),
        }
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => {
                if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(Z3Error::UnknownVariable(name.clone()))
                }
            }
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(int_literal(n))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::Add(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Int(&l + &r))
            }
            SmtTerm::Sub(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Int(&l - &r))
            }
            SmtTerm::Mul(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Int(&l * &r))
            }
            SmtTerm::Div(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Int(l.div(&r)))
            }
            SmtTerm::Mod(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Int(l.modulo(&r)))
            }
            SmtTerm::Neg(inner) => {
                let v = self.translate_term(inner)?.into_int()?;
                let zero = z3::ast::Int::from_i64(0);
                Ok(Z3Term::Int(&zero - &v))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    _ => Err(Z3Error::Internal("Sort mismatch in Eq".into())),
                }
            }
            SmtTerm::Lt(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Bool(l.lt(&r)))
            }
            SmtTerm::Le(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Bool(l.le(&r)))
            }
            SmtTerm::Gt(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Bool(l.gt(&r)))
            }
            SmtTerm::Ge(lhs, rhs) => {
                let (l, r) = self.int_operands(lhs, rhs)?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            SmtTerm::And(terms) => {
                let bools = self.bool_operands(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.bool_operands(terms)?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
        }
    }

    fn int_operands(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
    ) -> Result<(z3::ast::Int, z3::ast::Int), Z3Error> {
        let l = self.translate_term(lhs)?.into_int()?;
        let r = self.translate_term(rhs)?.into_int()?;
        Ok((l, r))
    }

    fn bool_operands(&self, terms: &[SmtTerm]) -> Result<Vec<z3::ast::Bool>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
            .collect()
    }
}

/// Numeral of any magnitude, assembled from 32-bit limbs when it does not
/// fit an `i64`.
fn int_literal(n: &BigInt) -> z3::ast::Int {
    if let Some(small) = n.to_i64() {
        return z3::ast::Int::from_i64(small);
    }
    let radix = z3::ast::Int::from_u64(1 << 32);
    let (sign, limbs) = n.to_u32_digits();
    let magnitude = limbs
        .iter()
        .rev()
        .fold(z3::ast::Int::from_u64(0), |acc, limb| {
            &(&acc * &radix) + &z3::ast::Int::from_u64(u64::from(*limb))
        });
    if sign == Sign::Minus {
        &z3::ast::Int::from_i64(0) - &magnitude
    } else {
        magnitude
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, Z3Error> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(Z3Error::Internal("Expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(Z3Error::Internal("Expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        match sort {
            SmtSort::Int => {
                let v = z3::ast::Int::new_const(name);
                self.int_vars.insert(name.to_string(), v);
            }
            SmtSort::Bool => {
                let v = z3::ast::Bool::new_const(name);
                self.bool_vars.insert(name.to_string(), v);
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown(self.unknown_reason())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => {
                let z3_model = self
                    .solver
                    .get_model()
                    .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
                let mut values = HashMap::new();

                for &(name, sort) in var_names {
                    match sort {
                        SmtSort::Int => {
                            if let Some(v) = self.int_vars.get(name) {
                                if let Some(n) = z3_model
                                    .eval::<z3::ast::Int>(v, true)
                                    .and_then(|val| parse_numeral(&val.to_string()))
                                {
                                    values.insert(name.to_string(), ModelValue::Int(n));
                                }
                            }
                        }
                        SmtSort::Bool => {
                            if let Some(v) = self.bool_vars.get(name) {
                                if let Some(b) = z3_model
                                    .eval::<z3::ast::Bool>(v, true)
                                    .and_then(|val| val.as_bool())
                                {
                                    values.insert(name.to_string(), ModelValue::Bool(b));
                                }
                            }
                        }
                    }
                }

                Ok((SatResult::Sat, Some(Model { values })))
            }
            Z3SatResult::Unsat => Ok((SatResult::Unsat, None)),
            Z3SatResult::Unknown => Ok((SatResult::Unknown(self.unknown_reason()), None)),
        }
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply timeout if configured.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.int_vars.clear();
        self.bool_vars.clear();
        Ok(())
    }
}

impl Z3Solver {
    fn unknown_reason(&self) -> String {
        self.solver
            .get_reason_unknown()
            .unwrap_or_else(|| "Z3 returned unknown".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn z3_basic_sat() -> TestResult {
        let mut solver = Z3Solver::new();

        solver.declare_var("x", &SmtSort::Int)?;
        solver.declare_var("y", &SmtSort::Int)?;

        // x > 0 && y > 0 && x + y == 10
        let term = SmtTerm::and(vec![
            SmtTerm::var("x").gt(SmtTerm::int(0)),
            SmtTerm::var("y").gt(SmtTerm::int(0)),
            SmtTerm::var("x")
                .add(SmtTerm::var("y"))
                .eq(SmtTerm::int(10)),
        ]);
        solver.assert(&term)?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        Ok(())
    }

    #[test]
    fn z3_basic_unsat() -> TestResult {
        let mut solver = Z3Solver::new();

        solver.declare_var("x", &SmtSort::Int)?;

        solver.assert(&SmtTerm::and(vec![
            SmtTerm::var("x").gt(SmtTerm::int(0)),
            SmtTerm::var("x").lt(SmtTerm::int(0)),
        ]))?;
        assert_eq!(solver.check_sat()?, SatResult::Unsat);
        Ok(())
    }

    #[test]
    fn z3_model_extraction() -> TestResult {
        let mut solver = Z3Solver::new();

        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(42)))?;

        let vars = vec![("x", &SmtSort::Int)];
        let (result, model) = solver.check_sat_with_model(&vars)?;
        assert_eq!(result, SatResult::Sat);
        let model = model.ok_or("expected model for SAT result")?;
        assert_eq!(model.get_int("x"), Some(42.into()));
        Ok(())
    }

    #[test]
    fn z3_unconstrained_variable_is_completed() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.declare_var("y", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(3)))?;

        let vars = vec![("x", &SmtSort::Int), ("y", &SmtSort::Int)];
        let (_, model) = solver.check_sat_with_model(&vars)?;
        let model = model.ok_or("expected model")?;
        assert_eq!(model.get_int("x"), Some(3.into()));
        assert!(model.get_int("y").is_some());
        Ok(())
    }

    #[test]
    fn z3_euclidean_division_and_modulo() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("q", &SmtSort::Int)?;
        solver.declare_var("r", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("q").eq(SmtTerm::int(-7).div(SmtTerm::int(2))))?;
        solver.assert(&SmtTerm::var("r").eq(SmtTerm::int(-7).modulo(SmtTerm::int(2))))?;

        let vars = vec![("q", &SmtSort::Int), ("r", &SmtSort::Int)];
        let (_, model) = solver.check_sat_with_model(&vars)?;
        let model = model.ok_or("expected model")?;
        assert_eq!(model.get_int("q"), Some((-4).into()));
        assert_eq!(model.get_int("r"), Some(1.into()));
        Ok(())
    }

    #[test]
    fn z3_model_values_beyond_i64_are_exact() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.declare_var("y", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").gt(SmtTerm::int(i64::MAX)))?;
        solver.assert(&SmtTerm::var("x").lt(SmtTerm::int(i64::MAX).add(SmtTerm::int(2))))?;
        let huge: BigInt = "-340282366920938463463374607431768211457".parse()?;
        solver.assert(&SmtTerm::var("y").eq(SmtTerm::int(huge.clone())))?;

        let vars = vec![("x", &SmtSort::Int), ("y", &SmtSort::Int)];
        let (result, model) = solver.check_sat_with_model(&vars)?;
        assert_eq!(result, SatResult::Sat);
        let model = model.ok_or("expected model")?;
        assert_eq!(model.get_int("x"), Some(BigInt::from(i64::MAX) + 1));
        assert_eq!(model.get_int("y"), Some(huge));
        Ok(())
    }

    #[test]
    fn z3_push_pop_discards_assertions() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").gt(SmtTerm::int(0)))?;

        let inner = solver.scoped(|s| {
            s.assert(&SmtTerm::var("x").lt(SmtTerm::int(0)))?;
            s.check_sat()
        })?;
        assert_eq!(inner, SatResult::Unsat);
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        Ok(())
    }

    #[test]
    fn z3_bool_model_and_negation() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("b", &SmtSort::Bool)?;
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("b").eq(SmtTerm::var("x").neg().gt(SmtTerm::int(5))))?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(-9)))?;

        let vars = vec![("b", &SmtSort::Bool)];
        let (_, model) = solver.check_sat_with_model(&vars)?;
        let model = model.ok_or("expected model")?;
        assert_eq!(model.get_bool("b"), Some(true));
        Ok(())
    }

    #[test]
    fn z3_timeout_configuration_survives_reset() -> TestResult {
        let mut solver = Z3Solver::with_timeout_secs(2);
        assert!(solver.params.is_some());

        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(1)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);

        solver.reset()?;
        solver.declare_var("x", &SmtSort::Int)?;
        solver.assert(&SmtTerm::var("x").eq(SmtTerm::int(2)))?;
        assert_eq!(solver.check_sat()?, SatResult::Sat);
        assert!(solver.params.is_some());
        Ok(())
    }

    #[test]
    fn z3_rejects_sort_mismatch() -> TestResult {
        let mut solver = Z3Solver::new();
        solver.declare_var("b", &SmtSort::Bool)?;
        let result = solver.assert(&SmtTerm::var("b").add(SmtTerm::int(1)).gt(SmtTerm::int(0)));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn z3_undeclared_variable_is_an_error() {
        let mut solver = Z3Solver::new();
        let result = solver.assert(&SmtTerm::var("nope").gt(SmtTerm::int(0)));
        assert!(matches!(result, Err(Z3Error::UnknownVariable(name)) if name == "nope"));
    }

    // ---------------------------------------------------------------
    // Proptest: solver arithmetic agrees with Rust's Euclidean ops
    // ---------------------------------------------------------------

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn z3_div_mod_agree_with_euclidean_rust(
            a in -1000i64..1000,
            b in (-50i64..50).prop_filter("non-zero divisor", |b| *b != 0),
        ) {
            let mut solver = Z3Solver::new();
            solver.declare_var("q", &SmtSort::Int).unwrap();
            solver.declare_var("r", &SmtSort::Int).unwrap();
            solver
                .assert(&SmtTerm::var("q").eq(SmtTerm::int(a).div(SmtTerm::int(b))))
                .unwrap();
            solver
                .assert(&SmtTerm::var("r").eq(SmtTerm::int(a).modulo(SmtTerm::int(b))))
                .unwrap();
            let vars = vec![("q", &SmtSort::Int), ("r", &SmtSort::Int)];
            let (_, model) = solver.check_sat_with_model(&vars).unwrap();
            let model = model.unwrap();
            prop_assert_eq!(model.get_int("q"), Some(a.div_euclid(b).into()));
            prop_assert_eq!(model.get_int("r"), Some(a.rem_euclid(b).into()));
        }
    }
}
