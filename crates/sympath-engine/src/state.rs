use indexmap::IndexMap;
use sympath_smt::terms::SmtTerm;

use crate::value::SymValue;

/// Variable name to value, in first-binding order.
pub type Bindings = IndexMap<String, SymValue>;

/// Bindings plus the constraints that must hold to reach this point.
///
/// States are never shared between sibling branches: forking clones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathState {
    pub bindings: Bindings,
    pub constraints: Vec<SmtTerm>,
}

impl PathState {
    pub fn new(bindings: Bindings, constraints: Vec<SmtTerm>) -> Self {
        Self {
            bindings,
            constraints,
        }
    }

    /// Same bindings under a different constraint set.
    pub fn with_constraints(&self, constraints: Vec<SmtTerm>) -> Self {
        Self {
            bindings: self.bindings.clone(),
            constraints,
        }
    }

    /// Copy of this state with `name` rebound.
    pub fn rebind(&self, constraints: Vec<SmtTerm>, updates: Vec<(String, SymValue)>) -> Self {
        let mut bindings = self.bindings.clone();
        for (name, value) in updates {
            bindings.insert(name, value);
        }
        Self {
            bindings,
            constraints,
        }
    }
}

/// One reachable result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub constraints: Vec<SmtTerm>,
    pub value: SymValue,
}

impl Outcome {
    pub fn new(constraints: Vec<SmtTerm>, value: SymValue) -> Self {
        Self { constraints, value }
    }
}

/// A finished path: produced exactly when a `return` executes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRecord {
    pub constraints: Vec<SmtTerm>,
    pub ret: SymValue,
}

/// Append `extra` to a copy of `constraints`.
pub fn extend(constraints: &[SmtTerm], extra: SmtTerm) -> Vec<SmtTerm> {
    let mut out = Vec::with_capacity(constraints.len() + 1);
    out.extend_from_slice(constraints);
    out.push(extra);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_leaves_the_original_untouched() {
        let mut bindings = Bindings::new();
        bindings.insert("x".into(), SymValue::Int(1.into()));
        let state = PathState::new(bindings, vec![]);
        let next = state.rebind(
            vec![SmtTerm::bool(true)],
            vec![("x".into(), SymValue::Int(2.into())), ("y".into(), SymValue::Int(3.into()))],
        );
        assert_eq!(state.bindings.get("x"), Some(&SymValue::Int(1.into())));
        assert!(state.constraints.is_empty());
        assert_eq!(next.bindings.get("x"), Some(&SymValue::Int(2.into())));
        assert_eq!(next.bindings.get("y"), Some(&SymValue::Int(3.into())));
        assert_eq!(next.constraints.len(), 1);
    }

    #[test]
    fn extend_copies() {
        let base = vec![SmtTerm::var("a")];
        let grown = extend(&base, SmtTerm::var("b"));
        assert_eq!(base.len(), 1);
        assert_eq!(grown, vec![SmtTerm::var("a"), SmtTerm::var("b")]);
    }
}
