use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Serialize, Serializer};
use sympath_smt::sorts::SmtSort;
use sympath_smt::terms::SmtTerm;

/// A value during symbolic evaluation.
///
/// Concrete literals stay concrete until an operator meets a solver term;
/// operators never mutate their operands.
#[derive(Debug, Clone, PartialEq)]
pub enum SymValue {
    Int(BigInt),
    Bool(bool),
    /// Solver term over the entry function's inputs.
    Term { term: SmtTerm, sort: SmtSort },
    Tuple(Vec<SymValue>),
}

impl SymValue {
    pub fn int_term(term: SmtTerm) -> Self {
        SymValue::Term {
            term,
            sort: SmtSort::Int,
        }
    }

    pub fn bool_term(term: SmtTerm) -> Self {
        SymValue::Term {
            term,
            sort: SmtSort::Bool,
        }
    }

    /// Kind name used in type-mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SymValue::Int(_) | SymValue::Term { sort: SmtSort::Int, .. } => "int",
            SymValue::Bool(_) | SymValue::Term { sort: SmtSort::Bool, .. } => "bool",
            SymValue::Tuple(_) => "tuple",
        }
    }

    pub fn is_int(&self) -> bool {
        self.kind() == "int"
    }

    pub fn is_bool(&self) -> bool {
        self.kind() == "bool"
    }

    /// The value as an integer-sorted term, if it is an integer.
    pub fn as_int_term(&self) -> Option<SmtTerm> {
        match self {
            SymValue::Int(n) => Some(SmtTerm::int(n.clone())),
            SymValue::Term {
                term,
                sort: SmtSort::Int,
            } => Some(term.clone()),
            _ => None,
        }
    }

    /// The value as a boolean-sorted term, if it is a boolean.
    pub fn as_bool_term(&self) -> Option<SmtTerm> {
        match self {
            SymValue::Bool(b) => Some(SmtTerm::bool(*b)),
            SymValue::Term {
                term,
                sort: SmtSort::Bool,
            } => Some(term.clone()),
            _ => None,
        }
    }

    /// Truthiness: booleans as is, integers as `!= 0`. Tuples have none.
    pub fn truthy(&self) -> Option<SymValue> {
        match self {
            SymValue::Bool(_) => Some(self.clone()),
            SymValue::Int(n) => Some(SymValue::Bool(!n.is_zero())),
            SymValue::Term {
                term,
                sort: SmtSort::Bool,
            } => Some(SymValue::bool_term(term.clone())),
            SymValue::Term {
                term,
                sort: SmtSort::Int,
            } => Some(SymValue::bool_term(term.clone().ne(SmtTerm::int(0)))),
            SymValue::Tuple(_) => None,
        }
    }

    /// `Some` when no solver term occurs anywhere in the value.
    pub fn to_concrete(&self) -> Option<ConcreteValue> {
        match self {
            SymValue::Int(n) => Some(ConcreteValue::Int(n.clone())),
            SymValue::Bool(b) => Some(ConcreteValue::Bool(*b)),
            SymValue::Term { .. } => None,
            SymValue::Tuple(items) => items
                .iter()
                .map(SymValue::to_concrete)
                .collect::<Option<Vec<_>>>()
                .map(ConcreteValue::Tuple),
        }
    }
}

impl From<&ConcreteValue> for SymValue {
    fn from(value: &ConcreteValue) -> Self {
        match value {
            ConcreteValue::Int(n) => SymValue::Int(n.clone()),
            ConcreteValue::Bool(b) => SymValue::Bool(*b),
            ConcreteValue::Tuple(items) => SymValue::Tuple(items.iter().map(SymValue::from).collect()),
        }
    }
}

impl fmt::Display for SymValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymValue::Int(n) => write!(f, "{n}"),
            SymValue::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            SymValue::Term { term, .. } => write!(f, "{term}"),
            SymValue::Tuple(items) => write_tuple(f, items),
        }
    }
}

/// A fully resolved value: what a path returns once the solver has chosen
/// concrete inputs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ConcreteValue {
    Int(#[serde(serialize_with = "serialize_int")] BigInt),
    Bool(bool),
    Tuple(Vec<ConcreteValue>),
}

impl ConcreteValue {
    /// Booleans compare equal to `0` / `1` under set comparison, as they do
    /// in the source language.
    pub fn normalized(&self) -> ConcreteValue {
        match self {
            ConcreteValue::Bool(b) => ConcreteValue::Int(BigInt::from(u8::from(*b))),
            ConcreteValue::Int(n) => ConcreteValue::Int(n.clone()),
            ConcreteValue::Tuple(items) => {
                ConcreteValue::Tuple(items.iter().map(ConcreteValue::normalized).collect())
            }
        }
    }
}

impl fmt::Display for ConcreteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteValue::Int(n) => write!(f, "{n}"),
            ConcreteValue::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            ConcreteValue::Tuple(items) => write_tuple(f, items),
        }
    }
}

/// Integers serialize as JSON numbers while they fit in 128 bits and as
/// decimal strings beyond that.
pub fn serialize_int<S: Serializer>(n: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
    match n.to_i128() {
        Some(small) => serializer.serialize_i128(small),
        None => serializer.serialize_str(&n.to_string()),
    }
}

fn write_tuple<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    if items.len() == 1 {
        f.write_str(",")?;
    }
    f.write_str(")")
}
