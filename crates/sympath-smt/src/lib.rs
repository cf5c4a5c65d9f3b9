#![doc = include_str!("../README.md")]

//! SMT terms and solver integration for symbolic path exploration.
//!
//! Every path explored by the engine is checked with one short-lived
//! query: push a scope, declare the entry inputs, assert the path
//! constraints, check, read the model, pop.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
