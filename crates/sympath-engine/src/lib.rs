#![doc = include_str!("../README.md")]

pub mod error;
pub mod eval;
pub mod exec;
pub mod explore;
pub mod interpreter;
pub mod ops;
pub mod options;
pub mod oracle;
pub mod resolve;
pub mod result;
pub mod state;
pub mod validate;
pub mod value;
