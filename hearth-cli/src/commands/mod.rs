//! Command implementations.

pub mod check;
pub mod common;
pub mod run;
