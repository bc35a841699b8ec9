//! wpaudit benchmarking suite
//!
//! Benchmarks for the hot paths of a full registry walk: the eligibility
//! gates run on every descriptor, archive extraction, and scanner report
//! parsing.

pub mod common;

pub use common::*;
