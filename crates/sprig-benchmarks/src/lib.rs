//! sprig benchmarking suite
//!
//! Benchmarks of graph loading, conflict detection, build ordering and
//! manifest parsing.

pub mod common;

pub use common::*;
