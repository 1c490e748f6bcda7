// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! martflow command line interface.
//!
//! Exposes the customer lifetime value model (`martflow clv`) and the dbt
//! layer pipeline (`martflow dag`). The binary is a thin wrapper: commands
//! return a [`commands::CommandOutput`] and `main` prints either its text or
//! an [`cli::OkEnvelope`] when `--json` is set.
//!
//! Exit codes:
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | pipeline run finished with failed tasks |
//! | 2 | CLI or configuration error |
//! | 3 | evaluation or I/O error |

pub mod cli;
pub mod commands;
pub mod config;
pub mod tracing;
