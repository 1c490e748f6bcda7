// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! The dbt layer pipeline.
//!
//! A [`PipelineDag`] is an immutable graph of [`PipelineTask`]s plus the
//! [`DagSettings`] shared by every task. [`dbt_pipeline`] builds the
//! standard pipeline:
//!
//! ```text
//! start → dbt_debug → dbt_deps → dbt_compile → dbt_build_staging
//!       → dbt_build_intermediate → dbt_build_dimensions
//!       → { revenue, customer, supplier, order marts } → end
//! ```
//!
//! [`DagRunner`] executes a pipeline once through a [`TaskExecutor`],
//! retrying failed tasks per [`RetryPolicy`] and skipping everything
//! downstream of a task that did not succeed. Recurring scheduling is left
//! to the orchestration platform.
//!
//! # Example
//!
//! ```no_run
//! use martflow_dag::{DagRunner, DagSettings, DryRunExecutor, dbt_pipeline};
//!
//! # async fn run() -> martflow_dag::Result<()> {
//! let dag = dbt_pipeline(DagSettings::default())?;
//! let report = DagRunner::new(DryRunExecutor).run(&dag).await;
//! assert!(report.succeeded());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod events;
mod executor;
mod pipeline;
mod runner;
mod settings;
mod task;

pub use error::{Error, Result};
pub use executor::{DryRunExecutor, ProcessExecutor, TaskExecutor, TaskOutput};
pub use pipeline::{MART_BUILDS, PipelineDag, dbt_pipeline, dbt_pipeline_tasks};
pub use runner::{DagRunner, RunReport, TaskRun, TaskState};
pub use settings::{
    DEFAULT_PROFILES_DIR, DEFAULT_PROJECT_DIR, DagSettings, RetryPolicy, Schedule,
};
pub use task::{DbtCommand, PipelineTask, TaskAction};
