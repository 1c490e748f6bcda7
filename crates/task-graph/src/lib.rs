//! Immutable task DAG for pipeline orchestration.
//!
//! Graphs are assembled with a [`TaskGraphBuilder`] and validated exactly once
//! by [`TaskGraphBuilder::build`]. The resulting [`TaskGraph`] is read-only:
//! it exposes execution order, parallel levels and upstream/downstream queries
//! but no way to add or remove tasks after construction.
//!
//! # Key Types
//!
//! - [`TaskGraph`]: The frozen graph, backed by petgraph
//! - [`TaskGraphBuilder`]: Collects tasks before validation
//! - [`TaskNodeData`]: Trait that task types must implement to be stored in the graph
//! - [`GraphNode`]: A node in the graph containing the task name and data
//!
//! # Example
//!
//! ```ignore
//! use martflow_task_graph::{TaskGraph, TaskNodeData};
//!
//! #[derive(Clone)]
//! struct Step {
//!     upstream: Vec<String>,
//! }
//!
//! impl TaskNodeData for Step {
//!     fn dependency_names(&self) -> impl Iterator<Item = &str> {
//!         self.upstream.iter().map(String::as_str)
//!     }
//! }
//!
//! let graph = TaskGraph::builder()
//!     .task("compile", Step { upstream: vec![] })
//!     .task("build", Step { upstream: vec!["compile".to_string()] })
//!     .build()?;
//!
//! let order = graph.topological_sort();
//! ```

mod error;
mod graph;
mod traversal;
mod validation;

pub use error::{Error, Result};
pub use graph::{GraphNode, TaskGraph, TaskGraphBuilder};
pub use traversal::{ParallelGroups, TopologicalOrder, compute_transitive_closure};
pub use validation::ValidationResult;

/// Trait for task data that can be stored in the task graph.
///
/// Implement this trait for your task type so the builder can wire edges
/// from the names each task declares as its upstream dependencies.
pub trait TaskNodeData: Clone {
    /// Returns the names of tasks this task depends on.
    fn dependency_names(&self) -> impl Iterator<Item = &str>;
}
