//! Error types for task graph operations.

use thiserror::Error;

/// Result type for task graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dependency cycle was detected in the graph.
    #[error("Cycle detected in task graph: {message}")]
    CycleDetected {
        /// Human-readable description of the cycle.
        message: String,
    },

    /// Two tasks were registered under the same name.
    #[error("Task '{task}' is defined more than once")]
    DuplicateTask {
        /// The duplicated name.
        task: String,
    },

    /// A task depends on another task that doesn't exist.
    #[error("Task '{task}' depends on missing task '{dependency}'")]
    MissingDependency {
        /// The task that has the missing dependency.
        task: String,
        /// The name of the missing dependency.
        dependency: String,
    },

    /// Multiple missing dependencies were found.
    #[error("Missing dependencies: {}", format_missing(missing))]
    MissingDependencies {
        /// List of (task, missing_dependency) pairs.
        missing: Vec<(String, String)>,
    },

    /// A task name was looked up that is not part of the graph.
    #[error("Task '{task}' is not part of the graph")]
    UnknownTask {
        /// The name that was looked up.
        task: String,
    },
}

fn format_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(task, dep)| format!("Task '{task}' depends on missing task '{dep}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
