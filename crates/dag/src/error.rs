//! Error types for pipeline construction and execution

use miette::Diagnostic;
use thiserror::Error;

/// Error type for pipeline DAG operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The task set does not form a valid DAG
    #[error("Invalid pipeline '{dag_id}': {source}")]
    #[diagnostic(
        code(martflow::dag::graph),
        help("Every upstream must name an existing task, and dependencies must not form a cycle")
    )]
    Graph {
        /// Pipeline being built
        dag_id: String,
        /// The underlying graph error
        #[source]
        source: martflow_task_graph::Error,
    },

    /// A task id was looked up that the pipeline does not contain
    #[error("Pipeline has no task '{task}'")]
    #[diagnostic(code(martflow::dag::unknown_task))]
    UnknownTask {
        /// The id that was looked up
        task: String,
    },

    /// A task process could not be started
    #[error("Failed to spawn task '{task}': {source}")]
    #[diagnostic(
        code(martflow::dag::spawn),
        help("Check that dbt is installed and on PATH, and that the project directory exists")
    )]
    Spawn {
        /// Task being executed
        task: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid pipeline settings
    #[error("Invalid pipeline settings: {message}")]
    #[diagnostic(code(martflow::dag::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub(crate) fn graph(dag_id: &str, source: martflow_task_graph::Error) -> Self {
        match source {
            martflow_task_graph::Error::UnknownTask { task } => Self::UnknownTask { task },
            source => Self::Graph {
                dag_id: dag_id.to_string(),
                source,
            },
        }
    }
}

/// Result type for pipeline DAG operations
pub type Result<T> = std::result::Result<T, Error>;
