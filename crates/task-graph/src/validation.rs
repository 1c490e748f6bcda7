//! Validation utilities for task graphs.
//!
//! This module provides the report returned by
//! [`TaskGraphBuilder::validate`](crate::TaskGraphBuilder::validate).

use crate::{Error, Result};

/// Result of graph validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the graph is valid (no duplicates, cycles or missing dependencies).
    pub is_valid: bool,
    /// List of validation errors, if any.
    pub errors: Vec<Error>,
}

impl ValidationResult {
    /// Create a valid result.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create an invalid result with errors.
    #[must_use]
    pub fn invalid(errors: Vec<Error>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Convert into a `Result`, surfacing the first error.
    ///
    /// # Errors
    ///
    /// Returns the first recorded validation error when the graph is invalid.
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{TaskGraph, TaskGraphBuilder, TaskNodeData};

    #[derive(Clone, Debug, Default)]
    struct TestTask {
        depends_on: Vec<String>,
    }

    impl TaskNodeData for TestTask {
        fn dependency_names(&self) -> impl Iterator<Item = &str> {
            self.depends_on.iter().map(String::as_str)
        }
    }

    fn task(deps: &[&str]) -> TestTask {
        TestTask {
            depends_on: deps.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_empty_graph() {
        let builder: TaskGraphBuilder<TestTask> = TaskGraph::builder();
        let result = builder.validate();
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_validate_valid_graph() {
        let result = TaskGraph::builder()
            .task("a", task(&[]))
            .task("b", task(&["a"]))
            .validate();
        assert!(result.is_valid);
    }

    #[test]
    fn test_validate_cyclic_graph() {
        let result = TaskGraph::builder()
            .task("a", task(&["b"]))
            .task("b", task(&["a"]))
            .validate();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let result = TaskGraph::builder()
            .task("a", task(&["b"]))
            .task("b", task(&["a"]))
            .task("c", task(&["ghost"]))
            .task("c", task(&[]))
            .validate();

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.into_result().is_err());
    }
}
