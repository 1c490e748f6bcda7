//! Traversal algorithms and types for task graphs.
//!
//! This module provides types and utilities for traversing task graphs
//! in various orders.

use crate::GraphNode;
use std::collections::HashSet;
use std::hash::Hash;

/// A topologically sorted sequence of task nodes.
///
/// This type represents tasks in an order where all dependencies
/// come before the tasks that depend on them.
pub type TopologicalOrder<'a, T> = Vec<&'a GraphNode<T>>;

/// Groups of tasks that can execute in parallel.
///
/// Each inner vector contains tasks that have no dependencies on each other
/// and can safely execute concurrently. The outer vector is ordered by
/// dependency level - all tasks in group N must complete before tasks
/// in group N+1 can start.
pub type ParallelGroups<'a, T> = Vec<Vec<&'a GraphNode<T>>>;

/// Compute the transitive closure from an initial set.
///
/// Given a set of starting nodes and a function returning the neighbours of a
/// node, returns every node reachable by repeatedly following neighbours,
/// including the starting nodes.
///
/// # Example
///
/// ```
/// use martflow_task_graph::compute_transitive_closure;
/// use std::collections::HashMap;
///
/// let deps: HashMap<&str, Vec<&str>> = [
///     ("build", vec![]),
///     ("test", vec!["build"]),
///     ("deploy", vec!["test"]),
/// ]
/// .into_iter()
/// .collect();
///
/// let closure = compute_transitive_closure(["deploy"], |name| {
///     deps.get(name).cloned().unwrap_or_default()
/// });
/// assert_eq!(closure.len(), 3);
/// ```
#[must_use]
pub fn compute_transitive_closure<N, I, F>(initial: I, neighbours: F) -> HashSet<N>
where
    N: Copy + Eq + Hash,
    I: IntoIterator<Item = N>,
    F: Fn(N) -> Vec<N>,
{
    let mut all = HashSet::new();
    let mut frontier: Vec<N> = Vec::new();

    for node in initial {
        if all.insert(node) {
            frontier.push(node);
        }
    }

    while let Some(node) = frontier.pop() {
        for next in neighbours(node) {
            if all.insert(next) {
                frontier.push(next);
            }
        }
    }

    all
}
