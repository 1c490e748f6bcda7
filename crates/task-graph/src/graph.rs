//! Task graph builder using petgraph.
//!
//! This module builds directed acyclic graphs (DAGs) from task definitions
//! and freezes them into a read-only [`TaskGraph`].

use crate::traversal::{ParallelGroups, TopologicalOrder, compute_transitive_closure};
use crate::validation::ValidationResult;
use crate::{Error, Result, TaskNodeData};
use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A node in the task graph.
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    /// Name of the task.
    pub name: String,
    /// The task data.
    pub task: T,
}

/// Collects tasks, then validates and freezes them into a [`TaskGraph`].
#[derive(Debug, Clone)]
pub struct TaskGraphBuilder<T> {
    tasks: Vec<(String, T)>,
}

/// Intermediate wiring shared by [`TaskGraphBuilder::validate`] and [`TaskGraphBuilder::build`].
struct Assembly<T> {
    graph: DiGraph<GraphNode<T>, ()>,
    name_to_node: HashMap<String, NodeIndex>,
    errors: Vec<Error>,
}

impl<T: TaskNodeData> TaskGraphBuilder<T> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add a task. Insertion order is preserved and used to break ties when
    /// ordering tasks that sit on the same dependency level.
    #[must_use]
    pub fn task(mut self, name: impl Into<String>, task: T) -> Self {
        self.tasks.push((name.into(), task));
        self
    }

    /// Validate the collected definitions without building the graph.
    ///
    /// Unlike [`build`](Self::build), this reports every problem found:
    /// duplicate names, missing dependencies and cycles.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let assembly = self.assemble();
        if assembly.errors.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(assembly.errors)
        }
    }

    /// Validate the definitions and freeze them into a [`TaskGraph`].
    ///
    /// # Errors
    ///
    /// Returns the first validation error: a duplicate name, missing
    /// dependencies, or a dependency cycle.
    pub fn build(self) -> Result<TaskGraph<T>> {
        let Assembly {
            graph,
            name_to_node,
            errors,
        } = self.assemble();

        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }

        let sorted = toposort(&graph, None).map_err(|cycle| Error::CycleDetected {
            message: format!("task '{}' is part of a cycle", graph[cycle.node_id()].name),
        })?;

        let mut levels = vec![0_usize; graph.node_count()];
        for &idx in &sorted {
            let level = graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|dep| levels[dep.index()] + 1)
                .max()
                .unwrap_or(0);
            levels[idx.index()] = level;
        }

        let mut order: Vec<NodeIndex> = graph.node_indices().collect();
        order.sort_by_key(|idx| (levels[idx.index()], idx.index()));

        debug!(
            tasks = graph.node_count(),
            edges = graph.edge_count(),
            "Built task graph"
        );

        Ok(TaskGraph {
            graph,
            name_to_node,
            order,
            levels,
        })
    }

    fn assemble(&self) -> Assembly<T> {
        let mut graph = DiGraph::new();
        let mut name_to_node = HashMap::new();
        let mut errors = Vec::new();

        for (name, task) in &self.tasks {
            if name_to_node.contains_key(name) {
                errors.push(Error::DuplicateTask { task: name.clone() });
                continue;
            }
            let idx = graph.add_node(GraphNode {
                name: name.clone(),
                task: task.clone(),
            });
            name_to_node.insert(name.clone(), idx);
            debug!("Added task node '{}'", name);
        }

        let mut missing = Vec::new();
        let mut edges = Vec::new();
        for idx in graph.node_indices() {
            let node = &graph[idx];
            for dep_name in node.task.dependency_names() {
                match name_to_node.get(dep_name) {
                    Some(&dep_idx) => edges.push((dep_idx, idx)),
                    None => missing.push((node.name.clone(), dep_name.to_string())),
                }
            }
        }

        for (from, to) in edges {
            graph.update_edge(from, to, ());
        }

        missing.sort();
        missing.dedup();
        match missing.len() {
            0 => {}
            1 => {
                let (task, dependency) = missing.remove(0);
                errors.push(Error::MissingDependency { task, dependency });
            }
            _ => errors.push(Error::MissingDependencies { missing }),
        }

        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&idx| graph.contains_edge(idx, idx));
            if is_cycle {
                let mut names: Vec<&str> = component.iter().map(|&i| graph[i].name.as_str()).collect();
                names.sort_unstable();
                errors.push(Error::CycleDetected {
                    message: format!("tasks {} depend on each other", names.join(", ")),
                });
            }
        }

        Assembly {
            graph,
            name_to_node,
            errors,
        }
    }
}

impl<T: TaskNodeData> Default for TaskGraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only task graph for dependency resolution and execution ordering.
///
/// Built once through [`TaskGraphBuilder`]; the execution order and the
/// dependency level of every task are computed at construction time.
#[derive(Debug, Clone)]
pub struct TaskGraph<T> {
    graph: DiGraph<GraphNode<T>, ()>,
    name_to_node: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
    levels: Vec<usize>,
}

impl<T: TaskNodeData> TaskGraph<T> {
    /// Start building a new graph.
    #[must_use]
    pub fn builder() -> TaskGraphBuilder<T> {
        TaskGraphBuilder::new()
    }

    /// Get the number of tasks in the graph.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependency edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get a reference to a task node by name.
    #[must_use]
    pub fn get_node_by_name(&self, name: &str) -> Option<&GraphNode<T>> {
        self.name_to_node
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Dependency level of a task: 0 for tasks with no upstream, otherwise
    /// one more than the deepest upstream task.
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.name_to_node.get(name).map(|idx| self.levels[idx.index()])
    }

    /// Iterate over every `(upstream, downstream)` edge by task name.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].name.as_str(),
                self.graph[edge.target()].name.as_str(),
            )
        })
    }

    /// Tasks in execution order.
    ///
    /// Tasks are ordered by dependency level, then by insertion order, so the
    /// result is stable across runs.
    #[must_use]
    pub fn topological_sort(&self) -> TopologicalOrder<'_, T> {
        self.order.iter().map(|&idx| &self.graph[idx]).collect()
    }

    /// Get all tasks grouped by dependency level.
    ///
    /// Each group contains tasks with no dependencies on each other. All tasks
    /// in group N must complete before tasks in group N+1 can start.
    #[must_use]
    pub fn get_parallel_groups(&self) -> ParallelGroups<'_, T> {
        let mut groups: ParallelGroups<'_, T> = Vec::new();
        for &idx in &self.order {
            let level = self.levels[idx.index()];
            if level >= groups.len() {
                groups.resize_with(level + 1, Vec::new);
            }
            groups[level].push(&self.graph[idx]);
        }
        groups
    }

    /// Direct upstream tasks of `name`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] if `name` is not in the graph.
    pub fn dependencies(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.index_of(name)?;
        let mut upstream: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        upstream.sort_unstable_by_key(|n| n.index());
        Ok(upstream
            .into_iter()
            .map(|n| self.graph[n].name.as_str())
            .collect())
    }

    /// Every task `name` transitively depends on (excluding `name` itself).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] if `name` is not in the graph.
    pub fn upstream_of(&self, name: &str) -> Result<HashSet<String>> {
        self.closure(name, Direction::Incoming)
    }

    /// Every task that transitively depends on `name` (excluding `name` itself).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] if `name` is not in the graph.
    pub fn downstream_of(&self, name: &str) -> Result<HashSet<String>> {
        self.closure(name, Direction::Outgoing)
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.name_to_node
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTask {
                task: name.to_string(),
            })
    }

    fn closure(&self, name: &str, direction: Direction) -> Result<HashSet<String>> {
        let start = self.index_of(name)?;
        let mut reachable = compute_transitive_closure([start], |idx| {
            self.graph.neighbors_directed(idx, direction).collect()
        });
        reachable.remove(&start);
        Ok(reachable
            .into_iter()
            .map(|idx| self.graph[idx].name.clone())
            .collect())
    }
}
