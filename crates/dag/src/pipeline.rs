//! Immutable pipeline values and the standard dbt layer pipeline.

use crate::settings::DagSettings;
use crate::task::{DbtCommand, PipelineTask};
use crate::{Error, Result};
use martflow_task_graph::{TaskGraph, ValidationResult};
use std::collections::HashSet;
use tracing::debug;

/// The four mart builds that run in parallel, as `(task id, dbt selector)`.
pub const MART_BUILDS: [(&str, &str); 4] = [
    ("dbt_build_revenue_mart", "marts.revenue_pricing"),
    ("dbt_build_customer_mart", "marts.customer_analytics"),
    ("dbt_build_supplier_mart", "marts.supplier_analytics"),
    ("dbt_build_order_mart", "marts.order_performance"),
];

/// A validated, read-only pipeline.
///
/// There is no way to add tasks or edges after [`PipelineDag::build`]; every
/// query works on the frozen graph.
#[derive(Debug, Clone)]
pub struct PipelineDag {
    settings: DagSettings,
    graph: TaskGraph<PipelineTask>,
}

impl PipelineDag {
    /// Validate `tasks` and freeze them into a pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Graph`] on duplicate ids, unknown upstreams or cycles.
    pub fn build<I>(settings: DagSettings, tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = PipelineTask>,
    {
        let graph = tasks
            .into_iter()
            .fold(TaskGraph::builder(), |builder, task| {
                builder.task(task.id.clone(), task)
            })
            .build()
            .map_err(|e| Error::graph(&settings.dag_id, e))?;

        debug!(
            dag_id = %settings.dag_id,
            tasks = graph.task_count(),
            edges = graph.edge_count(),
            "Built pipeline"
        );

        Ok(Self { settings, graph })
    }

    /// Check `tasks` without building, collecting every problem found.
    #[must_use]
    pub fn validate<I>(tasks: I) -> ValidationResult
    where
        I: IntoIterator<Item = PipelineTask>,
    {
        tasks
            .into_iter()
            .fold(TaskGraph::builder(), |builder, task| {
                builder.task(task.id.clone(), task)
            })
            .validate()
    }

    /// Pipeline identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.settings.dag_id
    }

    /// Human readable summary.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.settings.description
    }

    /// Settings shared by all tasks.
    #[must_use]
    pub const fn settings(&self) -> &DagSettings {
        &self.settings
    }

    /// Number of tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.task_count()
    }

    /// Look up a task by id.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&PipelineTask> {
        self.graph.get_node_by_name(id).map(|node| &node.task)
    }

    /// Every `(upstream, downstream)` pair.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.edges()
    }

    /// Tasks in a stable order that respects every dependency.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&PipelineTask> {
        self.graph
            .topological_sort()
            .into_iter()
            .map(|node| &node.task)
            .collect()
    }

    /// Tasks grouped into levels; tasks in one level are independent.
    #[must_use]
    pub fn parallel_levels(&self) -> Vec<Vec<&PipelineTask>> {
        self.graph
            .get_parallel_groups()
            .into_iter()
            .map(|level| level.into_iter().map(|node| &node.task).collect())
            .collect()
    }

    /// Level of a task in [`Self::parallel_levels`].
    #[must_use]
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.graph.level_of(id)
    }

    /// Direct upstream task ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] for an unknown id.
    pub fn direct_upstream(&self, id: &str) -> Result<Vec<&str>> {
        self.graph
            .dependencies(id)
            .map_err(|e| Error::graph(self.id(), e))
    }

    /// Every task `id` transitively waits on, in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] for an unknown id.
    pub fn upstream(&self, id: &str) -> Result<Vec<&PipelineTask>> {
        let ids = self
            .graph
            .upstream_of(id)
            .map_err(|e| Error::graph(self.id(), e))?;
        Ok(self.in_order(&ids))
    }

    /// Every task that transitively waits on `id`, in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] for an unknown id.
    pub fn downstream(&self, id: &str) -> Result<Vec<&PipelineTask>> {
        let ids = self
            .graph
            .downstream_of(id)
            .map_err(|e| Error::graph(self.id(), e))?;
        Ok(self.in_order(&ids))
    }

    fn in_order(&self, ids: &HashSet<String>) -> Vec<&PipelineTask> {
        self.execution_order()
            .into_iter()
            .filter(|task| ids.contains(&task.id))
            .collect()
    }
}

/// Task list of the standard pipeline:
/// `start → dbt_debug → dbt_deps → dbt_compile → staging → intermediate →
/// dimensions → four marts in parallel → end`.
#[must_use]
pub fn dbt_pipeline_tasks() -> Vec<PipelineTask> {
    let mut tasks = vec![
        PipelineTask::marker("start"),
        PipelineTask::dbt("dbt_debug", DbtCommand::Debug).after(["start"]),
        PipelineTask::dbt("dbt_deps", DbtCommand::Deps).after(["dbt_debug"]),
        PipelineTask::dbt("dbt_compile", DbtCommand::Compile).after(["dbt_deps"]),
        PipelineTask::dbt_build("dbt_build_staging", "staging").after(["dbt_compile"]),
        PipelineTask::dbt_build("dbt_build_intermediate", "intermediate")
            .after(["dbt_build_staging"]),
        PipelineTask::dbt_build("dbt_build_dimensions", "dimensions")
            .after(["dbt_build_intermediate"]),
    ];

    tasks.extend(MART_BUILDS.iter().map(|(id, selector)| {
        PipelineTask::dbt_build(*id, *selector).after(["dbt_build_dimensions"])
    }));
    tasks.push(PipelineTask::marker("end").after(MART_BUILDS.iter().map(|(id, _)| *id)));
    tasks
}

/// Build the standard dbt layer pipeline.
///
/// # Errors
///
/// Only fails if the task list itself is inconsistent, which the tests rule
/// out; the `Result` keeps the signature uniform with [`PipelineDag::build`].
pub fn dbt_pipeline(settings: DagSettings) -> Result<PipelineDag> {
    PipelineDag::build(settings, dbt_pipeline_tasks())
}
