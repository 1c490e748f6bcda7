//! One-shot run driver.
//!
//! [`DagRunner::run`] walks the pipeline level by level. Tasks within a level
//! run concurrently; a level starts only after the previous one has settled.
//! A task runs only if every direct upstream succeeded, otherwise it is
//! recorded as [`TaskState::UpstreamFailed`] and never executed.

use crate::executor::TaskExecutor;
use crate::pipeline::PipelineDag;
use crate::settings::DagSettings;
use crate::task::PipelineTask;
use crate::{
    emit_task_completed, emit_task_failed, emit_task_retrying, emit_task_started,
    emit_task_upstream_failed,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Final state of a task after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// An attempt succeeded
    Succeeded,
    /// Every attempt failed
    Failed,
    /// Not executed because an upstream task did not succeed
    UpstreamFailed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
            Self::UpstreamFailed => f.write_str("upstream_failed"),
        }
    }
}

/// Outcome of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRun {
    /// Task id
    pub task_id: String,
    /// Final state
    pub state: TaskState,
    /// Attempts made; zero for markers and skipped tasks
    pub attempts: u32,
    /// Exit code of the last attempt
    pub exit_code: Option<i32>,
    /// Wall time including retry delays
    pub duration_ms: u64,
    /// Why the task did not succeed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline that was run
    pub dag_id: String,
    /// Wall clock start
    pub started_at: DateTime<Utc>,
    /// Wall time of the run
    pub duration_ms: u64,
    /// One entry per task, in execution order
    pub tasks: Vec<TaskRun>,
}

impl RunReport {
    /// Whether every task succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Succeeded)
    }

    /// Look up the outcome of one task.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&TaskRun> {
        self.tasks.iter().find(|t| t.task_id == id)
    }

    /// Number of tasks that ended in `state`.
    #[must_use]
    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|t| t.state == state).count()
    }
}

/// Executes a [`PipelineDag`] once.
#[derive(Debug, Clone)]
pub struct DagRunner<E> {
    executor: E,
}

impl<E: TaskExecutor> DagRunner<E> {
    /// Create a runner that executes tasks with `executor`.
    pub const fn new(executor: E) -> Self {
        Self { executor }
    }

    /// The executor tasks are handed to.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every task of `dag` once, honouring its retry policy.
    ///
    /// Task failures are part of the report, not an error.
    pub async fn run(&self, dag: &PipelineDag) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let settings = dag.settings();

        info!(
            dag_id = %dag.id(),
            tasks = dag.task_count(),
            max_attempts = settings.retry.max_attempts(),
            "Starting pipeline run"
        );

        let mut runs: HashMap<String, TaskRun> = HashMap::with_capacity(dag.task_count());

        for (level, tasks) in dag.parallel_levels().into_iter().enumerate() {
            let mut ready = Vec::with_capacity(tasks.len());
            for task in tasks {
                let blocked: Vec<&str> = task
                    .upstream
                    .iter()
                    .map(String::as_str)
                    .filter(|up| runs.get(*up).is_none_or(|r| r.state != TaskState::Succeeded))
                    .collect();

                if blocked.is_empty() {
                    ready.push(task);
                } else {
                    emit_task_upstream_failed!(task.id, blocked);
                    runs.insert(task.id.clone(), TaskRun::skipped(&task.id));
                }
            }

            debug!(level, ready = ready.len(), "Running level");
            let results = join_all(ready.into_iter().map(|task| self.run_task(task, settings))).await;
            for run in results {
                runs.insert(run.task_id.clone(), run);
            }
        }

        let tasks: Vec<TaskRun> = dag
            .execution_order()
            .into_iter()
            .filter_map(|task| runs.remove(&task.id))
            .collect();

        let report = RunReport {
            dag_id: dag.id().to_string(),
            started_at,
            duration_ms: elapsed_ms(start),
            tasks,
        };

        if report.succeeded() {
            info!(dag_id = %report.dag_id, duration_ms = report.duration_ms, "Pipeline run succeeded");
        } else {
            warn!(
                dag_id = %report.dag_id,
                failed = report.count(TaskState::Failed),
                upstream_failed = report.count(TaskState::UpstreamFailed),
                "Pipeline run failed"
            );
        }

        report
    }

    async fn run_task(&self, task: &PipelineTask, settings: &DagSettings) -> TaskRun {
        if task.is_marker() {
            debug!(task = %task.id, "Marker task reached");
            return TaskRun {
                task_id: task.id.clone(),
                state: TaskState::Succeeded,
                attempts: 0,
                exit_code: None,
                duration_ms: 0,
                error: None,
            };
        }

        let start = Instant::now();
        let policy = settings.retry;
        let max_attempts = policy.max_attempts();
        let command = task.shell_command(settings).unwrap_or_default();

        let mut attempt = 0;
        loop {
            attempt += 1;
            emit_task_started!(task.id, command, attempt);

            let (exit_code, error) = match self.executor.execute(task, settings).await {
                Ok(output) if output.success => {
                    let duration_ms = elapsed_ms(start);
                    emit_task_completed!(task.id, attempt, duration_ms);
                    return TaskRun {
                        task_id: task.id.clone(),
                        state: TaskState::Succeeded,
                        attempts: attempt,
                        exit_code: output.exit_code,
                        duration_ms,
                        error: None,
                    };
                }
                Ok(output) => (output.exit_code, output.failure_summary()),
                Err(e) => (None, e.to_string()),
            };

            if attempt >= max_attempts {
                emit_task_failed!(task.id, attempt, exit_code, error);
                return TaskRun {
                    task_id: task.id.clone(),
                    state: TaskState::Failed,
                    attempts: attempt,
                    exit_code,
                    duration_ms: elapsed_ms(start),
                    error: Some(error),
                };
            }

            emit_task_retrying!(task.id, attempt, max_attempts, policy.delay.as_secs(), error);
            tokio::time::sleep(policy.delay).await;
        }
    }
}

impl TaskRun {
    fn skipped(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            state: TaskState::UpstreamFailed,
            attempts: 0,
            exit_code: None,
            duration_ms: 0,
            error: Some("upstream task did not succeed".to_string()),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
