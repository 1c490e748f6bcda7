//! Task executors.
//!
//! The run driver hands every non-marker task to a [`TaskExecutor`]. A
//! non-zero exit is reported through [`TaskOutput::success`]; `Err` is
//! reserved for tasks that could not be started at all.

use crate::settings::DagSettings;
use crate::task::PipelineTask;
use crate::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Result of one attempt at running a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    /// Process exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Captured stdout (empty when output is inherited)
    pub stdout: String,
    /// Captured stderr (empty when output is inherited)
    pub stderr: String,
}

impl TaskOutput {
    /// A successful attempt with no output.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A failed attempt with the given exit code.
    #[must_use]
    pub fn failed(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            success: false,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Short description of why the attempt failed.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        let code = self
            .exit_code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{code}: {}", line.trim()),
            None => code,
        }
    }
}

/// Runs a single pipeline task.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one attempt of `task`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task could not be started.
    async fn execute(&self, task: &PipelineTask, settings: &DagSettings) -> Result<TaskOutput>;
}

/// Runs dbt commands as child processes in the project directory.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    capture_output: bool,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor {
    /// Executor that invokes `dbt` from `PATH` and inherits stdio.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "dbt".to_string(),
            capture_output: false,
        }
    }

    /// Use a different dbt binary (a wrapper script or absolute path).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Capture stdout and stderr instead of inheriting them.
    #[must_use]
    pub const fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    #[tracing::instrument(name = "execute_task", skip_all, fields(task_id = %task.id))]
    async fn execute(&self, task: &PipelineTask, settings: &DagSettings) -> Result<TaskOutput> {
        let Some(argv) = task.argv(settings) else {
            return Ok(TaskOutput::succeeded());
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(argv.iter().skip(1));
        cmd.current_dir(&settings.project_dir);
        cmd.stdin(Stdio::null());

        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        tracing::debug!(program = %self.program, args = ?&argv[1..], "Spawning task process");

        let output = cmd.output().await.map_err(|source| Error::Spawn {
            task: task.id.clone(),
            source,
        })?;

        Ok(TaskOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Logs what would run and reports success without spawning anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl TaskExecutor for DryRunExecutor {
    async fn execute(&self, task: &PipelineTask, settings: &DagSettings) -> Result<TaskOutput> {
        if let Some(command) = task.shell_command(settings) {
            tracing::info!(task = %task.id, command = %command, "Would execute (dry-run)");
        }
        Ok(TaskOutput::succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DbtCommand;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> DagSettings {
        DagSettings {
            project_dir: dir.path().to_path_buf(),
            ..DagSettings::default()
        }
    }

    #[tokio::test]
    async fn test_process_runs_in_project_dir() {
        let tmp = TempDir::new().unwrap();
        let executor = ProcessExecutor::new()
            .with_program("echo")
            .capture_output(true);
        let task = PipelineTask::dbt_build("dbt_build_staging", "staging");

        let output = executor.execute(&task, &settings_in(&tmp)).await.unwrap();

        assert!(output.success);
        assert_eq!(
            output.stdout.trim(),
            "build --select staging --project-dir . --profiles-dir profiles"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let executor = ProcessExecutor::new()
            .with_program("false")
            .capture_output(true);
        let task = PipelineTask::dbt("dbt_debug", DbtCommand::Debug);

        let output = executor.execute(&task, &settings_in(&tmp)).await.unwrap();

        assert!(!output.success);
        assert_ne!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let tmp = TempDir::new().unwrap();
        let executor = ProcessExecutor::new().with_program("martflow-no-such-dbt-binary");
        let task = PipelineTask::dbt("dbt_deps", DbtCommand::Deps);

        let err = executor
            .execute(&task, &settings_in(&tmp))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { ref task, .. } if task == "dbt_deps"));
    }

    #[tokio::test]
    async fn test_dry_run_always_succeeds() {
        let task = PipelineTask::dbt("dbt_compile", DbtCommand::Compile);
        let output = DryRunExecutor
            .execute(&task, &DagSettings::default())
            .await
            .unwrap();
        assert!(output.success);
    }

    #[test]
    fn test_failure_summary_uses_last_stderr_line() {
        let mut output = TaskOutput::failed(2);
        output.stderr = "Running with dbt\nDatabase Error: relation missing\n\n".to_string();
        assert_eq!(
            output.failure_summary(),
            "exit code 2: Database Error: relation missing"
        );
        assert_eq!(TaskOutput::failed(1).failure_summary(), "exit code 1");
    }
}
