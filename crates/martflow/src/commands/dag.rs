//! `martflow dag` commands.

use super::CommandOutput;
use crate::cli::{CliError, EXIT_RUN_FAILED};
use martflow_dag::{
    DagRunner, DagSettings, DryRunExecutor, MART_BUILDS, PipelineDag, ProcessExecutor, RunReport,
    TaskState, dbt_pipeline, dbt_pipeline_tasks,
};
use serde_json::json;
use std::fmt::Write as _;

/// Describe the pipeline: settings, then tasks level by level.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built.
pub fn execute_show(settings: DagSettings) -> Result<CommandOutput, CliError> {
    let dag = dbt_pipeline(settings)?;
    let s = dag.settings();

    let mut text = String::new();
    let _ = writeln!(text, "{}: {}", dag.id(), dag.description());
    let _ = writeln!(
        text,
        "owner: {}  schedule: {}  start_date: {}  catchup: {}",
        s.owner, s.schedule, s.start_date, s.catchup
    );
    let _ = writeln!(
        text,
        "retries: {} (delay {}s)  tags: {}",
        s.retry.retries,
        s.retry.delay.as_secs(),
        s.tags.join(", ")
    );
    let _ = writeln!(
        text,
        "project: {} (profiles: {})",
        s.project_dir.display(),
        s.profiles_dir.display()
    );

    let levels = dag.parallel_levels();
    for (index, level) in levels.iter().enumerate() {
        let _ = writeln!(text, "\nlevel {index}");
        for task in level {
            match task.shell_command(s) {
                Some(command) => {
                    let _ = writeln!(text, "  {:<26} {command}", task.id);
                }
                None => {
                    let _ = writeln!(text, "  {}", task.id);
                }
            }
        }
    }

    let data = json!({
        "settings": s,
        "tasks": dag.execution_order(),
        "levels": levels
            .iter()
            .map(|level| level.iter().map(|t| t.id.as_str()).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    });

    Ok(CommandOutput::ok(text, data))
}

/// Check the pipeline structure and report what was verified.
///
/// # Errors
///
/// Returns an evaluation error listing every structural problem found.
pub fn execute_validate(settings: DagSettings) -> Result<CommandOutput, CliError> {
    let result = PipelineDag::validate(dbt_pipeline_tasks());
    if !result.is_valid {
        let problems: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
        return Err(CliError::eval(format!(
            "Pipeline definition is invalid: {}",
            problems.join("; ")
        )));
    }

    let dag = dbt_pipeline(settings)?;
    let mart_levels: Vec<Option<usize>> = MART_BUILDS
        .iter()
        .map(|(id, _)| dag.level_of(id))
        .collect();
    let marts_parallel = mart_levels.windows(2).all(|pair| pair[0] == pair[1]);

    let end_upstream = dag.direct_upstream("end")?;
    let end_waits_for_marts = MART_BUILDS
        .iter()
        .all(|(id, _)| end_upstream.contains(id));

    if !(marts_parallel && end_waits_for_marts) {
        return Err(CliError::eval(
            "Mart builds must share one level and all feed the end marker",
        ));
    }

    let levels = dag.parallel_levels().len();
    let edges = dag.edges().count();
    let text = format!(
        "Pipeline '{}' is valid: {} tasks, {edges} edges, {levels} levels",
        dag.id(),
        dag.task_count()
    );
    let data = json!({
        "dag_id": dag.id(),
        "valid": true,
        "tasks": dag.task_count(),
        "edges": edges,
        "levels": levels,
    });
    Ok(CommandOutput::ok(text, data))
}

/// Run the pipeline once.
///
/// A run with failed tasks is not an error; it yields exit code
/// [`EXIT_RUN_FAILED`].
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or, for a real run, the
/// project directory does not exist.
pub async fn execute_run(
    settings: DagSettings,
    dry_run: bool,
    dbt_bin: &str,
) -> Result<CommandOutput, CliError> {
    if !dry_run && !settings.project_dir.is_dir() {
        return Err(CliError::config_with_help(
            format!(
                "dbt project directory {} does not exist",
                settings.project_dir.display()
            ),
            "Pass --project-dir or set dag.projectDir in martflow.toml",
        ));
    }

    let dag = dbt_pipeline(settings)?;
    let report = if dry_run {
        DagRunner::new(DryRunExecutor).run(&dag).await
    } else {
        DagRunner::new(ProcessExecutor::new().with_program(dbt_bin))
            .run(&dag)
            .await
    };

    let text = render_report(&report);
    let data = serde_json::to_value(&report)
        .map_err(|e| CliError::other(format!("JSON serialization failed: {e}")))?;

    let output = CommandOutput::ok(text, data);
    Ok(if report.succeeded() {
        output
    } else {
        output.with_exit_code(EXIT_RUN_FAILED)
    })
}

fn render_report(report: &RunReport) -> String {
    let mut text = String::new();
    for task in &report.tasks {
        let _ = write!(text, "{:<16} {}", task.state.to_string(), task.task_id);
        if task.attempts > 0 {
            let plural = if task.attempts == 1 { "" } else { "s" };
            let _ = write!(
                text,
                " ({} attempt{plural}, {}ms)",
                task.attempts, task.duration_ms
            );
        }
        if let Some(error) = task.error.as_deref().filter(|_| task.state == TaskState::Failed) {
            let _ = write!(text, ": {error}");
        }
        text.push('\n');
    }

    if report.succeeded() {
        let _ = write!(
            text,
            "Pipeline {} succeeded in {}ms",
            report.dag_id, report.duration_ms
        );
    } else {
        let _ = write!(
            text,
            "Pipeline {} failed: {} failed, {} upstream_failed",
            report.dag_id,
            report.count(TaskState::Failed),
            report.count(TaskState::UpstreamFailed)
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_OK;

    #[test]
    fn test_show_lists_every_level() {
        let output = execute_show(DagSettings::default()).unwrap();
        assert!(output.text.contains("level 8"));
        assert!(output.text.contains("dbt build --select marts.customer_analytics"));
        assert_eq!(output.data["levels"][7].as_array().unwrap().len(), 4);
        assert_eq!(output.data["settings"]["owner"], "gotphoto");
    }

    #[test]
    fn test_validate_standard_pipeline() {
        let output = execute_validate(DagSettings::default()).unwrap();
        assert_eq!(
            output.text,
            "Pipeline 'dbt_pipeline' is valid: 12 tasks, 14 edges, 9 levels"
        );
    }

    #[tokio::test]
    async fn test_dry_run_succeeds_without_project_dir() {
        let output = execute_run(DagSettings::default(), true, "dbt").await.unwrap();
        assert_eq!(output.exit_code, EXIT_OK);
        assert!(output.text.contains("Pipeline dbt_pipeline succeeded in"));
    }

    #[tokio::test]
    async fn test_real_run_requires_project_dir() {
        let settings = DagSettings {
            project_dir: "/nonexistent/dbt_project".into(),
            ..DagSettings::default()
        };
        let err = execute_run(settings, false, "dbt").await.unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[tokio::test]
    async fn test_failing_dbt_exits_with_run_failed() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DagSettings {
            project_dir: dir.path().to_path_buf(),
            retry: martflow_dag::RetryPolicy::none(),
            ..DagSettings::default()
        };
        let output = execute_run(settings, false, "false").await.unwrap();

        assert_eq!(output.exit_code, EXIT_RUN_FAILED);
        assert_eq!(output.data["tasks"][1]["state"], "failed");
        assert!(output.text.contains("upstream_failed"));
    }
}
