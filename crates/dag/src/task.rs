//! Pipeline tasks and the commands they run.

use crate::settings::DagSettings;
use martflow_task_graph::TaskNodeData;
use serde::Serialize;
use std::fmt;

/// dbt subcommands the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbtCommand {
    /// Check the connection and project configuration
    Debug,
    /// Install package dependencies
    Deps,
    /// Compile models without running them
    Compile,
    /// Run, test, snapshot and seed the selected models
    Build,
}

impl DbtCommand {
    /// Subcommand name as passed to dbt.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Deps => "deps",
            Self::Compile => "compile",
            Self::Build => "build",
        }
    }
}

impl fmt::Display for DbtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a task does when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskAction {
    /// No-op boundary task
    Marker,
    /// A dbt invocation
    Dbt {
        /// Subcommand
        command: DbtCommand,
        /// Node selector passed as `--select`
        #[serde(skip_serializing_if = "Option::is_none")]
        select: Option<String>,
    },
}

/// One node of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineTask {
    /// Unique task id
    pub id: String,
    /// Action performed
    pub action: TaskAction,
    /// Ids of tasks that must succeed first
    pub upstream: Vec<String>,
}

impl PipelineTask {
    /// A no-op marker task.
    #[must_use]
    pub fn marker(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: TaskAction::Marker,
            upstream: Vec::new(),
        }
    }

    /// A dbt task without a selector.
    #[must_use]
    pub fn dbt(id: impl Into<String>, command: DbtCommand) -> Self {
        Self {
            id: id.into(),
            action: TaskAction::Dbt {
                command,
                select: None,
            },
            upstream: Vec::new(),
        }
    }

    /// A `dbt build --select <selector>` task.
    #[must_use]
    pub fn dbt_build(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: TaskAction::Dbt {
                command: DbtCommand::Build,
                select: Some(selector.into()),
            },
            upstream: Vec::new(),
        }
    }

    /// Add upstream dependencies.
    #[must_use]
    pub fn after<I, S>(mut self, upstream: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upstream.extend(upstream.into_iter().map(Into::into));
        self
    }

    /// Whether this task is a no-op marker.
    #[must_use]
    pub const fn is_marker(&self) -> bool {
        matches!(self.action, TaskAction::Marker)
    }

    /// Program and arguments, or `None` for markers.
    ///
    /// The command runs with `settings.project_dir` as working directory, so
    /// the project is always passed as `.`.
    #[must_use]
    pub fn argv(&self, settings: &DagSettings) -> Option<Vec<String>> {
        let TaskAction::Dbt { command, select } = &self.action else {
            return None;
        };

        let mut argv = vec!["dbt".to_string(), command.as_str().to_string()];
        if let Some(select) = select {
            argv.push("--select".to_string());
            argv.push(select.clone());
        }
        argv.extend([
            "--project-dir".to_string(),
            ".".to_string(),
            "--profiles-dir".to_string(),
            settings.profiles_dir.display().to_string(),
        ]);
        Some(argv)
    }

    /// Shell rendering of the command including the directory change.
    #[must_use]
    pub fn shell_command(&self, settings: &DagSettings) -> Option<String> {
        self.argv(settings).map(|argv| {
            format!(
                "cd {} && {}",
                settings.project_dir.display(),
                argv.join(" ")
            )
        })
    }
}

impl TaskNodeData for PipelineTask {
    fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.upstream.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_task_renders_selector() {
        let task = PipelineTask::dbt_build("dbt_build_staging", "staging");
        assert_eq!(
            task.shell_command(&DagSettings::default()).unwrap(),
            "cd /opt/airflow/dbt_project && dbt build --select staging --project-dir . --profiles-dir profiles"
        );
    }

    #[test]
    fn test_plain_command_has_no_selector() {
        let task = PipelineTask::dbt("dbt_deps", DbtCommand::Deps);
        assert_eq!(
            task.argv(&DagSettings::default()).unwrap(),
            vec!["dbt", "deps", "--project-dir", ".", "--profiles-dir", "profiles"]
        );
    }

    #[test]
    fn test_marker_has_no_command() {
        let task = PipelineTask::marker("start");
        assert!(task.is_marker());
        assert!(task.argv(&DagSettings::default()).is_none());
    }

    #[test]
    fn test_after_accumulates_upstream() {
        let task = PipelineTask::marker("end").after(["a", "b"]).after(["c"]);
        let deps: Vec<&str> = task.dependency_names().collect();
        assert_eq!(deps, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_value(PipelineTask::dbt_build("m", "marts.x")).unwrap();
        assert_eq!(json["action"]["kind"], "dbt");
        assert_eq!(json["action"]["command"], "build");
        assert_eq!(json["action"]["select"], "marts.x");
    }
}
