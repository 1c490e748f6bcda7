//! Pipeline-wide settings: identity, schedule metadata, retry policy and the
//! dbt project location.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default dbt project checkout inside the orchestrator image.
pub const DEFAULT_PROJECT_DIR: &str = "/opt/airflow/dbt_project";

/// Default profiles directory, relative to the project.
pub const DEFAULT_PROFILES_DIR: &str = "profiles";

/// How failed tasks are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Pause between attempts.
    #[serde(rename = "delay_secs", serialize_with = "serialize_secs")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Total number of attempts a task gets.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

fn serialize_secs<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(delay.as_secs())
}

/// Cadence the orchestration platform triggers the pipeline at.
///
/// Informational only: this crate runs the pipeline once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day
    Daily,
}

impl Schedule {
    /// Length of one schedule interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        match self {
            Self::Daily => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("@daily"),
        }
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Settings shared by every task of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagSettings {
    /// Pipeline identifier
    pub dag_id: String,
    /// Human readable summary
    pub description: String,
    /// Owning team
    pub owner: String,
    /// First logical date the pipeline is scheduled for
    pub start_date: NaiveDate,
    /// Trigger cadence
    pub schedule: Schedule,
    /// Whether missed intervals are backfilled
    pub catchup: bool,
    /// Whether a task waits for its own previous run
    pub depends_on_past: bool,
    /// Send mail when a task fails
    pub email_on_failure: bool,
    /// Send mail when a task is retried
    pub email_on_retry: bool,
    /// Free-form labels
    pub tags: Vec<String>,
    /// Retry policy applied to every task
    pub retry: RetryPolicy,
    /// Directory dbt commands run in
    pub project_dir: PathBuf,
    /// Profiles directory passed to dbt
    pub profiles_dir: PathBuf,
}

impl Default for DagSettings {
    fn default() -> Self {
        Self {
            dag_id: "dbt_pipeline".to_string(),
            description: "dbt pipeline: staging → intermediate → dimensions → marts".to_string(),
            owner: "gotphoto".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            schedule: Schedule::Daily,
            catchup: false,
            depends_on_past: false,
            email_on_failure: false,
            email_on_retry: false,
            tags: ["dbt", "gotphoto", "data-pipeline"]
                .into_iter()
                .map(String::from)
                .collect(),
            retry: RetryPolicy::default(),
            project_dir: PathBuf::from(DEFAULT_PROJECT_DIR),
            profiles_dir: PathBuf::from(DEFAULT_PROFILES_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_pipeline() {
        let settings = DagSettings::default();
        assert_eq!(settings.dag_id, "dbt_pipeline");
        assert_eq!(settings.owner, "gotphoto");
        assert_eq!(
            settings.start_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(settings.schedule.interval(), Duration::from_secs(86_400));
        assert!(!settings.catchup);
        assert_eq!(settings.retry.retries, 1);
        assert_eq!(settings.retry.delay, Duration::from_secs(300));
        assert_eq!(settings.tags, vec!["dbt", "gotphoto", "data-pipeline"]);
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 2);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
        let huge = RetryPolicy {
            retries: u32::MAX,
            delay: Duration::ZERO,
        };
        assert_eq!(huge.max_attempts(), u32::MAX);
    }

    #[test]
    fn test_settings_serialize() {
        let json = serde_json::to_value(DagSettings::default()).unwrap();
        assert_eq!(json["schedule"], "@daily");
        assert_eq!(json["start_date"], "2024-01-01");
        assert_eq!(json["retry"]["delay_secs"], 300);
        assert_eq!(json["retry"]["retries"], 1);
    }
}
