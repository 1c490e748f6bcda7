//! Structured task lifecycle events.
//!
//! Every macro wraps `tracing::info!` (or `warn!`) with
//! `target: "martflow::task"` and an `event_type` field, so a subscriber can
//! select task events with a `martflow::task=info` filter directive and a JSON
//! formatter yields one machine-readable record per transition.

/// Emit a task started event.
///
/// # Example
/// ```rust,ignore
/// emit_task_started!("dbt_deps", "dbt deps --project-dir .", 1);
/// ```
#[macro_export]
macro_rules! emit_task_started {
    ($name:expr, $command:expr, $attempt:expr) => {
        ::tracing::info!(
            target: "martflow::task",
            event_type = "task.started",
            task_name = %$name,
            command = %$command,
            attempt = $attempt,
        )
    };
}

/// Emit a task retry event, before the retry delay starts.
#[macro_export]
macro_rules! emit_task_retrying {
    ($name:expr, $attempt:expr, $max_attempts:expr, $delay_secs:expr, $error:expr) => {
        ::tracing::warn!(
            target: "martflow::task",
            event_type = "task.retrying",
            task_name = %$name,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_secs = $delay_secs,
            error = %$error,
        )
    };
}

/// Emit a task completed event.
///
/// # Example
/// ```rust,ignore
/// emit_task_completed!("dbt_build_staging", 2, 1234);
/// ```
#[macro_export]
macro_rules! emit_task_completed {
    ($name:expr, $attempts:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "martflow::task",
            event_type = "task.completed",
            task_name = %$name,
            attempts = $attempts,
            duration_ms = $duration_ms,
        )
    };
}

/// Emit a task failed event once all attempts are used up.
#[macro_export]
macro_rules! emit_task_failed {
    ($name:expr, $attempts:expr, $exit_code:expr, $error:expr) => {
        ::tracing::warn!(
            target: "martflow::task",
            event_type = "task.failed",
            task_name = %$name,
            attempts = $attempts,
            exit_code = ?$exit_code,
            error = %$error,
        )
    };
}

/// Emit an event for a task skipped because an upstream did not succeed.
#[macro_export]
macro_rules! emit_task_upstream_failed {
    ($name:expr, $upstream:expr) => {
        ::tracing::warn!(
            target: "martflow::task",
            event_type = "task.upstream_failed",
            task_name = %$name,
            upstream = ?$upstream,
        )
    };
}
