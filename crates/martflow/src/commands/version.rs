//! `martflow version`.

use super::CommandOutput;
use crate::cli::OutputFormat;
use serde_json::json;
use tracing::instrument;

/// Version and build information.
#[instrument]
#[must_use]
pub fn get_version_info(format: OutputFormat) -> CommandOutput {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let description = env!("CARGO_PKG_DESCRIPTION");
    let correlation_id = crate::tracing::correlation_id();

    tracing::debug!(
        package_name = name,
        package_version = version,
        "Gathering package information"
    );

    let data = json!({
        "name": name,
        "version": version,
        "description": description,
        "correlation_id": correlation_id.to_string(),
    });

    let text = match format {
        OutputFormat::Text => format!(
            "{name} {version} - {description}\n\
             Correlation ID: {correlation_id}"
        ),
        OutputFormat::Json => data.to_string(),
    };

    CommandOutput::ok(text, data)
}
