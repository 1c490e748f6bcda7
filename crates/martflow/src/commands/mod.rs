//! Command implementations.
//!
//! Each command returns a [`CommandOutput`]; `main` decides whether to print
//! the text or the JSON envelope.

pub mod clv;
pub mod dag;
pub mod version;

use crate::cli::{EXIT_OK, ErrorEnvelope, OkEnvelope};
use serde_json::{Value, json};

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Human readable output, printed as-is
    pub text: String,
    /// Payload for the `--json` envelope
    pub data: Value,
    /// Process exit code
    pub exit_code: i32,
}

impl CommandOutput {
    /// Output that exits with [`EXIT_OK`].
    #[must_use]
    pub const fn ok(text: String, data: Value) -> Self {
        Self {
            text,
            data,
            exit_code: EXIT_OK,
        }
    }

    /// Override the exit code.
    #[must_use]
    pub const fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// The `--json` envelope for this output.
    ///
    /// A non-zero exit code yields an error envelope with code `run_failed`
    /// whose message is the last line of the text output.
    #[must_use]
    pub fn envelope(&self) -> Value {
        if self.exit_code == EXIT_OK {
            return json!(OkEnvelope::new(&self.data));
        }
        let message = self.text.trim_end().lines().last().unwrap_or_default();
        json!(ErrorEnvelope::new(json!({
            "code": "run_failed",
            "message": message,
            "data": self.data,
        })))
    }
}
