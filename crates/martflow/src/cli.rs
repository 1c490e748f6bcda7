//! Argument parsing, CLI errors and output envelopes.

use crate::config::ConfigError;
use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use martflow_clv::{DataFormat, SqlDialect};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// A pipeline run finished with failed tasks
pub const EXIT_RUN_FAILED: i32 = 1;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Model evaluation or execution error exit code
pub const EXIT_EVAL: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(martflow::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Model evaluation or pipeline error (exit code 3)
    #[error("Evaluation error: {message}")]
    #[diagnostic(code(martflow::cli::eval))]
    Eval {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(martflow::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new evaluation error
    #[must_use]
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

fn help_of(diagnostic: &dyn Diagnostic) -> Option<String> {
    diagnostic.help().map(|h| h.to_string())
}

/// Maps model errors to CLI categories:
/// - bad parameters or unrecognised formats -> Config (exit code 2)
/// - unreadable input rows -> Eval (exit code 3)
/// - I/O and encoding failures -> Other (exit code 3)
impl From<martflow_clv::Error> for CliError {
    fn from(err: martflow_clv::Error) -> Self {
        let help = help_of(&err);
        let message = err.to_string();
        let message = match &err {
            martflow_clv::Error::Parse { source, .. } => format!("{message}: {source}"),
            martflow_clv::Error::Io { source, .. } => format!("{message}: {source}"),
            _ => message,
        };
        match err {
            martflow_clv::Error::Configuration { .. } | martflow_clv::Error::UnknownFormat { .. } => {
                Self::Config { message, help }
            }
            martflow_clv::Error::Parse { .. } => Self::Eval { message, help },
            martflow_clv::Error::Io { .. } | martflow_clv::Error::Serialization { .. } => {
                Self::Other { message, help }
            }
        }
    }
}

impl From<martflow_dag::Error> for CliError {
    fn from(err: martflow_dag::Error) -> Self {
        let help = help_of(&err);
        let message = err.to_string();
        match err {
            martflow_dag::Error::Configuration { .. } | martflow_dag::Error::UnknownTask { .. } => {
                Self::Config { message, help }
            }
            martflow_dag::Error::Graph { .. } => Self::Eval { message, help },
            martflow_dag::Error::Spawn { .. } => Self::Other { message, help },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let help = help_of(&err);
        Self::Config {
            message: err.to_string(),
            help,
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Eval { .. } | CliError::Other { .. } => EXIT_EVAL,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Eval { .. } => "eval",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Output format for version information
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON object
    Json,
}

/// Customer lifetime value metrics and the dbt layer pipeline.
#[derive(Parser, Debug)]
#[command(name = "martflow")]
#[command(about = "Customer lifetime value metrics and the dbt layer pipeline")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log record format on stderr.
    #[arg(long, global = true, value_enum, default_value = "compact")]
    pub log_format: TracingFormat,

    /// Emit JSON envelope instead of text.
    #[arg(long, global = true, help = "Emit JSON envelope instead of text")]
    pub json: bool,

    /// Configuration file (defaults to ./martflow.toml when present).
    #[arg(long, short = 'c', global = true, env = "MARTFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Customer lifetime value model.
    #[command(about = "Customer lifetime value model")]
    Clv {
        /// CLV subcommand to execute.
        #[command(subcommand)]
        subcommand: ClvCommands,
    },
    /// dbt layer pipeline.
    #[command(about = "dbt layer pipeline")]
    Dag {
        /// Pipeline subcommand to execute.
        #[command(subcommand)]
        subcommand: DagCommands,
    },
    /// Show version information.
    #[command(about = "Show version information")]
    Version {
        /// Output format for version information.
        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output_format: OutputFormat,
    },
}

/// CLV subcommands.
#[derive(Subcommand, Debug)]
pub enum ClvCommands {
    /// Aggregate order facts into one metrics row per customer.
    #[command(about = "Aggregate order facts into customer metrics")]
    Run {
        /// Order facts file (.json array or .jsonl lines).
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Write metrics here instead of stdout.
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
        /// Input encoding, when the extension is not enough.
        #[arg(long, value_name = "FORMAT")]
        input_format: Option<DataFormat>,
        /// Output encoding; stdout defaults to JSON Lines.
        #[arg(long, value_name = "FORMAT")]
        output_format: Option<DataFormat>,
    },
    /// Render the model as one SQL statement for warehouse pushdown.
    #[command(about = "Render the CLV model as SQL")]
    Sql {
        /// Order fact table, optionally schema-qualified.
        #[arg(long, default_value = "fact_customer_orders")]
        table: String,
        /// Target SQL dialect (postgres, mysql, sqlite).
        #[arg(long, default_value = "postgres")]
        dialect: SqlDialect,
    },
}

/// Pipeline subcommands.
#[derive(Subcommand, Debug)]
pub enum DagCommands {
    /// Print settings, tasks and parallel levels.
    #[command(about = "Show the pipeline")]
    Show,
    /// Check the pipeline structure.
    #[command(about = "Validate the pipeline")]
    Validate,
    /// Run every task once, in dependency order.
    #[command(about = "Run the pipeline once")]
    Run {
        /// Log the commands instead of running them.
        #[arg(long)]
        dry_run: bool,
        /// dbt executable to invoke.
        #[arg(long, default_value = "dbt", env = "MARTFLOW_DBT")]
        dbt_bin: String,
        /// Override the dbt project directory.
        #[arg(long, value_name = "DIR")]
        project_dir: Option<PathBuf>,
        /// Override the dbt profiles directory.
        #[arg(long, value_name = "DIR")]
        profiles_dir: Option<PathBuf>,
        /// Override the number of retries per task.
        #[arg(long)]
        retries: Option<u32>,
        /// Override the delay between attempts, in seconds.
        #[arg(long, value_name = "SECS")]
        retry_delay_secs: Option<u64>,
    },
}

/// Parse command line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_clv_run() {
        let cli = Cli::try_parse_from([
            "martflow",
            "clv",
            "run",
            "orders.jsonl",
            "-o",
            "clv.json",
            "--input-format",
            "ndjson",
        ])
        .unwrap();

        match cli.command {
            Commands::Clv {
                subcommand:
                    ClvCommands::Run {
                        input,
                        output,
                        input_format,
                        output_format,
                    },
            } => {
                assert_eq!(input, PathBuf::from("orders.jsonl"));
                assert_eq!(output, Some(PathBuf::from("clv.json")));
                assert_eq!(input_format, Some(DataFormat::JsonLines));
                assert_eq!(output_format, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["martflow", "dag", "show", "--json", "-L", "debug"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.level, LogLevel::Debug);
    }

    #[test]
    fn test_bad_dialect_rejected() {
        assert!(Cli::try_parse_from(["martflow", "clv", "sql", "--dialect", "oracle"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CliError::config_with_help("x", "y")), EXIT_CLI);
        assert_eq!(exit_code_for(&CliError::eval("x")), EXIT_EVAL);
        assert_eq!(exit_code_for(&CliError::other("x")), EXIT_EVAL);
    }

    #[test]
    fn test_clv_error_mapping() {
        let err: CliError = martflow_clv::Error::configuration("bad window").into();
        assert!(matches!(err, CliError::Config { .. }));

        let err: CliError = martflow_clv::Error::io_no_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "read",
        )
        .into();
        assert!(matches!(err, CliError::Other { ref message, .. } if message.contains("gone")));
    }
}
