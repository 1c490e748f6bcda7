//! Error types for the CLV crate

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for CLV operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error while reading order facts or writing metrics
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(martflow::clv::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write")
        operation: String,
    },

    /// An input row could not be decoded
    #[error("Failed to parse order facts{}{}", path.as_ref().map_or(String::new(), |p| format!(" in {}", p.display())), line.map_or(String::new(), |l| format!(" at line {l}")))]
    #[diagnostic(
        code(martflow::clv::parse),
        help("Each row needs customer_key, order_key and total_net_revenue columns")
    )]
    Parse {
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
        /// File being read, if any
        path: Option<Box<Path>>,
        /// 1-based line number for JSON Lines input
        line: Option<usize>,
    },

    /// Metrics could not be encoded
    #[error("Serialization error: {message}")]
    #[diagnostic(code(martflow::clv::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },

    /// Invalid model parameters
    #[error("Invalid CLV parameters: {message}")]
    #[diagnostic(code(martflow::clv::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// The data format could not be inferred from a file name
    #[error("Cannot infer data format from {}", path.display())]
    #[diagnostic(
        code(martflow::clv::unknown_format),
        help("Use a .json, .jsonl or .ndjson extension, or pass the format explicitly")
    )]
    UnknownFormat {
        /// The path whose extension was not recognised
        path: Box<Path>,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for CLV operations
pub type Result<T> = std::result::Result<T, Error>;
