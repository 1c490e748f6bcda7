//! `martflow.toml` configuration.
//!
//! Every key is optional. Missing keys fall back to the built-in model
//! constants and pipeline settings.

use martflow_clv::ClvParams;
use martflow_dag::DagSettings;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "martflow.toml";

/// Errors raised while loading configuration
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {}", path.display())]
    #[diagnostic(code(martflow::config::read))]
    Read {
        /// Config file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected keys
    #[error("Failed to parse config file {}: {source}", path.display())]
    #[diagnostic(
        code(martflow::config::parse),
        help("Keys are camelCase, e.g. observationWindowYears or retryDelaySecs")
    )]
    Parse {
        /// Config file path
        path: PathBuf,
        /// The underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// The values parse but describe an unusable model
    #[error("Invalid configuration in {}: {message}", path.display())]
    #[diagnostic(code(martflow::config::invalid))]
    Invalid {
        /// Config file path
        path: PathBuf,
        /// What is wrong
        message: String,
    },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MartflowConfig {
    /// CLV model parameters
    pub clv: ClvParams,
    /// Pipeline overrides
    pub dag: DagConfig,
}

/// Overrides for [`DagSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DagConfig {
    /// Directory dbt commands run in
    pub project_dir: Option<PathBuf>,
    /// Profiles directory passed to dbt
    pub profiles_dir: Option<PathBuf>,
    /// Extra attempts after a failure
    pub retries: Option<u32>,
    /// Seconds between attempts
    pub retry_delay_secs: Option<u64>,
}

impl DagConfig {
    /// Apply the overrides that are set.
    pub fn apply(&self, settings: &mut DagSettings) {
        if let Some(dir) = &self.project_dir {
            settings.project_dir.clone_from(dir);
        }
        if let Some(dir) = &self.profiles_dir {
            settings.profiles_dir.clone_from(dir);
        }
        if let Some(retries) = self.retries {
            settings.retry.retries = retries;
        }
        if let Some(secs) = self.retry_delay_secs {
            settings.retry.delay = Duration::from_secs(secs);
        }
    }

    /// Pipeline settings with these overrides applied.
    #[must_use]
    pub fn settings(&self) -> DagSettings {
        let mut settings = DagSettings::default();
        self.apply(&mut settings);
        settings
    }
}

impl MartflowConfig {
    /// Parse configuration text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML, has unknown keys, or
    /// holds invalid model parameters.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.clv.validate().map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `martflow.toml` in the
    /// working directory is used if present, and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    tracing::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_toml(&text, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MartflowConfig, ConfigError> {
        MartflowConfig::from_toml(text, Path::new("martflow.toml"))
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(parse("").unwrap(), MartflowConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
[clv]
observationWindowYears = 3.0
profitMarginPct = 25.0

[clv.tiers]
silver = 5000.0

[clv.flags]
frequentOrders = 10

[dag]
projectDir = "/srv/dbt"
retries = 3
retryDelaySecs = 60
"#,
        )
        .unwrap();

        assert_eq!(config.clv.observation_window_years, 3.0);
        assert_eq!(config.clv.tiers.silver, 5_000.0);
        assert_eq!(config.clv.tiers.gold, 50_000.0);
        assert_eq!(config.clv.flags.frequent_orders, 10);

        let settings = config.dag.settings();
        assert_eq!(settings.project_dir, PathBuf::from("/srv/dbt"));
        assert_eq!(settings.profiles_dir, PathBuf::from("profiles"));
        assert_eq!(settings.retry.retries, 3);
        assert_eq!(settings.retry.delay, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse("[dag]\nretry_delay = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_clv_keys_rejected() {
        let err = parse("[clv]\nprofit_margin_pct = 50.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse("[clv.flags]\nhighAOV = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse("[clv.valueCategories]\nlow = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_nan_flag_threshold_rejected() {
        let err = parse("[clv.flags]\nhighAov = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("highAov"));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let err = parse("[clv]\nobservationWindowYears = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("observationWindowYears"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = MartflowConfig::load(Some(Path::new("/nonexistent/martflow.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[clv]\nprofitMarginPct = 30.0\n").unwrap();

        let config = MartflowConfig::load(Some(&path)).unwrap();
        assert_eq!(config.clv.profit_margin_pct, 30.0);
    }
}
