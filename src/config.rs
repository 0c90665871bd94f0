//! Run configuration loaded from YAML and merged with command-line overrides.

use std::net::SocketAddr;
use std::time::Duration;
use std::{fs, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address of the remote write receiver.
pub const DEFAULT_RECEIVER_LISTEN: &str = "127.0.0.1:19095";
/// Default address of the scrape target.
pub const DEFAULT_EXPOSITION_LISTEN: &str = "127.0.0.1:19096";
/// Default length of the window during which a sender runs against one case.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15);
/// Default relative tolerance for time-varying values.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading the configuration file.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parsing error.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A setting has an invalid value.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings as written in a configuration file or given on the command line.
///
/// Every field is optional so file values and flags can be layered.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Address the remote write receiver listens on.
    pub receiver_listen: Option<String>,
    /// Address the scrape target listens on.
    pub exposition_listen: Option<String>,
    /// Window per case, e.g. `15s`.
    pub window: Option<String>,
    /// Relative tolerance for time-varying values.
    pub tolerance: Option<f64>,
    /// Regex selecting case names.
    pub cases: Option<String>,
}

/// Validated settings of one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub receiver_addr: SocketAddr,
    pub exposition_addr: SocketAddr,
    pub window: Duration,
    pub tolerance: f64,
    pub cases: Option<Regex>,
}

impl RunConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Parameters
    ///
    /// - `path` - Path to the YAML configuration file
    ///
    /// # Returns
    ///
    /// Returns `Ok(RunConfig)` on success, or `ConfigError` if the file cannot be read or parsed.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let txt = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&txt)?)
    }

    /// Layer `overrides` on top of `self`; set fields of `overrides` win.
    pub fn merge(self, overrides: RunConfig) -> RunConfig {
        RunConfig {
            receiver_listen: overrides.receiver_listen.or(self.receiver_listen),
            exposition_listen: overrides.exposition_listen.or(self.exposition_listen),
            window: overrides.window.or(self.window),
            tolerance: overrides.tolerance.or(self.tolerance),
            cases: overrides.cases.or(self.cases),
        }
    }

    /// Apply defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for unparsable addresses, a zero or unparsable
    /// window, a negative or non-finite tolerance, or an invalid case regex.
    pub fn into_settings(self) -> Result<RunSettings, ConfigError> {
        let receiver_addr = parse_addr(
            "receiver_listen",
            self.receiver_listen.as_deref().unwrap_or(DEFAULT_RECEIVER_LISTEN),
        )?;
        let exposition_addr = parse_addr(
            "exposition_listen",
            self.exposition_listen.as_deref().unwrap_or(DEFAULT_EXPOSITION_LISTEN),
        )?;

        let window = match self.window.as_deref() {
            Some(s) => humantime::parse_duration(s)
                .map_err(|e| ConfigError::Invalid { field: "window", reason: e.to_string() })?,
            None => DEFAULT_WINDOW,
        };
        if window.is_zero() {
            return Err(ConfigError::Invalid { field: "window", reason: "must be non-zero".into() });
        }

        let tolerance = self.tolerance.unwrap_or(DEFAULT_TOLERANCE);
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "tolerance",
                reason: format!("must be a finite number >= 0, got {tolerance}"),
            });
        }

        let cases = self
            .cases
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::Invalid { field: "cases", reason: e.to_string() })?;

        Ok(RunSettings { receiver_addr, exposition_addr, window, tolerance, cases })
    }
}

fn parse_addr(field: &'static str, s: &str) -> Result<SocketAddr, ConfigError> {
    s.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        field,
        reason: format!("{s:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    /// Test that an empty configuration resolves to the defaults.
    #[test]
    fn test_defaults() {
        let settings = RunConfig::default().into_settings().expect("defaults are valid");
        assert_eq!(settings.receiver_addr.to_string(), DEFAULT_RECEIVER_LISTEN);
        assert_eq!(settings.exposition_addr.to_string(), DEFAULT_EXPOSITION_LISTEN);
        assert_eq!(settings.window, DEFAULT_WINDOW);
        assert_eq!(settings.tolerance, DEFAULT_TOLERANCE);
        assert!(settings.cases.is_none());
    }

    /// Test loading configuration from a YAML file.
    #[test]
    fn test_load_from_path() {
        let yaml = r#"
receiver_listen: "0.0.0.0:9201"
window: 30s
tolerance: 0.001
cases: "^(up|invalid)$"
"#;
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(yaml.as_bytes()).expect("write yaml");

        let config = RunConfig::load_from_path(file.path()).expect("valid config");
        assert_eq!(config.exposition_listen, None);

        let settings = config.into_settings().expect("valid settings");
        assert_eq!(settings.receiver_addr.port(), 9201);
        assert_eq!(settings.window, Duration::from_secs(30));
        assert_eq!(settings.tolerance, 0.001);
        assert!(settings.cases.expect("regex").is_match("invalid"));
    }

    /// Test that unknown keys are rejected.
    #[test]
    fn test_unknown_key_rejected() {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(b"windw: 10s\n").expect("write yaml");
        assert!(matches!(RunConfig::load_from_path(file.path()), Err(ConfigError::Yaml(_))));
    }

    /// Test that a missing file is an I/O error.
    #[test]
    fn test_missing_file() {
        let result = RunConfig::load_from_path("/nonexistent/rw-compliance.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    /// Test that overrides win over file values.
    #[test]
    fn test_merge() {
        let file = RunConfig {
            window: Some("30s".into()),
            tolerance: Some(0.5),
            ..RunConfig::default()
        };
        let flags = RunConfig { tolerance: Some(0.1), ..RunConfig::default() };

        let merged = file.merge(flags);
        assert_eq!(merged.window.as_deref(), Some("30s"));
        assert_eq!(merged.tolerance, Some(0.1));
    }

    /// Test validation failures.
    #[test]
    fn test_invalid_settings() {
        let cases = [
            RunConfig { window: Some("0s".into()), ..RunConfig::default() },
            RunConfig { window: Some("soon".into()), ..RunConfig::default() },
            RunConfig { tolerance: Some(-1.0), ..RunConfig::default() },
            RunConfig { tolerance: Some(f64::NAN), ..RunConfig::default() },
            RunConfig { receiver_listen: Some("localhost".into()), ..RunConfig::default() },
            RunConfig { cases: Some("(".into()), ..RunConfig::default() },
        ];
        for config in cases {
            assert!(matches!(config.into_settings(), Err(ConfigError::Invalid { .. })));
        }
    }
}
