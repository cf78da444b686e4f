//! Configuration types for the sandbox gate.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::security::PathOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default DNS lookup bound in milliseconds.
pub const DEFAULT_DNS_TIMEOUT_MS: u64 = 5_000;

/// Root configuration structure for the sandbox gate.
///
/// This structure maps directly to the TOML configuration file format:
///
/// ```toml
/// allowed_paths = ["/srv/shared", "/opt/datasets"]
/// dns_timeout_ms = 2000
///
/// [logging]
/// enabled = true
/// level = "Warn"
/// ```
///
/// Every field is optional; an empty file yields [`GateConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Extra directories tool calls may touch, beyond the working directory.
    pub allowed_paths: Vec<PathBuf>,

    /// Bound on one DNS lookup during host validation.
    pub dns_timeout_ms: u64,

    /// File logging settings.
    pub logging: LoggingConfig,
}

impl GateConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an allowed directory.
    #[must_use]
    pub fn with_allowed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowed_paths.push(path.into());
        self
    }

    /// Sets the DNS lookup bound.
    #[must_use]
    pub fn with_dns_timeout_ms(mut self, millis: u64) -> Self {
        self.dns_timeout_ms = millis;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// The DNS lookup bound as a [`Duration`].
    #[must_use]
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    /// Path options for a session rooted at `cwd`.
    #[must_use]
    pub fn path_options(&self, cwd: impl Into<PathBuf>) -> PathOptions {
        self.allowed_paths
            .iter()
            .cloned()
            .fold(PathOptions::new(cwd), PathOptions::with_allowed_path)
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero DNS timeout or a relative allowed path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "dns_timeout_ms",
                "must be greater than zero",
            ));
        }

        if let Some(relative) = self.allowed_paths.iter().find(|p| !p.is_absolute()) {
            return Err(ConfigError::invalid_value(
                "allowed_paths",
                format!("'{}' is not an absolute path", relative.display()),
            ));
        }

        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            allowed_paths: Vec::new(),
            dns_timeout_ms: DEFAULT_DNS_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn gate_config_default_values() {
        let config = GateConfig::default();
        assert!(config.allowed_paths.is_empty());
        assert_eq!(config.dns_timeout(), Duration::from_secs(5));
        assert!(config.logging.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn gate_config_builder() {
        let config = GateConfig::new()
            .with_allowed_path("/srv/shared")
            .with_dns_timeout_ms(250)
            .with_logging(LoggingConfig::disabled());

        assert_eq!(config.allowed_paths, vec![PathBuf::from("/srv/shared")]);
        assert_eq!(config.dns_timeout(), Duration::from_millis(250));
        assert!(!config.logging.enabled);
    }

    #[test]
    fn path_options_carry_allowed_paths() {
        let options = GateConfig::new()
            .with_allowed_path("/srv/a")
            .with_allowed_path("/srv/b")
            .path_options("/work");

        assert_eq!(options.cwd, PathBuf::from("/work"));
        assert_eq!(
            options.allowed_paths,
            vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let err = GateConfig::new().with_dns_timeout_ms(0).validate().unwrap_err();
        assert!(err.to_string().contains("dns_timeout_ms"));
    }

    #[test]
    fn validate_rejects_relative_allowed_path() {
        let err = GateConfig::new()
            .with_allowed_path("shared")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("'shared' is not an absolute path"));
    }

    #[test]
    fn gate_config_toml_roundtrip() {
        let config = GateConfig::new()
            .with_allowed_path("/srv/shared")
            .with_logging(LoggingConfig::default().with_level(LogLevel::Warn));

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GateConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
