//! Finding and reading `sandbox-gate` TOML files.

use crate::config::types::GateConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_NAME: &str = "sandbox-gate.toml";
const XDG_CONFIG_NAME: &str = "config.toml";
const APP_NAME: &str = "sandbox-gate";

/// Reads the first config file found by [`search_paths`], or returns the
/// defaults when none exists.
///
/// # Errors
///
/// Fails when the file that was found cannot be used; a broken project
/// file never falls through to the user-wide one.
pub fn load() -> Result<GateConfig, ConfigError> {
    let Some(path) = search_paths().into_iter().find(|p| p.is_file()) else {
        tracing::debug!("no configuration file found, using defaults");
        return Ok(GateConfig::default());
    };
    from_path(&path)
}

/// Reads one config file.
///
/// # Errors
///
/// Read and parse failures name `path`; invalid values name the field.
pub fn from_path(path: &Path) -> Result<GateConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::read_failed(path, e.to_string()))?;
    let config = from_str(&contents).map_err(|e| e.in_file(path))?;

    tracing::debug!(
        path = %path.display(),
        allowed_paths = config.allowed_paths.len(),
        dns_timeout_ms = config.dns_timeout_ms,
        "loaded configuration"
    );
    Ok(config)
}

/// Parses config text and checks its values.
///
/// ```rust,ignore
/// let config = sandbox_gate::config::from_str("dns_timeout_ms = 800")?;
/// ```
///
/// # Errors
///
/// Fails on bad TOML, unknown keys, or values [`GateConfig::validate`]
/// rejects.
pub fn from_str(toml_str: &str) -> Result<GateConfig, ConfigError> {
    let config = toml::from_str::<GateConfig>(toml_str)
        .map_err(|e| ConfigError::parse_failed(None, e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Candidate config files, most specific first: `./sandbox-gate.toml`,
/// then `config.toml` under [`xdg_config_dir`].
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    std::iter::once(PathBuf::from(LOCAL_CONFIG_NAME))
        .chain(xdg_config_dir().map(|dir| dir.join(XDG_CONFIG_NAME)))
        .collect()
}

/// `sandbox-gate` under the platform config directory, if there is one.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigErrorKind;
    use crate::logging::LogLevel;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
allowed_paths = ["/srv/shared", "/opt/data"]
dns_timeout_ms = 1500

[logging]
enabled = false
level = "debug"
"#;

    #[test]
    fn sample_config_parses() {
        let config = from_str(SAMPLE).unwrap();

        assert_eq!(
            config.allowed_paths,
            vec![PathBuf::from("/srv/shared"), PathBuf::from("/opt/data")]
        );
        assert_eq!(config.dns_timeout(), Duration::from_millis(1500));
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn blank_text_gives_defaults() {
        assert_eq!(from_str("").unwrap(), GateConfig::default());
        assert_eq!(from_str("# nothing set\n").unwrap(), GateConfig::default());
    }

    #[test]
    fn syntax_and_schema_errors_are_parse_failures() {
        for text in ["allowed_paths = [", "allowed_path = [\"/srv\"]", "dns_timeout_ms = \"soon\""] {
            let err = from_str(text).unwrap_err();
            assert!(
                matches!(err.kind, ConfigErrorKind::ParseFailed { path: None, .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn unusable_values_are_rejected_after_parsing() {
        let err = from_str("allowed_paths = [\"relative/dir\"]").unwrap_err();
        assert!(
            matches!(&err.kind, ConfigErrorKind::InvalidValue { field, .. } if field == "allowed_paths"),
            "{err}"
        );
    }

    #[test]
    fn file_on_disk_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_NAME);
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(from_path(&path).unwrap(), from_str(SAMPLE).unwrap());
    }

    #[test]
    fn errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "dns_timeout_ms = \"soon\"").unwrap();

        let invalid = from_path(&broken).unwrap_err();
        assert!(invalid.to_string().contains("broken.toml"), "{invalid}");

        let missing = from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing.kind, ConfigErrorKind::ReadFailed { .. }));
        assert!(missing.to_string().contains("absent.toml"));
    }

    #[test]
    fn project_file_is_searched_first() {
        let paths = search_paths();
        assert_eq!(paths[0], Path::new(LOCAL_CONFIG_NAME));
        if let Some(dir) = xdg_config_dir() {
            assert_eq!(paths.last(), Some(&dir.join(XDG_CONFIG_NAME)));
        }
    }
}
