//! Log files for the gate.
//!
//! Two daily-rolling files are written under the log directory:
//!
//! - `{app_name}.log` carries every `sandbox_gate` trace at the configured level
//! - `{app_name}-events.log` carries only security events, whatever the level
//!
//! `RUST_LOG`, when set and parseable, replaces the configured level for the
//! main file. The events file ignores it so that denials are never filtered
//! out by a quiet `RUST_LOG`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `tracing` target used for security events.
pub const SECURITY_EVENT_TARGET: &str = "sandbox_gate::security_event";

/// Directory name under the XDG data dir.
const LOG_SUBDIR: &str = "sandbox-gate/logs";

/// Keeps both file writers alive for the life of the process.
static GUARDS: OnceLock<LogGuards> = OnceLock::new();

/// File logging settings, the `[logging]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether anything is written at all.
    pub enabled: bool,
    /// Stem of the log file names.
    pub app_name: String,
    /// Overrides `$XDG_DATA_HOME/sandbox-gate/logs`.
    pub log_dir: Option<PathBuf>,
    /// Level for the main file when `RUST_LOG` is unset.
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "sandbox-gate".to_string(),
            log_dir: None,
            level: LogLevel::Info,
        }
    }
}

impl LoggingConfig {
    /// A configuration that writes nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    fn events_file(&self) -> String {
        format!("{}-events.log", self.app_name)
    }

    fn main_file(&self) -> String {
        format!("{}.log", self.app_name)
    }
}

/// Verbosity of the main log file.
///
/// `Trace` records every allowed decision, `Warn` only denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(alias = "trace")]
    Trace,
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warn")]
    Warn,
    #[serde(alias = "error")]
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Where the main file's filter came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    /// `RUST_LOG` was set and parsed.
    Environment(String),
    /// The configured level, scoped to this crate.
    Config(LogLevel),
}

/// Picks the main file's filter: a parseable, non-empty `RUST_LOG` wins,
/// otherwise the configured level applies to `sandbox_gate` targets only.
#[must_use]
pub fn select_filter(rust_log: Option<&str>, level: LogLevel) -> (EnvFilter, FilterSource) {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return (filter, FilterSource::Environment(directives.to_string()));
        }
    }
    let filter = EnvFilter::default()
        .add_directive(LevelFilter::OFF.into())
        .add_directive(
            format!("sandbox_gate={}", LevelFilter::from(level))
                .parse()
                .unwrap_or_else(|_| LevelFilter::from(level).into()),
        );
    (filter, FilterSource::Config(level))
}

/// Filter for the events file: security events at any level, nothing else.
fn events_filter() -> Targets {
    Targets::new().with_target(SECURITY_EVENT_TARGET, LevelFilter::TRACE)
}

/// Writers that flush on drop.
pub struct LogGuards {
    _main: WorkerGuard,
    _events: WorkerGuard,
    dir: PathBuf,
}

impl LogGuards {
    /// Directory the files are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl fmt::Debug for LogGuards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogGuards")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Failure to set up file logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    pub kind: LoggingErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// No `log_dir` configured and no XDG data directory.
    NoLogDir,
    /// The log directory could not be created.
    CreateDir { path: PathBuf, reason: String },
    /// Another global subscriber is already installed.
    SubscriberTaken { reason: String },
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoLogDir => f.write_str(
                "no log directory: set [logging].log_dir or XDG_DATA_HOME",
            ),
            LoggingErrorKind::CreateDir { path, reason } => write!(
                f,
                "cannot create log directory '{}': {reason}; check permissions",
                path.display()
            ),
            LoggingErrorKind::SubscriberTaken { reason } => write!(
                f,
                "cannot install log subscriber: {reason}; disable [logging] when embedding"
            ),
        }
    }
}

impl std::error::Error for LoggingError {}

impl From<LoggingErrorKind> for LoggingError {
    fn from(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }
}

/// Resolves the directory the files go to, without creating it.
///
/// # Errors
///
/// Returns [`LoggingErrorKind::NoLogDir`] when nothing is configured and the
/// platform has no data directory.
pub fn get_log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    match &config.log_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::data_local_dir()
            .map(|dir| dir.join(LOG_SUBDIR))
            .ok_or_else(|| LoggingErrorKind::NoLogDir.into()),
    }
}

/// Installs the global subscriber writing both files.
///
/// Returns `Ok(None)` when logging is disabled.
///
/// # Errors
///
/// Fails if the directory cannot be created or a subscriber is already set.
pub fn init_file_logging(config: &LoggingConfig) -> Result<Option<LogGuards>, LoggingError> {
    if !config.enabled {
        return Ok(None);
    }

    let dir = get_log_dir(config)?;
    std::fs::create_dir_all(&dir).map_err(|e| LoggingErrorKind::CreateDir {
        path: dir.clone(),
        reason: e.to_string(),
    })?;

    let (main_writer, main_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, config.main_file()));
    let (events_writer, events_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&dir, config.events_file()),
    );

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (main_filter, source) = select_filter(rust_log.as_deref(), config.level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(main_writer)
                .with_ansi(false)
                .with_filter(main_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(events_writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(events_filter()),
        )
        .try_init()
        .map_err(|e| LoggingErrorKind::SubscriberTaken {
            reason: e.to_string(),
        })?;

    tracing::debug!(dir = %dir.display(), filter = ?source, "file logging started");

    Ok(Some(LogGuards {
        _main: main_guard,
        _events: events_guard,
        dir,
    }))
}

/// [`init_file_logging`], keeping the guards in a process-wide slot.
///
/// Returns `Ok(false)` when disabled or already initialized.
///
/// # Errors
///
/// Same as [`init_file_logging`].
pub fn init_and_store_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if GUARDS.get().is_some() {
        return Ok(false);
    }
    let Some(guards) = init_file_logging(config)? else {
        return Ok(false);
    };
    // Losing a race leaves the winner's subscriber in place; this guard drops.
    Ok(GUARDS.set(guards).is_ok())
}
