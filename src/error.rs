//! Error types for the sandbox gate.
//!
//! Each error type implements Display, Debug, Clone, PartialEq, Eq, and std::error::Error.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use crate::security::{CommandViolation, HostDenial, PathDenial};
use crate::types::SessionId;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Configuration Error
// =============================================================================

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The specific error that occurred
    pub kind: ConfigErrorKind,
}

/// Specific configuration error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The config file exists but could not be read
    ReadFailed {
        /// The file that could not be read
        path: PathBuf,
        /// Why it could not be read
        reason: String,
    },
    /// The config content is not valid TOML for the schema
    ParseFailed {
        /// The file being parsed, if any
        path: Option<PathBuf>,
        /// The parser's message
        reason: String,
    },
    /// A field parsed but holds an unusable value
    InvalidValue {
        /// Name of the offending field
        field: String,
        /// Why it was invalid
        reason: String,
    },
}

impl ConfigError {
    /// Creates a new ConfigError with the given kind.
    #[must_use]
    pub fn new(kind: ConfigErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a read failed error.
    #[must_use]
    pub fn read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::ReadFailed {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Creates a parse failed error.
    #[must_use]
    pub fn parse_failed(path: Option<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::ParseFailed {
            path,
            reason: reason.into(),
        })
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Attaches the file path to a parse error that came from a string.
    #[must_use]
    pub(crate) fn in_file(mut self, file: &std::path::Path) -> Self {
        if let ConfigErrorKind::ParseFailed { ref mut path, .. } = self.kind {
            path.get_or_insert_with(|| file.to_path_buf());
        }
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigErrorKind::ReadFailed { path, reason } => {
                write!(
                    f,
                    "failed to read config file '{}': {}; check that it exists and is readable",
                    path.display(),
                    reason
                )
            }
            ConfigErrorKind::ParseFailed {
                path: Some(path),
                reason,
            } => {
                write!(f, "failed to parse '{}': {}", path.display(), reason)
            }
            ConfigErrorKind::ParseFailed { path: None, reason } => {
                write!(f, "invalid TOML: {}", reason)
            }
            ConfigErrorKind::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// Gate Error
// =============================================================================

/// A tool call refused by the [`SandboxGate`](crate::gate::SandboxGate).
///
/// This type uses `Box<GateErrorKind>` to keep the error size small, since
/// path denials carry several paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateError {
    /// Session the refused call belonged to
    pub session_id: Option<SessionId>,
    /// Name of the tool that made the call
    tool: String,
    /// The specific denial (boxed for size efficiency)
    kind: Box<GateErrorKind>,
}

/// Which validator refused the call, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateErrorKind {
    /// The path validator refused a filesystem access
    Path(PathDenial),
    /// The command validator refused a shell command
    Command {
        /// The command as submitted
        command: String,
        /// The pattern it matched
        violation: CommandViolation,
    },
    /// The network validator refused a host
    Host {
        /// The host as submitted
        host: String,
        /// Why it was blocked
        denial: HostDenial,
    },
    /// The network validator refused a fetch URL
    Url {
        /// The URL as submitted
        url: String,
        /// Why it was blocked
        denial: HostDenial,
    },
}

impl GateError {
    /// Creates a new GateError for `tool`.
    #[must_use]
    pub fn new(tool: impl Into<String>, kind: GateErrorKind) -> Self {
        Self {
            session_id: None,
            tool: tool.into(),
            kind: Box::new(kind),
        }
    }

    /// Creates a path denial error.
    #[must_use]
    pub fn path(tool: impl Into<String>, denial: PathDenial) -> Self {
        Self::new(tool, GateErrorKind::Path(denial))
    }

    /// Creates a command denial error.
    #[must_use]
    pub fn command(
        tool: impl Into<String>,
        command: impl Into<String>,
        violation: CommandViolation,
    ) -> Self {
        Self::new(
            tool,
            GateErrorKind::Command {
                command: command.into(),
                violation,
            },
        )
    }

    /// Creates a host denial error.
    #[must_use]
    pub fn host(tool: impl Into<String>, host: impl Into<String>, denial: HostDenial) -> Self {
        Self::new(
            tool,
            GateErrorKind::Host {
                host: host.into(),
                denial,
            },
        )
    }

    /// Creates a URL denial error.
    #[must_use]
    pub fn url(tool: impl Into<String>, url: impl Into<String>, denial: HostDenial) -> Self {
        Self::new(
            tool,
            GateErrorKind::Url {
                url: url.into(),
                denial,
            },
        )
    }

    /// The network denial, for host and URL errors.
    #[must_use]
    pub fn host_denial(&self) -> Option<&HostDenial> {
        match self.kind.as_ref() {
            GateErrorKind::Host { denial, .. } | GateErrorKind::Url { denial, .. } => Some(denial),
            GateErrorKind::Path(_) | GateErrorKind::Command { .. } => None,
        }
    }

    /// Tags the error with the session it occurred in.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &GateErrorKind {
        &self.kind
    }

    /// Name of the tool whose call was refused.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// The refused input: a path, a command, or a host/URL.
    #[must_use]
    pub fn input(&self) -> String {
        match self.kind.as_ref() {
            GateErrorKind::Path(denial) => denial.path().display().to_string(),
            GateErrorKind::Command { command, .. } => command.clone(),
            GateErrorKind::Host { host, .. } => host.clone(),
            GateErrorKind::Url { url, .. } => url.clone(),
        }
    }

    /// Human-readable reason, without the tool prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self.kind.as_ref() {
            GateErrorKind::Path(denial) => denial.to_string(),
            GateErrorKind::Command { violation, .. } => violation.to_string(),
            GateErrorKind::Host { denial, .. } | GateErrorKind::Url { denial, .. } => {
                denial.to_string()
            }
        }
    }

    /// Returns true if repeating the same call could succeed.
    ///
    /// Only DNS failures and timeouts qualify; everything else is a property
    /// of the input itself.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        self.host_denial()
            .is_some_and(HostDenial::is_resolution_failure)
    }

    /// Returns true if this is a path denial.
    #[must_use]
    pub fn is_path_denied(&self) -> bool {
        matches!(self.kind.as_ref(), GateErrorKind::Path(_))
    }

    /// Returns true if this is a command denial.
    #[must_use]
    pub fn is_command_denied(&self) -> bool {
        matches!(self.kind.as_ref(), GateErrorKind::Command { .. })
    }

    /// Returns true if this is a host or URL denial.
    #[must_use]
    pub fn is_host_denied(&self) -> bool {
        self.host_denial().is_some()
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool '{}' blocked: {}", self.tool, self.reason())
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind.as_ref() {
            GateErrorKind::Path(denial) => Some(denial),
            GateErrorKind::Command { violation, .. } => Some(violation),
            GateErrorKind::Host { denial, .. } | GateErrorKind::Url { denial, .. } => Some(denial),
        }
    }
}
