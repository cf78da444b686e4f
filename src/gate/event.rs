//! Security events raised when the gate refuses a tool call.

use crate::error::{GateError, GateErrorKind};
use crate::logging::SECURITY_EVENT_TARGET;
use crate::security::HostDenial;
use crate::types::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Which validator produced the denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    /// A filesystem access was refused.
    PathDenied,
    /// A shell command was refused.
    CommandDenied,
    /// A host or fetch URL was refused.
    HostDenied,
}

impl SecurityEventType {
    /// Stable name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathDenied => "path_denied",
            Self::CommandDenied => "command_denied",
            Self::HostDenied => "host_denied",
        }
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a denial is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Policy boundary hit (outside allowed roots, eval, unresolvable host).
    Medium,
    /// Credential access, destructive command, or private network target.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// What was refused.
///
/// Exactly one of `path`, `command`, `host` or `url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEventDetails {
    /// The tool that made the call.
    pub tool: String,
    /// The requested path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The submitted command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// The requested host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// The requested URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Why the call was refused.
    pub reason: String,
}

/// One refused tool call.
///
/// Serializes to the JSON shape consumed by audit tooling:
///
/// ```json
/// {
///   "event_type": "path_denied",
///   "severity": "high",
///   "details": { "tool": "read_file", "path": "~/.ssh/id_rsa", "reason": "..." },
///   "session_id": "sess_01h455vb4pex5vsknk084sn02q",
///   "timestamp": "2026-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Which validator refused the call.
    pub event_type: SecurityEventType,
    /// How serious the attempt was.
    pub severity: Severity,
    /// What was refused and why.
    pub details: SecurityEventDetails,
    /// The session the call belonged to.
    pub session_id: SessionId,
    /// When the call was refused.
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// Builds the event describing `error` in `session_id`.
    #[must_use]
    pub fn from_error(error: &GateError, session_id: SessionId) -> Self {
        let mut details = SecurityEventDetails {
            tool: error.tool().to_string(),
            path: None,
            command: None,
            host: None,
            url: None,
            reason: error.reason(),
        };

        let (event_type, severity) = match error.kind() {
            GateErrorKind::Path(denial) => {
                details.path = Some(denial.path().display().to_string());
                let severity = if denial.is_protected() {
                    Severity::High
                } else {
                    Severity::Medium
                };
                (SecurityEventType::PathDenied, severity)
            }
            GateErrorKind::Command { command, violation } => {
                details.command = Some(command.clone());
                let severity = if violation.is_destructive() {
                    Severity::High
                } else {
                    Severity::Medium
                };
                (SecurityEventType::CommandDenied, severity)
            }
            GateErrorKind::Host { host, denial } => {
                details.host = Some(host.clone());
                (SecurityEventType::HostDenied, host_severity(denial))
            }
            GateErrorKind::Url { url, denial } => {
                details.url = Some(url.clone());
                (SecurityEventType::HostDenied, host_severity(denial))
            }
        };

        Self {
            event_type,
            severity,
            details,
            session_id,
            timestamp: Utc::now(),
        }
    }

    /// The refused input, whichever kind it was.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.details
            .path
            .as_deref()
            .or(self.details.command.as_deref())
            .or(self.details.host.as_deref())
            .or(self.details.url.as_deref())
            .unwrap_or_default()
    }
}

fn host_severity(denial: &HostDenial) -> Severity {
    match denial {
        HostDenial::PrivateName { .. }
        | HostDenial::PrivateAddress { .. }
        | HostDenial::ResolvesToPrivate { .. } => Severity::High,
        _ => Severity::Medium,
    }
}

/// Destination for security events.
///
/// The gate records exactly one event per denial.
pub trait SecurityEventSink: Send + Sync + fmt::Debug {
    /// Records `event`.
    fn record(&self, event: &SecurityEvent);
}

/// Sink that emits each event as a `tracing` warning on
/// [`SECURITY_EVENT_TARGET`], which the file logger routes to its events file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SecurityEventSink for TracingSink {
    fn record(&self, event: &SecurityEvent) {
        tracing::warn!(
            target: SECURITY_EVENT_TARGET,
            event_type = %event.event_type,
            severity = %event.severity,
            tool = %event.details.tool,
            subject = %event.subject(),
            reason = %event.details.reason,
            session_id = %event.session_id,
            timestamp = %event.timestamp.to_rfc3339(),
            "security event"
        );
    }
}

/// Sink that keeps events in memory, for tests and embedding callers
/// that forward events elsewhere.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecurityEventSink for MemorySink {
    fn record(&self, event: &SecurityEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}
