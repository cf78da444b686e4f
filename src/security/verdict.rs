//! Verdict values returned by the validators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a path or network validation.
///
/// Produced fresh for every call and never persisted. A denial always
/// carries a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether the requested action may proceed.
    pub allowed: bool,
    /// Why the action was denied. `None` when allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The outcome of a shell-command validation.
///
/// Same shape as [`ValidationVerdict`]; kept as its own name so call sites
/// read the way the executor contract is written.
pub type CommandVerdict = ValidationVerdict;

impl ValidationVerdict {
    /// Creates an allowing verdict.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Creates a denying verdict with the given reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns true if the verdict denies the action.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for ValidationVerdict {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::allow(),
            Err(e) => Self::deny(e.to_string()),
        }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.allowed, &self.reason) {
            (true, _) => write!(f, "allowed"),
            (false, Some(reason)) => write!(f, "denied: {reason}"),
            (false, None) => write!(f, "denied"),
        }
    }
}
