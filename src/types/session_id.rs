//! Agent session identifiers.
//!
//! Every denial the gate records carries the session it happened in, so an
//! audit trail can group refused tool calls per agent run. IDs are TypeIDs
//! with the `sess` prefix and a UUIDv7 suffix, which keeps them sortable by
//! creation time: `sess_01h455vb4pex5vsknk084sn02q`.

use mti::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies one agent session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(MagicTypeId);

/// A string that is not a session ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSessionId {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub problem: SessionIdProblem,
}

/// Why a string was rejected as a session ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdProblem {
    /// Not a TypeID at all.
    Malformed(String),
    /// A TypeID for something other than a session.
    ForeignPrefix(String),
}

impl fmt::Display for InvalidSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            SessionIdProblem::Malformed(reason) => {
                write!(f, "'{}' is not a session ID: {reason}", self.input)
            }
            SessionIdProblem::ForeignPrefix(prefix) => write!(
                f,
                "'{}' is a '{prefix}' ID; session IDs start with '{}_'",
                self.input,
                SessionId::PREFIX
            ),
        }
    }
}

impl std::error::Error for InvalidSessionId {}

impl SessionId {
    /// TypeID prefix shared by all session IDs.
    pub const PREFIX: &'static str = "sess";

    /// Starts a new session.
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Reads back an ID produced by [`Display`](fmt::Display).
    ///
    /// # Errors
    ///
    /// Fails when `input` is not a TypeID or carries a prefix other than
    /// [`PREFIX`](Self::PREFIX).
    pub fn parse(input: &str) -> Result<Self, InvalidSessionId> {
        let reject = |problem| InvalidSessionId {
            input: input.to_string(),
            problem,
        };

        let id = MagicTypeId::from_str(input)
            .map_err(|e| reject(SessionIdProblem::Malformed(e.to_string())))?;
        let prefix = id.prefix().as_str();
        if prefix != Self::PREFIX {
            return Err(reject(SessionIdProblem::ForeignPrefix(prefix.to_string())));
        }
        Ok(Self(id))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = InvalidSessionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}
