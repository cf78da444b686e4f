//! Core type definitions for the sandbox gate.
//!
//! - Identity types (SessionId)

mod session_id;

pub use session_id::{InvalidSessionId, SessionId, SessionIdProblem};
