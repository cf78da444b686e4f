//! # sandbox-gate: pre-execution checks for agent tool calls
//!
//! An agent's tool executor asks the gate before it reads or writes a file,
//! runs a shell command, or fetches a URL. The gate never performs the
//! action itself; it either hands back the checked value or refuses with a
//! reason the agent can act on.
//!
//! ## Architecture
//!
//! - **Security**: The three stateless validators (paths, shell commands,
//!   network hosts) and their protected-location tables
//! - **Gate**: Per-session seam that runs the validators and records a
//!   security event for every denial
//! - **Config**: TOML configuration for allowed directories, DNS timeout and logging
//! - **Logging**: Daily rolling file logs via `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sandbox_gate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = sandbox_gate::config::load()?;
//!     let gate = SandboxGate::from_config(&config, "/home/agent/project", Arc::new(SystemResolver));
//!
//!     let target = gate.authorize_path("read_file", "README.md", PathOperation::Read)?;
//!     let text = std::fs::read_to_string(target.as_path())?;
//!
//!     gate.authorize_command("bash", "cargo build")?;
//!     gate.authorize_url("web_fetch", "https://crates.io/").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod security;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::GateConfig;
    pub use crate::error::{ConfigError, GateError, GateErrorKind};
    pub use crate::gate::{SandboxGate, SecurityEvent, SecurityEventSink, Severity};
    pub use crate::security::{
        is_path_safe, is_private_host, is_private_host_or_resolved, validate_bash_command,
        DnsResolver, NetworkValidator, PathOperation, PathOptions, PathValidator, SystemResolver,
        ValidatedPath, ValidationVerdict,
    };
    pub use crate::types::SessionId;
}
