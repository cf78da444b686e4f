//! Gate configuration.
//!
//! A single TOML file, looked up as `./sandbox-gate.toml` and then as
//! `config.toml` under the user config directory (`~/.config/sandbox-gate`
//! on Linux). Without a file the defaults apply:
//!
//! ```toml
//! allowed_paths = []      # absolute directories beyond the working directory
//! dns_timeout_ms = 5000   # per-lookup bound for host checks
//!
//! [logging]
//! enabled = true
//! level = "info"
//! ```
//!
//! ```rust,ignore
//! let config = sandbox_gate::config::load()?;
//! let gate = SandboxGate::from_config(&config, std::env::current_dir()?, Arc::new(SystemResolver));
//! ```

mod file;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{GateConfig, DEFAULT_DNS_TIMEOUT_MS};
