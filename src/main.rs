use clap::{Parser, Subcommand};
use sandbox_gate::config::{self, GateConfig};
use sandbox_gate::error::ConfigError;
use sandbox_gate::gate::{MemorySink, SandboxGate, SecurityEvent, SecurityEventSink, TracingSink};
use sandbox_gate::logging;
use sandbox_gate::security::{is_private_host, PathOperation, SystemResolver};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Tool name stamped on events raised from the command line.
const CLI_TOOL: &str = "cli";

#[derive(Parser)]
#[command(name = "sandbox-gate")]
#[command(about = "Check paths, shell commands and hosts against the agent sandbox policy")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./sandbox-gate.toml, then the XDG config dir)
    #[arg(long, global = true, env = "SANDBOX_GATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a filesystem path
    Path {
        /// Path to check (relative paths are taken from --cwd)
        path: PathBuf,

        /// Check for writing instead of reading
        #[arg(long)]
        write: bool,

        /// Working directory of the agent
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Additional allowed directory (can be repeated)
        #[arg(long = "allow")]
        allow: Vec<PathBuf>,
    },
    /// Check a shell command
    Bash {
        /// Command line to check
        command: String,
    },
    /// Check a host or IP address
    Host {
        /// Hostname or IP literal
        host: String,

        /// Resolve hostnames and check every returned address
        #[arg(long)]
        resolve: bool,
    },
    /// Check a URL to be fetched
    Url {
        /// The http(s) URL
        url: String,
    },
}

/// What the CLI prints for every check.
#[derive(Serialize)]
struct Report {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<SecurityEvent>,
}

impl Report {
    fn allowed(resolved: Option<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            resolved,
            event: None,
        }
    }

    fn denied(reason: String, event: Option<SecurityEvent>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            resolved: None,
            event,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GateConfig, ConfigError> {
    match path {
        Some(path) => config::from_path(path),
        None => config::load(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sandbox-gate: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init_and_store_logging(&config.logging) {
        eprintln!("sandbox-gate: warning: {e}");
    }

    let report = match run(cli.command, &config).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("sandbox-gate: {e}");
            return ExitCode::from(2);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("sandbox-gate: failed to render report: {e}");
            return ExitCode::from(2);
        }
    }

    if report.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn run(command: Command, config: &GateConfig) -> Result<Report, std::io::Error> {
    let sink = Arc::new(MemorySink::new());
    let gate_for = |cwd: PathBuf, config: &GateConfig| {
        SandboxGate::from_config(config, cwd, Arc::new(SystemResolver))
            .with_event_sink(sink.clone())
    };

    let outcome = match command {
        Command::Path {
            path,
            write,
            cwd,
            allow,
        } => {
            let cwd = match cwd {
                Some(cwd) => cwd,
                None => std::env::current_dir()?,
            };
            let config = allow
                .into_iter()
                .fold(config.clone(), GateConfig::with_allowed_path);
            let operation = if write {
                PathOperation::Write
            } else {
                PathOperation::Read
            };
            gate_for(cwd, &config)
                .authorize_path_async(CLI_TOOL, path, operation)
                .await
                .map(|validated| Some(validated.as_path().display().to_string()))
        }
        Command::Bash { command } => gate_for(PathBuf::from("/"), config)
            .authorize_command(CLI_TOOL, &command)
            .map(|()| None),
        Command::Host {
            host,
            resolve: false,
        } => {
            return Ok(if is_private_host(&host) {
                Report::denied(format!("host '{host}' is private"), None)
            } else {
                Report::allowed(None)
            });
        }
        Command::Host {
            host,
            resolve: true,
        } => gate_for(PathBuf::from("/"), config)
            .authorize_host(CLI_TOOL, &host)
            .await
            .map(|()| None),
        Command::Url { url } => gate_for(PathBuf::from("/"), config)
            .authorize_url(CLI_TOOL, &url)
            .await
            .map(|parsed| Some(parsed.to_string())),
    };

    let events = sink.events();
    for event in &events {
        TracingSink.record(event);
    }

    Ok(match outcome {
        Ok(resolved) => Report::allowed(resolved),
        Err(e) => Report::denied(e.reason(), events.into_iter().last()),
    })
}
