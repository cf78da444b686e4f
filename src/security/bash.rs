//! Heuristic shell-command screening.
//!
//! `validate_bash_command` rejects a fixed set of destructive or
//! code-injection shapes before a command reaches `bash -c`. It is a
//! blacklist over a Turing-complete grammar and cannot catch every
//! obfuscation (quoting tricks, variable indirection, aliases, encoded
//! payloads). It is defense in depth only; commands must still run inside
//! OS-level isolation (namespaces, seccomp, containers).

use crate::security::verdict::CommandVerdict;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// A class of command the validator refuses to run.
///
/// Variants are listed in the order they are checked; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandViolation {
    /// The command is empty or whitespace.
    Empty,
    /// A self-replicating function that exhausts process slots.
    ForkBomb,
    /// Recursive delete of `/`, `/*` or the home directory.
    RootDelete,
    /// Output redirected onto a raw disk device node.
    RawDeviceWrite,
    /// `curl`/`wget` output piped straight into a shell.
    RemoteScriptPipe,
    /// `eval` re-interpreting a string or variable as code.
    Eval,
    /// `dd`, `mkfs` and similar tools pointed at a device.
    DiskOverwrite,
    /// `$(...)` or backtick command substitution.
    CommandSubstitution,
}

impl CommandViolation {
    /// Short stable identifier, used in logs and security events.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_command",
            Self::ForkBomb => "fork_bomb",
            Self::RootDelete => "root_delete",
            Self::RawDeviceWrite => "raw_device_write",
            Self::RemoteScriptPipe => "remote_script_pipe",
            Self::Eval => "eval",
            Self::DiskOverwrite => "disk_overwrite",
            Self::CommandSubstitution => "command_substitution",
        }
    }

    /// Returns true for violations that destroy data or the host outright.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::ForkBomb | Self::RootDelete | Self::RawDeviceWrite | Self::DiskOverwrite
        )
    }
}

impl fmt::Display for CommandViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Empty => "command is empty",
            Self::ForkBomb => "command contains a fork bomb",
            Self::RootDelete => "command recursively deletes the root or home directory",
            Self::RawDeviceWrite => "command redirects output onto a raw disk device",
            Self::RemoteScriptPipe => "command pipes downloaded content into a shell",
            Self::Eval => "command uses eval to execute dynamic code",
            Self::DiskOverwrite => "command overwrites or formats a disk device",
            Self::CommandSubstitution => "command uses command substitution",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for CommandViolation {}

/// Disk-like device nodes. `/dev/null`, `/dev/tty` and the std streams are
/// not in this set.
const DISK_DEVICE: &str =
    r"/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d|mmcblk\d|disk\d|rdisk\d|dm-\d|mapper/|loop\d)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid command pattern")
}

static FORK_BOMB: LazyLock<Regex> =
    LazyLock::new(|| compile(r":\s*\(\s*\)\s*\{[^}]*:\s*\|\s*:\s*&[^}]*\}"));

static FUNCTION_DEF: LazyLock<Regex> =
    LazyLock::new(|| compile(r"([A-Za-z_][\w-]*)\s*\(\s*\)\s*\{([^}]*)\}"));

static ROOT_DELETE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)\brm\s+(?:[^;&|\n]*\s)?["']?(?:/+\*?|~/?\*?)["']?(?:\s|$|[;&|)])"#,
    )
});

static NO_PRESERVE_ROOT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\brm\s+[^;&|]*--no-preserve-root"));

static RAW_DEVICE_WRITE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)>\|?\s*{DISK_DEVICE}")));

static REMOTE_SCRIPT_PIPE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(?:curl|wget)\b[^;\n]*\|\s*(?:sudo\s+(?:-\S+\s+)*)?(?:env\s+)?(?:\S*/)?(?:ba|da|z|k|c|tc|fi|a)?sh\b",
    )
});

static EVAL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(?:^|[;&|({\n]|\b(?:then|do|else|sudo|exec|command|builtin)\s)\s*eval(?:\s|$)")
});

static DISK_OVERWRITE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)\bdd\b[^;\n]*\bof=\s*{DISK_DEVICE}|\b(?:mkfs(?:\.\w+)?|mke2fs|mkswap|wipefs|shred)\b[^;\n]*{DISK_DEVICE}"
    ))
});

static SUBSTITUTION: LazyLock<Regex> = LazyLock::new(|| compile(r"\$\(|`"));

/// Checks `command` against the denial patterns.
///
/// # Errors
///
/// Returns the first [`CommandViolation`] matched, in declaration order.
pub fn check_command(command: &str) -> Result<(), CommandViolation> {
    let folded = command.replace("\\\r\n", " ").replace("\\\n", " ");
    let command = folded.trim();

    if command.is_empty() {
        return Err(CommandViolation::Empty);
    }
    if is_fork_bomb(command) {
        return Err(CommandViolation::ForkBomb);
    }
    if ROOT_DELETE.is_match(command) || NO_PRESERVE_ROOT.is_match(command) {
        return Err(CommandViolation::RootDelete);
    }
    if RAW_DEVICE_WRITE.is_match(command) {
        return Err(CommandViolation::RawDeviceWrite);
    }
    if REMOTE_SCRIPT_PIPE.is_match(command) {
        return Err(CommandViolation::RemoteScriptPipe);
    }
    if EVAL.is_match(command) {
        return Err(CommandViolation::Eval);
    }
    if DISK_OVERWRITE.is_match(command) {
        return Err(CommandViolation::DiskOverwrite);
    }
    if SUBSTITUTION.is_match(command) {
        return Err(CommandViolation::CommandSubstitution);
    }
    Ok(())
}

/// Validates a shell command and renders the outcome as a verdict.
///
/// ```rust,ignore
/// use sandbox_gate::security::validate_bash_command;
///
/// assert!(validate_bash_command("git status").allowed);
/// assert!(!validate_bash_command("echo $(whoami)").allowed);
/// ```
#[must_use]
pub fn validate_bash_command(command: &str) -> CommandVerdict {
    check_command(command).into()
}

/// `:(){ :|:& };:` and the same shape under any function name.
fn is_fork_bomb(command: &str) -> bool {
    if FORK_BOMB.is_match(command) {
        return true;
    }
    FUNCTION_DEF.captures_iter(command).any(|caps| {
        let name = regex::escape(&caps[1]);
        let body = &caps[2];
        Regex::new(&format!(r"(?:^|[^\w-]){name}\s*\|\s*{name}\s*&"))
            .map(|re| re.is_match(body))
            .unwrap_or(false)
    })
}
