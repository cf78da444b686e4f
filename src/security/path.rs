//! Path Safety: may a tool read or write this path?
//!
//! A path passes only if it lands inside the working directory or an extra
//! allowed root after `~` expansion, `..` folding and symlink resolution,
//! and neither the requested nor the resolved form hits a protected
//! location or secret file name.

use crate::security::protected::{self, ProtectedNamePattern, PROTECTED_PATHS};
use crate::security::verdict::ValidationVerdict;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Upper bound on symlinks followed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

/// The filesystem operation a path is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathOperation {
    /// Reading a file or listing a directory.
    Read,
    /// Creating, modifying or deleting a file.
    Write,
}

impl fmt::Display for PathOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Per-call configuration supplied by the tool executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOptions {
    /// The agent's working directory; always an allow root.
    pub cwd: PathBuf,
    /// Additional directories the caller permits.
    #[serde(default)]
    pub allowed_paths: Vec<PathBuf>,
}

impl PathOptions {
    /// Creates options rooted at `cwd` with no extra allow roots.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            allowed_paths: Vec::new(),
        }
    }

    /// Adds an extra allowed root.
    #[must_use]
    pub fn with_allowed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.allowed_paths.push(path.into());
        self
    }
}

/// A path that passed validation.
///
/// Only [`PathValidator`] can construct this value, so code that accepts a
/// `ValidatedPath` cannot be handed an unchecked path by accident. I/O
/// should target [`ValidatedPath::as_path`], the symlink-resolved location
/// that was actually checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    requested: PathBuf,
    resolved: PathBuf,
    operation: PathOperation,
}

impl ValidatedPath {
    /// The path exactly as the caller supplied it.
    #[must_use]
    pub fn requested(&self) -> &Path {
        &self.requested
    }

    /// The resolved real location that was validated.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.resolved
    }

    /// The operation this path was validated for.
    #[must_use]
    pub fn operation(&self) -> PathOperation {
        self.operation
    }

    /// Consumes the value, returning the resolved location.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.resolved
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.resolved
    }
}

/// Why a path was denied.
///
/// Each variant keeps enough detail for the executor to build a useful
/// error message and security event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathDenial {
    /// The path starts with `~` but no home directory is known.
    NoHomeDirectory {
        /// The path that was rejected.
        path: PathBuf,
    },
    /// The path is, or lies under, a protected location.
    ProtectedPath {
        /// The path that was rejected.
        path: PathBuf,
        /// The protected location it matched.
        rule: PathBuf,
    },
    /// The file name matches a protected pattern.
    ProtectedName {
        /// The path that was rejected.
        path: PathBuf,
        /// The pattern that matched.
        pattern: &'static ProtectedNamePattern,
    },
    /// The resolved path is outside every allow root.
    OutsideAllowedRoots {
        /// The path that was rejected.
        path: PathBuf,
        /// Where the path actually resolved to.
        resolved: PathBuf,
        /// The list of allowed root directories.
        allowed_roots: Vec<PathBuf>,
    },
    /// The path could not be resolved safely.
    Unresolvable {
        /// The path that was rejected.
        path: PathBuf,
        /// The underlying error reason.
        reason: String,
    },
}

impl PathDenial {
    /// The path the caller asked for.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NoHomeDirectory { path }
            | Self::ProtectedPath { path, .. }
            | Self::ProtectedName { path, .. }
            | Self::OutsideAllowedRoots { path, .. }
            | Self::Unresolvable { path, .. } => path,
        }
    }

    /// Returns true if the denial came from the protected path or name tables.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::ProtectedPath { .. } | Self::ProtectedName { .. }
        )
    }
}

impl fmt::Display for PathDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHomeDirectory { path } => write!(
                f,
                "cannot expand '~' in '{}': no home directory is known; use an absolute path",
                path.display()
            ),
            Self::ProtectedPath { path, rule } => write!(
                f,
                "path '{}' is inside protected path '{}'; access is blocked for security",
                path.display(),
                rule.display()
            ),
            Self::ProtectedName { path, pattern } => write!(
                f,
                "path '{}' has a protected file name ({} pattern '{}'); access is blocked for security",
                path.display(),
                pattern.kind,
                pattern.glob
            ),
            Self::OutsideAllowedRoots {
                path,
                resolved,
                allowed_roots,
            } => {
                let roots: Vec<String> = allowed_roots
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(
                    f,
                    "path '{}' resolves to '{}', outside allowed directories [{}]; \
                     operations are restricted to these locations",
                    path.display(),
                    resolved.display(),
                    roots.join(", ")
                )
            }
            Self::Unresolvable { path, reason } => write!(
                f,
                "cannot resolve path '{}': {}; access is denied",
                path.display(),
                reason
            ),
        }
    }
}

impl std::error::Error for PathDenial {}

/// Validates paths against protected tables and allow roots.
///
/// # Example
///
/// ```rust,ignore
/// use std::path::Path;
/// use sandbox_gate::security::{PathOperation, PathValidator};
///
/// let validator = PathValidator::new("/home/user/project");
///
/// // Inside the working directory
/// assert!(validator
///     .validate(Path::new("src/main.rs"), PathOperation::Read)
///     .is_ok());
///
/// // Traversal out of it
/// assert!(validator
///     .validate(Path::new("../../etc/hosts"), PathOperation::Read)
///     .is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PathValidator {
    /// Working directory; relative paths are taken from here.
    cwd: PathBuf,
    /// Directories where filesystem operations are permitted.
    allowed_roots: Vec<PathBuf>,
    /// Home directory used for `~` expansion and home-relative rules.
    home: Option<PathBuf>,
}

impl PathValidator {
    /// Creates a validator whose only allow root is `cwd`.
    ///
    /// The home directory is taken from `HOME` when set and non-empty,
    /// otherwise from the platform.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            allowed_roots: vec![cwd.clone()],
            cwd,
            home: home_dir(),
        }
    }

    /// Creates a validator from executor-supplied options.
    #[must_use]
    pub fn from_options(options: &PathOptions) -> Self {
        options
            .allowed_paths
            .iter()
            .cloned()
            .fold(Self::new(options.cwd.clone()), Self::with_allowed_root)
    }

    /// Adds an allowed root directory.
    #[must_use]
    pub fn with_allowed_root(mut self, root: PathBuf) -> Self {
        self.allowed_roots.push(root);
        self
    }

    /// Overrides the home directory.
    #[must_use]
    pub fn with_home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Forgets the home directory; `~` paths will be denied.
    #[must_use]
    pub fn without_home_dir(mut self) -> Self {
        self.home = None;
        self
    }

    /// Returns the working directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Returns a reference to the allowed roots.
    #[must_use]
    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    /// Returns the home directory in use, if any.
    #[must_use]
    pub fn home_dir(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Validates `path` for `operation`.
    ///
    /// Validation steps:
    /// 1. Expand `~` and normalize `.`/`..` without touching the filesystem
    /// 2. Check the protected path and name tables
    /// 3. Resolve symlinks component by component
    /// 4. Verify the resolved path is within an allowed root
    /// 5. Check the protected tables again against the resolved path
    ///
    /// # Errors
    ///
    /// Returns the first [`PathDenial`] encountered. Any resolution error
    /// other than a missing trailing component denies.
    pub fn validate(
        &self,
        path: &Path,
        operation: PathOperation,
    ) -> Result<ValidatedPath, PathDenial> {
        let base = self.absolute_cwd().map_err(|reason| PathDenial::Unresolvable {
            path: path.to_path_buf(),
            reason,
        })?;
        let expanded = self.expand_home(path)?;
        let normalized = normalize(&base.join(expanded));

        self.check_protected(path, &normalized, false)?;

        let resolved = resolve_real_path(&normalized).map_err(|e| PathDenial::Unresolvable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let roots = self
            .resolved_roots(&base)
            .map_err(|reason| PathDenial::Unresolvable {
                path: path.to_path_buf(),
                reason,
            })?;
        if !roots.iter().any(|root| resolved.starts_with(root)) {
            return Err(PathDenial::OutsideAllowedRoots {
                path: path.to_path_buf(),
                resolved,
                allowed_roots: self.allowed_roots.clone(),
            });
        }

        self.check_protected(path, &resolved, true)?;

        tracing::trace!(
            path = %path.display(),
            resolved = %resolved.display(),
            %operation,
            "path validated"
        );

        Ok(ValidatedPath {
            requested: path.to_path_buf(),
            resolved,
            operation,
        })
    }

    /// Validates on tokio's blocking pool.
    ///
    /// Symlink resolution performs blocking filesystem calls; async callers
    /// should use this instead of [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate). A panicked or cancelled
    /// blocking task is reported as [`PathDenial::Unresolvable`].
    pub async fn validate_async(
        &self,
        path: PathBuf,
        operation: PathOperation,
    ) -> Result<ValidatedPath, PathDenial> {
        let validator = self.clone();
        let requested = path.clone();
        tokio::task::spawn_blocking(move || validator.validate(&path, operation))
            .await
            .unwrap_or_else(|e| {
                Err(PathDenial::Unresolvable {
                    path: requested,
                    reason: format!("validation task failed: {e}"),
                })
            })
    }

    fn expand_home(&self, path: &Path) -> Result<PathBuf, PathDenial> {
        let mut components = path.components();
        match components.next() {
            Some(Component::Normal(first)) if first == "~" => match &self.home {
                Some(home) => Ok(home.join(components.as_path())),
                None => Err(PathDenial::NoHomeDirectory {
                    path: path.to_path_buf(),
                }),
            },
            _ => Ok(path.to_path_buf()),
        }
    }

    /// The working directory made absolute against the process cwd.
    fn absolute_cwd(&self) -> Result<PathBuf, String> {
        if self.cwd.as_os_str().is_empty() {
            return Err("working directory is empty".to_string());
        }
        let absolute = if self.cwd.is_absolute() {
            self.cwd.clone()
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(&self.cwd))
                .map_err(|e| {
                    format!("working directory is relative and the process cwd is unknown: {e}")
                })?
        };
        Ok(normalize(&absolute))
    }

    /// Allow roots in resolved form. The first root is the working
    /// directory itself; relative extra roots hang off it. A root that
    /// cannot be resolved is used in its normalized form.
    fn resolved_roots(&self, base: &Path) -> Result<Vec<PathBuf>, String> {
        self.allowed_roots
            .iter()
            .enumerate()
            .map(|(index, root)| {
                if root.as_os_str().is_empty() {
                    return Err("an allowed directory is empty".to_string());
                }
                let normalized = if index == 0 {
                    base.to_path_buf()
                } else {
                    normalize(&base.join(root))
                };
                if !normalized.is_absolute() {
                    return Err(format!(
                        "allowed directory '{}' is not absolute",
                        root.display()
                    ));
                }
                Ok(resolve_real_path(&normalized).unwrap_or(normalized))
            })
            .collect()
    }

    /// Checks `candidate` against both protected tables.
    ///
    /// When `resolved` is set the rule paths are resolved too, so a home
    /// directory or `/etc` reached through a symlink still matches.
    fn check_protected(
        &self,
        original: &Path,
        candidate: &Path,
        resolved: bool,
    ) -> Result<(), PathDenial> {
        for rule in PROTECTED_PATHS {
            let Some(rule_path) = rule.expand(self.home.as_deref()) else {
                continue;
            };
            let rule_path = normalize(&rule_path);
            let hit = candidate.starts_with(&rule_path)
                || (resolved
                    && resolve_real_path(&rule_path)
                        .map(|real| candidate.starts_with(real))
                        .unwrap_or(false));
            if hit {
                return Err(PathDenial::ProtectedPath {
                    path: original.to_path_buf(),
                    rule: rule_path,
                });
            }
        }

        if let Some(name) = candidate.file_name() {
            if let Some(pattern) = protected::match_protected_name(&name.to_string_lossy()) {
                return Err(PathDenial::ProtectedName {
                    path: original.to_path_buf(),
                    pattern,
                });
            }
        }

        Ok(())
    }
}

/// Checks `path` for `operation` and renders the outcome as a verdict.
///
/// ```rust,ignore
/// use sandbox_gate::security::{is_path_safe, PathOperation, PathOptions};
///
/// let verdict = is_path_safe("~/.ssh", PathOperation::Read, &PathOptions::new("/work"));
/// assert!(!verdict.allowed);
/// ```
#[must_use]
pub fn is_path_safe(
    path: impl AsRef<Path>,
    operation: PathOperation,
    options: &PathOptions,
) -> ValidationVerdict {
    PathValidator::from_options(options)
        .validate(path.as_ref(), operation)
        .into()
}

/// Home directory: `HOME` if set and non-empty, else the platform's.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Resolves `.` and `..` lexically. `..` at the root stays at the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

enum Step {
    Root(PathBuf),
    Parent,
    Name(OsString),
}

fn steps(path: &Path) -> Vec<Step> {
    let mut steps = Vec::new();
    if path.has_root() {
        if let Some(root) = path.ancestors().last() {
            steps.push(Step::Root(root.to_path_buf()));
        }
    }
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => steps.push(Step::Parent),
            Component::Normal(part) => steps.push(Step::Name(part.to_os_string())),
        }
    }
    steps
}

/// Follows symlinks in `path` one component at a time.
///
/// Components that do not exist yet are appended as-is, so the location a
/// write would create is still checked. Dangling symlinks are followed to
/// their target. Any error other than "not found" is returned.
fn resolve_real_path(path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut pending = steps(path);
    pending.reverse();
    let mut hops = 0usize;
    let mut missing = false;

    while let Some(step) = pending.pop() {
        match step {
            Step::Root(root) => resolved = root,
            Step::Parent => {
                resolved.pop();
            }
            Step::Name(name) => {
                let candidate = resolved.join(&name);
                if missing {
                    resolved = candidate;
                    continue;
                }
                match fs::symlink_metadata(&candidate) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        hops += 1;
                        if hops > MAX_SYMLINK_HOPS {
                            return Err(io::Error::new(
                                io::ErrorKind::Other,
                                "too many levels of symbolic links",
                            ));
                        }
                        let target = fs::read_link(&candidate)?;
                        let mut target_steps = steps(&target);
                        target_steps.reverse();
                        pending.extend(target_steps);
                    }
                    Ok(_) => resolved = candidate,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        missing = true;
                        resolved = candidate;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}
