//! Static tables of protected locations and file names.
//!
//! These tables are compiled into the crate and never change at runtime.
//! Path rules are matched component-wise; name patterns are matched
//! against the basename only, in any directory.

use glob::{MatchOptions, Pattern};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A location that may never be read or written, whatever the allow roots say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedPathRule {
    /// Relative to the user's home directory (`~/.ssh`).
    Home(&'static str),
    /// An absolute system path (`/etc/shadow`).
    Absolute(&'static str),
}

impl ProtectedPathRule {
    /// Expands the rule into a concrete path.
    ///
    /// Home rules expand to `None` when no home directory is known; such a
    /// rule cannot name anything on this system.
    #[must_use]
    pub fn expand(&self, home: Option<&Path>) -> Option<PathBuf> {
        match self {
            Self::Home(rel) => home.map(|h| h.join(rel)),
            Self::Absolute(abs) => Some(PathBuf::from(abs)),
        }
    }
}

impl fmt::Display for ProtectedPathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home(rel) => write!(f, "~/{rel}"),
            Self::Absolute(abs) => write!(f, "{abs}"),
        }
    }
}

/// Protected locations.
pub const PROTECTED_PATHS: &[ProtectedPathRule] = &[
    ProtectedPathRule::Home(".ssh"),
    ProtectedPathRule::Home(".gnupg"),
    ProtectedPathRule::Home(".aws"),
    ProtectedPathRule::Home(".azure"),
    ProtectedPathRule::Home(".config/gcloud"),
    ProtectedPathRule::Home(".config/gh/hosts.yml"),
    ProtectedPathRule::Home(".kube"),
    ProtectedPathRule::Home(".docker/config.json"),
    ProtectedPathRule::Home(".netrc"),
    ProtectedPathRule::Home(".npmrc"),
    ProtectedPathRule::Home(".pypirc"),
    ProtectedPathRule::Home(".git-credentials"),
    ProtectedPathRule::Home(".bash_history"),
    ProtectedPathRule::Home(".zsh_history"),
    ProtectedPathRule::Absolute("/etc/passwd"),
    ProtectedPathRule::Absolute("/etc/shadow"),
    ProtectedPathRule::Absolute("/etc/gshadow"),
    ProtectedPathRule::Absolute("/etc/sudoers"),
    ProtectedPathRule::Absolute("/etc/sudoers.d"),
    ProtectedPathRule::Absolute("/etc/ssh"),
    ProtectedPathRule::Absolute("/proc"),
    ProtectedPathRule::Absolute("/sys"),
    ProtectedPathRule::Absolute("/dev"),
    ProtectedPathRule::Absolute("/boot"),
    ProtectedPathRule::Absolute("/var/run/docker.sock"),
    ProtectedPathRule::Absolute("/run/docker.sock"),
];

/// What kind of secret a name pattern guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Dotenv files and their variants.
    Environment,
    /// SSH or TLS private key material.
    PrivateKey,
    /// PKCS#12 / Java keystore bundles.
    KeyBundle,
    /// SSH authorized-key lists.
    AuthorizedKeys,
    /// Credential and secret stores identified by name or extension.
    Credentials,
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Environment => "environment file",
            Self::PrivateKey => "private key",
            Self::KeyBundle => "key bundle",
            Self::AuthorizedKeys => "authorized keys",
            Self::Credentials => "credentials file",
        };
        f.write_str(label)
    }
}

/// A basename pattern that is blocked in every directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedNamePattern {
    /// Glob matched against the file name (case-insensitive).
    pub glob: &'static str,
    /// The class of secret this pattern protects.
    pub kind: SecretKind,
}

const fn name(glob: &'static str, kind: SecretKind) -> ProtectedNamePattern {
    ProtectedNamePattern { glob, kind }
}

/// Protected file name patterns.
pub const PROTECTED_NAMES: &[ProtectedNamePattern] = &[
    name(".env", SecretKind::Environment),
    name(".env.*", SecretKind::Environment),
    name("*.env", SecretKind::Environment),
    name("id_rsa", SecretKind::PrivateKey),
    name("id_dsa", SecretKind::PrivateKey),
    name("id_ecdsa", SecretKind::PrivateKey),
    name("id_ecdsa_sk", SecretKind::PrivateKey),
    name("id_ed25519", SecretKind::PrivateKey),
    name("id_ed25519_sk", SecretKind::PrivateKey),
    name("*.pem", SecretKind::PrivateKey),
    name("*.key", SecretKind::PrivateKey),
    name("*.ppk", SecretKind::PrivateKey),
    name("*.p12", SecretKind::KeyBundle),
    name("*.pfx", SecretKind::KeyBundle),
    name("*.jks", SecretKind::KeyBundle),
    name("*.keystore", SecretKind::KeyBundle),
    name("authorized_keys", SecretKind::AuthorizedKeys),
    name("authorized_keys2", SecretKind::AuthorizedKeys),
    name("credentials", SecretKind::Credentials),
    name("credentials.json", SecretKind::Credentials),
    name("credentials.yaml", SecretKind::Credentials),
    name("credentials.yml", SecretKind::Credentials),
    name("credentials.toml", SecretKind::Credentials),
    name("credentials.ini", SecretKind::Credentials),
    name("*_credentials.json", SecretKind::Credentials),
    name("*-credentials.json", SecretKind::Credentials),
    name("secrets.json", SecretKind::Credentials),
    name("secrets.yaml", SecretKind::Credentials),
    name("secrets.yml", SecretKind::Credentials),
    name("secrets.toml", SecretKind::Credentials),
    name("*.secret", SecretKind::Credentials),
    name("*.secrets", SecretKind::Credentials),
    name(".netrc", SecretKind::Credentials),
    name(".pgpass", SecretKind::Credentials),
    name(".htpasswd", SecretKind::Credentials),
];

const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

static COMPILED_NAMES: LazyLock<Vec<(Pattern, &'static ProtectedNamePattern)>> =
    LazyLock::new(|| {
        PROTECTED_NAMES
            .iter()
            .map(|entry| {
                let pattern = Pattern::new(entry.glob).expect("invalid protected name glob");
                (pattern, entry)
            })
            .collect()
    });

/// Returns the first protected pattern matching `file_name`, if any.
#[must_use]
pub fn match_protected_name(file_name: &str) -> Option<&'static ProtectedNamePattern> {
    COMPILED_NAMES
        .iter()
        .find(|(pattern, _)| pattern.matches_with(file_name, NAME_MATCH))
        .map(|(_, entry)| *entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_glob_compiles() {
        assert_eq!(COMPILED_NAMES.len(), PROTECTED_NAMES.len());
    }

    #[test]
    fn env_files_and_variants_match() {
        for file in [".env", ".env.local", ".env.production", "prod.env", ".ENV"] {
            let hit = match_protected_name(file);
            assert_eq!(
                hit.map(|p| p.kind),
                Some(SecretKind::Environment),
                "{file} should be protected"
            );
        }
    }

    #[test]
    fn key_material_matches() {
        assert_eq!(
            match_protected_name("id_ed25519").map(|p| p.kind),
            Some(SecretKind::PrivateKey)
        );
        assert_eq!(
            match_protected_name("server.PEM").map(|p| p.kind),
            Some(SecretKind::PrivateKey)
        );
        assert_eq!(
            match_protected_name("bundle.p12").map(|p| p.kind),
            Some(SecretKind::KeyBundle)
        );
        assert_eq!(
            match_protected_name("authorized_keys").map(|p| p.kind),
            Some(SecretKind::AuthorizedKeys)
        );
    }

    #[test]
    fn public_keys_and_ordinary_files_do_not_match() {
        for file in [
            "id_rsa.pub",
            "main.rs",
            "environment.rs",
            "secrets.rs",
            "README.md",
            "keyboard.c",
            ".envrc.md",
        ] {
            assert!(match_protected_name(file).is_none(), "{file} should be allowed");
        }
    }

    #[test]
    fn home_rule_needs_a_home() {
        let rule = ProtectedPathRule::Home(".ssh");
        assert!(rule.expand(None).is_none());
        assert_eq!(
            rule.expand(Some(Path::new("/home/agent"))),
            Some(PathBuf::from("/home/agent/.ssh"))
        );
        assert_eq!(rule.to_string(), "~/.ssh");
    }

    #[test]
    fn absolute_rule_ignores_home() {
        let rule = ProtectedPathRule::Absolute("/etc/shadow");
        assert_eq!(rule.expand(None), Some(PathBuf::from("/etc/shadow")));
    }
}
