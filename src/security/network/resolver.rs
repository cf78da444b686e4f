//! DNS resolution capability injected into the network validator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Error returned when a hostname cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    /// The hostname that failed.
    pub host: String,
    /// The underlying error reason.
    pub reason: String,
}

impl ResolveError {
    /// Creates a new resolution error.
    #[must_use]
    pub fn new(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to resolve '{}': {}", self.host, self.reason)
    }
}

impl std::error::Error for ResolveError {}

/// Resolves hostnames to addresses.
///
/// The network validator takes this as a trait object so tests can stand in
/// a compromised resolver or a failing one, and so the composing system
/// decides how lookups actually happen.
///
/// # Example
///
/// ```rust,ignore
/// use sandbox_gate::security::{DnsResolver, StaticResolver};
///
/// let resolver = StaticResolver::new().with_host("internal.example.com", ["10.0.0.1".parse()?]);
/// let addrs = resolver.resolve("internal.example.com").await?;
/// ```
#[async_trait]
pub trait DnsResolver: Send + Sync + fmt::Debug {
    /// Resolves `host` to its addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the lookup fails.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolveError::new(host, e.to_string()))?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolver with fixed answers, for tests and offline use.
///
/// Hosts without an entry fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the answer for `host`.
    #[must_use]
    pub fn with_host(
        mut self,
        host: impl Into<String>,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        self.entries
            .insert(host.into().to_ascii_lowercase(), addrs.into_iter().collect());
        self
    }
}

#[async_trait]
impl DnsResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        self.entries
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ResolveError::new(host, "no such host"))
    }
}

/// Resolver that always fails.
#[derive(Debug, Clone)]
pub struct FailingResolver {
    reason: String,
}

impl FailingResolver {
    /// Creates a resolver failing with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for FailingResolver {
    fn default() -> Self {
        Self::new("resolver unavailable")
    }
}

#[async_trait]
impl DnsResolver for FailingResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        Err(ResolveError::new(host, self.reason.clone()))
    }
}
