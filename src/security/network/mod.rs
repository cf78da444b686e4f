//! SSRF protection for outbound fetches.
//!
//! Two layers:
//!
//! - [`is_private_host`] classifies a host or IP literal with no I/O. Only
//!   names that are private by definition (`localhost`, `.local`) and IP
//!   literals can be decided this way.
//! - [`is_private_host_or_resolved`] and [`NetworkValidator`] also resolve
//!   hostnames through an injected [`DnsResolver`] and block if any answer
//!   is private. Resolver errors, timeouts and empty answers block too.

mod classify;
mod resolver;

pub use classify::{
    classify_ip, classify_ipv4, classify_ipv6, is_private_name, normalize_host,
    parse_ip_literal, parse_ipv4_lenient, IpClassification,
};
pub use resolver::{DnsResolver, FailingResolver, ResolveError, StaticResolver, SystemResolver};

use crate::security::verdict::ValidationVerdict;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default bound on one DNS lookup.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a host or URL was blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostDenial {
    /// The input is empty after normalization.
    EmptyHost,
    /// The name is private without any lookup (`localhost`, `*.local`).
    PrivateName {
        /// The normalized host.
        host: String,
    },
    /// The host is an IP literal in a private range.
    PrivateAddress {
        /// The normalized host.
        host: String,
        /// The parsed address.
        addr: IpAddr,
        /// Its classification.
        class: IpClassification,
    },
    /// The hostname resolved to at least one private address.
    ResolvesToPrivate {
        /// The normalized host.
        host: String,
        /// The offending address.
        addr: IpAddr,
        /// Its classification.
        class: IpClassification,
    },
    /// The resolver returned an error.
    ResolutionFailed {
        /// The normalized host.
        host: String,
        /// The underlying error reason.
        reason: String,
    },
    /// The resolver did not answer in time.
    ResolutionTimedOut {
        /// The normalized host.
        host: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The resolver answered with no addresses.
    NoAddresses {
        /// The normalized host.
        host: String,
    },
    /// The URL could not be parsed or has no host.
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// The underlying error reason.
        reason: String,
    },
    /// The URL scheme is not http or https.
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },
}

impl HostDenial {
    /// Returns true if the denial came from the resolver rather than from
    /// the address itself. Such denials may clear on a later attempt.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. } | Self::ResolutionTimedOut { .. } | Self::NoAddresses { .. }
        )
    }
}

impl fmt::Display for HostDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHost => write!(f, "host is empty"),
            Self::PrivateName { host } => write!(
                f,
                "host '{host}' names a local or private network; requests to it are blocked"
            ),
            Self::PrivateAddress { host, addr, class } => write!(
                f,
                "host '{host}' is a {class} address ({addr}); requests to private networks are blocked"
            ),
            Self::ResolvesToPrivate { host, addr, class } => write!(
                f,
                "host '{host}' resolves to {class} address {addr}; requests to private networks are blocked"
            ),
            Self::ResolutionFailed { host, reason } => write!(
                f,
                "could not resolve host '{host}': {reason}; treated as private"
            ),
            Self::ResolutionTimedOut { host, timeout } => write!(
                f,
                "resolving host '{host}' timed out after {} ms; treated as private",
                timeout.as_millis()
            ),
            Self::NoAddresses { host } => write!(
                f,
                "host '{host}' resolved to no addresses; treated as private"
            ),
            Self::InvalidUrl { url, reason } => write!(f, "invalid URL '{url}': {reason}"),
            Self::UnsupportedScheme { scheme } => write!(
                f,
                "unsupported URL scheme: {scheme}; only http and https are allowed"
            ),
        }
    }
}

impl std::error::Error for HostDenial {}

/// Synchronous classification of a normalized host.
///
/// `Ok(Some(addr))` is a public IP literal, `Ok(None)` is a hostname that
/// needs resolution.
fn classify_literal(host: &str) -> Result<Option<IpAddr>, HostDenial> {
    if host.is_empty() {
        return Err(HostDenial::EmptyHost);
    }
    if is_private_name(host) {
        return Err(HostDenial::PrivateName {
            host: host.to_string(),
        });
    }
    match parse_ip_literal(host) {
        Some(addr) => {
            let class = classify_ip(addr);
            if class.is_private() {
                Err(HostDenial::PrivateAddress {
                    host: host.to_string(),
                    addr,
                    class,
                })
            } else {
                Ok(Some(addr))
            }
        }
        None => Ok(None),
    }
}

/// Returns true if `host_or_ip` is private by name or by address.
///
/// Pure: performs no I/O and always gives the same answer for the same
/// input. Ordinary hostnames return `false` here and must still go through
/// [`is_private_host_or_resolved`] before a fetch.
#[must_use]
pub fn is_private_host(host_or_ip: &str) -> bool {
    classify_literal(&normalize_host(host_or_ip)).is_err()
}

/// Returns true if `host` is private, resolves to a private address, or
/// cannot be resolved.
///
/// The lookup is unbounded here; use [`NetworkValidator`] for a timeout.
pub async fn is_private_host_or_resolved(host: &str, resolver: &dyn DnsResolver) -> bool {
    check_host_with(host, resolver, None).await.is_err()
}

async fn check_host_with(
    host: &str,
    resolver: &dyn DnsResolver,
    timeout: Option<Duration>,
) -> Result<(), HostDenial> {
    let host = normalize_host(host);
    if classify_literal(&host)?.is_some() {
        return Ok(());
    }

    let lookup = resolver.resolve(&host);
    let answer = match timeout {
        Some(limit) => tokio::time::timeout(limit, lookup).await.map_err(|_| {
            HostDenial::ResolutionTimedOut {
                host: host.clone(),
                timeout: limit,
            }
        })?,
        None => lookup.await,
    };

    let addrs = answer.map_err(|e| HostDenial::ResolutionFailed {
        host: host.clone(),
        reason: e.reason,
    })?;
    if addrs.is_empty() {
        return Err(HostDenial::NoAddresses { host });
    }
    if let Some((addr, class)) = addrs
        .iter()
        .map(|&addr| (addr, classify_ip(addr)))
        .find(|(_, class)| class.is_private())
    {
        return Err(HostDenial::ResolvesToPrivate { host, addr, class });
    }

    tracing::trace!(%host, addrs = ?addrs, "host resolved to public addresses");
    Ok(())
}

/// SSRF gate holding the resolver and lookup bound.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use sandbox_gate::security::{NetworkValidator, SystemResolver};
///
/// let validator = NetworkValidator::new(Arc::new(SystemResolver));
/// let url = validator.check_url("https://example.com/data.json").await?;
/// ```
#[derive(Debug, Clone)]
pub struct NetworkValidator {
    resolver: Arc<dyn DnsResolver>,
    timeout: Duration,
}

impl NetworkValidator {
    /// Creates a validator using `resolver` and the default timeout.
    #[must_use]
    pub fn new(resolver: Arc<dyn DnsResolver>) -> Self {
        Self {
            resolver,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Sets the bound on a single lookup.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the lookup bound.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks a host or IP literal, resolving hostnames.
    ///
    /// # Errors
    ///
    /// Returns [`HostDenial`] if the host is private, resolves to a private
    /// address, or cannot be resolved within the timeout.
    pub async fn check_host(&self, host: &str) -> Result<(), HostDenial> {
        check_host_with(host, self.resolver.as_ref(), Some(self.timeout)).await
    }

    /// Checks a fetch URL: scheme must be http(s) and the host must pass
    /// [`check_host`](Self::check_host).
    ///
    /// # Errors
    ///
    /// Returns [`HostDenial`] for unparseable URLs, other schemes, or a
    /// blocked host.
    pub async fn check_url(&self, url: &str) -> Result<Url, HostDenial> {
        let parsed = Url::parse(url).map_err(|e| HostDenial::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(HostDenial::UnsupportedScheme {
                    scheme: scheme.to_string(),
                })
            }
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| HostDenial::InvalidUrl {
                url: url.to_string(),
                reason: "URL has no host".to_string(),
            })?
            .to_string();

        self.check_host(&host).await?;
        Ok(parsed)
    }

    /// Renders [`check_host`](Self::check_host) as a verdict.
    pub async fn host_verdict(&self, host: &str) -> ValidationVerdict {
        self.check_host(host).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct HangingResolver;

    #[async_trait]
    impl DnsResolver for HangingResolver {
        async fn resolve(&self, _host: &str) -> Result<Vec<IpAddr>, ResolveError> {
            std::future::pending().await
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn private_literals_and_names() {
        for host in [
            "localhost",
            "LOCALHOST.",
            "localhost..",
            "127.0.0.1..",
            "...",
            "db.localhost",
            "nas.local",
            "127.0.0.1",
            "2130706433",
            "0x7f000001",
            "0177.0.0.1",
            "127.1",
            "169.254.169.254",
            "[::1]",
            "[::ffff:127.0.0.1]:8080",
            "::ffff:7f00:1",
            "fd00::1",
            "fe80::1%eth0",
            "10.0.0.1:22",
            "0.0.0.0",
            "",
        ] {
            assert!(is_private_host(host), "{host} should be private");
        }
    }

    #[test]
    fn public_literals_and_plain_hostnames() {
        for host in ["8.8.8.8", "example.com", "[2606:4700::1111]", "172.32.0.0", "1.1.1.1:443"] {
            assert!(!is_private_host(host), "{host} should not be private");
        }
    }

    #[test]
    fn decimal_loopback_matches_dotted() {
        assert_eq!(is_private_host("2130706433"), is_private_host("127.0.0.1"));
        assert!(is_private_host("2130706433"));
    }

    #[test]
    fn is_private_host_is_repeatable() {
        for _ in 0..3 {
            assert!(is_private_host("192.168.1.1"));
            assert!(!is_private_host("93.184.216.34"));
        }
    }

    #[tokio::test]
    async fn resolver_returning_private_blocks() {
        let resolver = StaticResolver::new().with_host("internal.example.com", [ip("10.0.0.1")]);
        assert!(is_private_host_or_resolved("internal.example.com", &resolver).await);
    }

    #[tokio::test]
    async fn any_private_answer_blocks() {
        let resolver = StaticResolver::new()
            .with_host("mixed.example.com", [ip("93.184.216.34"), ip("169.254.169.254")]);
        assert!(is_private_host_or_resolved("mixed.example.com", &resolver).await);
    }

    #[tokio::test]
    async fn public_answers_pass() {
        let resolver = StaticResolver::new().with_host("example.com", [ip("93.184.216.34")]);
        assert!(!is_private_host_or_resolved("example.com", &resolver).await);
    }

    #[tokio::test]
    async fn resolver_failure_fails_closed() {
        assert!(is_private_host_or_resolved("example.com", &FailingResolver::default()).await);
    }

    #[tokio::test]
    async fn empty_answer_fails_closed() {
        let resolver = StaticResolver::new().with_host("void.example.com", Vec::<IpAddr>::new());
        assert!(is_private_host_or_resolved("void.example.com", &resolver).await);
    }

    #[tokio::test]
    async fn public_literal_skips_resolver() {
        assert!(!is_private_host_or_resolved("8.8.8.8", &FailingResolver::default()).await);
    }

    #[tokio::test]
    async fn hanging_resolver_times_out_closed() {
        let validator = NetworkValidator::new(Arc::new(HangingResolver))
            .with_timeout(Duration::from_millis(20));
        let result = validator.check_host("slow.example.com").await;
        assert!(matches!(result, Err(HostDenial::ResolutionTimedOut { .. })));
        assert!(result.unwrap_err().is_resolution_failure());
    }

    #[tokio::test]
    async fn check_url_enforces_scheme_and_host() {
        let resolver = StaticResolver::new().with_host("example.com", [ip("93.184.216.34")]);
        let validator = NetworkValidator::new(Arc::new(resolver));

        let url = validator.check_url("https://example.com/a?b=c").await.unwrap();
        assert_eq!(url.host_str(), Some("example.com"));

        assert!(matches!(
            validator.check_url("file:///etc/passwd").await,
            Err(HostDenial::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            validator.check_url("not a url").await,
            Err(HostDenial::InvalidUrl { .. })
        ));
        assert!(matches!(
            validator.check_url("http://[::1]:8080/").await,
            Err(HostDenial::PrivateAddress { .. })
        ));
        assert!(matches!(
            validator.check_url("http://2130706433/").await,
            Err(HostDenial::PrivateAddress { .. })
        ));
    }

    #[tokio::test]
    async fn host_verdict_mentions_metadata_address() {
        let validator = NetworkValidator::new(Arc::new(FailingResolver::default()));
        let verdict = validator.host_verdict("169.254.169.254").await;
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("link-local"));
    }
}
