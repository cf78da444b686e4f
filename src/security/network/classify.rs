//! Host normalization and IP address classification.
//!
//! Everything here is pure: no DNS, no sockets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The address range an IP belongs to.
///
/// Only [`IpClassification::Public`] is routable on the open internet; every
/// other variant is blocked as an SSRF target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpClassification {
    /// `127.0.0.0/8`, `::1`.
    Loopback,
    /// `0.0.0.0/8`, `::`.
    ThisNetwork,
    /// `10/8`, `172.16/12`, `192.168/16`.
    Rfc1918Private,
    /// `100.64.0.0/10`.
    CarrierGradeNat,
    /// `169.254/16` (cloud metadata lives here), `fe80::/10`.
    LinkLocal,
    /// `fc00::/7`.
    UniqueLocal,
    /// `224/4`, `ff00::/8`.
    Multicast,
    /// `240/4` including broadcast, deprecated IPv6 site-local.
    Reserved,
    /// Anything else.
    Public,
}

impl IpClassification {
    /// Returns true for every class except [`IpClassification::Public`].
    #[must_use]
    pub fn is_private(self) -> bool {
        match self {
            Self::Loopback
            | Self::ThisNetwork
            | Self::Rfc1918Private
            | Self::CarrierGradeNat
            | Self::LinkLocal
            | Self::UniqueLocal
            | Self::Multicast
            | Self::Reserved => true,
            Self::Public => false,
        }
    }
}

impl fmt::Display for IpClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loopback => "loopback",
            Self::ThisNetwork => "this-network",
            Self::Rfc1918Private => "RFC1918 private",
            Self::CarrierGradeNat => "carrier-grade NAT",
            Self::LinkLocal => "link-local",
            Self::UniqueLocal => "unique-local",
            Self::Multicast => "multicast",
            Self::Reserved => "reserved",
            Self::Public => "public",
        };
        f.write_str(label)
    }
}

/// Classifies an IPv4 address.
#[must_use]
pub fn classify_ipv4(addr: Ipv4Addr) -> IpClassification {
    match addr.octets() {
        [0, ..] => IpClassification::ThisNetwork,
        [10, ..] => IpClassification::Rfc1918Private,
        [100, b, ..] if (64..=127).contains(&b) => IpClassification::CarrierGradeNat,
        [127, ..] => IpClassification::Loopback,
        [169, 254, ..] => IpClassification::LinkLocal,
        [172, b, ..] if (16..=31).contains(&b) => IpClassification::Rfc1918Private,
        [192, 168, ..] => IpClassification::Rfc1918Private,
        [224..=239, ..] => IpClassification::Multicast,
        [240..=255, ..] => IpClassification::Reserved,
        _ => IpClassification::Public,
    }
}

/// Classifies an IPv6 address, unwrapping any embedded IPv4 first.
#[must_use]
pub fn classify_ipv6(addr: Ipv6Addr) -> IpClassification {
    if let Some(v4) = embedded_ipv4(addr) {
        return classify_ipv4(v4);
    }
    let segments = addr.segments();
    if addr.is_loopback() {
        IpClassification::Loopback
    } else if addr.is_unspecified() {
        IpClassification::ThisNetwork
    } else if segments[0] & 0xfe00 == 0xfc00 {
        IpClassification::UniqueLocal
    } else if segments[0] & 0xffc0 == 0xfe80 {
        IpClassification::LinkLocal
    } else if segments[0] & 0xffc0 == 0xfec0 {
        IpClassification::Reserved
    } else if segments[0] & 0xff00 == 0xff00 {
        IpClassification::Multicast
    } else {
        IpClassification::Public
    }
}

/// Classifies any IP address.
#[must_use]
pub fn classify_ip(addr: IpAddr) -> IpClassification {
    match addr {
        IpAddr::V4(v4) => classify_ipv4(v4),
        IpAddr::V6(v6) => classify_ipv6(v6),
    }
}

/// Extracts an IPv4 address carried inside an IPv6 one.
///
/// Covers IPv4-mapped `::ffff:0:0/96`, IPv4-compatible `::/96` (except `::`
/// and `::1`), NAT64 `64:ff9b::/96` and 6to4 `2002::/16`.
fn embedded_ipv4(addr: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return Some(v4);
    }
    let s = addr.segments();
    let low = Ipv4Addr::new(
        (s[6] >> 8) as u8,
        (s[6] & 0xff) as u8,
        (s[7] >> 8) as u8,
        (s[7] & 0xff) as u8,
    );
    match s {
        [0, 0, 0, 0, 0, 0, hi, lo] if hi != 0 || lo > 1 => Some(low),
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(low),
        [0x2002, a, b, ..] => Some(Ipv4Addr::new(
            (a >> 8) as u8,
            (a & 0xff) as u8,
            (b >> 8) as u8,
            (b & 0xff) as u8,
        )),
        _ => None,
    }
}

/// Strips brackets, port, zone id and trailing dot, then lowercases.
///
/// `"[::1]:8080"` becomes `"::1"`, `"Example.COM.:443"` becomes `"example.com"`.
#[must_use]
pub fn normalize_host(input: &str) -> String {
    let trimmed = input.trim();

    let host = if let Some(rest) = trimmed.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else {
        match trimmed.rsplit_once(':') {
            // A single colon is a port separator; more than one is bare IPv6.
            Some((host, port))
                if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
            {
                host
            }
            _ => trimmed,
        }
    };

    let host = host.split('%').next().unwrap_or(host);
    let host = host.trim_end_matches('.');
    host.trim().to_ascii_lowercase()
}

/// Parses an IPv4 literal the way `inet_aton` does.
///
/// Accepts one to four parts, each decimal, `0x` hex or leading-zero octal;
/// the last part fills the remaining bytes. This covers `127.0.0.1`,
/// `2130706433`, `0x7f000001`, `0177.0.0.1` and `127.1`.
#[must_use]
pub fn parse_ipv4_lenient(host: &str) -> Option<Ipv4Addr> {
    if host.is_empty() {
        return None;
    }
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 4 {
        return None;
    }
    let values = parts
        .iter()
        .map(|part| parse_ipv4_part(part))
        .collect::<Option<Vec<u64>>>()?;

    let (last, head) = values.split_last()?;
    if head.iter().any(|&v| v > 0xff) {
        return None;
    }
    let last_bits = 8 * (4 - head.len() as u32);
    if last_bits < 64 && *last >= (1u64 << last_bits) {
        return None;
    }

    let mut value: u32 = 0;
    for (i, &byte) in head.iter().enumerate() {
        value |= (byte as u32) << (24 - 8 * i as u32);
    }
    value |= *last as u32;
    Some(Ipv4Addr::from(value))
}

fn parse_ipv4_part(part: &str) -> Option<u64> {
    if part.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
    {
        (hex, 16)
    } else if part.len() > 1 && part.starts_with('0') {
        (&part[1..], 8)
    } else {
        (part, 10)
    };
    if digits.is_empty() {
        // "0x" alone is zero for inet_aton.
        return (radix == 16).then_some(0);
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix)
        .ok()
        .filter(|&v| v <= u64::from(u32::MAX))
}

/// Parses a normalized host as an IP literal, if it is one.
#[must_use]
pub fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    if let Ok(v6) = host.parse::<Ipv6Addr>() {
        return Some(IpAddr::V6(v6));
    }
    parse_ipv4_lenient(host).map(IpAddr::V4)
}

/// Names that mean "this machine" or the local link without any DNS.
#[must_use]
pub fn is_private_name(host: &str) -> bool {
    matches!(
        host,
        "localhost" | "localhost.localdomain" | "ip6-localhost" | "ip6-loopback" | "local"
    ) || host.ends_with(".localhost")
        || host.ends_with(".local")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> IpClassification {
        classify_ipv4(s.parse().unwrap())
    }

    #[test]
    fn rfc1918_boundaries() {
        assert_eq!(v4("172.15.255.255"), IpClassification::Public);
        assert_eq!(v4("172.16.0.0"), IpClassification::Rfc1918Private);
        assert_eq!(v4("172.31.255.255"), IpClassification::Rfc1918Private);
        assert_eq!(v4("172.32.0.0"), IpClassification::Public);
        assert_eq!(v4("9.255.255.255"), IpClassification::Public);
        assert_eq!(v4("10.0.0.0"), IpClassification::Rfc1918Private);
        assert_eq!(v4("10.255.255.255"), IpClassification::Rfc1918Private);
        assert_eq!(v4("11.0.0.0"), IpClassification::Public);
        assert_eq!(v4("192.167.255.255"), IpClassification::Public);
        assert_eq!(v4("192.168.0.0"), IpClassification::Rfc1918Private);
        assert_eq!(v4("192.169.0.0"), IpClassification::Public);
    }

    #[test]
    fn link_local_and_cgnat_boundaries() {
        assert_eq!(v4("169.253.255.255"), IpClassification::Public);
        assert_eq!(v4("169.254.0.0"), IpClassification::LinkLocal);
        assert_eq!(v4("169.254.169.254"), IpClassification::LinkLocal);
        assert_eq!(v4("169.255.0.0"), IpClassification::Public);
        assert_eq!(v4("100.63.255.255"), IpClassification::Public);
        assert_eq!(v4("100.64.0.0"), IpClassification::CarrierGradeNat);
        assert_eq!(v4("100.127.255.255"), IpClassification::CarrierGradeNat);
        assert_eq!(v4("100.128.0.0"), IpClassification::Public);
    }

    #[test]
    fn special_ranges() {
        assert_eq!(v4("0.0.0.0"), IpClassification::ThisNetwork);
        assert_eq!(v4("127.255.0.1"), IpClassification::Loopback);
        assert_eq!(v4("223.255.255.255"), IpClassification::Public);
        assert_eq!(v4("224.0.0.1"), IpClassification::Multicast);
        assert_eq!(v4("239.255.255.255"), IpClassification::Multicast);
        assert_eq!(v4("240.0.0.0"), IpClassification::Reserved);
        assert_eq!(v4("255.255.255.255"), IpClassification::Reserved);
        assert_eq!(v4("8.8.8.8"), IpClassification::Public);
    }

    #[test]
    fn ipv6_classes() {
        let v6 = |s: &str| classify_ipv6(s.parse().unwrap());
        assert_eq!(v6("::1"), IpClassification::Loopback);
        assert_eq!(v6("::"), IpClassification::ThisNetwork);
        assert_eq!(v6("fd12:3456::1"), IpClassification::UniqueLocal);
        assert_eq!(v6("fc00::"), IpClassification::UniqueLocal);
        assert_eq!(v6("fe80::1"), IpClassification::LinkLocal);
        assert_eq!(v6("febf::1"), IpClassification::LinkLocal);
        assert_eq!(v6("fec0::1"), IpClassification::Reserved);
        assert_eq!(v6("ff02::1"), IpClassification::Multicast);
        assert_eq!(v6("2606:4700::1111"), IpClassification::Public);
    }

    #[test]
    fn ipv6_embedded_ipv4() {
        let v6 = |s: &str| classify_ipv6(s.parse().unwrap());
        assert_eq!(v6("::ffff:127.0.0.1"), IpClassification::Loopback);
        assert_eq!(v6("::ffff:7f00:1"), IpClassification::Loopback);
        assert_eq!(v6("::ffff:a9fe:a9fe"), IpClassification::LinkLocal);
        assert_eq!(v6("::ffff:8.8.8.8"), IpClassification::Public);
        assert_eq!(v6("::10.0.0.1"), IpClassification::Rfc1918Private);
        assert_eq!(v6("64:ff9b::192.168.1.1"), IpClassification::Rfc1918Private);
        assert_eq!(v6("2002:7f00:1::"), IpClassification::Loopback);
    }

    #[test]
    fn lenient_ipv4_forms() {
        let loopback = Some(Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(parse_ipv4_lenient("127.0.0.1"), loopback);
        assert_eq!(parse_ipv4_lenient("2130706433"), loopback);
        assert_eq!(parse_ipv4_lenient("0x7f000001"), loopback);
        assert_eq!(parse_ipv4_lenient("0177.0.0.1"), loopback);
        assert_eq!(parse_ipv4_lenient("127.1"), loopback);
        assert_eq!(parse_ipv4_lenient("0x7f.0.0.0x1"), loopback);
    }

    #[test]
    fn lenient_ipv4_rejects_non_addresses() {
        for host in [
            "",
            "example.com",
            "1.2.3.4.5",
            "256.1.1.1",
            "4294967296",
            "08.1.1.1",
            "1..1",
            "1.2.3.256",
        ] {
            assert_eq!(parse_ipv4_lenient(host), None, "{host}");
        }
    }

    #[test]
    fn normalize_strips_decorations() {
        assert_eq!(normalize_host("  Example.COM.  "), "example.com");
        assert_eq!(normalize_host("example.com:8080"), "example.com");
        assert_eq!(normalize_host("[::1]:443"), "::1");
        assert_eq!(normalize_host("[fe80::1%eth0]"), "fe80::1");
        assert_eq!(normalize_host("fe80::1"), "fe80::1");
        assert_eq!(normalize_host("127.0.0.1:22"), "127.0.0.1");
        assert_eq!(normalize_host("localhost.."), "localhost");
        assert_eq!(normalize_host("127.0.0.1..."), "127.0.0.1");
    }

    #[test]
    fn private_names() {
        assert!(is_private_name("localhost"));
        assert!(is_private_name("api.localhost"));
        assert!(is_private_name("printer.local"));
        assert!(!is_private_name("localhost.example.com"));
        assert!(!is_private_name("example.com"));
    }

    #[test]
    fn only_public_is_not_private() {
        assert!(!IpClassification::Public.is_private());
        assert!(IpClassification::CarrierGradeNat.is_private());
        assert!(IpClassification::Reserved.is_private());
    }
}
