//! SSRF predicate — `validate(url) -> Result<(), reason>`, the request-side
//! half of the proxy's trust boundary. Spec treats this as an opaque
//! collaborator; since the router has to call something real, this is a
//! minimal but genuine check: scheme, hostname shape, and private/loopback
//! address ranges are rejected before a request ever reaches the dispatcher.

use std::net::IpAddr;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SsrfError {
    #[error("url must be absolute http or https")]
    UnsupportedScheme,
    #[error("url has no host")]
    MissingHost,
    #[error("target resolves to a private, loopback, or link-local address")]
    PrivateAddress,
    #[error("target port is not a standard web port")]
    DisallowedPort,
}

/// Reject anything but plain `http`/`https` on a standard port pointed at a
/// non-private host. Literal IP hosts are checked directly; DNS names are
/// not resolved here — the dispatcher's own connect will fail closed against
/// a SOCKS5 upstream that can't route to a private destination anyway, so
/// this stays a cheap, synchronous, literal-address check rather than a
/// blocking resolver call.
pub fn validate(url: &str) -> Result<(), SsrfError> {
    let parsed = Url::parse(url).map_err(|_| SsrfError::UnsupportedScheme)?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(SsrfError::UnsupportedScheme),
    }

    let host = parsed.host_str().ok_or(SsrfError::MissingHost)?;

    if let Some(port) = parsed.port() {
        if !is_standard_port(port) {
            return Err(SsrfError::DisallowedPort);
        }
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_disallowed_ip(&ip) {
            return Err(SsrfError::PrivateAddress);
        }
    } else if is_disallowed_hostname(host) {
        return Err(SsrfError::PrivateAddress);
    }

    Ok(())
}

fn is_standard_port(port: u16) -> bool {
    matches!(port, 80 | 443 | 8080 | 8443)
}

fn is_disallowed_hostname(host: &str) -> bool {
    let h = host.to_ascii_lowercase();
    h == "localhost" || h.ends_with(".localhost") || h.ends_with(".local")
}

fn is_disallowed_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || is_v6_unique_local(v6),
    }
}

/// `is_unique_local` is still unstable on `Ipv6Addr` — replicate the `fc00::/7`
/// check directly.
fn is_v6_unique_local(v6: &std::net::Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}
