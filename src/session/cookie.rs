//! RFC 6265 cookie representation and domain/path matching.
//!
//! Re-expressed as a tagged record with explicit fields (rather than the
//! dynamically-typed parser the source used) — see
//! <https://tools.ietf.org/html/rfc6265>. Matching logic mirrors the
//! `domain_match`/`path_match`/`appropriate_for_url` triad from a Servo-style
//! cookie jar.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single stored cookie, scoped to a declared (or host-only) domain.
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// `None` means a session cookie (no explicit expiry).
    pub expires_at: Option<u64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    /// True when no `Domain` attribute was present on the `Set-Cookie`.
    pub host_only: bool,
}

impl Cookie {
    /// Parse a single `Set-Cookie` header value, resolving domain/path
    /// defaults against the origin host that emitted it.
    pub fn parse(raw: &str, origin_host: &str, request_path: &str) -> Option<Cookie> {
        let mut parts = raw.split(';');
        let name_value = parts.next()?.trim();
        let (name, value) = name_value.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();

        let mut domain: Option<String> = None;
        let mut path: Option<String> = None;
        let mut max_age: Option<i64> = None;
        let mut expires: Option<u64> = None;
        let mut secure = false;
        let mut http_only = false;
        let mut same_site: Option<String> = None;

        for attr in parts {
            let attr = attr.trim();
            if attr.is_empty() {
                continue;
            }
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => {
                    let d = val.trim();
                    if !d.is_empty() {
                        domain = Some(d.trim_start_matches('.').to_ascii_lowercase());
                    }
                }
                "path" => {
                    let p = val.trim();
                    if p.starts_with('/') {
                        path = Some(p.to_string());
                    }
                }
                "max-age" => max_age = val.trim().parse::<i64>().ok(),
                "expires" => {
                    expires = chrono::NaiveDateTime::parse_from_str(
                        val.trim(),
                        "%a, %d %b %Y %H:%M:%S GMT",
                    )
                    .ok()
                    .map(|dt| dt.and_utc().timestamp().max(0) as u64);
                }
                "secure" => secure = true,
                "httponly" => http_only = true,
                "samesite" => same_site = Some(val.trim().to_string()),
                _ => {}
            }
        }

        let host_only = domain.is_none();
        let effective_domain = domain.unwrap_or_else(|| origin_host.to_ascii_lowercase());
        let effective_path = path.unwrap_or_else(|| default_path(request_path));

        // Max-Age overrides Expires (§3 data model). A non-positive Max-Age
        // means "delete on next sweep" — represent as an already-expired cookie.
        let expires_at = match max_age {
            Some(secs) if secs <= 0 => Some(0),
            Some(secs) => Some(now_secs().saturating_add(secs as u64)),
            None => expires,
        };

        Some(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: effective_domain,
            path: effective_path,
            expires_at,
            secure,
            http_only,
            same_site,
            host_only,
        })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now_secs())
    }

    /// RFC 6265 §5.1.3 domain-match: exact match, or `string` is a
    /// subdomain of `domain_string` separated by a literal dot (never for
    /// IP-literal hosts).
    pub fn domain_match(host: &str, domain_string: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain_string = domain_string.to_ascii_lowercase();
        if host == domain_string {
            return true;
        }
        if !host.ends_with(&domain_string) {
            return false;
        }
        let suffix_start = host.len() - domain_string.len();
        if suffix_start == 0 || host.as_bytes()[suffix_start - 1] != b'.' {
            return false;
        }
        host.parse::<Ipv4Addr>().is_err() && host.parse::<Ipv6Addr>().is_err()
    }

    /// RFC 6265 §5.1.4 path-match.
    pub fn path_match(request_path: &str, cookie_path: &str) -> bool {
        request_path == cookie_path
            || (request_path.starts_with(cookie_path)
                && (cookie_path.ends_with('/')
                    || request_path[cookie_path.len()..].starts_with('/')))
    }

    pub fn matches(&self, host: &str, path: &str) -> bool {
        if self.is_expired() {
            return false;
        }
        let domain_ok = if self.host_only {
            self.domain.eq_ignore_ascii_case(host)
        } else {
            Cookie::domain_match(host, &self.domain)
        };
        domain_ok && Cookie::path_match(path, &self.path)
    }
}

/// RFC 6265 §5.1.4 default-path algorithm.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_cookie() {
        let c = Cookie::parse("id=42; Domain=.ex.com; Path=/; Max-Age=60", "ex.com", "/next").unwrap();
        assert_eq!(c.name, "id");
        assert_eq!(c.value, "42");
        assert_eq!(c.domain, "ex.com");
        assert!(!c.host_only);
        assert!(c.expires_at.is_some());
    }

    #[test]
    fn parse_host_only_defaults_path() {
        let c = Cookie::parse("sess=abc", "ex.com", "/a/b/c").unwrap();
        assert!(c.host_only);
        assert_eq!(c.domain, "ex.com");
        assert_eq!(c.path, "/a/b");
    }

    #[test]
    fn max_age_zero_is_expired_immediately() {
        let c = Cookie::parse("id=42; Max-Age=0", "ex.com", "/").unwrap();
        assert!(c.is_expired());
    }

    #[test]
    fn domain_match_subdomain() {
        assert!(Cookie::domain_match("sub.ex.com", "ex.com"));
        assert!(Cookie::domain_match("ex.com", "ex.com"));
        assert!(!Cookie::domain_match("notex.com", "ex.com"));
        assert!(!Cookie::domain_match("ex.com.evil.com", "ex.com"));
    }

    #[test]
    fn domain_match_rejects_ip_literal() {
        assert!(!Cookie::domain_match("1.2.3.4", "3.4"));
    }

    #[test]
    fn path_match_prefix() {
        assert!(Cookie::path_match("/a/b/c", "/a/b"));
        assert!(Cookie::path_match("/a/b", "/a/b"));
        assert!(!Cookie::path_match("/ab", "/a"));
    }

    #[test]
    fn matches_combines_domain_and_path_and_expiry() {
        let c = Cookie::parse("id=1; Domain=ex.com; Path=/app", "ex.com", "/").unwrap();
        assert!(c.matches("www.ex.com", "/app/page"));
        assert!(!c.matches("other.com", "/app/page"));
        assert!(!c.matches("www.ex.com", "/other"));
    }
}
