//! CSP handling — unlike a merge/rewrite strategy, this rewriter's contract
//! (§4.5, §4.9) is to strip CSP entirely: `<meta http-equiv="...">` tags are
//! removed from rewritten HTML, the upstream `Content-Security-Policy`
//! header is never forwarded, and the router writes its own permissive
//! policy on the main page response so injected and proxied third-party
//! scripts can execute.

pub const PERMISSIVE_CSP: &str =
    "default-src * 'unsafe-inline' 'unsafe-eval' data: blob:; script-src * 'unsafe-inline' 'unsafe-eval' data: blob:; connect-src * data: blob:; img-src * data: blob:; style-src * 'unsafe-inline' data: blob:; frame-src *;";

/// Response headers that must never be forwarded to the browser (§4.9, §8
/// invariant 6), regardless of what the upstream sent.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "x-frame-options",
    "x-xss-protection",
];

pub fn is_stripped_header(name: &str) -> bool {
    STRIPPED_RESPONSE_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripped_header_match_is_case_insensitive() {
        assert!(is_stripped_header("Content-Security-Policy"));
        assert!(is_stripped_header("X-Frame-Options"));
        assert!(!is_stripped_header("Content-Type"));
    }
}
