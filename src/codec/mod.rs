//! URL codec (C1) — bijective URL-safe base64 between an absolute external URL
//! and the on-origin path token used in `/p/<token>`.
//!
//! `encode`/`decode` are pure and total over their respective domains: every
//! absolute URL has an encoding, and every token produced by `encode` decodes
//! back to the same URL. `decode` is the only fallible direction; malformed
//! input surfaces as [`CodecError::MalformedToken`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed token")]
    MalformedToken,
}

/// UTF-8 serialize `url`, standard base64, then `+`→`-`, `/`→`_`, strip `=`.
pub fn encode(url: &str) -> String {
    STANDARD
        .encode(url.as_bytes())
        .replace('+', "-")
        .replace('/', "_")
        .trim_end_matches('=')
        .to_string()
}

/// Inverse of [`encode`]. Fails with `MalformedToken` if the token isn't
/// valid base64 after repadding, isn't valid UTF-8, or doesn't decode to a
/// syntactically valid absolute URL.
pub fn decode(token: &str) -> Result<String, CodecError> {
    let mut restored = token.replace('-', "+").replace('_', "/");
    let pad = (4 - restored.len() % 4) % 4;
    restored.push_str(&"=".repeat(pad));

    let bytes = STANDARD
        .decode(restored.as_bytes())
        .map_err(|_| CodecError::MalformedToken)?;
    let url = String::from_utf8(bytes).map_err(|_| CodecError::MalformedToken)?;
    url::Url::parse(&url).map_err(|_| CodecError::MalformedToken)?;
    Ok(url)
}

/// Validity probe used to dispatch malformed `/p/<token>` paths through the
/// relative-path repair codepath instead of `decode` (§4.9). Not a substitute
/// for `decode` — it's a cheap shape check only.
pub fn looks_like_token(e: &str) -> bool {
    if e.len() < 10 {
        return false;
    }
    if !e
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return false;
    }
    // Filename-shaped: has a dot, but no underscore and is short.
    if e.contains('.') && !e.contains('_') && e.len() < 20 {
        return false;
    }
    true
}

/// Resolve a possibly-relative URL reference against a base, treating
/// `//host/...` as `https://host/...` the way browsers resolve protocol-
/// relative URLs. Returns `None` when resolution fails.
pub fn resolve_against_base(value: &str, base: &str) -> Option<url::Url> {
    let trimmed = value.trim();
    if trimmed.starts_with("//") {
        return url::Url::parse(&format!("https:{trimmed}")).ok();
    }
    let base_url = url::Url::parse(base).ok()?;
    base_url.join(trimmed).ok()
}

/// Resolve `value` against `base` and return the `/p/<token>` form, or the
/// original value unchanged when it's skippable or fails to resolve. This is
/// the single chokepoint every rewriter (HTML, CSS, JS) routes through.
pub fn rewrite_url(value: &str, base: &str) -> String {
    if is_skippable_url(value) {
        return value.to_string();
    }
    match resolve_against_base(value, base) {
        Some(resolved) => format!("/p/{}", encode(resolved.as_str())),
        None => value.to_string(),
    }
}

/// Values that must never be rewritten into a proxy path — left verbatim.
pub fn is_skippable_url(value: &str) -> bool {
    let v = value.trim();
    if v.is_empty() {
        return true;
    }
    let lower = v.to_ascii_lowercase();
    v.starts_with('#')
        || lower.starts_with("data:")
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("about:")
        || v.starts_with("/p/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_basic() {
        let url = "https://ex.com/page?q=1&x=2";
        let token = encode(url);
        assert_eq!(decode(&token).unwrap(), url);
    }

    #[test]
    fn round_trip_spec_example() {
        // §8 scenario 1
        let url = "https://ex.com/page";
        assert_eq!(encode(url), "aHR0cHM6Ly9leC5jb20vcGFnZQ");
    }

    #[test]
    fn encoded_tokens_are_url_safe() {
        // base64 of a string with many '/' and '+' bytes in it
        let url = "https://ex.com/a/b/c?x=abc+def/ghi==";
        let token = encode(url);
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
        assert_eq!(decode(&token).unwrap(), url);
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert_eq!(decode("not valid base64!!"), Err(CodecError::MalformedToken));
    }

    #[test]
    fn decode_rejects_non_url_payload() {
        let token = encode("not a url at all");
        assert_eq!(decode(&token), Err(CodecError::MalformedToken));
    }

    #[test]
    fn looks_like_token_accepts_long_opaque_strings() {
        assert!(looks_like_token("aHR0cHM6Ly9leC5jb20vcGFnZQ"));
        assert!(looks_like_token(&"a".repeat(25)));
    }

    #[test]
    fn looks_like_token_rejects_filenames() {
        assert!(!looks_like_token("favicon.ico"));
        assert!(!looks_like_token("style.css"));
    }

    #[test]
    fn looks_like_token_accepts_filename_shaped_with_underscore_or_long() {
        assert!(looks_like_token("some_file.css"));
        assert!(looks_like_token(&format!("{}.css", "a".repeat(20))));
    }

    #[test]
    fn looks_like_token_rejects_short_strings() {
        assert!(!looks_like_token("abc"));
    }

    #[test]
    fn protocol_relative_resolves_to_https() {
        let resolved = resolve_against_base("//cdn.ex.com/lib.js", "https://ex.com/page").unwrap();
        assert_eq!(resolved.as_str(), "https://cdn.ex.com/lib.js");
    }

    #[test]
    fn relative_resolves_against_base() {
        let resolved = resolve_against_base("/about", "https://ex.com/page").unwrap();
        assert_eq!(resolved.as_str(), "https://ex.com/about");
    }

    #[test]
    fn rewrite_url_produces_proxy_path() {
        let rewritten = rewrite_url("/about", "https://ex.com/page");
        assert_eq!(rewritten, format!("/p/{}", encode("https://ex.com/about")));
    }

    #[test]
    fn rewrite_url_leaves_skippable_values_alone() {
        assert_eq!(rewrite_url("data:text/plain,hi", "https://ex.com/"), "data:text/plain,hi");
        assert_eq!(rewrite_url("#frag", "https://ex.com/"), "#frag");
    }

    #[test]
    fn skippable_values() {
        assert!(is_skippable_url(""));
        assert!(is_skippable_url("#top"));
        assert!(is_skippable_url("data:text/plain,hi"));
        assert!(is_skippable_url("javascript:void(0)"));
        assert!(is_skippable_url("mailto:a@b.com"));
        assert!(is_skippable_url("tel:+1234567890"));
        assert!(is_skippable_url("about:blank"));
        assert!(is_skippable_url("/p/aHR0cHM6Ly9leC5jb20"));
        assert!(!is_skippable_url("https://ex.com/page"));
    }
}
