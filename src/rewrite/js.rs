//! JS rewriter (C7) — deliberately narrow, regex-based rewrite of absolute
//! URLs that appear as string/template literals in inline or proxied
//! scripts (§4.7, §9 Design Notes). A pack rewriter in this corpus reaches
//! for a full SWC `VisitMut` AST transform for this; that's the wrong shape
//! here — §9 explicitly calls for matching only allow-listed third-party
//! domains inside literals, not a general-purpose script transform, so this
//! stays at the regex/string level.

use std::sync::OnceLock;

use regex::Regex;

use crate::codec::rewrite_url;

/// Third-party domains known to be embedded as literal URLs in page scripts
/// (analytics beacons, ad tags, CDNs) and therefore worth rewriting so they
/// route back through the proxy. Anything else in a script is left alone —
/// rewriting arbitrary script logic is out of scope by design.
const ALLOWED_DOMAINS: &[&str] = &[
    "googletagmanager.com",
    "google-analytics.com",
    "googlesyndication.com",
    "googleadservices.com",
    "doubleclick.net",
    "facebook.net",
    "connect.facebook.net",
    "cdn.jsdelivr.net",
    "cdnjs.cloudflare.com",
    "unpkg.com",
];

fn string_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(['"`])(https?:)?//([a-zA-Z0-9.-]+)((?:/[^'"`\s]*)?)\1"#).unwrap()
    })
}

/// Rewrite allow-listed absolute and protocol-relative URLs found inside
/// string and template literals. Everything else in the script — identifiers,
/// object literals, arbitrary string content — passes through untouched.
pub fn rewrite_js(js: &str, base: &str) -> String {
    string_url_pattern()
        .replace_all(js, |caps: &regex::Captures| {
            let quote = &caps[1];
            let host = &caps[3];
            let rest = &caps[4];

            if !is_allowed_domain(host) {
                return caps[0].to_string();
            }

            let scheme = caps.get(2).map(|m| m.as_str()).unwrap_or("https:");
            let full = if caps.get(2).is_some() {
                format!("{scheme}//{host}{rest}")
            } else {
                format!("https://{host}{rest}")
            };
            format!("{quote}{}{quote}", rewrite_url(&full, base))
        })
        .into_owned()
}

fn is_allowed_domain(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    ALLOWED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    const BASE: &str = "https://ex.com/page";

    #[test]
    fn rewrites_allowlisted_absolute_url() {
        let js = r#"var s = "https://www.googletagmanager.com/gtag/js";"#;
        let result = rewrite_js(js, BASE);
        assert!(result.contains(&format!(
            "/p/{}",
            codec::encode("https://www.googletagmanager.com/gtag/js")
        )));
    }

    #[test]
    fn rewrites_protocol_relative_allowlisted_url() {
        let js = r#"load("//connect.facebook.net/en_US/sdk.js");"#;
        let result = rewrite_js(js, BASE);
        assert!(result.contains(&format!(
            "/p/{}",
            codec::encode("https://connect.facebook.net/en_US/sdk.js")
        )));
    }

    #[test]
    fn leaves_non_allowlisted_url_untouched() {
        let js = r#"fetch("https://internal-api.example-corp.test/v1/data");"#;
        let result = rewrite_js(js, BASE);
        assert_eq!(result, js);
    }

    #[test]
    fn leaves_arbitrary_strings_untouched() {
        let js = r#"const greeting = "hello world"; function f(x) { return x + 1; }"#;
        let result = rewrite_js(js, BASE);
        assert_eq!(result, js);
    }

    #[test]
    fn handles_template_literal_backticks() {
        let js = r#"const u = `https://cdn.jsdelivr.net/npm/pkg@1/index.js`;"#;
        let result = rewrite_js(js, BASE);
        assert!(result.contains(&format!(
            "/p/{}",
            codec::encode("https://cdn.jsdelivr.net/npm/pkg@1/index.js")
        )));
    }

    #[test]
    fn idempotent_on_already_proxied_urls() {
        let js = r#"var s = "https://www.googletagmanager.com/gtag/js";"#;
        let first = rewrite_js(js, BASE);
        let second = rewrite_js(&first, BASE);
        assert_eq!(first, second);
    }
}
