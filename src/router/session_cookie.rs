//! Small helper shared by the proxy and session handlers: reading the
//! browser's own session-identity cookie off the inbound `Cookie` header and
//! writing it back on the way out. This is a different concern from
//! [`crate::session::cookie::Cookie`] (the per-upstream-domain cookie jar
//! stored inside a [`crate::session::Session`]) — this one cookie always
//! lives at the proxy's own origin.

use axum::http::{HeaderMap, HeaderValue};

use crate::core::config::AppConfig;

pub fn extract_session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k == cookie_name).then(|| v.to_string())
    })
}

/// Build the `Set-Cookie` value for the proxy's own session-identity cookie
/// (§6: `HttpOnly; SameSite=Lax; Max-Age=<ttl>`, plus `Secure` in production).
pub fn session_set_cookie(config: &AppConfig, session_id: &str) -> HeaderValue {
    let ttl_secs = config.session_ttl().as_secs();
    let mut value = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.session_cookie_name, session_id, ttl_secs
    );
    if config.is_production {
        value.push_str("; Secure");
    }
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value that immediately expires the session cookie (§6 DELETE
/// `/api/session`).
pub fn session_clear_cookie(config: &AppConfig) -> HeaderValue {
    let mut value = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", config.session_cookie_name);
    if config.is_production {
        value.push_str("; Secure");
    }
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}
