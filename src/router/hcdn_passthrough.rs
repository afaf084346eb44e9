//! `ALL /hcdn-cgi/*` — transparent forward to the configured target site for
//! the narrow set of paths a site's own edge/CDN layer expects to own (§4.9).
//! No rewriting: body and most headers pass through untouched, only the CSP
//! family of response headers is stripped, matching every other response
//! path's trust boundary.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::core::AppState;
use crate::rewrite::csp::is_stripped_header;
use crate::upstream::dispatcher::FetchHeaders;

/// Headers besides the CSP family that must not pass through untouched.
/// `Dispatcher` auto-decompresses gzip/deflate/brotli bodies but leaves the
/// upstream's `Content-Encoding`/`Transfer-Encoding` headers as-is — forwarding
/// them here would claim the already-decoded body is still encoded.
fn is_passthrough_stripped_header(name: &str) -> bool {
    is_stripped_header(name)
        || name.eq_ignore_ascii_case("content-encoding")
        || name.eq_ignore_ascii_case("transfer-encoding")
}

pub async fn forward(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = match url::Url::parse(&state.config.target_site).and_then(|base| base.join(&format!("hcdn-cgi/{rest}"))) {
        Ok(u) => u.to_string(),
        Err(_) => return StatusCode::BAD_GATEWAY.into_response(),
    };

    let fetch_headers = FetchHeaders {
        user_agent: headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok()).map(String::from),
        accept: headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok()).map(String::from),
        accept_language: headers.get(axum::http::header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()).map(String::from),
        referer: None,
        cookie: headers.get(axum::http::header::COOKIE).and_then(|v| v.to_str().ok()).map(String::from),
    };

    let reqwest_method = match reqwest::Method::from_bytes(method.as_str().as_bytes()) {
        Ok(m) => m,
        Err(_) => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    let body_vec = (!body.is_empty()).then(|| body.to_vec());
    let username = state.sticky_username("hcdn-passthrough");

    match state.dispatcher.fetch(&target, reqwest_method, &fetch_headers, body_vec, &username).await {
        Ok(result) => {
            let mut response = (StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY), result.body).into_response();
            let out_headers = response.headers_mut();
            for (name, value) in result.headers.iter() {
                if !is_passthrough_stripped_header(name.as_str()) {
                    out_headers.append(name.clone(), value.clone());
                }
            }
            response
        }
        Err(e) => {
            tracing::warn!("hcdn-cgi passthrough failed for {}: {e}", target);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
