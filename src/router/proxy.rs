//! `GET /p/{*rest}` and `GET|POST /api/proxy?url=<token>` — the router's
//! core pipeline (§4.9): decode, SSRF-check, bind a session to a sticky
//! upstream identity, dispatch through C3, classify the response, rewrite
//! HTML/CSS/JS bodies, and re-serve from the proxy's own origin.

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adframe::select_mode;
use crate::codec;
use crate::core::error::ProxyError;
use crate::core::types::ProxyQuery;
use crate::core::AppState;
use crate::router::session_cookie::{extract_session_id, session_set_cookie};
use crate::rewrite::csp::PERMISSIVE_CSP;
use crate::rewrite::{rewrite_css, rewrite_html, rewrite_js};
use crate::ssrf;
use crate::upstream::classifier::{classify_by_content_type, classify_by_suffix, Classification};
use crate::upstream::dispatcher::FetchHeaders;

/// Headers copied verbatim from the upstream response onto a rewritten (or
/// passed-through) body, beyond the `Content-Type` the classifier already
/// determined (§4.9 response header whitelist).
const FORWARDED_RESPONSE_HEADERS: &[HeaderName] = &[header::CACHE_CONTROL, header::ETAG, header::LAST_MODIFIED];

pub async fn p_redirect(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ProxyError> {
    if let Some(hash) = rest.strip_prefix("s/") {
        let url = state.short_urls.lookup(hash).await.ok_or(ProxyError::NotFound)?;
        return Ok(redirect_to(StatusCode::FOUND, &format!("/api/proxy?url={}", codec::encode(&url))));
    }

    codec::decode(&rest)?;
    let mut location = format!("/api/proxy?url={rest}");
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        location.push('&');
        location.push_str(&q);
    }
    Ok(redirect_to(StatusCode::FOUND, &location))
}

pub async fn proxy_request(
    State(state): State<AppState>,
    method: Method,
    headers: axum::http::HeaderMap,
    Query(query): Query<ProxyQuery>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let target_url = codec::decode(&query.url)?;
    ssrf::validate(&target_url)?;

    let parsed = url::Url::parse(&target_url).map_err(|_| ProxyError::MalformedToken)?;
    let host = parsed.host_str().ok_or(ProxyError::MalformedToken)?.to_string();
    let path = parsed.path().to_string();

    let session_id = extract_session_id(&headers, &state.config.session_cookie_name);
    let session = state.sessions.get_or_create(session_id.as_deref()).await;
    let username = state.sticky_username(&session.id);

    let cookie_header = state.sessions.cookies_for(&session.id, &host, &path).await;
    let fetch_headers = FetchHeaders {
        user_agent: header_str(&headers, HeaderName::from_static("x-original-ua"))
            .or_else(|| header_str(&headers, header::USER_AGENT)),
        accept: header_str(&headers, header::ACCEPT),
        accept_language: header_str(&headers, header::ACCEPT_LANGUAGE),
        referer: session.current_page.clone(),
        cookie: (!cookie_header.is_empty()).then_some(cookie_header),
    };

    let reqwest_method = reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET);
    let body_vec = (!body.is_empty()).then(|| body.to_vec());

    let result = state
        .dispatcher
        .fetch(&target_url, reqwest_method, &fetch_headers, body_vec, &username)
        .await
        .map_err(ProxyError::Upstream)?;

    let set_cookies: Vec<String> = result
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(String::from))
        .collect();
    state.sessions.store_cookies(&session.id, &host, &path, &set_cookies).await;

    if result.is_redirect {
        let proxy_location = result
            .redirect_location
            .as_deref()
            .and_then(|location| url::Url::parse(&target_url).ok()?.join(location).ok())
            .map(|resolved| format!("/p/{}", codec::encode(resolved.as_str())))
            .unwrap_or_else(|| "/".to_string());
        let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::FOUND);
        let mut response = redirect_to(status, &proxy_location);
        apply_session_cookie(&mut response, &state, &session.id);
        return Ok(response);
    }

    if result.status >= 400 {
        return Err(ProxyError::UpstreamStatus { status: result.status, body: result.body });
    }

    let content_type = result
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let classification = classify_by_suffix(&path).unwrap_or_else(|| classify_by_content_type(&content_type));

    let mut response = match classification {
        Classification::Html => {
            let text = String::from_utf8_lossy(&result.body);
            let mode = select_mode(&target_url);
            let rewritten = rewrite_html(&text, &target_url, mode);
            state.sessions.set_current_page(&session.id, target_url.clone()).await;
            (StatusCode::OK, rewritten).into_response()
        }
        Classification::Css => {
            let text = String::from_utf8_lossy(&result.body);
            (StatusCode::OK, rewrite_css(&text, &target_url)).into_response()
        }
        Classification::Js => {
            let text = String::from_utf8_lossy(&result.body);
            (StatusCode::OK, rewrite_js(&text, &target_url)).into_response()
        }
        _ => (StatusCode::OK, result.body).into_response(),
    };

    let out_headers = response.headers_mut();
    out_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    for name in FORWARDED_RESPONSE_HEADERS {
        if let Some(value) = result.headers.get(name) {
            out_headers.insert(name.clone(), value.clone());
        }
    }
    if classification == Classification::Html {
        out_headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(PERMISSIVE_CSP));
    }
    apply_session_cookie(&mut response, &state, &session.id);

    Ok(response)
}

fn header_str(headers: &axum::http::HeaderMap, name: HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(String::from)
}

fn redirect_to(status: StatusCode, location: &str) -> Response {
    Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

fn apply_session_cookie(response: &mut Response, state: &AppState, session_id: &str) {
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_set_cookie(&state.config, session_id));
}
