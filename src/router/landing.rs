//! `GET /` — the landing page asset with the configured target site
//! substituted in, and `/sw.js` + `/assets/*` static asset serving (C8's
//! static half, alongside the runtime-injected scripts C5 writes into the
//! page itself).

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::core::AppState;

const LANDING_HTML: &str = include_str!("../../assets/landing.html");

pub async fn landing(State(state): State<AppState>) -> Response {
    let body = LANDING_HTML.replace("__TARGET_SITE__", &state.config.target_site);
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}
