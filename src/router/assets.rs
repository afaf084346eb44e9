//! Static text assets for the runtime interception layer (C8): the service
//! worker source and the scripts `rewrite::html::inject_runtime` references
//! by path. Embedded at compile time — nothing here is ever read from disk
//! at runtime.

use axum::extract::Path;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

const SERVICE_WORKER_JS: &str = include_str!("../../assets/sw.js");
const RUNTIME_JS: &str = include_str!("../../assets/runtime.js");
const WEBRTC_NEUTRALIZE_JS: &str = include_str!("../../assets/webrtc-neutralize.js");
const ADFRAME_RUNTIME_JS: &str = include_str!("../../assets/adframe-runtime.js");

fn js_response(body: &'static str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/javascript; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
    response
}

pub async fn service_worker() -> Response {
    let mut response = js_response(SERVICE_WORKER_JS);
    let headers = response.headers_mut();
    headers.insert("Service-Worker-Allowed", HeaderValue::from_static("/"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    match path.as_str() {
        "runtime.js" => js_response(RUNTIME_JS),
        "webrtc-neutralize.js" => js_response(WEBRTC_NEUTRALIZE_JS),
        "adframe-runtime.js" => js_response(ADFRAME_RUNTIME_JS),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
