//! Router-level integration tests (SPEC_FULL.md §2.4): drive the full axum
//! `Router` in-process via `tower::ServiceExt::oneshot`, the way the teacher's
//! own `tests/integration_test.rs` drives its server — minus a bound socket,
//! since none of these assertions need a real TCP listener.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use veilrelay::core::config::{AppConfig, ProxyConfig};
use veilrelay::router::build_router;
use veilrelay::AppState;

fn test_state() -> AppState {
    AppState::new(
        AppConfig {
            host: "0.0.0.0".into(),
            port: 8080,
            target_site: "https://ex.com".into(),
            session_ttl_minutes: 30,
            session_cookie_name: "proxy_session".into(),
            is_production: false,
        },
        ProxyConfig {
            use_proxy: false,
            host: "gate.proxy.example".into(),
            port: 1080,
            protocol: "socks5".into(),
            base_user: "veilrelay".into(),
            password: "".into(),
            zone: "default".into(),
            region: "US".into(),
            session_time_minutes: 10,
        },
    )
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("\"healthy\""));
}

#[tokio::test]
async fn status_endpoint_reports_target_site() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("https://ex.com"));
}

#[tokio::test]
async fn landing_page_substitutes_target_site() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("https://ex.com"));
    assert!(!body.contains("__TARGET_SITE__"));
}

#[tokio::test]
async fn service_worker_is_served_with_no_store_cache_control() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/sw.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store"
    );
}

#[tokio::test]
async fn malformed_proxy_token_returns_400() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/p/not-valid-base64!!").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn valid_token_redirects_to_api_proxy() {
    let token = veilrelay::codec::encode("https://ex.com/page");
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri(format!("/p/{token}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(location, format!("/api/proxy?url={token}"));
}

#[tokio::test]
async fn external_alias_behaves_like_p_prefix() {
    let token = veilrelay::codec::encode("https://ex.com/page");
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri(format!("/external/{token}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn session_lifecycle_create_inspect_delete() {
    let app = build_router(test_state());

    let create_resp = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/api/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(create_resp.status(), StatusCode::OK);
    let set_cookie = create_resp.headers().get("set-cookie").unwrap().to_str().unwrap().to_string();
    let cookie_value = set_cookie.split(';').next().unwrap().to_string();

    let info_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/session")
                .header("cookie", &cookie_value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let info_body = body_string(info_resp).await;
    assert!(info_body.contains("\"hasSession\":true"));

    let delete_resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/session")
                .header("cookie", &cookie_value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn shorten_then_short_url_redirect_round_trips() {
    let app = build_router(test_state());

    let shorten_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/shorten")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url":"https://ex.com/long/path?a=1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(shorten_resp.status(), StatusCode::OK);
    let shorten_body = body_string(shorten_resp).await;
    let parsed: serde_json::Value = serde_json::from_str(&shorten_body).unwrap();
    let short_url = parsed["shortUrl"].as_str().unwrap().to_string();

    let redirect_resp = app
        .oneshot(Request::builder().uri(short_url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(redirect_resp.status(), StatusCode::FOUND);
    let location = redirect_resp.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.starts_with("/api/proxy?url="));
}

#[tokio::test]
async fn shorten_rejects_ssrf_targets() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/shorten")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url":"http://127.0.0.1/admin"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_asset_path_is_404() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/assets/does-not-exist.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
