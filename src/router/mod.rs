//! Request router (C9) — the full HTTP surface in front of [`AppState`],
//! wired the way the teacher's `main.rs` builds its `Router`: routes first,
//! `CorsLayer`/`TraceLayer` last.

mod assets;
mod click_beacon;
mod hcdn_passthrough;
mod landing;
mod proxy;
mod session;
mod session_cookie;
mod shorturl;
mod status;

use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing::landing))
        .route("/sw.js", get(assets::service_worker))
        .route("/assets/{*path}", get(assets::static_asset))
        .route("/p/{*rest}", get(proxy::p_redirect))
        // Legacy alias (§9 Open Question): accepted on input, never produced
        // by any rewriter — routes through the same token redirect as `/p/`.
        .route("/external/{*rest}", get(proxy::p_redirect))
        .route(
            "/api/proxy",
            get(proxy::proxy_request).post(proxy::proxy_request),
        )
        .route(
            "/api/session",
            post(session::create_session)
                .get(session::session_info)
                .delete(session::delete_session),
        )
        .route("/api/status", get(status::status))
        .route("/api/health", get(status::health))
        .route("/api/shorten", post(shorturl::shorten))
        .route("/api/url-stats", get(shorturl::url_stats))
        .route("/api/click-beacon", post(click_beacon::click_beacon))
        .route("/hcdn-cgi/{*rest}", any(hcdn_passthrough::forward))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
