//! `POST /api/click-beacon` — the server-side half of C11's ad-iframe
//! subprotocol; the heavy lifting lives in [`crate::adframe::resolve_click`],
//! this handler only binds it to a session's sticky SOCKS5 identity.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::adframe::{resolve_click, ClickBeaconRequest, ClickBeaconResponse};
use crate::core::AppState;
use crate::router::session_cookie::extract_session_id;

pub async fn click_beacon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<ClickBeaconRequest>,
) -> Json<ClickBeaconResponse> {
    let session_id = extract_session_id(&headers, &state.config.session_cookie_name);
    let session = state.sessions.get_or_create(session_id.as_deref()).await;

    if request.cookies.is_none() {
        if let Ok(click_host) = url::Url::parse(&request.click_url).map(|u| u.host_str().unwrap_or("").to_string()) {
            let cookies = state.sessions.cookies_for(&session.id, &click_host, "/").await;
            if !cookies.is_empty() {
                request.cookies = Some(cookies);
            }
        }
    }

    let username = state.sticky_username(&session.id);
    let response = resolve_click(&state.dispatcher, &username, &request).await;

    if !response.set_cookies.is_empty() {
        if let Some(host) = url::Url::parse(&response.destination).ok().and_then(|u| u.host_str().map(String::from)) {
            state.sessions.store_cookies(&session.id, &host, "/", &response.set_cookies).await;
        }
    }

    Json(response)
}
