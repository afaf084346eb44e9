//! `POST/GET/DELETE /api/session` — explicit session lifecycle management,
//! on top of the implicit get-or-create that `/api/proxy` already does on
//! every request (§6).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::core::types::{SessionCreatedResponse, SessionInfoResponse};
use crate::core::AppState;
use crate::router::session_cookie::{extract_session_id, session_clear_cookie, session_set_cookie};

pub async fn create_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = extract_session_id(&headers, &state.config.session_cookie_name);
    let session = state.sessions.get_or_create(existing.as_deref()).await;
    let ttl_secs = state.config.session_ttl().as_secs();

    let mut response = Json(SessionCreatedResponse {
        session_id: session.id.clone(),
        expires_in: ttl_secs,
    })
    .into_response();
    response
        .headers_mut()
        .insert(axum::http::header::SET_COOKIE, session_set_cookie(&state.config, &session.id));
    response
}

pub async fn session_info(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionInfoResponse> {
    let Some(id) = extract_session_id(&headers, &state.config.session_cookie_name) else {
        return Json(SessionInfoResponse {
            has_session: false,
            session_id: None,
            current_page: None,
        });
    };
    match state.sessions.get(&id).await {
        Some(session) => Json(SessionInfoResponse {
            has_session: true,
            session_id: Some(session.id),
            current_page: session.current_page,
        }),
        None => Json(SessionInfoResponse {
            has_session: false,
            session_id: None,
            current_page: None,
        }),
    }
}

pub async fn delete_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = extract_session_id(&headers, &state.config.session_cookie_name) {
        state.sessions.delete(&id).await;
    }
    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .insert(axum::http::header::SET_COOKIE, session_clear_cookie(&state.config));
    response
}
