//! Error taxonomy (§7) — the router is the single error boundary; every
//! component returns a structured error that collapses here into a status
//! code and a `{ error, message?, url? }` JSON body, the same
//! `(StatusCode, Json<ErrorResponse>)` shape the teacher's handlers use.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::codec::CodecError;
use crate::ssrf::SsrfError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid encoded url")]
    MalformedToken,

    #[error("request rejected: {0}")]
    SsrfRejected(#[from] SsrfError),

    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("not found")]
    NotFound,

    #[error("upstream error: {0}")]
    Upstream(anyhow::Error),

    #[error("upstream returned {status}")]
    UpstreamStatus { status: u16, body: Vec<u8> },

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<CodecError> for ProxyError {
    fn from(_: CodecError) -> Self {
        ProxyError::MalformedToken
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::MalformedToken => {
                respond(StatusCode::BAD_REQUEST, "invalid_encoded_url", None, None)
            }
            ProxyError::SsrfRejected(reason) => {
                respond(StatusCode::BAD_REQUEST, "request_rejected", Some(reason.to_string()), None)
            }
            ProxyError::MissingParam(name) => respond(
                StatusCode::BAD_REQUEST,
                "missing_parameter",
                Some(format!("missing required parameter: {name}")),
                None,
            ),
            ProxyError::NotFound => respond(StatusCode::NOT_FOUND, "not_found", None, None),
            ProxyError::Upstream(e) => {
                tracing::warn!("upstream error: {e}");
                respond(StatusCode::BAD_GATEWAY, "upstream_error", Some(e.to_string()), None)
            }
            ProxyError::UpstreamStatus { status, body } => {
                let status_code =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status_code, body).into_response()
            }
            ProxyError::Internal(e) => {
                tracing::error!("internal error: {e}");
                respond(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        }
    }
}

fn respond(status: StatusCode, error: &str, message: Option<String>, url: Option<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message,
            url,
        }),
    )
        .into_response()
}
