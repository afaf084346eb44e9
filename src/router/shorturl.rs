//! `POST /api/shorten`, `GET /api/url-stats` — the HTTP surface over C10's
//! [`ShortUrlTable`](crate::shorturl::ShortUrlTable).

use axum::extract::State;
use axum::Json;

use crate::core::error::ProxyError;
use crate::core::types::{ShortenRequest, ShortenResponse, UrlStatsResponse};
use crate::core::AppState;
use crate::ssrf;

const SHORT_PATH_PREFIX: &str = "/p/s/";

pub async fn shorten(
    State(state): State<AppState>,
    Json(request): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, ProxyError> {
    ssrf::validate(&request.url)?;
    let hash = state.short_urls.shorten(&request.url).await;
    Ok(Json(ShortenResponse {
        short_url: format!("{SHORT_PATH_PREFIX}{hash}"),
        hash,
    }))
}

pub async fn url_stats(State(state): State<AppState>) -> Json<UrlStatsResponse> {
    Json(UrlStatsResponse {
        total_urls: state.short_urls.len().await,
        max_path_length: SHORT_PATH_PREFIX.len() + 12,
        ttl_minutes: state.config.session_ttl_minutes,
    })
}
