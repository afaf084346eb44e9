//! Wire types for the proxy's own JSON endpoints (§6 external interfaces).
//! `ErrorResponse` lives in [`crate::core::error`] since it's coupled to the
//! error taxonomy; everything here is a plain request/response DTO.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    #[serde(rename = "hasSession")]
    pub has_session: bool,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "currentPage", skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProxyStatus {
    pub configured: bool,
    pub host: String,
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub proxy: ProxyStatus,
    #[serde(rename = "targetSite")]
    pub target_site: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub hash: String,
    #[serde(rename = "shortUrl")]
    pub short_url: String,
}

#[derive(Debug, Serialize)]
pub struct UrlStatsResponse {
    #[serde(rename = "totalUrls")]
    pub total_urls: usize,
    #[serde(rename = "maxPathLength")]
    pub max_path_length: usize,
    #[serde(rename = "ttlMinutes")]
    pub ttl_minutes: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: String,
}
