//! Upstream dispatcher (C3) — builds per-session SOCKS5 credentials and
//! executes the outbound HTTP request with retries, redirect capture, and
//! transparent gzip/deflate/brotli decompression.
//!
//! Retry bookkeeping (exponential back-off, failure counting) follows the
//! shape of `ProxyManager::record_proxy_result`; credentials are never
//! logged in full, mirroring `mask_proxy_credentials`.

use std::time::Duration;

use anyhow::{anyhow, Result};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::warn;

use crate::core::config::ProxyConfig;

const RETRYABLE_STATUSES: [u16; 5] = [408, 429, 502, 503, 504];
const MAX_RETRIES: u32 = 3;
const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// The deliberately narrow set of outbound headers the dispatcher builds
/// (§4.3). Nothing else is forwarded: Host, Origin, X-Forwarded-For and the
/// browser's own Referer are never emitted.
#[derive(Debug, Clone, Default)]
pub struct FetchHeaders {
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    pub referer: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub final_url: String,
    pub redirect_location: Option<String>,
    pub is_redirect: bool,
}

pub struct Dispatcher {
    proxy: ProxyConfig,
}

impl Dispatcher {
    pub fn new(proxy: ProxyConfig) -> Self {
        Dispatcher { proxy }
    }

    fn build_client(&self, socks_username: &str) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(PER_ATTEMPT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .gzip(true)
            .deflate(true)
            .brotli(true);

        if self.proxy.use_proxy {
            let proxy_url = format!("socks5://{}:{}", self.proxy.host, self.proxy.port);
            let socks_proxy = reqwest::Proxy::all(&proxy_url)
                .map_err(|e| anyhow!("invalid SOCKS5 proxy url: {e}"))?
                .basic_auth(socks_username, &self.proxy.password);
            builder = builder.proxy(socks_proxy);
        }

        Ok(builder.build()?)
    }

    /// Execute `method url` through the sticky SOCKS5 upstream (or directly,
    /// when `USE_PROXY` is off), with retry/back-off per §4.3.
    pub async fn fetch(
        &self,
        url: &str,
        method: Method,
        headers: &FetchHeaders,
        body: Option<Vec<u8>>,
        socks_username: &str,
    ) -> Result<FetchResult> {
        let client = self.build_client(socks_username)?;

        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            multiplier: 2.0,
            max_interval: Duration::from_secs(5),
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut req = client.request(method.clone(), url);
            req = apply_headers(req, headers);
            if let Some(b) = &body {
                req = req.body(b.clone());
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if RETRYABLE_STATUSES.contains(&status) && attempt <= MAX_RETRIES {
                        let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(5));
                        warn!(
                            "upstream {} returned {} (attempt {}/{}), retrying in {:?}",
                            masked(url),
                            status,
                            attempt,
                            MAX_RETRIES,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return to_fetch_result(resp).await;
                }
                Err(e) => {
                    if attempt <= MAX_RETRIES && is_retryable_error(&e) {
                        let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(5));
                        warn!(
                            "upstream fetch error for {} (attempt {}/{}): {} — retrying in {:?}",
                            masked(url),
                            attempt,
                            MAX_RETRIES,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(anyhow!(
                        "upstream request to {} failed after {} attempt(s): {}",
                        masked(url),
                        attempt,
                        e
                    ));
                }
            }
        }
    }
}

fn apply_headers(mut req: reqwest::RequestBuilder, headers: &FetchHeaders) -> reqwest::RequestBuilder {
    if let Some(ua) = &headers.user_agent {
        req = req.header(reqwest::header::USER_AGENT, ua);
    }
    if let Some(accept) = &headers.accept {
        req = req.header(reqwest::header::ACCEPT, accept);
    }
    if let Some(lang) = &headers.accept_language {
        req = req.header(reqwest::header::ACCEPT_LANGUAGE, lang);
    }
    if let Some(referer) = &headers.referer {
        if !referer.is_empty() {
            req = req.header(reqwest::header::REFERER, referer);
        }
    }
    if let Some(cookie) = &headers.cookie {
        if !cookie.is_empty() {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
    }
    req
}

fn is_retryable_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

async fn to_fetch_result(resp: reqwest::Response) -> Result<FetchResult> {
    let status = resp.status().as_u16();
    let final_url = resp.url().to_string();
    let headers = resp.headers().clone();
    let is_redirect = (300..400).contains(&status);
    let redirect_location = headers
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body = resp.bytes().await?.to_vec();
    Ok(FetchResult {
        status,
        headers,
        body,
        final_url,
        redirect_location,
        is_redirect,
    })
}

/// Never log a bare URL that could embed credentials in its authority.
fn masked(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) if !parsed.username().is_empty() => {
            format!("{}://***@{}{}", parsed.scheme(), parsed.host_str().unwrap_or("?"), parsed.path())
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_hides_credentials() {
        assert_eq!(masked("https://user:pw@ex.com/a"), "https://***@ex.com/a");
        assert_eq!(masked("https://ex.com/a"), "https://ex.com/a");
    }

    #[test]
    fn retryable_statuses_cover_contract() {
        for s in [408, 429, 502, 503, 504] {
            assert!(RETRYABLE_STATUSES.contains(&s));
        }
        assert!(!RETRYABLE_STATUSES.contains(&404));
        assert!(!RETRYABLE_STATUSES.contains(&200));
    }
}
