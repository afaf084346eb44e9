//! Ad-iframe subprotocol (C11) — click-URL shape detection and the
//! server-side half of the click-beacon endpoint: following an ad click's
//! redirect chain through the upstream dispatcher to the advertiser's
//! landing page.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::encode;
use crate::upstream::dispatcher::{Dispatcher, FetchHeaders};

const MAX_REDIRECTS: u32 = 10;

/// Hostname suffixes whose click/redirect links this subprotocol chases
/// (§4.11). A redirect chain stops as soon as it leaves this set — that's
/// the advertiser's landing page.
const GOOGLE_AD_HOST_SUFFIXES: &[&str] = &[
    "googleadservices.com",
    "doubleclick.net",
    "google.com",
    "googlesyndication.com",
];

/// Google Ads click-URL shape: `.../aclk` or `...clk` on a Google-ad-family
/// host (§4.11).
pub fn is_ad_click_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if !is_google_ad_host(host) {
        return false;
    }
    let path = parsed.path();
    path.ends_with("/aclk") || path.ends_with("clk")
}

/// Choose `page` vs. `adFrame` rewrite mode from the target host (§4.9 step
/// 6): known ad-network origins get the narrower ad-frame rewrite/injection.
pub fn select_mode(target_url: &str) -> crate::rewrite::HtmlMode {
    let is_ad_host = url::Url::parse(target_url)
        .ok()
        .and_then(|u| u.host_str().map(is_google_ad_host))
        .unwrap_or(false);
    if is_ad_host {
        crate::rewrite::HtmlMode::AdFrame
    } else {
        crate::rewrite::HtmlMode::Page
    }
}

fn is_google_ad_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    GOOGLE_AD_HOST_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
}

#[derive(Debug, Deserialize)]
pub struct ClickBeaconRequest {
    #[serde(rename = "clickUrl")]
    pub click_url: String,
    pub cookies: Option<String>,
    #[serde(rename = "userAgent")]
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub language: Option<String>,
    pub adurl: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClickBeaconResponse {
    pub success: bool,
    #[serde(rename = "clickRegistered")]
    pub click_registered: bool,
    pub destination: String,
    #[serde(rename = "proxyUrl")]
    pub proxy_url: String,
    /// Google-ad-family `Set-Cookie` values collected along the redirect
    /// chain (§4.11 step 2) — for the handler to persist into the session
    /// jar, never sent to the client.
    #[serde(skip)]
    pub set_cookies: Vec<String>,
}

/// Set-Cookie values worth persisting from a click chain — only Google-ad
/// family domains (§4.11 step 2); other cookies are dropped.
pub fn google_set_cookies(set_cookie_headers: &[String]) -> Vec<String> {
    set_cookie_headers
        .iter()
        .filter(|raw| {
            raw.split(';')
                .find_map(|part| {
                    let (k, v) = part.split_once('=')?;
                    k.trim().eq_ignore_ascii_case("domain").then(|| v.trim().to_string())
                })
                .map(|domain| is_google_ad_host(domain.trim_start_matches('.')))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Follow `request.click_url`'s redirect chain through the SOCKS5 upstream,
/// up to [`MAX_REDIRECTS`] hops, stopping at the advertiser's landing page
/// (§4.11 step 3). Falls back to `adurl` if the chain fails.
pub async fn resolve_click(
    dispatcher: &Dispatcher,
    socks_username: &str,
    request: &ClickBeaconRequest,
) -> ClickBeaconResponse {
    let headers = FetchHeaders {
        user_agent: request.user_agent.clone(),
        accept: None,
        accept_language: request.language.clone(),
        referer: request.referrer.clone(),
        cookie: request.cookies.clone(),
    };

    let mut current = request.click_url.clone();
    let mut set_cookies = Vec::new();
    for hop in 0..MAX_REDIRECTS {
        let result = match dispatcher.fetch(&current, Method::GET, &headers, None, socks_username).await {
            Ok(r) => r,
            Err(e) => {
                warn!("click-beacon: chain broke at hop {hop} for {current}: {e}");
                return fallback_or_fail(request, "upstream error while following click chain", set_cookies);
            }
        };

        set_cookies.extend(google_set_cookies(&response_set_cookies(&result.headers)));

        if result.is_redirect {
            match result.redirect_location {
                Some(location) => {
                    let next = match url::Url::parse(&current).and_then(|base| base.join(&location)) {
                        Ok(u) => u.to_string(),
                        Err(_) => {
                            return fallback_or_fail(request, "redirect chain produced an invalid location", set_cookies);
                        }
                    };
                    let reached_advertiser = url::Url::parse(&next)
                        .ok()
                        .and_then(|u| u.host_str().map(|h| !is_google_ad_host(h)))
                        .unwrap_or(true);
                    current = next;
                    if reached_advertiser {
                        return succeed(&current, request, set_cookies);
                    }
                    continue;
                }
                None => return fallback_or_fail(request, "redirect with no Location header", set_cookies),
            }
        }

        if result.status < 400 {
            return succeed(&current, request, set_cookies);
        }
        return fallback_or_fail(request, "click chain ended in an error response", set_cookies);
    }

    fallback_or_fail(request, "click chain exceeded max redirects", set_cookies)
}

fn response_set_cookies(headers: &reqwest::header::HeaderMap) -> Vec<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(String::from))
        .collect()
}

fn succeed(destination: &str, request: &ClickBeaconRequest, set_cookies: Vec<String>) -> ClickBeaconResponse {
    ClickBeaconResponse {
        success: true,
        click_registered: true,
        destination: destination.to_string(),
        proxy_url: format!("/p/{}", encode(destination)),
        set_cookies,
    }
}

fn fallback_or_fail(request: &ClickBeaconRequest, reason: &str, set_cookies: Vec<String>) -> ClickBeaconResponse {
    if let Some(adurl) = &request.adurl {
        warn!("click-beacon: falling back to adurl after failure: {reason}");
        return ClickBeaconResponse {
            success: true,
            click_registered: false,
            destination: adurl.clone(),
            proxy_url: format!("/p/{}", encode(adurl)),
            set_cookies,
        };
    }
    ClickBeaconResponse {
        success: false,
        click_registered: false,
        destination: String::new(),
        proxy_url: String::new(),
        set_cookies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_google_ads_click_shapes() {
        assert!(is_ad_click_url("https://www.googleadservices.com/pagead/aclk?x=1"));
        assert!(is_ad_click_url("https://ad.doubleclick.net/ddm/trackclk/N12345.clk"));
    }

    #[test]
    fn rejects_non_ad_hosts() {
        assert!(!is_ad_click_url("https://ex.com/aclk"));
    }

    #[test]
    fn rejects_non_click_paths_on_ad_hosts() {
        assert!(!is_ad_click_url("https://www.googleadservices.com/pagead/conversion"));
    }

    #[test]
    fn select_mode_picks_ad_frame_for_ad_hosts() {
        assert_eq!(select_mode("https://tpc.googlesyndication.com/ad.html"), crate::rewrite::HtmlMode::AdFrame);
        assert_eq!(select_mode("https://ex.com/page"), crate::rewrite::HtmlMode::Page);
    }

    #[test]
    fn google_set_cookies_filters_by_domain() {
        let raw = vec![
            "id=1; Domain=.doubleclick.net; Path=/".to_string(),
            "session=2; Domain=.ex.com; Path=/".to_string(),
        ];
        let kept = google_set_cookies(&raw);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].starts_with("id=1"));
    }

    #[test]
    fn fallback_uses_adurl_when_present() {
        let req = ClickBeaconRequest {
            click_url: "https://www.googleadservices.com/pagead/aclk?x=1".to_string(),
            cookies: None,
            user_agent: None,
            referrer: None,
            language: None,
            adurl: Some("https://advertiser.example/landing".to_string()),
        };
        let resp = fallback_or_fail(&req, "test reason", Vec::new());
        assert!(resp.success);
        assert!(!resp.click_registered);
        assert_eq!(resp.destination, "https://advertiser.example/landing");
    }

    #[test]
    fn fallback_fails_without_adurl() {
        let req = ClickBeaconRequest {
            click_url: "https://www.googleadservices.com/pagead/aclk?x=1".to_string(),
            cookies: None,
            user_agent: None,
            referrer: None,
            language: None,
            adurl: None,
        };
        let resp = fallback_or_fail(&req, "test reason", Vec::new());
        assert!(!resp.success);
    }
}
