//! Shared application state, threaded into every handler via axum's
//! `State` extractor. Same shape as the teacher's `AppState`: one struct,
//! cheap to clone (everything inside is already an `Arc`/lock-guarded
//! handle), with a manual `Debug` impl so secrets never leak into a log line
//! that happens to print the whole state.

use std::sync::Arc;

use crate::core::config::{AppConfig, ProxyConfig};
use crate::session::SessionStore;
use crate::shorturl::ShortUrlTable;
use crate::upstream::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub proxy: Arc<ProxyConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: SessionStore,
    pub short_urls: ShortUrlTable,
}

impl AppState {
    pub fn new(config: AppConfig, proxy: ProxyConfig) -> Self {
        let ttl_secs = config.session_ttl().as_secs();
        let dispatcher = Dispatcher::new(proxy.clone());
        AppState {
            config: Arc::new(config),
            proxy: Arc::new(proxy),
            dispatcher: Arc::new(dispatcher),
            sessions: SessionStore::new(ttl_secs),
            short_urls: ShortUrlTable::new(),
        }
    }

    /// Build the SOCKS5 sticky username for a session id (§3 data model).
    pub fn sticky_username(&self, session_id: &str) -> String {
        crate::session::sticky_username(
            &self.proxy.base_user,
            &self.proxy.zone,
            &self.proxy.region,
            session_id,
            self.proxy.session_time_minutes,
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("target_site", &self.config.target_site)
            .field("proxy_host", &self.proxy.host)
            .field("proxy_region", &self.proxy.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
                host: "h".into(),
                port: 1080,
                protocol: "socks5".into(),
                base_user: "Ashish".into(),
                password: "pw".into(),
                zone: "custom".into(),
                region: "US".into(),
                session_time_minutes: 120,
            },
        )
    }

    #[test]
    fn sticky_username_matches_spec_scenario() {
        let state = test_state();
        let name = state.sticky_username("s1-weird!@#chars");
        assert_eq!(name, "Ashish-zone-custom-region-US-sessid-s1weirdchars-sessTime-120");
    }

    #[test]
    fn debug_never_prints_password() {
        let state = test_state();
        assert!(!format!("{state:?}").contains("pw"));
    }
}
