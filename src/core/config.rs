//! Configuration (§6 Environment variables, SPEC_FULL.md §2.3) — entirely
//! env-var driven, no JSON config file (unlike the teacher's
//! `cortex-scout.json` loader): there is no per-deployment file to version
//! here, only secrets and topology that belong in the environment. Each
//! `resolve_*` reads its env var with a sensible default, mirroring the
//! teacher's JSON-field → env-var → default fallback chain one level
//! shallower (env var → default).

use std::time::Duration;

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_str(key) {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_str(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Upstream SOCKS5 configuration (§6 `PROXY_*`, `USE_PROXY`).
#[derive(Clone)]
pub struct ProxyConfig {
    pub use_proxy: bool,
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub base_user: String,
    pub password: String,
    pub zone: String,
    pub region: String,
    pub session_time_minutes: u32,
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        ProxyConfig {
            use_proxy: env_bool("USE_PROXY", true),
            host: env_str("PROXY_HOST").unwrap_or_else(|| "gate.proxy.example".to_string()),
            port: env_parsed("PROXY_PORT", 1080),
            protocol: env_str("PROXY_PROTOCOL").unwrap_or_else(|| "socks5".to_string()),
            base_user: env_str("PROXY_BASE_USER").unwrap_or_else(|| "veilrelay".to_string()),
            password: env_str("PROXY_PASSWORD").unwrap_or_default(),
            zone: env_str("PROXY_ZONE").unwrap_or_else(|| "default".to_string()),
            region: env_str("PROXY_REGION").unwrap_or_else(|| "US".to_string()),
            session_time_minutes: env_parsed("PROXY_SESSION_TIME", 10),
        }
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("use_proxy", &self.use_proxy)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("base_user", &self.base_user)
            .field("password", &"***")
            .field("zone", &self.zone)
            .field("region", &self.region)
            .field("session_time_minutes", &self.session_time_minutes)
            .finish()
    }
}

/// Whether this process is running in a production-like environment — gates
/// the `Secure` cookie flag and default log verbosity (§6 `NODE_ENV`-equivalent).
pub fn is_production() -> bool {
    env_str("APP_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

/// Top-level application configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub target_site: String,
    pub session_ttl_minutes: u64,
    pub session_cookie_name: String,
    pub is_production: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            host: env_str("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parsed("PORT", 8080),
            target_site: env_str("TARGET_SITE").unwrap_or_else(|| "https://example.com".to_string()),
            session_ttl_minutes: env_parsed("SESSION_TTL_MINUTES", 30),
            session_cookie_name: env_str("SESSION_COOKIE_NAME").unwrap_or_else(|| "proxy_session".to_string()),
            is_production: is_production(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_config_masks_password_in_debug() {
        let cfg = ProxyConfig {
            use_proxy: true,
            host: "h".into(),
            port: 1080,
            protocol: "socks5".into(),
            base_user: "u".into(),
            password: "supersecret".into(),
            zone: "z".into(),
            region: "r".into(),
            session_time_minutes: 10,
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn app_config_session_ttl_converts_minutes_to_duration() {
        let cfg = AppConfig {
            host: "0.0.0.0".into(),
            port: 8080,
            target_site: "https://ex.com".into(),
            session_ttl_minutes: 5,
            session_cookie_name: "proxy_session".into(),
            is_production: false,
        };
        assert_eq!(cfg.session_ttl(), Duration::from_secs(300));
    }
}
