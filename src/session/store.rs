//! Session store (C2) — owned, lock-guarded session map.
//!
//! Re-expressed as an owned `SessionStore` value (rather than a global
//! mutable map); internal synchronization is `tokio::sync::RwLock` over a
//! `HashMap`, matching the concurrency idiom `ProxyManager` uses for its
//! registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Truncate a session id to 8 chars for logging (§7) — never log a full id.
fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

use super::cookie::{now_secs, Cookie};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: u64,
    pub last_access_at: u64,
    pub current_page: Option<String>,
    /// Keyed by cookie domain (not origin host) — a cookie is stored once
    /// per declared domain; `cookies_for` walks every domain bucket that
    /// domain-matches the request host.
    jar: HashMap<String, HashMap<String, Cookie>>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = now_secs();
        Session {
            id,
            created_at: now,
            last_access_at: now,
            current_page: None,
            jar: HashMap::new(),
        }
    }

    fn is_valid(&self, ttl_secs: u64) -> bool {
        now_secs().saturating_sub(self.last_access_at) <= ttl_secs
    }

    fn touch(&mut self) {
        self.last_access_at = now_secs();
    }

    pub fn set_current_page(&mut self, url: String) {
        self.current_page = Some(url);
    }

    /// Parse and store every `Set-Cookie` header value from a response
    /// emitted by `origin_host`. Each cookie is filed under its declared (or
    /// host-only) domain.
    pub fn store_cookies(&mut self, origin_host: &str, request_path: &str, set_cookies: &[String]) {
        for raw in set_cookies {
            if let Some(cookie) = Cookie::parse(raw, origin_host, request_path) {
                self.jar
                    .entry(cookie.domain.clone())
                    .or_default()
                    .insert(cookie.name.clone(), cookie);
            }
        }
    }

    /// Build a `Cookie:` header value for a request to `host`/`path`.
    /// Domain-match AND path-prefix-match AND non-expired; first occurrence
    /// by name wins (most-specific domain bucket is not distinguished beyond
    /// insertion order, matching §4.2's "first occurrence by name" rule).
    pub fn cookies_for(&self, host: &str, path: &str) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut pairs = Vec::new();
        for bucket in self.jar.values() {
            for cookie in bucket.values() {
                if cookie.matches(host, path) && seen.insert(cookie.name.clone()) {
                    pairs.push(format!("{}={}", cookie.name, cookie.value));
                }
            }
        }
        pairs.join("; ")
    }

    fn sweep_expired_cookies(&mut self) {
        for bucket in self.jar.values_mut() {
            bucket.retain(|_, c| !c.is_expired());
        }
        self.jar.retain(|_, bucket| !bucket.is_empty());
    }
}

/// Owned, cloneable handle to the in-memory session map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        SessionStore {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        }
    }

    /// If `id` resolves to a non-expired session, touch and return it; else
    /// create a fresh session with a new id.
    pub async fn get_or_create(&self, id: Option<&str>) -> Session {
        let mut sessions = self.sessions.write().await;
        if let Some(id) = id {
            if let Some(existing) = sessions.get_mut(id) {
                if existing.is_valid(self.ttl_secs) {
                    existing.touch();
                    return existing.clone();
                }
                sessions.remove(id);
            }
        }
        let fresh = Session::new(Uuid::new_v4().simple().to_string());
        debug!("session store: created session {}…", short_id(&fresh.id));
        sessions.insert(fresh.id.clone(), fresh.clone());
        fresh
    }

    /// Non-creating lookup; `None` on miss or expiry (lazily removed).
    pub async fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get(id)?;
        if !session.is_valid(self.ttl_secs) {
            sessions.remove(id);
            return None;
        }
        let session = sessions.get_mut(id).unwrap();
        session.touch();
        Some(session.clone())
    }

    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn set_current_page(&self, id: &str, url: String) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.set_current_page(url);
        }
    }

    pub async fn store_cookies(&self, id: &str, origin_host: &str, request_path: &str, set_cookies: &[String]) {
        if set_cookies.is_empty() {
            return;
        }
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.store_cookies(origin_host, request_path, set_cookies);
        }
    }

    pub async fn cookies_for(&self, id: &str, host: &str, path: &str) -> String {
        match self.sessions.read().await.get(id) {
            Some(session) => session.cookies_for(host, path),
            None => String::new(),
        }
    }

    /// Remove sessions past TTL and sweep expired cookies from the rest.
    /// Intended to run on a periodic interval (§5: every few minutes).
    pub async fn sweep(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let ttl = self.ttl_secs;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_valid(ttl));
        for session in sessions.values_mut() {
            session.sweep_expired_cookies();
        }
        let removed = before - sessions.len();
        if removed > 0 {
            info!("session store: swept {} expired session(s)", removed);
        }
        removed
    }

    pub fn spawn_sweeper(self, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_makes_a_fresh_session_without_id() {
        let store = SessionStore::new(600);
        let s = store.get_or_create(None).await;
        assert_eq!(s.id.len(), 32); // uuid simple, no hyphens
    }

    #[tokio::test]
    async fn get_or_create_reuses_valid_session() {
        let store = SessionStore::new(600);
        let first = store.get_or_create(None).await;
        let second = store.get_or_create(Some(&first.id)).await;
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn get_returns_none_on_miss() {
        let store = SessionStore::new(600);
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn expired_session_is_dropped_lazily() {
        let store = SessionStore::new(0);
        let s = store.get_or_create(None).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(store.get(&s.id).await.is_none());
    }

    #[tokio::test]
    async fn cookie_round_trip_through_store() {
        let store = SessionStore::new(600);
        let s = store.get_or_create(None).await;
        store
            .store_cookies(&s.id, "ex.com", "/", &["id=42; Domain=.ex.com; Path=/; Max-Age=60".to_string()])
            .await;
        let header = store.cookies_for(&s.id, "ex.com", "/next").await;
        assert_eq!(header, "id=42");
    }

    #[tokio::test]
    async fn sweep_removes_expired_sessions() {
        let store = SessionStore::new(0);
        let s = store.get_or_create(None).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let removed = store.sweep().await;
        assert_eq!(removed, 1);
        assert!(store.get(&s.id).await.is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = SessionStore::new(600);
        let s = store.get_or_create(None).await;
        store.delete(&s.id).await;
        store.delete(&s.id).await;
        assert!(store.get(&s.id).await.is_none());
    }
}
