//! Short-URL side table (C10) — maps a small digest to a full external URL
//! so ad click-throughs and other length-constrained contexts can carry a
//! compact reference instead of a full `/p/<token>`. Same lock-guarded-map
//! shape as [`crate::session::SessionStore`], with content-addressed keys
//! instead of random ids.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;

use crate::session::cookie::now_secs;

const DIGEST_LEN: usize = 12;
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    created_at: u64,
    last_access_at: u64,
}

impl Entry {
    fn is_valid(&self, ttl_secs: u64) -> bool {
        now_secs().saturating_sub(self.last_access_at) <= ttl_secs
    }
}

/// First 12 chars of the URL-safe-base64 SHA-256 digest of the URL —
/// deterministic, so re-shortening the same URL while its entry is still
/// live returns the same hash instead of minting a duplicate.
fn digest(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)[..DIGEST_LEN].to_string()
}

#[derive(Clone)]
pub struct ShortUrlTable {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl_secs: u64,
}

impl ShortUrlTable {
    pub fn new() -> Self {
        ShortUrlTable {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_ttl(ttl_secs: u64) -> Self {
        ShortUrlTable {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        }
    }

    /// Shorten `url`, reusing the existing hash if a non-expired entry for
    /// it already exists (§4.10 dedupe rule).
    pub async fn shorten(&self, url: &str) -> String {
        let hash = digest(url);
        let mut entries = self.entries.write().await;
        match entries.get_mut(&hash) {
            Some(entry) if entry.is_valid(self.ttl_secs) => {
                entry.last_access_at = now_secs();
            }
            _ => {
                let now = now_secs();
                entries.insert(
                    hash.clone(),
                    Entry {
                        url: url.to_string(),
                        created_at: now,
                        last_access_at: now,
                    },
                );
            }
        }
        hash
    }

    /// Resolve a hash to its URL, refreshing its last-access time (§4.10:
    /// lookups extend the entry's life the same way `SessionStore` touches
    /// on access). Expired or unknown hashes return `None`.
    pub async fn lookup(&self, hash: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(hash)?;
        if !entry.is_valid(self.ttl_secs) {
            entries.remove(hash);
            return None;
        }
        entry.last_access_at = now_secs();
        Some(entry.url.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl_secs;
        let before = entries.len();
        entries.retain(|_, e| e.is_valid(ttl));
        let removed = before - entries.len();
        if removed > 0 {
            info!("short-url table: swept {} expired entr(y/ies)", removed);
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

impl Default for ShortUrlTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shorten_then_lookup_round_trips() {
        let table = ShortUrlTable::new();
        let hash = table.shorten("https://ex.com/a/b?c=1").await;
        assert_eq!(table.lookup(&hash).await.as_deref(), Some("https://ex.com/a/b?c=1"));
    }

    #[tokio::test]
    async fn shorten_dedupes_same_url() {
        let table = ShortUrlTable::new();
        let first = table.shorten("https://ex.com/x").await;
        let second = table.shorten("https://ex.com/x").await;
        assert_eq!(first, second);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_miss_returns_none() {
        let table = ShortUrlTable::new();
        assert!(table.lookup("doesnotexist").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_dropped_lazily_on_lookup() {
        let table = ShortUrlTable::with_ttl(0);
        let hash = table.shorten("https://ex.com/x").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(table.lookup(&hash).await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_expired_entries() {
        let table = ShortUrlTable::with_ttl(0);
        table.shorten("https://ex.com/x").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(table.sweep().await, 1);
        assert_eq!(table.len().await, 0);
    }
}
