use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Fraction of the lease duration a cached token is trusted for. The margin
/// absorbs clock skew and request latency; a token is never reused past it.
const LEASE_SAFETY_FACTOR: f64 = 0.9;

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// In-memory token cache keyed by an identity (the AppRole role_id).
///
/// The only mutable state shared across concurrent resolutions. Concurrent
/// misses for one identity may each log in and overwrite the entry; last
/// write wins, which is safe because every cached value is valid.
pub struct TokenCache {
    entries: RwLock<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached token for `identity` if still inside its discounted
    /// lease window.
    pub async fn get(&self, identity: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(identity)?;
        if Instant::now() < entry.expires_at {
            Some(entry.token.clone())
        } else {
            None
        }
    }

    /// Store a token, trusting it for `lease_duration * 0.9`.
    pub async fn put(&self, identity: &str, token: &str, lease_duration: Duration) {
        let expires_at = Instant::now() + lease_duration.mul_f64(LEASE_SAFETY_FACTOR);
        let mut entries = self.entries.write().await;
        entries.insert(
            identity.to_string(),
            CachedToken {
                token: token.to_string(),
                expires_at,
            },
        );
    }

    /// Drop the entry for `identity`, e.g. after a 403 on a data call.
    pub async fn invalidate(&self, identity: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(identity);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
