//! Confirmation code cache
//!
//! Pending email confirmation codes, keyed by address. Entries expire after a
//! fixed TTL and are removed once a registration or recovery consumes them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Default lifetime of a confirmation code
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(10 * 60);

#[async_trait]
pub trait ConfirmationCodes: Send + Sync {
    /// Pending code for the address, if any
    async fn get(&self, email: &str) -> Option<u16>;

    /// Store a code; returns `false` if one is already pending
    async fn add(&self, email: &str, code: u16) -> bool;

    async fn remove(&self, email: &str);

    /// How long a newly added code stays valid
    fn ttl(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
struct PendingCode {
    code: u16,
    expires_at: Instant,
}

impl PendingCode {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process code cache
#[derive(Debug)]
pub struct InMemoryCodeCache {
    entries: DashMap<String, PendingCode>,
    ttl: Duration,
}

impl Default for InMemoryCodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_TTL)
    }
}

impl InMemoryCodeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, pending| pending.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purge expired entries in the background
    pub fn spawn_purge_task(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "expired confirmation codes removed");
                }
            }
        })
    }
}

#[async_trait]
impl ConfirmationCodes for InMemoryCodeCache {
    async fn get(&self, email: &str) -> Option<u16> {
        let now = Instant::now();
        if let Some(pending) = self.entries.get(email)
            && pending.is_live(now)
        {
            return Some(pending.code);
        }
        self.entries.remove_if(email, |_, pending| !pending.is_live(now));
        None
    }

    async fn add(&self, email: &str, code: u16) -> bool {
        let now = Instant::now();
        let pending = PendingCode {
            code,
            expires_at: now + self.ttl,
        };

        match self.entries.entry(email.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_live(now) {
                    return false;
                }
                slot.insert(pending);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
                true
            }
        }
    }

    async fn remove(&self, email: &str) {
        self.entries.remove(email);
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_get() {
        let cache = InMemoryCodeCache::default();

        assert!(cache.add("a@x.com", 1234).await);
        assert_eq!(cache.get("a@x.com").await, Some(1234));
        assert_eq!(cache.get("b@x.com").await, None);
    }

    #[tokio::test]
    async fn test_add_refuses_pending_code() {
        let cache = InMemoryCodeCache::default();

        assert!(cache.add("a@x.com", 1234).await);
        assert!(!cache.add("a@x.com", 5678).await);
        assert_eq!(cache.get("a@x.com").await, Some(1234));
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = InMemoryCodeCache::default();
        cache.add("a@x.com", 1234).await;

        cache.remove("a@x.com").await;

        assert_eq!(cache.get("a@x.com").await, None);
        assert!(cache.add("a@x.com", 4321).await);
    }

    #[tokio::test]
    async fn test_expired_code_is_gone() {
        let cache = InMemoryCodeCache::new(Duration::ZERO);

        assert!(cache.add("a@x.com", 1234).await);
        assert_eq!(cache.get("a@x.com").await, None);
        // An expired entry does not block a new code
        assert!(cache.add("a@x.com", 4321).await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = InMemoryCodeCache::new(Duration::ZERO);
        cache.add("a@x.com", 1111).await;
        cache.add("b@x.com", 2222).await;

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.purge_expired(), 0);
    }
}
