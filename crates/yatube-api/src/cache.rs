use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Bytes;
use tokio::time::Instant;
use tracing::debug;

/// Single-entry, time-bounded store for one rendered page.
///
/// Writes to the underlying data never invalidate the entry: within the TTL
/// every caller gets the stored body, stale or not. A zero TTL disables
/// caching entirely.
pub struct PageCache {
    key: &'static str,
    ttl: Duration,
    slot: Mutex<Option<Entry>>,
}

struct Entry {
    stored_at: Instant,
    body: Bytes,
}

impl PageCache {
    pub fn new(key: &'static str, ttl: Duration) -> Self {
        Self {
            key,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The stored body if it is younger than the TTL.
    pub fn get(&self) -> Option<Bytes> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.body.clone())
    }

    pub fn put(&self, body: Bytes) {
        if self.ttl.is_zero() {
            return;
        }
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Entry {
            stored_at: Instant::now(),
            body,
        });
    }

    /// Serves the stored body, or renders, stores and returns a fresh one.
    /// Concurrent misses may each render; the last one stored wins.
    pub async fn get_or_render<F, Fut, E>(&self, render: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(body) = self.get() {
            debug!("Page cache hit: {}", self.key);
            return Ok(body);
        }

        debug!("Page cache miss: {}", self.key);
        let body = render().await?;
        self.put(body.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    const TTL: Duration = Duration::from_secs(20);

    async fn render(text: &'static str) -> Result<Bytes, Infallible> {
        Ok(Bytes::from_static(text.as_bytes()))
    }

    #[tokio::test(start_paused = true)]
    async fn serves_stale_body_within_ttl() {
        let cache = PageCache::new("index_page", TTL);
        let first = cache.get_or_render(|| render("v1")).await.unwrap();
        assert_eq!(first, "v1");

        tokio::time::advance(Duration::from_secs(19)).await;
        let second = cache.get_or_render(|| render("v2")).await.unwrap();
        assert_eq!(second, "v1");
    }

    #[tokio::test(start_paused = true)]
    async fn rerenders_after_expiry() {
        let cache = PageCache::new("index_page", TTL);
        cache.get_or_render(|| render("v1")).await.unwrap();

        tokio::time::advance(TTL).await;
        assert!(cache.get().is_none());
        let fresh = cache.get_or_render(|| render("v2")).await.unwrap();
        assert_eq!(fresh, "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_never_stores() {
        let cache = PageCache::new("index_page", Duration::ZERO);
        cache.get_or_render(|| render("v1")).await.unwrap();
        assert!(cache.get().is_none());
        assert_eq!(cache.get_or_render(|| render("v2")).await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn failed_render_stores_nothing() {
        let cache = PageCache::new("index_page", TTL);
        let res: Result<Bytes, &str> = cache.get_or_render(|| async { Err("boom") }).await;
        assert!(res.is_err());
        assert!(cache.get().is_none());
    }
}
