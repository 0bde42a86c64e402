//! Time-bounded cache for a computed result list.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

/// A snapshot and the time it was produced. Replaced as a whole, never edited.
struct Cached<T> {
    data: Arc<[T]>,
    fetched_at: DateTime<Utc>,
}

pub struct ResultCache<T> {
    ttl: TimeDelta,
    entry: Mutex<Option<Cached<T>>>,
}

impl<T> ResultCache<T> {
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Returns the cached list while it is younger than the TTL, otherwise
    /// runs `refresh` and stores its output stamped with `now`.
    ///
    /// The lock is held for the whole refresh, so concurrent callers wait
    /// for the one running refresh instead of starting their own. A failed
    /// refresh leaves the previous entry in place.
    pub async fn read_or_refresh<F, Fut, E>(&self, now: DateTime<Utc>, refresh: F) -> Result<Arc<[T]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if now - cached.fetched_at < self.ttl {
                tracing::debug!("cache hit, fetched at {}", cached.fetched_at);
                return Ok(Arc::clone(&cached.data));
            }
        }

        let data: Arc<[T]> = refresh().await?.into();
        *entry = Some(Cached {
            data: Arc::clone(&data),
            fetched_at: now,
        });

        Ok(data)
    }
}
