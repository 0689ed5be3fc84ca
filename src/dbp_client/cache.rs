use std::{sync::Arc, time::Duration};

use moka::sync::Cache;
use serde_json::Value;

use super::{FetchError, Transport};

pub const DEFAULT_CAPACITY: u64 = 10_000;
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(300);

/// URL keyed store of decoded response bodies, bounded in size and age.
///
/// Cloning yields another handle to the same entries, so one cache can be
/// shared by every client created for a session.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Value>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TIME_TO_LIVE)
    }
}

impl ResponseCache {
    /// Entries are evicted once `max_capacity` is exceeded and expire
    /// `time_to_live` after they were stored.
    pub fn new(max_capacity: u64, time_to_live: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(time_to_live)
            .build();
        Self { entries }
    }

    pub fn get(&self, url: &str) -> Option<Value> {
        self.entries.get(url)
    }

    /// Store `value` for `url`, replacing whatever was there.
    pub fn insert(&self, url: impl Into<String>, value: Value) {
        self.entries.insert(url.into(), value);
    }

    #[cfg(test)]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Live entries, after pending evictions have been applied.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}

/// HTTP GET behind a [`ResponseCache`].
#[derive(Clone)]
pub struct CachedFetch {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
}

impl CachedFetch {
    pub fn new(transport: Arc<dyn Transport>, cache: ResponseCache) -> Self {
        Self { transport, cache }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Return the cached JSON for `url`, or fetch, decode and remember it.
    /// Failures are never cached.
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        if let Some(hit) = self.cache.get(url) {
            tracing::trace!(%url, "response cache hit");
            return Ok(hit);
        }
        let body = self.transport.get(url).await?;
        let value: Value = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.cache.insert(url, value.clone());
        Ok(value)
    }

    /// Like [`fetch_json`](Self::fetch_json) for bodies that are not JSON.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        if let Some(hit) = self.cache.get(url) {
            tracing::trace!(%url, "response cache hit");
            return Ok(match hit {
                Value::String(s) => s,
                other => other.to_string(),
            });
        }
        let body = self.transport.get(url).await?;
        self.cache.insert(url, Value::String(body.clone()));
        Ok(body)
    }

    /// POST a form. Replies are never cached.
    pub async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String, FetchError> {
        self.transport.post_form(url, form).await
    }

    /// Pre-populate a single entry so the next fetch of `url` is served locally.
    #[cfg(test)]
    pub fn override_entry(&self, url: impl Into<String>, value: Value) {
        self.cache.insert(url, value);
    }

    /// Pre-populate from (url, response) pairs handed over by a server render.
    #[cfg(test)]
    pub fn seed<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut seeded = 0usize;
        for (url, value) in pairs {
            self.cache.insert(url, value);
            seeded += 1;
        }
        tracing::debug!(seeded, "seeded response cache");
    }
}
