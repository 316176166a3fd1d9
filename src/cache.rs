use crate::http::{Method, RawResponse};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const METHODS: [Method; 2] = [Method::Get, Method::Post];

/// Short-lived in-memory cache of successful responses, keyed by method + URL.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedEntry>>,
}

struct CachedEntry {
    stored_at: Instant,
    response: RawResponse,
}

impl ResponseCache {
    /// A zero `ttl` disables the cache entirely.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, method: Method, url: &str) -> Option<RawResponse> {
        if !self.enabled() {
            return None;
        }
        let key = cache_key(method, url);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(&key) {
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            tracing::debug!("Cache expired for {} {}", method, url);
            entries.remove(&key);
            return None;
        }
        tracing::debug!("Cache hit for {} {}", method, url);
        entries.get(&key).map(|entry| RawResponse {
            from_cache: true,
            ..entry.response.clone()
        })
    }

    pub fn put(&self, method: Method, url: &str, response: &RawResponse) {
        if !self.enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        entries.insert(
            cache_key(method, url),
            CachedEntry {
                stored_at: Instant::now(),
                response: response.clone(),
            },
        );
        tracing::debug!("Cached {} {}", method, url);
    }

    /// Drop every cached entry for `url`, whatever the method.
    pub fn invalidate(&self, url: &str) {
        if !self.enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for method in METHODS {
            if entries.remove(&cache_key(method, url)).is_some() {
                tracing::debug!("Invalidated cache for {} {}", method, url);
            }
        }
    }
}

fn cache_key(method: Method, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
