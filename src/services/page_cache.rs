// src/services/page_cache.rs
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;
use lru::LruCache;

/// Most rendered pages kept at once.
pub const PAGE_CACHE_CAPACITY: usize = 1024;

struct CachedPage {
    html: String,
    rendered_at: Instant,
}

/// Rendered pages keyed by the canonical resource they show (see [`post_key`] and
/// [`profile_key`]). A page is rendered on its first request and served from here
/// until `revalidate` has passed. `None` keeps pages until they are evicted.
pub struct PageCache {
    revalidate: Option<Duration>,
    pages: Mutex<LruCache<String, CachedPage>>,
}

pub fn post_key(id: &uuid::Uuid) -> String {
    format!("post:{}", id.hyphenated())
}

/// Usernames are matched case-insensitively by the identity provider.
pub fn profile_key(username: &str) -> String {
    format!("profile:{}", username.to_lowercase())
}

impl PageCache {
    pub fn new(revalidate: Option<Duration>) -> Self {
        Self::with_capacity(revalidate, PAGE_CACHE_CAPACITY)
    }

    pub fn with_capacity(revalidate: Option<Duration>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            revalidate,
            pages: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut pages = self.pages.lock().ok()?;
        let page = pages.get(key)?;
        if let Some(ttl) = self.revalidate {
            if page.rendered_at.elapsed() >= ttl {
                debug!("page cache stale: {}", key);
                pages.pop(key);
                return None;
            }
        }
        Some(page.html.clone())
    }

    pub fn put(&self, key: &str, html: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.put(
                key.to_string(),
                CachedPage {
                    html: html.to_string(),
                    rendered_at: Instant::now(),
                },
            );
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pages.lock().map(|p| p.len()).unwrap_or(0)
    }
}
