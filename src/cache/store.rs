use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const CACHE_HIT_TOTAL: &str = "taccuino_response_cache_hit_total";
pub const CACHE_MISS_TOTAL: &str = "taccuino_response_cache_miss_total";
pub const CACHE_STORE_TOTAL: &str = "taccuino_response_cache_store_total";

/// A response captured for replay, transport headers included.
///
/// Headers are kept as strings so the cache stays independent of any
/// particular HTTP types; the handler rebuilds a real response on a hit.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct CacheSlot {
    response: CachedResponse,
    stored_at: Instant,
}

/// Bounded, time-limited LRU of rendered read responses.
///
/// Expiry is checked on read; an expired slot counts as a miss and is
/// dropped in place. Writers invalidate the whole cache rather than chase
/// individual keys, since any mutation can change the list as well as a
/// document.
pub struct ResponseCache {
    slots: RwLock<LruCache<CacheKey, CacheSlot>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        {
            let mut slots = rw_write(&self.slots, SOURCE, "cache.get");
            if let Some(slot) = slots.get(key) {
                if slot.stored_at.elapsed() < self.ttl {
                    counter!(CACHE_HIT_TOTAL).increment(1);
                    return Some(slot.response.clone());
                }
                slots.pop(key);
                debug!(target = SOURCE, path = %key.path, "expired cached response");
            }
        }
        counter!(CACHE_MISS_TOTAL).increment(1);
        None
    }

    pub fn store(&self, key: CacheKey, response: CachedResponse) {
        let mut slots = rw_write(&self.slots, SOURCE, "cache.store");
        slots.put(
            key,
            CacheSlot {
                response,
                stored_at: Instant::now(),
            },
        );
        counter!(CACHE_STORE_TOTAL).increment(1);
    }

    pub fn invalidate_all(&self) {
        let mut slots = rw_write(&self.slots, SOURCE, "cache.invalidate_all");
        slots.clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.slots, SOURCE, "cache.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
