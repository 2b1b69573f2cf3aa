//! In-process response cache for the public read path.
//!
//! Plays the role an edge cache plays in front of this service: responses
//! are stored by request identity and served verbatim on a hit, without
//! touching the content store. Population happens after the response has
//! already been handed back to the caller; a crash before completion means
//! the response simply was not cached, never a correctness issue, because
//! the content store stays the source of truth.

mod keys;
mod lock;
mod store;

pub use keys::CacheKey;
pub use store::{
    CACHE_HIT_TOTAL, CACHE_MISS_TOTAL, CACHE_STORE_TOTAL, CachedResponse, ResponseCache,
};
