//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identity of a cacheable read request.
///
/// Only GET requests are cached, so the method is implicit. The variant
/// hash folds in the query string and the conditional-validation token: a
/// request that would be answered with 304 must never be satisfied by a
/// cached 200, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: String,
    pub variant_hash: u64,
}

impl CacheKey {
    pub fn new(path: impl Into<String>, query: &str, validation_token: Option<&str>) -> Self {
        Self {
            path: path.into(),
            variant_hash: hash_variant(query, validation_token),
        }
    }
}

fn hash_variant(query: &str, validation_token: Option<&str>) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    validation_token.hash(&mut hasher);
    hasher.finish()
}
