//! Process-local content store backend.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::application::store::{ContentStore, StoreError};

/// In-memory backend over a concurrent map.
///
/// Content published here does not survive a restart; the publish pipeline
/// is expected to re-run against a fresh instance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key synchronously. Test convenience.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .insert(key.to_string(), Bytes::copy_from_slice(value.as_bytes()));
    }

    /// Inspect a key synchronously. Test convenience.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .map(|entry| String::from_utf8_lossy(entry.value()).into_owned())
    }

    /// Drop a key synchronously. Test convenience.
    pub fn delete_raw(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let store = MemoryStore::new();
        store
            .put("articles", Bytes::from_static(b"[]"))
            .await
            .expect("put");

        let value = store.get("articles").await.expect("get").expect("present");
        assert_eq!(value.as_ref(), b"[]");
    }

    #[tokio::test]
    async fn absent_key_reads_none() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.insert_raw("article/a", "{}");

        store.delete("article/a").await.expect("delete");
        store.delete("article/a").await.expect("delete again");
        assert!(store.get_raw("article/a").is_none());
    }
}
