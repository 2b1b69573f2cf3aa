//! The content store seam.
//!
//! The store is an external collaborator addressed by string keys holding
//! JSON blobs. Everything above this trait treats it as already concurrent
//! safe; writes are full overwrites of a key, never merges.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("store rejected key: {key}")]
    InvalidKey { key: String },
    #[error("stored value for `{key}` is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("value for `{key}` could not be serialized: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the raw value for a key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Overwrite the value for a key.
    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is a success.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Read a key and decode it as JSON.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ContentStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode a value as JSON and overwrite the key with it.
pub async fn put_json<T: Serialize>(
    store: &dyn ContentStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.put(key, Bytes::from(encoded)).await
}
