//! Filesystem-backed content store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use crate::application::store::{ContentStore, StoreError};

/// Durable backend keeping one file per key under a root directory.
///
/// Keys map directly onto relative paths, so `article/hello-world` becomes
/// a file inside an `article/` subdirectory. Keys that would escape the
/// root are rejected before touching the disk.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let absolute = self.resolve(key)?;
        match fs::read(&absolute).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let absolute = self.resolve(key)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&value).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let absolute = self.resolve(key)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}
