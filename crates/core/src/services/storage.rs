use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};

use crate::{
    cache::{get_root_cache_dir, get_storage_dir},
    error::StorageError,
};

/// Key/value text store, keyed by slash-separated relative paths.
#[async_trait]
pub trait TextStorage: Send + Sync {
    async fn put(&self, key: &str, text: &str) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<String, StorageError>;
}

/// Stores each key as a file under a root directory.
pub struct FsTextStorage {
    root: PathBuf,
}

impl FsTextStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted in the user cache directory
    pub fn in_cache_dir() -> Self {
        Self::new(get_storage_dir(&get_root_cache_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl TextStorage for FsTextStorage {
    async fn put(&self, key: &str, text: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        fs::write(&path, text)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                key: key.to_string(),
            }),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

#[derive(Default)]
pub struct MemoryTextStorage {
    objects: RwLock<HashMap<String, String>>,
}

impl MemoryTextStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl TextStorage for MemoryTextStorage {
    async fn put(&self, key: &str, text: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), text.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_storage_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsTextStorage::new(dir.path());

        storage
            .put("transcripts/u1/j1_transcript.txt", "hello")
            .await
            .unwrap();

        assert_eq!(
            storage.get("transcripts/u1/j1_transcript.txt").await.unwrap(),
            "hello"
        );
        assert!(dir.path().join("transcripts/u1/j1_transcript.txt").exists());
    }

    #[tokio::test]
    async fn fs_storage_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsTextStorage::new(dir.path());

        for key in ["../outside.txt", "/etc/passwd", "", "a/../../b"] {
            assert!(matches!(
                storage.put(key, "x").await,
                Err(StorageError::InvalidKey { .. })
            ));
        }
    }

    #[tokio::test]
    async fn missing_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs_storage = FsTextStorage::new(dir.path());
        let mem_storage = MemoryTextStorage::new();

        assert!(matches!(
            fs_storage.get("nope.txt").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            mem_storage.get("nope.txt").await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
