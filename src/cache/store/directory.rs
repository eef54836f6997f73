//! Directory-backed store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/entries/<sha256(key)>.data   raw value bytes
//! <root>/entries/<sha256(key)>.meta   JSON EntryMetadata
//! ```
//!
//! Writes go to a `.tmp` file that is renamed into place. The key index lives
//! in memory and is rebuilt from the `.meta` files when the store is opened.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::BackingStore;
use crate::cache::element::{CacheElement, ElementAttributes};
use crate::cache::matcher::KeyMatcher;

/// Metadata written next to each data file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMetadata {
    key: String,
    cache_name: String,
    attributes: ElementAttributes,
    size_bytes: u64,
    stored_at: DateTime<Utc>,
}

/// Convert a key to a SHA256 hash for use as a filename
fn key_to_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Store that keeps each element in its own pair of files
pub struct DirectoryStore {
    root: PathBuf,
    entries_dir: PathBuf,
    /// key -> file hash
    index: RwLock<HashMap<String, String>>,
}

impl DirectoryStore {
    /// Open (or create) a store rooted at `root` and rebuild its key index
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let entries_dir = root.join("entries");
        tokio::fs::create_dir_all(&entries_dir).await?;

        let store = Self {
            root,
            entries_dir,
            index: RwLock::new(HashMap::new()),
        };
        let recovered = store.rebuild_index().await?;

        tracing::info!(
            location = %store.root.display(),
            entries = recovered,
            "Directory store opened"
        );
        Ok(store)
    }

    fn data_path(&self, hash: &str) -> PathBuf {
        self.entries_dir.join(format!("{}.data", hash))
    }

    fn meta_path(&self, hash: &str) -> PathBuf {
        self.entries_dir.join(format!("{}.meta", hash))
    }

    /// Scan the entries directory, dropping temp files and orphans
    async fn rebuild_index(&self) -> Result<usize, StoreError> {
        let mut data_hashes = HashSet::new();
        let mut meta_files = Vec::new();

        let mut dir = tokio::fs::read_dir(&self.entries_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(hash) = filename.strip_suffix(".data") {
                data_hashes.insert(hash.to_string());
            } else if let Some(hash) = filename.strip_suffix(".meta") {
                meta_files.push((hash.to_string(), path.clone()));
            } else if filename.ends_with(".tmp") {
                // Left behind by an interrupted write
                let _ = tokio::fs::remove_file(&path).await;
            }
        }

        let mut index = HashMap::new();
        for (hash, meta_path) in meta_files {
            if !data_hashes.contains(&hash) {
                let _ = tokio::fs::remove_file(&meta_path).await;
                continue;
            }
            match Self::read_metadata(&meta_path).await {
                Ok(metadata) => {
                    index.insert(metadata.key, hash);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %meta_path.display(),
                        error = %e,
                        "Skipping unreadable metadata file"
                    );
                }
            }
        }

        let count = index.len();
        *self.index.write() = index;
        Ok(count)
    }

    async fn read_metadata(path: &Path) -> Result<EntryMetadata, StoreError> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn write_file_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);
        tokio::fs::write(&temp_path, data).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn delete_file(path: &Path) -> Result<(), StoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, key: &str, hash: &str) -> Result<Option<CacheElement>, StoreError> {
        let metadata = match Self::read_metadata(&self.meta_path(hash)).await {
            Ok(metadata) => metadata,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.forget(key, hash);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if metadata.key != key {
            return Err(StoreError::Corrupted(format!(
                "metadata for '{}' names key '{}'",
                key, metadata.key
            )));
        }

        let value = match tokio::fs::read(self.data_path(hash)).await {
            Ok(raw) => Bytes::from(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.forget(key, hash);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CacheElement {
            cache_name: metadata.cache_name,
            key: metadata.key,
            value,
            attributes: metadata.attributes,
        }))
    }

    /// Drop an index entry whose files have vanished
    fn forget(&self, key: &str, hash: &str) {
        let mut index = self.index.write();
        if index.get(key).map(String::as_str) == Some(hash) {
            index.remove(key);
        }
    }
}

#[async_trait]
impl BackingStore for DirectoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<CacheElement>, StoreError> {
        let hash = self.index.read().get(key).cloned();
        match hash {
            Some(hash) => self.load(key, &hash).await,
            None => Ok(None),
        }
    }

    async fn fetch_matching(&self, pattern: &str) -> Result<HashMap<String, CacheElement>, StoreError> {
        let matcher = KeyMatcher::new(pattern)?;
        let candidates: Vec<(String, String)> = self
            .index
            .read()
            .iter()
            .filter(|(key, _)| matcher.is_match(key))
            .map(|(key, hash)| (key.clone(), hash.clone()))
            .collect();

        let mut matched = HashMap::with_capacity(candidates.len());
        for (key, hash) in candidates {
            if let Some(element) = self.load(&key, &hash).await? {
                matched.insert(key, element);
            }
        }
        Ok(matched)
    }

    async fn persist(&self, element: CacheElement) -> Result<(), StoreError> {
        let hash = key_to_hash(&element.key);
        let metadata = EntryMetadata {
            key: element.key.clone(),
            cache_name: element.cache_name.clone(),
            attributes: element.attributes.clone(),
            size_bytes: element.value.len() as u64,
            stored_at: Utc::now(),
        };

        // Data first: a meta file without data is treated as an orphan on open
        Self::write_file_atomic(&self.data_path(&hash), &element.value).await?;
        let meta = serde_json::to_vec(&metadata)?;
        Self::write_file_atomic(&self.meta_path(&hash), &meta).await?;

        self.index.write().insert(element.key, hash);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let hash = self.index.write().remove(key);
        let hash = hash.unwrap_or_else(|| key_to_hash(key));

        let meta_path = self.meta_path(&hash);
        let existed = tokio::fs::try_exists(&meta_path).await.unwrap_or(false);
        Self::delete_file(&meta_path).await?;
        Self::delete_file(&self.data_path(&hash)).await?;
        Ok(existed)
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        self.index.write().clear();
        match tokio::fs::remove_dir_all(&self.entries_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.entries_dir).await?;
        Ok(())
    }

    async fn key_set(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.index.read().keys().cloned().collect())
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        tracing::info!(
            location = %self.root.display(),
            entries = self.index.read().len(),
            "Directory store shut down"
        );
        Ok(())
    }

    async fn current_size(&self) -> Result<usize, StoreError> {
        Ok(self.index.read().len())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
