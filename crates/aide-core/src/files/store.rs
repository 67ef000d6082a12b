//! Cached file store over a persistence backend
//!
//! Mutations are write-through: the backend is written first and the cache is
//! only touched once the backend accepted the change, so a rejected write never
//! leaves the cache ahead of the store. The cache write lock is held across the
//! backend round trip, which serializes read-modify-write sequences such as
//! rename.

use crate::errors::AgentError;
use crate::files::{build_tree, normalize_path, FileBackend, FileRecord, FileSystemNode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStoreStats {
    pub cached_entries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct FileStore {
    backend: Arc<dyn FileBackend>,
    cache: RwLock<HashMap<String, FileRecord>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FileStore {
    pub fn new(backend: Arc<dyn FileBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store `content` at `path`, overwriting any existing file.
    pub async fn create_file(&self, path: &str, content: &str) -> Result<FileRecord, AgentError> {
        let path = normalize_path(path)?;
        let record = FileRecord::new(path.clone(), content);

        let mut cache = self.cache.write().await;
        self.persist(&record).await?;
        cache.insert(path.clone(), record.clone());

        log::info!("Created file {} ({} bytes)", path, content.len());
        Ok(record)
    }

    /// Replace the content at `path`; creates the file when it is unknown.
    pub async fn update_file(&self, path: &str, content: &str) -> Result<FileRecord, AgentError> {
        let path = normalize_path(path)?;

        let mut cache = self.cache.write().await;
        let record = match cache.get(&path) {
            Some(existing) => existing.with_content(content),
            None => FileRecord::new(path.clone(), content),
        };
        self.persist(&record).await?;
        cache.insert(path.clone(), record.clone());

        log::info!("Updated file {} ({} bytes)", path, content.len());
        Ok(record)
    }

    /// Remove `path`. Deleting an unknown path succeeds.
    pub async fn delete_file(&self, path: &str) -> Result<(), AgentError> {
        let path = normalize_path(path)?;

        let mut cache = self.cache.write().await;
        if let Err(e) = self.backend.delete(&path).await {
            log::error!("Failed to delete {} from {}: {}", path, self.backend.name(), e);
            return Err(e);
        }
        cache.remove(&path);

        log::info!("Deleted file {}", path);
        Ok(())
    }

    /// Move a file that this process has already read or written.
    ///
    /// The old content comes from the cache only. Returns `Ok(false)` and does
    /// nothing when `old_path` is not cached, even if the backend holds it.
    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<bool, AgentError> {
        let old_path = normalize_path(old_path)?;
        let new_path = normalize_path(new_path)?;

        let mut cache = self.cache.write().await;
        let content = match cache.get(&old_path) {
            Some(record) => record.content.clone(),
            None => {
                log::warn!("Rename skipped: {} is not in the file cache", old_path);
                return Ok(false);
            }
        };
        if old_path == new_path {
            return Ok(true);
        }

        let record = FileRecord::new(new_path.clone(), content);
        self.persist(&record).await?;
        cache.insert(new_path.clone(), record);

        // both rows stay readable when the old one cannot be removed
        if let Err(e) = self.backend.delete(&old_path).await {
            log::error!(
                "Failed to delete {} during rename, {} was already written: {}",
                old_path,
                new_path,
                e
            );
            return Err(e);
        }
        cache.remove(&old_path);

        log::info!("Renamed file {} -> {}", old_path, new_path);
        Ok(true)
    }

    /// Content at `path`, or `None` when it does not exist.
    ///
    /// Backend failures are logged and read as `None`.
    pub async fn read_file(&self, path: &str) -> Option<String> {
        let path = match normalize_path(path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Rejected read: {}", e);
                return None;
            }
        };

        if let Some(record) = self.cache.read().await.get(&path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(record.content.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        match self.backend.fetch(&path).await {
            Ok(Some(record)) => {
                let content = record.content.clone();
                // a concurrent write may have landed while we were fetching
                self.cache
                    .write()
                    .await
                    .entry(path)
                    .or_insert(record);
                Some(content)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to fetch {} from {}: {}", path, self.backend.name(), e);
                None
            }
        }
    }

    /// Full directory tree, rebuilt from the backend on each call.
    pub async fn get_project_structure(&self) -> Vec<FileSystemNode> {
        build_tree(&self.snapshot().await)
    }

    /// Every known path, sorted.
    pub async fn list_paths(&self) -> Vec<String> {
        self.snapshot().await.into_iter().map(|r| r.path).collect()
    }

    pub async fn cached_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.cache.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn stats(&self) -> FileStoreStats {
        FileStoreStats {
            cached_entries: self.cache.read().await.len(),
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
        }
    }

    async fn snapshot(&self) -> Vec<FileRecord> {
        match self.backend.list().await {
            Ok(records) => records,
            Err(e) => {
                log::error!(
                    "Failed to list files from {}, falling back to cache: {}",
                    self.backend.name(),
                    e
                );
                let mut records: Vec<FileRecord> =
                    self.cache.read().await.values().cloned().collect();
                records.sort_by(|a, b| a.path.cmp(&b.path));
                records
            }
        }
    }

    async fn persist(&self, record: &FileRecord) -> Result<(), AgentError> {
        self.backend.upsert(record).await.map_err(|e| {
            log::error!(
                "Failed to persist {} to {}: {}",
                record.path,
                self.backend.name(),
                e
            );
            e
        })
    }
}
