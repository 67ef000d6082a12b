use crate::errors::AgentError;
use crate::files::FileRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Authoritative storage behind a [`crate::files::FileStore`].
///
/// Each call is an independent round trip; there are no transactions spanning
/// several files.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Insert or overwrite the row for `record.path`.
    async fn upsert(&self, record: &FileRecord) -> Result<(), AgentError>;

    /// Remove the row for `path`. Missing rows are not an error.
    async fn delete(&self, path: &str) -> Result<(), AgentError>;

    async fn fetch(&self, path: &str) -> Result<Option<FileRecord>, AgentError>;

    /// Every stored record, ordered by path.
    async fn list(&self) -> Result<Vec<FileRecord>, AgentError>;

    fn name(&self) -> &str;
}

/// Process-local backend. Used for offline runs and tests.
#[derive(Default)]
pub struct MemoryBackend {
    rows: RwLock<BTreeMap<String, FileRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl FileBackend for MemoryBackend {
    async fn upsert(&self, record: &FileRecord) -> Result<(), AgentError> {
        self.rows
            .write()
            .await
            .insert(record.path.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AgentError> {
        self.rows.write().await.remove(path);
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<Option<FileRecord>, AgentError> {
        Ok(self.rows.read().await.get(path).cloned())
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AgentError> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
