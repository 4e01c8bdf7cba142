//! JSON-file persistent context store

use crate::InMemoryContextStore;
use agent_core::{ContextRecord, ContextStore, Error, RecordId, Result, Sequence};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    records: Vec<ContextRecord>,
}

/// Context store mirrored to a JSON file
///
/// Reads are served from memory. Every mutation first rewrites the file
/// through a temporary sibling and a rename, and is applied in memory only
/// once the file holds it: a failed write leaves both unchanged.
pub struct FileContextStore {
    inner: InMemoryContextStore,
    path: PathBuf,
    persist_lock: Mutex<()>,
}

impl FileContextStore {
    /// Open the store at `path`, loading existing records if the file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreFile>(&bytes)?.records,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        info!(path = %path.display(), records = records.len(), "Opened context store");

        Ok(Self {
            inner: InMemoryContextStore::from_records(records),
            path,
            persist_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `records` as the new file contents
    async fn persist(&self, records: Vec<ContextRecord>) -> Result<()> {
        let file = StoreFile { records };
        let bytes = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("failed to replace {}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), records = file.records.len(), "Persisted context store");
        Ok(())
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn put(&self, namespace: &str, content: &str, source_role: &str) -> Result<RecordId> {
        let _guard = self.persist_lock.lock().await;
        let record = self.inner.allocate(namespace, content, source_role);

        let mut records = self.inner.snapshot().await;
        records.push(record.clone());
        self.persist(records).await?;

        let id = record.id.clone();
        self.inner.commit(record).await;
        Ok(id)
    }

    async fn query_as_of(
        &self,
        namespace: &str,
        topic: &str,
        k: usize,
        as_of: Option<Sequence>,
    ) -> Result<Vec<ContextRecord>> {
        self.inner.query_as_of(namespace, topic, k, as_of).await
    }

    async fn records(&self, namespace: &str) -> Result<Vec<ContextRecord>> {
        self.inner.records(namespace).await
    }

    async fn reset(&self, namespace: &str) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let mut records = self.inner.snapshot().await;
        records.retain(|r| r.namespace != namespace);
        self.persist(records).await?;
        self.inner.reset(namespace).await
    }

    async fn watermark(&self) -> Result<Sequence> {
        self.inner.watermark().await
    }
}
