//! In-process context store

use crate::similarity;
use agent_core::{ContextRecord, ContextStore, RecordId, Result, Sequence};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type Namespace = Arc<RwLock<Vec<ContextRecord>>>;

/// Context store held in process memory
///
/// Each namespace sits behind its own `RwLock`: one writer commits at a
/// time per namespace while readers proceed concurrently, and writers to
/// different namespaces never contend.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
    next_sequence: AtomicU64,
}

impl InMemoryContextStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously committed records
    pub fn from_records(records: Vec<ContextRecord>) -> Self {
        let next = records.iter().map(|r| r.sequence + 1).max().unwrap_or(0);

        let mut grouped: HashMap<String, Vec<ContextRecord>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.namespace.clone())
                .or_default()
                .push(record);
        }

        let namespaces = grouped
            .into_iter()
            .map(|(name, mut records)| {
                records.sort_by_key(|r| r.sequence);
                (name, Arc::new(RwLock::new(records)))
            })
            .collect();

        Self {
            namespaces: RwLock::new(namespaces),
            next_sequence: AtomicU64::new(next),
        }
    }

    /// Every record of every namespace, in commit order
    pub async fn snapshot(&self) -> Vec<ContextRecord> {
        let handles: Vec<Namespace> = self.namespaces.read().await.values().cloned().collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.read().await.iter().cloned());
        }
        all.sort_by_key(|r| r.sequence);
        all
    }

    /// Names of namespaces holding at least one record
    pub async fn namespaces(&self) -> Vec<String> {
        let handles: Vec<(String, Namespace)> = self
            .namespaces
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let mut names = Vec::new();
        for (name, handle) in handles {
            if !handle.read().await.is_empty() {
                names.push(name);
            }
        }
        names.sort();
        names
    }

    /// Build a record with the next sequence number without committing it
    pub(crate) fn allocate(&self, namespace: &str, content: &str, source_role: &str) -> ContextRecord {
        ContextRecord {
            id: RecordId::generate(),
            namespace: namespace.to_string(),
            content: content.to_string(),
            source_role: source_role.to_string(),
            timestamp: Utc::now(),
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Commit a record built by [`Self::allocate`], keeping sequence order
    pub(crate) async fn commit(&self, record: ContextRecord) {
        let handle = self.get_or_create(&record.namespace).await;
        let mut records = handle.write().await;
        let at = records.partition_point(|r| r.sequence < record.sequence);
        debug!(
            namespace = %record.namespace,
            sequence = record.sequence,
            "Committed context record"
        );
        records.insert(at, record);
    }

    async fn existing(&self, namespace: &str) -> Option<Namespace> {
        self.namespaces.read().await.get(namespace).cloned()
    }

    async fn get_or_create(&self, namespace: &str) -> Namespace {
        if let Some(handle) = self.existing(namespace).await {
            return handle;
        }
        let mut namespaces = self.namespaces.write().await;
        Arc::clone(namespaces.entry(namespace.to_string()).or_default())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn put(&self, namespace: &str, content: &str, source_role: &str) -> Result<RecordId> {
        let handle = self.get_or_create(namespace).await;
        let mut records = handle.write().await;

        let record = self.allocate(namespace, content, source_role);
        let id = record.id.clone();
        debug!(
            namespace,
            source_role,
            sequence = record.sequence,
            "Committed context record"
        );
        records.push(record);
        Ok(id)
    }

    async fn query_as_of(
        &self,
        namespace: &str,
        topic: &str,
        k: usize,
        as_of: Option<Sequence>,
    ) -> Result<Vec<ContextRecord>> {
        let Some(handle) = self.existing(namespace).await else {
            return Ok(Vec::new());
        };

        let visible: Vec<ContextRecord> = handle
            .read()
            .await
            .iter()
            .filter(|r| as_of.is_none_or(|limit| r.sequence < limit))
            .cloned()
            .collect();

        Ok(similarity::rank(visible, topic, k))
    }

    async fn records(&self, namespace: &str) -> Result<Vec<ContextRecord>> {
        match self.existing(namespace).await {
            Some(handle) => Ok(handle.read().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn reset(&self, namespace: &str) -> Result<()> {
        if let Some(handle) = self.existing(namespace).await {
            let mut records = handle.write().await;
            debug!(namespace, removed = records.len(), "Reset context namespace");
            records.clear();
        }
        Ok(())
    }

    async fn watermark(&self) -> Result<Sequence> {
        Ok(self.next_sequence.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_query() {
        let store = InMemoryContextStore::new();
        let id = store
            .put("AAPL", "Apple iPhone sales rose sharply", "researcher")
            .await
            .unwrap();
        store
            .put("AAPL", "Gross margin stable at 45%", "analyst")
            .await
            .unwrap();

        let results = store.query("AAPL", "iPhone sales", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].source_role, "researcher");
    }

    #[tokio::test]
    async fn test_query_unknown_namespace_is_empty() {
        let store = InMemoryContextStore::new();
        assert!(store.query("MSFT", "anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let store = InMemoryContextStore::new();
        store.put("AAPL", "finding", "researcher").await.unwrap();

        store.reset("AAPL").await.unwrap();
        store.reset("AAPL").await.unwrap();
        store.reset("NEVER").await.unwrap();

        assert!(store.query("AAPL", "*", 10).await.unwrap().is_empty());
        assert!(store.records("AAPL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = InMemoryContextStore::new();
        store.put("AAPL", "apple finding", "researcher").await.unwrap();
        store.put("MSFT", "microsoft finding", "researcher").await.unwrap();

        store.reset("AAPL").await.unwrap();

        assert_eq!(store.records("MSFT").await.unwrap().len(), 1);
        assert_eq!(store.namespaces().await, vec!["MSFT".to_string()]);
    }

    #[tokio::test]
    async fn test_as_of_hides_later_records() {
        let store = InMemoryContextStore::new();
        store.put("AAPL", "before the wave", "researcher").await.unwrap();
        let watermark = store.watermark().await.unwrap();
        store.put("AAPL", "during the wave", "analyst").await.unwrap();

        let visible = store
            .query_as_of("AAPL", "*", 10, Some(watermark))
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "before the wave");

        assert_eq!(store.query("AAPL", "*", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_puts_get_distinct_sequences() {
        let store = Arc::new(InMemoryContextStore::new());

        let writes = (0..32).map(|i| {
            let store = Arc::clone(&store);
            async move {
                store
                    .put("AAPL", &format!("finding {i}"), "researcher")
                    .await
                    .unwrap()
            }
        });
        futures::future::join_all(writes).await;

        let records = store.records("AAPL").await.unwrap();
        assert_eq!(records.len(), 32);
        let mut sequences: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        sequences.dedup();
        assert_eq!(sequences.len(), 32);
        assert!(records.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn test_from_records_continues_sequence() {
        let store = InMemoryContextStore::new();
        store.put("AAPL", "one", "researcher").await.unwrap();
        store.put("AAPL", "two", "analyst").await.unwrap();

        let restored = InMemoryContextStore::from_records(store.snapshot().await);
        assert_eq!(restored.watermark().await.unwrap(), 2);
        assert_eq!(restored.records("AAPL").await.unwrap().len(), 2);
    }
}
