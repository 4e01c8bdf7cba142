//! Shared context store contract
//!
//! Agents exchange findings through a namespaced, append-only store. A
//! namespace is one ticker symbol. Records are immutable once written;
//! corrections are new records.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Monotonic commit counter assigned by the store
///
/// A record with a lower sequence was committed before one with a higher
/// sequence, across all namespaces of the same store.
pub type Sequence = u64;

/// Identifier of a committed record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One immutable unit of shared findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Record identifier
    pub id: RecordId,
    /// Namespace (ticker symbol)
    pub namespace: String,
    /// Stored content
    pub content: String,
    /// Role that wrote the record
    pub source_role: String,
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// Commit order
    pub sequence: Sequence,
}

impl ContextRecord {
    /// Short single-line preview of the content
    pub fn preview(&self, max_chars: usize) -> String {
        let flat: String = self
            .content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{cut}...")
        }
    }
}

/// Namespaced store with similarity retrieval
///
/// Implementations serialize writes per namespace and allow concurrent
/// reads. A `put` is visible to every `query` issued after it returns.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Append a record; fails only on backend conditions, never on content
    async fn put(&self, namespace: &str, content: &str, source_role: &str) -> Result<RecordId>;

    /// Up to `k` records ranked by similarity to `topic`, most recent first
    /// on ties, restricted to records committed before `as_of` when given
    async fn query_as_of(
        &self,
        namespace: &str,
        topic: &str,
        k: usize,
        as_of: Option<Sequence>,
    ) -> Result<Vec<ContextRecord>>;

    /// All records of a namespace in commit order
    async fn records(&self, namespace: &str) -> Result<Vec<ContextRecord>>;

    /// Remove every record of a namespace; idempotent
    async fn reset(&self, namespace: &str) -> Result<()>;

    /// Sequence the next committed record will receive
    async fn watermark(&self) -> Result<Sequence>;

    /// Up to `k` records ranked by similarity to `topic`
    async fn query(&self, namespace: &str, topic: &str, k: usize) -> Result<Vec<ContextRecord>> {
        self.query_as_of(namespace, topic, k, None).await
    }
}
