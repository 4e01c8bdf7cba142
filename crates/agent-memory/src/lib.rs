//! Context store backends
//!
//! Two implementations of [`agent_core::ContextStore`]:
//!
//! - [`InMemoryContextStore`]: process-local, used for single runs and tests
//! - [`FileContextStore`]: the same store mirrored to a JSON file so that
//!   namespaces survive restarts until explicitly reset
//!
//! Retrieval ranks records by term-frequency cosine similarity to the query
//! topic (see [`similarity`]).

mod file;
mod memory;
pub mod similarity;

pub use file::FileContextStore;
pub use memory::InMemoryContextStore;

use agent_core::{ContextStore, Result};
use std::path::Path;
use std::sync::Arc;

/// Open a persistent store at `path`, or an in-process store when `None`
pub async fn open_store(path: Option<&Path>) -> Result<Arc<dyn ContextStore>> {
    match path {
        Some(path) => Ok(Arc::new(FileContextStore::open(path).await?)),
        None => Ok(Arc::new(InMemoryContextStore::new())),
    }
}
