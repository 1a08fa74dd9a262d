//! In-process document cache.
//!
//! Unbounded and never evicted; entries live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::docs::model::DocumentRecord;

/// Parsed documents keyed by `rfc_{n}`, `draft_{name}` or `openid_{name}`.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: RwLock<HashMap<String, Arc<DocumentRecord>>>,
}

impl DocumentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Arc<DocumentRecord>> {
        let hit = self.entries.read().await.get(key).cloned();
        if hit.is_some() {
            tracing::debug!(key, "Cache hit");
        }
        hit
    }

    /// Stores a document and returns the cached copy.
    ///
    /// If another task stored the same key first, that entry is kept and
    /// returned, so every caller sees the same record.
    pub async fn insert(&self, key: impl Into<String>, record: DocumentRecord) -> Arc<DocumentRecord> {
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(key.into()).or_insert_with(|| Arc::new(record)))
    }

    /// Number of cached documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
