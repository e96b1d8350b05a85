//! Process-local memory store.

use crate::{rank, MemoryRecord, DEFAULT_SEARCH_LIMIT};
use agentic_core::{MemoryStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Memory kept in a map keyed by session id
#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, Vec<MemoryRecord>>>,
    limit: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Maximum number of records a search returns
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Number of records stored for `session_id`
    pub async fn len(&self, session_id: &str) -> usize {
        self.records
            .read()
            .await
            .get(session_id)
            .map_or(0, Vec::len)
    }

    pub async fn clear(&self, session_id: &str) {
        self.records.write().await.remove(session_id);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn add(&self, session_id: &str, text: &str) -> Result<(), StoreError> {
        debug!("Storing memory for session {}", session_id);
        self.records
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(MemoryRecord::new(session_id, text));
        Ok(())
    }

    async fn search(&self, session_id: &str, query: &str) -> Result<Vec<String>, StoreError> {
        let records = self
            .records
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        Ok(rank(records, query, self.limit))
    }
}
