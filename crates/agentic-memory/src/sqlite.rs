//! SQLite-backed memory store.
//!
//! The connection sits behind a std mutex; queries run on the blocking pool
//! so the async loop is never stalled on disk I/O.

use crate::{rank, MemoryError, MemoryRecord, Result, DEFAULT_SEARCH_LIMIT};
use agentic_core::{MemoryStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Persistent memory in a single SQLite table
#[derive(Clone)]
pub struct SqliteMemoryStore {
    conn: Arc<Mutex<Connection>>,
    limit: usize,
}

impl SqliteMemoryStore {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        info!("Opening memory database at {}", path.as_ref().display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            limit: DEFAULT_SEARCH_LIMIT,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| MemoryError::LockPoisoned)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(session_id);
            "#,
        )?;
        Ok(())
    }

    /// Insert one record
    pub fn insert(&self, record: &MemoryRecord) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| MemoryError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO memories (id, session_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.session_id,
                record.content,
                record.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// All records of a session, oldest first
    pub fn records(&self, session_id: &str) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock().map_err(|_| MemoryError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, content, created_at FROM memories \
             WHERE session_id = ?1 ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let created_at: String = row.get(3)?;
            Ok(MemoryRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                content: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(MemoryError::from)
    }

    /// Delete every record of a session; returns the number removed
    pub fn clear(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(|_| MemoryError::LockPoisoned)?;
        Ok(conn.execute(
            "DELETE FROM memories WHERE session_id = ?1",
            params![session_id],
        )?)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteMemoryStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| MemoryError::Task(e.to_string()))?
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn add(&self, session_id: &str, text: &str) -> std::result::Result<(), StoreError> {
        debug!("Persisting memory for session {}", session_id);
        let record = MemoryRecord::new(session_id, text);
        self.blocking(move |store| store.insert(&record))
            .await
            .map_err(StoreError::from)
    }

    async fn search(
        &self,
        session_id: &str,
        query: &str,
    ) -> std::result::Result<Vec<String>, StoreError> {
        let session_id = session_id.to_string();
        let records = self
            .blocking(move |store| store.records(&session_id))
            .await
            .map_err(StoreError::from)?;
        Ok(rank(records, query, self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_load() -> Result<()> {
        let store = SqliteMemoryStore::open_in_memory()?;
        let record = MemoryRecord::new("s1", "Goal: g\nResult: r");
        store.insert(&record)?;

        let loaded = store.records("s1")?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, record.id);
        assert_eq!(loaded[0].content, "Goal: g\nResult: r");
        assert!(store.records("other")?.is_empty());

        assert_eq!(store.clear("s1")?, 1);
        assert!(store.records("s1")?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store
            .add("s1", "Goal: weather in Paris\nResult: 18C")
            .await
            .unwrap();
        store.add("s1", "Goal: open mail\nResult: done").await.unwrap();

        let found = store.search("s1", "weather Paris").await.unwrap();
        assert_eq!(found, vec!["Goal: weather in Paris\nResult: 18C"]);
        assert!(store.search("s2", "weather").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");

        {
            let store = SqliteMemoryStore::open(&path).unwrap();
            store.add("s", "Goal: stool\nResult: bought").await.unwrap();
        }

        let reopened = SqliteMemoryStore::open(&path).unwrap();
        assert_eq!(
            reopened.search("s", "stool").await.unwrap(),
            vec!["Goal: stool\nResult: bought"]
        );
    }
}
