//! # Agentic Memory
//!
//! Long-term memory for agent sessions: records stored under a session id
//! and recalled by keyword overlap with a query.
//!
//! Two stores implement [`agentic_core::MemoryStore`]:
//!
//! - [`InMemoryStore`]: process-local, lost on exit
//! - [`SqliteMemoryStore`]: persisted with rusqlite

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteMemoryStore;

use agentic_core::config::{MemoryBackend, MemoryConfig};
use agentic_core::{MemoryStore, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Memory errors
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("No database path configured")]
    NoPath,
}

pub type Result<T> = std::result::Result<T, MemoryError>;

impl From<MemoryError> for StoreError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Io(_) | MemoryError::NoPath | MemoryError::LockPoisoned => {
                StoreError::Unavailable(err.to_string())
            }
            MemoryError::Database(_) | MemoryError::Task(_) => {
                StoreError::OperationFailed(err.to_string())
            }
        }
    }
}

/// Default number of records returned by a search
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// One stored memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    pub id: String,
    pub session_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Lowercased words of three or more characters
fn keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Rank `records` against `query`, best first, at most `limit` results.
///
/// Records sharing no keyword with the query are left out. A query without
/// keywords recalls the most recent records.
pub fn rank(records: Vec<MemoryRecord>, query: &str, limit: usize) -> Vec<String> {
    let wanted = keywords(query);

    let mut scored: Vec<(usize, MemoryRecord)> = records
        .into_iter()
        .map(|record| {
            let score = if wanted.is_empty() {
                1
            } else {
                keywords(&record.content).intersection(&wanted).count()
            };
            (score, record)
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .cmp(a_score)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, record)| record.content)
        .collect()
}

/// Memory store for the configured backend, `None` when memory is disabled
pub fn create_store(config: &MemoryConfig) -> Result<Option<Arc<dyn MemoryStore>>> {
    let store: Arc<dyn MemoryStore> = match config.backend {
        MemoryBackend::None => return Ok(None),
        MemoryBackend::Memory => Arc::new(InMemoryStore::new().with_limit(config.search_limit)),
        MemoryBackend::Sqlite => {
            let path = config.database_path().ok_or(MemoryError::NoPath)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteMemoryStore::open(&path)?.with_limit(config.search_limit))
        }
    };
    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(content: &str, age_secs: i64) -> MemoryRecord {
        let mut record = MemoryRecord::new("s", content);
        record.created_at = Utc::now() - Duration::seconds(age_secs);
        record
    }

    #[test]
    fn test_keywords() {
        let words = keywords("Find the weather in Paris, FR!");
        assert!(words.contains("weather"));
        assert!(words.contains("paris"));
        assert!(!words.contains("in"));
        assert!(!words.contains("fr"));
    }

    #[test]
    fn test_rank_by_overlap_then_recency() {
        let records = vec![
            record("Goal: weather in Paris\nResult: 18C", 30),
            record("Goal: buy a stool\nResult: ordered", 20),
            record("Goal: weather in Rome\nResult: 25C", 10),
            record("Goal: Paris weather tomorrow\nResult: rain", 40),
        ];
        let ranked = rank(records, "weather Paris", 10);
        assert_eq!(
            ranked,
            vec![
                "Goal: weather in Paris\nResult: 18C",
                "Goal: Paris weather tomorrow\nResult: rain",
                "Goal: weather in Rome\nResult: 25C",
            ]
        );
    }

    #[test]
    fn test_rank_empty_query_returns_most_recent() {
        let records = vec![record("old", 50), record("new", 1), record("mid", 20)];
        assert_eq!(rank(records, "", 2), vec!["new", "mid"]);
    }

    #[test]
    fn test_create_store_none() {
        let config = MemoryConfig {
            backend: MemoryBackend::None,
            ..MemoryConfig::default()
        };
        assert!(create_store(&config).unwrap().is_none());
    }

    #[test]
    fn test_create_sqlite_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            backend: MemoryBackend::Sqlite,
            path: Some(dir.path().join("nested").join("memory.db")),
            ..MemoryConfig::default()
        };
        assert!(create_store(&config).unwrap().is_some());
        assert!(dir.path().join("nested").join("memory.db").exists());
    }
}
