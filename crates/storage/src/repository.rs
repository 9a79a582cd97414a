use async_trait::async_trait;
use quiz_core::model::{ResultSummary, SessionMode};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted result with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub summary: ResultSummary,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, summary: ResultSummary) -> Self {
        Self { id, summary }
    }
}

/// Narrows a history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultFilter {
    pub mode: Option<SessionMode>,
    pub limit: Option<u32>,
}

impl ResultFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Append-only history of finished sessions.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Append a finished session's counts and return the new row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn insert_result(&self, summary: &ResultSummary) -> Result<i64, StorageError>;

    /// Fetch a single result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: i64) -> Result<ResultRow, StorageError>;

    /// List results, newest first (`completed_at DESC, id DESC`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_results(&self, filter: ResultFilter) -> Result<Vec<ResultRow>, StorageError>;

    /// Most recent result for a mode, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn latest_result(&self, mode: SessionMode) -> Result<Option<ResultRow>, StorageError> {
        let rows = self
            .list_results(ResultFilter::all().with_mode(mode).with_limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Release the backend once the app shuts down. Pending writes finish
    /// first. Backends without connections keep the default no-op.
    async fn close(&self) {}
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn insert_result(&self, summary: &ResultSummary) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(ResultRow::new(id, summary.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: i64) -> Result<ResultRow, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, filter: ResultFilter) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ResultRow> = guard
            .iter()
            .filter(|row| filter.mode.is_none_or(|m| row.summary.mode() == m))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        if let Some(limit) = filter.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let results: Arc<dyn ResultRepository> = Arc::new(InMemoryRepository::new());
        Self { results }
    }

    /// Close the result store at shutdown.
    pub async fn close(&self) {
        self.results.close().await;
    }
}
