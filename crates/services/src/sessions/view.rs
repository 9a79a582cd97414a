use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::SessionMode;
use storage::repository::{InMemoryRepository, ResultFilter, ResultRepository, ResultRow};

use crate::error::QuizError;

/// Storage identifier for a persisted result.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type ResultId = i64;

/// Presentation-agnostic list item for a historical result.
///
/// No pre-formatted strings; the caller formats timestamps and percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListItem {
    pub id: ResultId,
    pub mode: SessionMode,
    pub completed_at: DateTime<Utc>,

    pub correct: u32,
    pub incorrect: u32,
    pub total: u32,
    pub score_percent: u32,
}

impl ResultListItem {
    #[must_use]
    pub fn from_row(row: &ResultRow) -> Self {
        let summary = &row.summary;
        Self {
            id: row.id,
            mode: summary.mode(),
            completed_at: summary.completed_at(),
            correct: summary.correct_answers(),
            incorrect: summary.incorrect_answers(),
            total: summary.total(),
            score_percent: summary.score_percent(),
        }
    }
}

/// Totals over every stored result of one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    pub mode: SessionMode,
    pub sessions: usize,
    pub correct: u64,
    pub questions: u64,
    pub best_score_percent: Option<u32>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl HistoryStats {
    fn from_rows(mode: SessionMode, rows: &[ResultRow]) -> Self {
        Self {
            mode,
            sessions: rows.len(),
            correct: rows
                .iter()
                .map(|r| u64::from(r.summary.correct_answers()))
                .sum(),
            questions: rows.iter().map(|r| u64::from(r.summary.total())).sum(),
            best_score_percent: rows.iter().map(|r| r.summary.score_percent()).max(),
            last_completed_at: rows.iter().map(|r| r.summary.completed_at()).max(),
        }
    }

    /// Overall percentage of correct answers, `0` with no history.
    #[must_use]
    pub fn average_percent(&self) -> u32 {
        if self.questions == 0 {
            return 0;
        }
        u32::try_from(self.correct * 100 / self.questions).unwrap_or(100)
    }
}

/// Read side of the result history for the history screen.
#[derive(Clone)]
pub struct ResultHistoryService {
    results: Arc<dyn ResultRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Load results newest first, optionally narrowed to one mode.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        mode: Option<SessionMode>,
        limit: Option<u32>,
    ) -> Result<Vec<ResultListItem>, QuizError> {
        let filter = ResultFilter { mode, limit };
        let rows = self.results.list_results(filter).await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }

    /// Load one result by id.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` (including `NotFound`) on repository failures.
    pub async fn get(&self, id: ResultId) -> Result<ResultListItem, QuizError> {
        let row = self.results.get_result(id).await?;
        Ok(ResultListItem::from_row(&row))
    }

    /// Latest result for a mode, if any.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on repository failures.
    pub async fn latest(&self, mode: SessionMode) -> Result<Option<ResultListItem>, QuizError> {
        let row = self.results.latest_result(mode).await?;
        Ok(row.as_ref().map(ResultListItem::from_row))
    }

    /// Totals for a mode across the whole history.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on repository failures.
    pub async fn stats(&self, mode: SessionMode) -> Result<HistoryStats, QuizError> {
        let rows = self
            .results
            .list_results(ResultFilter::all().with_mode(mode))
            .await?;
        Ok(HistoryStats::from_rows(mode, &rows))
    }
}
