use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::mode::SessionMode;
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultSummaryError {
    #[error("too many questions for a single result: {len}")]
    TooManyQuestions { len: usize },
}

//
// ─── PER-QUESTION RECORD ───────────────────────────────────────────────────────
//

/// How a single option should be highlighted on the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// Selected and part of the correct answer.
    SelectedCorrect,
    /// Selected but not part of the correct answer.
    SelectedWrong,
    /// Part of the correct answer but left unselected.
    MissedCorrect,
    /// Neither selected nor correct.
    Unselected,
}

/// Outcome of one question within a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub question: Question,
    pub selected: BTreeSet<String>,
    pub was_correct: bool,
}

impl QuestionRecord {
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.selected.is_empty()
    }

    /// Marks for every option, in the order the options were shown.
    #[must_use]
    pub fn option_marks(&self) -> Vec<(&str, OptionMark)> {
        let correct = self.question.correct_answers();
        self.question
            .options()
            .iter()
            .map(|option| {
                let mark = match (self.selected.contains(option), correct.contains(option)) {
                    (true, true) => OptionMark::SelectedCorrect,
                    (true, false) => OptionMark::SelectedWrong,
                    (false, true) => OptionMark::MissedCorrect,
                    (false, false) => OptionMark::Unselected,
                };
                (option.as_str(), mark)
            })
            .collect()
    }
}

//
// ─── SESSION RESULT ────────────────────────────────────────────────────────────
//

/// Frozen outcome of a session, built once when the session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    mode: SessionMode,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    records: Vec<QuestionRecord>,
    correct_count: usize,
}

impl SessionResult {
    pub(crate) fn new(
        mode: SessionMode,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        records: Vec<QuestionRecord>,
    ) -> Self {
        let correct_count = records.iter().filter(|r| r.was_correct).count();
        Self {
            mode,
            started_at,
            completed_at,
            records,
            correct_count,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn incorrect_count(&self) -> usize {
        self.records.len() - self.correct_count
    }

    /// Condense into the shape the result store keeps.
    ///
    /// # Errors
    ///
    /// Returns `ResultSummaryError::TooManyQuestions` if the counts cannot fit in `u32`.
    pub fn summary(&self) -> Result<ResultSummary, ResultSummaryError> {
        let too_many = |_| ResultSummaryError::TooManyQuestions {
            len: self.records.len(),
        };
        Ok(ResultSummary::new(
            self.mode,
            u32::try_from(self.correct_count()).map_err(too_many)?,
            u32::try_from(self.incorrect_count()).map_err(too_many)?,
            self.completed_at,
        ))
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Aggregate counts for a finished session, as persisted in the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    mode: SessionMode,
    correct_answers: u32,
    incorrect_answers: u32,
    completed_at: DateTime<Utc>,
}

impl ResultSummary {
    #[must_use]
    pub fn new(
        mode: SessionMode,
        correct_answers: u32,
        incorrect_answers: u32,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mode,
            correct_answers,
            incorrect_answers,
            completed_at,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct_answers.saturating_add(self.incorrect_answers)
    }

    /// Whole-number percentage of correct answers, `0` for an empty result.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        let total = u64::from(self.total());
        if total == 0 {
            return 0;
        }
        let pct = u64::from(self.correct_answers) * 100 / total;
        u32::try_from(pct).unwrap_or(100)
    }
}
