use std::collections::BTreeSet;

use chrono::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("exam question count must be > 0")]
    InvalidExamQuestionCount,

    #[error("exam duration must be > 0 seconds")]
    InvalidExamDuration,

    #[error("training default count must be > 0")]
    InvalidTrainingDefaultCount,

    #[error("max question count ({max}) must cover the exam and training counts")]
    InvalidMaxQuestionCount { max: u32 },
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Rule that decides whether a selection earns the point for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringRule {
    /// The selection must equal the correct-answer set: nothing missing, nothing extra.
    #[default]
    ExactMatch,
    /// Every correct answer must be selected; extra selections are ignored.
    CoversCorrect,
}

impl ScoringRule {
    #[must_use]
    pub fn grade(self, selected: &BTreeSet<String>, correct: &BTreeSet<String>) -> bool {
        match self {
            ScoringRule::ExactMatch => selected == correct,
            ScoringRule::CoversCorrect => selected.is_superset(correct),
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Knobs for how sessions are drawn, timed, and scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    exam_question_count: u32,
    exam_duration_secs: u32,
    training_default_count: u32,
    max_question_count: u32,
    scoring_rule: ScoringRule,
}

impl Default for SessionSettings {
    /// The certification exam format:
    /// - 40 questions drawn from the whole bank
    /// - 45 minutes on the clock
    /// - 20 questions per training round unless asked otherwise
    /// - exact-match scoring
    fn default() -> Self {
        Self {
            exam_question_count: 40,
            exam_duration_secs: 45 * 60,
            training_default_count: 20,
            max_question_count: 40,
            scoring_rule: ScoringRule::ExactMatch,
        }
    }
}

impl SessionSettings {
    /// Creates custom session settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a count or the duration is zero, or if
    /// `max_question_count` is below either of the two counts.
    pub fn new(
        exam_question_count: u32,
        exam_duration_secs: u32,
        training_default_count: u32,
        max_question_count: u32,
        scoring_rule: ScoringRule,
    ) -> Result<Self, SettingsError> {
        if exam_question_count == 0 {
            return Err(SettingsError::InvalidExamQuestionCount);
        }
        if exam_duration_secs == 0 {
            return Err(SettingsError::InvalidExamDuration);
        }
        if training_default_count == 0 {
            return Err(SettingsError::InvalidTrainingDefaultCount);
        }
        if max_question_count < exam_question_count || max_question_count < training_default_count
        {
            return Err(SettingsError::InvalidMaxQuestionCount {
                max: max_question_count,
            });
        }

        Ok(Self {
            exam_question_count,
            exam_duration_secs,
            training_default_count,
            max_question_count,
            scoring_rule,
        })
    }

    #[must_use]
    pub fn with_scoring_rule(mut self, rule: ScoringRule) -> Self {
        self.scoring_rule = rule;
        self
    }

    #[must_use]
    pub fn exam_question_count(&self) -> u32 {
        self.exam_question_count
    }

    #[must_use]
    pub fn exam_duration_secs(&self) -> u32 {
        self.exam_duration_secs
    }

    #[must_use]
    pub fn exam_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.exam_duration_secs))
    }

    #[must_use]
    pub fn training_default_count(&self) -> u32 {
        self.training_default_count
    }

    #[must_use]
    pub fn max_question_count(&self) -> u32 {
        self.max_question_count
    }

    #[must_use]
    pub fn scoring_rule(&self) -> ScoringRule {
        self.scoring_rule
    }
}
