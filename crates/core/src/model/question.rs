use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must offer between 3 and 5 options, got {count}")]
    OptionCount { count: usize },

    #[error("option listed twice: {0}")]
    DuplicateOption(String),

    #[error("question must have at least one correct answer")]
    NoCorrectAnswers,

    #[error("correct answer is not one of the options: {0}")]
    UnknownCorrectAnswer(String),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

pub const MIN_OPTIONS: usize = 3;
pub const MAX_OPTIONS: usize = 5;

/// A single multiple-choice question from the bank.
///
/// Options keep their bank order (that is the order they are shown in).
/// Correctness may require several options at once, so the correct answers
/// are a set rather than a single index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    theme_name: String,
    text: String,
    options: Vec<String>,
    correct_answers: BTreeSet<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, the option count falls
    /// outside `3..=5`, an option repeats, or the correct answers are empty or
    /// not a subset of the options.
    pub fn new(
        id: QuestionId,
        theme_name: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answers: impl IntoIterator<Item = String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(QuestionError::OptionCount {
                count: options.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption(option.clone()));
            }
        }

        let correct_answers: BTreeSet<String> = correct_answers.into_iter().collect();
        if correct_answers.is_empty() {
            return Err(QuestionError::NoCorrectAnswers);
        }
        if let Some(stray) = correct_answers.iter().find(|a| !seen.contains(a.as_str())) {
            return Err(QuestionError::UnknownCorrectAnswer(stray.clone()));
        }

        Ok(Self {
            id,
            theme_name: theme_name.into(),
            text,
            options,
            correct_answers,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answers(&self) -> &BTreeSet<String> {
        &self.correct_answers
    }

    /// Returns true if `option` is one of the offered options.
    #[must_use]
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    #[must_use]
    pub fn is_multi_answer(&self) -> bool {
        self.correct_answers.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn accepts_multi_answer_question() {
        let q = Question::new(
            QuestionId::new(1),
            "Water safety",
            "Which items are mandatory?",
            opts(&["X", "Y", "Z"]),
            opts(&["X", "Y"]),
        )
        .unwrap();

        assert!(q.is_multi_answer());
        assert!(q.offers("Z"));
        assert!(!q.offers("W"));
        assert_eq!(q.options(), ["X", "Y", "Z"]);
    }

    #[test]
    fn rejects_option_counts_outside_range() {
        let err = Question::new(QuestionId::new(1), "T", "Q", opts(&["A", "B"]), opts(&["A"]))
            .unwrap_err();
        assert_eq!(err, QuestionError::OptionCount { count: 2 });

        let err = Question::new(
            QuestionId::new(1),
            "T",
            "Q",
            opts(&["A", "B", "C", "D", "E", "F"]),
            opts(&["A"]),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::OptionCount { count: 6 });
    }

    #[test]
    fn rejects_correct_answer_outside_options() {
        let err = Question::new(
            QuestionId::new(1),
            "T",
            "Q",
            opts(&["A", "B", "C"]),
            opts(&["A", "D"]),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::UnknownCorrectAnswer("D".into()));
    }

    #[test]
    fn rejects_empty_correct_set_and_blank_text() {
        let err = Question::new(QuestionId::new(1), "T", "Q", opts(&["A", "B", "C"]), opts(&[]))
            .unwrap_err();
        assert_eq!(err, QuestionError::NoCorrectAnswers);

        let err = Question::new(QuestionId::new(1), "T", "  ", opts(&["A", "B", "C"]), opts(&["A"]))
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn rejects_duplicate_options() {
        let err = Question::new(
            QuestionId::new(1),
            "T",
            "Q",
            opts(&["A", "B", "A"]),
            opts(&["A"]),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption("A".into()));
    }
}
