use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("theme name cannot be empty")]
    EmptyThemeName,

    #[error("theme listed twice: {0}")]
    DuplicateTheme(String),

    #[error("invalid question #{index} in theme {theme:?}: {source}")]
    InvalidQuestion {
        theme: String,
        index: usize,
        #[source]
        source: QuestionError,
    },
}

//
// ─── SOURCE DOCUMENT ───────────────────────────────────────────────────────────
//

/// Serialized shape of a question bank, as shipped with the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDocument {
    pub themes: Vec<ThemeDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDocument {
    pub theme_name: String,
    pub questions: Vec<QuestionDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDocument {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
}

//
// ─── THEMES ────────────────────────────────────────────────────────────────────
//

/// Named topical grouping of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    questions: Vec<Question>,
}

impl Theme {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Theme name with its question count, for theme pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeOverview {
    pub name: String,
    pub question_count: usize,
}

//
// ─── BANK ──────────────────────────────────────────────────────────────────────
//

/// Immutable catalog of themes and their questions.
///
/// Loaded once at startup and only read afterwards. Question ids are assigned
/// here, in document order across all themes, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionBank {
    themes: Vec<Theme>,
}

impl QuestionBank {
    /// Build a bank from its serialized document.
    ///
    /// An empty document is accepted; drawing from it is what fails.
    ///
    /// # Errors
    ///
    /// Returns `BankError` for blank or repeated theme names and for any
    /// question that fails validation.
    pub fn from_document(document: BankDocument) -> Result<Self, BankError> {
        let mut names = HashSet::new();
        let mut next_id = 1_u64;
        let mut themes = Vec::with_capacity(document.themes.len());

        for theme in document.themes {
            let name = theme.theme_name.trim().to_owned();
            if name.is_empty() {
                return Err(BankError::EmptyThemeName);
            }
            if !names.insert(name.clone()) {
                return Err(BankError::DuplicateTheme(name));
            }

            let mut questions = Vec::with_capacity(theme.questions.len());
            for (index, doc) in theme.questions.into_iter().enumerate() {
                let question = Question::new(
                    QuestionId::new(next_id),
                    name.clone(),
                    doc.question,
                    doc.options,
                    doc.correct_answers,
                )
                .map_err(|source| BankError::InvalidQuestion {
                    theme: name.clone(),
                    index,
                    source,
                })?;
                next_id += 1;
                questions.push(question);
            }

            themes.push(Theme { name, questions });
        }

        Ok(Self { themes })
    }

    #[must_use]
    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    #[must_use]
    pub fn theme(&self, name: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.name == name)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|t| t.name.as_str())
    }

    /// All questions across every theme, in bank order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.themes.iter().flat_map(|t| t.questions.iter())
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.themes.iter().map(|t| t.questions.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.question_count() == 0
    }

    #[must_use]
    pub fn theme_overview(&self) -> Vec<ThemeOverview> {
        self.themes
            .iter()
            .map(|t| ThemeOverview {
                name: t.name.clone(),
                question_count: t.questions.len(),
            })
            .collect()
    }
}
