use std::path::Path;

use quiz_core::model::{BankDocument, QuestionBank};

use crate::error::BankLoadError;

/// Loads the static question bank document.
pub struct BankSource;

impl BankSource {
    /// Parse and validate a bank from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `BankLoadError::Parse` for malformed JSON and
    /// `BankLoadError::Invalid` for content that fails validation.
    pub fn from_json_str(json: &str) -> Result<QuestionBank, BankLoadError> {
        let document: BankDocument = serde_json::from_str(json)?;
        let bank = QuestionBank::from_document(document)?;
        tracing::debug!(
            themes = bank.themes().len(),
            questions = bank.question_count(),
            "question bank loaded"
        );
        Ok(bank)
    }

    /// Read, parse, and validate a bank file.
    ///
    /// # Errors
    ///
    /// Returns `BankLoadError::Io` if the file cannot be read, otherwise as
    /// [`BankSource::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<QuestionBank, BankLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| BankLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
