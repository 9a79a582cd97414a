use std::path::Path;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{QuestionBank, SessionSettings};
use storage::repository::Storage;

use crate::bank_source::BankSource;
use crate::error::AppServicesError;
use crate::sessions::{QuizLoopService, ResultHistoryService};

/// Assembles app-facing services around one bank and one result store.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    bank: Arc<QuestionBank>,
    quiz_loop: Arc<QuizLoopService>,
    history: Arc<ResultHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and a bank file.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank cannot be loaded or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        bank_path: impl AsRef<Path>,
        clock: Clock,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let bank = BankSource::from_path(bank_path)?;
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_parts(Arc::new(bank), &storage, clock, settings))
    }

    /// Build services over an in-memory result store.
    #[must_use]
    pub fn in_memory(bank: QuestionBank, clock: Clock, settings: SessionSettings) -> Self {
        Self::from_parts(Arc::new(bank), &Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_parts(
        bank: Arc<QuestionBank>,
        storage: &Storage,
        clock: Clock,
        settings: SessionSettings,
    ) -> Self {
        let quiz_loop = Arc::new(
            QuizLoopService::new(clock, Arc::clone(&bank), Arc::clone(&storage.results))
                .with_settings(settings),
        );
        let history = Arc::new(ResultHistoryService::new(Arc::clone(&storage.results)));
        Self {
            storage: storage.clone(),
            bank,
            quiz_loop,
            history,
        }
    }

    #[must_use]
    pub fn bank(&self) -> Arc<QuestionBank> {
        Arc::clone(&self.bank)
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<ResultHistoryService> {
        Arc::clone(&self.history)
    }

    /// Close the result store. Call once before the process exits.
    pub async fn close(&self) {
        self.storage.close().await;
    }
}
