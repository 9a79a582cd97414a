use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::model::{QuestionBank, SessionResult, SessionSettings};
use quiz_core::{Advance, Clock, DrawRequest, Session, draw_questions};
use storage::repository::ResultRepository;

use crate::error::QuizError;

/// A finished session together with the outcome of saving it.
///
/// The result stays valid and displayable even when saving failed; only its
/// durability is affected.
#[derive(Debug)]
pub struct SessionCompletion {
    pub result: SessionResult,
    pub persisted: Result<i64, QuizError>,
}

impl SessionCompletion {
    /// Storage id of the saved result, if saving succeeded.
    #[must_use]
    pub fn result_id(&self) -> Option<i64> {
        self.persisted.as_ref().ok().copied()
    }

    /// The save failure to show as a non-blocking warning, if any.
    #[must_use]
    pub fn warning(&self) -> Option<&QuizError> {
        self.persisted.as_ref().err()
    }
}

/// Result of advancing a session through the service.
#[derive(Debug)]
pub struct QuizAdvance {
    pub advance: Advance,
    /// Present when the advance completed the session.
    pub completion: Option<SessionCompletion>,
}

/// Orchestrates session start, completion, and result persistence.
///
/// Answer toggling happens directly on the `Session`; this service only steps
/// in where time, randomness, or the result store are involved.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    settings: SessionSettings,
    results: Arc<dyn ResultRepository>,
    draw_seed: Option<u64>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, bank: Arc<QuestionBank>, results: Arc<dyn ResultRepository>) -> Self {
        Self {
            clock,
            bank,
            settings: SessionSettings::default(),
            results,
            draw_seed: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Seed every draw from a fixed value, making session order reproducible.
    #[must_use]
    pub fn with_draw_seed(mut self, seed: u64) -> Self {
        self.draw_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Start an exam over the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selection` if the bank has no questions.
    pub fn start_exam(&self) -> Result<Session, QuizError> {
        self.start(&DrawRequest::exam())
    }

    /// Start a training round over the given themes.
    ///
    /// `count` overrides the configured training size.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selection` if no themes are selected, a theme is
    /// unknown, `count` is zero, or the themes hold no questions.
    pub fn start_training<I, S>(&self, themes: I, count: Option<u32>) -> Result<Session, QuizError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start(&DrawRequest::training(themes, count))
    }

    /// Draw questions for `request` and start a session at the current time.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Selection` if the request cannot be drawn.
    pub fn start(&self, request: &DrawRequest) -> Result<Session, QuizError> {
        let pool = match self.draw_seed {
            Some(seed) => draw_questions(
                &self.bank,
                &self.settings,
                request,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => draw_questions(&self.bank, &self.settings, request, &mut rand::rng()),
        }?;

        let session = Session::start(request.mode(), pool, self.clock.now(), &self.settings)?;
        tracing::info!(
            mode = %session.mode(),
            questions = session.len(),
            "session started"
        );
        Ok(session)
    }

    /// Grade the current question and, on the last one, finalize and save.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::State` if the session already completed.
    pub async fn advance(&self, session: &mut Session) -> Result<QuizAdvance, QuizError> {
        let advance = session.advance()?;
        let completion = if advance.is_last_question {
            Some(self.complete(session.finalize(self.clock.now())).await)
        } else {
            None
        };
        Ok(QuizAdvance {
            advance,
            completion,
        })
    }

    /// End a session before its last question: the user finished early or
    /// the exam ran out of time. The session is left `Completed`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::State` if the session already completed, whether
    /// through [`QuizLoopService::advance`] or an earlier finish. Either one
    /// saved it then.
    pub async fn finish(&self, session: &mut Session) -> Result<SessionCompletion, QuizError> {
        let result = session.terminate(self.clock.now())?;
        Ok(self.complete(result).await)
    }

    /// Force-finish an exam whose time is up. Host code calls this on each tick.
    ///
    /// Returns `Ok(None)` while time remains, for untimed sessions, and for
    /// sessions that already completed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` only if finishing fails.
    pub async fn expire_if_due(
        &self,
        session: &mut Session,
    ) -> Result<Option<SessionCompletion>, QuizError> {
        if session.is_complete() || !session.is_expired(self.clock.now()) {
            return Ok(None);
        }
        tracing::info!(
            answered = session.progress().answered,
            total = session.len(),
            "exam time expired, finishing session"
        );
        self.finish(session).await.map(Some)
    }

    /// Seconds left on the exam clock, `None` for training.
    #[must_use]
    pub fn remaining_seconds(&self, session: &Session) -> Option<u64> {
        session.remaining_seconds(self.clock.now())
    }

    /// Save a result again after an earlier failure. Never called automatically.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if saving fails again.
    pub async fn retry_persist(&self, result: &SessionResult) -> Result<i64, QuizError> {
        self.persist(result).await
    }

    async fn persist(&self, result: &SessionResult) -> Result<i64, QuizError> {
        let summary = result.summary()?;
        Ok(self.results.insert_result(&summary).await?)
    }

    async fn complete(&self, result: SessionResult) -> SessionCompletion {
        let persisted = self.persist(&result).await;
        match &persisted {
            Ok(id) => tracing::info!(
                result_id = id,
                mode = %result.mode(),
                correct = result.correct_count(),
                incorrect = result.incorrect_count(),
                "session completed"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                mode = %result.mode(),
                "session completed but the result could not be saved"
            ),
        }
        SessionCompletion { result, persisted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::SessionStateError;
    use quiz_core::model::{BankDocument, QuestionDocument, ThemeDocument};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ResultFilter};

    fn bank(themes: &[(&str, usize)]) -> Arc<QuestionBank> {
        let document = BankDocument {
            themes: themes
                .iter()
                .map(|(name, count)| ThemeDocument {
                    theme_name: (*name).to_owned(),
                    questions: (0..*count)
                        .map(|i| QuestionDocument {
                            question: format!("{name} {i}"),
                            options: vec!["yes".into(), "no".into(), "maybe".into()],
                            correct_answers: vec!["yes".into()],
                        })
                        .collect(),
                })
                .collect(),
        };
        Arc::new(QuestionBank::from_document(document).unwrap())
    }

    fn service(bank: Arc<QuestionBank>) -> QuizLoopService {
        QuizLoopService::new(
            Clock::fixed(fixed_now()),
            bank,
            Arc::new(InMemoryRepository::new()),
        )
        .with_draw_seed(42)
    }

    #[test]
    fn seeded_starts_are_reproducible() {
        let svc = service(bank(&[("A", 50)]));
        let a = svc.start_exam().unwrap();
        let b = svc.start_exam().unwrap();
        let ids = |s: &Session| s.questions().iter().map(|q| q.id()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn training_without_themes_is_refused() {
        let svc = service(bank(&[("A", 5)]));
        let none: Vec<String> = Vec::new();
        let err = svc.start_training(none, None).unwrap_err();
        assert!(matches!(
            err,
            QuizError::Selection(quiz_core::SelectionError::NoThemesSelected)
        ));
    }

    #[tokio::test]
    async fn finish_refuses_completed_session() {
        let svc = service(bank(&[("A", 1)]));
        let mut session = svc.start_training(["A"], None).unwrap();
        let step = svc.advance(&mut session).await.unwrap();
        assert!(step.completion.is_some());

        let err = svc.finish(&mut session).await.unwrap_err();
        assert!(matches!(err, QuizError::State(SessionStateError::Completed)));
    }

    #[tokio::test]
    async fn expiry_only_fires_for_exams_past_deadline() {
        let svc = service(bank(&[("A", 3)]));
        let mut exam = svc.start_exam().unwrap();
        let mut training = svc.start_training(["A"], None).unwrap();
        assert!(svc.expire_if_due(&mut exam).await.unwrap().is_none());

        let later = svc
            .clone()
            .with_clock(Clock::fixed(fixed_now() + chrono::Duration::minutes(45)));
        assert_eq!(later.remaining_seconds(&exam), Some(0));
        assert!(later.expire_if_due(&mut training).await.unwrap().is_none());

        let completion = later
            .expire_if_due(&mut exam)
            .await
            .unwrap()
            .expect("expired");
        assert_eq!(completion.result.correct_count(), 0);
        assert_eq!(completion.result.total_questions(), 3);
        assert!(completion.result_id().is_some());
    }

    #[tokio::test]
    async fn expired_exam_is_saved_exactly_once() {
        let repo = InMemoryRepository::new();
        let svc = QuizLoopService::new(
            Clock::fixed(fixed_now()),
            bank(&[("A", 5)]),
            Arc::new(repo.clone()),
        )
        .with_draw_seed(7);
        let mut exam = svc.start_exam().unwrap();
        let late = svc
            .clone()
            .with_clock(Clock::fixed(fixed_now() + chrono::Duration::minutes(46)));

        assert!(late.expire_if_due(&mut exam).await.unwrap().is_some());
        for _ in 0..2 {
            assert!(late.expire_if_due(&mut exam).await.unwrap().is_none());
        }
        assert!(matches!(
            late.finish(&mut exam).await.unwrap_err(),
            QuizError::State(SessionStateError::Completed)
        ));
        assert!(matches!(
            late.advance(&mut exam).await.unwrap_err(),
            QuizError::State(SessionStateError::Completed)
        ));

        let rows = repo.list_results(ResultFilter::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary.incorrect_answers(), 5);
    }

    #[tokio::test]
    async fn early_finish_blocks_further_answers() {
        let repo = InMemoryRepository::new();
        let svc = QuizLoopService::new(
            Clock::fixed(fixed_now()),
            bank(&[("A", 4)]),
            Arc::new(repo.clone()),
        );
        let mut session = svc.start_training(["A"], None).unwrap();
        session.toggle_answer("yes").unwrap();
        svc.advance(&mut session).await.unwrap();

        let completion = svc.finish(&mut session).await.unwrap();
        assert_eq!(completion.result.correct_count(), 1);
        assert!(session.is_complete());
        assert!(session.toggle_answer("yes").is_err());

        let rows = repo.list_results(ResultFilter::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
