//! The session state machine: answer tracking, grading on advance, and
//! result summarization.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::draw::SelectionError;
use crate::model::{
    Question, QuestionRecord, ScoringRule, SessionMode, SessionResult, SessionSettings,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Operations invoked out of sequence. These point at a caller bug and are
/// never recovered from inside the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session already completed")]
    Completed,

    #[error("current index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("option is not offered by the current question: {0}")]
    UnknownOption(String),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Completed,
}

/// Outcome of grading one question and moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Index of the question that was just graded.
    pub index: usize,
    pub was_correct: bool,
    /// True when the graded question was the last one; the session is now completed.
    pub is_last_question: bool,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub correct: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a drawn sequence of questions.
///
/// Only the question at `current_index` accepts answer changes. Each question
/// is graded exactly once, when the session advances past it. Dropping the
/// value abandons the attempt.
#[derive(Clone)]
pub struct Session {
    mode: SessionMode,
    scoring_rule: ScoringRule,
    pool: Vec<Question>,
    current: usize,
    selections: Vec<BTreeSet<String>>,
    grades: Vec<bool>,
    correct_count: usize,
    state: SessionState,
    started_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
}

impl Session {
    /// Start a session over an already drawn pool.
    ///
    /// Exam sessions get a deadline of `started_at + exam_duration`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyPool` if `pool` is empty.
    pub fn start(
        mode: SessionMode,
        pool: Vec<Question>,
        started_at: DateTime<Utc>,
        settings: &SessionSettings,
    ) -> Result<Self, SelectionError> {
        if pool.is_empty() {
            return Err(SelectionError::EmptyPool);
        }

        let deadline = mode
            .is_timed()
            .then(|| started_at + settings.exam_duration());

        Ok(Self {
            mode,
            scoring_rule: settings.scoring_rule(),
            selections: vec![BTreeSet::new(); pool.len()],
            grades: Vec::with_capacity(pool.len()),
            pool,
            current: 0,
            correct_count: 0,
            state: SessionState::InProgress,
            started_at,
            deadline,
        })
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.pool
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.pool.len()
    }

    /// The question awaiting an answer, or `None` once completed.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.pool.get(self.current)
    }

    /// Options selected so far for the current question.
    #[must_use]
    pub fn current_selection(&self) -> Option<&BTreeSet<String>> {
        if self.is_complete() {
            return None;
        }
        self.selections.get(self.current)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.grades.len();
        SessionProgress {
            total: self.pool.len(),
            answered,
            remaining: self.pool.len() - answered,
            correct: self.correct_count,
            is_complete: self.is_complete(),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionStateError> {
        if self.is_complete() {
            return Err(SessionStateError::Completed);
        }
        if self.current >= self.pool.len() {
            return Err(SessionStateError::IndexOutOfRange {
                index: self.current,
                len: self.pool.len(),
            });
        }
        Ok(())
    }

    /// Select `option` for the current question, or deselect it if already selected.
    ///
    /// Any number of options may be selected at once.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Completed` after the last advance,
    /// `SessionStateError::IndexOutOfRange` if there is no current question, and
    /// `SessionStateError::UnknownOption` if the option is not offered.
    pub fn toggle_answer(&mut self, option: &str) -> Result<&BTreeSet<String>, SessionStateError> {
        self.ensure_in_progress()?;
        if !self.pool[self.current].offers(option) {
            return Err(SessionStateError::UnknownOption(option.to_owned()));
        }

        let selected = &mut self.selections[self.current];
        if !selected.remove(option) {
            selected.insert(option.to_owned());
        }
        Ok(&*selected)
    }

    /// Grade the current question and move to the next one.
    ///
    /// Grading the last question completes the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Completed` if the session already completed,
    /// or `SessionStateError::IndexOutOfRange` if the cursor is invalid.
    pub fn advance(&mut self) -> Result<Advance, SessionStateError> {
        self.ensure_in_progress()?;

        let index = self.current;
        let question = &self.pool[index];
        let was_correct = self
            .scoring_rule
            .grade(&self.selections[index], question.correct_answers());

        self.grades.push(was_correct);
        if was_correct {
            self.correct_count += 1;
        }

        let is_last_question = index + 1 == self.pool.len();
        if is_last_question {
            self.state = SessionState::Completed;
        } else {
            self.current += 1;
        }

        Ok(Advance {
            index,
            was_correct,
            is_last_question,
        })
    }

    /// Freeze the session into a result.
    ///
    /// Graded questions keep their selection and grade. When called before the
    /// session completed (time ran out, or the user finished early), the
    /// ungraded current question and every unreached question are recorded as
    /// unanswered and incorrect.
    #[must_use]
    pub fn finalize(&self, completed_at: DateTime<Utc>) -> SessionResult {
        let records = self
            .pool
            .iter()
            .enumerate()
            .map(|(i, question)| match self.grades.get(i) {
                Some(&was_correct) => QuestionRecord {
                    question: question.clone(),
                    selected: self.selections[i].clone(),
                    was_correct,
                },
                None => QuestionRecord {
                    question: question.clone(),
                    selected: BTreeSet::new(),
                    was_correct: false,
                },
            })
            .collect();

        SessionResult::new(self.mode, self.started_at, completed_at, records)
    }

    /// End the session before its last advance (time ran out, or the user
    /// finished early) and freeze it into a result.
    ///
    /// The session becomes `Completed`; later toggles and advances fail.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Completed` if the session already completed,
    /// either through the last [`Session::advance`] or an earlier terminate.
    pub fn terminate(
        &mut self,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionResult, SessionStateError> {
        if self.is_complete() {
            return Err(SessionStateError::Completed);
        }
        self.state = SessionState::Completed;
        Ok(self.finalize(completed_at))
    }

    /// Seconds left before the exam deadline, rounded up and clamped at zero.
    ///
    /// Returns `None` for untimed (training) sessions.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let deadline = self.deadline?;
        let millis = (deadline - now).num_milliseconds().max(0);
        Some(u64::try_from(millis).unwrap_or(0).div_ceil(1000))
    }

    /// True once a timed session has reached its deadline.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("pool_len", &self.pool.len())
            .field("current", &self.current)
            .field("correct_count", &self.correct_count)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(id: u64, correct: &[&str]) -> Question {
        Question::new(
            QuestionId::new(id),
            "Rules",
            format!("Question {id}"),
            vec!["X".into(), "Y".into(), "Z".into()],
            correct.iter().map(|s| (*s).to_owned()),
        )
        .unwrap()
    }

    fn pool(len: u64) -> Vec<Question> {
        (1..=len).map(|id| question(id, &["X"])).collect()
    }

    fn training(pool: Vec<Question>) -> Session {
        Session::start(
            SessionMode::Training,
            pool,
            fixed_now(),
            &SessionSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn partial_selection_is_incorrect() {
        let mut session = training(vec![question(1, &["X", "Y"])]);
        session.toggle_answer("X").unwrap();
        let step = session.advance().unwrap();

        assert!(!step.was_correct);
        assert!(step.is_last_question);
        assert_eq!(session.correct_count(), 0);
        let result = session.finalize(fixed_now());
        assert!(!result.records()[0].was_correct);
    }

    #[test]
    fn exact_selection_is_correct() {
        let mut session = training(vec![question(1, &["X", "Y"])]);
        session.toggle_answer("X").unwrap();
        session.toggle_answer("Y").unwrap();
        let step = session.advance().unwrap();

        assert!(step.was_correct);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn extra_selection_is_incorrect_under_exact_match() {
        let mut session = training(vec![question(1, &["X", "Y"])]);
        for option in ["X", "Y", "Z"] {
            session.toggle_answer(option).unwrap();
        }
        assert!(!session.advance().unwrap().was_correct);
    }

    #[test]
    fn covers_correct_rule_accepts_extra_selection() {
        let settings = SessionSettings::default().with_scoring_rule(ScoringRule::CoversCorrect);
        let mut session = Session::start(
            SessionMode::Training,
            vec![question(1, &["X", "Y"])],
            fixed_now(),
            &settings,
        )
        .unwrap();
        for option in ["X", "Y", "Z"] {
            session.toggle_answer(option).unwrap();
        }
        assert!(session.advance().unwrap().was_correct);
    }

    #[test]
    fn toggling_twice_restores_selection() {
        let mut session = training(pool(2));
        session.toggle_answer("Y").unwrap();
        let before = session.current_selection().unwrap().clone();

        session.toggle_answer("Z").unwrap();
        let after = session.toggle_answer("Z").unwrap().clone();
        assert_eq!(before, after);
    }

    #[test]
    fn toggle_rejects_unknown_option() {
        let mut session = training(pool(1));
        assert_eq!(
            session.toggle_answer("W"),
            Err(SessionStateError::UnknownOption("W".into()))
        );
    }

    #[test]
    fn advancing_starts_next_question_with_empty_selection() {
        let mut session = training(pool(2));
        session.toggle_answer("X").unwrap();
        session.advance().unwrap();

        assert_eq!(session.current_index(), 1);
        assert!(session.current_selection().unwrap().is_empty());
        assert_eq!(session.current_question().unwrap().id(), QuestionId::new(2));
    }

    #[test]
    fn completed_session_rejects_operations() {
        let mut session = training(pool(1));
        session.advance().unwrap();
        assert!(session.is_complete());
        assert!(session.current_question().is_none());
        assert_eq!(session.advance(), Err(SessionStateError::Completed));
        assert_eq!(
            session.toggle_answer("X"),
            Err(SessionStateError::Completed)
        );
    }

    #[test]
    fn correct_count_is_monotonic_and_bounded() {
        let mut session = training(pool(6));
        let mut last = 0;
        for i in 0..6 {
            if i % 2 == 0 {
                session.toggle_answer("X").unwrap();
            }
            let step = session.advance().unwrap();
            assert!(session.correct_count() >= last);
            assert!(session.correct_count() <= step.index + 1);
            last = session.correct_count();
        }
        assert_eq!(session.correct_count(), 3);
    }

    #[test]
    fn finalize_conserves_counts() {
        let mut session = training(pool(5));
        session.toggle_answer("X").unwrap();
        session.advance().unwrap();
        session.toggle_answer("Y").unwrap();
        session.advance().unwrap();

        let result = session.finalize(fixed_now());
        assert_eq!(
            result.correct_count() + result.incorrect_count(),
            result.total_questions()
        );
        assert_eq!(result.records().len(), 5);
        assert_eq!(result.correct_count(), 1);
    }

    #[test]
    fn exam_of_forty_with_thirty_correct() {
        let now = fixed_now();
        let mut session =
            Session::start(SessionMode::Exam, pool(40), now, &SessionSettings::default()).unwrap();
        for i in 0..40 {
            if i < 30 {
                session.toggle_answer("X").unwrap();
            }
            session.advance().unwrap();
        }

        let result = session.finalize(now + Duration::minutes(30));
        assert_eq!(result.correct_count(), 30);
        assert_eq!(result.incorrect_count(), 10);
        let summary = result.summary().unwrap();
        assert_eq!(summary.mode(), SessionMode::Exam);
        assert_eq!(
            (summary.correct_answers(), summary.incorrect_answers()),
            (30, 10)
        );
    }

    #[test]
    fn forced_finalize_marks_unreached_questions_unanswered() {
        let now = fixed_now();
        let mut session =
            Session::start(SessionMode::Exam, pool(40), now, &SessionSettings::default()).unwrap();
        for _ in 0..10 {
            session.toggle_answer("X").unwrap();
            session.advance().unwrap();
        }
        // Current question has a pending, ungraded selection.
        session.toggle_answer("X").unwrap();
        assert_eq!(session.current_index(), 10);

        let deadline = session.deadline().unwrap();
        assert!(session.is_expired(deadline));
        let result = session.finalize(deadline);

        assert_eq!(result.correct_count(), 10);
        assert_eq!(result.incorrect_count(), 30);
        for record in &result.records()[10..] {
            assert!(record.selected.is_empty());
            assert!(!record.was_correct);
        }
    }

    #[test]
    fn remaining_seconds_counts_down_and_clamps() {
        let now = fixed_now();
        let session =
            Session::start(SessionMode::Exam, pool(1), now, &SessionSettings::default()).unwrap();

        assert_eq!(session.remaining_seconds(now), Some(2700));
        assert_eq!(
            session.remaining_seconds(now + Duration::seconds(2699)),
            Some(1)
        );
        assert_eq!(session.remaining_seconds(now + Duration::hours(2)), Some(0));
        assert!(!session.is_expired(now + Duration::minutes(44)));
    }

    #[test]
    fn last_partial_second_still_counts_as_time_left() {
        let now = fixed_now();
        let session =
            Session::start(SessionMode::Exam, pool(1), now, &SessionSettings::default()).unwrap();
        let almost = session.deadline().unwrap() - Duration::milliseconds(100);

        assert_eq!(session.remaining_seconds(almost), Some(1));
        assert!(!session.is_expired(almost));
        assert!(session.is_expired(session.deadline().unwrap()));
    }

    #[test]
    fn terminate_completes_once_and_blocks_further_steps() {
        let mut session =
            Session::start(SessionMode::Exam, pool(5), fixed_now(), &SessionSettings::default())
                .unwrap();
        session.toggle_answer("X").unwrap();
        session.advance().unwrap();

        let result = session.terminate(fixed_now()).unwrap();
        assert_eq!(result.total_questions(), 5);
        assert_eq!(result.correct_count(), 1);
        assert!(session.is_complete());
        assert_eq!(session.current_question(), None);

        assert_eq!(
            session.terminate(fixed_now()).unwrap_err(),
            SessionStateError::Completed
        );
        assert_eq!(session.advance().unwrap_err(), SessionStateError::Completed);
        assert_eq!(
            session.toggle_answer("X").unwrap_err(),
            SessionStateError::Completed
        );
    }

    #[test]
    fn terminate_after_last_advance_is_rejected() {
        let mut session = training(pool(1));
        session.advance().unwrap();
        assert_eq!(
            session.terminate(fixed_now()).unwrap_err(),
            SessionStateError::Completed
        );
    }

    #[test]
    fn training_sessions_are_untimed() {
        let session = training(pool(1));
        assert_eq!(session.deadline(), None);
        assert_eq!(session.remaining_seconds(fixed_now()), None);
        assert!(!session.is_expired(fixed_now() + Duration::days(1)));
    }

    #[test]
    fn empty_pool_cannot_start() {
        let err = Session::start(
            SessionMode::Training,
            Vec::new(),
            fixed_now(),
            &SessionSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::EmptyPool);
    }

    #[test]
    fn progress_tracks_answers() {
        let mut session = training(pool(3));
        session.toggle_answer("X").unwrap();
        session.advance().unwrap();
        assert_eq!(
            session.progress(),
            SessionProgress {
                total: 3,
                answered: 1,
                remaining: 2,
                correct: 1,
                is_complete: false,
            }
        );
    }
}
