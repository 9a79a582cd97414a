//! Randomized, non-repeating question selection for a new session.

use std::collections::{BTreeSet, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::{Question, QuestionBank, SessionMode, SessionSettings};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a draw is refused before any session exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("select at least one theme to start training")]
    NoThemesSelected,

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("question count must be > 0")]
    ZeroCount,

    #[error("selected themes contain no questions")]
    EmptyPool,
}

//
// ─── REQUEST ───────────────────────────────────────────────────────────────────
//

/// What the caller wants drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawRequest {
    /// Whole bank, exam-sized.
    Exam,
    /// Only the named themes; `count` overrides the training default.
    Training {
        themes: BTreeSet<String>,
        count: Option<u32>,
    },
}

impl DrawRequest {
    #[must_use]
    pub fn exam() -> Self {
        Self::Exam
    }

    /// Theme names are trimmed to match how the bank stores them.
    pub fn training<I, S>(themes: I, count: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Training {
            themes: themes
                .into_iter()
                .map(|name| Into::<String>::into(name).trim().to_owned())
                .collect(),
            count,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self {
            DrawRequest::Exam => SessionMode::Exam,
            DrawRequest::Training { .. } => SessionMode::Training,
        }
    }

    fn target_count(&self, settings: &SessionSettings) -> Result<usize, SelectionError> {
        let count = match self {
            DrawRequest::Exam => settings.exam_question_count(),
            DrawRequest::Training { count: Some(0), .. } => return Err(SelectionError::ZeroCount),
            DrawRequest::Training {
                count: Some(count), ..
            } => (*count).min(settings.max_question_count()),
            DrawRequest::Training { count: None, .. } => settings.training_default_count(),
        };
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }
}

//
// ─── DRAW ──────────────────────────────────────────────────────────────────────
//

/// Collect the questions a request may draw from, without duplicates.
///
/// # Errors
///
/// Returns `SelectionError::NoThemesSelected` for a training request with no
/// themes and `SelectionError::UnknownTheme` for a name missing from the bank.
pub fn candidate_pool<'a>(
    bank: &'a QuestionBank,
    request: &DrawRequest,
) -> Result<Vec<&'a Question>, SelectionError> {
    let mut seen = HashSet::new();
    let mut pool = Vec::new();

    match request {
        DrawRequest::Exam => {
            pool.extend(bank.questions().filter(|q| seen.insert(q.id())));
        }
        DrawRequest::Training { themes, .. } => {
            if themes.is_empty() {
                return Err(SelectionError::NoThemesSelected);
            }
            for name in themes {
                let theme = bank
                    .theme(name)
                    .ok_or_else(|| SelectionError::UnknownTheme(name.clone()))?;
                pool.extend(theme.questions().iter().filter(|q| seen.insert(q.id())));
            }
        }
    }

    Ok(pool)
}

/// Draw the question sequence for a new session.
///
/// Samples `min(target, pool)` questions uniformly without replacement
/// (partial Fisher-Yates); the returned order is the presentation order.
/// The result depends only on the inputs and the state of `rng`.
///
/// # Errors
///
/// Returns `SelectionError` when the request selects no themes, names an
/// unknown theme, asks for zero questions, or leaves nothing to draw from.
pub fn draw_questions<R: Rng + ?Sized>(
    bank: &QuestionBank,
    settings: &SessionSettings,
    request: &DrawRequest,
    rng: &mut R,
) -> Result<Vec<Question>, SelectionError> {
    let target = request.target_count(settings)?;
    let mut pool = candidate_pool(bank, request)?;
    if pool.is_empty() {
        return Err(SelectionError::EmptyPool);
    }

    let take = target.min(pool.len());
    let (picked, _) = pool.partial_shuffle(rng, take);
    Ok(picked.iter().map(|q| (*q).clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BankDocument, QuestionDocument, ThemeDocument};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn theme(name: &str, count: usize) -> ThemeDocument {
        ThemeDocument {
            theme_name: name.to_owned(),
            questions: (0..count)
                .map(|i| QuestionDocument {
                    question: format!("{name} #{i}"),
                    options: vec!["A".into(), "B".into(), "C".into()],
                    correct_answers: vec!["A".into()],
                })
                .collect(),
        }
    }

    fn bank(themes: Vec<ThemeDocument>) -> QuestionBank {
        QuestionBank::from_document(BankDocument { themes }).unwrap()
    }

    fn ids(questions: &[Question]) -> Vec<u64> {
        questions.iter().map(|q| q.id().value()).collect()
    }

    #[test]
    fn requested_theme_names_are_trimmed() {
        let bank = bank(vec![theme("Navigation rules", 2)]);
        let mut rng = StdRng::seed_from_u64(5);
        let drawn = draw_questions(
            &bank,
            &SessionSettings::default(),
            &DrawRequest::training(["  Navigation rules "], None),
            &mut rng,
        )
        .unwrap();
        assert_eq!(drawn.len(), 2);
    }

    #[test]
    fn small_training_pool_is_drawn_whole() {
        let bank = bank(vec![theme("A", 2), theme("B", 1)]);
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = draw_questions(
            &bank,
            &SessionSettings::default(),
            &DrawRequest::training(["A", "B"], None),
            &mut rng,
        )
        .unwrap();

        let mut sorted = ids(&drawn);
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn exam_draw_is_capped_and_unique() {
        let bank = bank(vec![theme("A", 30), theme("B", 30)]);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let drawn = draw_questions(
                &bank,
                &SessionSettings::default(),
                &DrawRequest::exam(),
                &mut rng,
            )
            .unwrap();
            assert_eq!(drawn.len(), 40);
            let unique: HashSet<_> = drawn.iter().map(Question::id).collect();
            assert_eq!(unique.len(), 40);
        }
    }

    #[test]
    fn training_draw_respects_default_and_requested_counts() {
        let bank = bank(vec![theme("A", 50)]);
        let settings = SessionSettings::default();
        let mut rng = StdRng::seed_from_u64(3);

        let default = draw_questions(&bank, &settings, &DrawRequest::training(["A"], None), &mut rng)
            .unwrap();
        assert_eq!(default.len(), 20);

        let requested =
            draw_questions(&bank, &settings, &DrawRequest::training(["A"], Some(7)), &mut rng)
                .unwrap();
        assert_eq!(requested.len(), 7);

        let clamped =
            draw_questions(&bank, &settings, &DrawRequest::training(["A"], Some(500)), &mut rng)
                .unwrap();
        assert_eq!(clamped.len(), 40);
    }

    #[test]
    fn training_only_draws_selected_themes() {
        let bank = bank(vec![theme("A", 5), theme("B", 5)]);
        let mut rng = StdRng::seed_from_u64(11);
        let drawn = draw_questions(
            &bank,
            &SessionSettings::default(),
            &DrawRequest::training(["B"], None),
            &mut rng,
        )
        .unwrap();
        assert_eq!(drawn.len(), 5);
        assert!(drawn.iter().all(|q| q.theme_name() == "B"));
    }

    #[test]
    fn same_seed_same_draw() {
        let bank = bank(vec![theme("A", 60)]);
        let settings = SessionSettings::default();
        let a = draw_questions(&bank, &settings, &DrawRequest::exam(), &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = draw_questions(&bank, &settings, &DrawRequest::exam(), &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn different_seeds_reorder() {
        let bank = bank(vec![theme("A", 60)]);
        let settings = SessionSettings::default();
        let draws: HashSet<Vec<u64>> = (0..5)
            .map(|seed| {
                ids(&draw_questions(
                    &bank,
                    &settings,
                    &DrawRequest::exam(),
                    &mut StdRng::seed_from_u64(seed),
                )
                .unwrap())
            })
            .collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn rejects_invalid_selections() {
        let bank = bank(vec![theme("A", 3), theme("Empty", 0)]);
        let settings = SessionSettings::default();
        let mut rng = StdRng::seed_from_u64(0);

        let none: [&str; 0] = [];
        assert_eq!(
            draw_questions(&bank, &settings, &DrawRequest::training(none, None), &mut rng),
            Err(SelectionError::NoThemesSelected)
        );
        assert_eq!(
            draw_questions(&bank, &settings, &DrawRequest::training(["Nope"], None), &mut rng),
            Err(SelectionError::UnknownTheme("Nope".into()))
        );
        assert_eq!(
            draw_questions(&bank, &settings, &DrawRequest::training(["Empty"], None), &mut rng),
            Err(SelectionError::EmptyPool)
        );
        assert_eq!(
            draw_questions(&bank, &settings, &DrawRequest::training(["A"], Some(0)), &mut rng),
            Err(SelectionError::ZeroCount)
        );
    }

    #[test]
    fn exam_from_empty_bank_is_rejected() {
        let bank = QuestionBank::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            draw_questions(&bank, &SessionSettings::default(), &DrawRequest::exam(), &mut rng),
            Err(SelectionError::EmptyPool)
        );
    }
}
