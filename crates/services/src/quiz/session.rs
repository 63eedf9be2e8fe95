use chrono::{DateTime, Utc};
use fsl_core::model::{ItemKey, QuizId, QuizOutcome, TopicDescriptor, TopicItem};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::QuizSessionError;

/// Choices offered per question, correct answer included.
pub const DEFAULT_CHOICES: usize = 4;

/// One multiple-choice question: "which sign is this video?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    item: TopicItem,
    choices: Vec<ItemKey>,
}

impl QuizQuestion {
    /// The item whose media is shown.
    #[must_use]
    pub fn prompt(&self) -> &TopicItem {
        &self.item
    }

    #[must_use]
    pub fn choices(&self) -> &[ItemKey] {
        &self.choices
    }

    #[must_use]
    pub fn answer(&self) -> &ItemKey {
        self.item.key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub expected: ItemKey,
}

/// An in-progress quiz over one topic.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz_id: QuizId,
    questions: Vec<QuizQuestion>,
    current: usize,
    score: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Sample up to `question_count` distinct items and build a question for each.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Empty` if `question_count` is zero.
    pub fn generate<R: Rng + ?Sized>(
        topic: &TopicDescriptor,
        question_count: usize,
        rng: &mut R,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizSessionError> {
        let count = question_count.min(topic.item_count());
        if count == 0 {
            return Err(QuizSessionError::Empty);
        }

        let mut order: Vec<usize> = (0..topic.item_count()).collect();
        order.shuffle(rng);

        let questions = order
            .iter()
            .take(count)
            .map(|&index| build_question(topic, index, rng))
            .collect();

        Ok(Self {
            quiz_id: topic.quiz_id(),
            questions,
            current: 0,
            score: 0,
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// Questions answered so far.
    #[must_use]
    pub fn answered(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Answer the current question and move on.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Completed` once every question is answered.
    pub fn answer(&mut self, choice: &ItemKey, at: DateTime<Utc>) -> Result<AnswerFeedback, QuizSessionError> {
        let question = self
            .questions
            .get(self.current)
            .ok_or(QuizSessionError::Completed)?;

        let expected = question.answer().clone();
        let correct = &expected == choice;
        if correct {
            self.score += 1;
        }

        self.current += 1;
        if self.current == self.questions.len() {
            self.completed_at = Some(at.max(self.started_at));
        }

        Ok(AnswerFeedback { correct, expected })
    }

    /// Final result for the attempt recorder.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Unfinished` before the last answer, or a
    /// `QuizError` if the result is inconsistent.
    pub fn outcome(&self) -> Result<QuizOutcome, QuizSessionError> {
        let completed_at = self.completed_at.ok_or(QuizSessionError::Unfinished)?;
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        Ok(QuizOutcome::new(self.score, total, self.started_at, completed_at)?)
    }
}

fn build_question<R: Rng + ?Sized>(topic: &TopicDescriptor, index: usize, rng: &mut R) -> QuizQuestion {
    let item = topic.items()[index].clone();

    let mut distractors: Vec<ItemKey> = topic
        .items()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, other)| other.key().clone())
        .collect();
    distractors.shuffle(rng);
    distractors.truncate(DEFAULT_CHOICES - 1);

    let mut choices = distractors;
    choices.push(item.key().clone());
    choices.shuffle(rng);

    QuizQuestion { item, choices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fsl_core::catalog;
    use fsl_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn questions_are_distinct_and_contain_the_answer() {
        let topic = catalog::alphabet().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = QuizSession::generate(&topic, 10, &mut rng, fixed_now()).unwrap();
        assert_eq!(session.total(), 10);

        let mut seen = HashSet::new();
        while let Some(question) = session.current_question().cloned() {
            assert!(seen.insert(question.answer().clone()));
            assert_eq!(question.choices().len(), DEFAULT_CHOICES);
            assert!(question.choices().contains(question.answer()));
            let unique: HashSet<_> = question.choices().iter().collect();
            assert_eq!(unique.len(), DEFAULT_CHOICES);
            session.answer(question.answer(), fixed_now()).unwrap();
        }
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn question_count_is_capped_by_topic_size() {
        let topic = catalog::greetings().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let session = QuizSession::generate(&topic, 50, &mut rng, fixed_now()).unwrap();
        assert_eq!(session.total(), topic.item_count());
    }

    #[test]
    fn zero_questions_is_rejected() {
        let topic = catalog::numbers().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            QuizSession::generate(&topic, 0, &mut rng, fixed_now()),
            Err(QuizSessionError::Empty)
        ));
    }

    #[test]
    fn outcome_reports_score_and_duration() {
        let topic = catalog::numbers().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let start = fixed_now();
        let mut session = QuizSession::generate(&topic, 3, &mut rng, start).unwrap();
        assert!(matches!(session.outcome(), Err(QuizSessionError::Unfinished)));

        let wrong = ItemKey::new("not-a-number");
        let first = session.current_question().unwrap().answer().clone();
        assert!(session.answer(&first, start).unwrap().correct);
        assert!(!session.answer(&wrong, start).unwrap().correct);
        let third = session.current_question().unwrap().answer().clone();
        session.answer(&third, start + Duration::seconds(42)).unwrap();

        assert!(session.is_complete());
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.duration_secs(), 42);
        assert!(matches!(
            session.answer(&third, start),
            Err(QuizSessionError::Completed)
        ));
    }
}
