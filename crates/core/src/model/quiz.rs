use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::learned::completion_percentage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz must have at least one question")]
    NoQuestions,

    #[error("score {score} exceeds total {total}")]
    ScoreAboveTotal { score: u32, total: u32 },

    #[error("quiz completed before it started")]
    InvalidTimeRange,
}

/// Result of one finished quiz run, before it is folded into the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl QuizOutcome {
    /// # Errors
    ///
    /// Returns `QuizError` if there are no questions, the score exceeds the
    /// total, or the completion time precedes the start time.
    pub fn new(
        score: u32,
        total: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if total == 0 {
            return Err(QuizError::NoQuestions);
        }
        if score > total {
            return Err(QuizError::ScoreAboveTotal { score, total });
        }
        if completed_at < started_at {
            return Err(QuizError::InvalidTimeRange);
        }
        Ok(Self {
            score,
            total,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        completion_percentage(self.score, self.total)
    }

    /// Wall-clock duration in whole seconds, floored.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        let secs = self
            .completed_at
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(secs).unwrap_or(0)
    }
}

/// Snapshot of the latest run stored alongside the aggregate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub completed_at: DateTime<Utc>,
    /// Seconds.
    pub duration: u64,
}

/// Stored quiz record, one per user × quiz.
///
/// `best_score`/`best_percentage` never decrease; `attempts` grows by one per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizAttempt {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<AttemptSnapshot>,
    pub best_score: u32,
    pub best_percentage: u32,
}

impl QuizAttempt {
    /// Fold a finished run into the previous record (absent = zero-valued).
    #[must_use]
    pub fn record(previous: Option<&QuizAttempt>, outcome: &QuizOutcome) -> Self {
        let zero = QuizAttempt::default();
        let previous = previous.unwrap_or(&zero);
        let percentage = outcome.percentage();

        Self {
            score: outcome.score,
            total_questions: outcome.total,
            percentage,
            attempts: previous.attempts.saturating_add(1),
            last_attempt: Some(AttemptSnapshot {
                score: outcome.score,
                total: outcome.total,
                percentage,
                completed_at: outcome.completed_at,
                duration: outcome.duration_secs(),
            }),
            best_score: previous.best_score.max(outcome.score),
            best_percentage: previous.best_percentage.max(percentage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn outcome(score: u32, total: u32) -> QuizOutcome {
        let start = fixed_now();
        QuizOutcome::new(score, total, start, start + Duration::milliseconds(95_900)).unwrap()
    }

    #[test]
    fn first_attempt_starts_from_zero() {
        let record = QuizAttempt::record(None, &outcome(7, 10));
        assert_eq!(record.attempts, 1);
        assert_eq!(record.best_score, 7);
        assert_eq!(record.best_percentage, 70);
        let last = record.last_attempt.unwrap();
        assert_eq!(last.duration, 95);
    }

    #[test]
    fn best_score_is_monotonic() {
        let scores = [6, 9, 4, 9, 2];
        let mut record: Option<QuizAttempt> = None;
        for score in scores {
            record = Some(QuizAttempt::record(record.as_ref(), &outcome(score, 10)));
        }
        let record = record.unwrap();
        assert_eq!(record.attempts, 5);
        assert_eq!(record.best_score, 9);
        assert_eq!(record.best_percentage, 90);
        assert_eq!(record.score, 2);
        assert_eq!(record.percentage, 20);
    }

    #[test]
    fn outcome_validation() {
        let now = fixed_now();
        assert_eq!(QuizOutcome::new(1, 0, now, now), Err(QuizError::NoQuestions));
        assert_eq!(
            QuizOutcome::new(4, 3, now, now),
            Err(QuizError::ScoreAboveTotal { score: 4, total: 3 })
        );
        assert_eq!(
            QuizOutcome::new(1, 3, now, now - Duration::seconds(1)),
            Err(QuizError::InvalidTimeRange)
        );
    }

    #[test]
    fn record_serializes_document_shape() {
        let record = QuizAttempt::record(None, &outcome(3, 4));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalQuestions"], 4);
        assert_eq!(json["bestPercentage"], 75);
        assert_eq!(json["lastAttempt"]["duration"], 95);
    }
}
