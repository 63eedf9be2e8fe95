use fsl_core::Clock;
use fsl_core::model::{QuizAttempt, QuizId, QuizOutcome, UserId};
use tracing::{info, warn};

use super::session::QuizSession;
use crate::error::QuizSessionError;
use crate::remote::ProgressRemote;

/// Folds finished quiz runs into the per-user quiz record.
#[derive(Clone)]
pub struct QuizRecorder {
    remote: ProgressRemote,
    clock: Clock,
}

impl QuizRecorder {
    #[must_use]
    pub fn new(remote: ProgressRemote, clock: Clock) -> Self {
        Self { remote, clock }
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Read the previous record, fold `outcome` into it and write it back.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::Sync` if the read or the write fails.
    pub async fn record_attempt(
        &self,
        user: &UserId,
        quiz: &QuizId,
        outcome: &QuizOutcome,
    ) -> Result<QuizAttempt, QuizSessionError> {
        let previous = self.remote.fetch_quiz(user, quiz).await?;
        let record = QuizAttempt::record(previous.as_ref(), outcome);
        self.remote.write_quiz(user, quiz, &record).await?;
        info!(
            %quiz,
            attempts = record.attempts,
            best = record.best_score,
            "recorded quiz attempt"
        );
        Ok(record)
    }

    /// Record a completed session for the signed-in user. Failures are logged
    /// and the quiz result screen is still shown.
    pub async fn record_session(&self, user: Option<&UserId>, session: &QuizSession) -> Option<QuizAttempt> {
        let Some(user) = user else {
            info!(quiz = %session.quiz_id(), "not signed in, quiz attempt not recorded");
            return None;
        };

        let outcome = match session.outcome() {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(quiz = %session.quiz_id(), error = %err, "quiz session has no recordable outcome");
                return None;
            }
        };

        match self.record_attempt(user, session.quiz_id(), &outcome).await {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(quiz = %session.quiz_id(), error = %err, "failed to record quiz attempt");
                None
            }
        }
    }
}
