//! Multiple-choice quizzes and the per-user attempt record.

mod recorder;
mod session;

pub use recorder::QuizRecorder;
pub use session::{AnswerFeedback, DEFAULT_CHOICES, QuizQuestion, QuizSession};
