mod ids;
mod learned;
mod progress;
mod quiz;
mod topic;

pub use ids::{ItemKey, ParseIdError, QuizId, TopicId, UserId};

pub use learned::{LearnedSet, completion_percentage};
pub use progress::{ProgressUpdate, RemoteProgress};
pub use quiz::{AttemptSnapshot, QuizAttempt, QuizError, QuizOutcome};
pub use topic::{CacheFieldNames, TopicDescriptor, TopicError, TopicItem};
