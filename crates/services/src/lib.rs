#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod identity;
pub mod lesson;
pub mod overview;
pub mod quiz;
pub mod remote;

pub use fsl_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, LessonError, QuizSessionError, SyncError};
pub use identity::{IdentityFeed, IdentityPublisher, identity_channel};
pub use lesson::{
    LessonProgress, LessonService, PendingSync, ReconcileOutcome, ReconcilePolicy, ReconcileTask,
    Relocation, RemoteSnapshot, SyncSettings,
};
pub use overview::{ProgressOverview, ProgressSource, TopicProgress};
pub use quiz::{AnswerFeedback, QuizQuestion, QuizRecorder, QuizSession};
pub use remote::ProgressRemote;
