mod reconcile;
mod resume;
mod service;
mod state;

// Public API of the lesson progress subsystem.
pub use reconcile::{
    ReconcileOutcome, ReconcilePolicy, ReconcileTask, Relocation, RemoteSnapshot, SyncSettings,
};
pub use resume::{ResumePoint, resolve_initial_position, resume};
pub use service::{LessonProgress, LessonService, PendingSync};
pub use state::LessonState;
