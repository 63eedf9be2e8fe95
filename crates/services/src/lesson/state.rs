use chrono::{DateTime, Utc};
use fsl_core::model::LearnedSet;

use super::resume::ResumePoint;

/// Mutable state of one open lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonState {
    pub(crate) index: usize,
    pub(crate) learned: LearnedSet,
    /// When the displayed position was last written locally.
    pub(crate) position_saved_at: Option<DateTime<Utc>>,
    pub(crate) reconciled: bool,
}

impl LessonState {
    #[must_use]
    pub fn from_resume(point: ResumePoint) -> Self {
        Self {
            index: point.index,
            learned: point.learned,
            position_saved_at: point.position_saved_at,
            reconciled: false,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn learned(&self) -> &LearnedSet {
        &self.learned
    }

    #[must_use]
    pub fn position_saved_at(&self) -> Option<DateTime<Utc>> {
        self.position_saved_at
    }

    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }
}
