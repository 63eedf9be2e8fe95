use std::sync::Arc;

use fsl_core::Clock;
use fsl_core::model::{ItemKey, LearnedSet, RemoteProgress, TopicDescriptor, UserId};
use tracing::{debug, warn};

use crate::remote::ProgressRemote;

/// How local and remote state are combined when a page reconciles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// The remote document is authoritative: its learned set replaces the local
    /// one and its last viewed item always relocates the page. A learn event
    /// still in flight when the fetch resolves can be lost locally.
    #[default]
    RemoteWins,
    /// Union local and remote learned sets, and relocate only when the remote
    /// `lastUpdated` is newer than the local position record. Keys only known
    /// locally are pushed back to the remote store.
    MergeNewest,
}

impl ReconcilePolicy {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "remote-wins" => Some(Self::RemoteWins),
            "merge-newest" => Some(Self::MergeNewest),
            _ => None,
        }
    }
}

/// Knobs for the lesson engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSettings {
    pub policy: ReconcilePolicy,
}

/// Result of the asynchronous half of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSnapshot {
    /// The document exists; apply it.
    Found(RemoteProgress),
    /// First visit: the document was just created from local state.
    Bootstrapped,
    /// Reading (or bootstrapping) failed; local state stays in charge.
    Unavailable,
}

/// A page moved because the remote store knew a different last viewed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No signed-in user; nothing to reconcile against.
    LocalOnly,
    Unavailable,
    Bootstrapped,
    Applied {
        relocated: Option<Relocation>,
        learned: usize,
        /// Local keys the remote lacked were scheduled for upload.
        pushed_back: bool,
    },
}

/// Network half of a reconciliation.
///
/// Holds only owned snapshots of page state, so the page stays free to handle
/// navigation while the fetch is in flight. The result goes back through
/// `LessonService::apply_reconciliation`.
pub struct ReconcileTask {
    pub(crate) remote: ProgressRemote,
    pub(crate) clock: Clock,
    pub(crate) user: UserId,
    pub(crate) topic: Arc<TopicDescriptor>,
    pub(crate) displayed: ItemKey,
    pub(crate) local_learned: LearnedSet,
    pub(crate) policy: ReconcilePolicy,
}

impl ReconcileTask {
    /// Fetch the topic document, creating it on the first ever visit.
    pub async fn run(self) -> RemoteSnapshot {
        let topic_id = self.topic.id();
        match self.remote.fetch_progress(&self.user, topic_id).await {
            Ok(Some(document)) => RemoteSnapshot::Found(document),
            Ok(None) => {
                let learned = match self.policy {
                    ReconcilePolicy::RemoteWins => LearnedSet::new(),
                    ReconcilePolicy::MergeNewest => self.local_learned,
                };
                let total = u32::try_from(self.topic.item_count()).unwrap_or(u32::MAX);
                let document = RemoteProgress::bootstrap(learned, total, self.displayed, self.clock.now());
                match self
                    .remote
                    .bootstrap_progress(&self.user, topic_id, &document)
                    .await
                {
                    Ok(true) => RemoteSnapshot::Bootstrapped,
                    Ok(false) => {
                        // Created by another session between our read and the
                        // existence check; take the fresh copy.
                        debug!(topic = %topic_id, "progress document appeared during bootstrap");
                        match self.remote.fetch_progress(&self.user, topic_id).await {
                            Ok(Some(document)) => RemoteSnapshot::Found(document),
                            Ok(None) => RemoteSnapshot::Unavailable,
                            Err(err) => {
                                warn!(topic = %topic_id, error = %err, "progress refetch failed");
                                RemoteSnapshot::Unavailable
                            }
                        }
                    }
                    Err(err) => {
                        warn!(topic = %topic_id, error = %err, "failed to bootstrap progress document");
                        RemoteSnapshot::Unavailable
                    }
                }
            }
            Err(err) => {
                warn!(topic = %topic_id, error = %err, "remote progress unavailable, staying on local cache");
                RemoteSnapshot::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_cli_names() {
        assert_eq!(ReconcilePolicy::parse("remote-wins"), Some(ReconcilePolicy::RemoteWins));
        assert_eq!(ReconcilePolicy::parse("merge-newest"), Some(ReconcilePolicy::MergeNewest));
        assert_eq!(ReconcilePolicy::parse("union"), None);
    }

    #[test]
    fn default_policy_is_remote_wins() {
        assert_eq!(SyncSettings::default().policy, ReconcilePolicy::RemoteWins);
    }
}
