use std::sync::Arc;

use fsl_core::Clock;
use fsl_core::model::{
    ItemKey, LearnedSet, ProgressUpdate, RemoteProgress, TopicDescriptor, TopicItem, UserId,
    completion_percentage,
};
use storage::ProgressCache;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::reconcile::{
    ReconcileOutcome, ReconcilePolicy, ReconcileTask, Relocation, RemoteSnapshot, SyncSettings,
};
use super::resume::{locate, resume};
use super::state::LessonState;
use crate::error::SyncError;
use crate::remote::ProgressRemote;

//
// ─── PENDING SYNC ──────────────────────────────────────────────────────────────
//

/// Handle to a fire-and-forget remote write.
///
/// Failures are already logged by the task; awaiting the handle is optional
/// and only useful for tests or orderly shutdown.
#[derive(Debug)]
pub struct PendingSync(JoinHandle<Result<(), SyncError>>);

impl PendingSync {
    /// # Errors
    ///
    /// Returns the remote write's `SyncError`, or `SyncError::Task` if the task
    /// panicked or was aborted.
    pub async fn wait(self) -> Result<(), SyncError> {
        match self.0.await {
            Ok(result) => result,
            Err(err) => Err(SyncError::Task(err.to_string())),
        }
    }
}

/// Learned/total summary of the open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonProgress {
    pub learned: u32,
    pub total: u32,
    pub percentage: u32,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// One open lesson page for one topic.
///
/// Local cache reads and writes happen inline; remote writes are spawned onto
/// the current tokio runtime and never block navigation.
pub struct LessonService {
    topic: Arc<TopicDescriptor>,
    state: LessonState,
    cache: ProgressCache,
    remote: ProgressRemote,
    clock: Clock,
    settings: SyncSettings,
    user: Option<UserId>,
}

impl LessonService {
    /// Open a page at the cached position. Performs no network I/O.
    #[must_use]
    pub fn open(topic: Arc<TopicDescriptor>, cache: ProgressCache, remote: ProgressRemote, clock: Clock) -> Self {
        let point = resume(&cache, &topic, clock.now());
        debug!(topic = %topic.id(), index = point.index, learned = point.learned.len(), "lesson resumed from cache");
        Self {
            topic,
            state: LessonState::from_resume(point),
            cache,
            remote,
            clock,
            settings: SyncSettings::default(),
            user: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: Option<UserId>) -> Self {
        self.user = user;
        self
    }

    /// Follow an identity change; `None` switches the page to local-only mode.
    pub fn set_user(&mut self, user: Option<UserId>) {
        self.user = user;
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn topic(&self) -> &TopicDescriptor {
        &self.topic
    }

    #[must_use]
    pub fn state(&self) -> &LessonState {
        &self.state
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.index
    }

    #[must_use]
    pub fn current_item(&self) -> &TopicItem {
        &self.topic.items()[self.state.index]
    }

    #[must_use]
    pub fn current_key(&self) -> &ItemKey {
        self.current_item().key()
    }

    #[must_use]
    pub fn learned(&self) -> &LearnedSet {
        &self.state.learned
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.state.index + 1 >= self.topic.item_count()
    }

    #[must_use]
    pub fn progress(&self) -> LessonProgress {
        let learned = self.state.learned.completed();
        let total = self.total();
        LessonProgress {
            learned,
            total,
            percentage: completion_percentage(learned, total),
        }
    }

    fn total(&self) -> u32 {
        u32::try_from(self.topic.item_count()).unwrap_or(u32::MAX)
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    /// Advance to the next item, marking the one being left as learned.
    ///
    /// On the last item the page stays put but the item is still learned.
    pub fn next(&mut self) -> Option<PendingSync> {
        let departing = self.current_key().clone();
        if !self.is_last() {
            self.state.index += 1;
        }
        self.mark_learned(departing)
    }

    /// Step back one item. Does not learn anything.
    pub fn previous(&mut self) -> bool {
        if self.state.index == 0 {
            return false;
        }
        self.move_to(self.state.index - 1);
        true
    }

    /// Jump to an index. Does not learn anything.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.topic.item_count() {
            return false;
        }
        self.move_to(index);
        true
    }

    fn move_to(&mut self, index: usize) {
        self.state.index = index;
        let now = self.clock.now();
        let key = self.current_key().clone();
        if self.cache.save_position(&self.topic, &key, now) {
            self.state.position_saved_at = Some(now);
        }
    }

    // ─── Learning ──────────────────────────────────────────────────────────────

    /// Record `key` as learned.
    ///
    /// The in-memory set and both cache records are updated before this
    /// returns. The remote merge-write runs in the background and is returned
    /// as a handle; `None` when signed out or outside a tokio runtime. Calling
    /// this for an already learned key still refreshes position and remote.
    pub fn mark_learned(&mut self, key: ItemKey) -> Option<PendingSync> {
        if !self.state.learned.insert(key.clone()) {
            debug!(topic = %self.topic.id(), key = %key, "item already learned");
        }

        let now = self.clock.now();
        let current = self.current_key().clone();
        self.cache.save_learned(&self.topic, &self.state.learned, now);
        if self.cache.save_position(&self.topic, &current, now) {
            self.state.position_saved_at = Some(now);
        }

        self.spawn_push(current)
    }

    fn spawn_push(&self, last_viewed: ItemKey) -> Option<PendingSync> {
        let user = self.user.clone()?;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(topic = %self.topic.id(), "no async runtime, remote progress not saved");
                return None;
            }
        };

        let remote = self.remote.clone();
        let topic = self.topic.id().clone();
        let total = self.total();
        let update = ProgressUpdate::new(self.state.learned.clone(), total, last_viewed, self.clock.now());

        let handle = runtime.spawn(async move {
            let result = remote.push_learned(&user, &topic, total, &update).await;
            if let Err(err) = &result {
                warn!(topic = %topic, error = %err, "failed to save progress remotely");
            }
            result
        });
        Some(PendingSync(handle))
    }

    // ─── Reconciliation ────────────────────────────────────────────────────────

    /// Snapshot what the background fetch needs. `None` in local-only mode.
    #[must_use]
    pub fn reconcile_task(&self) -> Option<ReconcileTask> {
        let user = self.user.clone()?;
        Some(ReconcileTask {
            remote: self.remote.clone(),
            clock: self.clock,
            user,
            topic: Arc::clone(&self.topic),
            displayed: self.current_key().clone(),
            local_learned: self.state.learned.clone(),
            policy: self.settings.policy,
        })
    }

    /// Fold the result of a background fetch into the page.
    ///
    /// Relocation is not navigation: it rewrites the cached position but never
    /// learns the item being left or the one arrived at.
    pub fn apply_reconciliation(&mut self, snapshot: RemoteSnapshot) -> ReconcileOutcome {
        let document = match snapshot {
            RemoteSnapshot::Unavailable => return ReconcileOutcome::Unavailable,
            RemoteSnapshot::Bootstrapped => {
                self.state.reconciled = true;
                info!(topic = %self.topic.id(), "created remote progress document");
                return ReconcileOutcome::Bootstrapped;
            }
            RemoteSnapshot::Found(document) => document,
        };

        let now = self.clock.now();
        let policy = self.settings.policy;

        let pushed_back = match policy {
            ReconcilePolicy::RemoteWins => {
                self.state.learned = document.learned_items.clone();
                false
            }
            ReconcilePolicy::MergeNewest => {
                let local_only = !self.state.learned.is_subset(&document.learned_items);
                self.state.learned.union_with(&document.learned_items);
                local_only
            }
        };
        self.cache.save_learned(&self.topic, &self.state.learned, now);

        let relocated = self.relocate_to_remote(&document, policy, now);

        let pushed_back = pushed_back && {
            let current = self.current_key().clone();
            self.spawn_push(current).is_some()
        };

        self.state.reconciled = true;
        info!(
            topic = %self.topic.id(),
            learned = self.state.learned.len(),
            relocated = relocated.is_some(),
            "reconciled with remote progress"
        );
        ReconcileOutcome::Applied {
            relocated,
            learned: self.state.learned.len(),
            pushed_back,
        }
    }

    fn relocate_to_remote(
        &mut self,
        document: &RemoteProgress,
        policy: ReconcilePolicy,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<Relocation> {
        let remote_key = document.last_viewed_item.as_ref()?;
        if remote_key == self.current_key() {
            return None;
        }

        let remote_is_newer = match policy {
            ReconcilePolicy::RemoteWins => true,
            ReconcilePolicy::MergeNewest => match (document.last_updated, self.state.position_saved_at) {
                (Some(remote), Some(local)) => remote > local,
                (_, None) => true,
                (None, Some(_)) => false,
            },
        };
        if !remote_is_newer {
            debug!(topic = %self.topic.id(), key = %remote_key, "local position is newer, keeping it");
            return None;
        }

        let from = self.state.index;
        let to = locate(&self.topic, remote_key);
        self.state.index = to;
        let key = self.current_key().clone();
        if self.cache.save_position(&self.topic, &key, now) {
            self.state.position_saved_at = Some(now);
        }
        (from != to).then_some(Relocation { from, to })
    }

    /// Fetch and apply in one go. Convenient when nothing else needs the page
    /// while the fetch is in flight.
    pub async fn reconcile(&mut self) -> ReconcileOutcome {
        let Some(task) = self.reconcile_task() else {
            return ReconcileOutcome::LocalOnly;
        };
        let snapshot = task.run().await;
        self.apply_reconciliation(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fsl_core::catalog;
    use fsl_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryDocumentStore;
    use storage::InMemorySessionStore;

    fn page(clock: Clock) -> (LessonService, InMemoryDocumentStore, ProgressCache) {
        let store = InMemoryDocumentStore::new();
        let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
        let topic = Arc::new(catalog::numbers().unwrap());
        let service = LessonService::open(
            topic,
            cache.clone(),
            ProgressRemote::new(Arc::new(store.clone())),
            clock,
        );
        (service, store, cache)
    }

    #[test]
    fn next_learns_departed_item_and_caches_new_position() {
        let (mut lesson, _, cache) = page(fixed_clock());
        assert!(lesson.next().is_none(), "signed out: no remote write");
        assert_eq!(lesson.current_key(), &ItemKey::new("2"));
        assert!(lesson.learned().contains(&ItemKey::new("1")));

        let topic = lesson.topic().clone();
        let cached = cache.position(&topic, fixed_now()).unwrap();
        assert_eq!(cached.value, ItemKey::new("2"));
        let learned = cache.learned(&topic, fixed_now()).unwrap();
        assert_eq!(learned.value.len(), 1);
    }

    #[test]
    fn next_on_last_item_learns_it_and_stays() {
        let (mut lesson, _, _) = page(fixed_clock());
        assert!(lesson.go_to(9));
        lesson.next();
        assert_eq!(lesson.current_index(), 9);
        assert!(lesson.learned().contains(&ItemKey::new("10")));
    }

    #[test]
    fn previous_and_go_to_do_not_learn() {
        let (mut lesson, _, _) = page(fixed_clock());
        assert!(!lesson.previous());
        assert!(lesson.go_to(4));
        assert!(lesson.previous());
        assert_eq!(lesson.current_index(), 3);
        assert!(!lesson.go_to(10));
        assert!(lesson.learned().is_empty());
    }

    #[test]
    fn learned_set_never_shrinks_through_navigation() {
        let (mut lesson, _, _) = page(fixed_clock());
        let mut last = 0;
        for step in 0..25 {
            if step % 3 == 2 {
                lesson.previous();
            } else {
                lesson.next();
            }
            let size = lesson.learned().len();
            assert!(size >= last);
            last = size;
        }
    }

    #[tokio::test]
    async fn signed_in_next_merges_into_remote() {
        let (lesson, store, _) = page(fixed_clock());
        let mut lesson = lesson.with_user(Some(UserId::new("u1")));
        lesson.next().unwrap().wait().await.unwrap();

        let remote = ProgressRemote::new(Arc::new(store));
        let doc = remote
            .fetch_progress(&UserId::new("u1"), lesson.topic().id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.completed, 1);
        assert_eq!(doc.total, 10);
        assert_eq!(doc.percentage, 10);
        assert_eq!(doc.last_viewed_item, Some(ItemKey::new("2")));
    }

    #[tokio::test]
    async fn reconcile_without_user_is_local_only() {
        let (mut lesson, store, _) = page(fixed_clock());
        assert_eq!(lesson.reconcile().await, ReconcileOutcome::LocalOnly);
        assert_eq!(store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn merge_newest_keeps_newer_local_position() {
        let mut clock = fixed_clock();
        let (lesson, store, _) = page(clock);
        let user = UserId::new("u1");
        let remote = ProgressRemote::new(Arc::new(store.clone()));
        let stale = RemoteProgress::bootstrap(
            vec![ItemKey::new("1")].into(),
            10,
            ItemKey::new("7"),
            fixed_now() - Duration::hours(1),
        );
        remote
            .bootstrap_progress(&user, lesson.topic().id(), &stale)
            .await
            .unwrap();

        clock.advance(Duration::minutes(1));
        let mut lesson = LessonService::open(
            Arc::new(catalog::numbers().unwrap()),
            ProgressCache::new(Arc::new(InMemorySessionStore::new())),
            remote.clone(),
            clock,
        )
        .with_settings(SyncSettings {
            policy: ReconcilePolicy::MergeNewest,
        });
        // Navigated while signed out: local position is newer than the remote one.
        lesson.go_to(3);
        assert!(lesson.mark_learned(ItemKey::new("3")).is_none());
        lesson.set_user(Some(user.clone()));

        let outcome = lesson.reconcile().await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                relocated: None,
                learned: 2,
                pushed_back: true,
            }
        );
        assert_eq!(lesson.current_key(), &ItemKey::new("4"));
        assert!(lesson.learned().contains(&ItemKey::new("1")));
        assert!(lesson.learned().contains(&ItemKey::new("3")));
    }

    fn merge_newest(lesson: LessonService) -> LessonService {
        lesson.with_settings(SyncSettings {
            policy: ReconcilePolicy::MergeNewest,
        })
    }

    async fn seed_remote(store: &InMemoryDocumentStore, user: &UserId, key: &str, updated: chrono::DateTime<chrono::Utc>) {
        let document = RemoteProgress::bootstrap(vec![ItemKey::new("1")].into(), 10, ItemKey::new(key), updated);
        ProgressRemote::new(Arc::new(store.clone()))
            .bootstrap_progress(user, &fsl_core::model::TopicId::new("numbers"), &document)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn merge_newest_follows_newer_remote_position() {
        let (lesson, store, cache) = page(fixed_clock());
        let user = UserId::new("u1");
        let mut lesson = merge_newest(lesson);
        lesson.go_to(2);
        assert_eq!(lesson.state().position_saved_at(), Some(fixed_now()));
        seed_remote(&store, &user, "8", fixed_now() + Duration::minutes(5)).await;

        lesson.set_user(Some(user));
        let outcome = lesson.reconcile().await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                relocated: Some(Relocation { from: 2, to: 7 }),
                learned: 1,
                pushed_back: false,
            }
        );
        assert_eq!(lesson.current_key(), &ItemKey::new("8"));
        assert!(!lesson.learned().contains(&ItemKey::new("3")));
        let topic = lesson.topic().clone();
        assert_eq!(cache.position(&topic, fixed_now()).unwrap().value, ItemKey::new("8"));
    }

    #[tokio::test]
    async fn merge_newest_relocates_when_nothing_is_cached() {
        let (lesson, store, _) = page(fixed_clock());
        let user = UserId::new("u1");
        let mut lesson = merge_newest(lesson).with_user(Some(user.clone()));
        assert_eq!(lesson.state().position_saved_at(), None);
        // Older than the clock, but there is no local record to compare with.
        seed_remote(&store, &user, "8", fixed_now() - Duration::hours(3)).await;

        let outcome = lesson.reconcile().await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                relocated: Some(Relocation { from: 0, to: 7 }),
                learned: 1,
                pushed_back: false,
            }
        );
        assert_eq!(lesson.current_key(), &ItemKey::new("8"));
        assert_eq!(lesson.state().position_saved_at(), Some(fixed_now()));
    }
}
