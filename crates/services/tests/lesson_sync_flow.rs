use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use fsl_core::catalog;
use fsl_core::model::{ItemKey, LearnedSet, RemoteProgress, TopicDescriptor, UserId};
use fsl_core::time::fixed_now;
use services::{
    Clock, LessonService, ProgressRemote, ReconcileOutcome, ReconcilePolicy, Relocation,
    SyncSettings,
};
use storage::repository::{DocumentPath, DocumentStore, Fields, InMemoryDocumentStore, StorageError, WriteMode};
use storage::{InMemorySessionStore, ProgressCache};

/// Document store that counts writes.
#[derive(Clone, Default)]
struct CountingStore {
    inner: InMemoryDocumentStore,
    writes: Arc<AtomicUsize>,
}

impl CountingStore {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn document_exists(&self, path: &DocumentPath) -> Result<bool, StorageError> {
        self.inner.document_exists(path).await
    }

    async fn read_document(&self, path: &DocumentPath) -> Result<Option<Fields>, StorageError> {
        self.inner.read_document(path).await
    }

    async fn write_document(&self, path: &DocumentPath, fields: Fields, mode: WriteMode) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_document(path, fields, mode).await
    }
}

/// Document store that is never reachable.
struct OfflineStore;

#[async_trait]
impl DocumentStore for OfflineStore {
    async fn document_exists(&self, _path: &DocumentPath) -> Result<bool, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn read_document(&self, _path: &DocumentPath) -> Result<Option<Fields>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn write_document(&self, _path: &DocumentPath, _fields: Fields, _mode: WriteMode) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

fn numbers() -> Arc<TopicDescriptor> {
    Arc::new(catalog::numbers().unwrap())
}

fn keys(raw: &[&str]) -> LearnedSet {
    raw.iter().map(|k| ItemKey::new(*k)).collect::<Vec<_>>().into()
}

fn open(topic: &Arc<TopicDescriptor>, cache: &ProgressCache, store: Arc<dyn DocumentStore>, clock: Clock) -> LessonService {
    LessonService::open(Arc::clone(topic), cache.clone(), ProgressRemote::new(store), clock)
}

#[tokio::test]
async fn three_nexts_then_resume_within_and_after_window() {
    let topic = numbers();
    let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let store = Arc::new(InMemoryDocumentStore::new());
    let start = fixed_now();

    let mut page = open(&topic, &cache, store.clone(), Clock::fixed(start));
    for _ in 0..3 {
        assert!(page.next().is_none());
    }
    assert_eq!(page.learned(), &keys(&["1", "2", "3"]));
    assert_eq!(page.current_key().as_str(), "4");

    let later = open(&topic, &cache, store.clone(), Clock::fixed(start + Duration::minutes(30)));
    assert_eq!(later.current_index(), 3);
    assert_eq!(later.learned().len(), 3);

    // Position from 25h ago, learned set refreshed 10 minutes ago.
    let reopened_at = start + Duration::hours(25);
    cache
        .write_learned(&topic, &keys(&["1", "2", "3"]), reopened_at - Duration::minutes(10))
        .unwrap();
    let stale = open(&topic, &cache, store, Clock::fixed(reopened_at));
    assert_eq!(stale.current_index(), 0);
    assert_eq!(stale.learned().len(), 3);
}

#[tokio::test]
async fn remote_position_relocates_without_learning() {
    let topic = numbers();
    let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let store = CountingStore::default();
    let user = UserId::new("learner");
    let now = fixed_now();

    let remote = ProgressRemote::new(Arc::new(store.clone()));
    let document = RemoteProgress::bootstrap(keys(&["1", "2"]), 10, ItemKey::new("7"), now);
    assert!(remote.bootstrap_progress(&user, topic.id(), &document).await.unwrap());
    let writes_before = store.writes();

    let mut page = open(&topic, &cache, Arc::new(store.clone()), Clock::fixed(now));
    page.go_to(3);
    page.set_user(Some(user));

    let outcome = page.reconcile().await;
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied {
            relocated: Some(Relocation { from: 3, to: 6 }),
            learned: 2,
            pushed_back: false,
        }
    );
    assert_eq!(page.current_key().as_str(), "7");
    // Neither the item left behind nor the one arrived at is learned.
    assert!(!page.learned().contains(&ItemKey::new("4")));
    assert!(!page.learned().contains(&ItemKey::new("7")));
    assert_eq!(page.learned(), &keys(&["1", "2"]));
    assert_eq!(store.writes(), writes_before);

    let cached = cache.position(&topic, now).unwrap();
    assert_eq!(cached.value.as_str(), "7");
    assert_eq!(cache.learned(&topic, now).unwrap().value, keys(&["1", "2"]));
}

#[tokio::test]
async fn relearning_a_key_is_idempotent_but_still_writes() {
    let topic = numbers();
    let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let store = CountingStore::default();
    let user = UserId::new("learner");

    let mut page = open(&topic, &cache, Arc::new(store.clone()), Clock::fixed(fixed_now()))
        .with_user(Some(user.clone()));
    page.mark_learned(ItemKey::new("3")).unwrap().wait().await.unwrap();
    page.mark_learned(ItemKey::new("3")).unwrap().wait().await.unwrap();

    assert_eq!(page.learned().len(), 1);
    assert_eq!(store.writes(), 2);

    let document = ProgressRemote::new(Arc::new(store))
        .fetch_progress(&user, topic.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.completed, 1);
    assert_eq!(document.percentage, 10);
    assert_eq!(document.learned_items, keys(&["3"]));
}

#[tokio::test]
async fn first_visit_bootstraps_exactly_once() {
    let topic = numbers();
    let store = CountingStore::default();
    let user = UserId::new("learner");
    let clock = Clock::fixed(fixed_now());

    let first_cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let mut first = open(&topic, &first_cache, Arc::new(store.clone()), clock).with_user(Some(user.clone()));
    assert_eq!(first.reconcile().await, ReconcileOutcome::Bootstrapped);
    assert_eq!(store.writes(), 1);

    let second_cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let mut second = open(&topic, &second_cache, Arc::new(store.clone()), clock).with_user(Some(user.clone()));
    assert!(matches!(second.reconcile().await, ReconcileOutcome::Applied { .. }));
    assert_eq!(store.writes(), 1);

    let document = ProgressRemote::new(Arc::new(store))
        .fetch_progress(&user, topic.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.total, 10);
    assert!(document.learned_items.is_empty());
    assert_eq!(document.last_viewed_item, Some(ItemKey::new("1")));
}

#[tokio::test]
async fn merge_newest_bootstrap_carries_local_learning() {
    let topic = numbers();
    let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let store = Arc::new(InMemoryDocumentStore::new());
    let user = UserId::new("learner");

    let mut page = open(&topic, &cache, store.clone(), Clock::fixed(fixed_now())).with_settings(SyncSettings {
        policy: ReconcilePolicy::MergeNewest,
    });
    page.next();
    page.next();
    page.set_user(Some(user.clone()));
    assert_eq!(page.reconcile().await, ReconcileOutcome::Bootstrapped);

    let document = ProgressRemote::new(store)
        .fetch_progress(&user, topic.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.learned_items, keys(&["1", "2"]));
    assert_eq!(document.last_viewed_item, Some(ItemKey::new("3")));
}

#[tokio::test]
async fn offline_store_leaves_local_progress_intact() {
    let topic = numbers();
    let cache = ProgressCache::new(Arc::new(InMemorySessionStore::new()));
    let now = fixed_now();

    let mut page = open(&topic, &cache, Arc::new(OfflineStore), Clock::fixed(now))
        .with_user(Some(UserId::new("learner")));
    let pending = page.next().unwrap();
    assert!(pending.wait().await.is_err());

    assert_eq!(page.reconcile().await, ReconcileOutcome::Unavailable);
    assert_eq!(page.current_key().as_str(), "2");
    assert_eq!(page.learned(), &keys(&["1"]));
    assert_eq!(cache.position(&topic, now).unwrap().value.as_str(), "2");
    assert!(!page.state().is_reconciled());
}
