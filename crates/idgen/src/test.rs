use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use coordination::{Acl, CounterStore, Error as StoreError, MemStore, Version};

use super::{Config, Error, IdAllocator};

fn allocator(store: Arc<dyn CounterStore>, lease: i64) -> IdAllocator {
    IdAllocator::new(
        store,
        Config {
            lease,
            ..Config::default()
        },
    )
}

/// Counts operations passed through to an inner store.
#[derive(Default)]
struct CountingStore {
    inner: MemStore,
    exists: AtomicUsize,
    creates: AtomicUsize,
    gets: AtomicUsize,
    cas: AtomicUsize,
}

#[async_trait::async_trait]
impl CounterStore for CountingStore {
    async fn exists(&self, path: &str) -> Result<Option<Version>, StoreError> {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(path).await
    }
    async fn create(&self, path: &str, value: &[u8], acl: Acl) -> Result<(), StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(path, value, acl).await
    }
    async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(path).await
    }
    async fn compare_and_set(
        &self,
        path: &str,
        value: &[u8],
        expected: Version,
    ) -> Result<Version, StoreError> {
        self.cas.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_and_set(path, value, expected).await
    }
    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

/// Loses the first `losses` compare-and-set races: an interfering writer
/// lands the very write this caller proposed, and the caller sees a
/// conflict, exactly as when another instance wins the race.
struct RiggedStore {
    inner: MemStore,
    losses: AtomicU32,
}

impl RiggedStore {
    fn losing(losses: u32) -> Self {
        Self {
            inner: MemStore::new(),
            losses: AtomicU32::new(losses),
        }
    }
}

#[async_trait::async_trait]
impl CounterStore for RiggedStore {
    async fn exists(&self, path: &str) -> Result<Option<Version>, StoreError> {
        self.inner.exists(path).await
    }
    async fn create(&self, path: &str, value: &[u8], acl: Acl) -> Result<(), StoreError> {
        self.inner.create(path, value, acl).await
    }
    async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), StoreError> {
        self.inner.get(path).await
    }
    async fn compare_and_set(
        &self,
        path: &str,
        value: &[u8],
        expected: Version,
    ) -> Result<Version, StoreError> {
        let lose = self
            .losses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            self.inner.compare_and_set(path, value, expected).await?;
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }
        self.inner.compare_and_set(path, value, expected).await
    }
    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn fresh_cluster_vends_one_through_ten() {
    let store = Arc::new(CountingStore::default());
    let alloc = allocator(store.clone(), 10_000);

    for want in 1..=10i64 {
        assert_eq!(alloc.next().await.unwrap(), want);
    }

    // One lease claim: a single exists / create / get / compare-and-set.
    assert_eq!(store.exists.load(Ordering::SeqCst), 1);
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    assert_eq!(store.cas.load(Ordering::SeqCst), 1);

    assert_eq!(store.inner.value("/counter").as_deref(), Some("10000"));
    assert_eq!(store.inner.exists("/counter").await.unwrap(), Some(1));
}

#[tokio::test]
async fn refill_at_lease_boundary_skips_base() {
    let store = Arc::new(MemStore::new());
    let alloc = allocator(store.clone(), 4);

    let mut got = Vec::new();
    for _ in 0..5 {
        got.push(alloc.next().await.unwrap());
    }
    // The fifth call claims [4, 8) and vends base + 1.
    assert_eq!(got, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.value("/counter").as_deref(), Some("8"));
}

#[tokio::test]
async fn two_instances_claim_disjoint_ranges() {
    let store: Arc<dyn CounterStore> = Arc::new(MemStore::new());
    let a = allocator(store.clone(), 10);
    let b = allocator(store.clone(), 10);

    let mut from_a = vec![a.next().await.unwrap()];
    let mut from_b = vec![b.next().await.unwrap()];
    for _ in 1..10 {
        from_a.push(a.next().await.unwrap());
        from_b.push(b.next().await.unwrap());
    }

    assert_eq!(from_a, (1..=10).collect::<Vec<i64>>());
    assert_eq!(from_b, (11..=20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn corrupt_counter_fails_and_is_not_repaired() {
    let store = Arc::new(MemStore::new());
    store
        .create("/counter", b"not-a-number", Acl::Open)
        .await
        .unwrap();
    let alloc = allocator(store.clone(), 10);

    for _ in 0..2 {
        match alloc.next().await {
            Err(Error::Corrupt { path, .. }) => assert_eq!(path, "/counter"),
            other => panic!("expected corrupt counter, got {other:?}"),
        }
    }
    assert_eq!(store.value("/counter").as_deref(), Some("not-a-number"));
}

#[tokio::test]
async fn concurrent_instances_never_repeat_ids() {
    let store: Arc<dyn CounterStore> = Arc::new(MemStore::new());

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let alloc = allocator(store.clone(), 7);
        tasks.push(tokio::spawn(async move {
            let mut got = Vec::new();
            for _ in 0..200 {
                got.push(alloc.next().await.unwrap());
            }
            got
        }));
    }

    let mut all = Vec::new();
    for task in tasks {
        let got = task.await.unwrap();
        // Strictly increasing within each instance.
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        all.extend(got);
    }
    let unique: HashSet<i64> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len());
}

#[tokio::test]
async fn steady_state_coordination_is_bounded() {
    let store = Arc::new(CountingStore::default());
    let alloc = allocator(store.clone(), 10);

    for _ in 0..25 {
        alloc.next().await.unwrap();
    }
    // ceil(25 / 10) lease claims, with no contention retries.
    assert_eq!(store.gets.load(Ordering::SeqCst), 3);
    assert_eq!(store.cas.load(Ordering::SeqCst), 3);
    assert_eq!(store.exists.load(Ordering::SeqCst), 1);
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cas_losses_below_the_cap_eventually_succeed() {
    let store = Arc::new(RiggedStore::losing(3));
    let alloc = IdAllocator::new(
        store,
        Config {
            lease: 10,
            retry_cap: 4,
            ..Config::default()
        },
    );

    // Three interfering writers advance the counter to 30 before this
    // instance wins [30, 40).
    assert_eq!(alloc.next().await.unwrap(), 31);
}

#[tokio::test]
async fn cas_losses_at_the_cap_surface_contention() {
    let store = Arc::new(RiggedStore::losing(4));
    let alloc = IdAllocator::new(
        store,
        Config {
            lease: 10,
            retry_cap: 4,
            ..Config::default()
        },
    );

    match alloc.next().await {
        Err(err @ Error::Contention { attempts: 4, .. }) => assert!(err.is_transient()),
        other => panic!("expected contention, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_bootstrap_is_idempotent() {
    let store: Arc<dyn CounterStore> = Arc::new(MemStore::new());

    let tasks = (0..8).map(|_| {
        let alloc = allocator(store.clone(), 5);
        async move { alloc.next().await }
    });
    let ids: Vec<i64> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("no false errors during concurrent bootstrap");

    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 8);
}

#[tokio::test]
async fn store_errors_surface_without_disturbing_state() {
    // A store whose node is absent fails get(); the allocator surfaces the
    // error unchanged and a later call retries the refill from scratch.
    struct AbsentAfterExists(MemStore);

    #[async_trait::async_trait]
    impl CounterStore for AbsentAfterExists {
        async fn exists(&self, _path: &str) -> Result<Option<Version>, StoreError> {
            Ok(Some(0))
        }
        async fn create(&self, path: &str, value: &[u8], acl: Acl) -> Result<(), StoreError> {
            self.0.create(path, value, acl).await
        }
        async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), StoreError> {
            self.0.get(path).await
        }
        async fn compare_and_set(
            &self,
            path: &str,
            value: &[u8],
            expected: Version,
        ) -> Result<Version, StoreError> {
            self.0.compare_and_set(path, value, expected).await
        }
        async fn close(&self) -> Result<(), StoreError> {
            self.0.close().await
        }
    }

    let alloc = IdAllocator::new(
        Arc::new(AbsentAfterExists(MemStore::new())),
        Config {
            lease: 10,
            ..Config::default()
        },
    );
    assert!(alloc.next().await.is_err());
    assert!(alloc.next().await.is_err());
}
