//! Save coordination tests
//!
//! These tests hold the backend inside `save` with a gate so the interleaving
//! of requests and completions is deterministic:
//!
//! 1. Coalescing: many requests during one write produce exactly one write
//! 2. Shared outcome: every awaiter sees the same success or failure
//! 3. Retry: a failed save leaves the cache dirty and the next one clears it
//! 4. Ordering: mutations racing an in-flight save stay dirty

use async_trait::async_trait;
use prefs_core::{Error, Result};
use prefs_durability::{MemoryBackend, StorageBackend};
use prefs_engine::{SaveCoordinator, Settings, SettingsConfig};
use prefs_storage::{CacheSnapshot, SharedCache};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

// ============================================================================
// Test Helpers
// ============================================================================

/// Backend whose saves wait for a permit and can be told to fail once
#[derive(Debug)]
struct GatedBackend {
    inner: MemoryBackend,
    gate: Semaphore,
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl GatedBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    fn release(&self, saves: usize) {
        self.gate.add_permits(saves);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn writes(&self) -> usize {
        self.inner.save_count()
    }
}

#[async_trait]
impl StorageBackend for GatedBackend {
    async fn load(&self, location: &Path) -> Result<Option<CacheSnapshot>> {
        self.inner.load(location).await
    }

    async fn save(&self, snapshot: &CacheSnapshot, location: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate
            .acquire()
            .await
            .map_err(|e| Error::backend(e.to_string()))?
            .forget();
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::backend("injected write failure"));
        }
        self.inner.save(snapshot, location).await
    }

    fn backend_name(&self) -> &'static str {
        "gated"
    }
}

fn setup() -> (SharedCache, Arc<GatedBackend>, Arc<SaveCoordinator>) {
    let cache = SharedCache::default();
    let backend = Arc::new(GatedBackend::new());
    let coordinator = Arc::new(SaveCoordinator::new(
        cache.clone(),
        backend.clone(),
        "settings.prefs",
        Handle::current(),
    ));
    (cache, backend, coordinator)
}

async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..5000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {}", what);
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_write() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("volume", 5);

    let first = coordinator.request_save();
    wait_for("first save to reach backend", || backend.calls() == 1).await;

    let mut joiners = Vec::new();
    for _ in 0..16 {
        let coordinator = Arc::clone(&coordinator);
        joiners.push(tokio::spawn(async move {
            let handle = coordinator.request_save();
            let id = handle.save_id();
            (id, handle.await)
        }));
    }

    // Let every joiner register before the write finishes
    wait_for("joiners to coalesce", || coordinator.stats().coalesced == 16).await;
    backend.release(1);

    let first_id = first.save_id();
    first.await.unwrap();
    for joiner in joiners {
        let (id, outcome) = joiner.await.unwrap();
        assert_eq!(id, first_id);
        assert!(outcome.is_ok());
    }

    assert_eq!(backend.calls(), 1);
    assert_eq!(backend.writes(), 1);
    assert!(!cache.is_dirty());
    let stats = coordinator.stats();
    assert_eq!(stats.started, 1);
    assert_eq!(stats.succeeded, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_threads_request_simultaneously() {
    let (cache, backend, coordinator) = setup();
    cache.set_string("name", "ada");

    let barrier = Arc::new(Barrier::new(2));
    let mut requests = Vec::new();
    for _ in 0..2 {
        let coordinator = Arc::clone(&coordinator);
        let barrier = Arc::clone(&barrier);
        requests.push(tokio::task::spawn_blocking(move || {
            barrier.wait();
            coordinator.request_save()
        }));
    }

    let mut handles = Vec::new();
    for request in requests {
        handles.push(request.await.unwrap());
    }
    assert_eq!(handles[0].save_id(), handles[1].save_id());

    backend.release(1);
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clean_cache_skips_write() {
    let (_cache, backend, coordinator) = setup();
    let handles: Vec<_> = (0..4).map(|_| coordinator.request_save()).collect();
    for handle in handles {
        assert!(handle.is_noop());
        handle.await.unwrap();
    }
    assert_eq!(backend.calls(), 0);
}

// ============================================================================
// Failure and retry
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_reaches_every_awaiter() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("volume", 5);
    backend.fail_next();

    let a = coordinator.request_save();
    let b = coordinator.request_save();
    assert_eq!(a.save_id(), b.save_id());
    backend.release(1);

    let err_a = a.await.unwrap_err();
    let err_b = b.await.unwrap_err();
    assert_eq!(err_a.to_string(), err_b.to_string());
    assert!(matches!(err_a.inner(), Error::Backend(_)));
    assert!(cache.is_dirty());
    assert_eq!(coordinator.stats().failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fail_once_then_succeed() {
    let (cache, backend, coordinator) = setup();
    cache.set_float("gain", 0.5);
    backend.fail_next();
    backend.release(2);

    let first = coordinator.request_save();
    let first_id = first.save_id();
    assert!(first.await.is_err());
    assert!(cache.is_dirty());

    let second = coordinator.request_save();
    assert_ne!(second.save_id(), first_id);
    second.await.unwrap();

    assert!(!cache.is_dirty());
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.writes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_and_forget_failure_leaves_dirty() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("a", 1);
    backend.fail_next();
    backend.release(1);

    coordinator.save();
    wait_for("failed save", || coordinator.stats().failed == 1).await;
    assert!(cache.is_dirty());
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mutation_during_save_stays_dirty() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("a", 1);

    let first = coordinator.request_save();
    wait_for("first save to reach backend", || backend.calls() == 1).await;

    // Lands after the snapshot was taken
    cache.set_int("b", 2);
    backend.release(1);
    first.await.unwrap();
    assert!(cache.is_dirty());

    backend.release(1);
    coordinator.save_async().await.unwrap();
    assert!(!cache.is_dirty());

    let stored = backend
        .load(Path::new("settings.prefs"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.ints.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_after_racing_mutation_queues_follow_up() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("a", 1);

    let first = coordinator.request_save();
    wait_for("first save to reach backend", || backend.calls() == 1).await;

    // The running save cannot include this, so the request must not join it
    cache.set_int("b", 2);
    let second = coordinator.request_save();
    assert_ne!(second.save_id(), first.save_id());
    assert_eq!(coordinator.stats().queued, 1);
    assert_eq!(coordinator.stats().coalesced, 0);

    // Joins the queued save, whose snapshot is not taken yet
    let third = coordinator.request_save();
    assert_eq!(third.save_id(), second.save_id());

    backend.release(2);
    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();

    assert!(!cache.is_dirty());
    assert_eq!(backend.calls(), 2);
    let stored = backend
        .load(Path::new("settings.prefs"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.ints.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queued_save_writes_after_predecessor_fails() {
    let (cache, backend, coordinator) = setup();
    cache.set_int("a", 1);
    backend.fail_next();

    let first = coordinator.request_save();
    wait_for("first save to reach backend", || backend.calls() == 1).await;
    cache.set_int("b", 2);
    let second = coordinator.request_save();

    backend.release(2);
    assert!(first.await.is_err());
    second.await.unwrap();
    assert!(!cache.is_dirty());
    assert_eq!(backend.writes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_persists_mutations_made_during_in_flight_save() {
    let backend = Arc::new(GatedBackend::new());
    backend.release(1);
    let settings = Arc::new(
        Settings::open("dir", SettingsConfig::default(), backend.clone())
            .await
            .unwrap(),
    );

    settings.set_int("a", 1);
    let first = settings.request_save();
    wait_for("first save to reach backend", || backend.calls() == 2).await;

    settings.set_int("b", 2);
    let closing = {
        let settings = Arc::clone(&settings);
        tokio::spawn(async move { settings.close().await })
    };
    wait_for("close to queue its save", || settings.save_stats().queued == 1).await;

    backend.release(2);
    first.await.unwrap();
    closing.await.unwrap().unwrap();

    assert!(!settings.is_dirty());
    assert_eq!(backend.calls(), 3);
    let stored = backend.load(&settings.location()).await.unwrap().unwrap();
    assert_eq!(stored.ints.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mutation_before_request_is_in_payload() {
    let (cache, backend, coordinator) = setup();
    cache.set_string("lang", "fr");
    backend.release(1);
    coordinator.save_async().await.unwrap();

    let stored = backend
        .load(Path::new("settings.prefs"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.strings[0].value, "fr");
}

// ============================================================================
// Session level
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_on_pause_saves() {
    let backend = Arc::new(GatedBackend::new());
    // Permit for the first-run save inside open
    backend.release(1);
    let settings = Settings::open("dir", SettingsConfig::default(), backend.clone())
        .await
        .unwrap();

    settings.set_int("volume", 3);
    backend.release(1);
    settings.on_pause(true);
    wait_for("pause save", || backend.writes() == 2).await;

    settings.on_pause(false);
    assert_eq!(backend.calls(), 2);
}
