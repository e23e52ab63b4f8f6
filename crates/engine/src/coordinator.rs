//! Save coordination
//!
//! The `SaveCoordinator` owns the path from a dirty cache to durable storage.
//! It guarantees:
//!
//! - **At most one write in flight.** A mutex guards the check-and-replace of
//!   the in-flight save, so two concurrent requests never both start a write.
//! - **Coalescing.** A request that arrives while a save is running gets a
//!   handle to that same save, as long as the save's snapshot already holds
//!   every mutation the caller made. Otherwise one follow-up save is queued
//!   behind the running one, so a successful handle always means the caller's
//!   data reached storage.
//! - **Flush on success only.** The dirty flag is cleared after the backend
//!   confirms the write, and only if no mutation happened after the snapshot
//!   was taken. A failed write leaves the cache dirty so the next trigger
//!   retries it.
//! - **Failures reach every awaiter.** All handles to one save resolve to the
//!   same `Result`; the backend error is shared, not masked.
//!
//! ```text
//! request_save():
//!   1. cache clean?                        → ready handle, no write
//!   2. lock pending
//!   3. save running and covers generation? → clone its handle (coalesce)
//!   4. save running, snapshot too old?     → spawn write queued behind it
//!   5. otherwise snapshot cache, spawn write
//!   6. store handle, unlock, return handle
//!
//! spawned write:
//!   backend.save(snapshot) → Ok  → cache.flush_through(snapshot.generation)
//!                          → Err → leave dirty, log, propagate
//! ```
//!
//! The write runs as a tokio task, so it completes even if every handle is
//! dropped. That is what makes fire-and-forget [`SaveCoordinator::save`] work.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use prefs_core::Error;
use prefs_durability::StorageBackend;
use prefs_storage::{CacheSnapshot, SharedCache};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Error observed by every awaiter of a failed save
///
/// Cheap to clone; the backend error is shared behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("settings save failed: {source}")]
pub struct SaveError {
    #[source]
    source: Arc<Error>,
}

impl SaveError {
    fn new(error: Error) -> Self {
        Self {
            source: Arc::new(error),
        }
    }

    /// The underlying backend error
    pub fn inner(&self) -> &Error {
        &self.source
    }
}

/// Outcome of one save
pub type SaveResult = std::result::Result<(), SaveError>;

type SaveFuture = Shared<BoxFuture<'static, SaveResult>>;

/// Handle to a save's eventual completion
///
/// Awaiting the handle yields the save's outcome. Handles returned for the
/// same underlying write share a [`save_id`](SaveHandle::save_id) and resolve
/// to the same result. Dropping a handle does not cancel the write.
#[derive(Clone)]
pub struct SaveHandle {
    save_id: u64,
    future: SaveFuture,
}

impl SaveHandle {
    /// Handle for a request that needed no write
    fn ready() -> Self {
        Self {
            save_id: 0,
            future: futures::future::ready(Ok(())).boxed().shared(),
        }
    }

    /// Identifier of the underlying write; `0` when no write was needed
    pub fn save_id(&self) -> u64 {
        self.save_id
    }

    /// Whether this handle refers to an actual write
    pub fn is_noop(&self) -> bool {
        self.save_id == 0
    }

    /// Outcome, if some awaiter already observed completion
    pub fn peek(&self) -> Option<&SaveResult> {
        self.future.peek()
    }
}

impl std::fmt::Debug for SaveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveHandle")
            .field("save_id", &self.save_id)
            .field("resolved", &self.future.peek().is_some())
            .finish()
    }
}

impl Future for SaveHandle {
    type Output = SaveResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.future).poll(cx)
    }
}

/// Save counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    /// Writes started
    pub started: u64,
    /// Requests that joined an in-flight write
    pub coalesced: u64,
    /// Requests queued behind an in-flight write that missed their mutations
    pub queued: u64,
    /// Writes that succeeded
    pub succeeded: u64,
    /// Writes that failed
    pub failed: u64,
}

#[derive(Debug, Default)]
struct SaveCounters {
    started: AtomicU64,
    coalesced: AtomicU64,
    queued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// `covers` value before the write has looked at the cache
const NOT_YET_SNAPSHOTTED: u64 = u64::MAX;

struct InFlight {
    handle: SaveHandle,
    covers: Arc<AtomicU64>,
    done: Arc<AtomicBool>,
}

impl InFlight {
    /// Whether this write's payload includes every mutation up to `generation`
    fn includes(&self, generation: u64) -> bool {
        match self.covers.load(Ordering::Acquire) {
            NOT_YET_SNAPSHOTTED => true,
            covered => generation <= covered,
        }
    }
}

/// Marks a write finished even if the task unwinds
struct DoneGuard(Arc<AtomicBool>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Coalescing persistence controller for one cache
///
/// # Example
///
/// ```ignore
/// let coordinator = SaveCoordinator::new(cache.clone(), backend, path, Handle::current());
///
/// cache.set_int("volume", 5);
/// let a = coordinator.request_save();
/// let b = coordinator.request_save(); // joins `a`
/// assert_eq!(a.save_id(), b.save_id());
/// a.await?;
/// ```
pub struct SaveCoordinator {
    cache: SharedCache,
    backend: Arc<dyn StorageBackend>,
    location: PathBuf,
    runtime: Handle,
    pending: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    counters: Arc<SaveCounters>,
}

impl SaveCoordinator {
    /// Create a coordinator writing `cache` to `location` through `backend`
    ///
    /// Writes are spawned on `runtime`, so `request_save` may be called from
    /// any thread, inside or outside that runtime.
    pub fn new(
        cache: SharedCache,
        backend: Arc<dyn StorageBackend>,
        location: impl Into<PathBuf>,
        runtime: Handle,
    ) -> Self {
        Self {
            cache,
            backend,
            location: location.into(),
            runtime,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
            counters: Arc::new(SaveCounters::default()),
        }
    }

    /// Start a save, or join the one already running
    ///
    /// Returns a ready handle when the cache is clean. A request joins the
    /// running save only if that save's snapshot already includes every
    /// mutation made so far; otherwise a follow-up save is queued behind it
    /// and starts once it finishes.
    pub fn request_save(&self) -> SaveHandle {
        if !self.cache.is_dirty() {
            return SaveHandle::ready();
        }

        let mut pending = self.pending.lock();
        let mut predecessor = None;
        if let Some(in_flight) = pending.as_ref() {
            if !in_flight.done.load(Ordering::Acquire) {
                if in_flight.includes(self.cache.generation()) {
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(save_id = in_flight.handle.save_id, "Joining in-flight settings save");
                    return in_flight.handle.clone();
                }
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                debug!(
                    after = in_flight.handle.save_id,
                    "Queueing settings save behind in-flight write"
                );
                predecessor = Some(in_flight.handle.future.clone());
            }
        }

        let in_flight = self.start_write(predecessor);
        let handle = in_flight.handle.clone();
        *pending = Some(in_flight);
        handle
    }

    /// Fire-and-forget save
    ///
    /// Failures are logged, not returned. Other awaiters of the same write
    /// still observe them.
    pub fn save(&self) {
        let _ = self.request_save();
    }

    /// Request a save and wait for its outcome
    pub async fn save_async(&self) -> SaveResult {
        self.request_save().await
    }

    /// Handle to the running save, if any
    pub fn in_flight(&self) -> Option<SaveHandle> {
        self.pending
            .lock()
            .as_ref()
            .filter(|f| !f.done.load(Ordering::Acquire))
            .map(|f| f.handle.clone())
    }

    /// Wait for the running save, if any, to finish
    pub async fn wait_idle(&self) -> SaveResult {
        match self.in_flight() {
            Some(handle) => handle.await,
            None => Ok(()),
        }
    }

    /// Save counters
    pub fn stats(&self) -> SaveStats {
        SaveStats {
            started: self.counters.started.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            queued: self.counters.queued.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Where saves are written
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Spawn a write, optionally after `predecessor` finishes. Caller holds
    /// `pending`.
    fn start_write(&self, predecessor: Option<SaveFuture>) -> InFlight {
        let save_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cache = self.cache.clone();
        let backend = Arc::clone(&self.backend);
        let location = self.location.clone();
        let counters = Arc::clone(&self.counters);
        let covers = Arc::new(AtomicU64::new(NOT_YET_SNAPSHOTTED));
        let done = Arc::new(AtomicBool::new(false));
        let guard = DoneGuard(Arc::clone(&done));

        // Without a predecessor the snapshot is taken now, under `pending`
        let mut snapshot = predecessor
            .is_none()
            .then(|| take_snapshot(&cache, &covers))
            .flatten();

        let task_covers = Arc::clone(&covers);
        let task = self.runtime.spawn(async move {
            let _guard = guard;
            if let Some(previous) = predecessor {
                // Its outcome belongs to its own awaiters
                let _ = previous.await;
                snapshot = take_snapshot(&cache, &task_covers);
            }
            let Some(snapshot) = snapshot else {
                debug!(save_id, "Nothing left to save");
                return Ok(());
            };

            counters.started.fetch_add(1, Ordering::Relaxed);
            debug!(
                save_id,
                generation = snapshot.generation,
                entries = snapshot.len(),
                backend = backend.backend_name(),
                "Starting settings save"
            );
            match backend.save(&snapshot, &location).await {
                Ok(()) => {
                    counters.succeeded.fetch_add(1, Ordering::Relaxed);
                    let clean = cache.flush_through(snapshot.generation);
                    debug!(save_id, clean, "Settings save complete");
                    Ok(())
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(save_id, error = %e, path = %location.display(), "Settings save failed");
                    Err(SaveError::new(e))
                }
            }
        });

        let future = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(SaveError::new(Error::backend(format!(
                    "settings save task failed: {}",
                    e
                )))),
            }
        }
        .boxed()
        .shared();

        InFlight {
            handle: SaveHandle { save_id, future },
            covers,
            done,
        }
    }
}

/// Snapshot a dirty cache, or `None` when it is clean
///
/// `covers` is published under the cache lock, so any mutation that lands
/// after the snapshot is ordered after the store and a later request sees it.
fn take_snapshot(cache: &SharedCache, covers: &AtomicU64) -> Option<CacheSnapshot> {
    cache.read(|c| {
        covers.store(c.generation(), Ordering::Release);
        c.is_dirty().then(|| c.snapshot())
    })
}

impl std::fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCoordinator")
            .field("location", &self.location)
            .field("backend", &self.backend.backend_name())
            .field("stats", &self.stats())
            .finish()
    }
}
