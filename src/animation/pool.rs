use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{OutfitError, OutfitResult};

/// Creates, checks and tears down the workers held by a [`WorkerPool`].
pub trait WorkerFactory: Send + Sync {
    /// Pooled resource.
    type Worker: Send;

    /// Create a fresh worker with a pool-assigned `id`.
    fn create(&self, id: u64) -> OutfitResult<Self::Worker>;

    /// Whether an idle worker is still fit for use.
    fn validate(&self, worker: &Self::Worker) -> bool;

    /// Release whatever the worker holds. The value is dropped right after.
    ///
    /// Returns the thread still winding the worker down, if any. Its slot stays occupied until
    /// that thread exits.
    fn destroy(&self, worker: &mut Self::Worker) -> Option<JoinHandle<()>>;
}

const RETIRE_POLL: Duration = Duration::from_millis(10);

/// Worker pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolOpts {
    /// Hard bound on live workers (idle, in use, or still winding down).
    pub max_workers: usize,
    /// Idle workers kept warm after each release.
    pub min_idle: usize,
    /// How long a caller waits for a free worker before giving up with `Busy`.
    pub acquire_timeout_ms: u64,
    /// How long a caller waits for a worker's result.
    pub ready_timeout_ms: u64,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            max_workers: 4,
            min_idle: 0,
            acquire_timeout_ms: 5_000,
            ready_timeout_ms: 10_000,
        }
    }
}

impl PoolOpts {
    /// [`Self::acquire_timeout_ms`] as a `Duration`.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// [`Self::ready_timeout_ms`] as a `Duration`.
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Counters describing pool activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Workers created.
    pub created: u64,
    /// Workers destroyed, after use or because they failed validation.
    pub destroyed: u64,
    /// Successful acquisitions.
    pub acquired: u64,
    /// Acquisitions that timed out.
    pub timeouts: u64,
    /// Idle workers rejected by validation.
    pub invalid_on_acquire: u64,
    /// Workers currently idle.
    pub idle: usize,
    /// Workers currently checked out.
    pub in_use: usize,
    /// Destroyed workers whose threads have not exited yet.
    pub retiring: usize,
}

struct PoolState<W> {
    idle: VecDeque<W>,
    in_use: usize,
    retiring: Vec<JoinHandle<()>>,
    next_id: u64,
    stats: PoolStats,
}

impl<W> PoolState<W> {
    fn live(&self) -> usize {
        self.in_use + self.idle.len() + self.retiring.len()
    }

    fn retire(&mut self, winding_down: Option<JoinHandle<()>>) {
        self.stats.destroyed += 1;
        if let Some(handle) = winding_down {
            self.retiring.push(handle);
        }
    }

    fn reap(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retiring)
            .into_iter()
            .partition(|h| h.is_finished());
        self.retiring = running;
        for handle in done {
            if handle.join().is_err() {
                tracing::warn!("retired worker thread panicked");
            }
        }
    }
}

/// Fixed-size pool of single-use workers.
///
/// At most `max_workers` exist at once. Callers beyond that block up to their acquire timeout,
/// then fail with [`OutfitError::Busy`]. A worker is destroyed when its [`PooledWorker`] guard is
/// dropped; its slot frees once the factory reports nothing of it is still running.
pub struct WorkerPool<F: WorkerFactory> {
    factory: F,
    max_workers: usize,
    min_idle: usize,
    state: Mutex<PoolState<F::Worker>>,
    available: Condvar,
}

impl<F: WorkerFactory> WorkerPool<F> {
    /// Build a pool and pre-create `min_idle` workers.
    pub fn new(factory: F, opts: &PoolOpts) -> Self {
        let max_workers = opts.max_workers.max(1);
        let pool = Self {
            factory,
            max_workers,
            min_idle: opts.min_idle.min(max_workers),
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                in_use: 0,
                retiring: Vec::new(),
                next_id: 0,
                stats: PoolStats::default(),
            }),
            available: Condvar::new(),
        };
        pool.replenish(&mut pool.lock_state());
        pool
    }

    /// Configured hard bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let mut state = self.lock_state();
        state.reap();
        PoolStats {
            idle: state.idle.len(),
            in_use: state.in_use,
            retiring: state.retiring.len(),
            ..state.stats.clone()
        }
    }

    /// Check out a worker, waiting at most `timeout` for capacity.
    #[tracing::instrument(skip(self))]
    pub fn acquire(&self, timeout: Duration) -> OutfitResult<PooledWorker<'_, F>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock_state();
        loop {
            state.reap();
            while let Some(mut worker) = state.idle.pop_front() {
                if self.factory.validate(&worker) {
                    state.in_use += 1;
                    state.stats.acquired += 1;
                    return Ok(PooledWorker { pool: self, worker });
                }
                tracing::warn!("discarding unhealthy idle worker");
                state.stats.invalid_on_acquire += 1;
                let winding_down = self.factory.destroy(&mut worker);
                state.retire(winding_down);
            }

            if state.live() < self.max_workers {
                // Reserve the slot before creating outside the lock.
                state.in_use += 1;
                let id = state.next_id;
                state.next_id += 1;
                drop(state);

                let created = self.factory.create(id);
                let mut state = self.lock_state();
                return match created {
                    Ok(worker) => {
                        state.stats.created += 1;
                        state.stats.acquired += 1;
                        Ok(PooledWorker { pool: self, worker })
                    }
                    Err(e) => {
                        state.in_use -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                state.stats.timeouts += 1;
                return Err(OutfitError::busy(format!(
                    "no worker available within {} ms ({} in use, {} retiring)",
                    timeout.as_millis(),
                    state.in_use,
                    state.retiring.len()
                )));
            }
            // Nothing signals when a retiring thread exits, so poll for it.
            let wait = if state.retiring.is_empty() {
                deadline - now
            } else {
                (deadline - now).min(RETIRE_POLL)
            };
            state = self
                .available
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn release(&self, worker: &mut F::Worker) {
        let winding_down = self.factory.destroy(worker);
        let mut state = self.lock_state();
        state.in_use = state.in_use.saturating_sub(1);
        state.retire(winding_down);
        state.reap();
        self.replenish(&mut state);
        self.available.notify_all();
    }

    fn replenish(&self, state: &mut PoolState<F::Worker>) {
        while state.idle.len() < self.min_idle && state.live() < self.max_workers {
            let id = state.next_id;
            state.next_id += 1;
            match self.factory.create(id) {
                Ok(worker) => {
                    state.stats.created += 1;
                    state.idle.push_back(worker);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to pre-create worker");
                    break;
                }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState<F::Worker>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked-out worker. Dropping it destroys the worker and, once its thread is done, frees its
/// slot.
pub struct PooledWorker<'a, F: WorkerFactory> {
    pool: &'a WorkerPool<F>,
    worker: F::Worker,
}

impl<F: WorkerFactory> std::fmt::Debug for PooledWorker<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledWorker").finish_non_exhaustive()
    }
}

impl<F: WorkerFactory> Deref for PooledWorker<'_, F> {
    type Target = F::Worker;

    fn deref(&self) -> &Self::Target {
        &self.worker
    }
}

impl<F: WorkerFactory> Drop for PooledWorker<'_, F> {
    fn drop(&mut self) {
        self.pool.release(&mut self.worker);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/pool.rs"]
mod tests;
