use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::animation::pool::{PoolOpts, PoolStats, WorkerFactory, WorkerPool};
use crate::animation::worker::StageWorker;
use crate::assets::decode::LayerRaster;
use crate::assets::fetch::LayerFetcher;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::OutfitResult;

/// Spawns [`StageWorker`]s that fetch through a shared [`LayerFetcher`].
pub struct StageWorkerFactory {
    fetcher: Arc<dyn LayerFetcher>,
}

impl StageWorkerFactory {
    /// Factory whose workers fetch manifests and sprites through `fetcher`.
    pub fn new(fetcher: Arc<dyn LayerFetcher>) -> Self {
        Self { fetcher }
    }
}

impl WorkerFactory for StageWorkerFactory {
    type Worker = StageWorker;

    fn create(&self, id: u64) -> OutfitResult<StageWorker> {
        StageWorker::spawn(id, Arc::clone(&self.fetcher))
    }

    fn validate(&self, worker: &StageWorker) -> bool {
        worker.is_connected()
    }

    fn destroy(&self, worker: &mut StageWorker) -> Option<JoinHandle<()>> {
        worker.retire()
    }
}

/// Renders frame-animation layers on pooled stage workers.
///
/// Two independent timeouts apply: waiting for a free worker (`Busy` on expiry) and waiting for
/// the worker's answer (`Render` on expiry). A worker abandoned on the second timeout keeps its
/// pool slot until its job actually ends.
pub struct AnimationRenderer {
    pool: WorkerPool<StageWorkerFactory>,
    acquire_timeout: Duration,
    ready_timeout: Duration,
}

impl AnimationRenderer {
    /// Build a renderer with its own pool sized by `opts`.
    pub fn new(fetcher: Arc<dyn LayerFetcher>, opts: &PoolOpts) -> Self {
        Self::with_pool(
            WorkerPool::new(StageWorkerFactory::new(fetcher), opts),
            opts.acquire_timeout(),
            opts.ready_timeout(),
        )
    }

    /// Build a renderer around an existing pool.
    pub fn with_pool(
        pool: WorkerPool<StageWorkerFactory>,
        acquire_timeout: Duration,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            acquire_timeout,
            ready_timeout,
        }
    }

    /// Render the first frame of the manifest at `manifest_url` to `size × size`.
    #[tracing::instrument(skip(self))]
    pub fn render(&self, manifest_url: &str, size: OutfitSize) -> OutfitResult<LayerRaster> {
        let worker = self.pool.acquire(self.acquire_timeout)?;
        tracing::debug!(worker = worker.id(), "rendering animation");
        worker.render(manifest_url, size, self.ready_timeout)
    }

    /// Pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/renderer.rs"]
mod tests;
