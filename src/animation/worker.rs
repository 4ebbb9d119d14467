use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::animation::stage::render_manifest_url;
use crate::assets::decode::LayerRaster;
use crate::assets::fetch::LayerFetcher;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};

/// The single answer a stage worker sends for a job.
#[derive(Debug)]
pub enum StageSignal {
    /// The first frame was drawn.
    Ready(LayerRaster),
    /// Rendering failed; the message describes why.
    Failed(String),
}

struct StageJob {
    manifest_url: String,
    size: OutfitSize,
    reply: mpsc::Sender<StageSignal>,
}

/// A dedicated thread hosting one sprite stage.
///
/// Jobs arrive over a channel and each is answered with exactly one [`StageSignal`]. The thread
/// exits once its job sender is dropped and any job it is running has finished.
pub struct StageWorker {
    id: u64,
    jobs: Option<mpsc::Sender<StageJob>>,
    handle: Option<JoinHandle<()>>,
    // Set while a job is running that nobody has collected an answer for.
    unanswered: AtomicBool,
}

impl std::fmt::Debug for StageWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageWorker")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl StageWorker {
    /// Start a worker thread that fetches through `fetcher`.
    pub fn spawn(id: u64, fetcher: Arc<dyn LayerFetcher>) -> OutfitResult<Self> {
        let (tx, rx) = mpsc::channel::<StageJob>();
        let handle = std::thread::Builder::new()
            .name(format!("stage-worker-{id}"))
            .spawn(move || {
                for job in rx {
                    let rendered =
                        render_manifest_url(fetcher.as_ref(), &job.manifest_url, job.size);
                    let signal = match rendered {
                        Ok(raster) => StageSignal::Ready(raster),
                        Err(e) => StageSignal::Failed(e.to_string()),
                    };
                    // The caller may have given up waiting.
                    let _ = job.reply.send(signal);
                }
            })
            .map_err(|e| OutfitError::render(format!("spawn stage worker {id}: {e}")))?;
        tracing::debug!(worker = id, "stage worker started");
        Ok(Self {
            id,
            jobs: Some(tx),
            handle: Some(handle),
            unanswered: AtomicBool::new(false),
        })
    }

    /// Pool-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the worker thread is still running and accepting jobs.
    pub fn is_connected(&self) -> bool {
        self.jobs.is_some() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Render the first frame of `manifest_url`, waiting at most `ready_timeout` for the answer.
    ///
    /// On timeout the job keeps running on the worker thread and its result is discarded; the
    /// thread stays busy until the job ends, which [`Self::retire`] reports.
    pub fn render(
        &self,
        manifest_url: &str,
        size: OutfitSize,
        ready_timeout: Duration,
    ) -> OutfitResult<LayerRaster> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| OutfitError::render(format!("stage worker {} is shut down", self.id)))?;

        let (reply, ready) = mpsc::channel();
        jobs.send(StageJob {
            manifest_url: manifest_url.to_string(),
            size,
            reply,
        })
        .map_err(|_| OutfitError::render(format!("stage worker {} is not running", self.id)))?;
        self.unanswered.store(true, Ordering::SeqCst);

        let answer = ready.recv_timeout(ready_timeout);
        if !matches!(answer, Err(mpsc::RecvTimeoutError::Timeout)) {
            self.unanswered.store(false, Ordering::SeqCst);
        }
        match answer {
            Ok(StageSignal::Ready(raster)) => Ok(raster),
            Ok(StageSignal::Failed(message)) => Err(OutfitError::render(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(OutfitError::render(format!(
                "animation '{manifest_url}' not ready after {} ms",
                ready_timeout.as_millis()
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(OutfitError::render(format!(
                "stage worker {} exited before answering",
                self.id
            ))),
        }
    }

    /// Stop accepting jobs. A job already in progress runs to completion.
    pub fn shutdown(&mut self) {
        if self.jobs.take().is_some() {
            tracing::debug!(worker = self.id, "stage worker shut down");
        }
    }

    /// Shut down and hand back the thread if it is still running an abandoned job.
    ///
    /// A worker whose last job was answered is joined here; its thread is only leaving the job
    /// loop. Otherwise the caller owns the handle and must treat the thread as live until it
    /// finishes.
    pub fn retire(&mut self) -> Option<JoinHandle<()>> {
        self.shutdown();
        let handle = self.handle.take()?;
        if self.unanswered.load(Ordering::SeqCst) && !handle.is_finished() {
            tracing::debug!(worker = self.id, "stage worker still busy with an abandoned job");
            return Some(handle);
        }
        if handle.join().is_err() {
            tracing::warn!(worker = self.id, "stage worker panicked");
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/worker.rs"]
mod tests;
