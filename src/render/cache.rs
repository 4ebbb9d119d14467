use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::render::compositor::Composite;

const XXH3_SEED: u64 = 0x5f0e_2a91_c4d7_3b68;

/// Identity of a render: the layer URLs bottom to top, plus the output size.
///
/// Two requests with equal fields produce the same image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    /// Canonical layer URLs in draw order.
    pub layer_urls: Vec<String>,
    /// Output size.
    pub size: OutfitSize,
}

impl RenderRequest {
    /// Build a request.
    pub fn new(layer_urls: Vec<String>, size: OutfitSize) -> Self {
        Self { layer_urls, size }
    }

    /// Stable hash of the request, identical across processes.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        h.update(&self.size.px().to_le_bytes());
        h.update(&(self.layer_urls.len() as u64).to_le_bytes());
        for url in &self.layer_urls {
            h.update(&(url.len() as u64).to_le_bytes());
            h.update(url.as_bytes());
        }
        h.digest()
    }

    /// Quoted entity tag derived from [`Self::fingerprint`].
    pub fn etag(&self) -> String {
        format!("\"{:016x}\"", self.fingerprint())
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheOpts {
    /// Completed renders retained. Zero disables retention; in-flight sharing still applies.
    pub max_entries: usize,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self { max_entries: 256 }
    }
}

/// Counters describing cache activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderCacheStats {
    /// Served from a retained result.
    pub hits: u64,
    /// Started a new render.
    pub misses: u64,
    /// Waited on a render another caller had started.
    pub joins: u64,
    /// Renders that finished successfully.
    pub renders: u64,
    /// Results currently retained.
    pub entries: usize,
}

type Shared = Result<Arc<Composite>, Arc<OutfitError>>;
type Slot = Arc<OnceLock<Shared>>;

/// Single-flight render cache.
///
/// Concurrent callers with equal requests share one render. Complete results stay cached up to
/// `max_entries` (oldest evicted first). Failures and partial results go to the callers already
/// waiting, then are dropped so the next request tries again.
pub struct RenderCache {
    max_entries: usize,
    slots: DashMap<RenderRequest, Slot>,
    retained: Mutex<VecDeque<RenderRequest>>,
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    renders: AtomicU64,
}

impl RenderCache {
    /// Empty cache.
    pub fn new(opts: &CacheOpts) -> Self {
        Self {
            max_entries: opts.max_entries,
            slots: DashMap::new(),
            retained: Mutex::new(VecDeque::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            renders: AtomicU64::new(0),
        }
    }

    /// Return the cached or in-flight result for `request`, or run `render` to produce it.
    #[tracing::instrument(skip(self, request, render), fields(fingerprint = request.fingerprint()))]
    pub fn get_or_render(
        &self,
        request: &RenderRequest,
        render: impl FnOnce() -> OutfitResult<Composite>,
    ) -> OutfitResult<Arc<Composite>> {
        // The entry guard must be released before blocking on the slot.
        let slot = match self.slots.entry(request.clone()) {
            Entry::Occupied(e) => Arc::clone(e.get()),
            Entry::Vacant(e) => Arc::clone(e.insert(Arc::new(OnceLock::new())).value()),
        };

        if let Some(done) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("render cache hit");
            return share(done);
        }

        let mut ran = false;
        let shared = slot.get_or_init(|| {
            ran = true;
            self.misses.fetch_add(1, Ordering::Relaxed);
            let out = render();
            if out.is_ok() {
                self.renders.fetch_add(1, Ordering::Relaxed);
            }
            out.map(Arc::new).map_err(Arc::new)
        });

        if ran {
            self.settle(request, &slot, shared);
        } else {
            self.joins.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("joined in-flight render");
        }
        share(shared)
    }

    /// Retained result for `request`, without rendering or waiting.
    pub fn peek(&self, request: &RenderRequest) -> Option<Arc<Composite>> {
        let slot = self.slots.get(request).map(|s| Arc::clone(s.value()))?;
        match slot.get() {
            Some(Ok(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Drop every retained result. In-flight renders are unaffected.
    pub fn clear(&self) {
        let mut retained = self.lock_retained();
        for request in retained.drain(..) {
            self.slots.remove(&request);
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> RenderCacheStats {
        RenderCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            entries: self.lock_retained().len(),
        }
    }

    fn settle(&self, request: &RenderRequest, slot: &Slot, shared: &Shared) {
        let keep = self.max_entries > 0 && matches!(shared, Ok(c) if c.is_complete());
        if !keep {
            self.slots.remove_if(request, |_, s| Arc::ptr_eq(s, slot));
            return;
        }

        let mut retained = self.lock_retained();
        retained.push_back(request.clone());
        while retained.len() > self.max_entries {
            if let Some(oldest) = retained.pop_front() {
                self.slots.remove(&oldest);
                tracing::debug!(fingerprint = oldest.fingerprint(), "evicted cached render");
            }
        }
    }

    fn lock_retained(&self) -> std::sync::MutexGuard<'_, VecDeque<RenderRequest>> {
        self.retained.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn share(shared: &Shared) -> OutfitResult<Arc<Composite>> {
    match shared {
        Ok(c) => Ok(Arc::clone(c)),
        Err(e) => Err(e.duplicate()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
