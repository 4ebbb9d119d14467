use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;

use crate::foundation::error::{OutfitError, OutfitResult};

/// Fetch the raw bytes behind a layer asset URL.
///
/// Implementations must be safe to call from many threads at once; the compositor fans out one
/// call per layer.
pub trait LayerFetcher: Send + Sync {
    /// Fetch `url`, failing on network errors and non-success statuses.
    fn fetch(&self, url: &str) -> OutfitResult<Vec<u8>>;
}

/// Network fetch configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FetchOpts {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Responses larger than this are rejected.
    pub max_body_bytes: usize,
}

impl Default for FetchOpts {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: concat!("outfit-compositor/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// [`LayerFetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Build a client from `opts`.
    pub fn new(opts: &FetchOpts) -> OutfitResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(opts.user_agent.clone())
            .timeout(Duration::from_millis(opts.timeout_ms))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            max_body_bytes: opts.max_body_bytes,
        })
    }
}

impl LayerFetcher for HttpFetcher {
    #[tracing::instrument(skip(self))]
    fn fetch(&self, url: &str) -> OutfitResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| OutfitError::fetch(url, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OutfitError::fetch(url, format!("unexpected status {status}")));
        }
        if let Some(len) = resp.content_length()
            && len > self.max_body_bytes as u64
        {
            return Err(OutfitError::fetch(
                url,
                format!("body of {len} bytes exceeds limit {}", self.max_body_bytes),
            ));
        }

        // Content-Length may be absent or wrong; bound the actual read as well.
        let mut body = Vec::new();
        resp.take(self.max_body_bytes as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| OutfitError::fetch(url, e.to_string()))?;
        if body.len() > self.max_body_bytes {
            return Err(OutfitError::fetch(
                url,
                format!("body exceeds limit {}", self.max_body_bytes),
            ));
        }

        tracing::debug!(bytes = body.len(), "fetched layer asset");
        Ok(body)
    }
}

/// In-memory [`LayerFetcher`] for tests and offline rendering.
///
/// Counts every fetch per URL so callers can assert how often an asset was requested.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    assets: HashMap<String, Vec<u8>>,
    delay: Option<Duration>,
    counts: Mutex<HashMap<String, usize>>,
}

impl InMemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` under `url`.
    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.assets.insert(url.into(), bytes);
        self
    }

    /// Sleep for `delay` on every fetch, simulating network latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches made for `url` so far (hits and misses).
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts
            .lock()
            .map(|c| c.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of fetches across all URLs.
    pub fn total_fetches(&self) -> usize {
        self.counts
            .lock()
            .map(|c| c.values().sum())
            .unwrap_or(0)
    }
}

impl LayerFetcher for InMemoryFetcher {
    fn fetch(&self, url: &str) -> OutfitResult<Vec<u8>> {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(url.to_string()).or_insert(0) += 1;
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| OutfitError::fetch(url, "unexpected status 404 Not Found"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
