use std::sync::Arc;

use rayon::prelude::*;

use crate::appearance::model::LayerSource;
use crate::assets::decode::LayerRaster;
use crate::assets::resolve::LayerResolver;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::render::canvas::draw_over;

/// Compositor configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositorOpts {
    /// Threads used to resolve layers concurrently. `None` uses rayon's default.
    pub fetch_threads: Option<usize>,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            fetch_threads: Some(16),
        }
    }
}

/// One layer that could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct LayerFailure {
    /// The layer's content URL.
    pub url: String,
    /// Why it failed.
    pub message: String,
}

/// Whether every layer made it into the image.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderStatus {
    /// All layers drawn.
    #[default]
    Complete,
    /// Some layers were skipped.
    PartialFailure {
        /// Skipped layers, in draw order.
        failed: Vec<LayerFailure>,
    },
}

/// A composited image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composite {
    /// PNG bytes, straight-alpha RGBA8.
    pub png: Vec<u8>,
    /// Edge length of the image.
    pub size: OutfitSize,
    /// Completeness of the image.
    pub status: RenderStatus,
}

impl Composite {
    /// True when no layer was skipped.
    pub fn is_complete(&self) -> bool {
        matches!(self.status, RenderStatus::Complete)
    }
}

/// Resolves layers in parallel on a dedicated thread pool and composites them in depth order.
pub struct Compositor {
    resolver: Arc<LayerResolver>,
    pool: rayon::ThreadPool,
}

impl Compositor {
    /// Build a compositor over `resolver`.
    pub fn new(resolver: Arc<LayerResolver>, opts: &CompositorOpts) -> OutfitResult<Self> {
        Ok(Self {
            resolver,
            pool: build_thread_pool(opts.fetch_threads)?,
        })
    }

    /// The resolver layers go through.
    pub fn resolver(&self) -> &LayerResolver {
        &self.resolver
    }

    /// Composite `layers` (bottom to top) into a `size × size` PNG.
    #[tracing::instrument(skip(self, layers), fields(layers = layers.len(), size = %size))]
    pub fn composite(&self, layers: &[LayerSource], size: OutfitSize) -> OutfitResult<Composite> {
        let resolver = self.resolver.as_ref();
        let resolved = self.pool.install(|| {
            layers
                .par_iter()
                .map(|layer| resolver.resolve(layer, size))
                .collect::<Vec<_>>()
        });
        composite_resolved(layers, resolved, size)
    }
}

/// One-shot composite on rayon's global pool.
pub fn render_outfit_image(
    resolver: &LayerResolver,
    layers: &[LayerSource],
    size: OutfitSize,
) -> OutfitResult<Composite> {
    let resolved = layers
        .par_iter()
        .map(|layer| resolver.resolve(layer, size))
        .collect::<Vec<_>>();
    composite_resolved(layers, resolved, size)
}

fn composite_resolved(
    layers: &[LayerSource],
    resolved: Vec<OutfitResult<LayerRaster>>,
    size: OutfitSize,
) -> OutfitResult<Composite> {
    let n = size.px();
    let mut canvas = LayerRaster::transparent(n, n);
    let mut drawn = 0usize;
    let mut failed = Vec::new();
    let mut errors = Vec::new();

    // `resolved` is index-aligned with `layers`, so draw order is depth order.
    for (layer, result) in layers.iter().zip(resolved) {
        match result {
            Ok(raster) => {
                draw_over(&mut canvas, &raster)?;
                drawn += 1;
            }
            Err(e) => {
                tracing::warn!(url = layer.url(), error = %e, "layer failed to resolve");
                failed.push(LayerFailure {
                    url: layer.url().to_string(),
                    message: e.to_string(),
                });
                errors.push(e);
            }
        }
    }

    if drawn == 0 {
        if !errors.is_empty() && errors.iter().all(OutfitError::is_retryable) {
            return Err(errors.swap_remove(0));
        }
        return Err(OutfitError::AllLayersFailed {
            urls: layers.iter().map(|l| l.url().to_string()).collect(),
        });
    }

    let status = if failed.is_empty() {
        RenderStatus::Complete
    } else {
        RenderStatus::PartialFailure { failed }
    };
    tracing::debug!(drawn, "composited layers");
    Ok(Composite {
        png: canvas.encode_png()?,
        size,
        status,
    })
}

fn build_thread_pool(threads: Option<usize>) -> OutfitResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(OutfitError::validation(
            "compositor 'fetch_threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("layer-fetch-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| OutfitError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
