use std::sync::Arc;

use crate::animation::pool::PoolOpts;
use crate::animation::renderer::AnimationRenderer;
use crate::appearance::model::LayerSource;
use crate::assets::decode::{LayerRaster, decode_image, parse_svg};
use crate::assets::fetch::LayerFetcher;
use crate::assets::svg_raster::rasterize_svg;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::OutfitResult;

/// Turns a layer descriptor into a flattened `size × size` premultiplied raster.
pub struct LayerResolver {
    fetcher: Arc<dyn LayerFetcher>,
    animations: AnimationRenderer,
}

impl LayerResolver {
    /// Resolver with its own animation worker pool configured by `pool`.
    pub fn new(fetcher: Arc<dyn LayerFetcher>, pool: &PoolOpts) -> Self {
        let animations = AnimationRenderer::new(Arc::clone(&fetcher), pool);
        Self::with_animations(fetcher, animations)
    }

    /// Resolver using an existing animation renderer.
    pub fn with_animations(fetcher: Arc<dyn LayerFetcher>, animations: AnimationRenderer) -> Self {
        Self {
            fetcher,
            animations,
        }
    }

    /// The frame-animation renderer and its pool.
    pub fn animations(&self) -> &AnimationRenderer {
        &self.animations
    }

    /// Resolve one layer. Every failure comes back as an error value for this layer alone.
    #[tracing::instrument(skip(self, source), fields(kind = source.kind(), url = source.url()))]
    pub fn resolve(&self, source: &LayerSource, size: OutfitSize) -> OutfitResult<LayerRaster> {
        match source {
            LayerSource::StaticRaster { url } => {
                let bytes = self.fetcher.fetch(url)?;
                decode_image(&bytes)?.scaled_to(size)
            }
            LayerSource::Vector { url } => {
                let bytes = self.fetcher.fetch(url)?;
                rasterize_svg(&parse_svg(&bytes)?, size)
            }
            LayerSource::FrameAnimation { manifest_url } => {
                self.animations.render(manifest_url, size)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolve.rs"]
mod tests;
