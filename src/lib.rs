//! Outfit compositor: renders a pet avatar outfit from its layered art into a single PNG.
//!
//! An outfit is a pet body plus worn items, each contributing transparent layers assigned to
//! depth-ordered zones. Rendering runs in four stages:
//!
//! 1. **Select**: [`visible_layers`] drops restricted zones, resolves zone conflicts and sorts by
//!    depth.
//! 2. **Resolve**: [`LayerResolver`] turns each layer into an `N×N` premultiplied raster from a
//!    static image, an SVG, or the first frame of a sprite animation.
//! 3. **Composite**: [`Compositor`] resolves layers concurrently and draws them back to front.
//! 4. **Serve**: [`RenderService`] validates requests, de-duplicates concurrent renders through
//!    [`RenderCache`] and applies the HTTP cache policy.
//!
//! Frame animations render on a bounded [`WorkerPool`] of stage workers; when it is exhausted the
//! request fails fast with [`OutfitError::Busy`] instead of queueing without bound.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod appearance;
mod assets;
mod foundation;
mod render;
mod service;

pub use crate::animation::manifest::{AnimationManifest, FrameDef, Placement, SpriteDef};
pub use crate::animation::pool::{PoolOpts, PoolStats, PooledWorker, WorkerFactory, WorkerPool};
pub use crate::animation::renderer::{AnimationRenderer, StageWorkerFactory};
pub use crate::animation::stage::{render_first_frame, render_manifest_url};
pub use crate::animation::worker::{StageSignal, StageWorker};
pub use crate::appearance::catalog::{AppearanceSource, InMemoryCatalog, outfit_visible_layers};
pub use crate::appearance::model::{
    ItemAppearance, KnownGlitch, Layer, LayerSource, Outfit, PetAppearance, Pose, Zone,
    restricted_zones_from_bitmask,
};
pub use crate::appearance::visibility::{
    LayerOrigin, VisibleLayer, ZoneConflictPolicy, layer_sources, visible_layers,
    visible_layers_with_policy,
};
pub use crate::assets::decode::{LayerRaster, decode_image, parse_svg};
pub use crate::assets::fetch::{FetchOpts, HttpFetcher, InMemoryFetcher, LayerFetcher};
pub use crate::assets::resolve::LayerResolver;
pub use crate::assets::svg_raster::rasterize_svg;
pub use crate::foundation::core::{
    Affine, ColorId, ItemId, OutfitId, OutfitSize, SpeciesId, ZoneId,
};
pub use crate::foundation::error::{OutfitError, OutfitResult};
pub use crate::render::cache::{CacheOpts, RenderCache, RenderCacheStats, RenderRequest};
pub use crate::render::canvas::{PremulRgba8, draw_over, over, over_in_place};
pub use crate::render::compositor::{
    Composite, Compositor, CompositorOpts, LayerFailure, RenderStatus, render_outfit_image,
};
pub use crate::service::allow_list::{AllowListOpts, UrlAllowList};
pub use crate::service::handlers::RenderService;
pub use crate::service::http::{
    CACHE_IMMUTABLE, CACHE_NO_STORE, CACHE_PARTIAL, CACHE_SHORT, HttpResponse, Query,
    RETRY_AFTER_SECS,
};
pub use crate::service::opts::ServiceOpts;
