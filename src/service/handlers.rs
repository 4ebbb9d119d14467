use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{self, HeaderValue};

use crate::animation::pool::PoolStats;
use crate::appearance::catalog::{AppearanceSource, outfit_visible_layers};
use crate::appearance::model::{LayerSource, Outfit};
use crate::appearance::visibility::{VisibleLayer, ZoneConflictPolicy, layer_sources};
use crate::assets::fetch::{HttpFetcher, LayerFetcher};
use crate::assets::resolve::LayerResolver;
use crate::foundation::core::{OutfitId, OutfitSize};
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::render::cache::{RenderCache, RenderCacheStats, RenderRequest};
use crate::render::compositor::{Composite, Compositor, RenderStatus};
use crate::service::allow_list::UrlAllowList;
use crate::service::http::{CACHE_IMMUTABLE, CACHE_PARTIAL, CACHE_SHORT, HttpResponse, Query};
use crate::service::opts::ServiceOpts;

/// Request handlers for the image endpoints.
///
/// Each handler takes decoded query parameters and returns a complete response; binding them to
/// routes and a listener is left to the host application.
pub struct RenderService {
    catalog: Arc<dyn AppearanceSource>,
    compositor: Compositor,
    cache: RenderCache,
    allow_list: UrlAllowList,
    outfit_image_path: String,
    zone_conflict_policy: ZoneConflictPolicy,
}

impl RenderService {
    /// Service fetching layers over HTTP.
    pub fn new(opts: &ServiceOpts, catalog: Arc<dyn AppearanceSource>) -> OutfitResult<Self> {
        let fetcher: Arc<dyn LayerFetcher> = Arc::new(HttpFetcher::new(&opts.fetch)?);
        Self::with_fetcher(opts, catalog, fetcher)
    }

    /// Service fetching layers through `fetcher`.
    pub fn with_fetcher(
        opts: &ServiceOpts,
        catalog: Arc<dyn AppearanceSource>,
        fetcher: Arc<dyn LayerFetcher>,
    ) -> OutfitResult<Self> {
        let resolver = Arc::new(LayerResolver::new(fetcher, &opts.pool));
        Ok(Self {
            catalog,
            compositor: Compositor::new(resolver, &opts.compositor)?,
            cache: RenderCache::new(&opts.cache),
            allow_list: UrlAllowList::new(&opts.allow_list)?,
            outfit_image_path: opts.outfit_image_path.clone(),
            zone_conflict_policy: opts.zone_conflict_policy,
        })
    }

    /// Stateless render: `layerUrls` (comma-separated, bottom to top) and `size`.
    #[tracing::instrument(skip_all)]
    pub fn outfit_image(&self, query: &Query) -> HttpResponse {
        respond(self.try_outfit_image(query))
    }

    /// Outfit-bound render: `id`, optional `updatedAt`, optional `size`.
    ///
    /// Without `updatedAt` the caller is redirected to the URL naming the current version.
    #[tracing::instrument(skip_all)]
    pub fn outfit_image_by_id(&self, query: &Query) -> HttpResponse {
        respond(self.try_outfit_image_by_id(query))
    }

    /// Single frame-animation layer: `libraryUrl` and optional `size`.
    #[tracing::instrument(skip_all)]
    pub fn asset_image(&self, query: &Query) -> HttpResponse {
        respond(self.try_asset_image(query))
    }

    /// The ordered draw list for an outfit's current state.
    pub fn visible_layers(&self, id: OutfitId) -> OutfitResult<Vec<VisibleLayer>> {
        let outfit = self.load_outfit(id)?;
        outfit_visible_layers(self.catalog.as_ref(), &outfit, self.zone_conflict_policy)
    }

    /// Render cache counters.
    pub fn cache_stats(&self) -> RenderCacheStats {
        self.cache.stats()
    }

    /// Animation worker pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.compositor.resolver().animations().pool_stats()
    }

    fn try_outfit_image(&self, query: &Query) -> OutfitResult<HttpResponse> {
        let size = OutfitSize::parse(query.require("size")?)?;
        let sources = query
            .require("layerUrls")?
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| self.allow_list.classify(u))
            .collect::<OutfitResult<Vec<_>>>()?;
        if sources.is_empty() {
            return Err(OutfitError::validation("layerUrls must name at least one layer"));
        }
        self.render_sources(&sources, size, CACHE_IMMUTABLE)
    }

    fn try_outfit_image_by_id(&self, query: &Query) -> OutfitResult<HttpResponse> {
        let id = OutfitId::parse(query.require("id")?)?;
        let size = optional_size(query)?;
        let outfit = self.load_outfit(id)?;

        let Some(raw) = query.get("updatedAt") else {
            let location = format!(
                "{}?id={}&size={}&updatedAt={}",
                self.outfit_image_path, outfit.id, size, outfit.updated_at
            );
            tracing::debug!(%location, "redirecting to current outfit version");
            return HttpResponse::redirect(&location);
        };
        let updated_at: i64 = raw.parse().map_err(|_| {
            OutfitError::validation(format!("updatedAt must be an integer (got '{raw}')"))
        })?;

        // A stale version still renders the current state, but must not be cached for long.
        let cache_control = if updated_at == outfit.updated_at {
            CACHE_IMMUTABLE
        } else {
            tracing::info!(
                outfit = outfit.id.0,
                requested = updated_at,
                current = outfit.updated_at,
                "updatedAt mismatch; serving current state"
            );
            CACHE_SHORT
        };

        let layers =
            outfit_visible_layers(self.catalog.as_ref(), &outfit, self.zone_conflict_policy)?;
        self.render_sources(&layer_sources(&layers), size, cache_control)
    }

    fn try_asset_image(&self, query: &Query) -> OutfitResult<HttpResponse> {
        let manifest_url = self
            .allow_list
            .validate_library_url(query.require("libraryUrl")?)?;
        let size = optional_size(query)?;
        let source = LayerSource::FrameAnimation { manifest_url };
        let request = RenderRequest::new(vec![self.allow_list.canonical_url(&source, size)], size);

        // Resolve directly so the layer's own error kind decides the status.
        let composite = self.cache.get_or_render(&request, || {
            let raster = self.compositor.resolver().resolve(&source, size)?;
            Ok(Composite {
                png: raster.encode_png()?,
                size,
                status: RenderStatus::Complete,
            })
        })?;
        Ok(composite_response(&composite, &request, CACHE_IMMUTABLE))
    }

    fn render_sources(
        &self,
        sources: &[LayerSource],
        size: OutfitSize,
        cache_control: &'static str,
    ) -> OutfitResult<HttpResponse> {
        let request = RenderRequest::new(
            sources
                .iter()
                .map(|s| self.allow_list.canonical_url(s, size))
                .collect(),
            size,
        );
        let composite = self
            .cache
            .get_or_render(&request, || self.compositor.composite(sources, size))?;
        Ok(composite_response(&composite, &request, cache_control))
    }

    fn load_outfit(&self, id: OutfitId) -> OutfitResult<Outfit> {
        self.catalog
            .outfit(id)?
            .ok_or_else(|| OutfitError::not_found(format!("outfit {id}")))
    }
}

fn optional_size(query: &Query) -> OutfitResult<OutfitSize> {
    query
        .get("size")
        .map(OutfitSize::parse)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn composite_response(
    composite: &Composite,
    request: &RenderRequest,
    cache_control: &'static str,
) -> HttpResponse {
    match &composite.status {
        RenderStatus::Complete => {
            let mut resp = HttpResponse::png(StatusCode::OK, composite.png.clone(), cache_control);
            if let Ok(etag) = HeaderValue::from_str(&request.etag()) {
                resp.set_header(header::ETAG, etag);
            }
            resp
        }
        RenderStatus::PartialFailure { failed } => {
            tracing::warn!(
                fingerprint = request.fingerprint(),
                failed = failed.len(),
                "serving partial image"
            );
            HttpResponse::png(
                StatusCode::INTERNAL_SERVER_ERROR,
                composite.png.clone(),
                CACHE_PARTIAL,
            )
        }
    }
}

fn respond(result: OutfitResult<HttpResponse>) -> HttpResponse {
    match result {
        Ok(resp) => resp,
        Err(e) => {
            if e.status().is_server_error() {
                tracing::warn!(error = %e, "request failed");
            } else {
                tracing::debug!(error = %e, "request rejected");
            }
            HttpResponse::error(&e)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/service/handlers.rs"]
mod tests;
