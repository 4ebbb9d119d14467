use regex::Regex;
use url::Url;

use crate::appearance::model::LayerSource;
use crate::foundation::core::OutfitSize;
use crate::foundation::error::{OutfitError, OutfitResult};

/// Hosts and endpoints layer URLs may point at.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AllowListOpts {
    /// Host serving pre-converted static rasters.
    pub content_host: String,
    /// Legacy host serving original vector and raster assets.
    pub legacy_host: String,
    /// Absolute URL of this service's single-layer animation endpoint.
    pub asset_image_endpoint: String,
    /// The only host `libraryUrl` manifests may be fetched from.
    pub animation_host: String,
}

impl Default for AllowListOpts {
    fn default() -> Self {
        Self {
            content_host: "impress-asset-images.openneo.net".to_string(),
            legacy_host: "images.neopets.com".to_string(),
            asset_image_endpoint: "https://impress-2020.openneo.net/api/assetImage".to_string(),
            animation_host: "images.neopets.com".to_string(),
        }
    }
}

/// Validates candidate layer URLs and classifies them into [`LayerSource`]s.
///
/// Anything not matching a known shape is rejected, so the render endpoint cannot be used to fetch
/// arbitrary URLs.
#[derive(Clone, Debug)]
pub struct UrlAllowList {
    content: Regex,
    legacy: Regex,
    endpoint: Url,
    animation_host: String,
}

impl UrlAllowList {
    /// Compile the patterns for `opts`.
    pub fn new(opts: &AllowListOpts) -> OutfitResult<Self> {
        let content = Regex::new(&format!(
            r"^https://{}/(?:biology|object)/\d{{3}}/\d{{3}}/\d{{3}}/\d+/(?:150x150|300x300|600x600)\.(?:png|svg)(?:\?[0-9A-Za-z=_.-]+)?$",
            regex::escape(&opts.content_host)
        ))
        .map_err(|e| OutfitError::validation(format!("content host pattern: {e}")))?;
        let legacy = Regex::new(&format!(
            r"^https?://{}/cp/(?:bio|items)/(?:data|swf)/[0-9A-Za-z_/-]+\.(?:svg|png)(?:\?[0-9A-Za-z=_.-]+)?$",
            regex::escape(&opts.legacy_host)
        ))
        .map_err(|e| OutfitError::validation(format!("legacy host pattern: {e}")))?;
        let endpoint = Url::parse(&opts.asset_image_endpoint).map_err(|e| {
            OutfitError::validation(format!(
                "invalid asset image endpoint '{}': {e}",
                opts.asset_image_endpoint
            ))
        })?;
        Ok(Self {
            content,
            legacy,
            endpoint,
            animation_host: opts.animation_host.clone(),
        })
    }

    /// Classify an allow-listed URL, or reject it.
    pub fn classify(&self, raw: &str) -> OutfitResult<LayerSource> {
        let raw = raw.trim();
        if let Some(manifest_url) = self.endpoint_library_url(raw)? {
            return Ok(LayerSource::FrameAnimation { manifest_url });
        }
        if self.content.is_match(raw) || self.legacy.is_match(raw) {
            let url = raw.to_string();
            return Ok(if path_is_svg(raw) {
                LayerSource::Vector { url }
            } else {
                LayerSource::StaticRaster { url }
            });
        }
        Err(OutfitError::validation(format!(
            "layer url is not allowed: {raw}"
        )))
    }

    /// Check a `libraryUrl`: HTTPS, at the animation host, without credentials.
    pub fn validate_library_url(&self, raw: &str) -> OutfitResult<String> {
        let url = Url::parse(raw.trim())
            .map_err(|e| OutfitError::validation(format!("invalid libraryUrl '{raw}': {e}")))?;
        if url.scheme() != "https" {
            return Err(OutfitError::validation(format!(
                "libraryUrl must use https (got '{raw}')"
            )));
        }
        if url.host_str() != Some(self.animation_host.as_str()) {
            return Err(OutfitError::validation(format!(
                "libraryUrl must be hosted at {} (got '{raw}')",
                self.animation_host
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(OutfitError::validation("libraryUrl must not carry credentials"));
        }
        Ok(url.to_string())
    }

    /// The URL under which `source` is cached when rendered at `size`.
    ///
    /// Frame animations map to this service's endpoint URL so outfit-bound and stateless requests
    /// for the same layers share cache entries.
    pub fn canonical_url(&self, source: &LayerSource, size: OutfitSize) -> String {
        match source {
            LayerSource::StaticRaster { url } | LayerSource::Vector { url } => url.clone(),
            LayerSource::FrameAnimation { manifest_url } => {
                let mut url = self.endpoint.clone();
                url.query_pairs_mut()
                    .clear()
                    .append_pair("libraryUrl", manifest_url)
                    .append_pair("size", &size.to_string());
                url.to_string()
            }
        }
    }

    fn endpoint_library_url(&self, raw: &str) -> OutfitResult<Option<String>> {
        let Ok(url) = Url::parse(raw) else {
            return Ok(None);
        };
        let same_endpoint = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default()
            && url.path() == self.endpoint.path();
        if !same_endpoint {
            return Ok(None);
        }
        let library_url = url
            .query_pairs()
            .find(|(k, _)| k == "libraryUrl")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| OutfitError::validation(format!("missing libraryUrl in '{raw}'")))?;
        self.validate_library_url(&library_url).map(Some)
    }
}

fn path_is_svg(raw: &str) -> bool {
    let path = raw.split('?').next().unwrap_or(raw);
    path.to_ascii_lowercase().ends_with(".svg")
}

#[cfg(test)]
#[path = "../../tests/unit/service/allow_list.rs"]
mod tests;
