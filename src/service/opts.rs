use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::animation::pool::PoolOpts;
use crate::appearance::visibility::ZoneConflictPolicy;
use crate::assets::fetch::FetchOpts;
use crate::foundation::error::{OutfitError, OutfitResult};
use crate::render::cache::CacheOpts;
use crate::render::compositor::CompositorOpts;
use crate::service::allow_list::AllowListOpts;

/// Everything needed to stand up a [`crate::RenderService`].
///
/// Every field has a default, so a config file only names what it changes:
///
/// ```json
/// { "pool": { "max_workers": 8 }, "cache": { "max_entries": 1024 } }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServiceOpts {
    /// Network fetch settings.
    pub fetch: FetchOpts,
    /// Frame-animation worker pool.
    pub pool: PoolOpts,
    /// Render result cache.
    pub cache: CacheOpts,
    /// Layer resolution fan-out.
    pub compositor: CompositorOpts,
    /// Accepted layer URL shapes.
    pub allow_list: AllowListOpts,
    /// Path of the outfit-bound image endpoint, used to build redirect locations.
    pub outfit_image_path: String,
    /// How zone conflicts in appearance data are resolved.
    pub zone_conflict_policy: ZoneConflictPolicy,
}

impl Default for ServiceOpts {
    fn default() -> Self {
        Self {
            fetch: FetchOpts::default(),
            pool: PoolOpts::default(),
            cache: CacheOpts::default(),
            compositor: CompositorOpts::default(),
            allow_list: AllowListOpts::default(),
            outfit_image_path: "/api/outfitImage".to_string(),
            zone_conflict_policy: ZoneConflictPolicy::default(),
        }
    }
}

impl ServiceOpts {
    /// Parse options from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> OutfitResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| OutfitError::validation(format!("parse service config JSON: {e}")))
    }

    /// Parse options from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> OutfitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            OutfitError::validation(format!("open service config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/service/opts.rs"]
mod tests;
