use std::collections::BTreeSet;

use crate::foundation::core::{ColorId, ItemId, OutfitId, SpeciesId, ZoneId};
use crate::foundation::error::{OutfitError, OutfitResult};

/// A named, depth-ordered drawing slot. Lower depth draws first (further back).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    /// Global zone id.
    pub id: ZoneId,
    /// Draw-order key.
    pub depth: u32,
    /// Human label, e.g. "Background" or "Hat".
    pub label: String,
}

/// Where a layer's pixels come from. Exactly one source kind per layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSource {
    /// Pre-converted raster (PNG and friends), decoded then scaled to the output size.
    StaticRaster {
        /// Asset URL.
        url: String,
    },
    /// Vector image, rasterized directly at the output size.
    Vector {
        /// Asset URL.
        url: String,
    },
    /// Sprite manifest for a frame animation; only the first frame is rendered.
    FrameAnimation {
        /// Manifest URL.
        manifest_url: String,
    },
}

impl LayerSource {
    /// The URL that identifies this source's content.
    pub fn url(&self) -> &str {
        match self {
            Self::StaticRaster { url } | Self::Vector { url } => url,
            Self::FrameAnimation { manifest_url } => manifest_url,
        }
    }

    /// Short kind label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StaticRaster { .. } => "static_raster",
            Self::Vector { .. } => "vector",
            Self::FrameAnimation { .. } => "frame_animation",
        }
    }
}

/// Known data problems with a layer. Surfaced to clients as warnings; never changes rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownGlitch {
    /// The official vector export is wrong; the raster is closer to the real art.
    OfficialSvgIsIncorrect,
    /// The official animation manifest is wrong.
    OfficialMovieIsIncorrect,
    /// The layer is known to display incorrectly in general.
    DisplaysIncorrectly,
    /// The layer only looks right together with other body-specific assets.
    RequiresOtherBodySpecificAssets,
}

/// One drawable image element in a zone.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Layer id in the upstream data store.
    pub id: u64,
    /// Zone this layer draws into.
    pub zone: Zone,
    /// Pixel source.
    pub source: LayerSource,
    /// Client-facing glitch flags.
    #[serde(default)]
    pub known_glitches: Vec<KnownGlitch>,
}

/// Emotion/gender pose of a pet.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pose {
    /// Happy, masculine.
    #[default]
    HappyMasc,
    /// Sad, masculine.
    SadMasc,
    /// Sick, masculine.
    SickMasc,
    /// Happy, feminine.
    HappyFem,
    /// Sad, feminine.
    SadFem,
    /// Sick, feminine.
    SickFem,
    /// Legacy art without emotion/gender variants.
    Unconverted,
    /// Pose not yet labeled.
    Unknown,
}

/// Canonical appearance of a (species, color, pose).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PetAppearance {
    /// Appearance id.
    pub id: u64,
    /// Species.
    pub species_id: SpeciesId,
    /// Color.
    pub color_id: ColorId,
    /// Pose.
    pub pose: Pose,
    /// Body layers.
    pub layers: Vec<Layer>,
    /// Zones hidden for every layer (item or pet) while this appearance is worn.
    #[serde(default)]
    pub restricted_zones: BTreeSet<ZoneId>,
}

/// Appearance of an item on a given body.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ItemAppearance {
    /// Item this appearance belongs to.
    pub item_id: ItemId,
    /// Item layers for this body.
    pub layers: Vec<Layer>,
    /// Zones this item hides.
    #[serde(default)]
    pub restricted_zones: BTreeSet<ZoneId>,
}

/// A persisted outfit. `updated_at` changes on every mutation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Outfit {
    /// Outfit id.
    pub id: OutfitId,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Pet species.
    pub species_id: SpeciesId,
    /// Pet color.
    pub color_id: ColorId,
    /// Pet pose.
    #[serde(default)]
    pub pose: Pose,
    /// Items currently worn.
    #[serde(default)]
    pub worn_item_ids: BTreeSet<ItemId>,
    /// Items saved with the outfit but not worn.
    #[serde(default)]
    pub closeted_item_ids: BTreeSet<ItemId>,
    /// Last mutation time in unix milliseconds.
    pub updated_at: i64,
}

impl Outfit {
    /// Wear `item`, moving it out of the closet if present.
    pub fn wear_item(&mut self, item: ItemId, now_ms: i64) {
        self.closeted_item_ids.remove(&item);
        self.worn_item_ids.insert(item);
        self.touch(now_ms);
    }

    /// Move `item` to the closet (saved but not worn).
    pub fn closet_item(&mut self, item: ItemId, now_ms: i64) {
        self.worn_item_ids.remove(&item);
        self.closeted_item_ids.insert(item);
        self.touch(now_ms);
    }

    /// Remove `item` from both the worn and closeted sets.
    pub fn remove_item(&mut self, item: ItemId, now_ms: i64) {
        self.worn_item_ids.remove(&item);
        self.closeted_item_ids.remove(&item);
        self.touch(now_ms);
    }

    /// Set or clear the display name.
    pub fn rename(&mut self, name: Option<String>, now_ms: i64) {
        self.name = name.filter(|n| !n.trim().is_empty());
        self.touch(now_ms);
    }

    // `updated_at` is the render cache-busting key, so it must strictly increase even when the
    // clock does not.
    fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
    }
}

/// Parse a restricted-zone bitmask: character `i` set to `'1'` restricts zone `i + 1`.
pub fn restricted_zones_from_bitmask(mask: &str) -> OutfitResult<BTreeSet<ZoneId>> {
    let mut out = BTreeSet::new();
    for (i, ch) in mask.chars().enumerate() {
        match ch {
            '0' => {}
            '1' => {
                let id = u32::try_from(i + 1)
                    .map_err(|_| OutfitError::validation("restricted zone bitmask too long"))?;
                out.insert(ZoneId(id));
            }
            other => {
                return Err(OutfitError::validation(format!(
                    "restricted zone bitmask contains '{other}' at position {i}"
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/appearance/model.rs"]
mod tests;
