use std::collections::HashSet;

use crate::foundation::core::Affine;
use crate::foundation::error::{OutfitError, OutfitResult};

const MAX_STAGE_DIM: u32 = 4_096;
const MAX_SPRITES: usize = 256;
const MAX_PLACEMENTS: usize = 1_024;

/// A frame-animation manifest: a stage, its sprite sheet, and per-frame sprite placements.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationManifest {
    /// Composition name, informational only.
    #[serde(default)]
    pub name: String,
    /// Stage width in manifest units.
    pub width: u32,
    /// Stage height in manifest units.
    pub height: u32,
    /// Sprite images referenced by placements.
    pub sprites: Vec<SpriteDef>,
    /// Frames in playback order.
    pub frames: Vec<FrameDef>,
}

/// One sprite image.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpriteDef {
    /// Id referenced by [`Placement::sprite`].
    pub id: String,
    /// Image URL, absolute or relative to the manifest URL.
    pub url: String,
}

/// Sprites drawn for one frame, back to front.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameDef {
    /// Placements in draw order.
    #[serde(default)]
    pub placements: Vec<Placement>,
}

/// Where and how a sprite is drawn on the stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Sprite id.
    pub sprite: String,
    /// Stage x of the sprite origin.
    #[serde(default)]
    pub x: f64,
    /// Stage y of the sprite origin.
    #[serde(default)]
    pub y: f64,
    /// Horizontal scale.
    #[serde(default = "one")]
    pub scale_x: f64,
    /// Vertical scale.
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Clockwise rotation in degrees about the sprite origin.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Opacity in `[0, 1]`.
    #[serde(default = "one")]
    pub alpha: f64,
}

fn one() -> f64 {
    1.0
}

impl Placement {
    /// Sprite-space to stage-space transform: translate, then rotate, then scale.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

impl AnimationManifest {
    /// Parse and validate manifest JSON.
    pub fn parse(bytes: &[u8]) -> OutfitResult<Self> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| OutfitError::decode(format!("parse animation manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check stage and sprite-count bounds, sprite id uniqueness, and that the first frame is
    /// drawable.
    pub fn validate(&self) -> OutfitResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(OutfitError::decode("animation stage has zero width or height"));
        }
        if self.width > MAX_STAGE_DIM || self.height > MAX_STAGE_DIM {
            return Err(OutfitError::decode(format!(
                "animation stage too large: {}x{} (max {MAX_STAGE_DIM}x{MAX_STAGE_DIM})",
                self.width, self.height
            )));
        }

        if self.sprites.len() > MAX_SPRITES {
            return Err(OutfitError::decode(format!(
                "animation has {} sprites (max {MAX_SPRITES})",
                self.sprites.len()
            )));
        }
        let placements = &self.first_frame()?.placements;
        if placements.len() > MAX_PLACEMENTS {
            return Err(OutfitError::decode(format!(
                "first frame has {} placements (max {MAX_PLACEMENTS})",
                placements.len()
            )));
        }

        let mut ids = HashSet::new();
        for sprite in &self.sprites {
            if !ids.insert(sprite.id.as_str()) {
                return Err(OutfitError::decode(format!(
                    "duplicate sprite id '{}'",
                    sprite.id
                )));
            }
        }

        for p in placements {
            if !ids.contains(p.sprite.as_str()) {
                return Err(OutfitError::decode(format!(
                    "placement references unknown sprite '{}'",
                    p.sprite
                )));
            }
            let nums = [p.x, p.y, p.scale_x, p.scale_y, p.rotation_deg, p.alpha];
            if nums.iter().any(|v| !v.is_finite()) {
                return Err(OutfitError::decode(format!(
                    "placement of sprite '{}' has a non-finite value",
                    p.sprite
                )));
            }
            if !(0.0..=1.0).contains(&p.alpha) {
                return Err(OutfitError::decode(format!(
                    "placement of sprite '{}' has alpha {} outside [0, 1]",
                    p.sprite, p.alpha
                )));
            }
        }
        Ok(())
    }

    /// The only frame this crate renders.
    pub fn first_frame(&self) -> OutfitResult<&FrameDef> {
        self.frames
            .first()
            .ok_or_else(|| OutfitError::decode("animation manifest has no frames"))
    }

    /// Look up a sprite by id.
    pub fn sprite(&self, id: &str) -> Option<&SpriteDef> {
        self.sprites.iter().find(|s| s.id == id)
    }

    /// Absolute URLs of the sprites drawn by the first frame, deduplicated, in first-use order.
    ///
    /// Sprites must live on the manifest's own origin; anything else is a decode error.
    pub fn first_frame_sprite_urls(
        &self,
        manifest_url: &str,
    ) -> OutfitResult<Vec<(String, String)>> {
        let base = url::Url::parse(manifest_url).map_err(|e| {
            OutfitError::validation(format!("invalid manifest url '{manifest_url}': {e}"))
        })?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for p in &self.first_frame()?.placements {
            if !seen.insert(p.sprite.as_str()) {
                continue;
            }
            let sprite = self.sprite(&p.sprite).ok_or_else(|| {
                OutfitError::decode(format!("placement references unknown sprite '{}'", p.sprite))
            })?;
            let abs = base.join(&sprite.url).map_err(|e| {
                OutfitError::decode(format!("invalid sprite url '{}': {e}", sprite.url))
            })?;
            let same_origin = abs.scheme() == base.scheme()
                && abs.host_str() == base.host_str()
                && abs.port_or_known_default() == base.port_or_known_default();
            if !same_origin || !abs.username().is_empty() || abs.password().is_some() {
                return Err(OutfitError::decode(format!(
                    "sprite url '{abs}' is not on the manifest's origin"
                )));
            }
            out.push((sprite.id.clone(), abs.to_string()));
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/manifest.rs"]
mod tests;
