use crate::foundation::error::{OutfitError, OutfitResult};

pub use kurbo::Affine;

/// Zone identifier (a named, depth-ordered drawing slot such as "Hat" or "Background").
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

/// Pet species identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SpeciesId(pub u32);

/// Pet color identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ColorId(pub u32);

/// Wearable item identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Saved outfit identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct OutfitId(pub u64);

impl OutfitId {
    /// Parse the decimal form used in request query strings.
    pub fn parse(raw: &str) -> OutfitResult<Self> {
        raw.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| OutfitError::validation(format!("invalid outfit id '{raw}'")))
    }
}

impl std::fmt::Display for OutfitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Square output size of a rendered image. Only these sizes are legal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum OutfitSize {
    /// 150×150 thumbnails.
    Px150,
    /// 300×300 previews.
    Px300,
    /// 600×600 full size.
    #[default]
    Px600,
}

impl OutfitSize {
    /// Every legal size, smallest first.
    pub const ALL: [OutfitSize; 3] = [OutfitSize::Px150, OutfitSize::Px300, OutfitSize::Px600];

    /// Edge length in pixels.
    pub fn px(self) -> u32 {
        match self {
            Self::Px150 => 150,
            Self::Px300 => 300,
            Self::Px600 => 600,
        }
    }

    /// Validate a pixel edge length.
    pub fn from_px(px: u32) -> OutfitResult<Self> {
        match px {
            150 => Ok(Self::Px150),
            300 => Ok(Self::Px300),
            600 => Ok(Self::Px600),
            other => Err(OutfitError::validation(format!(
                "size must be one of 150, 300, 600 (got {other})"
            ))),
        }
    }

    /// Parse the `size` query parameter.
    pub fn parse(raw: &str) -> OutfitResult<Self> {
        let px = raw.trim().parse::<u32>().map_err(|_| {
            OutfitError::validation(format!("size must be an integer (got '{raw}')"))
        })?;
        Self::from_px(px)
    }
}

impl TryFrom<u32> for OutfitSize {
    type Error = OutfitError;

    fn try_from(px: u32) -> Result<Self, Self::Error> {
        Self::from_px(px)
    }
}

impl From<OutfitSize> for u32 {
    fn from(size: OutfitSize) -> u32 {
        size.px()
    }
}

impl std::fmt::Display for OutfitSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.px())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
