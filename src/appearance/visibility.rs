use std::collections::{BTreeSet, HashMap};

use crate::appearance::model::{ItemAppearance, Layer, LayerSource, PetAppearance};
use crate::foundation::core::{ItemId, ZoneId};
use crate::foundation::error::{OutfitError, OutfitResult};

/// Precedence when two visible layers claim the same zone.
///
/// Well-formed data never produces a conflict, so this only decides how malformed data degrades.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneConflictPolicy {
    /// Keep the first layer encountered (pet layers come before item layers).
    #[default]
    FirstWins,
    /// Keep the pet's layer over an item's layer; otherwise first wins.
    PreferPet,
    /// Keep an item's layer over the pet's layer; otherwise first wins.
    PreferItem,
    /// Treat any conflict as invalid data.
    Reject,
}

/// Which appearance contributed a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrigin {
    /// Pet body layer.
    Pet,
    /// Layer of the given worn item.
    Item(ItemId),
}

/// A layer selected for drawing, tagged with its origin.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VisibleLayer {
    /// The layer.
    pub layer: Layer,
    /// Its origin.
    pub origin: LayerOrigin,
}

impl VisibleLayer {
    /// Zone id of the underlying layer.
    pub fn zone_id(&self) -> ZoneId {
        self.layer.zone.id
    }

    /// Zone depth of the underlying layer.
    pub fn depth(&self) -> u32 {
        self.layer.zone.depth
    }
}

/// Compute the draw list with the default first-wins conflict policy.
///
/// `items` entries that are `None` are items with no rendering for this body; they contribute
/// neither layers nor restrictions.
pub fn visible_layers(
    pet: Option<&PetAppearance>,
    items: &[Option<ItemAppearance>],
) -> Vec<VisibleLayer> {
    let mut out = collect_unrestricted(pet, items);
    let mut seen = HashMap::<ZoneId, LayerOrigin>::new();
    out.retain(|vl| match seen.get(&vl.zone_id()) {
        Some(kept) => {
            tracing::warn!(
                zone = vl.zone_id().0,
                layer = vl.layer.id,
                kept = ?kept,
                dropped = ?vl.origin,
                "two visible layers share a zone; keeping the first"
            );
            false
        }
        None => {
            seen.insert(vl.zone_id(), vl.origin);
            true
        }
    });
    out.sort_by_key(VisibleLayer::depth);
    out
}

/// Compute the draw list with an explicit conflict policy.
///
/// Steps: gather pet then item layers, drop layers in any restricted zone (from any appearance),
/// keep one layer per zone per `policy`, then stable-sort by zone depth.
pub fn visible_layers_with_policy(
    pet: Option<&PetAppearance>,
    items: &[Option<ItemAppearance>],
    policy: ZoneConflictPolicy,
) -> OutfitResult<Vec<VisibleLayer>> {
    if policy == ZoneConflictPolicy::FirstWins {
        return Ok(visible_layers(pet, items));
    }

    let candidates = collect_unrestricted(pet, items);
    let mut kept: Vec<VisibleLayer> = Vec::with_capacity(candidates.len());
    let mut slot_by_zone = HashMap::<ZoneId, usize>::new();

    for vl in candidates {
        let Some(&slot) = slot_by_zone.get(&vl.zone_id()) else {
            slot_by_zone.insert(vl.zone_id(), kept.len());
            kept.push(vl);
            continue;
        };

        let existing = &kept[slot];
        let replace = match policy {
            ZoneConflictPolicy::Reject => {
                return Err(OutfitError::validation(format!(
                    "layers {} and {} both occupy zone {} ({})",
                    existing.layer.id,
                    vl.layer.id,
                    vl.zone_id().0,
                    vl.layer.zone.label
                )));
            }
            ZoneConflictPolicy::PreferPet => {
                matches!(existing.origin, LayerOrigin::Item(_)) && vl.origin == LayerOrigin::Pet
            }
            ZoneConflictPolicy::PreferItem => {
                existing.origin == LayerOrigin::Pet && matches!(vl.origin, LayerOrigin::Item(_))
            }
            ZoneConflictPolicy::FirstWins => false,
        };

        tracing::warn!(
            zone = vl.zone_id().0,
            policy = ?policy,
            replaced = replace,
            "two visible layers share a zone"
        );
        if replace {
            kept[slot] = vl;
        }
    }

    kept.sort_by_key(VisibleLayer::depth);
    Ok(kept)
}

/// Layer sources of a draw list, in draw order.
pub fn layer_sources(layers: &[VisibleLayer]) -> Vec<LayerSource> {
    layers.iter().map(|vl| vl.layer.source.clone()).collect()
}

fn collect_unrestricted(
    pet: Option<&PetAppearance>,
    items: &[Option<ItemAppearance>],
) -> Vec<VisibleLayer> {
    let items: Vec<&ItemAppearance> = items.iter().flatten().collect();

    let mut restricted = BTreeSet::<ZoneId>::new();
    if let Some(pet) = pet {
        restricted.extend(pet.restricted_zones.iter().copied());
    }
    for item in &items {
        restricted.extend(item.restricted_zones.iter().copied());
    }

    let pet_layers = pet.into_iter().flat_map(|p| {
        p.layers.iter().map(|l| VisibleLayer {
            layer: l.clone(),
            origin: LayerOrigin::Pet,
        })
    });
    let item_layers = items.iter().flat_map(|a| {
        a.layers.iter().map(|l| VisibleLayer {
            layer: l.clone(),
            origin: LayerOrigin::Item(a.item_id),
        })
    });

    pet_layers
        .chain(item_layers)
        .filter(|vl| !restricted.contains(&vl.zone_id()))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/appearance/visibility.rs"]
mod tests;
