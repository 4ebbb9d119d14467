use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::appearance::model::{ItemAppearance, Outfit, PetAppearance, Pose};
use crate::appearance::visibility::{
    VisibleLayer, ZoneConflictPolicy, visible_layers_with_policy,
};
use crate::foundation::core::{ColorId, ItemId, OutfitId, SpeciesId};
use crate::foundation::error::{OutfitError, OutfitResult};

/// Read interface onto the appearance data store ("given ids, return rows").
///
/// `Ok(None)` means the row does not exist; an item with no appearance for a body is not an error.
pub trait AppearanceSource: Send + Sync {
    /// Look up a saved outfit.
    fn outfit(&self, id: OutfitId) -> OutfitResult<Option<Outfit>>;

    /// Look up the canonical appearance of a (species, color, pose).
    fn pet_appearance(
        &self,
        species: SpeciesId,
        color: ColorId,
        pose: Pose,
    ) -> OutfitResult<Option<PetAppearance>>;

    /// Look up the appearance of an item on a (species, color) body.
    fn item_appearance(
        &self,
        item: ItemId,
        species: SpeciesId,
        color: ColorId,
    ) -> OutfitResult<Option<ItemAppearance>>;
}

/// Compute the draw list for an outfit's current saved state.
#[tracing::instrument(skip(source, outfit), fields(outfit = outfit.id.0))]
pub fn outfit_visible_layers(
    source: &dyn AppearanceSource,
    outfit: &Outfit,
    policy: ZoneConflictPolicy,
) -> OutfitResult<Vec<VisibleLayer>> {
    let pet = source.pet_appearance(outfit.species_id, outfit.color_id, outfit.pose)?;
    if pet.is_none() {
        tracing::warn!(
            species = outfit.species_id.0,
            color = outfit.color_id.0,
            pose = ?outfit.pose,
            "no pet appearance for outfit body; rendering items only"
        );
    }

    let items = outfit
        .worn_item_ids
        .iter()
        .map(|&item| source.item_appearance(item, outfit.species_id, outfit.color_id))
        .collect::<OutfitResult<Vec<_>>>()?;

    visible_layers_with_policy(pet.as_ref(), &items, policy)
}

#[derive(Debug, Clone, serde::Deserialize)]
struct CatalogItemAppearance {
    species_id: SpeciesId,
    color_id: ColorId,
    #[serde(flatten)]
    appearance: ItemAppearance,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct CatalogDef {
    outfits: Vec<Outfit>,
    pet_appearances: Vec<PetAppearance>,
    item_appearances: Vec<CatalogItemAppearance>,
}

/// In-memory [`AppearanceSource`] loaded from a JSON document.
///
/// The document has three optional arrays: `outfits`, `pet_appearances`, and
/// `item_appearances` (each item appearance also carries `species_id` and `color_id`).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    outfits: HashMap<OutfitId, Outfit>,
    pets: HashMap<(SpeciesId, ColorId, Pose), PetAppearance>,
    items: HashMap<(ItemId, SpeciesId, ColorId), ItemAppearance>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> OutfitResult<Self> {
        let def: CatalogDef = serde_json::from_reader(r)
            .map_err(|e| OutfitError::validation(format!("parse catalog JSON: {e}")))?;

        let mut out = Self::new();
        for outfit in def.outfits {
            out.insert_outfit(outfit);
        }
        for pet in def.pet_appearances {
            out.insert_pet_appearance(pet);
        }
        for entry in def.item_appearances {
            out.insert_item_appearance(entry.species_id, entry.color_id, entry.appearance);
        }
        Ok(out)
    }

    /// Parse a catalog from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> OutfitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            OutfitError::validation(format!("open catalog JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Insert or replace an outfit.
    pub fn insert_outfit(&mut self, outfit: Outfit) {
        self.outfits.insert(outfit.id, outfit);
    }

    /// Insert or replace a pet appearance, keyed by its (species, color, pose).
    pub fn insert_pet_appearance(&mut self, pet: PetAppearance) {
        self.pets
            .insert((pet.species_id, pet.color_id, pet.pose), pet);
    }

    /// Insert or replace an item appearance for a body.
    pub fn insert_item_appearance(
        &mut self,
        species: SpeciesId,
        color: ColorId,
        appearance: ItemAppearance,
    ) {
        self.items
            .insert((appearance.item_id, species, color), appearance);
    }
}

impl AppearanceSource for InMemoryCatalog {
    fn outfit(&self, id: OutfitId) -> OutfitResult<Option<Outfit>> {
        Ok(self.outfits.get(&id).cloned())
    }

    fn pet_appearance(
        &self,
        species: SpeciesId,
        color: ColorId,
        pose: Pose,
    ) -> OutfitResult<Option<PetAppearance>> {
        Ok(self.pets.get(&(species, color, pose)).cloned())
    }

    fn item_appearance(
        &self,
        item: ItemId,
        species: SpeciesId,
        color: ColorId,
    ) -> OutfitResult<Option<ItemAppearance>> {
        Ok(self.items.get(&(item, species, color)).cloned())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/appearance/catalog.rs"]
mod tests;
