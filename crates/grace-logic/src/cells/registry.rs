//! Cell type registry.
//!
//! The registry is the only place variants are declared for spawning. Each
//! entry carries an ambient spawn weight (used by the weighted fill) and an
//! optional [`SpawnConfig`] for rare, constrained placements such as one
//! building per chunk. Entries are runtime-mutable for tuning.
//!
//! ```
//! use grace_logic::cells::{CellRegistry, CellVariant, SpawnConfigPatch};
//!
//! let mut registry = CellRegistry::new();
//! assert_eq!(registry.spawnable_variants().len(), 3);
//!
//! registry
//!     .update_spawn_config(
//!         CellVariant::AaltoBuilding,
//!         &SpawnConfigPatch { chance: Some(1.0), ..Default::default() },
//!     )
//!     .unwrap();
//! assert_eq!(registry.spawn_config(CellVariant::AaltoBuilding).unwrap().chance, 1.0);
//! ```

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{Cell, CellId, CellVariant};
use crate::error::RegistryError;
use crate::hex::HexCoord;

/// Placement policy for special spawns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Chance per chunk, 0..=1.
    pub chance: f64,
    pub max_per_chunk: u32,
    /// Only place on existing path tiles.
    pub requires_path: bool,
    /// Only place on unoccupied coordinates.
    pub requires_empty: bool,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            chance: 0.0,
            max_per_chunk: 1,
            requires_path: false,
            requires_empty: false,
        }
    }
}

/// Partial update for a [`SpawnConfig`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfigPatch {
    pub chance: Option<f64>,
    pub max_per_chunk: Option<u32>,
    pub requires_path: Option<bool>,
    pub requires_empty: Option<bool>,
}

impl SpawnConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.chance.is_none()
            && self.max_per_chunk.is_none()
            && self.requires_path.is_none()
            && self.requires_empty.is_none()
    }

    fn apply(&self, config: &mut SpawnConfig) {
        if let Some(chance) = self.chance {
            config.chance = chance;
        }
        if let Some(max) = self.max_per_chunk {
            config.max_per_chunk = max;
        }
        if let Some(path) = self.requires_path {
            config.requires_path = path;
        }
        if let Some(empty) = self.requires_empty {
            config.requires_empty = empty;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub variant: CellVariant,
    /// Relative weight in the ambient fill; 0 means never randomly spawned.
    pub weight: f64,
    /// Scale `weight` by the chunk density factor during the fill.
    pub density_scaled: bool,
    pub spawn: Option<SpawnConfig>,
    pub description: &'static str,
}

/// Registry of spawnable cell variants.
#[derive(Debug, Clone)]
pub struct CellRegistry {
    // Ordered so every iteration (and thus every weighted pick) is stable.
    entries: BTreeMap<CellVariant, RegistryEntry>,
}

impl Default for CellRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CellRegistry {
    /// Registry with every built-in variant and its default tuning.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for entry in default_entries() {
            registry.register(entry);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace an entry.
    pub fn register(&mut self, entry: RegistryEntry) {
        self.entries.insert(entry.variant, entry);
    }

    pub fn contains(&self, variant: CellVariant) -> bool {
        self.entries.contains_key(&variant)
    }

    pub fn entry(&self, variant: CellVariant) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(&variant)
            .ok_or(RegistryError::UnknownVariant(variant))
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Construct a cell of `variant` at `position`.
    pub fn create(
        &self,
        variant: CellVariant,
        position: HexCoord,
        id: CellId,
        rng: &mut dyn RngCore,
    ) -> Result<Cell, RegistryError> {
        self.entry(variant)?;
        let attrs = variant.behavior().spawn_attributes(rng);
        Ok(Cell {
            id,
            position,
            variant,
            size: attrs.size,
            rotation: attrs.rotation,
            health: attrs.health,
            discovered: attrs.discovered,
            visual: attrs.visual,
        })
    }

    /// Variants eligible for the weighted fill (weight > 0).
    pub fn spawnable_variants(&self) -> Vec<CellVariant> {
        self.entries
            .values()
            .filter(|e| e.weight > 0.0)
            .map(|e| e.variant)
            .collect()
    }

    /// Variants placed by the special-spawn phase.
    pub fn special_spawn_variants(&self) -> Vec<CellVariant> {
        self.entries
            .values()
            .filter(|e| e.spawn.is_some())
            .map(|e| e.variant)
            .collect()
    }

    /// Ambient spawn weight; 0 for unregistered variants.
    pub fn weight(&self, variant: CellVariant) -> f64 {
        self.entries.get(&variant).map_or(0.0, |e| e.weight)
    }

    /// Fill weight at a given density factor (0..=1). Never negative.
    pub fn effective_weight(&self, variant: CellVariant, density_factor: f64) -> f64 {
        match self.entries.get(&variant) {
            Some(e) if e.density_scaled => e.weight * density_factor.clamp(0.0, 1.0),
            Some(e) => e.weight,
            None => 0.0,
        }
    }

    pub fn spawn_config(&self, variant: CellVariant) -> Option<&SpawnConfig> {
        self.entries.get(&variant).and_then(|e| e.spawn.as_ref())
    }

    pub fn set_weight(&mut self, variant: CellVariant, weight: f64) -> Result<(), RegistryError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(RegistryError::InvalidWeight { variant, weight });
        }
        let entry = self
            .entries
            .get_mut(&variant)
            .ok_or(RegistryError::UnknownVariant(variant))?;
        entry.weight = weight;
        Ok(())
    }

    /// Merge `patch` into the variant's existing spawn config.
    pub fn update_spawn_config(
        &mut self,
        variant: CellVariant,
        patch: &SpawnConfigPatch,
    ) -> Result<&SpawnConfig, RegistryError> {
        if let Some(chance) = patch.chance {
            if !(0.0..=1.0).contains(&chance) {
                return Err(RegistryError::InvalidChance { variant, chance });
            }
        }
        let entry = self
            .entries
            .get_mut(&variant)
            .ok_or(RegistryError::UnknownVariant(variant))?;
        let config = entry
            .spawn
            .as_mut()
            .ok_or(RegistryError::NoSpawnConfig(variant))?;
        patch.apply(config);
        Ok(config)
    }
}

fn default_entries() -> [RegistryEntry; 6] {
    [
        RegistryEntry {
            variant: CellVariant::Brutalist,
            weight: 0.7,
            density_scaled: true,
            spawn: None,
            description: "Concrete monoliths that block movement",
        },
        RegistryEntry {
            variant: CellVariant::Plant,
            weight: 0.06,
            density_scaled: false,
            spawn: None,
            description: "Green life that can be consumed for health",
        },
        RegistryEntry {
            variant: CellVariant::AaltoBuilding,
            weight: 0.0,
            density_scaled: false,
            spawn: Some(SpawnConfig {
                chance: 0.05,
                max_per_chunk: 1,
                requires_path: true,
                requires_empty: false,
            }),
            description: "Organic architecture that triggers dialogue",
        },
        RegistryEntry {
            variant: CellVariant::AaltoStool,
            weight: 0.03,
            density_scaled: false,
            spawn: None,
            description: "Dangerous three-legged furniture",
        },
        RegistryEntry {
            variant: CellVariant::Path,
            weight: 0.0,
            density_scaled: false,
            spawn: None,
            description: "Walkable paths connecting areas",
        },
        RegistryEntry {
            variant: CellVariant::Ruined,
            weight: 0.0,
            density_scaled: false,
            spawn: None,
            description: "Contaminated land where plants were consumed",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_registry_has_every_variant() {
        let registry = CellRegistry::new();
        for v in CellVariant::ALL {
            assert!(registry.contains(v), "{} missing", v);
        }
    }

    #[test]
    fn spawnable_variants_in_stable_order() {
        let registry = CellRegistry::new();
        assert_eq!(
            registry.spawnable_variants(),
            vec![
                CellVariant::Brutalist,
                CellVariant::Plant,
                CellVariant::AaltoStool
            ]
        );
        assert_eq!(
            registry.special_spawn_variants(),
            vec![CellVariant::AaltoBuilding]
        );
    }

    #[test]
    fn create_unknown_variant_fails() {
        let registry = CellRegistry::empty();
        let mut rng = StdRng::seed_from_u64(0);
        let err = registry
            .create(CellVariant::Plant, HexCoord::ORIGIN, CellId(1), &mut rng)
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownVariant(CellVariant::Plant));
    }

    #[test]
    fn create_applies_variant_attributes() {
        let registry = CellRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);
        let plant = registry
            .create(CellVariant::Plant, HexCoord::new(2, 0), CellId(5), &mut rng)
            .unwrap();
        assert_eq!(plant.id, CellId(5));
        assert_eq!(plant.position, HexCoord::new(2, 0));
        assert_eq!(plant.health, Some(100));
        assert_eq!(plant.discovered, None);

        let building = registry
            .create(CellVariant::AaltoBuilding, HexCoord::ORIGIN, CellId(6), &mut rng)
            .unwrap();
        assert_eq!(building.size, 8);
        assert_eq!(building.discovered, Some(false));
    }

    #[test]
    fn weight_lookup_and_update() {
        let mut registry = CellRegistry::new();
        assert_eq!(registry.weight(CellVariant::Brutalist), 0.7);
        registry.set_weight(CellVariant::Brutalist, 0.2).unwrap();
        assert_eq!(registry.weight(CellVariant::Brutalist), 0.2);

        assert!(matches!(
            registry.set_weight(CellVariant::Plant, -1.0),
            Err(RegistryError::InvalidWeight { .. })
        ));
        assert!(registry.set_weight(CellVariant::Plant, f64::NAN).is_err());
        assert_eq!(CellRegistry::empty().weight(CellVariant::Plant), 0.0);
    }

    #[test]
    fn density_scales_only_flagged_variants() {
        let registry = CellRegistry::new();
        assert!((registry.effective_weight(CellVariant::Brutalist, 0.5) - 0.35).abs() < 1e-12);
        assert_eq!(registry.effective_weight(CellVariant::Brutalist, -2.0), 0.0);
        assert_eq!(registry.effective_weight(CellVariant::Plant, 0.0), 0.06);
        assert_eq!(CellRegistry::empty().effective_weight(CellVariant::Plant, 1.0), 0.0);
    }

    #[test]
    fn zero_weight_removes_from_spawnable() {
        let mut registry = CellRegistry::new();
        registry.set_weight(CellVariant::AaltoStool, 0.0).unwrap();
        assert!(!registry
            .spawnable_variants()
            .contains(&CellVariant::AaltoStool));
    }

    #[test]
    fn partial_spawn_update_keeps_other_fields() {
        let mut registry = CellRegistry::new();
        let updated = registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    max_per_chunk: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.max_per_chunk, 3);
        assert_eq!(updated.chance, 0.05);
        assert!(updated.requires_path);
    }

    #[test]
    fn spawn_update_without_config_is_rejected() {
        let mut registry = CellRegistry::new();
        let err = registry
            .update_spawn_config(CellVariant::Plant, &SpawnConfigPatch::default())
            .unwrap_err();
        assert_eq!(err, RegistryError::NoSpawnConfig(CellVariant::Plant));
    }

    #[test]
    fn spawn_update_rejects_bad_chance() {
        let mut registry = CellRegistry::new();
        for chance in [f64::NAN, 7.5, -0.1, f64::INFINITY] {
            let err = registry
                .update_spawn_config(
                    CellVariant::AaltoBuilding,
                    &SpawnConfigPatch {
                        chance: Some(chance),
                        max_per_chunk: Some(4),
                        ..Default::default()
                    },
                )
                .unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidChance { variant: CellVariant::AaltoBuilding, .. }),
                "{chance} accepted"
            );
        }
        // Nothing from a rejected patch is applied.
        let config = registry.spawn_config(CellVariant::AaltoBuilding).unwrap();
        assert_eq!(config.chance, 0.05);
        assert_eq!(config.max_per_chunk, 1);
    }

    #[test]
    fn patch_deserializes_partially() {
        let patch: SpawnConfigPatch = serde_json::from_str(r#"{"chance": 0.5}"#).unwrap();
        assert_eq!(patch.chance, Some(0.5));
        assert!(patch.max_per_chunk.is_none());
        assert!(!patch.is_empty());
        assert!(SpawnConfigPatch::default().is_empty());
    }
}
