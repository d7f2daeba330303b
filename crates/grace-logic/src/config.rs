//! Game configuration: world bounds, generation tuning, player stats and
//! per-variant spawn overrides.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```
//! use grace_logic::config::{validate_config, GameConfig};
//!
//! let config = GameConfig::from_json(r#"{ "world": { "seed": 42 } }"#).unwrap();
//! assert_eq!(config.world.seed, Some(42));
//! assert_eq!(config.world.chunk_size, 50);
//! assert!(validate_config(&config).is_empty());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cells::{CellRegistry, CellVariant, SpawnConfigPatch};
use crate::error::{ConfigError, GraceError};
use crate::hex::HexCoord;

/// World generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// PRNG seed. `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Movement bound on |q| and |r|.
    pub world_size: i32,
    /// Distance between neighboring chunk centers.
    pub chunk_size: i32,
    /// Half extent of each chunk's generated box.
    pub chunk_radius: i32,
    /// Hex distance around a chunk center that is always walkable.
    pub safe_zone_radius: i32,
    /// Chance an unoccupied fill coordinate becomes path anyway.
    pub path_fill_chance: f64,
    /// Per-step chance a path walk wanders to a random neighbor.
    pub path_wander_chance: f64,
    pub min_arteries: u32,
    pub max_arteries: u32,
    /// Chunk-space radius generated around the player after each move.
    pub preload_chunk_radius: i32,
    /// Chunk-space radius generated by `init_world`.
    pub initial_chunk_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            world_size: 1000,
            chunk_size: 50,
            chunk_radius: 20,
            safe_zone_radius: 8,
            path_fill_chance: 0.3,
            path_wander_chance: 0.1,
            min_arteries: 4,
            max_arteries: 6,
            preload_chunk_radius: 1,
            initial_chunk_radius: 2,
        }
    }
}

/// Player starting state and attrition tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_position: HexCoord,
    pub max_health: i32,
    pub start_health: i32,
    /// Chance of losing `step_attrition` health after a completed step.
    pub step_attrition_chance: f64,
    pub step_attrition: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_position: HexCoord::ORIGIN,
            max_health: 100,
            start_health: 100,
            step_attrition_chance: 0.5,
            step_attrition: 1,
        }
    }
}

/// Registry override for one variant, applied at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnOverride {
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub config: SpawnConfigPatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConfig,
    pub player: PlayerConfig,
    pub spawn: BTreeMap<CellVariant, SpawnOverride>,
}

impl GameConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, GraceError> {
        let config: GameConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validated()
    }

    /// Return `self` if it passes [`validate_config`].
    pub fn validated(self) -> Result<Self, GraceError> {
        let errors = validate_config(&self);
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(GraceError::InvalidConfig(errors))
        }
    }

    /// Build the default registry with this config's overrides applied.
    pub fn build_registry(&self) -> Result<CellRegistry, GraceError> {
        let mut registry = CellRegistry::new();
        self.apply_spawn_overrides(&mut registry)?;
        Ok(registry)
    }

    pub fn apply_spawn_overrides(&self, registry: &mut CellRegistry) -> Result<(), GraceError> {
        for (variant, over) in &self.spawn {
            if !registry.contains(*variant) {
                log::warn!("Spawn override for unregistered variant {} ignored", variant);
                continue;
            }
            if let Some(weight) = over.weight {
                registry.set_weight(*variant, weight)?;
            }
            if !over.config.is_empty() {
                registry.update_spawn_config(*variant, &over.config)?;
            }
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::ProbabilityOutOfRange { name, value });
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &GameConfig) -> Vec<ConfigError> {
    let mut errors = validate_world_config(&config.world);
    errors.extend(validate_player_config(&config.player));

    for (variant, over) in &config.spawn {
        if let Some(chance) = over.config.chance {
            check_probability(variant.name(), chance, &mut errors);
        }
    }

    errors
}

/// Validate only the player section.
pub fn validate_player_config(player: &PlayerConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if player.max_health <= 0 {
        errors.push(ConfigError::ZeroMaxHealth);
    } else if player.start_health > player.max_health {
        errors.push(ConfigError::StartHealthTooHigh {
            start: player.start_health,
            max: player.max_health,
        });
    }
    check_probability(
        "step_attrition_chance",
        player.step_attrition_chance,
        &mut errors,
    );
    if player.step_attrition < 0 {
        errors.push(ConfigError::InvalidAttrition(player.step_attrition));
    }

    errors
}

/// Validate only the world section.
pub fn validate_world_config(world: &WorldConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if world.world_size <= 0 {
        errors.push(ConfigError::InvalidWorldSize(world.world_size));
    }
    if world.chunk_size <= 0 {
        errors.push(ConfigError::InvalidChunkSize(world.chunk_size));
    }
    if world.chunk_radius <= 0 {
        errors.push(ConfigError::InvalidChunkRadius(world.chunk_radius));
    }
    if world.chunk_size > 0 && world.chunk_radius > 0 && world.chunk_radius * 2 >= world.chunk_size
    {
        errors.push(ConfigError::OverlappingChunks {
            radius: world.chunk_radius,
            chunk_size: world.chunk_size,
        });
    }
    if world.safe_zone_radius < 0 {
        errors.push(ConfigError::InvalidSafeZone(world.safe_zone_radius));
    }
    check_probability("path_fill_chance", world.path_fill_chance, &mut errors);
    check_probability("path_wander_chance", world.path_wander_chance, &mut errors);
    if world.min_arteries == 0 || world.min_arteries > world.max_arteries {
        errors.push(ConfigError::InvalidArteryRange {
            min: world.min_arteries,
            max: world.max_arteries,
        });
    }
    if world.preload_chunk_radius < 0 {
        errors.push(ConfigError::InvalidPreloadRadius(world.preload_chunk_radius));
    }
    if world.initial_chunk_radius < 0 {
        errors.push(ConfigError::InvalidPreloadRadius(world.initial_chunk_radius));
    }

    errors
}
