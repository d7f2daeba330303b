//! Gameplay engine: player movement, plant consumption, building discovery.
//!
//! Turn-based and synchronous. Each call resolves one input against the
//! world store and runs to completion, including any chunk generation it
//! triggers.
//!
//! Movement resolves as `MoveAttempt -> {Blocked, Moved}`:
//! 1. Out-of-range direction, world bound or blocking cell: `Blocked`, no
//!    state change.
//! 2. The target's chunk is generated if needed, then its enter result is
//!    evaluated before the position commits.
//!    Discoverable cells are recorded here.
//! 3. Enter health change is applied (clamped). At 0 the player still lands
//!    on the tile and collapses; no step attrition.
//! 4. Otherwise the position commits and step attrition may apply.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::cells::{Cell, CellId, CellVariant, InteractionResult};
use crate::config::{validate_player_config, GameConfig, PlayerConfig};
use crate::error::GraceError;
use crate::hex::{self, HexCoord};
use crate::world::{ChunkId, WorldStore};

pub const COLLAPSE_MESSAGE: &str = "You collapsed!";
pub const EXHAUSTION_MESSAGE: &str = "You collapsed from exhaustion!";

/// Mixed into the world seed so gameplay rolls do not mirror generation
/// rolls.
const ENGINE_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerState {
    pub position: HexCoord,
    pub health: i32,
    pub max_health: i32,
    pub discovered_buildings: BTreeSet<CellId>,
    pub plants_eaten: u32,
}

impl PlayerState {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            position: config.start_position,
            health: config.start_health.min(config.max_health).max(0),
            max_health: config.max_health,
            discovered_buildings: BTreeSet::new(),
            plants_eaten: 0,
        }
    }

    /// Apply a health delta clamped to `[0, max_health]`. Returns the change
    /// actually applied.
    pub fn apply_health(&mut self, delta: i32) -> i32 {
        let before = self.health;
        self.health = self.health.saturating_add(delta).min(self.max_health).max(0);
        self.health - before
    }

    pub fn is_collapsed(&self) -> bool {
        self.health == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockReason {
    InvalidDirection(usize),
    OutOfBounds,
    Obstacle(CellVariant),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveReport {
    pub to: HexCoord,
    pub message: Option<String>,
    pub collapsed: bool,
    pub triggers_dialogue: bool,
    /// Building id, if this step discovered one for the first time.
    pub discovered: Option<CellId>,
    /// Net health change over the whole step.
    pub health_delta: i32,
    /// Chunks generated by this step, the target's own included.
    pub chunks_generated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MoveOutcome {
    Blocked(BlockReason),
    Moved(MoveReport),
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            MoveOutcome::Moved(report) => report.message.as_deref(),
            MoveOutcome::Blocked(_) => None,
        }
    }
}

/// What `consume_plant` should act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantTarget {
    Id(CellId),
    At(HexCoord),
}

impl From<CellId> for PlantTarget {
    fn from(id: CellId) -> Self {
        PlantTarget::Id(id)
    }
}

impl From<HexCoord> for PlantTarget {
    fn from(coord: HexCoord) -> Self {
        PlantTarget::At(coord)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConsumeOutcome {
    Consumed {
        message: Option<String>,
        health_gained: i32,
    },
    /// No cell with that id, or nothing at that coordinate.
    NotFound,
    NotAPlant(CellVariant),
    /// The plant's action reported failure.
    Refused,
}

impl ConsumeOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, ConsumeOutcome::Consumed { .. })
    }
}

/// Result of `interact_with_building`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingInteraction {
    pub building: CellId,
    pub position: HexCoord,
    pub triggers_dialogue: bool,
    pub message: Option<String>,
    pub newly_discovered: bool,
}

/// Serializable snapshot for UIs and the harness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStatus {
    pub seed: u64,
    pub position: HexCoord,
    pub health: i32,
    pub max_health: i32,
    pub plants_eaten: u32,
    pub discovered_buildings: usize,
    pub collapsed: bool,
    pub generated_chunks: usize,
    pub cells: usize,
}

pub struct GameEngine {
    world: WorldStore,
    player: PlayerState,
    config: PlayerConfig,
    rng: StdRng,
    auto_generate: bool,
}

impl GameEngine {
    /// Validate `config` and build an engine over an empty world.
    pub fn new(config: GameConfig) -> Result<Self, GraceError> {
        let config = config.validated()?;
        let registry = config.build_registry()?;
        let world = WorldStore::new(config.world.clone(), registry)?;
        Self::from_parts(world, config.player)
    }

    /// Build an engine over an existing world. The player config is
    /// validated; the gameplay PRNG is derived from the world's seed.
    pub fn from_parts(world: WorldStore, config: PlayerConfig) -> Result<Self, GraceError> {
        let errors = validate_player_config(&config);
        if !errors.is_empty() {
            return Err(GraceError::InvalidConfig(errors));
        }
        let rng = StdRng::seed_from_u64(world.seed() ^ ENGINE_SEED_SALT);
        Ok(Self {
            player: PlayerState::new(&config),
            world,
            config,
            rng,
            auto_generate: true,
        })
    }

    /// Toggle generating the target's chunk before each move and the nearby
    /// chunks after each completed one.
    pub fn set_auto_generate(&mut self, enabled: bool) {
        self.auto_generate = enabled;
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldStore {
        &mut self.world
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    /// Generate the initial `(2R+1)^2` chunks around the origin chunk.
    pub fn init_world(&mut self) -> Result<usize, GraceError> {
        let radius = self.world.config().initial_chunk_radius;
        let mut generated = 0;
        for q in -radius..=radius {
            for r in -radius..=radius {
                if self.world.ensure_chunk_generated(ChunkId::new(q, r))?.is_some() {
                    generated += 1;
                }
            }
        }
        log::info!("World initialised: {} chunks", generated);
        Ok(generated)
    }

    /// Try to step one hex in `direction` (index into [`hex::DIRECTIONS`]).
    pub fn move_player(&mut self, direction: usize) -> Result<MoveOutcome, GraceError> {
        let Some(delta) = hex::direction(direction) else {
            return Ok(MoveOutcome::Blocked(BlockReason::InvalidDirection(direction)));
        };
        let target = self.player.position + delta;
        let bound = self.world.config().world_size;
        if target.q.abs() > bound || target.r.abs() > bound {
            return Ok(MoveOutcome::Blocked(BlockReason::OutOfBounds));
        }
        let mut chunks_generated = 0;
        if self.auto_generate {
            let chunk = self.world.chunk_of(target);
            if self.world.ensure_chunk_generated(chunk)?.is_some() {
                chunks_generated += 1;
            }
        }

        let (enter, discoverable) = match self.world.cell_at(target) {
            Some(cell) if cell.is_blocking() => {
                return Ok(MoveOutcome::Blocked(BlockReason::Obstacle(cell.variant)));
            }
            Some(cell) => (cell.on_enter(), cell.discovered.is_some().then_some(cell.id)),
            None => (InteractionResult::neutral(), None),
        };
        let discovered = discoverable.filter(|&id| self.discover(id, target));

        let mut health_delta = 0;
        if let Some(change) = enter.health_change {
            health_delta += self.player.apply_health(change);
            if self.player.is_collapsed() {
                // The player lands on the lethal tile.
                self.player.position = target;
                log::info!("Player collapsed at {}", target);
                return self.finish_move(MoveReport {
                    to: target,
                    message: Some(
                        enter
                            .message
                            .unwrap_or_else(|| COLLAPSE_MESSAGE.to_string()),
                    ),
                    collapsed: true,
                    triggers_dialogue: enter.triggers_dialogue,
                    discovered,
                    health_delta,
                    chunks_generated,
                });
            }
        }

        self.player.position = target;
        if self.rng.gen_bool(self.config.step_attrition_chance) {
            health_delta += self.player.apply_health(self.config.step_attrition.saturating_neg());
        }

        let collapsed = self.player.is_collapsed();
        let message = if collapsed {
            log::info!("Player collapsed from exhaustion at {}", target);
            Some(EXHAUSTION_MESSAGE.to_string())
        } else {
            enter.message
        };
        self.finish_move(MoveReport {
            to: target,
            message,
            collapsed,
            triggers_dialogue: enter.triggers_dialogue,
            discovered,
            health_delta,
            chunks_generated,
        })
    }

    fn finish_move(&mut self, mut report: MoveReport) -> Result<MoveOutcome, GraceError> {
        if self.auto_generate {
            let radius = self.world.config().preload_chunk_radius;
            report.chunks_generated += self.world.ensure_chunks_around(report.to, radius)?;
        }
        Ok(MoveOutcome::Moved(report))
    }

    /// Record a discovery. `true` the first time `id` is seen.
    fn discover(&mut self, id: CellId, coord: HexCoord) -> bool {
        self.world.mark_discovered(coord);
        let newly = self.player.discovered_buildings.insert(id);
        if newly {
            log::debug!("Discovered building {} at {}", id, coord);
        }
        newly
    }

    /// Eat the plant identified by id or coordinate.
    ///
    /// Anything other than a plant leaves the world and player untouched.
    pub fn consume_plant(
        &mut self,
        target: impl Into<PlantTarget>,
    ) -> Result<ConsumeOutcome, GraceError> {
        let coord = match target.into() {
            PlantTarget::Id(id) => match self.world.find_by_id(id) {
                Some(cell) => cell.position,
                None => return Ok(ConsumeOutcome::NotFound),
            },
            PlantTarget::At(coord) => coord,
        };
        let Some(cell) = self.world.cell_at(coord) else {
            return Ok(ConsumeOutcome::NotFound);
        };
        if cell.variant != CellVariant::Plant {
            return Ok(ConsumeOutcome::NotAPlant(cell.variant));
        }

        let result = cell.on_action();
        if !result.success {
            return Ok(ConsumeOutcome::Refused);
        }

        let health_gained = result
            .health_change
            .map_or(0, |change| self.player.apply_health(change));
        self.player.plants_eaten += 1;

        if let Some(next) = result.transforms_to {
            let replacement = self.world.create_cell(next, coord, None)?;
            self.world.set_cell(coord, replacement);
        }
        log::debug!("Plant consumed at {} (+{} health)", coord, health_gained);

        Ok(ConsumeOutcome::Consumed {
            message: result.message,
            health_gained,
        })
    }

    /// Eat the plant under the player.
    pub fn consume_plant_here(&mut self) -> Result<ConsumeOutcome, GraceError> {
        self.consume_plant(self.player.position)
    }

    /// Act on a building under or next to the player: the first
    /// interactable cell whose action opens a dialogue. Neighbors are checked
    /// in direction-table order.
    pub fn interact_with_building(&mut self) -> Option<BuildingInteraction> {
        let here = self.player.position;
        let (id, position, discoverable, result) = std::iter::once(here)
            .chain(here.neighbors())
            .filter_map(|c| self.world.cell_at(c))
            .filter(|cell| cell.can_interact())
            .map(|cell| (cell.id, cell.position, cell.discovered.is_some(), cell.on_action()))
            .find(|(.., result)| result.triggers_dialogue)?;

        let newly_discovered = discoverable && self.discover(id, position);
        Some(BuildingInteraction {
            building: id,
            position,
            triggers_dialogue: result.triggers_dialogue,
            message: result.message,
            newly_discovered,
        })
    }

    /// Cell under the player, if any.
    pub fn debug_player_cell(&self) -> Option<&Cell> {
        self.world.cell_at(self.player.position)
    }

    pub fn status(&self) -> GameStatus {
        GameStatus {
            seed: self.world.seed(),
            position: self.player.position,
            health: self.player.health,
            max_health: self.player.max_health,
            plants_eaten: self.player.plants_eaten,
            discovered_buildings: self.player.discovered_buildings.len(),
            collapsed: self.player.is_collapsed(),
            generated_chunks: self.world.generated_chunk_count(),
            cells: self.world.cell_count(),
        }
    }
}
