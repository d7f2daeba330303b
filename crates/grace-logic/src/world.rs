//! World store: the coordinate -> cell map and the generated-chunk set.
//!
//! The store is an owned value; there is no global world. It also owns the
//! cell registry and the generation PRNG, so two stores built from the same
//! seed generate identical worlds.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::cells::{Cell, CellId, CellRegistry, CellVariant, SpawnConfig, SpawnConfigPatch};
use crate::config::{validate_world_config, WorldConfig};
use crate::error::GraceError;
use crate::generation::{ChunkGenerator, ChunkReport};
use crate::hex::{self, HexCoord};

/// Chunk coordinates. Chunk `(q, r)` is centered on
/// `(q * chunk_size, r * chunk_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId {
    pub q: i32,
    pub r: i32,
}

impl ChunkId {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn center(self, chunk_size: i32) -> HexCoord {
        HexCoord::new(self.q * chunk_size, self.r * chunk_size)
    }

    /// Chunk whose center is nearest to `coord` on each axis.
    pub fn containing(coord: HexCoord, chunk_size: i32) -> Self {
        let size = chunk_size as f64;
        Self::new(
            (coord.q as f64 / size).round() as i32,
            (coord.r as f64 / size).round() as i32,
        )
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Cell storage keyed by [`hex::key`], plus the id allocator.
#[derive(Debug, Default)]
pub struct CellGrid {
    cells: HashMap<u64, Cell>,
    next_id: u64,
}

impl CellGrid {
    pub fn get(&self, coord: HexCoord) -> Option<&Cell> {
        self.cells.get(&coord.key())
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        self.cells.contains_key(&coord.key())
    }

    /// Place `cell` at `coord`, replacing any previous occupant.
    pub fn set(&mut self, coord: HexCoord, mut cell: Cell) -> Option<Cell> {
        cell.position = coord;
        self.cells.insert(coord.key(), cell)
    }

    pub fn remove(&mut self, coord: HexCoord) -> Option<Cell> {
        self.cells.remove(&coord.key())
    }

    pub fn allocate_id(&mut self) -> CellId {
        self.next_id += 1;
        CellId(self.next_id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn get_mut(&mut self, coord: HexCoord) -> Option<&mut Cell> {
        self.cells.get_mut(&coord.key())
    }

    fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }
}

pub struct WorldStore {
    config: WorldConfig,
    registry: CellRegistry,
    grid: CellGrid,
    generated: HashSet<ChunkId>,
    seed: u64,
    rng: StdRng,
}

impl WorldStore {
    /// Create an empty world. Draws a seed from entropy when the config has
    /// none.
    pub fn new(config: WorldConfig, registry: CellRegistry) -> Result<Self, GraceError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!("World seed {}", seed);
        Self::with_rng(config, registry, seed, StdRng::seed_from_u64(seed))
    }

    /// Create an empty world drawing from an explicit PRNG. `seed` is only
    /// recorded for reporting.
    pub fn with_rng(
        config: WorldConfig,
        registry: CellRegistry,
        seed: u64,
        rng: StdRng,
    ) -> Result<Self, GraceError> {
        let errors = validate_world_config(&config);
        if !errors.is_empty() {
            return Err(GraceError::InvalidConfig(errors));
        }
        Ok(Self {
            config,
            registry,
            grid: CellGrid::default(),
            generated: HashSet::new(),
            seed,
            rng,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn registry(&self) -> &CellRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CellRegistry {
        &mut self.registry
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn cell_at(&self, coord: HexCoord) -> Option<&Cell> {
        self.grid.get(coord)
    }

    pub fn is_blocked(&self, coord: HexCoord) -> bool {
        self.cell_at(coord).is_some_and(Cell::is_blocking)
    }

    /// Place `cell` at `coord`, replacing any previous occupant. Returns the
    /// replaced cell.
    pub fn set_cell(&mut self, coord: HexCoord, cell: Cell) -> Option<Cell> {
        self.grid.set(coord, cell)
    }

    /// Construct a cell through the registry without placing it. A fresh id
    /// is allocated when `id` is `None`.
    pub fn create_cell(
        &mut self,
        variant: CellVariant,
        coord: HexCoord,
        id: Option<CellId>,
    ) -> Result<Cell, GraceError> {
        let id = id.unwrap_or_else(|| self.grid.allocate_id());
        Ok(self.registry.create(variant, coord, id, &mut self.rng)?)
    }

    /// Create and place a cell, returning its id.
    pub fn spawn_cell(&mut self, variant: CellVariant, coord: HexCoord) -> Result<CellId, GraceError> {
        let cell = self.create_cell(variant, coord, None)?;
        let id = cell.id;
        self.set_cell(coord, cell);
        Ok(id)
    }

    /// Debug hook behind the force-plant key.
    pub fn debug_spawn(&mut self, variant: CellVariant, coord: HexCoord) -> Result<CellId, GraceError> {
        log::debug!("Debug spawn {} at {}", variant, coord);
        self.spawn_cell(variant, coord)
    }

    /// Flip the discovered flag of the cell at `coord`. `true` on first
    /// discovery only.
    pub fn mark_discovered(&mut self, coord: HexCoord) -> bool {
        self.grid.get_mut(coord).is_some_and(Cell::mark_discovered)
    }

    /// Linear scan for a cell by id.
    pub fn find_by_id(&self, id: CellId) -> Option<&Cell> {
        self.grid.iter().find(|c| c.id == id)
    }

    /// All cells in the box of half extent `radius` around `center`, in
    /// q-major order.
    pub fn cells_in_radius(&self, center: HexCoord, radius: i32) -> Vec<&Cell> {
        hex::bounding_box(center, radius)
            .filter_map(|c| self.grid.get(c))
            .collect()
    }

    /// Nearest cell of `variant` by hex distance, scanning rings outward.
    pub fn nearest_cell(
        &self,
        from: HexCoord,
        variant: CellVariant,
        max_radius: i32,
    ) -> Option<&Cell> {
        (0..=max_radius).find_map(|radius| {
            hex::ring(from, radius)
                .into_iter()
                .filter_map(|c| self.grid.get(c))
                .find(|cell| cell.variant == variant)
        })
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.grid.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    pub fn chunk_of(&self, coord: HexCoord) -> ChunkId {
        ChunkId::containing(coord, self.config.chunk_size)
    }

    pub fn chunk_center(&self, chunk: ChunkId) -> HexCoord {
        chunk.center(self.config.chunk_size)
    }

    pub fn is_chunk_generated(&self, chunk: ChunkId) -> bool {
        self.generated.contains(&chunk)
    }

    pub fn generated_chunk_count(&self) -> usize {
        self.generated.len()
    }

    /// Generate `chunk` unless it already was. Returns `None` when nothing
    /// was done.
    pub fn ensure_chunk_generated(
        &mut self,
        chunk: ChunkId,
    ) -> Result<Option<ChunkReport>, GraceError> {
        if self.generated.contains(&chunk) {
            log::debug!("Chunk {} already generated", chunk);
            return Ok(None);
        }
        self.generate_chunk(chunk).map(Some)
    }

    /// Debug hook: clear the chunk's box and generate it again.
    pub fn force_regenerate_chunk(&mut self, chunk: ChunkId) -> Result<ChunkReport, GraceError> {
        self.generated.remove(&chunk);
        let center = self.chunk_center(chunk);
        let mut cleared = 0;
        for coord in hex::bounding_box(center, self.config.chunk_radius) {
            if self.grid.remove(coord).is_some() {
                cleared += 1;
            }
        }
        log::info!("Force regenerating chunk {} ({} cells cleared)", chunk, cleared);
        self.generate_chunk(chunk)
    }

    fn generate_chunk(&mut self, chunk: ChunkId) -> Result<ChunkReport, GraceError> {
        // Marked before any cell is placed: a re-entrant request for the
        // same chunk sees it as in flight and skips.
        self.generated.insert(chunk);

        let center = self.chunk_center(chunk);
        let result = ChunkGenerator::new(
            chunk,
            center,
            &mut self.grid,
            &self.registry,
            &self.config,
            &mut self.rng,
        )
        .generate();
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                self.generated.remove(&chunk);
                log::warn!("Generation of chunk {} failed: {}", chunk, err);
                return Err(err);
            }
        };

        log::info!(
            "Generated chunk {} at {}: {} cells placed, {} arteries, {} special spawns",
            chunk,
            center,
            report.cells_placed,
            report.arteries,
            report.special_spawns.len()
        );
        Ok(report)
    }

    /// Generate every chunk within `chunk_radius` (chunk-space square) of the
    /// chunk containing `coord`. Returns the number of chunks generated.
    pub fn ensure_chunks_around(
        &mut self,
        coord: HexCoord,
        chunk_radius: i32,
    ) -> Result<usize, GraceError> {
        let origin = self.chunk_of(coord);
        let mut generated = 0;
        for dq in -chunk_radius..=chunk_radius {
            for dr in -chunk_radius..=chunk_radius {
                let chunk = ChunkId::new(origin.q + dq, origin.r + dr);
                if self.ensure_chunk_generated(chunk)?.is_some() {
                    generated += 1;
                }
            }
        }
        Ok(generated)
    }

    /// Tuning hook forwarding to the registry.
    pub fn update_spawn_config(
        &mut self,
        variant: CellVariant,
        patch: &SpawnConfigPatch,
    ) -> Result<SpawnConfig, GraceError> {
        Ok(*self.registry.update_spawn_config(variant, patch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::RegistryEntry;
    use crate::error::RegistryError;

    fn world(seed: u64) -> WorldStore {
        let config = WorldConfig {
            seed: Some(seed),
            ..Default::default()
        };
        WorldStore::new(config, CellRegistry::new()).unwrap()
    }

    #[test]
    fn chunk_containing_rounds_to_nearest_center() {
        assert_eq!(ChunkId::containing(HexCoord::new(0, 0), 50), ChunkId::new(0, 0));
        assert_eq!(ChunkId::containing(HexCoord::new(24, -24), 50), ChunkId::new(0, 0));
        assert_eq!(ChunkId::containing(HexCoord::new(26, -26), 50), ChunkId::new(1, -1));
        assert_eq!(ChunkId::containing(HexCoord::new(-80, 120), 50), ChunkId::new(-2, 2));
        assert_eq!(ChunkId::new(-2, 3).center(50), HexCoord::new(-100, 150));
    }

    #[test]
    fn set_cell_replaces_occupant() {
        let mut w = world(1);
        let a = w.spawn_cell(CellVariant::Plant, HexCoord::new(3, 3)).unwrap();
        let b = w.spawn_cell(CellVariant::Path, HexCoord::new(3, 3)).unwrap();
        assert_ne!(a, b);
        assert_eq!(w.cell_count(), 1);
        let cell = w.cell_at(HexCoord::new(3, 3)).unwrap();
        assert_eq!(cell.id, b);
        assert_eq!(cell.variant, CellVariant::Path);
    }

    #[test]
    fn set_cell_rewrites_position() {
        let mut w = world(1);
        let cell = w
            .create_cell(CellVariant::Plant, HexCoord::new(0, 0), None)
            .unwrap();
        w.set_cell(HexCoord::new(5, -5), cell);
        assert_eq!(w.cell_at(HexCoord::new(5, -5)).unwrap().position, HexCoord::new(5, -5));
        assert!(w.cell_at(HexCoord::ORIGIN).is_none());
    }

    #[test]
    fn create_cell_keeps_given_id() {
        let mut w = world(1);
        let cell = w
            .create_cell(CellVariant::Ruined, HexCoord::ORIGIN, Some(CellId(99)))
            .unwrap();
        assert_eq!(cell.id, CellId(99));
    }

    #[test]
    fn create_unregistered_variant_is_fatal() {
        let mut w = WorldStore::new(
            WorldConfig {
                seed: Some(1),
                ..Default::default()
            },
            CellRegistry::empty(),
        )
        .unwrap();
        assert!(matches!(
            w.spawn_cell(CellVariant::Plant, HexCoord::ORIGIN),
            Err(GraceError::Registry(_))
        ));
        assert_eq!(w.cell_count(), 0);
    }

    #[test]
    fn invalid_world_config_rejected() {
        let config = WorldConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            WorldStore::new(config, CellRegistry::new()),
            Err(GraceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn find_by_id_and_radius_query() {
        let mut w = world(2);
        let id = w.spawn_cell(CellVariant::Plant, HexCoord::new(1, 1)).unwrap();
        w.spawn_cell(CellVariant::Path, HexCoord::new(10, 10)).unwrap();
        assert_eq!(w.find_by_id(id).unwrap().position, HexCoord::new(1, 1));
        assert!(w.find_by_id(CellId(12345)).is_none());

        let near = w.cells_in_radius(HexCoord::ORIGIN, 2);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, id);
    }

    #[test]
    fn nearest_cell_prefers_smaller_distance() {
        let mut w = world(3);
        w.spawn_cell(CellVariant::AaltoBuilding, HexCoord::new(5, 0)).unwrap();
        let close = w.spawn_cell(CellVariant::AaltoBuilding, HexCoord::new(0, 2)).unwrap();
        let found = w
            .nearest_cell(HexCoord::ORIGIN, CellVariant::AaltoBuilding, 10)
            .unwrap();
        assert_eq!(found.id, close);
        assert!(w
            .nearest_cell(HexCoord::ORIGIN, CellVariant::AaltoBuilding, 1)
            .is_none());
    }

    #[test]
    fn mark_discovered_flips_once() {
        let mut w = world(4);
        w.spawn_cell(CellVariant::AaltoBuilding, HexCoord::ORIGIN).unwrap();
        assert!(w.mark_discovered(HexCoord::ORIGIN));
        assert!(!w.mark_discovered(HexCoord::ORIGIN));
        assert!(!w.mark_discovered(HexCoord::new(9, 9)));
    }

    #[test]
    fn ensure_chunk_generated_is_idempotent() {
        let mut w = world(5);
        assert!(w.ensure_chunk_generated(ChunkId::new(0, 0)).unwrap().is_some());
        let count = w.cell_count();
        assert!(w.ensure_chunk_generated(ChunkId::new(0, 0)).unwrap().is_none());
        assert_eq!(w.cell_count(), count);
        assert_eq!(w.generated_chunk_count(), 1);
    }

    #[test]
    fn force_regenerate_never_generated_chunk() {
        let mut w = world(6);
        let report = w.force_regenerate_chunk(ChunkId::new(2, -1)).unwrap();
        assert!(report.cells_placed > 0);
        assert!(w.is_chunk_generated(ChunkId::new(2, -1)));
    }

    #[test]
    fn force_regenerate_clears_manual_cells() {
        let mut w = world(7);
        w.ensure_chunk_generated(ChunkId::new(0, 0)).unwrap();
        let marker = HexCoord::new(0, 0);
        let id = w.spawn_cell(CellVariant::AaltoStool, marker).unwrap();
        w.force_regenerate_chunk(ChunkId::new(0, 0)).unwrap();
        assert_ne!(w.cell_at(marker).map(|c| c.id), Some(id));
        assert_eq!(w.generated_chunk_count(), 1);
    }

    #[test]
    fn failed_generation_leaves_chunk_untouched() {
        let mut registry = CellRegistry::empty();
        registry.register(RegistryEntry {
            variant: CellVariant::Path,
            weight: 0.0,
            density_scaled: false,
            spawn: None,
            description: "path only",
        });
        let config = WorldConfig {
            seed: Some(12),
            ..Default::default()
        };
        let mut w = WorldStore::new(config, registry).unwrap();
        let chunk = ChunkId::new(0, 0);

        for _ in 0..2 {
            let err = w.ensure_chunk_generated(chunk).unwrap_err();
            assert_eq!(
                err,
                GraceError::Registry(RegistryError::UnknownVariant(CellVariant::Plant))
            );
            assert!(!w.is_chunk_generated(chunk));
            assert_eq!(w.cell_count(), 0);
        }
        assert!(w.force_regenerate_chunk(chunk).is_err());
        assert_eq!(w.generated_chunk_count(), 0);
    }

    #[test]
    fn ensure_chunks_around_generates_square() {
        let mut w = world(8);
        assert_eq!(w.ensure_chunks_around(HexCoord::ORIGIN, 1).unwrap(), 9);
        assert_eq!(w.ensure_chunks_around(HexCoord::new(3, 3), 1).unwrap(), 0);
        assert_eq!(w.generated_chunk_count(), 9);
    }

    #[test]
    fn update_spawn_config_through_store() {
        let mut w = world(9);
        let cfg = w
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(0.75),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cfg.chance, 0.75);
        assert_eq!(w.registry().spawn_config(CellVariant::AaltoBuilding), Some(&cfg));
    }
}
