//! Chunk generation.
//!
//! A chunk is built in three fixed phases over the box of half extent
//! `chunk_radius` around its center:
//!
//! 1. **Path network.** Two plants near the center, 4-6 artery endpoints
//!    spread around it, and a wandering greedy walk between every pair of
//!    {center, arteries}.
//! 2. **Fill.** Every unoccupied coordinate becomes path (inside the safe
//!    zone, or by chance) or a weighted pick from the registry, with
//!    density-scaled variants thinning out toward the chunk edge.
//! 3. **Special spawns.** Each variant with a spawn config rolls once and,
//!    on success, overwrites up to `max_per_chunk` shuffled eligible
//!    coordinates.
//!
//! All randomness comes from the caller's PRNG, so a seeded PRNG reproduces
//! the same chunk.

use std::f64::consts::TAU;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::cells::{CellRegistry, CellVariant, SpawnConfig};
use crate::config::WorldConfig;
use crate::error::GraceError;
use crate::hex::{self, HexCoord, DIRECTIONS};
use crate::world::{CellGrid, ChunkId};

/// Offsets from the chunk center of the two guaranteed starting plants.
pub const STARTER_PLANT_OFFSETS: [HexCoord; 2] = [HexCoord::new(2, 0), HexCoord::new(-1, -1)];

/// Summary of one chunk generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    pub chunk: ChunkId,
    pub center: HexCoord,
    /// Cell placements, counting overwrites.
    pub cells_placed: usize,
    pub arteries: usize,
    pub special_spawns: Vec<(CellVariant, HexCoord)>,
}

/// One unit-direction step from `from` toward `to`, along whichever of the
/// q and r axes has the larger remaining delta (ties go to q).
///
/// Returns the zero vector when `from == to`.
pub fn greedy_step(from: HexCoord, to: HexCoord) -> HexCoord {
    let dq = to.q - from.q;
    let dr = to.r - from.r;
    if dq == 0 && dr == 0 {
        HexCoord::ORIGIN
    } else if dq.abs() >= dr.abs() {
        HexCoord::new(dq.signum(), 0)
    } else {
        HexCoord::new(0, dr.signum())
    }
}

/// Density factor for the fill phase: 1 at the center, 0 at and beyond one
/// radius of hex distance.
pub fn density_factor(coord: HexCoord, center: HexCoord, radius: i32) -> f64 {
    let dq = coord.q - center.q;
    let dr = coord.r - center.r;
    let metric = (dq.abs() + dr.abs() + (dq + dr).abs()) as f64;
    (1.0 - metric / (2.0 * radius as f64)).clamp(0.0, 1.0)
}

/// Weighted pick over the registry's spawnable variants at the given
/// density. `None` when every effective weight is zero.
pub fn pick_weighted_variant(
    registry: &CellRegistry,
    density: f64,
    rng: &mut impl Rng,
) -> Option<CellVariant> {
    let weighted: Vec<(CellVariant, f64)> = registry
        .spawnable_variants()
        .into_iter()
        .map(|v| (v, registry.effective_weight(v, density)))
        .collect();
    let total: f64 = weighted.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }

    let roll = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (variant, weight) in &weighted {
        cumulative += weight;
        if roll < cumulative {
            return Some(*variant);
        }
    }
    // Float accumulation can leave `roll` a hair above the final sum.
    weighted.iter().rev().find(|(_, w)| *w > 0.0).map(|(v, _)| *v)
}

/// Generator for a single chunk. Borrows the store's parts for the duration
/// of one run.
pub struct ChunkGenerator<'a, R: Rng> {
    chunk: ChunkId,
    center: HexCoord,
    grid: &'a mut CellGrid,
    registry: &'a CellRegistry,
    config: &'a WorldConfig,
    rng: &'a mut R,
    placed: usize,
}

impl<'a, R: Rng> ChunkGenerator<'a, R> {
    pub fn new(
        chunk: ChunkId,
        center: HexCoord,
        grid: &'a mut CellGrid,
        registry: &'a CellRegistry,
        config: &'a WorldConfig,
        rng: &'a mut R,
    ) -> Self {
        Self {
            chunk,
            center,
            grid,
            registry,
            config,
            rng,
            placed: 0,
        }
    }

    /// Run all three phases. Fails before placing anything when the
    /// registry lacks a variant the path network needs.
    pub fn generate(mut self) -> Result<ChunkReport, GraceError> {
        for variant in [CellVariant::Plant, CellVariant::Path] {
            self.registry.entry(variant)?;
        }
        let arteries = self.build_path_network()?;
        self.fill()?;
        let special_spawns = self.place_special_spawns()?;
        Ok(ChunkReport {
            chunk: self.chunk,
            center: self.center,
            cells_placed: self.placed,
            arteries,
            special_spawns,
        })
    }

    fn place(&mut self, variant: CellVariant, coord: HexCoord) -> Result<(), GraceError> {
        let id = self.grid.allocate_id();
        let cell = self.registry.create(variant, coord, id, &mut *self.rng)?;
        self.grid.set(coord, cell);
        self.placed += 1;
        Ok(())
    }

    fn build_path_network(&mut self) -> Result<usize, GraceError> {
        for offset in STARTER_PLANT_OFFSETS {
            self.place(CellVariant::Plant, self.center + offset)?;
        }

        let count = self
            .rng
            .gen_range(self.config.min_arteries..=self.config.max_arteries) as usize;
        log::debug!("Chunk {}: {} arteries", self.chunk, count);

        let radius = self.config.chunk_radius as f64;
        let mut points = Vec::with_capacity(count + 1);
        points.push(self.center);
        for i in 0..count {
            let angle = i as f64 / count as f64 * TAU;
            let distance = (self.rng.gen::<f64>() * radius * 0.8).floor() + radius * 0.2;
            points.push(
                self.center
                    + HexCoord::new(
                        (angle.cos() * distance).round() as i32,
                        (angle.sin() * distance).round() as i32,
                    ),
            );
        }

        for (i, &start) in points.iter().enumerate() {
            for &end in &points[i + 1..] {
                self.carve_path(start, end)?;
            }
        }
        Ok(count)
    }

    /// Walk from `start` to `end`, marking every visited coordinate as path.
    fn carve_path(&mut self, start: HexCoord, end: HexCoord) -> Result<(), GraceError> {
        let wander_budget = 4 * hex::distance(start, end) + 16;
        let mut current = start;
        let mut steps = 0;
        while current != end {
            self.place(CellVariant::Path, current)?;
            let wander =
                steps < wander_budget && self.rng.gen_bool(self.config.path_wander_chance);
            current = if wander {
                current + DIRECTIONS[self.rng.gen_range(0..DIRECTIONS.len())]
            } else {
                current + greedy_step(current, end)
            };
            steps += 1;
        }
        self.place(CellVariant::Path, end)
    }

    fn fill(&mut self) -> Result<(), GraceError> {
        let radius = self.config.chunk_radius;
        for coord in hex::bounding_box(self.center, radius) {
            if self.grid.contains(coord) {
                continue;
            }
            if coord.distance(self.center) <= self.config.safe_zone_radius
                || self.rng.gen_bool(self.config.path_fill_chance)
            {
                self.place(CellVariant::Path, coord)?;
                continue;
            }
            let density = density_factor(coord, self.center, radius);
            if let Some(variant) = pick_weighted_variant(self.registry, density, &mut *self.rng) {
                self.place(variant, coord)?;
            }
        }
        Ok(())
    }

    fn place_special_spawns(&mut self) -> Result<Vec<(CellVariant, HexCoord)>, GraceError> {
        let mut spawned = Vec::new();
        for variant in self.registry.special_spawn_variants() {
            let Some(config) = self.registry.spawn_config(variant).copied() else {
                continue;
            };
            if self.rng.gen::<f64>() >= config.chance {
                continue;
            }

            let mut eligible = self.eligible_positions(&config);
            eligible.shuffle(&mut *self.rng);
            for coord in eligible.into_iter().take(config.max_per_chunk as usize) {
                self.place(variant, coord)?;
                log::debug!("Chunk {}: special spawn {} at {}", self.chunk, variant, coord);
                spawned.push((variant, coord));
            }
        }
        Ok(spawned)
    }

    fn eligible_positions(&self, config: &SpawnConfig) -> Vec<HexCoord> {
        let coords = hex::bounding_box(self.center, self.config.chunk_radius);
        if config.requires_path {
            coords
                .filter(|&c| {
                    self.grid
                        .get(c)
                        .is_some_and(|cell| cell.variant == CellVariant::Path)
                })
                .collect()
        } else if config.requires_empty {
            coords.filter(|&c| !self.grid.contains(c)).collect()
        } else {
            coords.collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::cells::{RegistryEntry, SpawnConfigPatch};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generate(
        grid: &mut CellGrid,
        registry: &CellRegistry,
        config: &WorldConfig,
        seed: u64,
    ) -> ChunkReport {
        let mut rng = StdRng::seed_from_u64(seed);
        let chunk = ChunkId::new(0, 0);
        ChunkGenerator::new(
            chunk,
            chunk.center(config.chunk_size),
            grid,
            registry,
            config,
            &mut rng,
        )
        .generate()
        .unwrap()
    }

    #[test]
    fn greedy_step_prefers_larger_axis() {
        let o = HexCoord::ORIGIN;
        assert_eq!(greedy_step(o, HexCoord::new(5, 2)), HexCoord::new(1, 0));
        assert_eq!(greedy_step(o, HexCoord::new(1, -4)), HexCoord::new(0, -1));
        assert_eq!(greedy_step(o, HexCoord::new(-3, 3)), HexCoord::new(-1, 0));
        assert_eq!(greedy_step(o, o), HexCoord::ORIGIN);
    }

    #[test]
    fn greedy_steps_are_directions() {
        let o = HexCoord::ORIGIN;
        for target in hex::bounding_box(o, 4).filter(|&t| t != o) {
            assert!(DIRECTIONS.contains(&greedy_step(o, target)));
        }
    }

    #[test]
    fn density_falls_off_from_center() {
        let c = HexCoord::new(50, 0);
        assert_eq!(density_factor(c, c, 20), 1.0);
        assert_eq!(density_factor(HexCoord::new(60, 0), c, 20), 0.5);
        assert_eq!(density_factor(HexCoord::new(70, 20), c, 20), 0.0);
    }

    #[test]
    fn pick_weighted_on_empty_registry_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_weighted_variant(&CellRegistry::empty(), 1.0, &mut rng), None);
    }

    #[test]
    fn pick_weighted_skips_zeroed_density_variant() {
        let mut registry = CellRegistry::empty();
        registry.register(RegistryEntry {
            variant: CellVariant::Brutalist,
            weight: 1.0,
            density_scaled: true,
            spawn: None,
            description: "test",
        });
        registry.register(RegistryEntry {
            variant: CellVariant::Plant,
            weight: 0.1,
            density_scaled: false,
            spawn: None,
            description: "test",
        });
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            assert_eq!(
                pick_weighted_variant(&registry, 0.0, &mut rng),
                Some(CellVariant::Plant)
            );
        }
    }

    #[test]
    fn chunk_box_is_fully_populated_with_default_registry() {
        let config = WorldConfig::default();
        let mut grid = CellGrid::default();
        let report = generate(&mut grid, &CellRegistry::new(), &config, 3);
        let side = (config.chunk_radius * 2 + 1) as usize;
        let in_box = hex::bounding_box(HexCoord::ORIGIN, config.chunk_radius)
            .filter(|&c| grid.contains(c))
            .count();
        assert_eq!(in_box, side * side);
        assert!((4..=6).contains(&report.arteries));
        assert!(report.cells_placed >= side * side);
    }

    #[test]
    fn safe_zone_is_walkable() {
        let config = WorldConfig::default();
        for seed in 0..5 {
            let mut grid = CellGrid::default();
            generate(&mut grid, &CellRegistry::new(), &config, seed);
            for coord in hex::bounding_box(HexCoord::ORIGIN, config.safe_zone_radius) {
                if coord.distance(HexCoord::ORIGIN) <= config.safe_zone_radius {
                    let cell = grid.get(coord).unwrap();
                    assert!(!cell.is_blocking(), "seed {seed}: {coord} blocked");
                }
            }
        }
    }

    #[test]
    fn center_is_path() {
        let mut grid = CellGrid::default();
        generate(&mut grid, &CellRegistry::new(), &WorldConfig::default(), 4);
        assert_eq!(grid.get(HexCoord::ORIGIN).unwrap().variant, CellVariant::Path);
    }

    #[test]
    fn special_spawns_respect_cap() {
        let mut registry = CellRegistry::new();
        registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(1.0),
                    max_per_chunk: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut grid = CellGrid::default();
        let report = generate(&mut grid, &registry, &WorldConfig::default(), 5);
        assert_eq!(report.special_spawns.len(), 3);
        let buildings = grid_count(&grid, CellVariant::AaltoBuilding);
        assert_eq!(buildings, 3);
    }

    #[test]
    fn special_spawns_land_only_on_prior_path() {
        let mut registry = CellRegistry::new();
        registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(1.0),
                    max_per_chunk: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();
        let config = WorldConfig::default();
        for seed in 0..5 {
            let mut grid = CellGrid::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let chunk = ChunkId::new(0, 0);
            let mut generator = ChunkGenerator::new(
                chunk,
                chunk.center(config.chunk_size),
                &mut grid,
                &registry,
                &config,
                &mut rng,
            );
            generator.build_path_network().unwrap();
            generator.fill().unwrap();
            let paths: HashSet<HexCoord> =
                hex::bounding_box(HexCoord::ORIGIN, config.chunk_radius)
                    .filter(|&c| {
                        generator.grid
                            .get(c)
                            .is_some_and(|cell| cell.variant == CellVariant::Path)
                    })
                    .collect();

            let spawned = generator.place_special_spawns().unwrap();
            assert_eq!(spawned.len(), 10);
            for (variant, coord) in spawned {
                assert_eq!(variant, CellVariant::AaltoBuilding);
                assert!(paths.contains(&coord), "seed {seed}: {coord} was not path");
            }
        }
    }

    #[test]
    fn eligible_positions_by_placement_rule() {
        let config = WorldConfig::default();
        let registry = CellRegistry::new();
        let mut grid = CellGrid::default();
        let path = HexCoord::new(3, 0);
        let stool = HexCoord::new(0, 3);
        for (variant, coord) in [(CellVariant::Path, path), (CellVariant::AaltoStool, stool)] {
            let id = grid.allocate_id();
            let mut rng = StdRng::seed_from_u64(0);
            let cell = registry.create(variant, coord, id, &mut rng).unwrap();
            grid.set(coord, cell);
        }
        let mut rng = StdRng::seed_from_u64(0);
        let generator = ChunkGenerator::new(
            ChunkId::new(0, 0),
            HexCoord::ORIGIN,
            &mut grid,
            &registry,
            &config,
            &mut rng,
        );
        let side = (config.chunk_radius * 2 + 1) as usize;

        let on_path = generator.eligible_positions(&SpawnConfig {
            requires_path: true,
            ..Default::default()
        });
        assert_eq!(on_path, vec![path]);

        let empty = generator.eligible_positions(&SpawnConfig {
            requires_empty: true,
            ..Default::default()
        });
        assert_eq!(empty.len(), side * side - 2);
        assert!(!empty.contains(&path) && !empty.contains(&stool));

        // Neither flag: every coordinate in the box, occupied or not.
        let anywhere = generator.eligible_positions(&SpawnConfig::default());
        assert_eq!(anywhere.len(), side * side);
        assert!(anywhere.contains(&path) && anywhere.contains(&stool));
    }

    #[test]
    fn unrestricted_spawn_may_overwrite_anything() {
        let mut registry = CellRegistry::new();
        registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(1.0),
                    max_per_chunk: Some(5),
                    requires_path: Some(false),
                    requires_empty: Some(false),
                },
            )
            .unwrap();
        let config = WorldConfig::default();
        let mut grid = CellGrid::default();
        let report = generate(&mut grid, &registry, &config, 8);
        assert_eq!(report.special_spawns.len(), 5);
        for (_, coord) in &report.special_spawns {
            assert!(coord.q.abs() <= config.chunk_radius && coord.r.abs() <= config.chunk_radius);
            assert_eq!(grid.get(*coord).unwrap().variant, CellVariant::AaltoBuilding);
        }
    }

    #[test]
    fn zero_chance_never_spawns() {
        let mut registry = CellRegistry::new();
        registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(0.0),
                    ..Default::default()
                },
            )
            .unwrap();
        for seed in 0..10 {
            let mut grid = CellGrid::default();
            let report = generate(&mut grid, &registry, &WorldConfig::default(), seed);
            assert!(report.special_spawns.is_empty());
        }
    }

    #[test]
    fn requires_empty_with_full_box_is_silent() {
        let mut registry = CellRegistry::new();
        registry
            .update_spawn_config(
                CellVariant::AaltoBuilding,
                &SpawnConfigPatch {
                    chance: Some(1.0),
                    requires_path: Some(false),
                    requires_empty: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut grid = CellGrid::default();
        let report = generate(&mut grid, &registry, &WorldConfig::default(), 6);
        assert!(report.special_spawns.is_empty());
    }

    #[test]
    fn same_seed_same_chunk() {
        let config = WorldConfig::default();
        let mut a = CellGrid::default();
        let mut b = CellGrid::default();
        generate(&mut a, &CellRegistry::new(), &config, 77);
        generate(&mut b, &CellRegistry::new(), &config, 77);
        for coord in hex::bounding_box(HexCoord::ORIGIN, config.chunk_radius) {
            assert_eq!(
                a.get(coord).map(|c| c.variant),
                b.get(coord).map(|c| c.variant)
            );
        }
    }

    fn grid_count(grid: &CellGrid, variant: CellVariant) -> usize {
        hex::bounding_box(HexCoord::ORIGIN, WorldConfig::default().chunk_radius)
            .filter(|&c| grid.get(c).is_some_and(|cell| cell.variant == variant))
            .count()
    }
}
