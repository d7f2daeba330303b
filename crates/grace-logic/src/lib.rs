//! Simulation core for Concrete Grace.
//!
//! An infinite, chunk-generated hex world of typed cells and a turn-based
//! engine that resolves player movement and interaction against it. The
//! crate has no rendering, input or audio dependencies: those collaborators
//! consume [`cells::Cell`] data and [`cells::RenderInfo`] descriptors, and
//! drive the engine through [`gameplay::GameEngine`].
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cells`] | Cell variants, per-variant behavior, spawn registry |
//! | [`config`] | JSON game configuration and validation |
//! | [`error`] | Registry, config and top-level error types |
//! | [`gameplay`] | Movement/interaction state machine, health, discovery |
//! | [`generation`] | Three-phase chunk generator (paths, fill, special spawns) |
//! | [`hex`] | Axial hex coordinates, direction table, distance, rings |
//! | [`world`] | Owned coordinate map, chunk tracking, spatial queries |

pub mod cells;
pub mod config;
pub mod error;
pub mod gameplay;
pub mod generation;
pub mod hex;
pub mod world;

pub use cells::{Cell, CellId, CellVariant};
pub use config::GameConfig;
pub use error::GraceError;
pub use gameplay::{GameEngine, MoveOutcome};
pub use hex::HexCoord;
pub use world::{ChunkId, WorldStore};
