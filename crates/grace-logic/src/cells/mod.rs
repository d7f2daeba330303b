//! Typed grid cells.
//!
//! A [`Cell`] is plain data tagged with a [`CellVariant`]. Behavior (blocking,
//! enter/action handlers, render descriptor) is looked up per variant through
//! [`behavior::CellBehavior`]; construction goes through
//! [`registry::CellRegistry`]. Nothing outside those two modules matches on
//! the variant tag to decide behavior.

pub mod behavior;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;

pub use behavior::{CellBehavior, FallbackShape, InteractionResult, RenderInfo};
pub use registry::{CellRegistry, RegistryEntry, SpawnConfig, SpawnConfigPatch};

/// Closed set of cell variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellVariant {
    Path,
    Brutalist,
    Plant,
    Ruined,
    AaltoBuilding,
    AaltoStool,
}

impl CellVariant {
    pub const ALL: [CellVariant; 6] = [
        CellVariant::Path,
        CellVariant::Brutalist,
        CellVariant::Plant,
        CellVariant::Ruined,
        CellVariant::AaltoBuilding,
        CellVariant::AaltoStool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CellVariant::Path => "path",
            CellVariant::Brutalist => "brutalist",
            CellVariant::Plant => "plant",
            CellVariant::Ruined => "ruined",
            CellVariant::AaltoBuilding => "aalto_building",
            CellVariant::AaltoStool => "aalto_stool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    /// Behavior implementation for this variant.
    pub fn behavior(self) -> &'static dyn CellBehavior {
        behavior::for_variant(self)
    }
}

impl fmt::Display for CellVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable cell identifier, allocated by the world store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}", self.0)
    }
}

/// A single occupied grid coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub position: HexCoord,
    pub variant: CellVariant,
    pub size: u32,
    pub rotation: u32,
    /// Resource counter for plants; not player health.
    pub health: Option<u32>,
    /// Only tracked by variants that can be discovered.
    pub discovered: Option<bool>,
    /// Visual pick for variants with several sprites.
    pub visual: Option<u8>,
}

impl Cell {
    pub fn is_blocking(&self) -> bool {
        self.variant.behavior().is_blocking()
    }

    pub fn can_interact(&self) -> bool {
        self.variant.behavior().can_interact()
    }

    pub fn on_enter(&self) -> InteractionResult {
        self.variant.behavior().on_enter()
    }

    pub fn on_action(&self) -> InteractionResult {
        self.variant.behavior().on_action()
    }

    pub fn render_info(&self) -> RenderInfo {
        self.variant.behavior().render_info(self)
    }

    /// Flip the discovered flag. Returns `true` on the first discovery only;
    /// variants that do not track discovery always return `false`.
    pub fn mark_discovered(&mut self) -> bool {
        match self.discovered {
            Some(false) => {
                self.discovered = Some(true);
                true
            }
            _ => false,
        }
    }
}
