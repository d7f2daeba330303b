//! Per-variant cell behavior.
//!
//! One zero-sized type per [`CellVariant`], each implementing
//! [`CellBehavior`]. The trait methods are pure: they describe what *would*
//! happen, and the gameplay engine decides what to apply.

use rand::{Rng, RngCore};
use serde::Serialize;

use super::{Cell, CellVariant};

/// Outcome of entering or acting on a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionResult {
    pub success: bool,
    pub message: Option<String>,
    pub health_change: Option<i32>,
    pub triggers_dialogue: bool,
    pub transforms_to: Option<CellVariant>,
}

impl InteractionResult {
    /// Default enter result: the step is allowed, nothing else happens.
    pub fn neutral() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Default action result: nothing to do here.
    pub fn nothing() -> Self {
        Self::default()
    }
}

/// Shape drawn when a cell's image asset is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FallbackShape {
    /// Filled hexagon, `scale` relative to tile size.
    Hexagon { scale: f32 },
    /// Stem with two leaves.
    Sprout { scale: f32 },
    /// Ellipse seat on three legs.
    Stool { scale: f32 },
    /// Filled circle.
    Disc { scale: f32 },
    /// Small hexagon with three blotches.
    Scorched { scale: f32 },
}

/// Render descriptor consumed by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderInfo {
    pub color: &'static str,
    /// Draw order; higher draws on top.
    pub priority: u8,
    pub image_asset: Option<&'static str>,
    pub fallback: FallbackShape,
}

/// Construction-time attributes a variant assigns to a new cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnAttributes {
    pub size: u32,
    pub rotation: u32,
    pub health: Option<u32>,
    pub discovered: Option<bool>,
    pub visual: Option<u8>,
}

impl Default for SpawnAttributes {
    fn default() -> Self {
        Self {
            size: 1,
            rotation: 0,
            health: None,
            discovered: None,
            visual: None,
        }
    }
}

/// Behavior contract shared by all variants.
pub trait CellBehavior: Sync {
    fn variant(&self) -> CellVariant;

    fn is_blocking(&self) -> bool {
        false
    }

    fn can_interact(&self) -> bool {
        false
    }

    /// Called before the player's position is committed onto this cell.
    fn on_enter(&self) -> InteractionResult {
        InteractionResult::neutral()
    }

    /// Called for explicit player actions (consume, interact).
    fn on_action(&self) -> InteractionResult {
        InteractionResult::nothing()
    }

    fn spawn_attributes(&self, _rng: &mut dyn RngCore) -> SpawnAttributes {
        SpawnAttributes::default()
    }

    fn render_info(&self, cell: &Cell) -> RenderInfo;
}

/// Sprite keys a brutalist monolith picks from at creation.
pub const BRUTALIST_ASSETS: [&str; 4] = ["brutal_1", "brutal_2", "brutal_3", "brutal_4"];

pub const PLANT_HEALTH: u32 = 100;
pub const PLANT_HEAL: i32 = 10;
pub const STOOL_DAMAGE: i32 = -10;
pub const AALTO_BUILDING_SIZE: u32 = 8;

pub struct PathBehavior;
pub struct BrutalistBehavior;
pub struct PlantBehavior;
pub struct RuinedBehavior;
pub struct AaltoBuildingBehavior;
pub struct AaltoStoolBehavior;

static PATH: PathBehavior = PathBehavior;
static BRUTALIST: BrutalistBehavior = BrutalistBehavior;
static PLANT: PlantBehavior = PlantBehavior;
static RUINED: RuinedBehavior = RuinedBehavior;
static AALTO_BUILDING: AaltoBuildingBehavior = AaltoBuildingBehavior;
static AALTO_STOOL: AaltoStoolBehavior = AaltoStoolBehavior;

/// Dispatch table from tag to behavior.
pub fn for_variant(variant: CellVariant) -> &'static dyn CellBehavior {
    match variant {
        CellVariant::Path => &PATH,
        CellVariant::Brutalist => &BRUTALIST,
        CellVariant::Plant => &PLANT,
        CellVariant::Ruined => &RUINED,
        CellVariant::AaltoBuilding => &AALTO_BUILDING,
        CellVariant::AaltoStool => &AALTO_STOOL,
    }
}

impl CellBehavior for PathBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::Path
    }

    fn render_info(&self, _cell: &Cell) -> RenderInfo {
        RenderInfo {
            color: "#444444",
            priority: 1,
            image_asset: None,
            fallback: FallbackShape::Hexagon { scale: 0.8 },
        }
    }
}

impl CellBehavior for BrutalistBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::Brutalist
    }

    fn is_blocking(&self) -> bool {
        true
    }

    fn spawn_attributes(&self, rng: &mut dyn RngCore) -> SpawnAttributes {
        SpawnAttributes {
            size: rng.gen_range(6..=13),
            visual: Some(rng.gen_range(0..BRUTALIST_ASSETS.len()) as u8),
            ..Default::default()
        }
    }

    fn render_info(&self, cell: &Cell) -> RenderInfo {
        let asset = cell
            .visual
            .and_then(|v| BRUTALIST_ASSETS.get(v as usize))
            .copied()
            .unwrap_or(BRUTALIST_ASSETS[0]);
        RenderInfo {
            color: "#666666",
            priority: 5,
            image_asset: Some(asset),
            fallback: FallbackShape::Hexagon { scale: 0.7 },
        }
    }
}

impl CellBehavior for PlantBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::Plant
    }

    fn can_interact(&self) -> bool {
        true
    }

    fn on_action(&self) -> InteractionResult {
        InteractionResult {
            success: true,
            message: Some(format!("You consumed the plant! +{} health", PLANT_HEAL)),
            health_change: Some(PLANT_HEAL),
            triggers_dialogue: false,
            transforms_to: Some(CellVariant::Ruined),
        }
    }

    fn spawn_attributes(&self, _rng: &mut dyn RngCore) -> SpawnAttributes {
        SpawnAttributes {
            health: Some(PLANT_HEALTH),
            ..Default::default()
        }
    }

    fn render_info(&self, _cell: &Cell) -> RenderInfo {
        RenderInfo {
            color: "#228B22",
            priority: 3,
            image_asset: Some("plant"),
            fallback: FallbackShape::Sprout { scale: 0.3 },
        }
    }
}

// Terminal: consumption leaves nothing behind that can be consumed again.
impl CellBehavior for RuinedBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::Ruined
    }

    fn render_info(&self, _cell: &Cell) -> RenderInfo {
        RenderInfo {
            color: "#8B4513",
            priority: 2,
            image_asset: Some("plant_eaten"),
            fallback: FallbackShape::Scorched { scale: 0.36 },
        }
    }
}

impl CellBehavior for AaltoBuildingBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::AaltoBuilding
    }

    fn can_interact(&self) -> bool {
        true
    }

    fn on_enter(&self) -> InteractionResult {
        InteractionResult {
            success: true,
            message: Some("You discovered an Aalto building!".to_string()),
            triggers_dialogue: true,
            ..Default::default()
        }
    }

    fn on_action(&self) -> InteractionResult {
        InteractionResult {
            success: true,
            triggers_dialogue: true,
            ..Default::default()
        }
    }

    fn spawn_attributes(&self, _rng: &mut dyn RngCore) -> SpawnAttributes {
        SpawnAttributes {
            size: AALTO_BUILDING_SIZE,
            discovered: Some(false),
            ..Default::default()
        }
    }

    fn render_info(&self, _cell: &Cell) -> RenderInfo {
        RenderInfo {
            color: "#8B4513",
            priority: 6,
            image_asset: Some("aalto_building"),
            fallback: FallbackShape::Disc { scale: 0.25 },
        }
    }
}

impl CellBehavior for AaltoStoolBehavior {
    fn variant(&self) -> CellVariant {
        CellVariant::AaltoStool
    }

    fn can_interact(&self) -> bool {
        true
    }

    fn on_enter(&self) -> InteractionResult {
        InteractionResult {
            success: true,
            message: Some(format!(
                "You tripped on the three-legged stool! {} health.",
                STOOL_DAMAGE
            )),
            health_change: Some(STOOL_DAMAGE),
            ..Default::default()
        }
    }

    fn render_info(&self, _cell: &Cell) -> RenderInfo {
        RenderInfo {
            color: "#D2B48C",
            priority: 4,
            image_asset: Some("aalto_stool"),
            fallback: FallbackShape::Stool { scale: 0.5 },
        }
    }
}
