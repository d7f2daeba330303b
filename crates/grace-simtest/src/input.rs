//! Key tables and a minimal input session.
//!
//! Maps browser-style key codes to movement directions or named actions and
//! applies them to a [`GameEngine`], the way an interactive front end would.

use grace_logic::cells::CellVariant;
use grace_logic::gameplay::{ConsumeOutcome, GameEngine, MoveOutcome};
use grace_logic::GraceError;

/// Radius searched by the find-building key.
const FIND_RADIUS: i32 = 60;

/// Key code -> index into the direction table (0 E, 1 NE, 2 NW, 3 W, 4 SW, 5 SE).
pub const MOVEMENT_KEYS: [(&str, usize); 14] = [
    ("ArrowUp", 2),
    ("ArrowDown", 5),
    ("ArrowLeft", 3),
    ("ArrowRight", 0),
    ("KeyW", 2),
    ("KeyS", 5),
    ("KeyA", 3),
    ("KeyD", 0),
    ("Numpad7", 3),
    ("Numpad8", 2),
    ("Numpad9", 1),
    ("Numpad1", 4),
    ("Numpad2", 5),
    ("Numpad3", 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ConsumePlant,
    InteractAalto,
    ToggleDebug,
    DebugPosition,
    ForcePlant,
    CleanupPlants,
    FindAalto,
}

pub const ACTION_KEYS: [(&str, Action); 7] = [
    ("Space", Action::ConsumePlant),
    ("Enter", Action::InteractAalto),
    ("KeyH", Action::ToggleDebug),
    ("KeyF", Action::DebugPosition),
    ("KeyG", Action::ForcePlant),
    ("KeyK", Action::CleanupPlants),
    ("KeyJ", Action::FindAalto),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(usize),
    Action(Action),
}

pub fn command_for_key(code: &str) -> Option<Command> {
    MOVEMENT_KEYS
        .iter()
        .find(|(key, _)| *key == code)
        .map(|&(_, dir)| Command::Move(dir))
        .or_else(|| {
            ACTION_KEYS
                .iter()
                .find(|(key, _)| *key == code)
                .map(|&(_, action)| Command::Action(action))
        })
}

/// Engine plus the front-end state the action keys toggle.
pub struct Session {
    pub engine: GameEngine,
    pub debug_visible: bool,
    pub dialogues: usize,
}

impl Session {
    pub fn new(engine: GameEngine) -> Self {
        Self {
            engine,
            debug_visible: false,
            dialogues: 0,
        }
    }

    /// Apply one key press. Returns a line describing what happened, or
    /// `None` for unmapped keys.
    pub fn press(&mut self, code: &str) -> Result<Option<String>, GraceError> {
        let Some(command) = command_for_key(code) else {
            return Ok(None);
        };
        let line = match command {
            Command::Move(dir) => match self.engine.move_player(dir)? {
                MoveOutcome::Blocked(reason) => format!("blocked: {:?}", reason),
                MoveOutcome::Moved(report) => {
                    if report.triggers_dialogue {
                        self.dialogues += 1;
                    }
                    match report.message {
                        Some(message) => format!("moved to {}: {}", report.to, message),
                        None => format!("moved to {}", report.to),
                    }
                }
            },
            Command::Action(action) => self.act(action)?,
        };
        log::debug!("{} -> {}", code, line);
        Ok(Some(line))
    }

    fn act(&mut self, action: Action) -> Result<String, GraceError> {
        let line = match action {
            Action::ConsumePlant => match self.engine.consume_plant_here()? {
                ConsumeOutcome::Consumed { message, .. } => {
                    message.unwrap_or_else(|| "consumed".to_string())
                }
                other => format!("nothing to eat: {:?}", other),
            },
            Action::InteractAalto => match self.engine.interact_with_building() {
                Some(hit) => {
                    if hit.triggers_dialogue {
                        self.dialogues += 1;
                    }
                    format!("talking to the architect at {}", hit.position)
                }
                None => "no building in reach".to_string(),
            },
            Action::ToggleDebug => {
                self.debug_visible = !self.debug_visible;
                format!("debug panel {}", if self.debug_visible { "on" } else { "off" })
            }
            Action::DebugPosition => {
                let pos = self.engine.player().position;
                match self.engine.debug_player_cell() {
                    Some(cell) => format!("at {} on {} ({})", pos, cell.variant, cell.id),
                    None => format!("at {} on empty ground", pos),
                }
            }
            Action::ForcePlant => {
                let pos = self.engine.player().position;
                let id = self.engine.world_mut().debug_spawn(CellVariant::Plant, pos)?;
                format!("forced plant {} at {}", id, pos)
            }
            // Plants never deplete, so there is nothing to clean up.
            Action::CleanupPlants => "no depleted plants".to_string(),
            Action::FindAalto => {
                let pos = self.engine.player().position;
                match self
                    .engine
                    .world()
                    .nearest_cell(pos, CellVariant::AaltoBuilding, FIND_RADIUS)
                {
                    Some(cell) => format!(
                        "nearest building at {} ({} steps)",
                        cell.position,
                        cell.position.distance(pos)
                    ),
                    None => "no building nearby".to_string(),
                }
            }
        };
        Ok(line)
    }
}
