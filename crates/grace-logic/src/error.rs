//! Error types.
//!
//! Only configuration and registry defects are errors. Blocked moves and
//! failed plant consumption are ordinary outcomes, see [`crate::gameplay`].

use crate::cells::CellVariant;

/// Registry lookup and update failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Requested variant has no registry entry. Fatal: the registry is
    /// misconfigured, retrying cannot help.
    #[error("unknown cell variant: {0}")]
    UnknownVariant(CellVariant),

    #[error("cell variant {0} has no spawn config to update")]
    NoSpawnConfig(CellVariant),

    #[error("invalid spawn weight {weight} for {variant}")]
    InvalidWeight { variant: CellVariant, weight: f64 },

    #[error("spawn chance {chance} for {variant} must be within [0, 1]")]
    InvalidChance { variant: CellVariant, chance: f64 },
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("world size must be positive, got {0}")]
    InvalidWorldSize(i32),

    #[error("chunk size must be positive, got {0}")]
    InvalidChunkSize(i32),

    #[error("chunk radius must be positive, got {0}")]
    InvalidChunkRadius(i32),

    /// Neighboring chunk boxes would overlap.
    #[error("chunk radius {radius} overlaps neighbors at chunk size {chunk_size}")]
    OverlappingChunks { radius: i32, chunk_size: i32 },

    #[error("safe zone radius must not be negative, got {0}")]
    InvalidSafeZone(i32),

    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("artery range {min}..={max} is empty or zero")]
    InvalidArteryRange { min: u32, max: u32 },

    #[error("max health must be positive")]
    ZeroMaxHealth,

    #[error("start health {start} exceeds max health {max}")]
    StartHealthTooHigh { start: i32, max: i32 },

    #[error("step attrition must not be negative, got {0}")]
    InvalidAttrition(i32),

    #[error("chunk preload radius must not be negative, got {0}")]
    InvalidPreloadRadius(i32),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Top-level error for fallible core operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Several validation failures reported at once.
    #[error("invalid configuration ({} problems): {}", .0.len(), join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
