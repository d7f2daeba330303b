//! Concrete Grace Headless Harness
//!
//! Generates worlds, drives the engine through scripted key presses and
//! checks the world and gameplay invariants. Runs entirely in-process: no
//! rendering, no audio, no input devices.
//!
//! Usage:
//!   cargo run -p grace-simtest
//!   cargo run -p grace-simtest -- --seed 7 --steps 2000 --verbose
//!   cargo run -p grace-simtest -- --config grace.json --json

mod input;

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use grace_logic::cells::{CellRegistry, CellVariant, SpawnConfigPatch};
use grace_logic::config::{validate_config, GameConfig, PlayerConfig};
use grace_logic::gameplay::{BlockReason, ConsumeOutcome, GameEngine, GameStatus, MoveOutcome};
use grace_logic::generation::pick_weighted_variant;
use grace_logic::hex::{self, HexCoord, DIRECTIONS};
use grace_logic::world::{ChunkId, WorldStore};
use grace_logic::GraceError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use input::Session;

/// Key script replayed by the session validators.
const KEY_SCRIPT: [&str; 20] = [
    "ArrowRight", "KeyD", "Numpad9", "ArrowUp", "Space", "KeyW", "Numpad7", "KeyA", "Enter",
    "Numpad1", "ArrowDown", "Numpad3", "KeyJ", "KeyF", "KeyG", "Space", "KeyK", "KeyH",
    "Numpad2", "KeyS",
];

#[derive(Debug, Parser)]
#[command(name = "grace-simtest", about = "Headless validation harness for Concrete Grace")]
struct Cli {
    /// World seed; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON game config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Key presses in the scripted session.
    #[arg(long, default_value_t = 500)]
    steps: usize,

    /// Print every result, not only failures.
    #[arg(short, long)]
    verbose: bool,

    /// Print the final session status as JSON.
    #[arg(long)]
    json: bool,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    match run(&cli, config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("fatal: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> Result<GameConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {}", path.display(), e))?;
            GameConfig::from_json(&json).map_err(|e| e.to_string())?
        }
        None => GameConfig::default(),
    };
    if cli.seed.is_some() {
        config.world.seed = cli.seed;
    }
    // Pin a seed so every validator sees the same world.
    if config.world.seed.is_none() {
        config.world.seed = Some(42);
    }
    Ok(config)
}

fn run(cli: &Cli, config: GameConfig) -> Result<bool, GraceError> {
    println!("=== Concrete Grace Harness ===\n");
    let verbose = cli.verbose;
    let mut results = Vec::new();

    // 1. Config and registry
    results.extend(validate_config_and_registry(&config)?);

    // 2. Chunk generation invariants
    results.extend(validate_generation(&config)?);

    // 3. Weighted fill distribution
    results.extend(validate_weighted_fill(&config)?);

    // 4. Movement and interaction rules
    results.extend(validate_gameplay(&config)?);

    // 5. Scripted key session
    let (session_results, status) = validate_session(&config, cli.steps)?;
    results.extend(session_results);

    // 6. Determinism
    results.extend(validate_determinism(&config, cli.steps)?);

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("\n{}", json),
            Err(e) => log::warn!("status not serializable: {}", e),
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    Ok(failed == 0)
}

fn world_seed(config: &GameConfig) -> u64 {
    config.world.seed.unwrap_or_default()
}

fn seeded_world(config: &GameConfig) -> Result<WorldStore, GraceError> {
    WorldStore::new(config.world.clone(), config.build_registry()?)
}

/// Engine over an empty world with no attrition and no auto-generation, for
/// hand-placed scenarios.
fn bare_engine(config: &GameConfig) -> Result<GameEngine, GraceError> {
    let mut engine = GameEngine::from_parts(
        seeded_world(config)?,
        PlayerConfig {
            step_attrition_chance: 0.0,
            ..config.player.clone()
        },
    )?;
    engine.set_auto_generate(false);
    Ok(engine)
}

// ── 1. Config & Registry ────────────────────────────────────────────────

fn validate_config_and_registry(config: &GameConfig) -> Result<Vec<TestResult>, GraceError> {
    println!("--- Config & Registry ---");
    let mut results = Vec::new();

    let errors = validate_config(config);
    results.push(TestResult::new(
        "config_valid",
        errors.is_empty(),
        if errors.is_empty() {
            "no validation errors".to_string()
        } else {
            format!("{:?}", errors)
        },
    ));

    let registry = config.build_registry()?;
    let spawnable = registry.spawnable_variants();
    results.push(TestResult::new(
        "registry_has_spawnables",
        !spawnable.is_empty(),
        format!("{:?}", spawnable),
    ));

    let specials = registry.special_spawn_variants();
    results.push(TestResult::new(
        "registry_special_spawns",
        specials.contains(&CellVariant::AaltoBuilding),
        format!("{:?}", specials),
    ));

    let mut world = seeded_world(config)?;
    let mut unconstructible = Vec::new();
    for (i, variant) in CellVariant::ALL.into_iter().enumerate() {
        if world.spawn_cell(variant, HexCoord::new(i as i32, 0)).is_err() {
            unconstructible.push(variant);
        }
    }
    results.push(TestResult::new(
        "registry_constructs_all_variants",
        unconstructible.is_empty(),
        format!("{} variants, {:?} failed", CellVariant::ALL.len(), unconstructible),
    ));

    let mut bare = WorldStore::new(config.world.clone(), CellRegistry::empty())?;
    let rejected = bare.spawn_cell(CellVariant::Plant, HexCoord::ORIGIN).is_err();
    results.push(TestResult::new(
        "registry_rejects_unknown_variant",
        rejected && bare.cell_count() == 0,
        "empty registry refuses construction",
    ));

    let failed_chunk = bare.ensure_chunk_generated(ChunkId::new(0, 0)).is_err();
    results.push(TestResult::new(
        "failed_chunk_not_marked",
        failed_chunk && !bare.is_chunk_generated(ChunkId::new(0, 0)) && bare.cell_count() == 0,
        "generation without plant/path entries leaves no trace",
    ));

    let mut tuned = config.build_registry()?;
    let bad_chance = tuned
        .update_spawn_config(
            CellVariant::AaltoBuilding,
            &SpawnConfigPatch {
                chance: Some(f64::NAN),
                ..Default::default()
            },
        )
        .is_err();
    results.push(TestResult::new(
        "spawn_chance_validated",
        bad_chance,
        "NaN spawn chance refused",
    ));

    Ok(results)
}

// ── 2. Generation ───────────────────────────────────────────────────────

fn validate_generation(config: &GameConfig) -> Result<Vec<TestResult>, GraceError> {
    println!("--- Chunk Generation ---");
    let mut results = Vec::new();
    let mut world = seeded_world(config)?;
    let radius = world.config().chunk_radius;
    let safe = world.config().safe_zone_radius;

    let generated = world.ensure_chunks_around(HexCoord::ORIGIN, 1)?;
    results.push(TestResult::new(
        "generate_3x3",
        generated == 9,
        format!("{} chunks, {} cells", generated, world.cell_count()),
    ));

    let before = world.cell_count();
    let again = world.ensure_chunks_around(HexCoord::ORIGIN, 1)?;
    results.push(TestResult::new(
        "generation_idempotent",
        again == 0 && world.cell_count() == before,
        format!("{} regenerated, {} -> {} cells", again, before, world.cell_count()),
    ));

    let mut blocked = Vec::new();
    let mut over_cap = Vec::new();
    for q in -1..=1 {
        for r in -1..=1 {
            let chunk = ChunkId::new(q, r);
            let center = world.chunk_center(chunk);
            for ring in 0..=safe {
                blocked.extend(hex::ring(center, ring).into_iter().filter(|&c| world.is_blocked(c)));
            }
            for variant in world.registry().special_spawn_variants() {
                let cap = world
                    .registry()
                    .spawn_config(variant)
                    .map_or(0, |c| c.max_per_chunk as usize);
                let count = world
                    .cells_in_radius(center, radius)
                    .into_iter()
                    .filter(|c| c.variant == variant)
                    .count();
                if count > cap {
                    over_cap.push((chunk, variant, count));
                }
            }
        }
    }
    results.push(TestResult::new(
        "safe_zone_walkable",
        blocked.is_empty(),
        format!("{} blocked coordinates within distance {}", blocked.len(), safe),
    ));
    results.push(TestResult::new(
        "special_spawn_cap",
        over_cap.is_empty(),
        format!("{:?}", over_cap),
    ));

    let chunk = ChunkId::new(0, 0);
    let report = world.force_regenerate_chunk(chunk)?;
    results.push(TestResult::new(
        "force_regenerate",
        world.is_chunk_generated(chunk) && report.cells_placed > 0,
        format!("{} cells placed", report.cells_placed),
    ));

    let fresh = ChunkId::new(5, -5);
    let report = world.force_regenerate_chunk(fresh)?;
    results.push(TestResult::new(
        "force_regenerate_fresh_chunk",
        world.is_chunk_generated(fresh),
        format!("{} arteries", report.arteries),
    ));

    Ok(results)
}

// ── 3. Weighted Fill ────────────────────────────────────────────────────

fn validate_weighted_fill(config: &GameConfig) -> Result<Vec<TestResult>, GraceError> {
    println!("--- Weighted Fill ---");
    let registry = config.build_registry()?;
    let mut rng = StdRng::seed_from_u64(world_seed(config));
    let trials = 50_000;

    let mut counts: HashMap<CellVariant, usize> = HashMap::new();
    for _ in 0..trials {
        if let Some(v) = pick_weighted_variant(&registry, 1.0, &mut rng) {
            *counts.entry(v).or_default() += 1;
        }
    }

    let total: f64 = registry
        .spawnable_variants()
        .into_iter()
        .map(|v| registry.weight(v))
        .sum();
    let mut results = Vec::new();
    for variant in registry.spawnable_variants() {
        let expected = registry.weight(variant) / total;
        let observed = counts.get(&variant).copied().unwrap_or(0) as f64 / trials as f64;
        results.push(TestResult::new(
            &format!("weight_ratio_{}", variant),
            (observed - expected).abs() < 0.015,
            format!("observed {:.4}, expected {:.4}", observed, expected),
        ));
    }
    Ok(results)
}

// ── 4. Gameplay ─────────────────────────────────────────────────────────

fn validate_gameplay(config: &GameConfig) -> Result<Vec<TestResult>, GraceError> {
    println!("--- Gameplay ---");
    let mut results = Vec::new();

    // End-to-end: fresh chunk, step east.
    let mut engine = GameEngine::new(config.clone())?;
    engine.world_mut().ensure_chunk_generated(ChunkId::new(0, 0))?;
    let origin_clear = !engine.world().is_blocked(HexCoord::ORIGIN);
    let east_blocked = engine.world().is_blocked(HexCoord::new(1, 0));
    let outcome = engine.move_player(0)?;
    let expected = if east_blocked {
        HexCoord::ORIGIN
    } else {
        HexCoord::new(1, 0)
    };
    results.push(TestResult::new(
        "first_step_east",
        origin_clear && engine.player().position == expected && outcome.is_moved() != east_blocked,
        format!("{:?} -> {}", outcome, engine.player().position),
    ));

    // Obstacles in every direction.
    let mut engine = bare_engine(config)?;
    for d in DIRECTIONS {
        engine.world_mut().spawn_cell(CellVariant::Brutalist, d)?;
    }
    let mut all_blocked = true;
    for dir in 0..DIRECTIONS.len() {
        all_blocked &= engine.move_player(dir)?
            == MoveOutcome::Blocked(BlockReason::Obstacle(CellVariant::Brutalist));
    }
    results.push(TestResult::new(
        "brutalist_blocks",
        all_blocked && engine.player().position == HexCoord::ORIGIN,
        "surrounded player cannot move",
    ));

    // Plant lifecycle.
    let mut engine = bare_engine(config)?;
    engine.player_mut().health = engine.player().max_health - 5;
    let at = HexCoord::new(2, 0);
    engine.world_mut().spawn_cell(CellVariant::Plant, at)?;
    let first = engine.consume_plant(at)?;
    let second = engine.consume_plant(at)?;
    let ruined = engine
        .world()
        .cell_at(at)
        .is_some_and(|c| c.variant == CellVariant::Ruined);
    results.push(TestResult::new(
        "plant_lifecycle",
        first.is_consumed()
            && second == ConsumeOutcome::NotAPlant(CellVariant::Ruined)
            && ruined
            && engine.player().plants_eaten == 1
            && engine.player().health == engine.player().max_health,
        format!("{:?}, then {:?}", first, second),
    ));

    // Discovery.
    let mut engine = bare_engine(config)?;
    engine
        .world_mut()
        .spawn_cell(CellVariant::AaltoBuilding, HexCoord::new(1, 0))?;
    for _ in 0..3 {
        engine.move_player(0)?;
        engine.move_player(3)?;
    }
    engine.interact_with_building();
    results.push(TestResult::new(
        "discovery_idempotent",
        engine.player().discovered_buildings.len() == 1,
        format!("{} discovered", engine.player().discovered_buildings.len()),
    ));

    // Lethal stool.
    let mut engine = bare_engine(config)?;
    engine.player_mut().health = 3;
    engine
        .world_mut()
        .spawn_cell(CellVariant::AaltoStool, HexCoord::new(0, 1))?;
    let outcome = engine.move_player(5)?;
    results.push(TestResult::new(
        "stool_collapse",
        engine.player().health == 0 && engine.player().position == HexCoord::new(0, 1),
        format!("{:?}", outcome.message()),
    ));

    Ok(results)
}

// ── 5. Scripted Session ─────────────────────────────────────────────────

fn run_script(config: &GameConfig, steps: usize) -> Result<(Session, Vec<String>), GraceError> {
    let mut engine = GameEngine::new(config.clone())?;
    engine.init_world()?;
    let mut session = Session::new(engine);
    let mut violations = Vec::new();
    let bound = config.world.world_size;

    let mut last_plants = 0;
    let mut last_discovered = 0;
    for (i, key) in KEY_SCRIPT.iter().cycle().take(steps).enumerate() {
        session.press(key)?;
        let player = session.engine.player();
        if !(0..=player.max_health).contains(&player.health) {
            violations.push(format!("step {}: health {}", i, player.health));
        }
        if player.position.q.abs() > bound || player.position.r.abs() > bound {
            violations.push(format!("step {}: out of bounds {}", i, player.position));
        }
        if player.plants_eaten < last_plants {
            violations.push(format!("step {}: plants_eaten decreased", i));
        }
        if player.discovered_buildings.len() < last_discovered {
            violations.push(format!("step {}: discoveries decreased", i));
        }
        last_plants = player.plants_eaten;
        last_discovered = player.discovered_buildings.len();
    }
    Ok((session, violations))
}

fn validate_session(
    config: &GameConfig,
    steps: usize,
) -> Result<(Vec<TestResult>, GameStatus), GraceError> {
    println!("--- Scripted Session ---");
    let (session, violations) = run_script(config, steps)?;
    let status = session.engine.status();

    let results = vec![
        TestResult::new(
            "session_invariants",
            violations.is_empty(),
            if violations.is_empty() {
                format!("{} key presses clean", steps)
            } else {
                violations.join("; ")
            },
        ),
        TestResult::new(
            "session_generated_chunks",
            status.generated_chunks >= 25,
            format!(
                "{} chunks, {} cells, {} dialogues",
                status.generated_chunks, status.cells, session.dialogues
            ),
        ),
    ];
    Ok((results, status))
}

// ── 6. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(config: &GameConfig, steps: usize) -> Result<Vec<TestResult>, GraceError> {
    println!("--- Determinism ---");
    let (a, _) = run_script(config, steps)?;
    let (b, _) = run_script(config, steps)?;
    let (sa, sb) = (a.engine.status(), b.engine.status());
    Ok(vec![TestResult::new(
        "same_seed_same_run",
        sa == sb,
        format!("seed {}: {:?}", sa.seed, sa.position),
    )])
}
