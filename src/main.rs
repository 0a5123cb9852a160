//! Souq Cat Simulation
//!
//! Headless runner: builds a demo level, drives it with a scripted command
//! stream, then replays the same stream to check the state hash matches.
//!
//! Usage: `souq-cat-sim [config.json]`

use std::fs;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use souq_cat::{
    FixedNum, FixedVec2, TICK_RATE, VERSION,
    core::fixed::{to_fixed, FIXED_ONE},
    game::{
        config::SimConfig,
        events::GameEventData,
        pickup::PickupKind,
        platform::Axis,
        tick::{replay, tick, PlayerCommand},
        world::{World, WorldBuilder},
    },
};

/// Demo length (60 seconds).
const DEMO_TICKS: u32 = 3600;

/// Demo level number; thieves only appear from level 2.
const DEMO_LEVEL: u32 = 2;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Souq Cat Simulation v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = load_config()?;
    demo_level(config)
}

/// Config from the first argument, or the shipped defaults.
fn load_config() -> Result<SimConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("using default config");
        return Ok(SimConfig::default());
    };
    let json = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    let config = SimConfig::from_json(&json).with_context(|| format!("loading config {path}"))?;
    info!(%path, seed = config.world.seed, "config loaded");
    Ok(config)
}

/// Lay out the demo level.
fn build_level(config: SimConfig) -> World {
    let mut world = WorldBuilder::new(config).level(DEMO_LEVEL).build();

    // Street, a gap, then the market roof
    world.add_terrain(FixedVec2::from_ints(0, -15), FixedVec2::from_ints(30, 1));
    world.add_terrain(FixedVec2::from_ints(60, -15), FixedVec2::from_ints(20, 1));

    world.add_platform(
        Axis::Horizontal,
        FixedVec2::from_ints(36, -12),
        FixedVec2::from_ints(3, 0),
        (FIXED_ONE * 32, FIXED_ONE * 38),
        None,
    );
    world.add_platform(
        Axis::Vertical,
        FixedVec2::from_ints(15, -8),
        FixedVec2::from_ints(2, 0),
        (FIXED_ONE * -10, FIXED_ONE * -4),
        Some(to_fixed(2.0)),
    );

    world.add_pigeon(FixedVec2::from_ints(2, -9));
    world.add_pigeon(FixedVec2::from_ints(50, -6));
    world.add_crate(FixedVec2::from_ints(-6, -13));
    world.add_pickup(PickupKind::Food, FixedVec2::from_ints(5, -13));
    world.add_pickup(PickupKind::Food, FixedVec2::from_ints(12, -13));
    world.add_ladder(FixedVec2::from_ints(20, -13), to_fixed(8.0));
    world.add_laundry(FixedVec2::from_ints(25, -6), FixedVec2::from_ints(27, -13));
    world.add_bucket(FixedVec2::from_ints(45, -11));
    world.add_goal(FixedVec2::from_ints(75, -12), FixedVec2::from_ints(1, 2));
    world
}

/// Scripted input: scratch the crate, charge a shot, walk right, eat.
fn commands_for(t: u32) -> Vec<PlayerCommand> {
    match t {
        1 => vec![PlayerCommand::Scratch],
        300 => vec![PlayerCommand::PressCharge],
        420 => vec![PlayerCommand::ReleaseCharge],
        480 => vec![PlayerCommand::WalkRight],
        t if t > 480 && t % 240 == 0 => vec![PlayerCommand::Jump, PlayerCommand::ThrowRock],
        t if t > 480 && t % 600 == 30 => vec![PlayerCommand::StopWalking, PlayerCommand::Eat],
        t if t > 480 && t % 600 == 120 => vec![PlayerCommand::WalkRight],
        _ => Vec::new(),
    }
}

/// Run the demo and verify it replays to the same hash.
fn demo_level(config: SimConfig) -> Result<()> {
    info!("=== Starting Demo Level ===");
    let mut world = build_level(config.clone());
    info!(level = world.level(), "running {} ticks", DEMO_TICKS);

    let mut total_events = 0;
    let mut last_report_tick = 0;

    for t in 1..=DEMO_TICKS {
        let result = tick(&mut world, &commands_for(t));
        total_events += result.events.len();

        // Report every 10 seconds
        if t - last_report_tick >= 600 {
            let (x, y) = world.player_position().map_or((0, 0), |p| (p.x, p.y));
            info!(
                "Tick {}: player at ({}, {}), health {}, food {}, {} events so far",
                t,
                FixedNum(x),
                FixedNum(y),
                world.health(),
                world.food(),
                total_events
            );
            last_report_tick = t;
        }

        // Log important events
        for event in &result.events {
            match &event.data {
                GameEventData::PigeonKilled { id } => info!("Pigeon {} killed", id),
                GameEventData::FoodStolen { food_left, .. } => info!("Food stolen, {} left", food_left),
                GameEventData::GameOver { cause } => warn!("Game over: {:?}", cause),
                GameEventData::PlayerRespawned { .. } => info!("Player respawned"),
                _ => {}
            }
        }

        if result.level_completed {
            info!("Level completed at tick {}", t);
            break;
        }
    }

    // Print final results
    info!("=== Level Results ===");
    let hash = world.state_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Total events: {}", total_events);
    println!("{}", world.save_data().to_text());

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let frames: Vec<Vec<PlayerCommand>> = (1..=world.tick()).map(commands_for).collect();
    let mut replay_world = build_level(config);
    replay(&mut replay_world, &frames);
    let replay_hash = replay_world.state_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: hashes differ");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
