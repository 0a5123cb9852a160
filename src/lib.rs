//! # Souq Cat Simulation
//!
//! Deterministic fixed-step entity simulation for the Souq Cat platformer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SOUQ CAT SIMULATION                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  physics/        - Rigid-body solver boundary                │
//! │  ├── mod.rs      - PhysicsWorld trait, bodies, contacts      │
//! │  └── kinematic.rs- Reference AABB solver                     │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── world.rs    - Registries and deferred mutation          │
//! │  ├── tick.rs     - Authoritative simulation loop             │
//! │  ├── player.rs   - Player state machine                      │
//! │  ├── pigeon.rs   - Patrol/attack enemy                       │
//! │  ├── thief.rs    - Steal/retreat enemy                       │
//! │  ├── combat.rs   - Projectiles and damage                    │
//! │  ├── ability.rs  - Charge-and-release shot                   │
//! │  ├── platform.rs - Moving platform oscillator                │
//! │  ├── props.rs    - Ladders, laundry, buckets, goal           │
//! │  ├── spawn.rs    - Thief spawn gate, game-over watch         │
//! │  └── save.rs     - Save record text format                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `physics/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies (the save timestamp is presentation only)
//! - All randomness from seeded Xorshift128+
//!
//! Given an identical level, seed and command stream, the simulation
//! produces **identical state hashes** on every run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod physics;

// Re-export commonly used types
pub use core::fixed::{Fixed, FixedNum, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::config::SimConfig;
pub use game::tick::{tick, PlayerCommand, TickResult};
pub use game::world::{World, WorldBuilder};
pub use physics::{KinematicWorld, PhysicsWorld};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
