//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `config`: Tuning knobs, loadable from JSON
//! - `entity`: Entity ids, cross-references, the pre-step hook trait
//! - `effects`: Per-phase command buffer
//! - `timer`: Tick intervals, cooldowns and the world scheduler
//! - `player`: Player state machine and inventory
//! - `ability`: Charge-and-release special shot
//! - `combat`: Projectiles and the damage capability
//! - `destructible`: Melee targets
//! - `pickup`: Collectibles
//! - `pigeon`: Patrol/attack enemy
//! - `thief`: Steal/retreat enemy
//! - `platform`: Moving platform oscillator
//! - `props`: Ladders, laundry lines, rolling buckets, the level goal
//! - `spawn`: Thief spawn gate and game-over watch
//! - `world`: Entity registries and deferred mutation
//! - `tick`: Authoritative simulation loop
//! - `save`: Save record text format
//! - `audio`: Sound cues and sinks
//! - `events`: Game events for replay/verification

pub mod ability;
pub mod audio;
pub mod combat;
pub mod config;
pub mod destructible;
pub mod effects;
pub mod entity;
pub mod events;
pub mod pickup;
pub mod pigeon;
pub mod platform;
pub mod player;
pub mod props;
pub mod save;
pub mod spawn;
pub mod thief;
pub mod tick;
pub mod timer;
pub mod world;

// Re-export key types
pub use config::{ConfigError, SimConfig};
pub use entity::{EntityId, EntityRef};
pub use events::{GameEvent, GameEventData};
pub use player::{Player, PlayerState};
pub use save::{SaveData, SaveError};
pub use tick::{tick, replay, PlayerCommand, TickResult};
pub use world::{Carryover, World, WorldBuilder};
