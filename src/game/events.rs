//! Game Events
//!
//! Everything observable that happened during a tick, in the order it
//! happened. The UI, audio-free replays and tests consume these; the
//! simulation itself never reads them back.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::combat::ProjectileKind;
use crate::game::entity::{EntityId, EntityRef};
use crate::game::pickup::PickupKind;
use crate::game::spawn::GameOverCause;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Player launched a projectile
    ProjectileFired {
        projectile: EntityId,
        kind: ProjectileKind,
        /// Horizontal launch speed magnitude
        power: Fixed,
    },

    /// A projectile landed on an enemy that survived
    EnemyHit {
        enemy: EntityRef,
        remaining_hits: i32,
    },

    /// Patrol enemy lost its last hit-unit
    PigeonKilled {
        id: EntityId,
    },

    /// A pickup appeared in the world
    PickupDropped {
        kind: PickupKind,
        position: FixedVec2,
    },

    /// Player collected a pickup
    PickupCollected {
        kind: PickupKind,
        total: u32,
    },

    /// Player lost health
    PlayerDamaged {
        amount: i32,
        health: i32,
    },

    /// Player regained health
    PlayerHealed {
        amount: i32,
        health: i32,
    },

    /// A scratch landed on a destructible
    DestructibleDamaged {
        id: EntityId,
        remaining_hits: i32,
    },

    /// A destructible broke
    DestructibleBroken {
        id: EntityId,
    },

    /// Steal/retreat enemy entered the world
    ThiefSpawned {
        id: EntityId,
        position: FixedVec2,
    },

    /// Thief took one food
    FoodStolen {
        id: EntityId,
        food_left: u32,
    },

    /// Thief started running away
    ThiefRetreating {
        id: EntityId,
    },

    /// Entity left its registry and its body was freed
    EntityRemoved {
        entity: EntityRef,
    },

    /// Grace period before respawn started
    GameOver {
        cause: GameOverCause,
    },

    /// Player is back at the start position
    PlayerRespawned {
        cause: GameOverCause,
    },

    /// Laundry line let go of its rug
    RugDropped {
        line: EntityId,
        position: FixedVec2,
    },

    /// Player reached the exit
    LevelCompleted {
        level: u32,
    },
}

/// A game event stamped with its tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,
    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Entity removal.
    pub fn entity_removed(tick: u32, entity: EntityRef) -> Self {
        Self::new(tick, GameEventData::EntityRemoved { entity })
    }

    /// Pickup drop.
    pub fn pickup_dropped(tick: u32, kind: PickupKind, position: FixedVec2) -> Self {
        Self::new(tick, GameEventData::PickupDropped { kind, position })
    }
}
