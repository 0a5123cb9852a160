//! Entity identity and per-step context.
//!
//! The world owns every entity in a typed registry. Anything that needs to
//! refer to another entity (a scratch target, a scheduled task's owner, a
//! physics body's owner) holds an [`EntityRef`], never a borrow, and checks
//! that the target still exists before acting on it.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::effects::Effects;
use crate::physics::PhysicsWorld;

/// Monotonic entity identifier, unique within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names an entity together with the registry it lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// The player (there is exactly one)
    Player,
    /// Patrol/attack enemy
    Pigeon(EntityId),
    /// Steal/retreat enemy
    Thief(EntityId),
    /// Thrown projectile
    Projectile(EntityId),
    /// Scratchable object
    Destructible(EntityId),
    /// Collectible
    Pickup(EntityId),
    /// Moving platform
    Platform(EntityId),
    /// Ladder (two sensor bodies)
    Ladder(EntityId),
    /// Laundry line trigger
    Laundry(EntityId),
    /// Rolling bucket hazard
    Bucket(EntityId),
    /// Level exit
    Goal(EntityId),
    /// Static level geometry
    Terrain(EntityId),
}

impl EntityRef {
    /// Id inside the owning registry (`None` for the player).
    pub fn id(self) -> Option<EntityId> {
        match self {
            EntityRef::Player => None,
            EntityRef::Pigeon(id)
            | EntityRef::Thief(id)
            | EntityRef::Projectile(id)
            | EntityRef::Destructible(id)
            | EntityRef::Pickup(id)
            | EntityRef::Platform(id)
            | EntityRef::Ladder(id)
            | EntityRef::Laundry(id)
            | EntityRef::Bucket(id)
            | EntityRef::Goal(id)
            | EntityRef::Terrain(id) => Some(id),
        }
    }
}

/// Read-only snapshot of the player handed to other entities' hooks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerView {
    /// Body position, if the body exists
    pub position: Option<FixedVec2>,
    /// Whether a shield is raised
    pub shielding: bool,
    /// Health above zero
    pub alive: bool,
}

/// What a hook may touch while it runs.
pub struct StepContext<'a> {
    /// Current tick
    pub tick: u32,
    /// Physics solver
    pub physics: &'a mut dyn PhysicsWorld,
    /// Player snapshot taken before the phase started
    pub player: PlayerView,
    /// Deferred commands and events
    pub fx: &'a mut Effects,
}

/// Entities with a pre-step hook (AI decisions, timers, motion).
pub trait Steppable {
    /// Run once per tick before the physics step.
    fn pre_step(&mut self, ctx: &mut StepContext<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_id() {
        assert_eq!(EntityRef::Player.id(), None);
        assert_eq!(EntityRef::Thief(EntityId(4)).id(), Some(EntityId(4)));
        assert_eq!(EntityId(7).to_string(), "#7");
    }

    #[test]
    fn test_entity_refs_order_by_registry_then_id() {
        let mut refs = vec![
            EntityRef::Thief(EntityId(1)),
            EntityRef::Pigeon(EntityId(9)),
            EntityRef::Pigeon(EntityId(2)),
            EntityRef::Player,
        ];
        refs.sort();
        assert_eq!(
            refs,
            vec![
                EntityRef::Player,
                EntityRef::Pigeon(EntityId(2)),
                EntityRef::Pigeon(EntityId(9)),
                EntityRef::Thief(EntityId(1)),
            ]
        );
    }
}
