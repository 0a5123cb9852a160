//! Destructible capability.
//!
//! Anything implementing [`Destructible`] can be registered with the world
//! and becomes a valid melee target. Reaching zero health triggers the
//! implementation's break effect exactly once.

use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::audio::SoundCue;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef};
use crate::game::events::GameEventData;
use crate::game::pickup::PickupKind;
use crate::physics::BodyHandle;

/// Hit-units a cardboard crate absorbs.
pub const CRATE_MAX_HITS: i32 = 8;

/// Something that absorbs melee hits.
pub trait Destructible {
    /// Take one hit-unit. Side effects go through `fx`.
    fn take_damage(&mut self, fx: &mut Effects);

    /// Remaining hit-units (never below zero).
    fn health(&self) -> i32;

    /// World position.
    fn position(&self) -> FixedVec2;

    /// Physics body, for liveness checks.
    fn body(&self) -> BodyHandle;

    /// Whether the break effect already ran.
    fn is_destroyed(&self) -> bool;

    /// Feed identifying state into a state hash.
    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_i32(self.health());
        hasher.update_vec2(self.position());
        hasher.update_bool(self.is_destroyed());
    }
}

/// Breakable crate that drops special ammo.
#[derive(Clone, Debug)]
pub struct CardboardBox {
    id: EntityId,
    body: BodyHandle,
    position: FixedVec2,
    hits_left: i32,
    destroyed: bool,
}

impl CardboardBox {
    /// New intact crate.
    pub fn new(id: EntityId, body: BodyHandle, position: FixedVec2) -> Self {
        Self {
            id,
            body,
            position,
            hits_left: CRATE_MAX_HITS,
            destroyed: false,
        }
    }

    fn break_open(&mut self, fx: &mut Effects) {
        self.destroyed = true;
        fx.spawn_pickup(PickupKind::SpecialAmmo, self.position);
        fx.play(SoundCue::BoxBreak);
        fx.emit(GameEventData::DestructibleBroken { id: self.id });
        fx.despawn(EntityRef::Destructible(self.id));
    }
}

impl Destructible for CardboardBox {
    fn take_damage(&mut self, fx: &mut Effects) {
        if self.destroyed {
            return;
        }
        self.hits_left -= 1;
        fx.emit(GameEventData::DestructibleDamaged {
            id: self.id,
            remaining_hits: self.health(),
        });
        if self.hits_left <= 0 {
            self.break_open(fx);
        }
    }

    fn health(&self) -> i32 {
        self.hits_left.max(0)
    }

    fn position(&self) -> FixedVec2 {
        self.position
    }

    fn body(&self) -> BodyHandle {
        self.body
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
