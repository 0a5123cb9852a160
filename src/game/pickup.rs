//! Collectibles.
//!
//! Pickups are sensor bodies. The first time the player enters one, the
//! matching inventory counter goes up by one and the pickup removes itself.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::audio::SoundCue;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef};
use crate::game::events::GameEventData;
use crate::game::player::Player;
use crate::physics::BodyHandle;

/// Inventory item a pickup grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// Food: heals when eaten, stolen by thieves
    Food,
    /// Special projectile ammo
    SpecialAmmo,
    /// Shield charge
    Shield,
}

impl PickupKind {
    /// Stable tag for hashing.
    pub fn tag(self) -> u8 {
        match self {
            PickupKind::Food => 0,
            PickupKind::SpecialAmmo => 1,
            PickupKind::Shield => 2,
        }
    }
}

/// A collectible in the world.
#[derive(Clone, Debug)]
pub struct Pickup {
    id: EntityId,
    body: BodyHandle,
    kind: PickupKind,
    collected: bool,
}

impl Pickup {
    /// New uncollected pickup.
    pub fn new(id: EntityId, body: BodyHandle, kind: PickupKind) -> Self {
        Self { id, body, kind, collected: false }
    }

    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Item granted.
    pub fn kind(&self) -> PickupKind {
        self.kind
    }

    /// Player touched the sensor. Returns true if it was collected now.
    pub fn on_player_enter(&mut self, player: &mut Player, fx: &mut Effects) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        let total = player.pick_up(self.kind);
        fx.play(SoundCue::Pickup);
        fx.emit(GameEventData::PickupCollected { kind: self.kind, total });
        fx.despawn(EntityRef::Pickup(self.id));
        true
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher, position: FixedVec2) {
        hasher.update_u8(self.kind.tag());
        hasher.update_vec2(position);
        hasher.update_bool(self.collected);
    }
}
