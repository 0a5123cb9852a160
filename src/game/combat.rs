//! Combat Resolver
//!
//! Maps projectile contacts to damage. A projectile is single-use: the first
//! contact it reports, whatever it touched, consumes it. Targets that can be
//! hurt implement [`Damageable`] and guard their own death effect so that a
//! second hit in the same step (another projectile, or the same projectile
//! touching twice) cannot run it again.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, to_fixed};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef, StepContext};
use crate::physics::BodyHandle;

/// Projectile categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Basic projectile: thrown instantly, unlimited
    Rock,
    /// Special projectile: charged, consumes ammo
    Nubella,
}

impl ProjectileKind {
    /// Hit-units dealt on contact (special = 2x basic).
    pub fn hit_units(self) -> i32 {
        match self {
            ProjectileKind::Rock => 1,
            ProjectileKind::Nubella => 2,
        }
    }

    /// Collision box half extents.
    pub fn half_extents(self) -> FixedVec2 {
        match self {
            ProjectileKind::Rock => FixedVec2::new(to_fixed(0.5), to_fixed(0.5)),
            ProjectileKind::Nubella => FixedVec2::new(to_fixed(0.6), to_fixed(0.6)),
        }
    }

    /// Stable tag for hashing.
    pub fn tag(self) -> u8 {
        match self {
            ProjectileKind::Rock => 0,
            ProjectileKind::Nubella => 1,
        }
    }
}

/// A projectile in flight.
#[derive(Clone, Debug)]
pub struct Projectile {
    id: EntityId,
    body: BodyHandle,
    kind: ProjectileKind,
    power: Fixed,
    fired_at: u32,
    spent: bool,
}

impl Projectile {
    /// New projectile launched on tick `fired_at`.
    pub fn new(id: EntityId, body: BodyHandle, kind: ProjectileKind, power: Fixed, fired_at: u32) -> Self {
        Self { id, body, kind, power, fired_at, spent: false }
    }

    /// Registry id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Category.
    pub fn kind(&self) -> ProjectileKind {
        self.kind
    }

    /// Launch power (horizontal speed magnitude).
    pub fn power(&self) -> Fixed {
        self.power
    }

    /// Ticks in flight as of `tick`.
    pub fn age(&self, tick: u32) -> u32 {
        tick.saturating_sub(self.fired_at)
    }

    /// Whether a contact already consumed it.
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.kind.tag());
        hasher.update_fixed(self.power);
        hasher.update_u32(self.fired_at);
        hasher.update_bool(self.spent);
    }
}

/// Result of a projectile landing on a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    /// Projectile consumed without effect (terrain, dead target, already spent)
    Ignored,
    /// Target absorbed the hit
    Damaged {
        /// Hit-units left (never negative)
        remaining: i32,
    },
    /// Target died and ran its death effect
    Killed,
    /// Target was reduced to zero and fled instead of dying
    Fleeing,
}

/// Something projectiles can hurt.
pub trait Damageable {
    /// Apply one projectile hit.
    fn apply_hit(&mut self, kind: ProjectileKind, ctx: &mut StepContext<'_>) -> HitOutcome;
}

/// Resolve a projectile contact against an optional damageable target.
///
/// The projectile is always despawned on its first contact.
pub fn resolve_projectile_hit(
    projectile: &mut Projectile,
    target: Option<&mut dyn Damageable>,
    ctx: &mut StepContext<'_>,
) -> HitOutcome {
    if projectile.spent {
        return HitOutcome::Ignored;
    }
    projectile.spent = true;
    consume(projectile, ctx.fx);

    let outcome = match target {
        Some(target) => target.apply_hit(projectile.kind, ctx),
        None => HitOutcome::Ignored,
    };
    debug!(projectile = %projectile.id, kind = ?projectile.kind, ?outcome, "projectile contact");
    outcome
}

fn consume(projectile: &Projectile, fx: &mut Effects) {
    fx.despawn(EntityRef::Projectile(projectile.id));
}
