//! Patrol/attack enemy.
//!
//! Flies back and forth at a constant speed, flipping direction on a fixed
//! interval. Every attack-check interval it either dives at the player (when
//! in range and off cooldown) or goes back to patrolling. Touching the
//! player deals contact damage and starts a cooldown during which it cannot
//! attack or hurt again.

use tracing::{debug, info};

use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::audio::SoundCue;
use crate::game::combat::{Damageable, HitOutcome, ProjectileKind};
use crate::game::config::PigeonConfig;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef, StepContext, Steppable};
use crate::game::events::GameEventData;
use crate::game::pickup::PickupKind;
use crate::game::player::Player;
use crate::game::timer::{Cooldown, Interval};
use crate::physics::BodyHandle;

/// Observable behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PigeonState {
    /// Back-and-forth flight
    Patrol,
    /// Diving at the player
    Attacking,
    /// Recovering after a contact hit
    Cooldown,
}

/// A pigeon.
#[derive(Clone, Debug)]
pub struct Pigeon {
    id: EntityId,
    body: BodyHandle,
    config: PigeonConfig,
    hits_left: i32,
    moving_right: bool,
    attacking: bool,
    cooldown: Cooldown,
    flip: Interval,
    attack_check: Interval,
    destroyed: bool,
}

impl Pigeon {
    /// New pigeon patrolling to the right.
    pub fn new(id: EntityId, body: BodyHandle, config: PigeonConfig) -> Self {
        Self {
            id,
            body,
            hits_left: config.max_hits,
            moving_right: true,
            attacking: false,
            cooldown: Cooldown::default(),
            flip: Interval::new(config.flip_ticks),
            attack_check: Interval::new(config.attack_check_ticks),
            destroyed: false,
            config,
        }
    }

    /// Registry id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Hit-units left, never negative.
    pub fn remaining_hits(&self) -> i32 {
        self.hits_left.max(0)
    }

    /// Liveness flag for the UI.
    pub fn is_alive(&self) -> bool {
        !self.destroyed
    }

    /// Whether the cooldown lockout is running.
    pub fn on_cooldown(&self) -> bool {
        self.cooldown.is_active()
    }

    /// Current behaviour.
    pub fn state(&self) -> PigeonState {
        if self.attacking {
            PigeonState::Attacking
        } else if self.cooldown.is_active() {
            PigeonState::Cooldown
        } else {
            PigeonState::Patrol
        }
    }

    /// Patrol direction.
    pub fn moving_right(&self) -> bool {
        self.moving_right
    }

    fn patrol_velocity(&self) -> FixedVec2 {
        let speed = if self.moving_right { self.config.patrol_speed } else { -self.config.patrol_speed };
        FixedVec2::new(speed, 0)
    }

    fn check_attack(&mut self, ctx: &mut StepContext<'_>) {
        if self.cooldown.is_active() {
            self.attacking = false;
            return;
        }
        let own = ctx.physics.position(self.body);
        match (own, ctx.player.position) {
            (Some(own), Some(target)) if ctx.player.alive && own.distance(target) < self.config.attack_range => {
                if !self.attacking {
                    debug!(pigeon = %self.id, "attacking");
                }
                self.attacking = true;
                let aim = (target - own).normalize().scale(self.config.attack_speed);
                ctx.physics.set_velocity(self.body, aim);
            }
            _ => self.attacking = false,
        }
    }

    /// The pigeon's body touched the player.
    ///
    /// Returns true if contact damage was dealt.
    pub fn on_player_contact(&mut self, player: &mut Player, fx: &mut Effects) -> bool {
        if self.destroyed || self.cooldown.is_active() {
            return false;
        }
        player.take_damage(self.config.contact_damage, fx);
        fx.play(SoundCue::Hiss);
        self.cooldown.arm(self.config.cooldown_ticks);
        self.attacking = false;
        debug!(pigeon = %self.id, "contact hit, cooling down");
        true
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_i32(self.hits_left);
        hasher.update_bool(self.moving_right);
        hasher.update_bool(self.attacking);
        hasher.update_u32(self.cooldown.remaining());
        hasher.update_u32(self.flip.elapsed());
        hasher.update_u32(self.attack_check.elapsed());
        hasher.update_bool(self.destroyed);
    }
}

impl Steppable for Pigeon {
    fn pre_step(&mut self, ctx: &mut StepContext<'_>) {
        if self.destroyed {
            return;
        }
        self.cooldown.tick();

        if self.flip.tick() && !self.attacking {
            self.moving_right = !self.moving_right;
        }
        if self.attack_check.tick() {
            self.check_attack(ctx);
        }
        if !self.attacking {
            ctx.physics.set_velocity(self.body, self.patrol_velocity());
        }
    }
}

impl Damageable for Pigeon {
    fn apply_hit(&mut self, kind: ProjectileKind, ctx: &mut StepContext<'_>) -> HitOutcome {
        if self.destroyed {
            return HitOutcome::Ignored;
        }
        self.hits_left -= kind.hit_units();
        ctx.fx.play(SoundCue::PigeonHit);

        if self.hits_left > 0 {
            ctx.fx.emit(GameEventData::EnemyHit {
                enemy: EntityRef::Pigeon(self.id),
                remaining_hits: self.remaining_hits(),
            });
            return HitOutcome::Damaged { remaining: self.remaining_hits() };
        }

        self.destroyed = true;
        if let Some(position) = ctx.physics.position(self.body) {
            ctx.fx.spawn_pickup(PickupKind::Food, position);
        }
        ctx.fx.emit(GameEventData::PigeonKilled { id: self.id });
        ctx.fx.despawn(EntityRef::Pigeon(self.id));
        info!(pigeon = %self.id, "pigeon killed");
        HitOutcome::Killed
    }
}
