//! Steal/retreat enemy.
//!
//! ```text
//!   Approach ──(480 ticks)──► Hiss ──(180 ticks)──► Approach
//!      │                        │
//!      └──── touches player ────┴──► Steal ──(pause)──► Retreat ──(150 ticks)──► Dead
//!   hit-units reach zero (any live state) ─────────────► Retreat
//! ```
//!
//! Steal and Retreat are terminal for the approach cycle. The thief never
//! dies on the spot from hits: it always runs away first.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::fixed::{Fixed, fixed_abs, TILT_LIMIT};
use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::audio::SoundCue;
use crate::game::combat::{Damageable, HitOutcome, ProjectileKind};
use crate::game::config::ThiefConfig;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef, StepContext, Steppable};
use crate::game::events::GameEventData;
use crate::game::player::Player;
use crate::game::timer::TaskAction;
use crate::physics::{BodyHandle, PhysicsWorld};

/// Behaviour states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThiefState {
    /// Walking toward the player
    Approach,
    /// Standing still, hissing
    Hiss,
    /// Eating stolen food
    Steal,
    /// Running away until expiry
    Retreat,
    /// Removed from the world
    Dead,
}

impl ThiefState {
    fn tag(self) -> u8 {
        self as u8
    }
}

/// Where a new thief appears relative to the player, and which way it faces.
pub fn spawn_point(
    player: FixedVec2,
    rng: &mut DeterministicRng,
    config: &ThiefConfig,
) -> (FixedVec2, bool) {
    let right_side = rng.next_bool();
    let dx = if right_side { config.spawn_offset.x } else { -config.spawn_offset.x };
    let position = player + FixedVec2::new(dx, config.spawn_offset.y);
    (position, !right_side)
}

/// A thief.
#[derive(Clone, Debug)]
pub struct Thief {
    id: EntityId,
    body: BodyHandle,
    config: ThiefConfig,
    state: ThiefState,
    hits_left: i32,
    facing_right: bool,
    approach_ticks: u32,
    hiss_ticks: u32,
    stuck_ticks: u32,
}

impl Thief {
    /// New thief in Approach.
    pub fn new(id: EntityId, body: BodyHandle, facing_right: bool, config: ThiefConfig) -> Self {
        Self {
            id,
            body,
            hits_left: config.max_hits,
            config,
            state: ThiefState::Approach,
            facing_right,
            approach_ticks: 0,
            hiss_ticks: 0,
            stuck_ticks: 0,
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

    /// Current state.
    pub fn state(&self) -> ThiefState {
        self.state
    }

    /// Hit-points left, never negative.
    pub fn remaining_hits(&self) -> i32 {
        self.hits_left.max(0)
    }

    /// Liveness flag for the UI.
    pub fn is_alive(&self) -> bool {
        self.state != ThiefState::Dead
    }

    /// Facing direction.
    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    fn owner(&self) -> EntityRef {
        EntityRef::Thief(self.id)
    }

    fn destroy(&mut self, reason: &'static str, fx: &mut Effects) {
        if self.state == ThiefState::Dead {
            return;
        }
        self.state = ThiefState::Dead;
        fx.despawn(self.owner());
        info!(thief = %self.id, reason, "thief removed");
    }

    /// Turn and run, scheduling expiry. Idempotent.
    pub fn flee(&mut self, physics: &mut dyn PhysicsWorld, fx: &mut Effects) {
        if matches!(self.state, ThiefState::Retreat | ThiefState::Dead) {
            return;
        }
        self.state = ThiefState::Retreat;
        physics.set_velocity(self.body, FixedVec2::new(self.retreat_vx(), 0));
        fx.schedule(self.owner(), self.config.retreat_ticks, TaskAction::ThiefExpire);
        fx.emit(GameEventData::ThiefRetreating { id: self.id });
        debug!(thief = %self.id, "retreating");
    }

    /// Retreat timer elapsed.
    pub fn expire(&mut self, fx: &mut Effects) {
        self.destroy("retreat finished", fx);
    }

    fn retreat_vx(&self) -> Fixed {
        if self.facing_right { -self.config.retreat_speed } else { self.config.retreat_speed }
    }

    /// The thief's body touched the player. Returns true if food was taken.
    pub fn on_player_contact(&mut self, player: &mut Player, fx: &mut Effects) -> bool {
        if !matches!(self.state, ThiefState::Approach | ThiefState::Hiss) {
            return false;
        }
        self.state = ThiefState::Steal;
        let food_left = player.lose_food();
        fx.play(SoundCue::NomNom);
        fx.emit(GameEventData::FoodStolen { id: self.id, food_left });
        fx.schedule(self.owner(), self.config.steal_pause_ticks, TaskAction::ThiefFlee);
        debug!(thief = %self.id, food_left, "stole food");
        true
    }

    fn approach(&mut self, position: FixedVec2, ctx: &mut StepContext<'_>) {
        self.approach_ticks += 1;
        if self.approach_ticks >= self.config.hiss_after_ticks {
            self.state = ThiefState::Hiss;
            self.approach_ticks = 0;
            self.hiss_ticks = 0;
            ctx.fx.play(SoundCue::Hiss);
            return;
        }

        let velocity = ctx.physics.velocity(self.body).unwrap_or_default();
        if let Some(target) = ctx.player.position {
            self.facing_right = target.x > position.x;
        }
        let speed = if self.facing_right { self.config.approach_speed } else { -self.config.approach_speed };
        ctx.physics.set_velocity(self.body, FixedVec2::new(speed, velocity.y));

        // Velocity observed here is what the last physics step left behind
        if fixed_abs(velocity.x) < self.config.stuck_speed {
            self.stuck_ticks += 1;
            if self.stuck_ticks >= self.config.stuck_limit_ticks {
                self.destroy("stuck", ctx.fx);
                return;
            }
            if self.stuck_ticks % self.config.stuck_impulse_ticks == 0 {
                let impulse = self.config.escape_impulse.facing(self.facing_right);
                ctx.physics.apply_impulse(self.body, impulse);
                debug!(thief = %self.id, stuck = self.stuck_ticks, "escape jump");
            }
        } else {
            self.stuck_ticks = 0;
        }
    }

    fn halt(&self, physics: &mut dyn PhysicsWorld) {
        let vy = physics.velocity(self.body).map_or(0, |v| v.y);
        physics.set_velocity(self.body, FixedVec2::new(0, vy));
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.state.tag());
        hasher.update_i32(self.hits_left);
        hasher.update_bool(self.facing_right);
        hasher.update_u32(self.approach_ticks);
        hasher.update_u32(self.hiss_ticks);
        hasher.update_u32(self.stuck_ticks);
    }
}

impl Steppable for Thief {
    fn pre_step(&mut self, ctx: &mut StepContext<'_>) {
        if self.state == ThiefState::Dead {
            return;
        }
        let Some(position) = ctx.physics.position(self.body) else {
            return;
        };
        if position.y < self.config.floor_y {
            self.destroy("fell", ctx.fx);
            return;
        }
        if let Some(target) = ctx.player.position {
            if !position.within(target, self.config.leash_distance) {
                self.destroy("too far", ctx.fx);
                return;
            }
        }
        if let Some(angle) = ctx.physics.angle(self.body) {
            if fixed_abs(angle) > TILT_LIMIT {
                ctx.physics.set_angle(self.body, 0);
            }
        }

        match self.state {
            ThiefState::Approach => self.approach(position, ctx),
            ThiefState::Hiss => {
                self.halt(ctx.physics);
                self.hiss_ticks += 1;
                if self.hiss_ticks >= self.config.hiss_ticks {
                    self.state = ThiefState::Approach;
                    self.hiss_ticks = 0;
                }
            }
            ThiefState::Steal => self.halt(ctx.physics),
            ThiefState::Retreat => {
                let vy = ctx.physics.velocity(self.body).map_or(0, |v| v.y);
                ctx.physics.set_velocity(self.body, FixedVec2::new(self.retreat_vx(), vy));
            }
            ThiefState::Dead => {}
        }
    }
}

impl Damageable for Thief {
    fn apply_hit(&mut self, kind: ProjectileKind, ctx: &mut StepContext<'_>) -> HitOutcome {
        if matches!(self.state, ThiefState::Retreat | ThiefState::Dead) {
            return HitOutcome::Ignored;
        }
        self.hits_left -= kind.hit_units();
        ctx.fx.play(SoundCue::ThiefHit);

        if self.hits_left > 0 {
            ctx.fx.emit(GameEventData::EnemyHit {
                enemy: self.owner(),
                remaining_hits: self.remaining_hits(),
            });
            return HitOutcome::Damaged { remaining: self.remaining_hits() };
        }
        self.flee(ctx.physics, ctx.fx);
        HitOutcome::Fleeing
    }
}
