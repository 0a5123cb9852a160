//! Level props: ladders, laundry lines, rolling buckets and the exit.
//!
//! Props are authored with the level and react to the player through sensor
//! or collision contacts. Delayed reactions (rug drop, bucket expiry) go
//! through the world scheduler so removal cancels them.

use tracing::{debug, info};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::audio::SoundCue;
use crate::game::combat::{Damageable, HitOutcome, ProjectileKind};
use crate::game::config::HazardConfig;
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef, StepContext, Steppable};
use crate::game::events::GameEventData;
use crate::game::player::Player;
use crate::game::timer::{Interval, TaskAction};
use crate::physics::{BodyHandle, PhysicsWorld};

// =============================================================================
// Ladder
// =============================================================================

/// Two sensors; touching one end moves the player to the other.
#[derive(Clone, Debug)]
pub struct Ladder {
    id: EntityId,
    bottom: BodyHandle,
    top: BodyHandle,
    bottom_position: FixedVec2,
    top_position: FixedVec2,
    reach: Fixed,
    exit_offset: FixedVec2,
}

impl Ladder {
    /// New ladder from its two sensor bodies.
    pub fn new(
        id: EntityId,
        (bottom, bottom_position): (BodyHandle, FixedVec2),
        (top, top_position): (BodyHandle, FixedVec2),
        config: &HazardConfig,
    ) -> Self {
        Self {
            id,
            bottom,
            top,
            bottom_position,
            top_position,
            reach: config.ladder_reach,
            exit_offset: config.ladder_exit_offset,
        }
    }

    /// Both sensor bodies.
    pub fn bodies(&self) -> [BodyHandle; 2] {
        [self.bottom, self.top]
    }

    /// Player entered one of the sensors. Returns true if it teleported.
    pub fn on_player_enter(&self, player: &mut Player, physics: &mut dyn PhysicsWorld) -> bool {
        if player.is_teleporting() {
            return false;
        }
        let Some(position) = physics.position(player.body()) else {
            return false;
        };
        let target = if position.distance(self.bottom_position) < self.reach {
            self.top_position
        } else if position.distance(self.top_position) < self.reach {
            self.bottom_position
        } else {
            return false;
        };
        physics.set_position(player.body(), target + self.exit_offset);
        player.set_teleporting(true);
        debug!(ladder = %self.id, "player climbed");
        true
    }

    /// Player left a sensor.
    pub fn on_player_exit(&self, player: &mut Player) {
        player.set_teleporting(false);
    }
}

// =============================================================================
// Laundry line
// =============================================================================

/// Sensor that drops a rug pickup some time after the player first passes.
#[derive(Clone, Debug)]
pub struct LaundryLine {
    id: EntityId,
    body: BodyHandle,
    drop_position: FixedVec2,
    drop_delay: u32,
    triggered: bool,
    dropped: bool,
}

impl LaundryLine {
    /// New idle laundry line.
    pub fn new(id: EntityId, body: BodyHandle, drop_position: FixedVec2, config: &HazardConfig) -> Self {
        Self {
            id,
            body,
            drop_position,
            drop_delay: config.laundry_drop_ticks,
            triggered: false,
            dropped: false,
        }
    }

    /// Sensor body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Swaying in the wind (triggered, rug not yet fallen).
    pub fn is_swaying(&self) -> bool {
        self.triggered && !self.dropped
    }

    /// Whether the rug already fell.
    pub fn has_dropped(&self) -> bool {
        self.dropped
    }

    /// Player entered the sensor. Only the first entry does anything.
    pub fn on_player_enter(&mut self, fx: &mut Effects) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = true;
        fx.schedule(
            EntityRef::Laundry(self.id),
            self.drop_delay,
            TaskAction::RugDrop { position: self.drop_position },
        );
        debug!(laundry = %self.id, "laundry swaying");
        true
    }

    /// Scheduled drop fired.
    pub fn mark_dropped(&mut self) -> bool {
        if self.dropped {
            return false;
        }
        self.dropped = true;
        true
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_bool(self.triggered);
        hasher.update_bool(self.dropped);
    }
}

// =============================================================================
// Rolling bucket
// =============================================================================

/// Hazard that hangs still until the player comes close, then rolls.
#[derive(Clone, Debug)]
pub struct RollingBucket {
    id: EntityId,
    body: BodyHandle,
    config: HazardConfig,
    proximity: Interval,
    rolling: bool,
    destroyed: bool,
}

impl RollingBucket {
    /// New resting bucket. Its body should start with zero gravity.
    pub fn new(id: EntityId, body: BodyHandle, config: HazardConfig) -> Self {
        Self {
            id,
            body,
            proximity: Interval::new(config.bucket_check_ticks),
            config,
            rolling: false,
            destroyed: false,
        }
    }

    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Whether it started rolling.
    pub fn is_rolling(&self) -> bool {
        self.rolling
    }

    /// Liveness flag.
    pub fn is_alive(&self) -> bool {
        !self.destroyed
    }

    fn start_rolling(&mut self, ctx: &mut StepContext<'_>) {
        self.rolling = true;
        ctx.physics.set_gravity_scale(self.body, self.config.bucket_gravity_scale);
        ctx.physics.apply_impulse(self.body, self.config.bucket_impulse);
        ctx.fx.play(SoundCue::Rolling);
        ctx.fx.schedule(
            EntityRef::Bucket(self.id),
            self.config.bucket_lifetime_ticks,
            TaskAction::BucketExpire,
        );
        info!(bucket = %self.id, "bucket rolling");
    }

    fn destroy(&mut self, fx: &mut Effects) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        if self.rolling {
            fx.stop(SoundCue::Rolling);
        }
        fx.despawn(EntityRef::Bucket(self.id));
        true
    }

    /// The bucket hit the player. Shielded players take nothing.
    pub fn on_player_contact(&mut self, player: &mut Player, fx: &mut Effects) -> bool {
        if self.destroyed || player.is_shielding() {
            return false;
        }
        player.take_damage(self.config.bucket_damage, fx);
        fx.play(SoundCue::Hiss);
        self.destroy(fx)
    }

    /// Lifetime elapsed.
    pub fn expire(&mut self, fx: &mut Effects) {
        self.destroy(fx);
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_bool(self.rolling);
        hasher.update_bool(self.destroyed);
        hasher.update_u32(self.proximity.elapsed());
    }
}

impl Steppable for RollingBucket {
    fn pre_step(&mut self, ctx: &mut StepContext<'_>) {
        if self.rolling || self.destroyed || !self.proximity.tick() {
            return;
        }
        let own = ctx.physics.position(self.body);
        if let (Some(own), Some(player)) = (own, ctx.player.position) {
            if own.dx_abs(player) < self.config.bucket_trigger_range {
                self.start_rolling(ctx);
            }
        }
    }
}

impl Damageable for RollingBucket {
    fn apply_hit(&mut self, _kind: ProjectileKind, ctx: &mut StepContext<'_>) -> HitOutcome {
        if self.destroy(ctx.fx) {
            HitOutcome::Killed
        } else {
            HitOutcome::Ignored
        }
    }
}

// =============================================================================
// Goal
// =============================================================================

/// Level exit sensor.
#[derive(Clone, Debug)]
pub struct Goal {
    body: BodyHandle,
    reached: bool,
}

impl Goal {
    /// New unreached goal.
    pub fn new(body: BodyHandle) -> Self {
        Self { body, reached: false }
    }

    /// Sensor body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Player entered. Completes the level the first time only.
    pub fn on_player_enter(&mut self, level: u32, fx: &mut Effects) -> bool {
        if self.reached {
            return false;
        }
        self.reached = true;
        fx.emit(GameEventData::LevelCompleted { level });
        info!(level, "level completed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::config::{ChargeConfig, PlayerConfig};
    use crate::game::effects::Command;
    use crate::game::entity::PlayerView;
    use crate::physics::{BodyDesc, KinematicWorld};

    fn player_in(physics: &mut KinematicWorld, at: FixedVec2) -> Player {
        let config = PlayerConfig::default();
        let body = physics.create_body(BodyDesc::dynamic(at, config.half_extents));
        Player::new(body, config, ChargeConfig::default())
    }

    fn ladder(physics: &mut KinematicWorld) -> Ladder {
        let half = FixedVec2::new(to_fixed(0.4), to_fixed(0.2));
        let bottom_at = FixedVec2::from_ints(0, 0);
        let top_at = FixedVec2::from_ints(0, 12);
        let bottom = physics.create_body(BodyDesc::sensor(bottom_at, half));
        let top = physics.create_body(BodyDesc::sensor(top_at, half));
        Ladder::new(EntityId(1), (bottom, bottom_at), (top, top_at), &HazardConfig::default())
    }

    #[test]
    fn test_ladder_teleports_both_ways_once() {
        let mut physics = KinematicWorld::new();
        let ladder = ladder(&mut physics);
        let mut player = player_in(&mut physics, FixedVec2::from_ints(1, 0));

        assert!(ladder.on_player_enter(&mut player, &mut physics));
        assert_eq!(physics.position(player.body()), Some(FixedVec2::from_ints(2, 14)));
        assert!(player.is_teleporting());
        assert!(!ladder.on_player_enter(&mut player, &mut physics), "latched until exit");

        ladder.on_player_exit(&mut player);
        physics.set_position(player.body(), FixedVec2::from_ints(0, 11));
        assert!(ladder.on_player_enter(&mut player, &mut physics));
        assert_eq!(physics.position(player.body()), Some(FixedVec2::from_ints(2, 2)));
    }

    #[test]
    fn test_ladder_ignores_player_out_of_reach() {
        let mut physics = KinematicWorld::new();
        let ladder = ladder(&mut physics);
        let mut player = player_in(&mut physics, FixedVec2::from_ints(0, 6));
        assert!(!ladder.on_player_enter(&mut player, &mut physics));
        assert!(!player.is_teleporting());
    }

    #[test]
    fn test_laundry_drops_rug_once() {
        let mut line = LaundryLine::new(EntityId(4), BodyHandle(1), FixedVec2::from_ints(5, 3), &HazardConfig::default());
        let mut fx = Effects::new(10);
        assert!(line.on_player_enter(&mut fx));
        assert!(line.is_swaying());
        assert!(!line.on_player_enter(&mut fx));
        assert_eq!(
            fx.commands(),
            &[Command::Schedule {
                owner: EntityRef::Laundry(EntityId(4)),
                delay: 210,
                action: TaskAction::RugDrop { position: FixedVec2::from_ints(5, 3) },
            }]
        );
        assert!(line.mark_dropped());
        assert!(!line.mark_dropped());
        assert!(!line.is_swaying());
    }

    fn bucket(physics: &mut KinematicWorld) -> RollingBucket {
        let body = physics.create_body(
            BodyDesc::dynamic(FixedVec2::from_ints(20, 5), FixedVec2::new(to_fixed(0.75), to_fixed(0.75)))
                .with_gravity_scale(0),
        );
        RollingBucket::new(EntityId(2), body, HazardConfig::default())
    }

    #[test]
    fn test_bucket_rolls_when_player_near() {
        let mut physics = KinematicWorld::new();
        let mut fx = Effects::new(0);
        let mut b = bucket(&mut physics);

        let far = PlayerView { position: Some(FixedVec2::from_ints(0, 0)), shielding: false, alive: true };
        for tick in 0..24 {
            let mut ctx = StepContext { tick, physics: &mut physics, player: far, fx: &mut fx };
            b.pre_step(&mut ctx);
        }
        assert!(!b.is_rolling());

        let near = PlayerView { position: Some(FixedVec2::from_ints(13, 0)), ..far };
        for tick in 0..12 {
            let mut ctx = StepContext { tick, physics: &mut physics, player: near, fx: &mut fx };
            b.pre_step(&mut ctx);
        }
        assert!(b.is_rolling());
        assert!(physics.velocity(b.body()).unwrap().x < 0);
        assert!(fx.commands().contains(&Command::Schedule {
            owner: EntityRef::Bucket(EntityId(2)),
            delay: 600,
            action: TaskAction::BucketExpire,
        }));
    }

    #[test]
    fn test_bucket_contact_respects_shield() {
        let mut physics = KinematicWorld::new();
        let mut fx = Effects::new(0);
        let mut b = bucket(&mut physics);
        let mut player = player_in(&mut physics, FixedVec2::from_ints(20, 3));
        player.pick_up(crate::game::pickup::PickupKind::Shield);
        player.start_shielding();

        assert!(!b.on_player_contact(&mut player, &mut fx));
        assert_eq!(player.health(), 100);
        assert!(b.is_alive());

        player.stop_shielding();
        assert!(b.on_player_contact(&mut player, &mut fx));
        assert_eq!(player.health(), 85);
        assert!(!b.is_alive());
        assert!(!b.on_player_contact(&mut player, &mut fx));
        assert_eq!(player.health(), 85);
    }

    #[test]
    fn test_projectile_destroys_bucket() {
        let mut physics = KinematicWorld::new();
        let mut fx = Effects::new(0);
        let mut b = bucket(&mut physics);
        let mut ctx = StepContext { tick: 1, physics: &mut physics, player: PlayerView::default(), fx: &mut fx };
        assert_eq!(b.apply_hit(ProjectileKind::Rock, &mut ctx), HitOutcome::Killed);
        assert_eq!(b.apply_hit(ProjectileKind::Rock, &mut ctx), HitOutcome::Ignored);
    }

    #[test]
    fn test_goal_completes_once() {
        let mut goal = Goal::new(BodyHandle(1));
        let mut fx = Effects::new(0);
        assert!(goal.on_player_enter(3, &mut fx));
        assert!(!goal.on_player_enter(3, &mut fx));
        assert_eq!(fx.events().len(), 1);
        assert_eq!(fx.events()[0].data, GameEventData::LevelCompleted { level: 3 });
    }
}
