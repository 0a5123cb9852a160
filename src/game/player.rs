//! Player State Machine
//!
//! ```text
//!            walk            jump (grounded)
//!   Idle ◄──────────► Walking ─────────────► Jumping ──(lands)──► Idle/Walking
//!    │
//!    ├── eat ─────────► Eating ──(eat_ticks)──────────────────────► Idle
//!    ├── scratch ─────► Scratching ──(target gone / stop)─────────► Idle
//!    ├── shield ──────► Shielding ──(stop)────────────────────────► Idle
//!    └── charge ──────► ChargingAbility ──(release / cancel)──────► Idle
//! ```
//!
//! Actions start only from a free state (Idle, Walking, Jumping). Every
//! transition clears the per-state counters. Walking input during a busy
//! state still steers the body but leaves the state alone.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, TILT_LIMIT, GROUNDED_EPSILON, fixed_abs};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::ability::ChargeState;
use crate::game::audio::SoundCue;
use crate::game::combat::ProjectileKind;
use crate::game::config::{ChargeConfig, PlayerConfig};
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, PlayerView};
use crate::game::events::GameEventData;
use crate::game::pickup::PickupKind;
use crate::physics::{BodyHandle, PhysicsWorld};

/// Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Standing still
    Idle,
    /// Moving horizontally on the ground
    Walking,
    /// Airborne after a jump
    Jumping,
    /// Clawing a destructible
    Scratching,
    /// Eating food
    Eating,
    /// Holding up a shield
    Shielding,
    /// Charging the special projectile
    ChargingAbility,
}

impl PlayerState {
    /// States from which a new action may start.
    pub fn is_free(self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::Walking | PlayerState::Jumping)
    }

    fn tag(self) -> u8 {
        self as u8
    }
}

/// Non-negative item counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Food (eaten to heal, stolen by thieves)
    pub food: u32,
    /// Special projectile ammo
    pub special_ammo: u32,
    /// Shield charges
    pub shield_charges: u32,
}

/// The player-controlled character.
#[derive(Clone, Debug)]
pub struct Player {
    body: BodyHandle,
    config: PlayerConfig,
    charge_config: ChargeConfig,
    state: PlayerState,
    facing_right: bool,
    health: i32,
    inventory: Inventory,
    charge: ChargeState,
    charge_bar: Fixed,
    scratch_target: Option<EntityId>,
    state_ticks: u32,
    frame_counter: u32,
    walk_frame: u8,
    scratch_frame: u8,
    teleporting: bool,
}

impl Player {
    /// New idle player at full health.
    pub fn new(body: BodyHandle, config: PlayerConfig, charge_config: ChargeConfig) -> Self {
        let health = config.max_health;
        Self {
            body,
            config,
            charge_config,
            state: PlayerState::Idle,
            facing_right: true,
            health,
            inventory: Inventory::default(),
            charge: ChargeState::default(),
            charge_bar: 0,
            scratch_target: None,
            state_ticks: 0,
            frame_counter: 0,
            walk_frame: 0,
            scratch_frame: 0,
            teleporting: false,
        }
    }

    fn set_state(&mut self, next: PlayerState) {
        if self.state == next {
            return;
        }
        debug!(from = ?self.state, to = ?next, "player state");
        self.state = next;
        self.state_ticks = 0;
        self.walk_frame = 0;
        self.scratch_frame = 0;
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Directional input: set horizontal speed and facing.
    pub fn start_walking(&mut self, speed: Fixed, physics: &mut dyn PhysicsWorld) {
        let Some(velocity) = physics.velocity(self.body) else {
            return;
        };
        physics.set_velocity(self.body, FixedVec2::new(speed, velocity.y));
        if speed != 0 {
            self.facing_right = speed > 0;
        }
        if matches!(self.state, PlayerState::Idle | PlayerState::Walking) {
            self.set_state(PlayerState::Walking);
        }
    }

    /// Directional input released.
    pub fn stop_walking(&mut self, physics: &mut dyn PhysicsWorld) {
        if let Some(velocity) = physics.velocity(self.body) {
            physics.set_velocity(self.body, FixedVec2::new(0, velocity.y));
        }
        if self.state == PlayerState::Walking {
            self.set_state(PlayerState::Idle);
        }
    }

    /// Jump if standing on something (vertical speed about zero).
    pub fn jump(&mut self, physics: &mut dyn PhysicsWorld) -> bool {
        if !matches!(self.state, PlayerState::Idle | PlayerState::Walking) {
            return false;
        }
        let Some(velocity) = physics.velocity(self.body) else {
            return false;
        };
        if fixed_abs(velocity.y) >= GROUNDED_EPSILON {
            return false;
        }
        physics.set_velocity(self.body, FixedVec2::new(velocity.x, self.config.jump_speed));
        self.set_state(PlayerState::Jumping);
        true
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Throw a basic projectile in the facing direction. Needs no ammo.
    pub fn throw_rock(&mut self, physics: &dyn PhysicsWorld, fx: &mut Effects) -> bool {
        if !self.state.is_free() {
            return false;
        }
        let Some(position) = physics.position(self.body) else {
            return false;
        };
        let offset = self.config.rock_offset.facing(self.facing_right);
        let velocity = self.config.rock_velocity.facing(self.facing_right);
        fx.spawn_projectile(ProjectileKind::Rock, position + offset, velocity, self.config.rock_velocity.x);
        fx.play(SoundCue::StoneThrow);
        true
    }

    /// Eat one food to heal.
    pub fn eat(&mut self, fx: &mut Effects) -> bool {
        if !self.state.is_free()
            || self.inventory.food == 0
            || self.health >= self.config.max_health
        {
            return false;
        }
        self.inventory.food -= 1;
        let amount = self.heal(self.config.eat_heal);
        fx.play(SoundCue::Eating);
        fx.emit(GameEventData::PlayerHealed { amount, health: self.health });
        self.set_state(PlayerState::Eating);
        true
    }

    /// Raise the shield, spending one charge.
    pub fn start_shielding(&mut self) -> bool {
        if !self.state.is_free() || self.inventory.shield_charges == 0 {
            return false;
        }
        self.inventory.shield_charges -= 1;
        self.set_state(PlayerState::Shielding);
        true
    }

    /// Lower the shield.
    pub fn stop_shielding(&mut self) {
        if self.state == PlayerState::Shielding {
            self.set_state(PlayerState::Idle);
        }
    }

    /// Begin clawing `target`.
    pub fn start_scratching(&mut self, target: EntityId, fx: &mut Effects) -> bool {
        if !self.state.is_free() {
            return false;
        }
        self.scratch_target = Some(target);
        self.set_state(PlayerState::Scratching);
        fx.play_loop(SoundCue::Scratching);
        true
    }

    /// Stop clawing (explicitly, or because the target is gone).
    pub fn stop_scratching(&mut self, fx: &mut Effects) {
        if self.state != PlayerState::Scratching {
            return;
        }
        fx.stop(SoundCue::Scratching);
        self.scratch_target = None;
        self.set_state(PlayerState::Idle);
    }

    /// Begin charging the special projectile.
    pub fn start_charging(&mut self, tick: u32, fx: &mut Effects) -> bool {
        if !self.state.is_free() || self.inventory.special_ammo == 0 || self.charge.is_charging() {
            return false;
        }
        self.charge.start(tick);
        self.charge_bar = 0;
        self.set_state(PlayerState::ChargingAbility);
        fx.play_loop(SoundCue::Charging);
        true
    }

    /// Release the charge and launch. A no-op unless charging.
    pub fn release_charge(
        &mut self,
        tick: u32,
        physics: &dyn PhysicsWorld,
        fx: &mut Effects,
    ) -> Option<Fixed> {
        if self.state != PlayerState::ChargingAbility {
            return None;
        }
        let power = self.charge.release(tick, &self.charge_config)?;
        fx.stop(SoundCue::Charging);
        self.charge_bar = 0;
        self.set_state(PlayerState::Idle);

        if self.inventory.special_ammo == 0 {
            return None;
        }
        self.inventory.special_ammo -= 1;

        if let Some(position) = physics.position(self.body) {
            let offset = self.charge_config.launch_offset.facing(self.facing_right);
            let speed = if self.facing_right { power } else { -power };
            let velocity = FixedVec2::new(speed, self.charge_config.launch_lift);
            fx.spawn_projectile(ProjectileKind::Nubella, position + offset, velocity, power);
            fx.play(SoundCue::Release);
        }
        Some(power)
    }

    /// Abort a charge without firing or spending ammo.
    pub fn cancel_charge(&mut self, fx: &mut Effects) {
        if self.state != PlayerState::ChargingAbility {
            return;
        }
        self.charge.cancel();
        self.charge_bar = 0;
        fx.stop(SoundCue::Charging);
        self.set_state(PlayerState::Idle);
    }

    // =========================================================================
    // Health and inventory
    // =========================================================================

    /// Lose health, clamped at zero. Returns the amount actually lost.
    pub fn take_damage(&mut self, amount: i32, fx: &mut Effects) -> i32 {
        let before = self.health;
        self.health = (self.health - amount.max(0)).clamp(0, self.config.max_health);
        let lost = before - self.health;
        if lost > 0 {
            fx.emit(GameEventData::PlayerDamaged { amount: lost, health: self.health });
        }
        lost
    }

    /// Gain health, clamped at the maximum. Returns the amount actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).clamp(0, self.config.max_health);
        self.health - before
    }

    /// Overwrite health (save restore, level carry-over), clamped.
    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, self.config.max_health);
    }

    /// Add one unit from a pickup. Returns the new count.
    pub fn pick_up(&mut self, kind: PickupKind) -> u32 {
        let slot = match kind {
            PickupKind::Food => &mut self.inventory.food,
            PickupKind::SpecialAmmo => &mut self.inventory.special_ammo,
            PickupKind::Shield => &mut self.inventory.shield_charges,
        };
        *slot += 1;
        *slot
    }

    /// Remove one food (thief). Returns the remaining count.
    pub fn lose_food(&mut self) -> u32 {
        self.inventory.food = self.inventory.food.saturating_sub(1);
        self.inventory.food
    }

    /// Overwrite the food count (save restore, level carry-over).
    pub fn set_food(&mut self, food: u32) {
        self.inventory.food = food;
    }

    /// Drop whatever the player is doing (used on respawn).
    pub fn reset_state(&mut self, fx: &mut Effects) {
        self.stop_scratching(fx);
        self.cancel_charge(fx);
        self.teleporting = false;
        self.set_state(PlayerState::Idle);
    }

    // =========================================================================
    // Step hooks
    // =========================================================================

    /// Pre-step: tilt guard, animation cadences, state timers.
    ///
    /// Returns true on the ticks a melee strike lands.
    pub fn pre_step(&mut self, physics: &mut dyn PhysicsWorld) -> bool {
        if let Some(angle) = physics.angle(self.body) {
            if fixed_abs(angle) > TILT_LIMIT {
                physics.set_angle(self.body, 0);
            }
        }

        self.frame_counter += 1;
        if self.frame_counter >= self.config.walk_frame_ticks {
            self.frame_counter = 0;
            if self.state == PlayerState::Walking {
                self.walk_frame = 1 - self.walk_frame;
            }
        }

        self.state_ticks += 1;
        match self.state {
            PlayerState::Jumping => {
                let velocity = physics.velocity(self.body).unwrap_or_default();
                if self.state_ticks > 1 && fixed_abs(velocity.y) < GROUNDED_EPSILON {
                    let next = if velocity.x != 0 { PlayerState::Walking } else { PlayerState::Idle };
                    self.set_state(next);
                }
                false
            }
            PlayerState::Eating => {
                if self.state_ticks >= self.config.eat_ticks {
                    self.set_state(PlayerState::Idle);
                }
                false
            }
            PlayerState::Scratching => {
                if self.state_ticks % self.config.scratch_frame_ticks == 0 {
                    self.scratch_frame = 1 - self.scratch_frame;
                }
                self.state_ticks % self.config.scratch_damage_ticks == 0
            }
            _ => false,
        }
    }

    /// Post-step: refresh the HUD charge bar.
    pub fn post_step(&mut self, tick: u32) {
        self.charge_bar = if self.state == PlayerState::ChargingAbility {
            self.charge.progress(tick, &self.charge_config)
        } else {
            0
        };
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Current state.
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Health in `[0, max]`.
    pub fn health(&self) -> i32 {
        self.health
    }

    /// Health cap.
    pub fn max_health(&self) -> i32 {
        self.config.max_health
    }

    /// Whether health is above zero.
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Item counters.
    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    /// Food count.
    pub fn food(&self) -> u32 {
        self.inventory.food
    }

    /// Special ammo count.
    pub fn special_ammo(&self) -> u32 {
        self.inventory.special_ammo
    }

    /// Shield charges.
    pub fn shield_charges(&self) -> u32 {
        self.inventory.shield_charges
    }

    /// Live charge progress in `[0, ONE]`, computed at `tick`.
    pub fn charge_progress(&self, tick: u32) -> Fixed {
        self.charge.progress(tick, &self.charge_config)
    }

    /// Charge bar as of the last post-step.
    pub fn charge_bar(&self) -> Fixed {
        self.charge_bar
    }

    /// Facing direction.
    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    /// Whether the shield is raised.
    pub fn is_shielding(&self) -> bool {
        self.state == PlayerState::Shielding
    }

    /// Current scratch target.
    pub fn scratch_target(&self) -> Option<EntityId> {
        self.scratch_target
    }

    /// Walk animation frame (0 or 1).
    pub fn walk_frame(&self) -> u8 {
        self.walk_frame
    }

    /// Scratch animation frame (0 or 1).
    pub fn scratch_frame(&self) -> u8 {
        self.scratch_frame
    }

    /// Ladder teleport latch.
    pub fn is_teleporting(&self) -> bool {
        self.teleporting
    }

    /// Set or clear the ladder teleport latch.
    pub fn set_teleporting(&mut self, teleporting: bool) {
        self.teleporting = teleporting;
    }

    /// Snapshot for other entities' hooks.
    pub fn view(&self, physics: &dyn PhysicsWorld) -> PlayerView {
        PlayerView {
            position: physics.position(self.body),
            shielding: self.is_shielding(),
            alive: self.is_alive(),
        }
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.state.tag());
        hasher.update_bool(self.facing_right);
        hasher.update_i32(self.health);
        hasher.update_u32(self.inventory.food);
        hasher.update_u32(self.inventory.special_ammo);
        hasher.update_u32(self.inventory.shield_charges);
        hasher.update_opt_u32(self.charge.started_at());
        hasher.update_opt_u32(self.scratch_target.map(|id| id.0));
        hasher.update_u32(self.state_ticks);
        hasher.update_bool(self.teleporting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};
    use crate::game::effects::Command;
    use crate::physics::{BodyDesc, KinematicWorld};
    use proptest::prelude::*;

    fn setup() -> (KinematicWorld, Player) {
        let mut physics = KinematicWorld::new();
        physics.create_body(BodyDesc::fixed(FixedVec2::from_ints(0, -1), FixedVec2::from_ints(50, 1)));
        let config = PlayerConfig::default();
        let body = physics.create_body(
            BodyDesc::dynamic(FixedVec2::new(0, config.half_extents.y), config.half_extents)
                .with_gravity_scale(config.gravity_scale),
        );
        let player = Player::new(body, config, ChargeConfig::default());
        (physics, player)
    }

    #[test]
    fn test_walk_sets_velocity_and_facing() {
        let (mut physics, mut player) = setup();
        player.start_walking(to_fixed(-10.0), &mut physics);
        assert_eq!(player.state(), PlayerState::Walking);
        assert!(!player.facing_right());
        assert_eq!(physics.velocity(player.body()).unwrap().x, to_fixed(-10.0));

        player.stop_walking(&mut physics);
        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(physics.velocity(player.body()).unwrap().x, 0);
    }

    #[test]
    fn test_jump_requires_ground_and_lands() {
        let (mut physics, mut player) = setup();
        physics.step();
        assert!(player.jump(&mut physics));
        assert_eq!(player.state(), PlayerState::Jumping);
        assert!(!player.jump(&mut physics), "no double jump");

        for _ in 0..300 {
            player.pre_step(&mut physics);
            physics.step();
        }
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_eat_heals_and_returns_to_idle() {
        let (mut physics, mut player) = setup();
        let mut fx = Effects::new(0);
        player.pick_up(PickupKind::Food);
        assert!(!player.eat(&mut fx), "cannot eat at full health");

        player.take_damage(25, &mut fx);
        assert!(player.eat(&mut fx));
        assert_eq!(player.health(), 85);
        assert_eq!(player.food(), 0);
        assert_eq!(player.state(), PlayerState::Eating);
        assert!(!player.eat(&mut fx));

        for _ in 0..59 {
            player.pre_step(&mut physics);
        }
        assert_eq!(player.state(), PlayerState::Eating);
        player.pre_step(&mut physics);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_busy_state_blocks_other_actions() {
        let (mut physics, mut player) = setup();
        let mut fx = Effects::new(0);
        player.pick_up(PickupKind::Shield);
        player.pick_up(PickupKind::SpecialAmmo);

        assert!(player.start_shielding());
        assert_eq!(player.shield_charges(), 0);
        assert!(!player.start_charging(1, &mut fx));
        assert!(!player.start_scratching(EntityId(1), &mut fx));

        // Steering while shielded keeps the shield up
        player.start_walking(to_fixed(20.0), &mut physics);
        assert_eq!(player.state(), PlayerState::Shielding);

        player.stop_shielding();
        assert!(player.start_charging(2, &mut fx));
    }

    #[test]
    fn test_release_spends_ammo_and_launches() {
        let (physics, mut player) = setup();
        let mut fx = Effects::new(200);
        player.pick_up(PickupKind::SpecialAmmo);
        assert!(player.start_charging(80, &mut fx));

        let power = player.release_charge(200, &physics, &mut fx);
        assert_eq!(power, Some(to_fixed(20.0)));
        assert_eq!(player.special_ammo(), 0);
        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(player.charge_progress(201), 0);

        let launches: Vec<_> = fx
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SpawnProjectile { kind, velocity, .. } => Some((*kind, *velocity)),
                _ => None,
            })
            .collect();
        assert_eq!(launches, vec![(ProjectileKind::Nubella, FixedVec2::new(to_fixed(20.0), to_fixed(2.0)))]);
    }

    #[test]
    fn test_release_when_not_charging_is_noop() {
        let (physics, mut player) = setup();
        let mut fx = Effects::new(0);
        player.pick_up(PickupKind::SpecialAmmo);
        assert_eq!(player.release_charge(50, &physics, &mut fx), None);
        assert_eq!(player.special_ammo(), 1);
        assert!(fx.commands().is_empty());
    }

    #[test]
    fn test_cancel_keeps_ammo() {
        let (_physics, mut player) = setup();
        let mut fx = Effects::new(0);
        player.pick_up(PickupKind::SpecialAmmo);
        player.start_charging(0, &mut fx);
        player.cancel_charge(&mut fx);
        assert_eq!(player.special_ammo(), 1);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_charge_bar_updates_post_step() {
        let (_physics, mut player) = setup();
        let mut fx = Effects::new(0);
        player.pick_up(PickupKind::SpecialAmmo);
        player.start_charging(0, &mut fx);
        player.post_step(60);
        assert_eq!(player.charge_bar(), FIXED_ONE / 2);
        player.post_step(500);
        assert_eq!(player.charge_bar(), FIXED_ONE);
    }

    #[test]
    fn test_tilt_guard_resets_rotation() {
        let (mut physics, mut player) = setup();
        physics.set_angle(player.body(), to_fixed(1.2));
        player.pre_step(&mut physics);
        assert_eq!(physics.angle(player.body()), Some(0));

        physics.set_angle(player.body(), to_fixed(0.9));
        player.pre_step(&mut physics);
        assert_eq!(physics.angle(player.body()), Some(to_fixed(0.9)));
    }

    #[test]
    fn test_scratch_cadences() {
        let (mut physics, mut player) = setup();
        let mut fx = Effects::new(0);
        assert!(player.start_scratching(EntityId(5), &mut fx));

        let strikes: Vec<u32> = (1..=90u32).filter(|_| player.pre_step(&mut physics)).collect();
        assert_eq!(strikes.len(), 3, "one strike every 30 ticks");
        // Frame toggled 9 times over 90 ticks: odd count ends on frame 1
        assert_eq!(player.scratch_frame(), 1);

        player.stop_scratching(&mut fx);
        assert_eq!(player.scratch_target(), None);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_walk_animation_alternates() {
        let (mut physics, mut player) = setup();
        player.start_walking(to_fixed(20.0), &mut physics);
        let mut frames = Vec::new();
        for _ in 0..30 {
            player.pre_step(&mut physics);
            frames.push(player.walk_frame());
        }
        assert_eq!(frames[8], 0);
        assert_eq!(frames[9], 1);
        assert_eq!(frames[19], 0);
        assert_eq!(frames[29], 1);
    }

    proptest! {
        #[test]
        fn prop_health_always_clamped(ops in proptest::collection::vec((any::<bool>(), 0i32..250), 0..100)) {
            let mut player = Player::new(BodyHandle(1), PlayerConfig::default(), ChargeConfig::default());
            let mut fx = Effects::new(0);
            for (damage, amount) in ops {
                if damage {
                    player.take_damage(amount, &mut fx);
                } else {
                    player.heal(amount);
                }
                prop_assert!((0..=100).contains(&player.health()));
            }
        }
    }
}
