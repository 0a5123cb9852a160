//! Authoritative Simulation Tick
//!
//! One call to [`tick`] advances the world by exactly one fixed step. The
//! phase order is part of the contract: replays depend on it.
//!
//! 1. Player commands
//! 2. Pre-step hooks (game-over watch, spawn gate, player, scheduled tasks,
//!    stray projectiles, pigeons, thieves, platforms, buckets)
//! 3. Physics step and contact dispatch
//! 4. Post-step hooks (animation and charge bar only)
//!
//! Phases 1-3 write into their own [`Effects`] buffer, which the world
//! flushes before the next phase starts. Registries are never mutated while
//! they are being iterated.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::vec2::FixedVec2;
use crate::game::ability::{ChargeTrigger, TriggerRelease};
use crate::game::combat::{resolve_projectile_hit, Damageable};
use crate::game::effects::Effects;
use crate::game::entity::{EntityId, EntityRef, StepContext, Steppable};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::pickup::PickupKind;
use crate::game::player::PlayerState;
use crate::game::spawn::GameOverCause;
use crate::game::timer::TaskAction;
use crate::game::world::World;
use crate::physics::PhysicsEvent;

/// One player action for a tick. Several may arrive in the same tick and
/// are applied in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Walk right at the configured speed
    WalkRight,
    /// Walk left at the configured speed
    WalkLeft,
    /// Stop walking
    StopWalking,
    /// Jump if grounded
    Jump,
    /// Throw a basic rock
    ThrowRock,
    /// Eat one food
    Eat,
    /// Raise the shield (spends a charge)
    StartShielding,
    /// Lower the shield
    StopShielding,
    /// Charge input went down
    PressCharge,
    /// Charge input went up
    ReleaseCharge,
    /// Scratch the nearest destructible in melee range
    Scratch,
    /// Stop scratching
    StopScratching,
}

/// Result of a tick.
#[derive(Debug)]
#[derive(Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the goal was reached this tick
    pub level_completed: bool,
    /// Whether a respawn grace period is running after this tick
    pub game_over: bool,
}

/// Run one simulation tick.
///
/// # Determinism
///
/// Given the same world and the same commands this always produces the same
/// state:
/// - Registries are `BTreeMap`s, iterated in id order
/// - Contacts arrive from the solver in a stable order
/// - All arithmetic is fixed-point
/// - Randomness comes from the world's seeded RNG
pub fn tick(world: &mut World, commands: &[PlayerCommand]) -> TickResult {
    // 0. Advance tick counter
    world.tick += 1;
    let was_completed = world.level_completed;

    // 1. Apply player commands
    apply_commands(world, commands);

    // 2. Pre-step hooks
    pre_step(world);

    // 3. Physics and contact dispatch
    physics_step(world);

    // 4. Post-step hooks
    post_step(world);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        tick = world.tick,
        hash = %hex::encode(world.state_hash()),
        "tick complete"
    );

    TickResult {
        events: std::mem::take(&mut world.events),
        level_completed: world.level_completed && !was_completed,
        game_over: world.game_over.is_pending(),
    }
}

/// Replay recorded commands, one entry per tick.
pub fn replay(world: &mut World, frames: &[Vec<PlayerCommand>]) -> Vec<TickResult> {
    frames.iter().map(|commands| tick(world, commands)).collect()
}

// =============================================================================
// Phase 1: commands
// =============================================================================

fn apply_commands(world: &mut World, commands: &[PlayerCommand]) {
    if commands.is_empty() {
        return;
    }
    if world.game_over.is_pending() {
        debug!(count = commands.len(), cause = ?world.game_over.cause(), "ignoring commands during game over");
        return;
    }

    let mut fx = Effects::new(world.tick);
    for &command in commands {
        apply_command(world, command, &mut fx);
    }
    world.flush(fx);
}

fn apply_command(world: &mut World, command: PlayerCommand, fx: &mut Effects) {
    let tick = world.tick;
    match command {
        PlayerCommand::WalkRight => {
            let speed = world.config.player.walk_speed_right;
            world.player.start_walking(speed, world.physics.as_mut());
        }
        PlayerCommand::WalkLeft => {
            let speed = -world.config.player.walk_speed_left;
            world.player.start_walking(speed, world.physics.as_mut());
        }
        PlayerCommand::StopWalking => world.player.stop_walking(world.physics.as_mut()),
        PlayerCommand::Jump => {
            world.player.jump(world.physics.as_mut());
        }
        PlayerCommand::ThrowRock => {
            world.player.throw_rock(world.physics.as_ref(), fx);
        }
        PlayerCommand::Eat => {
            world.player.eat(fx);
        }
        PlayerCommand::StartShielding => {
            world.player.start_shielding();
        }
        PlayerCommand::StopShielding => world.player.stop_shielding(),
        PlayerCommand::PressCharge => world.charge_trigger.press(tick),
        PlayerCommand::ReleaseCharge => match world.charge_trigger.release(tick, &world.config.charge) {
            TriggerRelease::Release => {
                world.player.release_charge(tick, world.physics.as_ref(), fx);
            }
            TriggerRelease::Ignored => debug!(tick, "charge tap ignored"),
        },
        PlayerCommand::Scratch => match nearest_destructible(world) {
            Some(target) => {
                world.player.start_scratching(target, fx);
            }
            None => debug!(tick, "nothing in melee range"),
        },
        PlayerCommand::StopScratching => world.player.stop_scratching(fx),
    }
}

/// Closest intact destructible strictly inside melee range; ties go to the
/// lower id.
fn nearest_destructible(world: &World) -> Option<EntityId> {
    let at = world.physics.position(world.player.body())?;
    let range = world.config.player.melee_range;
    world
        .destructibles
        .iter()
        .filter(|(_, d)| !d.is_destroyed() && d.health() > 0)
        .map(|(id, d)| (d.position().distance(at), *id))
        .filter(|(distance, _)| *distance < range)
        .min()
        .map(|(_, id)| id)
}

// =============================================================================
// Phase 2: pre-step
// =============================================================================

fn pre_step(world: &mut World) {
    let tick = world.tick;
    let mut fx = Effects::new(tick);

    // Game-over watch
    match world.game_over.advance() {
        Some(cause) => respawn(world, cause, &mut fx),
        None => {
            world.game_over.check(&world.player, world.physics.as_ref(), &mut fx);
        }
    }

    // Thief spawn gate
    if world.spawner.should_spawn(world.level, world.player.food()) {
        world.spawn_thief();
    }

    // Charge hold threshold
    if world.charge_trigger.poll(tick, &world.config.charge) && !world.game_over.is_pending() {
        world.player.start_charging(tick, &mut fx);
    }

    // Player hook and melee
    player_pre_step(world, &mut fx);

    // Scheduled tasks
    run_due_tasks(world, &mut fx);

    // Projectiles that fell out of the level or flew too long
    expire_projectiles(world, &mut fx);

    // Entity hooks, in registry order
    let view = world.player.view(world.physics.as_ref());
    let mut ctx = StepContext {
        tick,
        physics: world.physics.as_mut(),
        player: view,
        fx: &mut fx,
    };
    for pigeon in world.pigeons.values_mut() {
        pigeon.pre_step(&mut ctx);
    }
    for thief in world.thieves.values_mut() {
        thief.pre_step(&mut ctx);
    }
    for platform in world.platforms.values_mut() {
        platform.pre_step(&mut ctx);
    }
    for bucket in world.buckets.values_mut() {
        bucket.pre_step(&mut ctx);
    }

    world.flush(fx);
}

fn respawn(world: &mut World, cause: GameOverCause, fx: &mut Effects) {
    let start = world.config.world.start_position;
    let body = world.player.body();
    world.physics.set_position(body, start);
    world.physics.set_velocity(body, FixedVec2::ZERO);
    world.physics.set_angle(body, 0);

    world.player.reset_state(fx);
    world.charge_trigger = ChargeTrigger::default();
    if cause == GameOverCause::Defeated {
        let max = world.player.max_health();
        world.player.set_health(max);
    }

    fx.emit(GameEventData::PlayerRespawned { cause });
    info!(?cause, health = world.player.health(), "player respawned");
}

fn player_pre_step(world: &mut World, fx: &mut Effects) {
    let player = &mut world.player;

    // A target that broke or vanished ends the scratch
    if player.state() == PlayerState::Scratching {
        let physics = world.physics.as_ref();
        let valid = player
            .scratch_target()
            .and_then(|id| world.destructibles.get(&id))
            .is_some_and(|d| !d.is_destroyed() && d.health() > 0 && physics.contains(d.body()));
        if !valid {
            player.stop_scratching(fx);
        }
    }

    if !player.pre_step(world.physics.as_mut()) {
        return;
    }
    let Some(target) = player.scratch_target().and_then(|id| world.destructibles.get_mut(&id)) else {
        return;
    };
    target.take_damage(fx);
    if target.health() <= 0 {
        player.stop_scratching(fx);
    }
}

fn run_due_tasks(world: &mut World, fx: &mut Effects) {
    for task in world.scheduler.take_due(world.tick) {
        match (task.owner, task.action) {
            (EntityRef::Thief(id), TaskAction::ThiefFlee) => {
                if let Some(thief) = world.thieves.get_mut(&id) {
                    thief.flee(world.physics.as_mut(), fx);
                }
            }
            (EntityRef::Thief(id), TaskAction::ThiefExpire) => {
                if let Some(thief) = world.thieves.get_mut(&id) {
                    thief.expire(fx);
                }
            }
            (EntityRef::Laundry(id), TaskAction::RugDrop { position }) => {
                if let Some(line) = world.laundry.get_mut(&id) {
                    if line.mark_dropped() {
                        fx.spawn_pickup(PickupKind::Shield, position);
                        fx.emit(GameEventData::RugDropped { line: id, position });
                    }
                }
            }
            (EntityRef::Bucket(id), TaskAction::BucketExpire) => {
                if let Some(bucket) = world.buckets.get_mut(&id) {
                    bucket.expire(fx);
                }
            }
            (owner, action) => debug!(?owner, ?action, "task has no handler"),
        }
    }
}

fn expire_projectiles(world: &World, fx: &mut Effects) {
    let floor = world.config.world.fall_threshold;
    let lifetime = world.config.world.projectile_lifetime_ticks;
    for projectile in world.projectiles.values() {
        let fell = world
            .physics
            .position(projectile.body())
            .map_or(true, |at| at.y < floor);
        if fell || projectile.age(world.tick) >= lifetime {
            debug!(projectile = %projectile.id(), fell, "projectile out of bounds");
            fx.despawn(EntityRef::Projectile(projectile.id()));
        }
    }
}

// =============================================================================
// Phase 3: physics
// =============================================================================

fn physics_step(world: &mut World) {
    let contacts = world.physics.step();
    let mut fx = Effects::new(world.tick);
    for contact in contacts {
        dispatch_contact(world, contact, &mut fx);
    }
    world.flush(fx);
}

fn dispatch_contact(world: &mut World, contact: PhysicsEvent, fx: &mut Effects) {
    match contact {
        PhysicsEvent::CollisionBegin { a, b } => {
            let first = world.owners.get(&a).copied();
            let second = world.owners.get(&b).copied();

            // Projectiles resolve against whatever they touched
            for (this, other) in [(first, second), (second, first)] {
                if let Some(EntityRef::Projectile(id)) = this {
                    projectile_contact(world, id, other, fx);
                }
            }

            match (first, second) {
                (Some(EntityRef::Player), Some(other)) | (Some(other), Some(EntityRef::Player)) => {
                    player_contact(world, other, fx);
                }
                _ => {}
            }
        }
        PhysicsEvent::SensorBegin { sensor, other } => {
            if other != world.player.body() {
                return;
            }
            if let Some(owner) = world.owners.get(&sensor).copied() {
                player_enters_sensor(world, owner, fx);
            }
        }
        PhysicsEvent::SensorEnd { sensor, other } => {
            if other != world.player.body() {
                return;
            }
            if let Some(EntityRef::Ladder(id)) = world.owners.get(&sensor).copied() {
                if let Some(ladder) = world.ladders.get(&id) {
                    ladder.on_player_exit(&mut world.player);
                }
            }
        }
    }
}

fn projectile_contact(world: &mut World, id: EntityId, other: Option<EntityRef>, fx: &mut Effects) {
    let view = world.player.view(world.physics.as_ref());
    let Some(projectile) = world.projectiles.get_mut(&id) else {
        return;
    };
    let target: Option<&mut dyn Damageable> = match other {
        Some(EntityRef::Pigeon(id)) => world.pigeons.get_mut(&id).map(|p| p as &mut dyn Damageable),
        Some(EntityRef::Thief(id)) => world.thieves.get_mut(&id).map(|t| t as &mut dyn Damageable),
        Some(EntityRef::Bucket(id)) => world.buckets.get_mut(&id).map(|b| b as &mut dyn Damageable),
        _ => None,
    };
    let mut ctx = StepContext {
        tick: world.tick,
        physics: world.physics.as_mut(),
        player: view,
        fx,
    };
    resolve_projectile_hit(projectile, target, &mut ctx);
}

fn player_contact(world: &mut World, other: EntityRef, fx: &mut Effects) {
    let player = &mut world.player;
    match other {
        EntityRef::Pigeon(id) => {
            if let Some(pigeon) = world.pigeons.get_mut(&id) {
                pigeon.on_player_contact(player, fx);
            }
        }
        EntityRef::Thief(id) => {
            if let Some(thief) = world.thieves.get_mut(&id) {
                thief.on_player_contact(player, fx);
            }
        }
        EntityRef::Bucket(id) => {
            if let Some(bucket) = world.buckets.get_mut(&id) {
                bucket.on_player_contact(player, fx);
            }
        }
        _ => {}
    }
}

fn player_enters_sensor(world: &mut World, owner: EntityRef, fx: &mut Effects) {
    match owner {
        EntityRef::Pickup(id) => {
            if let Some(pickup) = world.pickups.get_mut(&id) {
                pickup.on_player_enter(&mut world.player, fx);
            }
        }
        EntityRef::Ladder(id) => {
            if let Some(ladder) = world.ladders.get(&id) {
                ladder.on_player_enter(&mut world.player, world.physics.as_mut());
            }
        }
        EntityRef::Laundry(id) => {
            if let Some(line) = world.laundry.get_mut(&id) {
                line.on_player_enter(fx);
            }
        }
        EntityRef::Goal(id) => {
            if let Some(goal) = world.goals.get_mut(&id) {
                if goal.on_player_enter(world.level, fx) {
                    world.level_completed = true;
                }
            }
        }
        _ => {}
    }
}

// =============================================================================
// Phase 4: post-step
// =============================================================================

fn post_step(world: &mut World) {
    world.player.post_step(world.tick);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};
    use crate::game::audio::AudioLog;
    use crate::game::combat::ProjectileKind;
    use crate::game::config::SimConfig;
    use crate::game::thief::ThiefState;
    use crate::game::world::WorldBuilder;

    fn world_with(config: SimConfig, level: u32) -> World {
        WorldBuilder::new(config)
            .level(level)
            .audio(Box::new(AudioLog::new()))
            .build()
    }

    /// Wide floor under the start position; top surface at y = -14.
    fn flat_world() -> World {
        let mut w = world_with(SimConfig::default(), 1);
        w.add_terrain(FixedVec2::from_ints(0, -15), FixedVec2::from_ints(60, 1));
        w
    }

    fn run(w: &mut World, ticks: u32) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| tick(w, &[]).events).collect()
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEventData) -> bool) -> usize {
        events.iter().filter(|e| pred(&e.data)).count()
    }

    #[test]
    fn test_player_rests_on_floor() {
        let mut w = flat_world();
        run(&mut w, 60);
        assert_eq!(w.player_position(), Some(FixedVec2::from_ints(-10, -13)));
        assert_eq!(w.player().state(), PlayerState::Idle);
        assert_eq!(w.tick(), 60);
    }

    #[test]
    fn test_charged_shot_kills_pigeon_and_drops_food() {
        let mut w = flat_world();
        let start = FixedVec2::new(to_fixed(-2.0), to_fixed(-9.5));
        let pigeon = w.add_pigeon(start);
        w.player_mut().pick_up(PickupKind::SpecialAmmo);

        let mut events = Vec::new();
        let mut power = None;
        for t in 1..=240u32 {
            let commands: &[PlayerCommand] = match t {
                1 => &[PlayerCommand::PressCharge],
                133 => &[PlayerCommand::ReleaseCharge],
                _ => &[],
            };
            let result = tick(&mut w, commands);
            for event in &result.events {
                if let GameEventData::ProjectileFired { kind: ProjectileKind::Nubella, power: p, .. } = event.data {
                    power = Some(p);
                }
            }
            events.extend(result.events);
        }

        // Held 120 ticks past the release delay: full power
        assert_eq!(power, Some(to_fixed(20.0)));
        assert_eq!(w.special_ammo(), 0);
        assert!(w.pigeon(pigeon).is_none());
        assert_eq!(count(&events, |d| matches!(d, GameEventData::PigeonKilled { .. })), 1);
        assert_eq!(w.projectile_count(), 0);

        let pickups = w.pickups();
        assert_eq!(pickups.len(), 1);
        assert_eq!(pickups[0].0, PickupKind::Food);
        assert!(pickups[0].1.distance(start) < to_fixed(4.0), "dropped where the pigeon died");
    }

    #[test]
    fn test_two_hits_in_one_step_kill_once() {
        let mut w = world_with(SimConfig::default(), 1);
        let pigeon = w.add_pigeon(FixedVec2::from_ints(20, 5));
        let mut fx = Effects::new(0);
        for x in [to_fixed(19.0), to_fixed(21.0)] {
            fx.spawn_projectile(ProjectileKind::Nubella, FixedVec2::new(x, to_fixed(5.0)), FixedVec2::ZERO, 0);
        }
        w.flush(fx);
        assert_eq!(w.projectile_count(), 2);

        let events = tick(&mut w, &[]).events;
        assert!(w.pigeon(pigeon).is_none());
        assert_eq!(count(&events, |d| matches!(d, GameEventData::PigeonKilled { .. })), 1);
        assert_eq!(w.pickups().len(), 1);
        assert_eq!(w.projectile_count(), 0, "both projectiles consumed");
    }

    #[test]
    fn test_short_charge_tap_does_nothing() {
        let mut w = flat_world();
        w.player_mut().pick_up(PickupKind::SpecialAmmo);
        tick(&mut w, &[PlayerCommand::PressCharge]);
        run(&mut w, 3);
        let result = tick(&mut w, &[PlayerCommand::ReleaseCharge]);

        assert_eq!(w.special_ammo(), 1);
        assert_eq!(w.projectile_count(), 0);
        assert_eq!(w.player().state(), PlayerState::Idle);
        assert_eq!(count(&result.events, |d| matches!(d, GameEventData::ProjectileFired { .. })), 0);
        // Releasing again with nothing pressed is also a no-op
        tick(&mut w, &[PlayerCommand::ReleaseCharge]);
        assert_eq!(w.special_ammo(), 1);
    }

    #[test]
    fn test_charge_without_ammo_stays_idle() {
        let mut w = flat_world();
        tick(&mut w, &[PlayerCommand::PressCharge]);
        run(&mut w, 30);
        assert_eq!(w.player().state(), PlayerState::Idle);
        assert_eq!(w.charge_progress(), 0);
    }

    #[test]
    fn test_charge_bar_tracks_progress() {
        let mut w = flat_world();
        w.player_mut().pick_up(PickupKind::SpecialAmmo);
        tick(&mut w, &[PlayerCommand::PressCharge]);
        run(&mut w, 72);
        // Charging began on tick 13; 60 of 120 ticks elapsed
        assert_eq!(w.player().state(), PlayerState::ChargingAbility);
        assert_eq!(w.player().charge_bar(), FIXED_ONE / 2);
    }

    #[test]
    fn test_thrown_rock_flies_right() {
        let mut w = flat_world();
        let result = tick(&mut w, &[PlayerCommand::ThrowRock]);
        assert_eq!(w.projectile_count(), 1);
        assert_eq!(
            count(&result.events, |d| matches!(d, GameEventData::ProjectileFired { kind: ProjectileKind::Rock, .. })),
            1
        );
    }

    #[test]
    fn test_rock_thrown_off_the_level_is_removed() {
        // Floor only spans x in [-12, -8]
        let mut w = world_with(SimConfig::default(), 1);
        w.add_terrain(FixedVec2::from_ints(-10, -15), FixedVec2::from_ints(2, 1));
        run(&mut w, 60);
        tick(&mut w, &[PlayerCommand::ThrowRock]);
        assert_eq!(w.projectile_count(), 1);

        let events = run(&mut w, 300);
        assert_eq!(w.projectile_count(), 0);
        assert_eq!(
            count(&events, |d| matches!(d, GameEventData::EntityRemoved { entity: EntityRef::Projectile(_) })),
            1
        );
    }

    #[test]
    fn test_projectile_removed_after_lifetime() {
        let mut config = SimConfig::default();
        config.charge.projectile_gravity_scale = 0;
        config.world.projectile_lifetime_ticks = 30;
        let mut w = world_with(config, 1);
        let mut fx = Effects::new(0);
        fx.spawn_projectile(ProjectileKind::Nubella, FixedVec2::from_ints(0, 5), FixedVec2::ZERO, 0);
        w.flush(fx);

        run(&mut w, 29);
        assert_eq!(w.projectile_count(), 1, "still hovering");
        run(&mut w, 1);
        assert_eq!(w.projectile_count(), 0);
    }

    #[test]
    fn test_walk_speeds_come_from_config() {
        let mut config = SimConfig::default();
        config.player.walk_speed_right = to_fixed(12.0);
        config.player.walk_speed_left = to_fixed(7.0);
        let mut w = world_with(config, 1);
        w.add_terrain(FixedVec2::from_ints(0, -15), FixedVec2::from_ints(60, 1));

        tick(&mut w, &[PlayerCommand::WalkRight]);
        assert_eq!(w.player_velocity().map(|v| v.x), Some(to_fixed(12.0)));
        assert!(w.player().facing_right());

        tick(&mut w, &[PlayerCommand::WalkLeft]);
        assert_eq!(w.player_velocity().map(|v| v.x), Some(to_fixed(-7.0)));
        assert!(!w.player().facing_right());
        assert_eq!(w.player().state(), PlayerState::Walking);
    }

    #[test]
    fn test_fall_respawns_after_grace_with_health_kept() {
        // Floor only spans x in [-20, 0]
        let mut w = world_with(SimConfig::default(), 1);
        w.add_terrain(FixedVec2::from_ints(-10, -15), FixedVec2::from_ints(10, 1));
        w.player_mut().set_health(5);
        let body = w.player().body();
        w.physics_mut().set_position(body, FixedVec2::from_ints(10, 0));

        let mut game_over_at = None;
        let mut respawned_at = None;
        for _ in 0..400 {
            let result = tick(&mut w, &[]);
            for event in &result.events {
                match event.data {
                    GameEventData::GameOver { cause } => {
                        assert_eq!(cause, GameOverCause::Fell);
                        game_over_at = Some(event.tick);
                    }
                    GameEventData::PlayerRespawned { .. } => respawned_at = Some(event.tick),
                    _ => {}
                }
            }
            if respawned_at.is_some() {
                break;
            }
        }

        let (fell, back) = (game_over_at.unwrap(), respawned_at.unwrap());
        assert_eq!(back - fell, 120);
        assert_eq!(w.player_position(), Some(FixedVec2::from_ints(-10, -13)));
        assert_eq!(w.player_velocity(), Some(FixedVec2::ZERO));
        assert_eq!(w.health(), 5);
        assert!(!w.is_game_over());
    }

    #[test]
    fn test_defeat_respawn_restores_health() {
        let mut w = flat_world();
        w.player_mut().set_health(0);
        let first = tick(&mut w, &[]);
        assert!(first.game_over);
        run(&mut w, 119);
        assert!(!w.is_game_over());
        assert_eq!(w.health(), 100);
    }

    #[test]
    fn test_commands_ignored_during_game_over() {
        let mut w = flat_world();
        w.player_mut().set_health(0);
        tick(&mut w, &[]);
        let result = tick(&mut w, &[PlayerCommand::ThrowRock, PlayerCommand::Jump]);
        assert!(result.game_over);
        assert_eq!(w.projectile_count(), 0);
    }

    #[test]
    fn test_scratching_breaks_crate_for_ammo() {
        let mut w = flat_world();
        let crate_id = w.add_crate(FixedVec2::from_ints(-7, -13));
        tick(&mut w, &[PlayerCommand::Scratch]);
        assert_eq!(w.player().state(), PlayerState::Scratching);
        assert_eq!(w.player().scratch_target(), Some(crate_id));

        let events = run(&mut w, 249);
        assert!(w.destructible(crate_id).is_none());
        assert_eq!(count(&events, |d| matches!(d, GameEventData::DestructibleDamaged { .. })), 8);
        assert_eq!(count(&events, |d| matches!(d, GameEventData::DestructibleBroken { .. })), 1);
        assert_eq!(w.pickups(), vec![(PickupKind::SpecialAmmo, FixedVec2::from_ints(-7, -13))]);
        assert_eq!(w.player().state(), PlayerState::Idle);
    }

    #[test]
    fn test_scratch_out_of_range_is_ignored() {
        let mut w = flat_world();
        w.add_crate(FixedVec2::from_ints(10, -13));
        tick(&mut w, &[PlayerCommand::Scratch]);
        assert_eq!(w.player().state(), PlayerState::Idle);
    }

    #[test]
    fn test_crate_at_exactly_melee_range_is_ignored() {
        let mut w = flat_world();
        w.add_crate(FixedVec2::from_ints(-5, -13));
        tick(&mut w, &[PlayerCommand::Scratch]);
        assert_eq!(w.player().state(), PlayerState::Idle);
        assert_eq!(w.player().scratch_target(), None);
    }

    #[test]
    fn test_pickup_collected_once() {
        let mut w = flat_world();
        w.add_pickup(PickupKind::Food, FixedVec2::from_ints(-10, -13));
        let events = run(&mut w, 10);
        assert_eq!(w.food(), 1);
        assert!(w.pickups().is_empty());
        assert_eq!(count(&events, |d| matches!(d, GameEventData::PickupCollected { .. })), 1);
    }

    #[test]
    fn test_goal_completes_level_once() {
        let mut w = flat_world();
        w.add_goal(FixedVec2::from_ints(-10, -13), FixedVec2::from_ints(1, 1));
        let first = tick(&mut w, &[]);
        assert!(first.level_completed);
        assert!(w.is_level_completed());
        assert!(!tick(&mut w, &[]).level_completed);
    }

    #[test]
    fn test_laundry_drops_rug_once_after_delay() {
        let mut w = flat_world();
        let line = w.add_laundry(FixedVec2::from_ints(-10, -12), FixedVec2::from_ints(20, -13));
        let first = tick(&mut w, &[]);
        assert!(w.laundry_line(line).is_some_and(|l| l.is_swaying()));
        assert_eq!(count(&first.events, |d| matches!(d, GameEventData::RugDropped { .. })), 0);

        let events = run(&mut w, 300);
        let drops: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::RugDropped { .. }))
            .map(|e| e.tick)
            .collect();
        assert_eq!(drops, vec![211]);
        assert_eq!(w.pickups(), vec![(PickupKind::Shield, FixedVec2::from_ints(20, -13))]);
    }

    #[test]
    fn test_thief_steals_then_retreats_for_good() {
        let mut config = SimConfig::default();
        config.spawn.interval_ticks = 10;
        let mut w = world_with(config, 2);
        w.add_terrain(FixedVec2::from_ints(0, -15), FixedVec2::from_ints(60, 1));
        w.player_mut().set_food(2);

        let mut thief = None;
        let mut stolen_at = None;
        for _ in 0..600 {
            for event in tick(&mut w, &[]).events {
                match event.data {
                    GameEventData::ThiefSpawned { id, .. } if thief.is_none() => thief = Some(id),
                    GameEventData::FoodStolen { food_left, .. } => {
                        assert_eq!(food_left, 1);
                        stolen_at = Some(event.tick);
                    }
                    _ => {}
                }
            }
            if stolen_at.is_some() {
                break;
            }
        }
        let thief = thief.unwrap();
        assert!(stolen_at.is_some(), "thief reached the player");
        assert_eq!(w.food(), 1);
        assert_eq!(w.thief(thief).map(|t| t.state()), Some(ThiefState::Steal));

        tick(&mut w, &[]);
        assert_eq!(w.thief(thief).map(|t| t.state()), Some(ThiefState::Retreat));

        let mut gone = false;
        for _ in 0..160 {
            tick(&mut w, &[]);
            match w.thief(thief) {
                Some(t) => assert_eq!(t.state(), ThiefState::Retreat, "never approaches again"),
                None => {
                    gone = true;
                    break;
                }
            }
        }
        assert!(gone);
        assert_ne!(w.active_thief(), Some(thief));
        assert_eq!(w.food(), 1);
    }

    #[test]
    fn test_no_thief_below_min_level() {
        let mut config = SimConfig::default();
        config.spawn.interval_ticks = 10;
        let mut w = world_with(config, 1);
        w.player_mut().set_food(3);
        run(&mut w, 100);
        assert_eq!(w.thieves().count(), 0);
    }

    fn scripted_world() -> World {
        let mut w = flat_world();
        w.add_pigeon(FixedVec2::from_ints(0, -8));
        w.add_crate(FixedVec2::from_ints(-5, -13));
        w.add_platform(
            crate::game::platform::Axis::Horizontal,
            FixedVec2::from_ints(10, -10),
            FixedVec2::from_ints(2, 0),
            (FIXED_ONE * 5, FIXED_ONE * 15),
            None,
        );
        w
    }

    fn script(t: u32) -> Vec<PlayerCommand> {
        match t % 90 {
            0 => vec![PlayerCommand::WalkRight],
            20 => vec![PlayerCommand::Jump],
            40 => vec![PlayerCommand::StopWalking, PlayerCommand::ThrowRock],
            60 => vec![PlayerCommand::WalkLeft],
            80 => vec![PlayerCommand::StopWalking],
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_same_commands_same_hash() {
        let frames: Vec<Vec<PlayerCommand>> = (0..600).map(script).collect();
        let mut a = scripted_world();
        let mut b = scripted_world();
        for commands in &frames {
            tick(&mut a, commands);
            tick(&mut b, commands);
            assert_eq!(a.state_hash(), b.state_hash());
        }

        let mut c = scripted_world();
        let results = replay(&mut c, &frames);
        assert_eq!(results.len(), 600);
        assert_eq!(c.state_hash(), a.state_hash());
    }

    #[test]
    fn test_different_commands_diverge() {
        let mut a = scripted_world();
        let mut b = scripted_world();
        tick(&mut a, &[PlayerCommand::WalkRight]);
        tick(&mut b, &[]);
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
