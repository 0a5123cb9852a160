//! World State
//!
//! The world exclusively owns the player, every entity registry, the physics
//! solver and the audio sink. Registries are `BTreeMap`s keyed by
//! [`EntityId`] so iteration order never depends on allocation.
//!
//! Entities refer to each other by [`EntityRef`]. Physics bodies map back to
//! their owner through `owners`, which is how contact events find the
//! entity that should handle them.
//!
//! Removal is idempotent and ordered: the entity leaves its registry, its
//! scheduled tasks are cancelled, then its bodies are freed.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::ability::ChargeTrigger;
use crate::game::audio::{AudioSink, TracingAudio};
use crate::game::combat::{Projectile, ProjectileKind};
use crate::game::config::SimConfig;
use crate::game::destructible::{CardboardBox, Destructible};
use crate::game::effects::{Command, Effects};
use crate::game::entity::{EntityId, EntityRef};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::pickup::{Pickup, PickupKind};
use crate::game::pigeon::Pigeon;
use crate::game::platform::{Axis, MovingPlatform};
use crate::game::player::Player;
use crate::game::props::{Goal, Ladder, LaundryLine, RollingBucket};
use crate::game::save::SaveData;
use crate::game::spawn::{GameOverWatch, ThiefSpawner};
use crate::game::thief::{self, Thief};
use crate::game::timer::Scheduler;
use crate::physics::{BodyDesc, BodyHandle, KinematicWorld, PhysicsWorld};

/// Pickup sensor half extents.
const PICKUP_HALF_EXTENTS: FixedVec2 = FixedVec2::new(to_fixed(0.5), to_fixed(0.5));

/// Crate half extents.
const CRATE_HALF_EXTENTS: FixedVec2 = FixedVec2::from_ints(1, 1);

/// Bucket half extents.
const BUCKET_HALF_EXTENTS: FixedVec2 = FixedVec2::new(to_fixed(0.75), to_fixed(0.75));

/// Ladder end sensor half extents.
const LADDER_SENSOR_HALF_EXTENTS: FixedVec2 = FixedVec2::new(to_fixed(0.4), to_fixed(0.2));

/// Height of one ladder section.
const LADDER_SECTION: Fixed = to_fixed(4.0);

/// Laundry trigger region, hanging one unit below the line.
const LAUNDRY_SENSOR_HALF_EXTENTS: FixedVec2 = FixedVec2::from_ints(10, 1);

/// State carried from a finished level into the next world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carryover {
    /// Player health
    pub health: i32,
    /// Food count
    pub food: u32,
}

/// Builds a [`World`] with injected collaborators.
pub struct WorldBuilder {
    config: SimConfig,
    level: u32,
    physics: Option<Box<dyn PhysicsWorld>>,
    audio: Option<Box<dyn AudioSink>>,
    carryover: Option<Carryover>,
}

impl WorldBuilder {
    /// Start from a config. Level 1, reference solver, tracing audio.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            level: 1,
            physics: None,
            audio: None,
            carryover: None,
        }
    }

    /// Level number (gates thief spawns).
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Physics solver to drive.
    pub fn physics(mut self, physics: Box<dyn PhysicsWorld>) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Audio sink to notify.
    pub fn audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Player health and food from the previous level.
    pub fn carryover(mut self, carryover: Carryover) -> Self {
        self.carryover = Some(carryover);
        self
    }

    /// Create the world and the player body at the start position.
    pub fn build(self) -> World {
        let config = self.config;
        let mut physics = self.physics.unwrap_or_else(|| Box::new(KinematicWorld::new()));
        let audio = self.audio.unwrap_or_else(|| Box::new(TracingAudio));

        let body = physics.create_body(
            BodyDesc::dynamic(config.world.start_position, config.player.half_extents)
                .with_gravity_scale(config.player.gravity_scale),
        );
        let mut player = Player::new(body, config.player.clone(), config.charge.clone());
        if let Some(carry) = self.carryover {
            player.set_health(carry.health);
            player.set_food(carry.food);
        }

        let mut owners = BTreeMap::new();
        owners.insert(body, EntityRef::Player);

        info!(level = self.level, seed = config.world.seed, "world created");

        World {
            tick: 0,
            level: self.level,
            rng: DeterministicRng::new(config.world.seed),
            spawner: ThiefSpawner::new(&config.spawn),
            game_over: GameOverWatch::new(&config.world),
            config,
            physics,
            audio,
            next_id: 1,
            player,
            charge_trigger: ChargeTrigger::default(),
            pigeons: BTreeMap::new(),
            thieves: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            destructibles: BTreeMap::new(),
            pickups: BTreeMap::new(),
            platforms: BTreeMap::new(),
            ladders: BTreeMap::new(),
            laundry: BTreeMap::new(),
            buckets: BTreeMap::new(),
            goals: BTreeMap::new(),
            terrain: BTreeMap::new(),
            owners,
            scheduler: Scheduler::new(),
            events: Vec::new(),
            level_completed: false,
        }
    }
}

/// The simulation world.
pub struct World {
    pub(crate) tick: u32,
    pub(crate) level: u32,
    pub(crate) config: SimConfig,
    pub(crate) physics: Box<dyn PhysicsWorld>,
    pub(crate) audio: Box<dyn AudioSink>,
    pub(crate) rng: DeterministicRng,
    next_id: u32,
    pub(crate) player: Player,
    pub(crate) charge_trigger: ChargeTrigger,
    pub(crate) pigeons: BTreeMap<EntityId, Pigeon>,
    pub(crate) thieves: BTreeMap<EntityId, Thief>,
    pub(crate) projectiles: BTreeMap<EntityId, Projectile>,
    pub(crate) destructibles: BTreeMap<EntityId, Box<dyn Destructible>>,
    pub(crate) pickups: BTreeMap<EntityId, Pickup>,
    pub(crate) platforms: BTreeMap<EntityId, MovingPlatform>,
    pub(crate) ladders: BTreeMap<EntityId, Ladder>,
    pub(crate) laundry: BTreeMap<EntityId, LaundryLine>,
    pub(crate) buckets: BTreeMap<EntityId, RollingBucket>,
    pub(crate) goals: BTreeMap<EntityId, Goal>,
    pub(crate) terrain: BTreeMap<EntityId, BodyHandle>,
    pub(crate) owners: BTreeMap<BodyHandle, EntityRef>,
    pub(crate) scheduler: Scheduler,
    pub(crate) spawner: ThiefSpawner,
    pub(crate) game_over: GameOverWatch,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) level_completed: bool,
}

impl World {
    /// World with default collaborators.
    pub fn new(config: SimConfig) -> Self {
        WorldBuilder::new(config).build()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, body: BodyHandle, owner: EntityRef) {
        self.owners.insert(body, owner);
    }

    // =========================================================================
    // Level authoring
    // =========================================================================

    /// Static ground or wall.
    pub fn add_terrain(&mut self, position: FixedVec2, half_extents: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let body = self.physics.create_body(BodyDesc::fixed(position, half_extents));
        self.terrain.insert(id, body);
        self.register(body, EntityRef::Terrain(id));
        id
    }

    /// Patrol/attack enemy. Pigeons fly, so gravity is off.
    pub fn add_pigeon(&mut self, position: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let config = self.config.pigeon.clone();
        let body = self
            .physics
            .create_body(BodyDesc::dynamic(position, config.half_extents).with_gravity_scale(0));
        self.pigeons.insert(id, Pigeon::new(id, body, config));
        self.register(body, EntityRef::Pigeon(id));
        debug!(pigeon = %id, %position, "pigeon added");
        id
    }

    /// Breakable crate.
    pub fn add_crate(&mut self, position: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let body = self.physics.create_body(BodyDesc::fixed(position, CRATE_HALF_EXTENTS));
        self.destructibles.insert(id, Box::new(CardboardBox::new(id, body, position)));
        self.register(body, EntityRef::Destructible(id));
        id
    }

    /// Collectible sensor.
    pub fn add_pickup(&mut self, kind: PickupKind, position: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let body = self.physics.create_body(BodyDesc::sensor(position, PICKUP_HALF_EXTENTS));
        self.pickups.insert(id, Pickup::new(id, body, kind));
        self.register(body, EntityRef::Pickup(id));
        id
    }

    /// Moving platform between `limits` along `axis`. `None` speed uses the
    /// configured default.
    pub fn add_platform(
        &mut self,
        axis: Axis,
        origin: FixedVec2,
        half_extents: FixedVec2,
        limits: (Fixed, Fixed),
        speed: Option<Fixed>,
    ) -> EntityId {
        let id = self.allocate_id();
        let body = self.physics.create_body(BodyDesc::kinematic(origin, half_extents));
        let speed = speed.unwrap_or(self.config.platform.default_speed);
        let platform = MovingPlatform::new(id, body, axis, origin, limits, speed, self.config.platform.step_factor);
        self.platforms.insert(id, platform);
        self.register(body, EntityRef::Platform(id));
        id
    }

    /// Ladder standing on `base`, rounded to whole sections.
    pub fn add_ladder(&mut self, base: FixedVec2, height: Fixed) -> EntityId {
        let id = self.allocate_id();
        let sections = ((height + LADDER_SECTION / 2) / LADDER_SECTION).max(1);
        let top_position = base + FixedVec2::new(0, LADDER_SECTION * sections);

        let bottom = self.physics.create_body(BodyDesc::sensor(base, LADDER_SENSOR_HALF_EXTENTS));
        let top = self.physics.create_body(BodyDesc::sensor(top_position, LADDER_SENSOR_HALF_EXTENTS));
        let ladder = Ladder::new(id, (bottom, base), (top, top_position), &self.config.hazard);
        self.ladders.insert(id, ladder);
        self.register(bottom, EntityRef::Ladder(id));
        self.register(top, EntityRef::Ladder(id));
        id
    }

    /// Laundry line that drops a rug at `drop_position`.
    pub fn add_laundry(&mut self, position: FixedVec2, drop_position: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let sensor_at = position - FixedVec2::from_ints(0, 1);
        let body = self.physics.create_body(BodyDesc::sensor(sensor_at, LAUNDRY_SENSOR_HALF_EXTENTS));
        self.laundry.insert(id, LaundryLine::new(id, body, drop_position, &self.config.hazard));
        self.register(body, EntityRef::Laundry(id));
        id
    }

    /// Rolling bucket, hanging still until triggered.
    pub fn add_bucket(&mut self, position: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let body = self
            .physics
            .create_body(BodyDesc::dynamic(position, BUCKET_HALF_EXTENTS).with_gravity_scale(0));
        self.buckets.insert(id, RollingBucket::new(id, body, self.config.hazard.clone()));
        self.register(body, EntityRef::Bucket(id));
        id
    }

    /// Level exit.
    pub fn add_goal(&mut self, position: FixedVec2, half_extents: FixedVec2) -> EntityId {
        let id = self.allocate_id();
        let body = self.physics.create_body(BodyDesc::sensor(position, half_extents));
        self.goals.insert(id, Goal::new(body));
        self.register(body, EntityRef::Goal(id));
        id
    }

    /// Spawn a thief next to the player and latch the spawn gate.
    pub fn spawn_thief(&mut self) -> Option<EntityId> {
        let player_at = self.physics.position(self.player.body())?;
        let config = self.config.thief.clone();
        let (position, facing_right) = thief::spawn_point(player_at, &mut self.rng, &config);

        let id = self.allocate_id();
        let speed = if facing_right { config.approach_speed } else { -config.approach_speed };
        let body = self.physics.create_body(
            BodyDesc::dynamic(position, config.half_extents)
                .with_gravity_scale(config.gravity_scale)
                .with_velocity(FixedVec2::new(speed, 0)),
        );
        self.thieves.insert(id, Thief::new(id, body, facing_right, config));
        self.register(body, EntityRef::Thief(id));
        self.spawner.latch(id);
        self.events.push(GameEvent::new(self.tick, GameEventData::ThiefSpawned { id, position }));
        info!(thief = %id, %position, "thief spawned");
        Some(id)
    }

    fn spawn_projectile(&mut self, kind: ProjectileKind, position: FixedVec2, velocity: FixedVec2, power: Fixed) {
        let id = self.allocate_id();
        let gravity = match kind {
            ProjectileKind::Rock => FIXED_ONE,
            ProjectileKind::Nubella => self.config.charge.projectile_gravity_scale,
        };
        let body = self.physics.create_body(
            BodyDesc::dynamic(position, kind.half_extents())
                .with_velocity(velocity)
                .with_gravity_scale(gravity),
        );
        self.projectiles.insert(id, Projectile::new(id, body, kind, power, self.tick));
        self.register(body, EntityRef::Projectile(id));
        self.events.push(GameEvent::new(
            self.tick,
            GameEventData::ProjectileFired { projectile: id, kind, power },
        ));
    }

    // =========================================================================
    // Deferred mutation
    // =========================================================================

    /// Whether `entity` is still registered.
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Player => true,
            EntityRef::Pigeon(id) => self.pigeons.contains_key(&id),
            EntityRef::Thief(id) => self.thieves.contains_key(&id),
            EntityRef::Projectile(id) => self.projectiles.contains_key(&id),
            EntityRef::Destructible(id) => self.destructibles.contains_key(&id),
            EntityRef::Pickup(id) => self.pickups.contains_key(&id),
            EntityRef::Platform(id) => self.platforms.contains_key(&id),
            EntityRef::Ladder(id) => self.ladders.contains_key(&id),
            EntityRef::Laundry(id) => self.laundry.contains_key(&id),
            EntityRef::Bucket(id) => self.buckets.contains_key(&id),
            EntityRef::Goal(id) => self.goals.contains_key(&id),
            EntityRef::Terrain(id) => self.terrain.contains_key(&id),
        }
    }

    /// Apply a phase's buffered commands and collect its events.
    pub(crate) fn flush(&mut self, fx: Effects) {
        let (commands, events) = fx.into_parts();
        self.events.extend(events);

        for command in commands {
            match command {
                Command::SpawnPickup { kind, position } => {
                    self.add_pickup(kind, position);
                    self.events.push(GameEvent::pickup_dropped(self.tick, kind, position));
                }
                Command::SpawnProjectile { kind, position, velocity, power } => {
                    self.spawn_projectile(kind, position, velocity, power);
                }
                Command::Despawn(entity) => {
                    self.despawn(entity);
                }
                Command::Schedule { owner, delay, action } => {
                    if self.contains(owner) {
                        self.scheduler.schedule(self.tick, delay, owner, action);
                    } else {
                        debug!(?owner, ?action, "dropping task for removed owner");
                    }
                }
                Command::Audio(command) => self.audio.dispatch(command),
            }
        }
    }

    /// Remove an entity. Returns false if it was already gone.
    pub fn despawn(&mut self, entity: EntityRef) -> bool {
        let bodies: Option<Vec<BodyHandle>> = match entity {
            EntityRef::Player => {
                warn!("refusing to despawn the player");
                return false;
            }
            EntityRef::Pigeon(id) => self.pigeons.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Thief(id) => self.thieves.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Projectile(id) => self.projectiles.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Destructible(id) => self.destructibles.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Pickup(id) => self.pickups.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Platform(id) => self.platforms.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Ladder(id) => self.ladders.remove(&id).map(|e| e.bodies().to_vec()),
            EntityRef::Laundry(id) => self.laundry.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Bucket(id) => self.buckets.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Goal(id) => self.goals.remove(&id).map(|e| vec![e.body()]),
            EntityRef::Terrain(id) => self.terrain.remove(&id).map(|body| vec![body]),
        };
        let Some(bodies) = bodies else {
            return false;
        };

        let cancelled = self.scheduler.cancel_owner(entity);
        for body in bodies {
            self.owners.remove(&body);
            self.physics.destroy_body(body);
        }
        if let EntityRef::Thief(id) = entity {
            self.spawner.release(id);
        }
        self.events.push(GameEvent::entity_removed(self.tick, entity));
        debug!(?entity, cancelled, "entity removed");
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current tick.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Level number.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The player.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Player body position.
    pub fn player_position(&self) -> Option<FixedVec2> {
        self.physics.position(self.player.body())
    }

    /// Player body velocity.
    pub fn player_velocity(&self) -> Option<FixedVec2> {
        self.physics.velocity(self.player.body())
    }

    /// Player health.
    pub fn health(&self) -> i32 {
        self.player.health()
    }

    /// Food count.
    pub fn food(&self) -> u32 {
        self.player.food()
    }

    /// Special ammo count.
    pub fn special_ammo(&self) -> u32 {
        self.player.special_ammo()
    }

    /// Shield charges.
    pub fn shield_charges(&self) -> u32 {
        self.player.shield_charges()
    }

    /// Charge progress in `[0, ONE]` right now.
    pub fn charge_progress(&self) -> Fixed {
        self.player.charge_progress(self.tick)
    }

    /// Live pigeons in id order.
    pub fn pigeons(&self) -> impl Iterator<Item = &Pigeon> {
        self.pigeons.values()
    }

    /// Live thieves in id order.
    pub fn thieves(&self) -> impl Iterator<Item = &Thief> {
        self.thieves.values()
    }

    /// Pigeon by id.
    pub fn pigeon(&self, id: EntityId) -> Option<&Pigeon> {
        self.pigeons.get(&id)
    }

    /// Thief by id.
    pub fn thief(&self, id: EntityId) -> Option<&Thief> {
        self.thieves.get(&id)
    }

    /// Destructible by id.
    pub fn destructible(&self, id: EntityId) -> Option<&dyn Destructible> {
        self.destructibles.get(&id).map(|d| &**d)
    }

    /// Live pickups with their positions, in id order.
    pub fn pickups(&self) -> Vec<(PickupKind, FixedVec2)> {
        self.pickups
            .values()
            .filter_map(|p| self.physics.position(p.body()).map(|at| (p.kind(), at)))
            .collect()
    }

    /// Projectiles in flight.
    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Platform by id.
    pub fn platform(&self, id: EntityId) -> Option<&MovingPlatform> {
        self.platforms.get(&id)
    }

    /// Rolling bucket by id.
    pub fn bucket(&self, id: EntityId) -> Option<&RollingBucket> {
        self.buckets.get(&id)
    }

    /// Laundry line by id.
    pub fn laundry_line(&self, id: EntityId) -> Option<&LaundryLine> {
        self.laundry.get(&id)
    }

    /// Whether a respawn grace period is running.
    pub fn is_game_over(&self) -> bool {
        self.game_over.is_pending()
    }

    /// Whether the goal was reached.
    pub fn is_level_completed(&self) -> bool {
        self.level_completed
    }

    /// Thief currently latched by the spawn gate.
    pub fn active_thief(&self) -> Option<EntityId> {
        self.spawner.active()
    }

    /// Pending scheduled tasks.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Physics solver.
    pub fn physics(&self) -> &dyn PhysicsWorld {
        self.physics.as_ref()
    }

    /// Physics solver, for level scripts that need direct body access.
    pub fn physics_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.physics.as_mut()
    }

    /// Mutable player, for level scripts and tests.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    // =========================================================================
    // Persistence and verification
    // =========================================================================

    /// Snapshot for the save collaborator.
    pub fn save_data(&self) -> SaveData {
        let (x, y) = self.player_position().unwrap_or_default().to_floats();
        SaveData {
            level: self.level,
            food: self.player.food(),
            health: self.player.health(),
            x,
            y,
        }
    }

    /// Restore player position, health and food from a save.
    pub fn apply_save(&mut self, data: &SaveData) {
        let position = FixedVec2::new(to_fixed(f64::from(data.x)), to_fixed(f64::from(data.y)));
        let body = self.player.body();
        self.physics.set_position(body, position);
        self.physics.set_velocity(body, FixedVec2::ZERO);
        self.player.set_health(data.health);
        self.player.set_food(data.food);
        if data.level != self.level {
            warn!(save = data.level, world = self.level, "save is for a different level");
        }
    }

    /// What the next level's world inherits.
    pub fn carryover(&self) -> Carryover {
        Carryover {
            health: self.player.health(),
            food: self.player.food(),
        }
    }

    /// SHA-256 over everything that affects future ticks.
    pub fn state_hash(&self) -> StateHash {
        let physics = self.physics.as_ref();
        let position = |body: BodyHandle| physics.position(body).unwrap_or_default();
        let velocity = |body: BodyHandle| physics.velocity(body).unwrap_or_default();

        compute_state_hash(self.tick, self.rng.state(), |h| {
            h.update_u32(self.level);
            h.update_bool(self.level_completed);
            self.player.hash_into(h);
            h.update_vec2(position(self.player.body()));
            h.update_vec2(velocity(self.player.body()));
            h.update_bool(self.charge_trigger.is_held());

            for (id, pigeon) in &self.pigeons {
                h.update_u32(id.0);
                pigeon.hash_into(h);
                h.update_vec2(position(pigeon.body()));
            }
            for (id, thief) in &self.thieves {
                h.update_u32(id.0);
                thief.hash_into(h);
                h.update_vec2(position(thief.body()));
            }
            for (id, projectile) in &self.projectiles {
                h.update_u32(id.0);
                projectile.hash_into(h);
                h.update_vec2(position(projectile.body()));
            }
            for (id, destructible) in &self.destructibles {
                h.update_u32(id.0);
                destructible.hash_into(h);
            }
            for (id, pickup) in &self.pickups {
                h.update_u32(id.0);
                pickup.hash_into(h, position(pickup.body()));
            }
            for (id, platform) in &self.platforms {
                h.update_u32(id.0);
                platform.hash_into(h);
            }
            for (id, line) in &self.laundry {
                h.update_u32(id.0);
                line.hash_into(h);
            }
            for (id, bucket) in &self.buckets {
                h.update_u32(id.0);
                bucket.hash_into(h);
                h.update_vec2(position(bucket.body()));
            }

            self.scheduler.hash_into(h);
            self.spawner.hash_into(h);
            self.game_over.hash_into(h);
        })
    }
}
