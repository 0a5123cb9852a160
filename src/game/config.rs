//! Simulation Configuration
//!
//! Every gameplay constant lives in one of these structs. `Default`
//! reproduces the shipped tuning; a JSON file may override any subset of
//! fields. Durations are in ticks (60 per second) and distances, speeds and
//! scales are raw Q16.16 values, the same representation the tick loop uses.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};
use crate::core::vec2::FixedVec2;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is not usable.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// World-level constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// RNG seed
    pub seed: u64,
    /// Player spawn and respawn position
    pub start_position: FixedVec2,
    /// Falling below this y triggers game over
    pub fall_threshold: Fixed,
    /// Grace period between game over and respawn
    pub respawn_delay_ticks: u32,
    /// Projectiles still in flight after this many ticks are removed
    pub projectile_lifetime_ticks: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_CA7,
            start_position: FixedVec2::from_ints(-10, -13),
            fall_threshold: to_fixed(-20.0),
            respawn_delay_ticks: 120,
            projectile_lifetime_ticks: 600,
        }
    }
}

/// Player movement, actions and animation cadences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Health cap (and starting health)
    pub max_health: i32,
    /// Collision box half extents
    pub half_extents: FixedVec2,
    /// Gravity multiplier
    pub gravity_scale: Fixed,
    /// Vertical launch speed of a jump
    pub jump_speed: Fixed,
    /// Input speed walking right
    pub walk_speed_right: Fixed,
    /// Input speed walking left (magnitude)
    pub walk_speed_left: Fixed,
    /// Health restored by eating one food
    pub eat_heal: i32,
    /// Duration of the eating state
    pub eat_ticks: u32,
    /// Walk animation frame cadence
    pub walk_frame_ticks: u32,
    /// Scratch animation frame cadence
    pub scratch_frame_ticks: u32,
    /// Melee damage cadence
    pub scratch_damage_ticks: u32,
    /// Maximum distance to a scratch target
    pub melee_range: Fixed,
    /// Rock spawn offset (mirrored when facing left)
    pub rock_offset: FixedVec2,
    /// Rock launch velocity (mirrored when facing left)
    pub rock_velocity: FixedVec2,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            half_extents: FixedVec2::new(to_fixed(1.2), FIXED_ONE),
            gravity_scale: to_fixed(2.0),
            jump_speed: to_fixed(20.0),
            walk_speed_right: to_fixed(20.0),
            walk_speed_left: to_fixed(10.0),
            eat_heal: 10,
            eat_ticks: 60,
            walk_frame_ticks: 10,
            scratch_frame_ticks: 10,
            scratch_damage_ticks: 30,
            melee_range: to_fixed(5.0),
            rock_offset: FixedVec2::new(to_fixed(1.5), to_fixed(3.0)),
            rock_velocity: FixedVec2::new(to_fixed(10.0), to_fixed(3.0)),
        }
    }
}

/// Charge-and-release special projectile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// Hold time that fills the charge bar
    pub full_ticks: u32,
    /// Ticks per unit of launch power
    pub power_scale_ticks: u32,
    /// Hard cap on launch power
    pub power_cap: Fixed,
    /// Minimum hold before a press becomes a charge
    pub release_delay_ticks: u32,
    /// Spawn offset (mirrored when facing left)
    pub launch_offset: FixedVec2,
    /// Vertical launch speed
    pub launch_lift: Fixed,
    /// Gravity multiplier of the projectile
    pub projectile_gravity_scale: Fixed,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            full_ticks: 120,
            power_scale_ticks: 6,
            power_cap: to_fixed(20.0),
            release_delay_ticks: 12,
            launch_offset: FixedVec2::new(to_fixed(2.0), to_fixed(3.0)),
            launch_lift: to_fixed(2.0),
            projectile_gravity_scale: to_fixed(0.3),
        }
    }
}

/// Patrol/attack enemy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PigeonConfig {
    /// Hit-units absorbed before dying
    pub max_hits: i32,
    /// Collision box half extents
    pub half_extents: FixedVec2,
    /// Horizontal patrol speed
    pub patrol_speed: Fixed,
    /// Speed while diving at the player
    pub attack_speed: Fixed,
    /// Player distance that triggers an attack
    pub attack_range: Fixed,
    /// Patrol direction flip period
    pub flip_ticks: u32,
    /// Attack decision period
    pub attack_check_ticks: u32,
    /// Damage dealt on contact
    pub contact_damage: i32,
    /// Lockout after a successful contact
    pub cooldown_ticks: u32,
}

impl Default for PigeonConfig {
    fn default() -> Self {
        Self {
            max_hits: 2,
            half_extents: FixedVec2::new(to_fixed(1.5), to_fixed(0.7)),
            patrol_speed: to_fixed(2.0),
            attack_speed: to_fixed(3.0),
            attack_range: to_fixed(6.0),
            flip_ticks: 120,
            attack_check_ticks: 30,
            contact_damage: 10,
            cooldown_ticks: 300,
        }
    }
}

/// Steal/retreat enemy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThiefConfig {
    /// Hit-units absorbed before fleeing
    pub max_hits: i32,
    /// Collision box half extents
    pub half_extents: FixedVec2,
    /// Gravity multiplier
    pub gravity_scale: Fixed,
    /// Spawn offset from the player (x mirrored to a random side)
    pub spawn_offset: FixedVec2,
    /// Horizontal approach speed
    pub approach_speed: Fixed,
    /// Horizontal retreat speed
    pub retreat_speed: Fixed,
    /// Approach ticks between hisses
    pub hiss_after_ticks: u32,
    /// Duration of a hiss
    pub hiss_ticks: u32,
    /// Horizontal speed under which the thief counts as stuck
    pub stuck_speed: Fixed,
    /// Stuck ticks between escape impulses
    pub stuck_impulse_ticks: u32,
    /// Stuck ticks that force removal
    pub stuck_limit_ticks: u32,
    /// Escape impulse (x mirrored toward the player)
    pub escape_impulse: FixedVec2,
    /// Pause between stealing and running off
    pub steal_pause_ticks: u32,
    /// Lifetime once retreating
    pub retreat_ticks: u32,
    /// Distance from the player that forces removal
    pub leash_distance: Fixed,
    /// Falling below this y forces removal
    pub floor_y: Fixed,
}

impl Default for ThiefConfig {
    fn default() -> Self {
        Self {
            max_hits: 4,
            half_extents: FixedVec2::new(to_fixed(1.2), to_fixed(0.6)),
            gravity_scale: to_fixed(2.0),
            spawn_offset: FixedVec2::new(to_fixed(10.0), to_fixed(4.0)),
            approach_speed: to_fixed(2.5),
            retreat_speed: to_fixed(6.0),
            hiss_after_ticks: 480,
            hiss_ticks: 180,
            stuck_speed: to_fixed(0.3),
            stuck_impulse_ticks: 50,
            stuck_limit_ticks: 100,
            escape_impulse: FixedVec2::new(to_fixed(20.0), to_fixed(25.0)),
            steal_pause_ticks: 1,
            retreat_ticks: 150,
            leash_distance: to_fixed(20.0),
            floor_y: to_fixed(-20.0),
        }
    }
}

/// Thief spawn gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// First level with thieves
    pub min_level: u32,
    /// Ticks accumulated between spawns
    pub interval_ticks: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_level: 2,
            interval_ticks: 2400,
        }
    }
}

/// Moving platforms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Speed used when a level does not pick one
    pub default_speed: Fixed,
    /// Per-tick displacement is `speed * step_factor`
    pub step_factor: Fixed,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            default_speed: to_fixed(1.5),
            step_factor: to_fixed(0.05),
        }
    }
}

/// Props: rolling bucket, laundry line, ladder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Horizontal player distance that starts the bucket rolling
    pub bucket_trigger_range: Fixed,
    /// Bucket proximity check period
    pub bucket_check_ticks: u32,
    /// Bucket lifetime once rolling
    pub bucket_lifetime_ticks: u32,
    /// Damage to an unshielded player
    pub bucket_damage: i32,
    /// Kick applied when rolling starts
    pub bucket_impulse: FixedVec2,
    /// Gravity multiplier once rolling
    pub bucket_gravity_scale: Fixed,
    /// Delay between touching the laundry line and the rug falling
    pub laundry_drop_ticks: u32,
    /// How close to a ladder end the player must be to climb
    pub ladder_reach: Fixed,
    /// Offset from the opposite ladder end where the player lands
    pub ladder_exit_offset: FixedVec2,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            bucket_trigger_range: to_fixed(8.0),
            bucket_check_ticks: 12,
            bucket_lifetime_ticks: 600,
            bucket_damage: 15,
            bucket_impulse: FixedVec2::new(to_fixed(-1.0), 0),
            bucket_gravity_scale: to_fixed(2.0),
            laundry_drop_ticks: 210,
            ladder_reach: to_fixed(1.5),
            ladder_exit_offset: FixedVec2::from_ints(2, 2),
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World constants
    pub world: WorldConfig,
    /// Player constants
    pub player: PlayerConfig,
    /// Special projectile charge
    pub charge: ChargeConfig,
    /// Patrol/attack enemy
    pub pigeon: PigeonConfig,
    /// Steal/retreat enemy
    pub thief: ThiefConfig,
    /// Thief spawn gate
    pub spawn: SpawnConfig,
    /// Moving platforms
    pub platform: PlatformConfig,
    /// Props
    pub hazard: HazardConfig,
}

fn positive_ticks(value: u32, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid { field, reason: "must be at least one tick" });
    }
    Ok(())
}

fn positive(value: i32, field: &'static str) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid { field, reason: "must be positive" });
    }
    Ok(())
}

impl SimConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every period, duration and cap the tick loop divides or counts by.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_ticks(self.world.respawn_delay_ticks, "world.respawn_delay_ticks")?;
        positive_ticks(self.world.projectile_lifetime_ticks, "world.projectile_lifetime_ticks")?;
        positive(self.player.max_health, "player.max_health")?;
        positive_ticks(self.player.eat_ticks, "player.eat_ticks")?;
        positive_ticks(self.player.walk_frame_ticks, "player.walk_frame_ticks")?;
        positive_ticks(self.player.scratch_frame_ticks, "player.scratch_frame_ticks")?;
        positive_ticks(self.player.scratch_damage_ticks, "player.scratch_damage_ticks")?;
        positive_ticks(self.charge.full_ticks, "charge.full_ticks")?;
        positive_ticks(self.charge.power_scale_ticks, "charge.power_scale_ticks")?;
        positive(self.charge.power_cap, "charge.power_cap")?;
        positive(self.pigeon.max_hits, "pigeon.max_hits")?;
        positive_ticks(self.pigeon.flip_ticks, "pigeon.flip_ticks")?;
        positive_ticks(self.pigeon.attack_check_ticks, "pigeon.attack_check_ticks")?;
        positive_ticks(self.pigeon.cooldown_ticks, "pigeon.cooldown_ticks")?;
        positive(self.thief.max_hits, "thief.max_hits")?;
        positive_ticks(self.thief.stuck_impulse_ticks, "thief.stuck_impulse_ticks")?;
        positive_ticks(self.thief.retreat_ticks, "thief.retreat_ticks")?;
        positive_ticks(self.spawn.interval_ticks, "spawn.interval_ticks")?;
        positive(self.platform.step_factor, "platform.step_factor")?;
        positive_ticks(self.hazard.bucket_check_ticks, "hazard.bucket_check_ticks")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "pigeon": { "max_hits": 3 } }"#).unwrap();
        assert_eq!(config.pigeon.max_hits, 3);
        assert_eq!(config.pigeon.cooldown_ticks, 300);
        assert_eq!(config.charge, ChargeConfig::default());
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = SimConfig::from_json(r#"{ "charge": { "power_scale_ticks": 0 } }"#).unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "charge.power_scale_ticks"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_projectile_lifetime_rejected() {
        let err = SimConfig::from_json(r#"{ "world": { "projectile_lifetime_ticks": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "world.projectile_lifetime_ticks", .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(SimConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimConfig::from_json(&json).unwrap(), config);
    }
}
