//! Spawn controller and game-over watch.
//!
//! Both run at the very start of every pre-step, before any entity hook.

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::game::config::{SpawnConfig, WorldConfig};
use crate::game::effects::Effects;
use crate::game::entity::EntityId;
use crate::game::events::GameEventData;
use crate::game::player::Player;
use crate::physics::PhysicsWorld;

// =============================================================================
// Thief spawn gate
// =============================================================================

/// Decides when a thief appears. At most one exists at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThiefSpawner {
    min_level: u32,
    interval: u32,
    counter: u32,
    latched: Option<EntityId>,
}

impl ThiefSpawner {
    /// New idle gate.
    pub fn new(config: &SpawnConfig) -> Self {
        Self {
            min_level: config.min_level,
            interval: config.interval_ticks.max(1),
            counter: 0,
            latched: None,
        }
    }

    /// Advance one tick. True when a thief should be spawned now.
    ///
    /// The counter only runs while no thief is latched, and keeps running
    /// past the threshold until the player has food to steal.
    pub fn should_spawn(&mut self, level: u32, food: u32) -> bool {
        if level < self.min_level || self.latched.is_some() {
            return false;
        }
        self.counter = self.counter.saturating_add(1);
        if self.counter >= self.interval && food > 0 {
            self.counter = 0;
            return true;
        }
        false
    }

    /// Record the spawned thief; blocks further spawns.
    pub fn latch(&mut self, id: EntityId) {
        self.latched = Some(id);
    }

    /// The entity left the world. Unlatches if it was the latched thief.
    pub fn release(&mut self, id: EntityId) -> bool {
        if self.latched == Some(id) {
            self.latched = None;
            return true;
        }
        false
    }

    /// Thief currently blocking spawns.
    pub fn active(&self) -> Option<EntityId> {
        self.latched
    }

    /// Ticks accumulated toward the next spawn.
    #[cfg(test)]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.counter);
        hasher.update_opt_u32(self.latched.map(|id| id.0));
    }
}

// =============================================================================
// Game over
// =============================================================================

/// Why the grace period started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverCause {
    /// Dropped below the fall threshold
    Fell,
    /// Health reached zero
    Defeated,
}

/// Watches for a lost player and counts down to the respawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOverWatch {
    fall_threshold: Fixed,
    delay: u32,
    pending: Option<(GameOverCause, u32)>,
}

impl GameOverWatch {
    /// New idle watch.
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            fall_threshold: config.fall_threshold,
            delay: config.respawn_delay_ticks.max(1),
            pending: None,
        }
    }

    /// Whether a grace period is running.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cause of the running grace period.
    pub fn cause(&self) -> Option<GameOverCause> {
        self.pending.map(|(cause, _)| cause)
    }

    /// Count down the grace period. Returns the cause on the tick the
    /// player should respawn.
    pub fn advance(&mut self) -> Option<GameOverCause> {
        let (cause, remaining) = self.pending.as_mut()?;
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            let cause = *cause;
            self.pending = None;
            return Some(cause);
        }
        None
    }

    /// Start a grace period if the player is lost. No-op while one runs.
    pub fn check(&mut self, player: &Player, physics: &dyn PhysicsWorld, fx: &mut Effects) -> Option<GameOverCause> {
        if self.pending.is_some() {
            return None;
        }
        let fell = physics
            .position(player.body())
            .is_some_and(|position| position.y < self.fall_threshold);
        let cause = if player.health() <= 0 {
            GameOverCause::Defeated
        } else if fell {
            GameOverCause::Fell
        } else {
            return None;
        };
        self.pending = Some((cause, self.delay));
        fx.emit(GameEventData::GameOver { cause });
        info!(?cause, "game over");
        Some(cause)
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        match self.pending {
            Some((cause, remaining)) => {
                hasher.update_u8(1 + cause as u8);
                hasher.update_u32(remaining);
            }
            None => hasher.update_u8(0),
        }
    }
}
