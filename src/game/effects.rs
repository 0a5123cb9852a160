//! Deferred world mutations.
//!
//! Hooks run while the world's registries are borrowed, so they never spawn
//! or remove entities themselves. They record what should happen here and
//! the world applies the buffer between phases, which keeps every registry
//! iteration free of half-destroyed entities.

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::audio::{AudioCommand, SoundCue};
use crate::game::combat::ProjectileKind;
use crate::game::entity::EntityRef;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::pickup::PickupKind;
use crate::game::timer::TaskAction;

/// One deferred world mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create a pickup sensor.
    SpawnPickup {
        kind: PickupKind,
        position: FixedVec2,
    },
    /// Create a projectile body.
    SpawnProjectile {
        kind: ProjectileKind,
        position: FixedVec2,
        velocity: FixedVec2,
        power: Fixed,
    },
    /// Remove an entity (idempotent).
    Despawn(EntityRef),
    /// Queue a task `delay` ticks from now.
    Schedule {
        owner: EntityRef,
        delay: u32,
        action: TaskAction,
    },
    /// Forward to the audio sink.
    Audio(AudioCommand),
}

/// Command and event buffer for one phase of one tick.
#[derive(Debug)]
pub struct Effects {
    tick: u32,
    commands: Vec<Command>,
    events: Vec<GameEvent>,
}

impl Effects {
    /// Empty buffer stamped with `tick`.
    pub fn new(tick: u32) -> Self {
        Self {
            tick,
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Record a game event.
    pub fn emit(&mut self, data: GameEventData) {
        self.events.push(GameEvent::new(self.tick, data));
    }

    /// Drop a pickup at `position`.
    pub fn spawn_pickup(&mut self, kind: PickupKind, position: FixedVec2) {
        self.commands.push(Command::SpawnPickup { kind, position });
    }

    /// Launch a projectile.
    pub fn spawn_projectile(
        &mut self,
        kind: ProjectileKind,
        position: FixedVec2,
        velocity: FixedVec2,
        power: Fixed,
    ) {
        self.commands.push(Command::SpawnProjectile { kind, position, velocity, power });
    }

    /// Remove an entity at the next flush.
    pub fn despawn(&mut self, entity: EntityRef) {
        self.commands.push(Command::Despawn(entity));
    }

    /// Run `action` for `owner` after `delay` ticks.
    pub fn schedule(&mut self, owner: EntityRef, delay: u32, action: TaskAction) {
        self.commands.push(Command::Schedule { owner, delay, action });
    }

    /// Play a one-shot sound.
    pub fn play(&mut self, cue: SoundCue) {
        self.commands.push(Command::Audio(AudioCommand::Play(cue)));
    }

    /// Start a looping sound.
    pub fn play_loop(&mut self, cue: SoundCue) {
        self.commands.push(Command::Audio(AudioCommand::Loop(cue)));
    }

    /// Stop a looping sound.
    pub fn stop(&mut self, cue: SoundCue) {
        self.commands.push(Command::Audio(AudioCommand::Stop(cue)));
    }

    /// Buffered commands, in push order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Buffered events, in push order.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Split into commands and events for the flush.
    pub fn into_parts(self) -> (Vec<Command>, Vec<GameEvent>) {
        (self.commands, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::EntityId;

    #[test]
    fn test_buffer_keeps_push_order() {
        let mut fx = Effects::new(9);
        fx.play(SoundCue::PigeonHit);
        fx.despawn(EntityRef::Pigeon(EntityId(3)));
        fx.emit(GameEventData::PigeonKilled { id: EntityId(3) });

        assert_eq!(fx.commands().len(), 2);
        assert_eq!(fx.commands()[1], Command::Despawn(EntityRef::Pigeon(EntityId(3))));
        assert_eq!(fx.events()[0].tick, 9);

        let (commands, events) = fx.into_parts();
        assert_eq!(commands.len(), 2);
        assert_eq!(events.len(), 1);
    }
}
