//! Audio Service
//!
//! Fire-and-forget sound cues. Entities never talk to a sink directly: they
//! push cues into their effect buffer and the world forwards them to the
//! injected [`AudioSink`] when the buffer is flushed.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Serialize, Deserialize};
use tracing::debug;

/// Every sound the simulation can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Rock thrown
    StoneThrow,
    /// Scratching loop
    Scratching,
    /// Special projectile charging
    Charging,
    /// Special projectile released
    Release,
    /// Player eats
    Eating,
    /// Enemy hiss (pigeon contact, thief hiss)
    Hiss,
    /// Pigeon hit by a projectile
    PigeonHit,
    /// Thief hit by a projectile
    ThiefHit,
    /// Thief grabbed food
    NomNom,
    /// Crate broke
    BoxBreak,
    /// Pickup collected
    Pickup,
    /// Bucket started rolling
    Rolling,
}

impl SoundCue {
    /// Asset key handed to the audio backend.
    pub fn key(self) -> &'static str {
        match self {
            SoundCue::StoneThrow => "StoneThrow",
            SoundCue::Scratching => "CatScratching",
            SoundCue::Charging => "NubellaCharging",
            SoundCue::Release => "NubellaRelease",
            SoundCue::Eating => "eating",
            SoundCue::Hiss => "Hiss",
            SoundCue::PigeonHit => "PigeonHit",
            SoundCue::ThiefHit => "ThiefCatHit",
            SoundCue::NomNom => "NomNom",
            SoundCue::BoxBreak => "BoxBreak",
            SoundCue::Pickup => "Pickup",
            SoundCue::Rolling => "Rolling",
        }
    }
}

/// One request to the audio backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCommand {
    /// Play once
    Play(SoundCue),
    /// Start looping
    Loop(SoundCue),
    /// Stop a loop
    Stop(SoundCue),
}

/// Audio backend. Calls return nothing and are never retried.
pub trait AudioSink {
    /// Play an effect once.
    fn play(&mut self, key: &str);
    /// Start a looping effect.
    fn play_loop(&mut self, key: &str);
    /// Stop a looping effect.
    fn stop(&mut self, key: &str);

    /// Route a buffered command.
    fn dispatch(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Play(cue) => self.play(cue.key()),
            AudioCommand::Loop(cue) => self.play_loop(cue.key()),
            AudioCommand::Stop(cue) => self.stop(cue.key()),
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _key: &str) {}
    fn play_loop(&mut self, _key: &str) {}
    fn stop(&mut self, _key: &str) {}
}

/// Logs every call at debug level. Used by the headless binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAudio;

impl AudioSink for TracingAudio {
    fn play(&mut self, key: &str) {
        debug!(key, "audio play");
    }

    fn play_loop(&mut self, key: &str) {
        debug!(key, "audio loop start");
    }

    fn stop(&mut self, key: &str) {
        debug!(key, "audio loop stop");
    }
}

/// Shared recorder: clone it, hand one copy to the world, inspect the other.
#[derive(Clone, Debug, Default)]
pub struct AudioLog {
    calls: Rc<RefCell<Vec<String>>>,
}

impl AudioLog {
    /// New empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls as `"play:Key"`, `"loop:Key"` or `"stop:Key"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// How many times `key` was played once.
    pub fn play_count(&self, key: &str) -> usize {
        let wanted = format!("play:{key}");
        self.calls.borrow().iter().filter(|c| **c == wanted).count()
    }
}

impl AudioSink for AudioLog {
    fn play(&mut self, key: &str) {
        self.calls.borrow_mut().push(format!("play:{key}"));
    }

    fn play_loop(&mut self, key: &str) {
        self.calls.borrow_mut().push(format!("loop:{key}"));
    }

    fn stop(&mut self, key: &str) {
        self.calls.borrow_mut().push(format!("stop:{key}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_routes_by_kind() {
        let log = AudioLog::new();
        let mut sink: Box<dyn AudioSink> = Box::new(log.clone());
        sink.dispatch(AudioCommand::Play(SoundCue::StoneThrow));
        sink.dispatch(AudioCommand::Loop(SoundCue::Scratching));
        sink.dispatch(AudioCommand::Stop(SoundCue::Scratching));

        assert_eq!(
            log.calls(),
            vec!["play:StoneThrow", "loop:CatScratching", "stop:CatScratching"]
        );
        assert_eq!(log.play_count("StoneThrow"), 1);
    }

    #[test]
    fn test_null_audio_accepts_everything() {
        let mut sink = NullAudio;
        sink.dispatch(AudioCommand::Play(SoundCue::BoxBreak));
        sink.dispatch(AudioCommand::Stop(SoundCue::Charging));
    }
}
