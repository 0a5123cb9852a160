//! Charge-and-Release Ability
//!
//! The special projectile is charged by holding the attack input. Two
//! pieces cooperate:
//!
//! - [`ChargeTrigger`] turns raw press/release input into "start charging"
//!   and "release" decisions, ignoring taps shorter than the release delay.
//! - [`ChargeState`] records when charging began and maps held time to bar
//!   progress and launch power.
//!
//! Progress and power are computed from two independent constants: the bar
//! fills over `full_ticks`, while power grows one unit every
//! `power_scale_ticks` up to `power_cap`. The two are not reconciled; a
//! full bar does not imply a capped launch or the other way round.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, fixed_min, ticks_ratio};
use crate::game::config::ChargeConfig;

/// Charging progress of the special projectile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeState {
    started_at: Option<u32>,
}

impl ChargeState {
    /// Begin charging at `tick`. Refused while already charging.
    pub fn start(&mut self, tick: u32) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(tick);
        true
    }

    /// Whether a charge is in progress.
    pub fn is_charging(&self) -> bool {
        self.started_at.is_some()
    }

    /// Tick charging began.
    pub fn started_at(&self) -> Option<u32> {
        self.started_at
    }

    /// Ticks held so far (0 when idle).
    pub fn elapsed(&self, now: u32) -> u32 {
        self.started_at.map_or(0, |start| now.saturating_sub(start))
    }

    /// Bar fill in `[0, ONE]`. Pure: querying never changes the state.
    pub fn progress(&self, now: u32, config: &ChargeConfig) -> Fixed {
        if !self.is_charging() {
            return 0;
        }
        fixed_min(ticks_ratio(self.elapsed(now), config.full_ticks), FIXED_ONE)
    }

    /// Launch power for a release at `now`.
    pub fn power(&self, now: u32, config: &ChargeConfig) -> Fixed {
        let raw = ticks_ratio(self.elapsed(now), config.power_scale_ticks);
        fixed_min(raw, config.power_cap)
    }

    /// Finish charging and return the launch power, or `None` if idle.
    pub fn release(&mut self, now: u32, config: &ChargeConfig) -> Option<Fixed> {
        if !self.is_charging() {
            return None;
        }
        let power = self.power(now, config);
        self.started_at = None;
        Some(power)
    }

    /// Abort without firing.
    pub fn cancel(&mut self) {
        self.started_at = None;
    }
}

/// What a release input should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerRelease {
    /// Nothing was pressed, or the press was too short: a no-op.
    Ignored,
    /// Held past the delay: release the charge.
    Release,
}

/// Press/hold/release gate in front of [`ChargeState`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeTrigger {
    pressed_at: Option<u32>,
    armed: bool,
}

impl ChargeTrigger {
    /// Input went down.
    pub fn press(&mut self, tick: u32) {
        if self.pressed_at.is_none() {
            self.pressed_at = Some(tick);
            self.armed = false;
        }
    }

    /// Called every pre-step. True exactly once per press, on the first tick
    /// the press has been held for the release delay.
    pub fn poll(&mut self, tick: u32, config: &ChargeConfig) -> bool {
        match self.pressed_at {
            Some(at) if !self.armed && tick.saturating_sub(at) >= config.release_delay_ticks => {
                self.armed = true;
                true
            }
            _ => false,
        }
    }

    /// Input went up.
    pub fn release(&mut self, tick: u32, config: &ChargeConfig) -> TriggerRelease {
        let Some(at) = self.pressed_at.take() else {
            return TriggerRelease::Ignored;
        };
        self.armed = false;
        if tick.saturating_sub(at) >= config.release_delay_ticks {
            TriggerRelease::Release
        } else {
            TriggerRelease::Ignored
        }
    }

    /// Whether the input is currently held.
    pub fn is_held(&self) -> bool {
        self.pressed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_HALF};
    use proptest::prelude::*;

    #[test]
    fn test_progress_fills_over_full_ticks() {
        let config = ChargeConfig::default();
        let mut charge = ChargeState::default();
        assert_eq!(charge.progress(50, &config), 0);

        assert!(charge.start(100));
        assert!(!charge.start(110), "re-entrant start refused");
        assert_eq!(charge.progress(100, &config), 0);
        assert_eq!(charge.progress(160, &config), FIXED_HALF);
        assert_eq!(charge.progress(220, &config), FIXED_ONE);
        assert_eq!(charge.progress(10_000, &config), FIXED_ONE);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let config = ChargeConfig::default();
        let mut charge = ChargeState::default();
        charge.start(0);
        let before = charge.clone();
        let _ = charge.progress(90, &config);
        let _ = charge.power(90, &config);
        assert_eq!(charge, before);
    }

    #[test]
    fn test_power_is_clamped_independently() {
        let config = ChargeConfig::default();
        let mut charge = ChargeState::default();
        charge.start(0);
        // 60 ticks = one second = 10 power units, bar only half full
        assert_eq!(charge.power(60, &config), to_fixed(10.0));
        assert_eq!(charge.progress(60, &config), FIXED_HALF);
        // Full bar and capped power coincide at the defaults
        assert_eq!(charge.power(120, &config), to_fixed(20.0));
        assert_eq!(charge.power(600, &config), to_fixed(20.0));

        let release = charge.release(600, &config);
        assert_eq!(release, Some(to_fixed(20.0)));
        assert!(!charge.is_charging());
        assert_eq!(charge.progress(601, &config), 0);
    }

    #[test]
    fn test_power_cap_and_scale_are_separate_knobs() {
        let config = ChargeConfig {
            power_cap: to_fixed(5.0),
            ..ChargeConfig::default()
        };
        let mut charge = ChargeState::default();
        charge.start(0);
        assert_eq!(charge.power(30, &config), to_fixed(5.0));
        assert_eq!(charge.progress(30, &config), FIXED_ONE / 4);
    }

    #[test]
    fn test_release_when_idle_is_none() {
        let config = ChargeConfig::default();
        let mut charge = ChargeState::default();
        assert_eq!(charge.release(10, &config), None);
        charge.start(3);
        charge.cancel();
        assert_eq!(charge.release(10, &config), None);
    }

    #[test]
    fn test_trigger_ignores_short_taps() {
        let config = ChargeConfig::default();
        let mut trigger = ChargeTrigger::default();
        trigger.press(10);
        assert!(!trigger.poll(15, &config));
        assert_eq!(trigger.release(21, &config), TriggerRelease::Ignored);
        assert!(!trigger.is_held());
        // Nothing pending after a short tap
        assert!(!trigger.poll(40, &config));
    }

    #[test]
    fn test_trigger_arms_once_after_delay() {
        let config = ChargeConfig::default();
        let mut trigger = ChargeTrigger::default();
        trigger.press(10);
        assert!(!trigger.poll(21, &config));
        assert!(trigger.poll(22, &config));
        assert!(!trigger.poll(23, &config));
        assert_eq!(trigger.release(80, &config), TriggerRelease::Release);
        assert_eq!(trigger.release(81, &config), TriggerRelease::Ignored);
    }

    proptest! {
        #[test]
        fn prop_progress_monotonic_and_bounded(start in 0u32..10_000, steps in proptest::collection::vec(0u32..50, 1..60)) {
            let config = ChargeConfig::default();
            let mut charge = ChargeState::default();
            charge.start(start);
            let mut now = start;
            let mut last = 0;
            for step in steps {
                now += step;
                let p = charge.progress(now, &config);
                prop_assert!(p >= last);
                prop_assert!((0..=FIXED_ONE).contains(&p));
                last = p;
            }
            charge.release(now, &config);
            prop_assert_eq!(charge.progress(now, &config), 0);
        }

        #[test]
        fn prop_power_never_exceeds_cap(held in 0u32..1_000_000) {
            let config = ChargeConfig::default();
            let mut charge = ChargeState::default();
            charge.start(0);
            let power = charge.release(held, &config).unwrap();
            prop_assert!(power >= 0 && power <= config.power_cap);
        }
    }
}
