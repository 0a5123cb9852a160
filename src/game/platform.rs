//! Moving platform oscillator.
//!
//! Moves a fixed distance every tick along one axis, then flips direction
//! once the new position is at or past the active limit. The position can
//! overshoot a limit by at most one tick's displacement.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_mul};
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::entity::{EntityId, StepContext, Steppable};
use crate::physics::BodyHandle;

/// Direction of travel, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Along x, between a left and a right limit
    Horizontal,
    /// Along y, between a lower and an upper limit
    Vertical,
}

/// A kinematic platform bouncing between two limits.
#[derive(Clone, Debug)]
pub struct MovingPlatform {
    id: EntityId,
    body: BodyHandle,
    axis: Axis,
    position: FixedVec2,
    lower: Fixed,
    upper: Fixed,
    step: Fixed,
    forward: bool,
    reversals: u32,
}

impl MovingPlatform {
    /// New platform at `origin`, heading toward `upper` first.
    ///
    /// `speed × step_factor` is the per-tick displacement.
    pub fn new(
        id: EntityId,
        body: BodyHandle,
        axis: Axis,
        origin: FixedVec2,
        limits: (Fixed, Fixed),
        speed: Fixed,
        step_factor: Fixed,
    ) -> Self {
        let (lower, upper) = if limits.0 <= limits.1 { limits } else { (limits.1, limits.0) };
        Self {
            id,
            body,
            axis,
            position: origin,
            lower,
            upper,
            step: fixed_mul(speed, step_factor).abs(),
            forward: true,
            reversals: 0,
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

    /// Current centre.
    pub fn position(&self) -> FixedVec2 {
        self.position
    }

    /// Coordinate along the travel axis.
    pub fn coordinate(&self) -> Fixed {
        match self.axis {
            Axis::Horizontal => self.position.x,
            Axis::Vertical => self.position.y,
        }
    }

    /// Per-tick displacement.
    pub fn step_size(&self) -> Fixed {
        self.step
    }

    /// Heading toward the upper limit.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Direction changes so far.
    pub fn reversals(&self) -> u32 {
        self.reversals
    }

    /// Advance one tick and return the new position.
    pub fn advance(&mut self) -> FixedVec2 {
        let delta = if self.forward { self.step } else { -self.step };
        let coordinate = self.coordinate().saturating_add(delta);
        match self.axis {
            Axis::Horizontal => self.position.x = coordinate,
            Axis::Vertical => self.position.y = coordinate,
        }

        if self.forward && coordinate >= self.upper {
            self.forward = false;
            self.reversals += 1;
        } else if !self.forward && coordinate <= self.lower {
            self.forward = true;
            self.reversals += 1;
        }
        self.position
    }

    /// Feed state into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_bool(self.forward);
    }
}

impl Steppable for MovingPlatform {
    fn pre_step(&mut self, ctx: &mut StepContext<'_>) {
        let position = self.advance();
        ctx.physics.set_position(self.body, position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};
    use crate::game::config::PlatformConfig;
    use crate::game::effects::Effects;
    use crate::game::entity::PlayerView;
    use crate::physics::{BodyDesc, KinematicWorld, PhysicsWorld};
    use proptest::prelude::*;

    fn platform(axis: Axis, start: i32, lower: i32, upper: i32, speed: Fixed) -> MovingPlatform {
        let origin = match axis {
            Axis::Horizontal => FixedVec2::from_ints(start, 0),
            Axis::Vertical => FixedVec2::from_ints(0, start),
        };
        MovingPlatform::new(
            EntityId(1),
            BodyHandle(1),
            axis,
            origin,
            (lower * FIXED_ONE, upper * FIXED_ONE),
            speed,
            PlatformConfig::default().step_factor,
        )
    }

    #[test]
    fn test_default_step_size() {
        let p = platform(Axis::Horizontal, 0, -5, 5, to_fixed(1.5));
        // 1.5 × 0.05 = 0.075
        assert!((p.step_size() - to_fixed(0.075)).abs() <= 2);
    }

    #[test]
    fn test_flips_at_upper_limit() {
        let mut p = platform(Axis::Vertical, 0, 0, 1, FIXED_ONE * 4);
        while p.is_forward() {
            let before = p.coordinate();
            p.advance();
            if p.is_forward() {
                assert!(p.coordinate() < FIXED_ONE);
            } else {
                assert!(before < FIXED_ONE);
                assert!(p.coordinate() >= FIXED_ONE);
                assert!(p.coordinate() <= FIXED_ONE + p.step_size());
            }
        }
        assert_eq!(p.reversals(), 1);
        assert_eq!(p.position().x, 0, "vertical platform never moves sideways");
    }

    #[test]
    fn test_writes_position_to_body() {
        let mut physics = KinematicWorld::new();
        let body = physics.create_body(BodyDesc::kinematic(FixedVec2::ZERO, FixedVec2::from_ints(2, 1)));
        let mut p = MovingPlatform::new(
            EntityId(1),
            body,
            Axis::Horizontal,
            FixedVec2::ZERO,
            (-FIXED_ONE, FIXED_ONE),
            FIXED_ONE,
            to_fixed(0.05),
        );
        let mut fx = Effects::new(0);
        let mut ctx = StepContext { tick: 1, physics: &mut physics, player: PlayerView::default(), fx: &mut fx };
        p.pre_step(&mut ctx);
        assert_eq!(physics.position(body), Some(p.position()));
        assert!(p.position().x > 0);
    }

    #[test]
    fn test_swapped_limits_are_normalised() {
        let mut p = platform(Axis::Horizontal, 0, 3, -3, FIXED_ONE * 20);
        for _ in 0..20 {
            p.advance();
            assert!(p.coordinate() >= -3 * FIXED_ONE - p.step_size());
            assert!(p.coordinate() <= 3 * FIXED_ONE + p.step_size());
        }
    }

    proptest! {
        #[test]
        fn prop_stays_within_limits_plus_one_step(
            lower in -50i32..0,
            width in 1i32..50,
            start_frac in 0u32..=100,
            speed_tenths in 1i32..100,
            ticks in 1usize..3000,
        ) {
            let upper = lower + width;
            let start = lower * FIXED_ONE + (width * FIXED_ONE / 100) * start_frac as i32;
            let speed = speed_tenths * FIXED_ONE / 10;
            let mut p = MovingPlatform::new(
                EntityId(1),
                BodyHandle(1),
                Axis::Horizontal,
                FixedVec2::new(start, 0),
                (lower * FIXED_ONE, upper * FIXED_ONE),
                speed,
                to_fixed(0.05),
            );
            let eps = p.step_size();
            let mut forward = p.is_forward();
            let mut flips = 0;
            for _ in 0..ticks {
                p.advance();
                let c = p.coordinate();
                prop_assert!(c >= lower * FIXED_ONE - eps && c <= upper * FIXED_ONE + eps);
                if p.is_forward() != forward {
                    // A reversal only happens at or beyond the active limit
                    if forward {
                        prop_assert!(c >= upper * FIXED_ONE);
                    } else {
                        prop_assert!(c <= lower * FIXED_ONE);
                    }
                    forward = p.is_forward();
                    flips += 1;
                }
            }
            prop_assert_eq!(flips, p.reversals());
        }
    }
}
