//! Physics Interface
//!
//! The simulation drives an external rigid-body solver through this narrow
//! trait: create and free bodies, read and write their kinematic state, and
//! advance one fixed step that reports the contacts it produced.
//!
//! ```text
//!   pre-step hooks ──► PhysicsWorld::step() ──► Vec<PhysicsEvent> ──► handlers
//!                                                                      │
//!   post-step hooks ◄──────────────────────────────────────────────────┘
//! ```
//!
//! Every query on a freed or unknown handle returns `None` and every setter
//! is a no-op, so gameplay code can act on stale handles without branching
//! into error paths.

pub mod kinematic;

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;

pub use kinematic::KinematicWorld;

/// Opaque identifier of a body inside the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// How the solver treats a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves (terrain, props).
    Static,
    /// Integrated with gravity and pushed out of solids.
    Dynamic,
    /// Moved only by its velocity or explicit position writes (platforms).
    Kinematic,
}

/// Body creation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyDesc {
    /// Body kind
    pub kind: BodyKind,
    /// Centre position
    pub position: FixedVec2,
    /// Box half extents
    pub half_extents: FixedVec2,
    /// Initial velocity
    pub velocity: FixedVec2,
    /// Multiplier on world gravity (dynamic bodies only)
    pub gravity_scale: Fixed,
    /// Sensors report begin/end contacts but never collide
    pub sensor: bool,
}

impl BodyDesc {
    fn new(kind: BodyKind, position: FixedVec2, half_extents: FixedVec2) -> Self {
        Self {
            kind,
            position,
            half_extents,
            velocity: FixedVec2::ZERO,
            gravity_scale: FIXED_ONE,
            sensor: false,
        }
    }

    /// Static solid box.
    pub fn fixed(position: FixedVec2, half_extents: FixedVec2) -> Self {
        Self::new(BodyKind::Static, position, half_extents)
    }

    /// Dynamic box affected by gravity.
    pub fn dynamic(position: FixedVec2, half_extents: FixedVec2) -> Self {
        Self::new(BodyKind::Dynamic, position, half_extents)
    }

    /// Kinematic box (moving platforms).
    pub fn kinematic(position: FixedVec2, half_extents: FixedVec2) -> Self {
        Self::new(BodyKind::Kinematic, position, half_extents)
    }

    /// Static trigger region.
    pub fn sensor(position: FixedVec2, half_extents: FixedVec2) -> Self {
        Self::new(BodyKind::Static, position, half_extents).as_sensor()
    }

    /// Mark as sensor.
    pub fn as_sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    /// Set initial velocity.
    pub fn with_velocity(mut self, velocity: FixedVec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set gravity scale.
    pub fn with_gravity_scale(mut self, scale: Fixed) -> Self {
        self.gravity_scale = scale;
        self
    }
}

/// Contact notifications produced by one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsEvent {
    /// Two solid bodies started touching (`a < b`).
    CollisionBegin {
        /// Lower handle
        a: BodyHandle,
        /// Higher handle
        b: BodyHandle,
    },
    /// A body entered a sensor.
    SensorBegin {
        /// The sensor body
        sensor: BodyHandle,
        /// The body that entered
        other: BodyHandle,
    },
    /// A body left a sensor.
    SensorEnd {
        /// The sensor body
        sensor: BodyHandle,
        /// The body that left
        other: BodyHandle,
    },
}

/// Rigid-body solver consumed by the simulation.
pub trait PhysicsWorld {
    /// Create a body and return its handle.
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Free a body. Returns false if it was already gone.
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;

    /// Whether the handle still names a live body.
    fn contains(&self, handle: BodyHandle) -> bool;

    /// Centre position.
    fn position(&self, handle: BodyHandle) -> Option<FixedVec2>;

    /// Teleport a body.
    fn set_position(&mut self, handle: BodyHandle, position: FixedVec2);

    /// Linear velocity in units per second.
    fn velocity(&self, handle: BodyHandle) -> Option<FixedVec2>;

    /// Overwrite linear velocity.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: FixedVec2);

    /// Apply an instantaneous impulse at the centre of mass.
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: FixedVec2);

    /// Rotation in radians.
    fn angle(&self, handle: BodyHandle) -> Option<Fixed>;

    /// Overwrite rotation.
    fn set_angle(&mut self, handle: BodyHandle, angle: Fixed);

    /// Change the gravity multiplier.
    fn set_gravity_scale(&mut self, handle: BodyHandle, scale: Fixed);

    /// Advance one fixed step and report contacts in deterministic order.
    fn step(&mut self) -> Vec<PhysicsEvent>;

    /// Number of live bodies.
    fn body_count(&self) -> usize;
}
