//! Deterministic Reference Solver
//!
//! Axis-aligned boxes, explicit Euler at a fixed 1/60 s step, and push-out
//! against solid static and kinematic bodies along the axis of least
//! penetration. It is deliberately small: enough to drive the simulation in
//! the headless binary and in tests with bit-identical results.
//!
//! Contacts use inclusive overlap so that a body resting exactly on a
//! surface stays "in contact" and does not re-fire begin events every step.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::fixed::{Fixed, FIXED_ONE, GRAVITY, TICK_DT, fixed_abs, fixed_div, fixed_mul};
use crate::core::vec2::FixedVec2;
use super::{BodyDesc, BodyHandle, BodyKind, PhysicsEvent, PhysicsWorld};

#[derive(Clone, Debug)]
struct Body {
    kind: BodyKind,
    position: FixedVec2,
    half: FixedVec2,
    velocity: FixedVec2,
    gravity_scale: Fixed,
    sensor: bool,
    angle: Fixed,
    inv_mass: Fixed,
}

impl Body {
    fn from_desc(desc: BodyDesc) -> Self {
        // Unit density: mass is the box area
        let mass = fixed_mul(desc.half_extents.x, desc.half_extents.y).saturating_mul(4);
        let inv_mass = if mass > 0 { fixed_div(FIXED_ONE, mass) } else { FIXED_ONE };
        Self {
            kind: desc.kind,
            position: desc.position,
            half: desc.half_extents,
            velocity: desc.velocity,
            gravity_scale: desc.gravity_scale,
            sensor: desc.sensor,
            angle: 0,
            inv_mass,
        }
    }

    fn is_solid_obstacle(&self) -> bool {
        self.kind != BodyKind::Dynamic && !self.sensor
    }
}

/// Inclusive AABB overlap (touching counts).
fn touching(a: &Body, b: &Body) -> bool {
    let dx = fixed_abs(a.position.x.saturating_sub(b.position.x));
    let dy = fixed_abs(a.position.y.saturating_sub(b.position.y));
    dx <= a.half.x.saturating_add(b.half.x) && dy <= a.half.y.saturating_add(b.half.y)
}

/// Pair is tracked when at least one side moves and not both are sensors.
fn interacts(a: &Body, b: &Body) -> bool {
    (a.kind == BodyKind::Dynamic || b.kind == BodyKind::Dynamic) && !(a.sensor && b.sensor)
}

/// Deterministic AABB world implementing [`PhysicsWorld`].
#[derive(Clone, Debug)]
pub struct KinematicWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    contacts: BTreeSet<(BodyHandle, BodyHandle)>,
    next_handle: u32,
    gravity: Fixed,
}

impl Default for KinematicWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl KinematicWorld {
    /// Empty world with standard gravity.
    pub fn new() -> Self {
        Self::with_gravity(GRAVITY)
    }

    /// Empty world with a custom downward gravity magnitude.
    pub fn with_gravity(gravity: Fixed) -> Self {
        Self {
            bodies: BTreeMap::new(),
            contacts: BTreeSet::new(),
            next_handle: 1,
            gravity,
        }
    }

    fn integrate(&mut self) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            match body.kind {
                BodyKind::Dynamic => {
                    let g = fixed_mul(gravity, body.gravity_scale);
                    body.velocity.y = body.velocity.y.saturating_sub(fixed_mul(g, TICK_DT));
                    body.position = body.position + body.velocity.scale(TICK_DT);
                }
                BodyKind::Kinematic => {
                    body.position = body.position + body.velocity.scale(TICK_DT);
                }
                BodyKind::Static => {}
            }
        }
    }

    fn resolve_solids(&mut self) {
        let obstacles: Vec<(FixedVec2, FixedVec2)> = self
            .bodies
            .values()
            .filter(|b| b.is_solid_obstacle())
            .map(|b| (b.position, b.half))
            .collect();

        for body in self.bodies.values_mut() {
            if body.kind != BodyKind::Dynamic || body.sensor {
                continue;
            }
            for &(pos, half) in &obstacles {
                push_out(body, pos, half);
            }
        }
    }

    fn detect_contacts(&mut self) -> Vec<PhysicsEvent> {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        let mut current = BTreeSet::new();

        for (i, &ha) in handles.iter().enumerate() {
            for &hb in &handles[i + 1..] {
                let (Some(a), Some(b)) = (self.bodies.get(&ha), self.bodies.get(&hb)) else {
                    continue;
                };
                if interacts(a, b) && touching(a, b) {
                    current.insert((ha, hb));
                }
            }
        }

        let mut events = Vec::new();

        for &(a, b) in current.difference(&self.contacts) {
            events.push(self.begin_event(a, b));
        }
        for &(a, b) in self.contacts.difference(&current) {
            if let Some(event) = self.end_event(a, b) {
                events.push(event);
            }
        }

        self.contacts = current;
        events
    }

    fn begin_event(&self, a: BodyHandle, b: BodyHandle) -> PhysicsEvent {
        let a_sensor = self.bodies.get(&a).is_some_and(|body| body.sensor);
        let b_sensor = self.bodies.get(&b).is_some_and(|body| body.sensor);
        match (a_sensor, b_sensor) {
            (true, _) => PhysicsEvent::SensorBegin { sensor: a, other: b },
            (_, true) => PhysicsEvent::SensorBegin { sensor: b, other: a },
            _ => PhysicsEvent::CollisionBegin { a, b },
        }
    }

    fn end_event(&self, a: BodyHandle, b: BodyHandle) -> Option<PhysicsEvent> {
        if self.bodies.get(&a).is_some_and(|body| body.sensor) {
            Some(PhysicsEvent::SensorEnd { sensor: a, other: b })
        } else if self.bodies.get(&b).is_some_and(|body| body.sensor) {
            Some(PhysicsEvent::SensorEnd { sensor: b, other: a })
        } else {
            None
        }
    }
}

/// Separate a dynamic box from a solid one along the shallower axis.
fn push_out(body: &mut Body, pos: FixedVec2, half: FixedVec2) {
    let dx = body.position.x.saturating_sub(pos.x);
    let dy = body.position.y.saturating_sub(pos.y);
    let px = body.half.x.saturating_add(half.x).saturating_sub(fixed_abs(dx));
    let py = body.half.y.saturating_add(half.y).saturating_sub(fixed_abs(dy));
    if px <= 0 || py <= 0 {
        return;
    }

    if px < py {
        let sign = if dx >= 0 { 1 } else { -1 };
        body.position.x = body.position.x.saturating_add(sign * px);
        if body.velocity.x.signum() == -sign {
            body.velocity.x = 0;
        }
    } else {
        let sign = if dy >= 0 { 1 } else { -1 };
        body.position.y = body.position.y.saturating_add(sign * py);
        if body.velocity.y.signum() == -sign {
            body.velocity.y = 0;
        }
    }
}

impl PhysicsWorld for KinematicWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, Body::from_desc(desc));
        handle
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        if self.bodies.remove(&handle).is_none() {
            return false;
        }
        self.contacts.retain(|&(a, b)| a != handle && b != handle);
        true
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    fn position(&self, handle: BodyHandle) -> Option<FixedVec2> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    fn set_position(&mut self, handle: BodyHandle, position: FixedVec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    fn velocity(&self, handle: BodyHandle) -> Option<FixedVec2> {
        self.bodies.get(&handle).map(|b| b.velocity)
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: FixedVec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = velocity;
        }
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: FixedVec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if body.kind == BodyKind::Dynamic {
                body.velocity = body.velocity + impulse.scale(body.inv_mass);
            }
        }
    }

    fn angle(&self, handle: BodyHandle) -> Option<Fixed> {
        self.bodies.get(&handle).map(|b| b.angle)
    }

    fn set_angle(&mut self, handle: BodyHandle, angle: Fixed) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.angle = angle;
        }
    }

    fn set_gravity_scale(&mut self, handle: BodyHandle, scale: Fixed) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.gravity_scale = scale;
        }
    }

    fn step(&mut self) -> Vec<PhysicsEvent> {
        self.integrate();
        self.resolve_solids();
        self.detect_contacts()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
