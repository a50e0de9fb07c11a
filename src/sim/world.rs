//! Collision world
//!
//! Owns every physical thing in the field: named static boundaries, the
//! dynamic balls, and the pinned paddle/brick bodies. Pinned bodies never
//! move under physics; their outline is a boundary they own, and touching an
//! owned boundary is reported as a body-body contact.
//!
//! `step` integrates gravity, resolves contacts and returns began/ended
//! events. The rule engine reacts to those events; it never integrates.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{ball_ball_collision, bounce_velocity, clamp_speed};
use super::shape::Shape;
use super::state::{BallId, BrickId};
use crate::consts::GRAVITY_SCALE;
use crate::polar_to_cartesian;

/// Opaque reference to a body registered in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(u32);

/// Physical behavior category of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Ball,
    Paddle,
    Brick,
}

/// What game entity a body stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyTag {
    Ball(BallId),
    Paddle,
    Brick(BrickId),
}

impl BodyTag {
    pub fn kind(&self) -> BodyKind {
        match self {
            BodyTag::Ball(_) => BodyKind::Ball,
            BodyTag::Paddle => BodyKind::Paddle,
            BodyTag::Brick(_) => BodyKind::Brick,
        }
    }
}

/// Material parameters shared by all bodies of a kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsProfile {
    pub density: f32,
    /// Coefficient of restitution
    pub elasticity: f32,
    pub friction: f32,
    /// Linear damping per second
    pub resistance: f32,
    pub allows_rotation: bool,
}

impl PhysicsProfile {
    pub const fn ball(elasticity: f32) -> Self {
        Self {
            density: 1.0,
            elasticity,
            friction: 0.0,
            resistance: 0.0,
            allows_rotation: false,
        }
    }

    pub const PADDLE: Self = Self {
        density: 500.0,
        elasticity: 1.0,
        friction: 0.0,
        resistance: 0.0,
        allows_rotation: false,
    };

    pub const BRICK: Self = Self {
        density: 100.0,
        elasticity: 1.0,
        friction: 0.0,
        resistance: 0.0,
        allows_rotation: false,
    };
}

/// A registered body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub tag: BodyTag,
    pub profile: PhysicsProfile,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Bounding size (diameter for balls)
    pub size: Vec2,
    /// Pinned bodies only move through `set_position`
    pub pinned: bool,
}

impl Body {
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size.x * 0.5
    }

    /// Relative mass: density times area
    pub fn mass(&self) -> f32 {
        let area = match self.tag.kind() {
            BodyKind::Ball => std::f32::consts::PI * self.radius() * self.radius(),
            _ => self.size.x * self.size.y,
        };
        (self.profile.density * area).max(f32::EPSILON)
    }
}

/// A named static collision outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub shape: Shape,
    /// Pinned body this outline belongs to
    pub owner: Option<BodyHandle>,
    /// Sensors report contact but never bounce
    pub sensor: bool,
}

impl Boundary {
    pub fn solid(shape: Shape) -> Self {
        Self {
            shape,
            owner: None,
            sensor: false,
        }
    }

    pub fn sensor(shape: Shape) -> Self {
        Self {
            shape,
            owner: None,
            sensor: true,
        }
    }

    pub fn owned_by(mut self, owner: BodyHandle) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Constant field-wide acceleration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gravity {
    /// Unit direction
    pub direction: Vec2,
    /// Configured magnitude (1.0 = `GRAVITY_SCALE` points/s²)
    pub magnitude: f32,
}

impl Gravity {
    /// Gravity pulling toward the bottom of the field
    pub fn down(magnitude: f32) -> Self {
        Self {
            direction: Vec2::NEG_Y,
            magnitude,
        }
    }

    pub fn acceleration(&self) -> Vec2 {
        self.direction.normalize_or_zero() * self.magnitude * GRAVITY_SCALE
    }
}

/// One-shot velocity change, applied on the next step and then discarded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impulse {
    /// Direction in radians (0 = +x, π/2 = up)
    pub angle: f32,
    /// Velocity change for a unit-density body (points/s)
    pub magnitude: f32,
}

impl Impulse {
    pub fn new(angle: f32, magnitude: f32) -> Self {
        Self { angle, magnitude }
    }

    /// Velocity change this impulse gives a body of the given density
    pub fn delta_velocity(&self, density: f32) -> Vec2 {
        polar_to_cartesian(self.magnitude / density.max(f32::EPSILON), self.angle)
    }
}

/// Contact notifications produced by `step`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactEvent {
    /// Ball touched another body (ball, paddle or brick). `a` is always a ball.
    BodyBegan { a: BodyHandle, b: BodyHandle },
    BodyEnded { a: BodyHandle, b: BodyHandle },
    /// Ball touched an unowned boundary
    BoundaryBegan { body: BodyHandle, boundary: String },
    BoundaryEnded { body: BodyHandle, boundary: String },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ContactKey {
    Body(BodyHandle, BodyHandle),
    Boundary(BodyHandle, String),
}

impl ContactKey {
    fn involves(&self, handle: BodyHandle) -> bool {
        match self {
            ContactKey::Body(a, b) => *a == handle || *b == handle,
            ContactKey::Boundary(body, _) => *body == handle,
        }
    }
}

/// The physical simulation
#[derive(Debug, Clone)]
pub struct CollisionWorld {
    boundaries: BTreeMap<String, Boundary>,
    bodies: BTreeMap<BodyHandle, Body>,
    gravity: Gravity,
    ball_elasticity: f32,
    impulses: Vec<(BodyHandle, Impulse)>,
    contacts: BTreeSet<ContactKey>,
    next_handle: u32,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self {
            boundaries: BTreeMap::new(),
            bodies: BTreeMap::new(),
            gravity: Gravity::down(0.0),
            ball_elasticity: 1.0,
            impulses: Vec::new(),
            contacts: BTreeSet::new(),
            next_handle: 1,
        }
    }

    /// Drop every body, boundary, pending impulse and contact
    pub fn clear(&mut self) {
        self.boundaries.clear();
        self.bodies.clear();
        self.impulses.clear();
        self.contacts.clear();
    }

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = gravity;
    }

    pub fn ball_elasticity(&self) -> f32 {
        self.ball_elasticity
    }

    /// Change restitution of current and future balls
    pub fn set_ball_elasticity(&mut self, elasticity: f32) {
        self.ball_elasticity = elasticity;
        for body in self.bodies.values_mut() {
            if body.tag.kind() == BodyKind::Ball {
                body.profile.elasticity = elasticity;
            }
        }
    }

    // === Boundaries ===

    /// Register a boundary, replacing any boundary with the same name
    pub fn add_boundary(&mut self, name: impl Into<String>, boundary: Boundary) {
        self.boundaries.insert(name.into(), boundary);
    }

    /// Remove a boundary; unknown names are ignored
    pub fn remove_boundary(&mut self, name: &str) {
        if self.boundaries.remove(name).is_some() {
            self.contacts
                .retain(|key| !matches!(key, ContactKey::Boundary(_, n) if n == name));
        }
    }

    pub fn boundary(&self, name: &str) -> Option<&Boundary> {
        self.boundaries.get(name)
    }

    pub fn boundary_names(&self) -> impl Iterator<Item = &str> {
        self.boundaries.keys().map(String::as_str)
    }

    // === Bodies ===

    /// Register a body; balls are dynamic, paddle and bricks are pinned
    pub fn add_body(&mut self, tag: BodyTag, pos: Vec2, size: Vec2) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;

        let kind = tag.kind();
        let profile = match kind {
            BodyKind::Ball => PhysicsProfile::ball(self.ball_elasticity),
            BodyKind::Paddle => PhysicsProfile::PADDLE,
            BodyKind::Brick => PhysicsProfile::BRICK,
        };
        self.bodies.insert(
            handle,
            Body {
                tag,
                profile,
                pos,
                vel: Vec2::ZERO,
                size,
                pinned: kind != BodyKind::Ball,
            },
        );
        handle
    }

    /// Remove a body together with the boundaries it owns
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let body = self.bodies.remove(&handle)?;
        self.boundaries
            .retain(|_, boundary| boundary.owner != Some(handle));
        self.contacts.retain(|key| !key.involves(handle));
        self.impulses.retain(|(h, _)| *h != handle);
        Some(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(&handle)
    }

    pub fn tag(&self, handle: BodyHandle) -> Option<BodyTag> {
        self.bodies.get(&handle).map(|b| b.tag)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter().map(|(h, b)| (*h, b))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.pos)
    }

    /// Teleport a body (anchors of pinned bodies, resting balls)
    pub fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.pos = pos;
        }
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.vel)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if !body.pinned {
                body.vel = vel;
            }
        }
    }

    pub fn add_linear_velocity(&mut self, handle: BodyHandle, delta: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if !body.pinned {
                body.vel += delta;
            }
        }
    }

    /// Keep a body's speed within [min, max]; a resting body stays at rest
    pub fn clamp_velocity(&mut self, handle: BodyHandle, min: f32, max: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.vel = clamp_speed(body.vel, min, max);
        }
    }

    /// Whether any ball currently overlaps the given outline
    pub fn any_ball_overlaps(&self, shape: &Shape) -> bool {
        self.bodies
            .values()
            .filter(|b| b.tag.kind() == BodyKind::Ball)
            .any(|b| shape.collide_ball(b.pos, b.radius()).hit)
    }

    // === Impulses ===

    /// Queue a one-shot impulse for the next step
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Impulse) {
        if self.bodies.contains_key(&handle) {
            self.impulses.push((handle, impulse));
        }
    }

    pub fn pending_impulses(&self) -> usize {
        self.impulses.len()
    }

    /// Apply and discard all queued impulses
    pub fn flush_impulses(&mut self) {
        for (handle, impulse) in self.impulses.drain(..) {
            if let Some(body) = self.bodies.get_mut(&handle) {
                if !body.pinned {
                    body.vel += impulse.delta_velocity(body.profile.density);
                }
            }
        }
    }

    // === Simulation ===

    /// Advance the simulation by `dt` seconds and report contact changes
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        self.flush_impulses();
        self.integrate(dt);

        let balls: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, b)| !b.pinned)
            .map(|(h, _)| *h)
            .collect();

        let mut current = BTreeSet::new();
        for &handle in &balls {
            self.resolve_boundaries(handle, &mut current);
        }
        for (i, &a) in balls.iter().enumerate() {
            for &b in &balls[i + 1..] {
                if self.resolve_ball_pair(a, b) {
                    current.insert(ContactKey::Body(a, b));
                }
            }
        }

        let mut events = Vec::new();
        for key in self.contacts.difference(&current) {
            events.push(match key.clone() {
                ContactKey::Body(a, b) => ContactEvent::BodyEnded { a, b },
                ContactKey::Boundary(body, boundary) => {
                    ContactEvent::BoundaryEnded { body, boundary }
                }
            });
        }
        for key in current.difference(&self.contacts) {
            events.push(match key.clone() {
                ContactKey::Body(a, b) => ContactEvent::BodyBegan { a, b },
                ContactKey::Boundary(body, boundary) => {
                    ContactEvent::BoundaryBegan { body, boundary }
                }
            });
        }
        self.contacts = current;
        events
    }

    fn integrate(&mut self, dt: f32) {
        let accel = self.gravity.acceleration();
        for body in self.bodies.values_mut().filter(|b| !b.pinned) {
            body.vel += accel * dt;
            if body.profile.resistance > 0.0 {
                body.vel *= (1.0 - body.profile.resistance * dt).max(0.0);
            }
            body.pos += body.vel * dt;
        }
    }

    /// Push a ball out of every boundary it overlaps and bounce it
    fn resolve_boundaries(&mut self, handle: BodyHandle, current: &mut BTreeSet<ContactKey>) {
        for (name, boundary) in &self.boundaries {
            let surface = boundary
                .owner
                .and_then(|owner| self.bodies.get(&owner))
                .map(|b| b.profile);
            let Some(body) = self.bodies.get_mut(&handle) else {
                return;
            };

            let result = boundary.shape.collide_ball(body.pos, body.radius());
            if !result.hit {
                continue;
            }

            match boundary.owner {
                Some(owner) => current.insert(ContactKey::Body(handle, owner)),
                None => current.insert(ContactKey::Boundary(handle, name.clone())),
            };

            if boundary.sensor {
                continue;
            }

            let (restitution, friction) = match surface {
                Some(p) => (
                    body.profile.elasticity * p.elasticity,
                    body.profile.friction.max(p.friction),
                ),
                None => (body.profile.elasticity, body.profile.friction),
            };
            body.pos += result.normal * result.penetration;
            body.vel = bounce_velocity(body.vel, result.normal, restitution, friction);
        }
    }

    /// Separate two overlapping balls and exchange momentum along the normal
    fn resolve_ball_pair(&mut self, a: BodyHandle, b: BodyHandle) -> bool {
        let (Some(body_a), Some(body_b)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return false;
        };
        let result = ball_ball_collision(body_a.pos, body_a.radius(), body_b.pos, body_b.radius());
        if !result.hit {
            return false;
        }

        let (mass_a, mass_b) = (body_a.mass(), body_b.mass());
        let restitution = body_a.profile.elasticity * body_b.profile.elasticity;
        let normal = result.normal;
        let closing = (body_a.vel - body_b.vel).dot(normal);
        let total = mass_a + mass_b;

        let impulse = if closing < 0.0 {
            -(1.0 + restitution) * closing / (1.0 / mass_a + 1.0 / mass_b)
        } else {
            0.0
        };

        if let Some(body) = self.bodies.get_mut(&a) {
            body.pos += normal * result.penetration * (mass_b / total);
            body.vel += normal * (impulse / mass_a);
        }
        if let Some(body) = self.bodies.get_mut(&b) {
            body.pos -= normal * result.penetration * (mass_a / total);
            body.vel -= normal * (impulse / mass_b);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;
    use std::f32::consts::FRAC_PI_2;

    fn ball_tag(id: u32) -> BodyTag {
        BodyTag::Ball(BallId(id))
    }

    #[test]
    fn test_add_boundary_replaces_same_name() {
        let mut world = CollisionWorld::new();
        world.add_boundary("top", Boundary::solid(Shape::segment(Vec2::ZERO, Vec2::X)));
        world.add_boundary("top", Boundary::sensor(Shape::segment(Vec2::ZERO, Vec2::Y)));
        assert_eq!(world.boundary_names().count(), 1);
        assert!(world.boundary("top").is_some_and(|b| b.sensor));

        world.remove_boundary("top");
        world.remove_boundary("top");
        assert!(world.boundary("top").is_none());
    }

    #[test]
    fn test_gravity_pulls_balls_not_pinned_bodies() {
        let mut world = CollisionWorld::new();
        world.set_gravity(Gravity::down(0.25));
        let ball = world.add_body(ball_tag(1), Vec2::new(50.0, 50.0), Vec2::splat(20.0));
        let paddle = world.add_body(BodyTag::Paddle, Vec2::new(50.0, 10.0), Vec2::new(80.0, 18.0));

        world.step(0.1);
        assert!(world.velocity(ball).is_some_and(|v| (v.y + 25.0).abs() < 1e-3));
        assert_eq!(world.position(paddle), Some(Vec2::new(50.0, 10.0)));
        assert_eq!(world.velocity(paddle), Some(Vec2::ZERO));
    }

    #[test]
    fn test_impulse_is_one_shot() {
        let mut world = CollisionWorld::new();
        let ball = world.add_body(ball_tag(1), Vec2::new(50.0, 50.0), Vec2::splat(20.0));
        world.apply_impulse(ball, Impulse::new(FRAC_PI_2, 300.0));
        assert_eq!(world.pending_impulses(), 1);

        world.step(0.01);
        world.step(0.01);
        assert_eq!(world.pending_impulses(), 0);
        let vel = world.velocity(ball).unwrap_or_default();
        assert!(vel.x.abs() < 1e-3);
        assert!((vel.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_clamp_velocity() {
        let mut world = CollisionWorld::new();
        let ball = world.add_body(ball_tag(1), Vec2::ZERO, Vec2::splat(20.0));

        world.clamp_velocity(ball, 100.0, 700.0);
        assert_eq!(world.velocity(ball), Some(Vec2::ZERO));

        world.set_velocity(ball, Vec2::new(10.0, 0.0));
        world.clamp_velocity(ball, 100.0, 700.0);
        assert!((world.velocity(ball).unwrap_or_default().length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_boundary_contact_events_begin_and_end() {
        let mut world = CollisionWorld::new();
        world.add_boundary(
            "left",
            Boundary::solid(Shape::segment(Vec2::ZERO, Vec2::new(0.0, 100.0))),
        );
        let ball = world.add_body(ball_tag(1), Vec2::new(12.0, 50.0), Vec2::splat(20.0));
        world.set_velocity(ball, Vec2::new(-300.0, 0.0));

        let events = world.step(0.01);
        assert_eq!(
            events,
            vec![ContactEvent::BoundaryBegan {
                body: ball,
                boundary: "left".to_string()
            }]
        );
        // Bounced back to the right
        assert!(world.velocity(ball).is_some_and(|v| v.x > 0.0));

        let events = world.step(0.05);
        assert_eq!(
            events,
            vec![ContactEvent::BoundaryEnded {
                body: ball,
                boundary: "left".to_string()
            }]
        );
    }

    #[test]
    fn test_sensor_reports_without_bouncing() {
        let mut world = CollisionWorld::new();
        world.add_boundary(
            "bottom",
            Boundary::sensor(Shape::segment(Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0))),
        );
        let ball = world.add_body(ball_tag(1), Vec2::new(0.0, 12.0), Vec2::splat(20.0));
        world.set_velocity(ball, Vec2::new(0.0, -300.0));

        let events = world.step(0.01);
        assert_eq!(events.len(), 1);
        assert!(world.velocity(ball).is_some_and(|v| v.y < 0.0));
    }

    #[test]
    fn test_owned_boundary_reports_body_contact() {
        let mut world = CollisionWorld::new();
        let frame = Rect::from_center_size(Vec2::new(50.0, 100.0), Vec2::new(50.0, 30.0));
        let brick = world.add_body(BodyTag::Brick(BrickId::new(0, 0)), frame.center(), frame.size());
        world.add_boundary("brick-0-0", Boundary::solid(Shape::Rect(frame)).owned_by(brick));

        let ball = world.add_body(ball_tag(1), Vec2::new(50.0, 77.0), Vec2::splat(20.0));
        world.set_velocity(ball, Vec2::new(0.0, 200.0));

        let events = world.step(0.01);
        assert_eq!(events, vec![ContactEvent::BodyBegan { a: ball, b: brick }]);
        assert!(world.velocity(ball).is_some_and(|v| v.y < 0.0));

        // Removing the brick drops its outline: no more contacts
        world.remove_body(brick);
        assert!(world.boundary("brick-0-0").is_none());
        world.set_position(ball, Vec2::new(50.0, 100.0));
        let events = world.step(0.001);
        assert!(events.is_empty());
    }

    #[test]
    fn test_ball_pair_exchanges_velocity() {
        let mut world = CollisionWorld::new();
        let a = world.add_body(ball_tag(1), Vec2::new(0.0, 0.0), Vec2::splat(20.0));
        let b = world.add_body(ball_tag(2), Vec2::new(19.0, 0.0), Vec2::splat(20.0));
        world.set_velocity(a, Vec2::new(200.0, 0.0));

        let events = world.step(0.001);
        assert_eq!(events, vec![ContactEvent::BodyBegan { a, b }]);
        let va = world.velocity(a).unwrap_or_default();
        let vb = world.velocity(b).unwrap_or_default();
        assert!(va.x.abs() < 1e-2);
        assert!((vb.x - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_remove_body_is_idempotent() {
        let mut world = CollisionWorld::new();
        let ball = world.add_body(ball_tag(1), Vec2::ZERO, Vec2::splat(20.0));
        world.apply_impulse(ball, Impulse::new(0.0, 100.0));
        assert!(world.remove_body(ball).is_some());
        assert!(world.remove_body(ball).is_none());
        assert_eq!(world.pending_impulses(), 0);
        world.set_velocity(ball, Vec2::X);
        assert_eq!(world.velocity(ball), None);
    }

    #[test]
    fn test_ball_elasticity_applies_to_live_balls() {
        let mut world = CollisionWorld::new();
        let ball = world.add_body(ball_tag(1), Vec2::ZERO, Vec2::splat(20.0));
        world.set_ball_elasticity(0.8);
        assert!(world.body(ball).is_some_and(|b| b.profile.elasticity == 0.8));
        let later = world.add_body(ball_tag(2), Vec2::X * 100.0, Vec2::splat(20.0));
        assert!(world.body(later).is_some_and(|b| b.profile.elasticity == 0.8));
    }
}
