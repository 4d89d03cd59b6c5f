//! The rigid-body side of particle/body coupling.
//!
//! The particle system never owns bodies. It queries a [`BodyWorld`] for
//! fixtures near the particles, asks fixtures for distances and ray hits,
//! and pushes impulses back onto bodies once a query has returned.

use glam::Vec2;

use crate::math::{cross, cross_sv, Aabb, Rot, Transform};
use crate::shapes::{MassData, RayCastInput, RayCastOutput, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// A fixture is one shape attached to a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId {
    pub body: BodyId,
    pub index: u32,
}

/// Rigid-body world seen from the particle solver.
pub trait BodyWorld {
    /// Reports every fixture whose bounds overlap `aabb`. The callback
    /// returns `false` to stop the query.
    fn query_aabb(&self, aabb: &Aabb, callback: &mut dyn FnMut(FixtureId) -> bool);

    fn is_sensor(&self, fixture: FixtureId) -> bool;

    fn child_count(&self, fixture: FixtureId) -> usize;

    fn fixture_aabb(&self, fixture: FixtureId, child: usize) -> Aabb;

    /// Signed distance from `point` to the fixture and the direction away from it.
    fn compute_distance(&self, fixture: FixtureId, point: Vec2, child: usize) -> (f32, Vec2);

    fn ray_cast(
        &self,
        fixture: FixtureId,
        input: &RayCastInput,
        child: usize,
    ) -> Option<RayCastOutput>;

    /// Mass, local center of mass and inertia about the body origin.
    fn mass_data(&self, body: BodyId) -> MassData;

    fn transform(&self, body: BodyId) -> Transform;

    /// Transform at the start of the current step.
    fn previous_transform(&self, body: BodyId) -> Transform;

    fn linear_velocity_from_world_point(&self, body: BodyId, point: Vec2) -> Vec2;

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2);

    fn world_center(&self, body: BodyId) -> Vec2 {
        self.transform(body).apply(self.mass_data(body).center)
    }
}

/// A world without bodies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBodies;

impl BodyWorld for NoBodies {
    fn query_aabb(&self, _aabb: &Aabb, _callback: &mut dyn FnMut(FixtureId) -> bool) {}

    fn is_sensor(&self, _fixture: FixtureId) -> bool {
        true
    }

    fn child_count(&self, _fixture: FixtureId) -> usize {
        0
    }

    fn fixture_aabb(&self, _fixture: FixtureId, _child: usize) -> Aabb {
        Aabb::empty()
    }

    fn compute_distance(&self, _fixture: FixtureId, _point: Vec2, _child: usize) -> (f32, Vec2) {
        (f32::MAX, Vec2::ZERO)
    }

    fn ray_cast(&self, _: FixtureId, _: &RayCastInput, _: usize) -> Option<RayCastOutput> {
        None
    }

    fn mass_data(&self, _body: BodyId) -> MassData {
        MassData::default()
    }

    fn transform(&self, _body: BodyId) -> Transform {
        Transform::IDENTITY
    }

    fn previous_transform(&self, _body: BodyId) -> Transform {
        Transform::IDENTITY
    }

    fn linear_velocity_from_world_point(&self, _body: BodyId, _point: Vec2) -> Vec2 {
        Vec2::ZERO
    }

    fn apply_linear_impulse(&mut self, _body: BodyId, _impulse: Vec2, _point: Vec2) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub shape: Shape,
    pub density: f32,
    pub sensor: bool,
}

#[derive(Clone, Debug)]
pub struct Body {
    pub kind: BodyKind,
    /// World position of the center of mass.
    center: Vec2,
    angle: f32,
    previous: Transform,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    mass: MassData,
    inv_mass: f32,
    /// Inverse inertia about the center of mass.
    inv_inertia: f32,
    fixtures: Vec<Fixture>,
}

impl Body {
    pub fn transform(&self) -> Transform {
        let q = Rot::from_angle(self.angle);
        Transform {
            p: self.center - q.mul_vec(self.mass.center),
            q,
        }
    }

    pub fn world_center(&self) -> Vec2 {
        self.center
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    fn reset_mass(&mut self) {
        let origin = self.transform().p;
        let mut total = MassData::default();
        if self.kind == BodyKind::Dynamic {
            let mut weighted_center = Vec2::ZERO;
            for fixture in &self.fixtures {
                let m = fixture.shape.compute_mass(fixture.density);
                total.mass += m.mass;
                total.inertia += m.inertia;
                weighted_center += m.mass * m.center;
            }
            if total.mass > 0.0 {
                total.center = weighted_center / total.mass;
            }
        }
        self.inv_mass = if total.mass > 0.0 { 1.0 / total.mass } else { 0.0 };
        let central = total.inertia - total.mass * total.center.length_squared();
        self.inv_inertia = if central > 0.0 { 1.0 / central } else { 0.0 };
        self.mass = total;
        // Keep the body origin fixed while the center of mass moves.
        let q = Rot::from_angle(self.angle);
        self.center = origin + q.mul_vec(self.mass.center);
    }
}

/// A small rigid-body world of static and dynamic bodies.
///
/// Dynamic bodies accumulate impulses from particles and integrate them in
/// `advance`; there is no body-body collision.
#[derive(Clone, Debug, Default)]
pub struct BasicWorld {
    bodies: Vec<Body>,
}

impl BasicWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_body(&mut self, kind: BodyKind, position: Vec2, angle: f32) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        let transform = Transform::new(position, angle);
        self.bodies.push(Body {
            kind,
            center: position,
            angle,
            previous: transform,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: MassData::default(),
            inv_mass: 0.0,
            inv_inertia: 0.0,
            fixtures: Vec::new(),
        });
        id
    }

    pub fn add_static_body(&mut self, position: Vec2, angle: f32, shape: Shape) -> BodyId {
        let id = self.add_body(BodyKind::Static, position, angle);
        self.add_fixture(id, shape, 0.0, false);
        id
    }

    pub fn add_dynamic_body(&mut self, position: Vec2, angle: f32, shape: Shape, density: f32) -> BodyId {
        let id = self.add_body(BodyKind::Dynamic, position, angle);
        self.add_fixture(id, shape, density, false);
        id
    }

    pub fn add_fixture(&mut self, body: BodyId, shape: Shape, density: f32, sensor: bool) -> FixtureId {
        let b = &mut self.bodies[body.0 as usize];
        b.fixtures.push(Fixture {
            shape,
            density,
            sensor,
        });
        b.reset_mass();
        b.previous = b.transform();
        FixtureId {
            body,
            index: (b.fixtures.len() - 1) as u32,
        }
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id.0 as usize]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id.0 as usize]
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Integrates dynamic bodies over `dt` under `gravity` and records the
    /// transforms they started from.
    pub fn advance(&mut self, dt: f32, gravity: Vec2) {
        for body in &mut self.bodies {
            body.previous = body.transform();
            if body.kind != BodyKind::Dynamic {
                continue;
            }
            body.linear_velocity += dt * gravity;
            body.center += dt * body.linear_velocity;
            body.angle += dt * body.angular_velocity;
        }
    }

    fn fixture(&self, id: FixtureId) -> (&Body, &Fixture) {
        let body = &self.bodies[id.body.0 as usize];
        (body, &body.fixtures[id.index as usize])
    }
}

impl BodyWorld for BasicWorld {
    fn query_aabb(&self, aabb: &Aabb, callback: &mut dyn FnMut(FixtureId) -> bool) {
        for (b, body) in self.bodies.iter().enumerate() {
            let xf = body.transform();
            for (f, fixture) in body.fixtures.iter().enumerate() {
                if !fixture.shape.compute_aabb(&xf).overlaps(aabb) {
                    continue;
                }
                let id = FixtureId {
                    body: BodyId(b as u32),
                    index: f as u32,
                };
                if !callback(id) {
                    return;
                }
            }
        }
    }

    fn is_sensor(&self, fixture: FixtureId) -> bool {
        self.fixture(fixture).1.sensor
    }

    fn child_count(&self, fixture: FixtureId) -> usize {
        self.fixture(fixture).1.shape.child_count()
    }

    fn fixture_aabb(&self, fixture: FixtureId, _child: usize) -> Aabb {
        let (body, f) = self.fixture(fixture);
        f.shape.compute_aabb(&body.transform())
    }

    fn compute_distance(&self, fixture: FixtureId, point: Vec2, _child: usize) -> (f32, Vec2) {
        let (body, f) = self.fixture(fixture);
        f.shape.compute_distance(&body.transform(), point)
    }

    fn ray_cast(&self, fixture: FixtureId, input: &RayCastInput, _child: usize) -> Option<RayCastOutput> {
        let (body, f) = self.fixture(fixture);
        f.shape.ray_cast(input, &body.transform())
    }

    fn mass_data(&self, body: BodyId) -> MassData {
        self.body(body).mass
    }

    fn transform(&self, body: BodyId) -> Transform {
        self.body(body).transform()
    }

    fn previous_transform(&self, body: BodyId) -> Transform {
        self.body(body).previous
    }

    fn linear_velocity_from_world_point(&self, body: BodyId, point: Vec2) -> Vec2 {
        let b = self.body(body);
        b.linear_velocity + cross_sv(b.angular_velocity, point - b.center)
    }

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2) {
        let b = self.body_mut(body);
        if b.kind != BodyKind::Dynamic {
            return;
        }
        b.linear_velocity += b.inv_mass * impulse;
        b.angular_velocity += b.inv_inertia * cross(point - b.center, impulse);
    }

    fn world_center(&self, body: BodyId) -> Vec2 {
        self.body(body).center
    }
}
