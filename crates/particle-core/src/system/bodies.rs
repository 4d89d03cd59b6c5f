use glam::Vec2;

use crate::config::LINEAR_SLOP;
use crate::constraints::BodyContact;
use crate::fluids::StageParams;
use crate::math::{cross, Aabb};
use crate::particle::ParticleFlags;
use crate::shapes::RayCastInput;
use crate::world::{BodyWorld, FixtureId};

use super::ParticleSystem;

/// Non-sensor fixtures overlapping `aabb`.
fn solid_fixtures(world: &dyn BodyWorld, aabb: &Aabb) -> Vec<FixtureId> {
    let mut fixtures = Vec::new();
    world.query_aabb(aabb, &mut |fixture| {
        if !world.is_sensor(fixture) {
            fixtures.push(fixture);
        }
        true
    });
    fixtures
}

/// Particle/body coupling.
impl ParticleSystem {
    /// Finds every particle within one diameter of a body fixture.
    pub(crate) fn update_body_contacts(&mut self, world: &mut dyn BodyWorld) {
        self.body_contacts.clear();
        let count = self.buffers.count;
        let positions = &self.buffers.position.data[..count];
        let flags = &self.buffers.flags.data[..count];
        let diameter = self.def.diameter();
        let particle_inv_mass = self.particle_inv_mass();

        let mut bounds = Aabb::empty();
        for &p in positions {
            bounds.include(p);
        }
        let fixtures = solid_fixtures(world, &bounds.inflated(diameter));

        for fixture in fixtures {
            let body = fixture.body;
            let mass_data = world.mass_data(body);
            let bp = world.world_center(body);
            let bm = mass_data.mass;
            let bi = mass_data.inertia - bm * mass_data.center.length_squared();
            let inv_bm = if bm > 0.0 { 1.0 / bm } else { 0.0 };
            let inv_bi = if bi > 0.0 { 1.0 / bi } else { 0.0 };

            for child in 0..world.child_count(fixture) {
                let aabb = world.fixture_aabb(fixture, child).inflated(diameter);
                for proxy in self.index.range(aabb.lower, aabb.upper) {
                    let a = proxy.index as usize;
                    let ap = positions[a];
                    if !aabb.contains(ap) {
                        continue;
                    }
                    let (d, n) = world.compute_distance(fixture, ap, child);
                    if d >= diameter {
                        continue;
                    }
                    let inv_am = if flags[a].contains(ParticleFlags::WALL) {
                        0.0
                    } else {
                        particle_inv_mass
                    };
                    let rpn = cross(ap - bp, n);
                    let inv_mass = inv_am + inv_bm + inv_bi * rpn * rpn;
                    self.body_contacts.push(BodyContact {
                        index: proxy.index,
                        body,
                        fixture,
                        weight: 1.0 - d / diameter,
                        normal: -n,
                        mass: if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 },
                    });
                }
            }
        }
        log::trace!("{} body contacts", self.body_contacts.len());
    }

    /// Stops particles that would pass through a fixture during this step,
    /// placing them just outside its surface and pushing the body.
    pub(crate) fn solve_collision(&mut self, world: &mut dyn BodyWorld, params: &StageParams) {
        let count = self.buffers.count;
        let dt = params.dt;
        let mut bounds = Aabb::empty();
        for (&p, &v) in self.buffers.position.data[..count]
            .iter()
            .zip(&self.buffers.velocity.data[..count])
        {
            bounds.include(p);
            bounds.include(p + dt * v);
        }
        let fixtures = solid_fixtures(world, &bounds);
        let diameter = self.def.diameter();
        let particle_mass = params.particle_mass;
        let positions = &self.buffers.position.data[..count];
        let velocities = &mut self.buffers.velocity.data[..count];

        for fixture in fixtures {
            let body = fixture.body;
            let xf = world.transform(body);
            let xf0 = world.previous_transform(body);
            for child in 0..world.child_count(fixture) {
                let aabb = world.fixture_aabb(fixture, child).inflated(diameter);
                for proxy in self.index.range(aabb.lower, aabb.upper) {
                    let a = proxy.index as usize;
                    let ap = positions[a];
                    if !aabb.contains(ap) {
                        continue;
                    }
                    let av = velocities[a];
                    let input = RayCastInput {
                        p1: xf.apply(xf0.apply_inverse(ap)),
                        p2: ap + dt * av,
                        max_fraction: 1.0,
                    };
                    let Some(output) = world.ray_cast(fixture, &input, child) else {
                        continue;
                    };
                    let p = (1.0 - output.fraction) * input.p1
                        + output.fraction * input.p2
                        + LINEAR_SLOP * output.normal;
                    let v: Vec2 = params.inv_dt * (p - ap);
                    velocities[a] = v;
                    let f = particle_mass * (av - v);
                    world.apply_linear_impulse(body, f.dot(output.normal) * output.normal, p);
                }
            }
        }
    }
}
