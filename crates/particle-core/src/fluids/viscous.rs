use glam::Vec2;

use crate::constraints::{BodyContact, ParticleContact};
use crate::particle::ParticleFlags;
use crate::world::BodyWorld;

use super::StageParams;

/// Blends the velocities of viscous particles with their neighbours' and
/// with the surface velocity of touching bodies.
#[allow(clippy::too_many_arguments)]
pub fn solve_viscous(
    params: &StageParams,
    viscous_strength: f32,
    contacts: &[ParticleContact],
    body_contacts: &[BodyContact],
    flags: &[ParticleFlags],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    world: &mut dyn BodyWorld,
) {
    for contact in body_contacts {
        let a = contact.index as usize;
        if !flags[a].contains(ParticleFlags::VISCOUS) {
            continue;
        }
        let p = positions[a];
        let v = world.linear_velocity_from_world_point(contact.body, p) - velocities[a];
        let f = viscous_strength * contact.mass * contact.weight * v;
        velocities[a] += params.particle_inv_mass * f;
        world.apply_linear_impulse(contact.body, -f, p);
    }
    for contact in contacts {
        if !contact.flags.contains(ParticleFlags::VISCOUS) {
            continue;
        }
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        let f = viscous_strength * contact.weight * (velocities[b] - velocities[a]);
        velocities[a] += f;
        velocities[b] -= f;
    }
}
