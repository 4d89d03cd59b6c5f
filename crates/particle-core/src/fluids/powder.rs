use glam::Vec2;

use crate::config::PARTICLE_STRIDE;
use crate::constraints::{BodyContact, ParticleContact};
use crate::particle::ParticleFlags;
use crate::world::BodyWorld;

use super::StageParams;

/// Repels powder particles that are closer than the sampling stride.
#[allow(clippy::too_many_arguments)]
pub fn solve_powder(
    params: &StageParams,
    powder_strength: f32,
    contacts: &[ParticleContact],
    body_contacts: &[BodyContact],
    flags: &[ParticleFlags],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    world: &mut dyn BodyWorld,
) {
    let strength = powder_strength * params.critical_velocity();
    let min_weight = 1.0 - PARTICLE_STRIDE;
    for contact in body_contacts {
        let a = contact.index as usize;
        if !flags[a].contains(ParticleFlags::POWDER) || contact.weight <= min_weight {
            continue;
        }
        let p = positions[a];
        let f = strength * contact.mass * (contact.weight - min_weight) * contact.normal;
        velocities[a] -= params.particle_inv_mass * f;
        world.apply_linear_impulse(contact.body, f, p);
    }
    for contact in contacts {
        if !contact.flags.contains(ParticleFlags::POWDER) || contact.weight <= min_weight {
            continue;
        }
        let f = strength * (contact.weight - min_weight) * contact.normal;
        velocities[contact.index_a as usize] -= f;
        velocities[contact.index_b as usize] += f;
    }
}
