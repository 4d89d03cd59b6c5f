use glam::Vec2;

use crate::config::{MAX_PARTICLE_WEIGHT, MIN_PARTICLE_WEIGHT};
use crate::constraints::{BodyContact, ParticleContact};
use crate::particle::ParticleFlags;
use crate::world::BodyWorld;

use super::StageParams;

/// Pushes apart crowded particles.
///
/// 1. Sum contact weights per particle (a dimensionless density)
/// 2. Zero the sum for particles that carry no pressure
/// 3. Map density to pressure, linear between the min and max weights
/// 4. Apply pairwise impulses along contact normals, and against bodies
///
/// `accumulation` holds the per-particle pressures on return.
#[allow(clippy::too_many_arguments)]
pub fn solve_pressure(
    params: &StageParams,
    pressure_strength: f32,
    contacts: &[ParticleContact],
    body_contacts: &[BodyContact],
    flags: &[ParticleFlags],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    accumulation: &mut [f32],
    world: &mut dyn BodyWorld,
) {
    accumulation.fill(0.0);
    for contact in body_contacts {
        accumulation[contact.index as usize] += contact.weight;
    }
    for contact in contacts {
        accumulation[contact.index_a as usize] += contact.weight;
        accumulation[contact.index_b as usize] += contact.weight;
    }

    for (h, f) in accumulation.iter_mut().zip(flags) {
        if f.intersects(ParticleFlags::NO_PRESSURE_FLAGS) {
            *h = 0.0;
        }
    }

    let pressure_per_weight = pressure_strength * params.critical_pressure();
    for h in accumulation.iter_mut() {
        let w = *h;
        *h = pressure_per_weight * (w.min(MAX_PARTICLE_WEIGHT) - MIN_PARTICLE_WEIGHT).max(0.0);
    }

    let velocity_per_pressure = params.dt / (params.density * params.diameter);
    for contact in body_contacts {
        let a = contact.index as usize;
        let w = contact.weight;
        let p = positions[a];
        let h = accumulation[a] + pressure_per_weight * w;
        let f = velocity_per_pressure * w * contact.mass * h * contact.normal;
        velocities[a] -= params.particle_inv_mass * f;
        world.apply_linear_impulse(contact.body, f, p);
    }
    for contact in contacts {
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        let h = accumulation[a] + accumulation[b];
        let f = velocity_per_pressure * contact.weight * h * contact.normal;
        velocities[a] -= f;
        velocities[b] += f;
    }
}
