use glam::Vec2;

use crate::constraints::ParticleContact;
use crate::particle::ParticleFlags;

use super::StageParams;

/// Surface tension between tensile particles.
///
/// `strength_a` pulls particles with few neighbours inwards; `strength_b`
/// smooths the surface using the per-particle weighted normal sums.
#[allow(clippy::too_many_arguments)]
pub fn solve_tensile(
    params: &StageParams,
    strength_a: f32,
    strength_b: f32,
    contacts: &[ParticleContact],
    velocities: &mut [Vec2],
    accumulation: &mut [f32],
    accumulation2: &mut [Vec2],
) {
    accumulation.fill(0.0);
    accumulation2.fill(Vec2::ZERO);
    for contact in contacts {
        if !contact.flags.contains(ParticleFlags::TENSILE) {
            continue;
        }
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        let w = contact.weight;
        let n = contact.normal;
        accumulation[a] += w;
        accumulation[b] += w;
        accumulation2[a] -= (1.0 - w) * w * n;
        accumulation2[b] += (1.0 - w) * w * n;
    }

    let strength_a = strength_a * params.critical_velocity();
    let strength_b = strength_b * params.critical_velocity();
    for contact in contacts {
        if !contact.flags.contains(ParticleFlags::TENSILE) {
            continue;
        }
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        let n = contact.normal;
        let h = accumulation[a] + accumulation[b];
        let s = accumulation2[b] - accumulation2[a];
        let fn_ = (strength_a * (h - 2.0) + strength_b * s.dot(n)) * contact.weight;
        let f = fn_ * n;
        velocities[a] -= f;
        velocities[b] += f;
    }
}
