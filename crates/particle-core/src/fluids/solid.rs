use glam::Vec2;

use crate::constraints::ParticleContact;
use crate::group::ParticleGroupHandle;

use super::StageParams;

/// Ejects particles of other groups out of solid groups, harder the deeper
/// they are inside.
pub fn solve_solid(
    params: &StageParams,
    ejection_strength: f32,
    contacts: &[ParticleContact],
    groups: &[Option<ParticleGroupHandle>],
    depth: &[f32],
    velocities: &mut [Vec2],
) {
    let strength = params.inv_dt * ejection_strength;
    for contact in contacts {
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        if groups[a] == groups[b] {
            continue;
        }
        let h = depth[a] + depth[b];
        let f = strength * h * contact.weight * contact.normal;
        velocities[a] -= f;
        velocities[b] += f;
    }
}
