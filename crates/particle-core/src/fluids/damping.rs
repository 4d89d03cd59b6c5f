use glam::Vec2;

use crate::constraints::{BodyContact, ParticleContact};
use crate::world::BodyWorld;

use super::StageParams;

/// Largest damping factor for a particle pair; at 0.5 the approach speed
/// along the normal drops exactly to zero.
const MAX_PAIR_DAMPING: f32 = 0.5;
const MAX_BODY_DAMPING: f32 = 1.0;

/// Removes approaching normal velocity from every contact.
///
/// Separating contacts (`vn >= 0`) are left alone, and the factor is
/// clamped so an approach is slowed but never turned into a separation.
pub fn solve_damping(
    params: &StageParams,
    damping_strength: f32,
    contacts: &[ParticleContact],
    body_contacts: &[BodyContact],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    world: &mut dyn BodyWorld,
) {
    for contact in body_contacts {
        let a = contact.index as usize;
        let p = positions[a];
        let n = contact.normal;
        let v = world.linear_velocity_from_world_point(contact.body, p) - velocities[a];
        let vn = v.dot(n);
        if vn < 0.0 {
            let factor = (damping_strength * contact.weight).min(MAX_BODY_DAMPING);
            let f = factor * contact.mass * vn * n;
            velocities[a] += params.particle_inv_mass * f;
            world.apply_linear_impulse(contact.body, -f, p);
        }
    }
    for contact in contacts {
        let a = contact.index_a as usize;
        let b = contact.index_b as usize;
        let n = contact.normal;
        let vn = (velocities[b] - velocities[a]).dot(n);
        if vn < 0.0 {
            let factor = (damping_strength * contact.weight).min(MAX_PAIR_DAMPING);
            let f = factor * vn * n;
            velocities[a] += f;
            velocities[b] -= f;
        }
    }
}
