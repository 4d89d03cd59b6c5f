use glam::Vec2;

use crate::math::{cross, Rot};
use crate::particle::ParticleFlags;

/// Elastic constraint over three particles.
///
/// `pa`, `pb`, `pc` are the rest offsets from the triangle's centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triad {
    pub index_a: u32,
    pub index_b: u32,
    pub index_c: u32,
    pub flags: ParticleFlags,
    pub strength: f32,
    pub pa: Vec2,
    pub pb: Vec2,
    pub pc: Vec2,
}

impl Triad {
    /// Builds a triad from the current positions, or `None` when any edge
    /// is at least `sqrt(max_distance_sq)` long.
    pub fn try_new(
        [a, b, c]: [u32; 3],
        positions: &[Vec2],
        flags: &[ParticleFlags],
        strength: f32,
        max_distance_sq: f32,
    ) -> Option<Self> {
        let pa = positions[a as usize];
        let pb = positions[b as usize];
        let pc = positions[c as usize];
        let dab = pa - pb;
        let dbc = pb - pc;
        let dca = pc - pa;
        if dab.length_squared() >= max_distance_sq
            || dbc.length_squared() >= max_distance_sq
            || dca.length_squared() >= max_distance_sq
        {
            return None;
        }
        let mid = (pa + pb + pc) / 3.0;
        Some(Self {
            index_a: a,
            index_b: b,
            index_c: c,
            flags: flags[a as usize] | flags[b as usize] | flags[c as usize],
            strength,
            pa: pa - mid,
            pb: pb - mid,
            pc: pc - mid,
        })
    }
}

/// Restores each elastic triad towards its rest shape, rotated to best fit.
///
/// `elastic_strength` is already divided by the step length.
pub fn solve_elastic(triads: &[Triad], positions: &[Vec2], velocities: &mut [Vec2], elastic_strength: f32) {
    for triad in triads {
        if !triad.flags.contains(ParticleFlags::ELASTIC) {
            continue;
        }
        let a = triad.index_a as usize;
        let b = triad.index_b as usize;
        let c = triad.index_c as usize;
        let pa = positions[a];
        let pb = positions[b];
        let pc = positions[c];
        let p = (pa + pb + pc) / 3.0;
        let r = Rot::from_unnormalized(
            cross(triad.pa, pa) + cross(triad.pb, pb) + cross(triad.pc, pc),
            triad.pa.dot(pa) + triad.pb.dot(pb) + triad.pc.dot(pc),
        )
        .unwrap_or(Rot::IDENTITY);
        let strength = elastic_strength * triad.strength;
        velocities[a] += strength * (r.mul_vec(triad.pa) - (pa - p));
        velocities[b] += strength * (r.mul_vec(triad.pb) - (pb - p));
        velocities[c] += strength * (r.mul_vec(triad.pc) - (pc - p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]
    }

    #[test]
    fn test_long_edges_rejected() {
        let flags = vec![ParticleFlags::ELASTIC; 3];
        assert!(Triad::try_new([0, 1, 2], &triangle(), &flags, 1.0, 4.0).is_some());
        assert!(Triad::try_new([0, 1, 2], &triangle(), &flags, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_rest_shape_has_no_correction() {
        let positions = triangle();
        let flags = vec![ParticleFlags::ELASTIC; 3];
        let triad = Triad::try_new([0, 1, 2], &positions, &flags, 1.0, 4.0).unwrap();
        let mut velocities = vec![Vec2::ZERO; 3];
        solve_elastic(&[triad], &positions, &mut velocities, 1.0);
        for v in velocities {
            assert!(v.length() < 1e-5, "triad at rest must not move, got {v:?}");
        }
    }

    #[test]
    fn test_rotated_shape_has_no_correction() {
        let rest = triangle();
        let flags = vec![ParticleFlags::ELASTIC; 3];
        let triad = Triad::try_new([0, 1, 2], &rest, &flags, 1.0, 4.0).unwrap();
        let q = Rot::from_angle(0.9);
        let moved: Vec<Vec2> = rest.iter().map(|&p| q.mul_vec(p) + Vec2::new(3.0, -1.0)).collect();
        let mut velocities = vec![Vec2::ZERO; 3];
        solve_elastic(&[triad], &moved, &mut velocities, 1.0);
        for v in velocities {
            assert!(v.length() < 1e-4, "rigid motion of a triad is free, got {v:?}");
        }
    }
}
