use glam::Vec2;

use crate::particle::ParticleFlags;

/// Spring constraint between two particles of the same (or joined) group.
///
/// Pairs persist across steps until one of their particles is removed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pair {
    pub index_a: u32,
    pub index_b: u32,
    pub flags: ParticleFlags,
    pub strength: f32,
    /// Rest length.
    pub distance: f32,
}

impl Pair {
    pub fn new(index_a: u32, index_b: u32, positions: &[Vec2], flags: ParticleFlags, strength: f32) -> Self {
        Self {
            index_a,
            index_b,
            flags,
            strength,
            distance: positions[index_a as usize].distance(positions[index_b as usize]),
        }
    }
}

/// Pulls spring pairs back towards their rest length.
///
/// `spring_strength` is already divided by the step length.
pub fn solve_springs(pairs: &[Pair], positions: &[Vec2], velocities: &mut [Vec2], spring_strength: f32) {
    for pair in pairs {
        if !pair.flags.contains(ParticleFlags::SPRING) {
            continue;
        }
        let a = pair.index_a as usize;
        let b = pair.index_b as usize;
        let d = positions[b] - positions[a];
        let r1 = d.length();
        if r1 <= 0.0 {
            continue; // coincident: no direction to push along
        }
        let strength = spring_strength * pair.strength;
        let f = d * (strength * (pair.distance - r1) / r1);
        velocities[a] -= f;
        velocities[b] += f;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretched_spring_pulls_together() {
        let positions = vec![Vec2::ZERO, Vec2::new(1.0, 0.0)];
        let mut pair = Pair::new(0, 1, &positions, ParticleFlags::SPRING, 1.0);
        pair.distance = 0.5;
        let mut velocities = vec![Vec2::ZERO; 2];
        solve_springs(&[pair], &positions, &mut velocities, 1.0);
        assert!(velocities[0].x > 0.0 && velocities[1].x < 0.0);
        assert!((velocities[0] + velocities[1]).length() < 1e-6, "momentum conserved");
    }

    #[test]
    fn test_non_spring_pair_ignored() {
        let positions = vec![Vec2::ZERO, Vec2::new(1.0, 0.0)];
        let mut pair = Pair::new(0, 1, &positions, ParticleFlags::empty(), 1.0);
        pair.distance = 0.5;
        let mut velocities = vec![Vec2::ZERO; 2];
        solve_springs(&[pair], &positions, &mut velocities, 1.0);
        assert_eq!(velocities, vec![Vec2::ZERO; 2]);
    }
}
