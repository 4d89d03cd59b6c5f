use glam::Vec2;

use crate::math::{Aabb, Transform};
use crate::shapes::Shape;

use super::{destroy_flags, ParticleSystem};

/// Spatial queries over the particles.
impl ParticleSystem {
    /// Indices of particles that may lie in `[lower, upper]`: the proxy
    /// range when the index is current, every particle otherwise.
    fn candidates(&self, lower: Vec2, upper: Vec2) -> Vec<usize> {
        if self.index.is_stale() {
            (0..self.buffers.count).collect()
        } else {
            self.index
                .range(lower, upper)
                .iter()
                .map(|proxy| proxy.index as usize)
                .collect()
        }
    }

    /// Calls `callback` with every particle strictly inside `aabb` until it
    /// returns `false`.
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(usize) -> bool) {
        if self.buffers.count == 0 {
            return;
        }
        let positions = &self.buffers.position.data;
        for i in self.candidates(aabb.lower, aabb.upper) {
            if aabb.contains_strict(positions[i]) && !callback(i) {
                break;
            }
        }
    }

    /// Casts the segment `p1 -> p2` against the particles.
    ///
    /// `callback(index, point, normal, fraction)` returns the new maximum
    /// fraction: the hit fraction to clip, 1 to go on unclipped, or 0 or
    /// less to stop.
    pub fn ray_cast(&self, p1: Vec2, p2: Vec2, mut callback: impl FnMut(usize, Vec2, Vec2, f32) -> f32) {
        if self.buffers.count == 0 {
            return;
        }
        let v = p2 - p1;
        let v2 = v.length_squared();
        if v2 == 0.0 {
            return;
        }
        let diameter = self.def.diameter();
        let diameter_sq = diameter * diameter;
        let lower = p1.min(p2) - Vec2::splat(diameter);
        let upper = p1.max(p2) + Vec2::splat(diameter);
        let positions = &self.buffers.position.data;

        let mut fraction: f32 = 1.0;
        for i in self.candidates(lower, upper) {
            let p = p1 - positions[i];
            let pv = p.dot(v);
            let q = p.length_squared() - diameter_sq;
            let determinant = pv * pv - v2 * q;
            if determinant < 0.0 {
                continue;
            }
            let sqrt_determinant = determinant.sqrt();
            let mut t = (-pv - sqrt_determinant) / v2;
            if t > fraction {
                continue;
            }
            if t < 0.0 {
                t = (-pv + sqrt_determinant) / v2;
                if t < 0.0 || t > fraction {
                    continue;
                }
            }
            let normal = (p + t * v).normalize_or_zero();
            let clip = callback(i, p1 + t * v, normal, t);
            fraction = fraction.min(clip);
            if fraction <= 0.0 {
                break;
            }
        }
    }

    /// Kinetic energy lost along the normals of approaching contacts.
    pub fn compute_collision_energy(&self) -> f32 {
        let velocities = &self.buffers.velocity.data;
        let sum: f32 = self
            .contacts
            .iter()
            .map(|contact| {
                let v = velocities[contact.index_b as usize] - velocities[contact.index_a as usize];
                let vn = v.dot(contact.normal);
                if vn < 0.0 {
                    vn * vn
                } else {
                    0.0
                }
            })
            .sum();
        0.5 * self.particle_mass() * sum
    }

    /// Flags every particle inside `shape` placed at `xf` for removal and
    /// returns how many were flagged.
    pub fn destroy_particles_in_shape(&mut self, shape: &Shape, xf: &Transform, notify: bool) -> usize {
        self.refresh_index();
        let aabb = shape.compute_aabb(xf);
        let positions = &self.buffers.position.data;
        let inside: Vec<usize> = self
            .candidates(aabb.lower, aabb.upper)
            .into_iter()
            .filter(|&i| shape.test_point(xf, positions[i]))
            .collect();
        for &i in &inside {
            self.buffers.flags.data[i] |= destroy_flags(notify);
        }
        log::debug!("flagged {} particles in shape for removal", inside.len());
        inside.len()
    }
}
