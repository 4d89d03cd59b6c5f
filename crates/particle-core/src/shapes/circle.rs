use glam::Vec2;

use crate::math::{Aabb, Transform};

use super::{MassData, RayCastInput, RayCastOutput};

/// Solid disc centered at `center` in shape-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleShape {
    pub center: Vec2,
    pub radius: f32,
}

impl CircleShape {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let center = xf.apply(self.center);
        (p - center).length_squared() <= self.radius * self.radius
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let center = xf.apply(self.center);
        Aabb::new(center - Vec2::splat(self.radius), center + Vec2::splat(self.radius))
    }

    /// Signed distance from `p` to the rim and the outward direction.
    pub fn compute_distance(&self, xf: &Transform, p: Vec2) -> (f32, Vec2) {
        let d = p - xf.apply(self.center);
        let len = d.length();
        let normal = if len > 0.0 { d / len } else { Vec2::Y };
        (len - self.radius, normal)
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.apply(self.center);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;
        if sigma < 0.0 || rr < f32::EPSILON {
            return None;
        }

        // Smallest root: the ray enters the disc.
        let a = -(c + sigma.sqrt());
        if 0.0 <= a && a <= input.max_fraction * rr {
            let fraction = a / rr;
            Some(RayCastOutput {
                normal: (s + fraction * r).normalize_or_zero(),
                fraction,
            })
        } else {
            None
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * std::f32::consts::PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.center,
            inertia: mass * (0.5 * self.radius * self.radius + self.center.length_squared()),
        }
    }
}
