use glam::Vec2;

/// 2D cross product of two vectors (z component of the 3D cross product).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar angular velocity with a vector: `w x v`.
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Rotation stored as sine/cosine pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rot {
    pub s: f32,
    pub c: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    pub fn from_angle(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// Builds a rotation from an unnormalized `(s, c)` accumulator.
    ///
    /// Returns `None` when the accumulator is too short to define a direction
    /// (coincident particles, one-particle groups, symmetric cancellation).
    pub fn from_unnormalized(s: f32, c: f32) -> Option<Self> {
        let len_sq = s * s + c * c;
        if len_sq <= f32::EPSILON * f32::EPSILON || !len_sq.is_finite() {
            return None;
        }
        let inv = len_sq.sqrt().recip();
        Some(Self { s: s * inv, c: c * inv })
    }

    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    #[inline]
    pub fn mul_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse rotation applied to `v`.
    #[inline]
    pub fn mul_t_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Composition `self * other`.
    #[inline]
    pub fn mul(&self, other: Rot) -> Rot {
        Rot {
            s: self.s * other.c + self.c * other.s,
            c: self.c * other.c - self.s * other.s,
        }
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rigid 2D transform: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    pub fn new(p: Vec2, angle: f32) -> Self {
        Self {
            p,
            q: Rot::from_angle(angle),
        }
    }

    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.mul_vec(v) + self.p
    }

    #[inline]
    pub fn apply_inverse(&self, v: Vec2) -> Vec2 {
        self.q.mul_t_vec(v - self.p)
    }

    /// Composition `self * other` (apply `other` first).
    pub fn mul(&self, other: &Transform) -> Transform {
        Transform {
            p: self.q.mul_vec(other.p) + self.p,
            q: self.q.mul(other.q),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl Aabb {
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// An inverted box that any `include` call will snap to.
    pub fn empty() -> Self {
        Self {
            lower: Vec2::splat(f32::MAX),
            upper: Vec2::splat(-f32::MAX),
        }
    }

    pub fn include(&mut self, p: Vec2) {
        self.lower = self.lower.min(p);
        self.upper = self.upper.max(p);
    }

    pub fn combine(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn inflated(&self, margin: f32) -> Aabb {
        Aabb {
            lower: self.lower - Vec2::splat(margin),
            upper: self.upper + Vec2::splat(margin),
        }
    }

    /// Closed containment test.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.lower.x <= p.x && p.x <= self.upper.x && self.lower.y <= p.y && p.y <= self.upper.y
    }

    /// Open containment test (boundary excluded).
    #[inline]
    pub fn contains_strict(&self, p: Vec2) -> bool {
        self.lower.x < p.x && p.x < self.upper.x && self.lower.y < p.y && p.y < self.upper.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.lower.x <= other.upper.x
            && other.lower.x <= self.upper.x
            && self.lower.y <= other.upper.y
            && other.lower.y <= self.upper.y
    }
}
