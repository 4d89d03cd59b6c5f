//! Convex shapes used to sample particle groups, select particles for
//! destruction and describe rigid-body fixtures.

pub mod circle;
pub mod polygon;

use glam::Vec2;

use crate::math::{Aabb, Transform};

pub use circle::CircleShape;
pub use polygon::PolygonShape;

/// Segment `p1 -> p2`, clipped at `max_fraction` of its length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCastOutput {
    pub normal: Vec2,
    pub fraction: f32,
}

/// Mass, centroid and rotational inertia about the local origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle(CircleShape),
    Polygon(PolygonShape),
}

impl Shape {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Shape::Circle(CircleShape::new(center, radius))
    }

    pub fn new_box(hx: f32, hy: f32) -> Self {
        Shape::Polygon(PolygonShape::new_box(hx, hy))
    }

    /// Convex polygon through `points`; `None` for degenerate input.
    pub fn polygon(points: &[Vec2]) -> Option<Self> {
        PolygonShape::from_vertices(points).map(Shape::Polygon)
    }

    /// Convex shapes have a single child.
    pub fn child_count(&self) -> usize {
        1
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.test_point(xf, p),
            Shape::Polygon(poly) => poly.test_point(xf, p),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Circle(c) => c.compute_aabb(xf),
            Shape::Polygon(poly) => poly.compute_aabb(xf),
        }
    }

    /// Signed distance to the surface (negative inside) and the direction
    /// from the surface towards `p`.
    pub fn compute_distance(&self, xf: &Transform, p: Vec2) -> (f32, Vec2) {
        match self {
            Shape::Circle(c) => c.compute_distance(xf, p),
            Shape::Polygon(poly) => poly.compute_distance(xf, p),
        }
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Polygon(poly) => poly.ray_cast(input, xf),
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Polygon(poly) => poly.compute_mass(density),
        }
    }
}
