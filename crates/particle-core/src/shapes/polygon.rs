use glam::Vec2;

use crate::config::LINEAR_SLOP;
use crate::math::{cross, Aabb, Transform};

use super::{MassData, RayCastInput, RayCastOutput};

/// Skin added around polygons when computing bounds.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Convex polygon with counter-clockwise vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonShape {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    centroid: Vec2,
}

impl PolygonShape {
    /// Axis-aligned box of half extents `hx`, `hy` around the origin.
    pub fn new_box(hx: f32, hy: f32) -> Self {
        Self::new_oriented_box(hx, hy, Vec2::ZERO, 0.0)
    }

    /// Box of half extents `hx`, `hy` centered at `center` and rotated by `angle`.
    pub fn new_oriented_box(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        let xf = Transform::new(center, angle);
        let corners = [
            Vec2::new(-hx, -hy),
            Vec2::new(hx, -hy),
            Vec2::new(hx, hy),
            Vec2::new(-hx, hy),
        ];
        let normals = [Vec2::NEG_Y, Vec2::X, Vec2::Y, Vec2::NEG_X];
        Self {
            vertices: corners.iter().map(|&v| xf.apply(v)).collect(),
            normals: normals.iter().map(|&n| xf.q.mul_vec(n)).collect(),
            centroid: center,
        }
    }

    /// Convex hull of `points`, or `None` when fewer than three points
    /// are distinct or they are collinear.
    pub fn from_vertices(points: &[Vec2]) -> Option<Self> {
        let weld_sq = (0.5 * LINEAR_SLOP) * (0.5 * LINEAR_SLOP);
        let mut unique: Vec<Vec2> = Vec::with_capacity(points.len());
        for &p in points {
            if unique.iter().all(|&q| p.distance_squared(q) > weld_sq) {
                unique.push(p);
            }
        }
        if unique.len() < 3 {
            return None;
        }

        // Gift wrapping from the lowest-rightmost point.
        let mut start = 0;
        for (i, p) in unique.iter().enumerate().skip(1) {
            let best = unique[start];
            if p.x > best.x || (p.x == best.x && p.y < best.y) {
                start = i;
            }
        }
        let mut hull = Vec::new();
        let mut current = start;
        loop {
            hull.push(current);
            let mut next = 0;
            for j in 1..unique.len() {
                if next == current {
                    next = j;
                    continue;
                }
                let r = unique[next] - unique[current];
                let v = unique[j] - unique[current];
                let c = cross(r, v);
                if c < 0.0 || (c == 0.0 && v.length_squared() > r.length_squared()) {
                    next = j;
                }
            }
            current = next;
            if current == start || hull.len() > unique.len() {
                break;
            }
        }
        if hull.len() < 3 {
            return None;
        }

        let vertices: Vec<Vec2> = hull.iter().map(|&i| unique[i]).collect();
        let mut normals = Vec::with_capacity(vertices.len());
        for i in 0..vertices.len() {
            let edge = vertices[(i + 1) % vertices.len()] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return None;
            }
            normals.push(Vec2::new(edge.y, -edge.x).normalize());
        }
        let centroid = polygon_mass(&vertices, 1.0)?.center;
        Some(Self {
            vertices,
            normals,
            centroid,
        })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let local = xf.apply_inverse(p);
        self.vertices
            .iter()
            .zip(&self.normals)
            .all(|(&v, &n)| n.dot(local - v) <= 0.0)
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let mut aabb = Aabb::empty();
        for &v in &self.vertices {
            aabb.include(xf.apply(v));
        }
        aabb.inflated(POLYGON_RADIUS)
    }

    /// Distance from `p` to the polygon, negative inside, with the direction
    /// pointing away from the surface.
    pub fn compute_distance(&self, xf: &Transform, p: Vec2) -> (f32, Vec2) {
        let local = xf.apply_inverse(p);
        let mut max_distance = -f32::MAX;
        let mut normal_for_max = local;
        for (&v, &n) in self.vertices.iter().zip(&self.normals) {
            let dot = n.dot(local - v);
            if dot > max_distance {
                max_distance = dot;
                normal_for_max = n;
            }
        }

        if max_distance > 0.0 {
            // Outside: the nearest feature may be a vertex.
            let mut min_distance = normal_for_max;
            let mut min_distance_sq = max_distance * max_distance;
            for &v in &self.vertices {
                let d = local - v;
                let d_sq = d.length_squared();
                if min_distance_sq > d_sq {
                    min_distance = d;
                    min_distance_sq = d_sq;
                }
            }
            (
                min_distance_sq.sqrt(),
                xf.q.mul_vec(min_distance).normalize_or_zero(),
            )
        } else {
            (max_distance, xf.q.mul_vec(normal_for_max))
        }
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inverse(input.p1);
        let p2 = xf.apply_inverse(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;
        for (i, (&v, &n)) in self.vertices.iter().zip(&self.normals).enumerate() {
            let numerator = n.dot(v - p1);
            let denominator = n.dot(d);
            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                upper = numerator / denominator;
            }
            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: xf.q.mul_vec(self.normals[i]),
            fraction: lower,
        })
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        polygon_mass(&self.vertices, density).unwrap_or(MassData {
            mass: 0.0,
            center: self.centroid,
            inertia: 0.0,
        })
    }
}

/// Area-weighted centroid and inertia about the local origin.
fn polygon_mass(vertices: &[Vec2], density: f32) -> Option<MassData> {
    const INV3: f32 = 1.0 / 3.0;
    let s = vertices[0];
    let mut center = Vec2::ZERO;
    let mut area = 0.0;
    let mut inertia = 0.0;
    for i in 0..vertices.len() {
        let e1 = vertices[i] - s;
        let e2 = vertices[(i + 1) % vertices.len()] - s;
        let d = cross(e1, e2);
        let triangle_area = 0.5 * d;
        area += triangle_area;
        center += triangle_area * INV3 * (e1 + e2);
        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        inertia += (0.25 * INV3 * d) * (int_x2 + int_y2);
    }
    if area <= f32::EPSILON {
        return None;
    }
    center /= area;
    let mass = density * area;
    let world_center = center + s;
    Some(MassData {
        mass,
        center: world_center,
        inertia: density * inertia
            + mass * (world_center.length_squared() - center.length_squared()),
    })
}
