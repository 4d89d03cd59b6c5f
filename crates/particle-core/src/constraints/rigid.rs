use glam::Vec2;

use crate::math::{cross, Rot, Transform};

/// Drives a rigid group's particles with one rigid-body motion.
///
/// `reference`, `positions` and `velocities` are the group's slices of the
/// reference, position and velocity buffers. The steps are:
/// 1. Centroid, mean velocity and angular velocity of the current state
/// 2. Least-squares rotation of the reference shape onto current positions
/// 3. Advance the fitted transform by the group's momentum over `dt`
/// 4. Give every particle the velocity that reaches its goal in one step
///
/// Returns the advanced transform, which maps reference to world space.
pub fn solve_rigid_group(
    reference: &[Vec2],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    dt: f32,
) -> Transform {
    let n = positions.len();
    if n == 0 {
        return Transform::IDENTITY;
    }
    let inv_n = 1.0 / n as f32;

    // Uniform particle mass cancels out of every mass-weighted average.
    let center = positions.iter().copied().sum::<Vec2>() * inv_n;
    let reference_center = reference.iter().copied().sum::<Vec2>() * inv_n;
    let linear_velocity = velocities.iter().copied().sum::<Vec2>() * inv_n;

    let mut inertia = 0.0;
    let mut angular_momentum = 0.0;
    let mut s = 0.0;
    let mut c = 0.0;
    for i in 0..n {
        let d = positions[i] - center;
        let o = reference[i] - reference_center;
        inertia += d.length_squared();
        angular_momentum += cross(d, velocities[i] - linear_velocity);
        s += cross(o, d);
        c += o.dot(d);
    }
    let angular_velocity = if inertia > 0.0 {
        angular_momentum / inertia
    } else {
        0.0
    };

    let fitted = Rot::from_unnormalized(s, c).unwrap_or_else(|| {
        if n > 1 {
            log::debug!("degenerate rigid fit over {} particles, using identity", n);
        }
        Rot::IDENTITY
    });
    let rotation = Rot::from_angle(dt * angular_velocity).mul(fitted);
    let goal_center = center + dt * linear_velocity;

    let inv_dt = 1.0 / dt;
    for i in 0..n {
        let goal = goal_center + rotation.mul_vec(reference[i] - reference_center);
        velocities[i] = (goal - positions[i]) * inv_dt;
    }

    Transform {
        p: goal_center - rotation.mul_vec(reference_center),
        q: rotation,
    }
}
