use std::cell::Cell;

use bitflags::bitflags;
use glam::Vec2;
use slotmap::new_key_type;

use crate::math::Transform;
use crate::particle::{ParticleColor, ParticleFlags};
use crate::shapes::Shape;

new_key_type! {
    /// Generational handle of a particle group. Stays invalid after the
    /// group is destroyed, even if its slot is reused.
    pub struct ParticleGroupHandle;
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ParticleGroupFlags: u32 {
        /// Repels particles of other groups in proportion to depth.
        const SOLID = 1 << 0;
        /// Moves as one rigid body.
        const RIGID = 1 << 1;
    }
}

/// Description of a group to create.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleGroupDef {
    /// Flags given to every particle of the group.
    pub flags: ParticleFlags,
    pub group_flags: ParticleGroupFlags,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub color: ParticleColor,
    /// Scales the group's pairs and triads.
    pub strength: f32,
    /// Region to fill with particles, in group-local coordinates.
    pub shape: Option<Shape>,
    /// Destroy the group once its last particle is gone.
    pub destroy_automatically: bool,
    pub user_data: usize,
}

impl Default for ParticleGroupDef {
    fn default() -> Self {
        Self {
            flags: ParticleFlags::empty(),
            group_flags: ParticleGroupFlags::empty(),
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            color: ParticleColor::default(),
            strength: 1.0,
            shape: None,
            destroy_automatically: true,
            user_data: 0,
        }
    }
}

/// Mass properties of a group, assuming every particle has the same mass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupStatistics {
    pub mass: f32,
    pub inertia: f32,
    pub center: Vec2,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
}

/// A contiguous range `[first, last)` of particles.
#[derive(Debug)]
pub struct ParticleGroup {
    pub(crate) first: usize,
    pub(crate) last: usize,
    pub(crate) group_flags: ParticleGroupFlags,
    pub(crate) strength: f32,
    pub(crate) transform: Transform,
    pub(crate) user_data: usize,
    pub(crate) destroy_automatically: bool,
    pub(crate) to_be_destroyed: bool,
    pub(crate) to_be_split: bool,
    pub(crate) stats: Cell<Option<(u32, GroupStatistics)>>,
}

impl ParticleGroup {
    pub(crate) fn new(
        first: usize,
        last: usize,
        group_flags: ParticleGroupFlags,
        strength: f32,
        transform: Transform,
    ) -> Self {
        Self {
            first,
            last,
            group_flags,
            strength,
            transform,
            user_data: 0,
            destroy_automatically: true,
            to_be_destroyed: false,
            to_be_split: false,
            stats: Cell::new(None),
        }
    }

    pub fn first_index(&self) -> usize {
        self.first
    }

    pub fn last_index(&self) -> usize {
        self.last
    }

    pub fn particle_count(&self) -> usize {
        self.last - self.first
    }

    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index < self.last
    }

    pub fn group_flags(&self) -> ParticleGroupFlags {
        self.group_flags
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// For rigid groups, the motion applied to the group since creation;
    /// otherwise the transform it was created with.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.p
    }

    pub fn angle(&self) -> f32 {
        self.transform.q.angle()
    }

    pub fn user_data(&self) -> usize {
        self.user_data
    }

    pub fn destroy_automatically(&self) -> bool {
        self.destroy_automatically
    }

    pub(crate) fn invalidate_stats(&self) {
        self.stats.set(None);
    }
}

/// Mass-weighted statistics over `positions`/`velocities` with uniform
/// particle `mass`.
pub(crate) fn compute_statistics(positions: &[Vec2], velocities: &[Vec2], mass: f32) -> GroupStatistics {
    let mut stats = GroupStatistics::default();
    for (&p, &v) in positions.iter().zip(velocities) {
        stats.mass += mass;
        stats.center += mass * p;
        stats.linear_velocity += mass * v;
    }
    if stats.mass > 0.0 {
        stats.center /= stats.mass;
        stats.linear_velocity /= stats.mass;
    }
    let mut angular_momentum = 0.0;
    for (&p, &v) in positions.iter().zip(velocities) {
        let d = p - stats.center;
        stats.inertia += mass * d.length_squared();
        angular_momentum += mass * crate::math::cross(d, v - stats.linear_velocity);
    }
    if stats.inertia > 0.0 {
        stats.angular_velocity = angular_momentum / stats.inertia;
    }
    stats
}
