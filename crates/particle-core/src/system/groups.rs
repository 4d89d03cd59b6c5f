use glam::Vec2;

use crate::callbacks::Goodbye;
use crate::config::{DEPTH_SURFACE_WEIGHT, MAX_TRIAD_DISTANCE_SQUARED};
use crate::constraints::{Pair, Triad};
use crate::error::{ParticleError, Result};
use crate::group::{
    compute_statistics, GroupStatistics, ParticleGroup, ParticleGroupDef, ParticleGroupFlags,
    ParticleGroupHandle,
};
use crate::math::{cross_sv, Transform};
use crate::particle::{ParticleDef, ParticleFlags};
use crate::shapes::Shape;
use crate::voronoi::VoronoiDiagram;

use super::ParticleSystem;

/// Grid points of spacing `stride` inside `shape`, in shape-local space.
fn sample_shape(shape: &Shape, stride: f32) -> Vec<Vec2> {
    let aabb = shape.compute_aabb(&Transform::IDENTITY);
    let mut points = Vec::new();
    let mut y = (aabb.lower.y / stride).floor() * stride;
    while y < aabb.upper.y {
        let mut x = (aabb.lower.x / stride).floor() * stride;
        while x < aabb.upper.x {
            let p = Vec2::new(x, y);
            if shape.test_point(&Transform::IDENTITY, p) {
                points.push(p);
            }
            x += stride;
        }
        y += stride;
    }
    points
}

/// Group management: creation, joining, destruction and statistics.
impl ParticleSystem {
    /// Creates a group, filling `def.shape` with particles on a square
    /// grid of spacing `0.75 * diameter`.
    ///
    /// Either every particle is created or none is.
    pub fn create_particle_group(&mut self, def: &ParticleGroupDef) -> Result<ParticleGroupHandle> {
        let stride = self.particle_stride();
        let points = def
            .shape
            .as_ref()
            .map(|shape| sample_shape(shape, stride))
            .unwrap_or_default();
        self.buffers.check_room(points.len())?;

        let transform = Transform::new(def.position, def.angle);
        let first = self.buffers.count;
        for &local in &points {
            let position = transform.apply(local);
            self.create_particle(&ParticleDef {
                flags: def.flags,
                position,
                velocity: def.linear_velocity + cross_sv(def.angular_velocity, position - def.position),
                color: def.color,
                user_data: def.user_data,
            })?;
        }
        let last = self.buffers.count;

        let mut group = ParticleGroup::new(first, last, def.group_flags, def.strength, transform);
        group.user_data = def.user_data;
        group.destroy_automatically = def.destroy_automatically;
        let handle = self.groups.insert(group);
        for slot in &mut self.buffers.group[first..last] {
            *slot = Some(handle);
        }

        self.rebuild_contacts(true);
        if def.flags.intersects(ParticleFlags::PAIR_FLAGS) {
            let positions = &self.buffers.position.data;
            for contact in &self.contacts {
                let a = contact.index_a.min(contact.index_b);
                let b = contact.index_a.max(contact.index_b);
                if first <= a as usize && (b as usize) < last {
                    self.pairs
                        .push(Pair::new(a, b, positions, contact.flags, def.strength));
                }
            }
        }
        if def.flags.intersects(ParticleFlags::TRIAD_FLAGS) {
            let max_distance_sq = MAX_TRIAD_DISTANCE_SQUARED * self.diameter() * self.diameter();
            let positions = &self.buffers.position.data;
            let flags = &self.buffers.flags.data;
            let mut diagram = VoronoiDiagram::with_capacity(last - first);
            for i in first..last {
                diagram.add_generator(positions[i], i as u32);
            }
            diagram.generate(stride / 2.0);
            let triads = &mut self.triads;
            diagram.nodes(|a, b, c| {
                triads.extend(Triad::try_new(
                    [a, b, c],
                    positions,
                    flags,
                    def.strength,
                    max_distance_sq,
                ));
            });
        }
        if def.group_flags.contains(ParticleGroupFlags::RIGID) {
            self.buffers.request_reference();
            self.buffers.reference[first..last].copy_from_slice(&points);
        }
        if def.group_flags.contains(ParticleGroupFlags::SOLID) {
            self.compute_depth(first, last);
        }
        log::info!(
            "created particle group of {} particles at [{}, {})",
            last - first,
            first,
            last
        );
        Ok(handle)
    }

    /// Merges `b` into `a`. Particles of `b` are moved in the buffers to
    /// follow those of `a`, and pairs and triads are added across the seam.
    /// `b` is invalid afterwards.
    pub fn join_particle_groups(&mut self, a: ParticleGroupHandle, b: ParticleGroupHandle) -> Result<()> {
        if a == b {
            log::warn!("refusing to join a particle group with itself");
            return Err(ParticleError::JoinSameGroup);
        }
        let (Some(group_b), true) = (self.groups.get(b), self.groups.contains_key(a)) else {
            return Err(ParticleError::InvalidGroup);
        };

        let (b_first, b_last) = (group_b.first, group_b.last);
        if b_first == b_last {
            self.groups.remove(b);
            log::info!("joined an empty particle group");
            return Ok(());
        }

        let count = self.buffers.count;
        self.rotate_buffer(b_first, b_last, count);
        // Empty groups keep a stale slot, so an empty `a` starts where `b` now sits.
        if self.groups[a].first == self.groups[a].last {
            let b_first = self.groups[b].first;
            let group_a = &mut self.groups[a];
            group_a.first = b_first;
            group_a.last = b_first;
        }
        let (a_first, a_last) = (self.groups[a].first, self.groups[a].last);
        let b_first = self.groups[b].first;
        self.rotate_buffer(a_first, a_last, b_first);

        let first = self.groups[a].first;
        let mid = self.groups[b].first;
        let last = self.groups[b].last;
        let particle_flags = self.buffers.flags.data[first..last]
            .iter()
            .fold(ParticleFlags::empty(), |acc, &f| acc | f);
        let strength = self.groups[a].strength.min(self.groups[b].strength);

        self.rebuild_contacts(true);
        if particle_flags.intersects(ParticleFlags::PAIR_FLAGS) {
            let positions = &self.buffers.position.data;
            for contact in &self.contacts {
                let i = contact.index_a.min(contact.index_b) as usize;
                let j = contact.index_a.max(contact.index_b) as usize;
                if first <= i && i < mid && mid <= j && j < last {
                    self.pairs
                        .push(Pair::new(i as u32, j as u32, positions, contact.flags, strength));
                }
            }
        }
        if particle_flags.intersects(ParticleFlags::TRIAD_FLAGS) {
            let max_distance_sq = MAX_TRIAD_DISTANCE_SQUARED * self.diameter() * self.diameter();
            let positions = &self.buffers.position.data;
            let flags = &self.buffers.flags.data;
            let mut diagram = VoronoiDiagram::with_capacity(last - first);
            for i in first..last {
                if !flags[i].contains(ParticleFlags::ZOMBIE) {
                    diagram.add_generator(positions[i], i as u32);
                }
            }
            diagram.generate(self.particle_stride() / 2.0);
            let triads = &mut self.triads;
            diagram.nodes(|ia, ib, ic| {
                let count_a = [ia, ib, ic].iter().filter(|&&i| (i as usize) < mid).count();
                let shared = flags[ia as usize] & flags[ib as usize] & flags[ic as usize];
                if (count_a == 1 || count_a == 2) && shared.intersects(ParticleFlags::TRIAD_FLAGS) {
                    triads.extend(Triad::try_new(
                        [ia, ib, ic],
                        positions,
                        flags,
                        strength,
                        max_distance_sq,
                    ));
                }
            });
        }

        for slot in &mut self.buffers.group[mid..last] {
            *slot = Some(a);
        }
        let b_flags = self.groups[b].group_flags;
        self.groups.remove(b);
        let group_a = &mut self.groups[a];
        group_a.group_flags |= b_flags;
        group_a.last = last;
        group_a.invalidate_stats();
        let (group_flags, transform) = (group_a.group_flags, group_a.transform);

        if group_flags.contains(ParticleGroupFlags::RIGID) {
            self.buffers.request_reference();
            for i in first..last {
                self.buffers.reference[i] = transform.apply_inverse(self.buffers.position.data[i]);
            }
        }
        if group_flags.contains(ParticleGroupFlags::SOLID) {
            self.compute_depth(first, last);
        }
        self.touch();
        log::info!("joined particle groups into [{}, {})", first, last);
        Ok(())
    }

    /// Destroys a group. Its particles survive without a group.
    pub fn destroy_particle_group(&mut self, handle: ParticleGroupHandle) -> Result<()> {
        if !self.groups.contains_key(handle) {
            return Err(ParticleError::InvalidGroup);
        }
        self.remove_group(handle, true);
        Ok(())
    }

    /// Flags every particle of the group for removal at the next step.
    pub fn destroy_particles_in_group(&mut self, handle: ParticleGroupHandle, notify: bool) -> Result<()> {
        let group = self.groups.get(handle).ok_or(ParticleError::InvalidGroup)?;
        for i in group.first_index()..group.last_index() {
            self.destroy_particle(i, notify)?;
        }
        Ok(())
    }

    pub(crate) fn remove_group(&mut self, handle: ParticleGroupHandle, notify: bool) {
        if notify {
            if let Some(listener) = self.listener.as_mut() {
                listener.say_goodbye(Goodbye::Group(handle));
            }
        }
        let Some(group) = self.groups.remove(handle) else {
            return;
        };
        for slot in &mut self.buffers.group[group.first..group.last] {
            *slot = None;
        }
        log::info!(
            "destroyed particle group of {} particles",
            group.particle_count()
        );
    }

    pub fn group(&self, handle: ParticleGroupHandle) -> Option<&ParticleGroup> {
        self.groups.get(handle)
    }

    pub fn groups(&self) -> impl Iterator<Item = (ParticleGroupHandle, &ParticleGroup)> {
        self.groups.iter()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Mass properties of a group, cached until the next step or write.
    pub fn group_statistics(&self, handle: ParticleGroupHandle) -> Result<GroupStatistics> {
        let group = self.groups.get(handle).ok_or(ParticleError::InvalidGroup)?;
        if let Some((timestamp, stats)) = group.stats.get() {
            if timestamp == self.timestamp {
                return Ok(stats);
            }
        }
        let range = group.first..group.last;
        let stats = compute_statistics(
            &self.buffers.position.data[range.clone()],
            &self.buffers.velocity.data[range],
            self.particle_mass(),
        );
        group.stats.set(Some((self.timestamp, stats)));
        Ok(stats)
    }

    /// Hop distance from each particle of `[first, last)` to the group
    /// surface, in world units. Surface particles are at depth 0.
    pub(crate) fn compute_depth(&mut self, first: usize, last: usize) {
        let internal = |a: usize, b: usize| first <= a && a < last && first <= b && b < last;

        let accumulation = &mut self.buffers.accumulation;
        accumulation[first..last].fill(0.0);
        for contact in &self.contacts {
            let (a, b) = (contact.index_a as usize, contact.index_b as usize);
            if internal(a, b) {
                accumulation[a] += contact.weight;
                accumulation[b] += contact.weight;
            }
        }

        self.buffers.request_depth();
        let depth = &mut self.buffers.depth;
        for i in first..last {
            depth[i] = if self.buffers.accumulation[i] < DEPTH_SURFACE_WEIGHT {
                0.0
            } else {
                f32::MAX
            };
        }
        for _ in 0..last - first {
            let mut updated = false;
            for contact in &self.contacts {
                let (a, b) = (contact.index_a as usize, contact.index_b as usize);
                if !internal(a, b) {
                    continue;
                }
                let r = 1.0 - contact.weight;
                if depth[a] > depth[b] + r {
                    depth[a] = depth[b] + r;
                    updated = true;
                }
                if depth[b] > depth[a] + r {
                    depth[b] = depth[a] + r;
                    updated = true;
                }
            }
            if !updated {
                break;
            }
        }
        let diameter = self.def.diameter();
        for d in &mut depth[first..last] {
            *d = if *d < f32::MAX { *d * diameter } else { 0.0 };
        }
    }
}
