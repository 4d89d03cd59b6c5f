use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::MIN_PARTICLE_BUFFER_CAPACITY;
use crate::error::{ParticleError, Result};
use crate::group::ParticleGroupHandle;

bitflags! {
    /// Per-particle behavior tags. An empty set is a plain liquid particle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ParticleFlags: u32 {
        /// Pending removal at the next compaction.
        const ZOMBIE = 1 << 1;
        /// Velocity pinned to zero.
        const WALL = 1 << 2;
        /// Joined to its neighbours by pairs.
        const SPRING = 1 << 3;
        /// Joined to its neighbours by triads.
        const ELASTIC = 1 << 4;
        const VISCOUS = 1 << 5;
        /// Repulsive only; excluded from pressure.
        const POWDER = 1 << 6;
        const TENSILE = 1 << 7;
        const COLOR_MIXING = 1 << 8;
        /// Report removal to the destruction listener.
        const DESTRUCTION_LISTENER = 1 << 9;
    }
}

impl ParticleFlags {
    /// Flags that create pairs when a group is built.
    pub const PAIR_FLAGS: Self = Self::SPRING;
    /// Flags that create triads when a group is built.
    pub const TRIAD_FLAGS: Self = Self::ELASTIC;
    /// Flags whose particles carry no pressure.
    pub const NO_PRESSURE_FLAGS: Self = Self::POWDER;
}

/// RGBA8 particle color.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct ParticleColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ParticleColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Description of a single particle to create.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParticleDef {
    pub flags: ParticleFlags,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: ParticleColor,
    /// Opaque host value; 0 leaves the user-data buffer unallocated.
    pub user_data: usize,
}

/// One attribute array, either owned and growable or pinned by the host.
#[derive(Debug, Default)]
pub(crate) struct ParticleBuffer<T> {
    pub data: Vec<T>,
    /// Length of a host-supplied buffer; 0 when the system owns the storage.
    pub user_supplied_capacity: usize,
}

impl<T: Copy + Default> ParticleBuffer<T> {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            user_supplied_capacity: 0,
        }
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn is_pinned(&self) -> bool {
        self.user_supplied_capacity > 0
    }

    /// Grows owned storage. Deferred buffers are grown only once allocated.
    fn grow(&mut self, capacity: usize, deferred: bool) {
        if self.is_pinned() || (deferred && !self.is_allocated()) {
            return;
        }
        self.data.resize(capacity, T::default());
    }

    /// Materializes a deferred buffer, default-filled to `capacity`.
    pub fn request(&mut self, capacity: usize) {
        if !self.is_allocated() {
            self.data = vec![T::default(); capacity];
        }
    }

    /// Replaces the storage with a host buffer, keeping the live prefix.
    pub fn pin(&mut self, mut buffer: Vec<T>, count: usize, name: &'static str) -> Result<()> {
        if buffer.is_empty() || buffer.len() < count {
            return Err(ParticleError::CapacityExceeded {
                buffer: name,
                capacity: buffer.len(),
            });
        }
        if self.is_allocated() {
            buffer[..count].copy_from_slice(&self.data[..count]);
        }
        self.user_supplied_capacity = buffer.len();
        self.data = buffer;
        Ok(())
    }

    /// Hands a pinned buffer back to the host and restores owned storage.
    pub fn release(&mut self, count: usize, capacity: usize) -> Option<Vec<T>> {
        if !self.is_pinned() {
            return None;
        }
        let mut owned = vec![T::default(); capacity];
        owned[..count].copy_from_slice(&self.data[..count]);
        self.user_supplied_capacity = 0;
        Some(std::mem::replace(&mut self.data, owned))
    }
}

fn limit_capacity(capacity: usize, limit: usize) -> usize {
    if limit > 0 && capacity > limit {
        limit
    } else {
        capacity
    }
}

fn rotate_range<T>(data: &mut [T], start: usize, mid: usize, end: usize) {
    if !data.is_empty() {
        data[start..end].rotate_left(mid - start);
    }
}

fn permute_range<T: Copy>(data: &mut [T], start: usize, order: &[usize]) {
    if data.is_empty() {
        return;
    }
    let moved: Vec<T> = order.iter().map(|&k| data[start + k]).collect();
    data[start..start + order.len()].copy_from_slice(&moved);
}

/// Structure-of-arrays particle storage.
///
/// `flags`, `position`, `velocity` and `group` are always allocated to the
/// internal capacity. `color`, `user_data`, `depth`, `reference` and
/// `accumulation2` stay empty until first needed and are then sized to the
/// same capacity.
#[derive(Debug)]
pub struct ParticleBuffers {
    pub(crate) count: usize,
    pub(crate) internal_capacity: usize,
    pub(crate) max_count: usize,
    pub(crate) flags: ParticleBuffer<ParticleFlags>,
    pub(crate) position: ParticleBuffer<Vec2>,
    pub(crate) velocity: ParticleBuffer<Vec2>,
    pub(crate) color: ParticleBuffer<ParticleColor>,
    pub(crate) user_data: ParticleBuffer<usize>,
    pub(crate) group: Vec<Option<ParticleGroupHandle>>,
    /// Distance to the group surface, solid groups only.
    pub(crate) depth: Vec<f32>,
    /// Reference positions for rigid groups.
    pub(crate) reference: Vec<Vec2>,
    /// Per-stage scratch: contact-weight sums, then pressures.
    pub(crate) accumulation: Vec<f32>,
    /// Per-stage scratch for surface tension.
    pub(crate) accumulation2: Vec<Vec2>,
}

impl ParticleBuffers {
    pub fn new(max_count: usize) -> Self {
        Self {
            count: 0,
            internal_capacity: 0,
            max_count,
            flags: ParticleBuffer::new(),
            position: ParticleBuffer::new(),
            velocity: ParticleBuffer::new(),
            color: ParticleBuffer::new(),
            user_data: ParticleBuffer::new(),
            group: Vec::new(),
            depth: Vec::new(),
            reference: Vec::new(),
            accumulation: Vec::new(),
            accumulation2: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of particles that fit without reallocating.
    pub fn capacity(&self) -> usize {
        self.pinned_capacities()
            .into_iter()
            .filter(|&(_, c)| c > 0)
            .fold(self.internal_capacity, |acc, (_, c)| acc.min(c))
    }

    fn pinned_capacities(&self) -> [(&'static str, usize); 5] {
        [
            ("flags", self.flags.user_supplied_capacity),
            ("position", self.position.user_supplied_capacity),
            ("velocity", self.velocity.user_supplied_capacity),
            ("color", self.color.user_supplied_capacity),
            ("user data", self.user_data.user_supplied_capacity),
        ]
    }

    fn grow(&mut self, capacity: usize) {
        log::debug!(
            "growing particle buffers {} -> {}",
            self.internal_capacity,
            capacity
        );
        self.flags.grow(capacity, false);
        self.position.grow(capacity, false);
        self.velocity.grow(capacity, false);
        self.color.grow(capacity, true);
        self.user_data.grow(capacity, true);
        self.group.resize(capacity, None);
        self.accumulation.resize(capacity, 0.0);
        if !self.accumulation2.is_empty() {
            self.accumulation2.resize(capacity, Vec2::ZERO);
        }
        if !self.depth.is_empty() {
            self.depth.resize(capacity, 0.0);
        }
        if !self.reference.is_empty() {
            self.reference.resize(capacity, Vec2::ZERO);
        }
        self.internal_capacity = capacity;
    }

    fn full_error(&self) -> ParticleError {
        let capacity = self.capacity();
        for (buffer, pinned) in self.pinned_capacities() {
            if pinned > 0 && pinned <= self.count {
                return ParticleError::CapacityExceeded {
                    buffer,
                    capacity: pinned,
                };
            }
        }
        if self.max_count > 0 && capacity >= self.max_count {
            ParticleError::MaxCountReached {
                max_count: self.max_count,
            }
        } else {
            ParticleError::CapacityExceeded {
                buffer: "particle",
                capacity,
            }
        }
    }

    /// Fails if `additional` more particles could never fit, whatever the
    /// growth, because of the max count or a pinned buffer.
    pub(crate) fn check_room(&self, additional: usize) -> Result<()> {
        let needed = self.count + additional;
        if self.max_count > 0 && needed > self.max_count {
            return Err(ParticleError::MaxCountReached {
                max_count: self.max_count,
            });
        }
        for (buffer, pinned) in self.pinned_capacities() {
            if pinned > 0 && needed > pinned {
                log::warn!("{} more particles do not fit the pinned {} buffer", additional, buffer);
                return Err(ParticleError::CapacityExceeded {
                    buffer,
                    capacity: pinned,
                });
            }
        }
        Ok(())
    }

    /// Appends one particle, growing storage when full.
    pub(crate) fn create(&mut self, def: &ParticleDef) -> Result<usize> {
        if self.max_count > 0 && self.count >= self.max_count {
            log::warn!("particle rejected: max count {} reached", self.max_count);
            return Err(ParticleError::MaxCountReached {
                max_count: self.max_count,
            });
        }
        if self.count >= self.capacity() {
            let mut capacity = (2 * self.count).max(MIN_PARTICLE_BUFFER_CAPACITY);
            capacity = limit_capacity(capacity, self.max_count);
            for (_, pinned) in self.pinned_capacities() {
                capacity = limit_capacity(capacity, pinned);
            }
            if self.internal_capacity < capacity {
                self.grow(capacity);
            }
        }
        if self.count >= self.capacity() {
            let err = self.full_error();
            log::warn!("particle rejected: {}", err);
            return Err(err);
        }
        let index = self.count;
        self.count += 1;
        self.flags.data[index] = def.flags;
        self.position.data[index] = def.position;
        self.velocity.data[index] = def.velocity;
        self.group[index] = None;
        if !self.depth.is_empty() {
            self.depth[index] = 0.0;
        }
        if !self.reference.is_empty() {
            self.reference[index] = def.position;
        }
        if self.color.is_allocated() || !def.color.is_zero() {
            self.color.request(self.internal_capacity);
            self.color.data[index] = def.color;
        }
        if self.user_data.is_allocated() || def.user_data != 0 {
            self.user_data.request(self.internal_capacity);
            self.user_data.data[index] = def.user_data;
        }
        Ok(index)
    }

    pub(crate) fn request_depth(&mut self) {
        if self.depth.is_empty() {
            self.depth = vec![0.0; self.internal_capacity];
        }
    }

    pub(crate) fn request_reference(&mut self) {
        if self.reference.is_empty() {
            let mut reference = vec![Vec2::ZERO; self.internal_capacity];
            reference[..self.count].copy_from_slice(&self.position.data[..self.count]);
            self.reference = reference;
        }
    }

    pub(crate) fn request_accumulation2(&mut self) {
        if self.accumulation2.is_empty() {
            self.accumulation2 = vec![Vec2::ZERO; self.internal_capacity];
        }
    }

    /// Copies every attribute of particle `from` into slot `to`.
    pub(crate) fn move_particle(&mut self, from: usize, to: usize) {
        self.flags.data[to] = self.flags.data[from];
        self.position.data[to] = self.position.data[from];
        self.velocity.data[to] = self.velocity.data[from];
        self.group[to] = self.group[from];
        if !self.depth.is_empty() {
            self.depth[to] = self.depth[from];
        }
        if !self.reference.is_empty() {
            self.reference[to] = self.reference[from];
        }
        if self.color.is_allocated() {
            self.color.data[to] = self.color.data[from];
        }
        if self.user_data.is_allocated() {
            self.user_data.data[to] = self.user_data.data[from];
        }
    }

    /// Moves `[mid, end)` to `start`, shifting `[start, mid)` behind it.
    pub(crate) fn rotate(&mut self, start: usize, mid: usize, end: usize) {
        rotate_range(&mut self.flags.data, start, mid, end);
        rotate_range(&mut self.position.data, start, mid, end);
        rotate_range(&mut self.velocity.data, start, mid, end);
        rotate_range(&mut self.group, start, mid, end);
        rotate_range(&mut self.depth, start, mid, end);
        rotate_range(&mut self.reference, start, mid, end);
        rotate_range(&mut self.color.data, start, mid, end);
        rotate_range(&mut self.user_data.data, start, mid, end);
    }

    /// Reorders `[start, start + order.len())` so slot `start + k` receives
    /// the particle previously at `start + order[k]`.
    pub(crate) fn permute(&mut self, start: usize, order: &[usize]) {
        permute_range(&mut self.flags.data, start, order);
        permute_range(&mut self.position.data, start, order);
        permute_range(&mut self.velocity.data, start, order);
        permute_range(&mut self.group, start, order);
        permute_range(&mut self.depth, start, order);
        permute_range(&mut self.reference, start, order);
        permute_range(&mut self.color.data, start, order);
        permute_range(&mut self.user_data.data, start, order);
    }
}
