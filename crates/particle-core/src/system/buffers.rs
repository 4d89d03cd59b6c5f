use glam::Vec2;

use crate::error::Result;
use crate::group::ParticleGroupHandle;
use crate::particle::{ParticleColor, ParticleFlags};

use super::ParticleSystem;

/// Buffer accessors. Slices cover the live particles only.
impl ParticleSystem {
    pub fn positions(&self) -> &[Vec2] {
        &self.buffers.position.data[..self.buffers.count]
    }

    /// Writing positions invalidates the spatial index until the next sort.
    pub fn positions_mut(&mut self) -> &mut [Vec2] {
        self.index.mark_stale();
        self.touch();
        &mut self.buffers.position.data[..self.buffers.count]
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.buffers.velocity.data[..self.buffers.count]
    }

    pub fn velocities_mut(&mut self) -> &mut [Vec2] {
        self.touch();
        &mut self.buffers.velocity.data[..self.buffers.count]
    }

    pub fn flags(&self) -> &[ParticleFlags] {
        &self.buffers.flags.data[..self.buffers.count]
    }

    pub fn flags_mut(&mut self) -> &mut [ParticleFlags] {
        &mut self.buffers.flags.data[..self.buffers.count]
    }

    /// `None` until a particle is given a non-default color.
    pub fn colors(&self) -> Option<&[ParticleColor]> {
        self.buffers
            .color
            .is_allocated()
            .then(|| &self.buffers.color.data[..self.buffers.count])
    }

    /// Materializes the color buffer if needed.
    pub fn colors_mut(&mut self) -> &mut [ParticleColor] {
        let capacity = self.buffers.internal_capacity;
        self.buffers.color.request(capacity);
        &mut self.buffers.color.data[..self.buffers.count]
    }

    pub fn user_data(&self) -> Option<&[usize]> {
        self.buffers
            .user_data
            .is_allocated()
            .then(|| &self.buffers.user_data.data[..self.buffers.count])
    }

    pub fn user_data_mut(&mut self) -> &mut [usize] {
        let capacity = self.buffers.internal_capacity;
        self.buffers.user_data.request(capacity);
        &mut self.buffers.user_data.data[..self.buffers.count]
    }

    /// Group of each particle.
    pub fn particle_groups(&self) -> &[Option<ParticleGroupHandle>] {
        &self.buffers.group[..self.buffers.count]
    }

    /// Depth below the surface of solid groups, once any solid group exists.
    pub fn depths(&self) -> Option<&[f32]> {
        (!self.buffers.depth.is_empty()).then(|| &self.buffers.depth[..self.buffers.count])
    }

    /// Uses `buffer` as position storage. Its length is a fixed capacity;
    /// creating more particles than fit fails with `CapacityExceeded`.
    pub fn set_position_buffer(&mut self, buffer: Vec<Vec2>) -> Result<()> {
        self.buffers.position.pin(buffer, self.buffers.count, "position")?;
        self.index.mark_stale();
        self.touch();
        Ok(())
    }

    pub fn set_velocity_buffer(&mut self, buffer: Vec<Vec2>) -> Result<()> {
        self.buffers.velocity.pin(buffer, self.buffers.count, "velocity")?;
        self.touch();
        Ok(())
    }

    pub fn set_flags_buffer(&mut self, buffer: Vec<ParticleFlags>) -> Result<()> {
        self.buffers.flags.pin(buffer, self.buffers.count, "flags")
    }

    pub fn set_color_buffer(&mut self, buffer: Vec<ParticleColor>) -> Result<()> {
        self.buffers.color.pin(buffer, self.buffers.count, "color")
    }

    pub fn set_user_data_buffer(&mut self, buffer: Vec<usize>) -> Result<()> {
        self.buffers.user_data.pin(buffer, self.buffers.count, "user data")
    }

    /// Returns a pinned position buffer and goes back to owned storage.
    pub fn release_position_buffer(&mut self) -> Option<Vec<Vec2>> {
        let (count, capacity) = self.release_sizes();
        self.buffers.position.release(count, capacity)
    }

    pub fn release_velocity_buffer(&mut self) -> Option<Vec<Vec2>> {
        let (count, capacity) = self.release_sizes();
        self.buffers.velocity.release(count, capacity)
    }

    pub fn release_flags_buffer(&mut self) -> Option<Vec<ParticleFlags>> {
        let (count, capacity) = self.release_sizes();
        self.buffers.flags.release(count, capacity)
    }

    pub fn release_color_buffer(&mut self) -> Option<Vec<ParticleColor>> {
        let (count, capacity) = self.release_sizes();
        self.buffers.color.release(count, capacity)
    }

    pub fn release_user_data_buffer(&mut self) -> Option<Vec<usize>> {
        let (count, capacity) = self.release_sizes();
        self.buffers.user_data.release(count, capacity)
    }

    fn release_sizes(&self) -> (usize, usize) {
        let count = self.buffers.count;
        (count, self.buffers.internal_capacity.max(count))
    }
}
