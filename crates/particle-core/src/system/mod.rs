//! The particle system: storage, the per-step solver pipeline, groups and
//! compaction.

mod bodies;
mod buffers;
mod compact;
mod groups;
mod queries;

use glam::Vec2;
use slotmap::SlotMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::callbacks::DestructionListener;
use crate::config::{ParticleSystemDef, PARTICLE_STRIDE};
use crate::constraints::{find_contacts, solve_elastic, solve_rigid_group, solve_springs};
use crate::constraints::{BodyContact, Pair, ParticleContact, Triad};
use crate::error::{ParticleError, Result};
use crate::fluids::{self, StageParams};
use crate::grid::SpatialIndex;
use crate::group::{ParticleGroup, ParticleGroupFlags, ParticleGroupHandle};
use crate::particle::{ParticleBuffers, ParticleDef, ParticleFlags};
use crate::world::{BodyWorld, NoBodies};

fn destroy_flags(notify: bool) -> ParticleFlags {
    if notify {
        ParticleFlags::ZOMBIE | ParticleFlags::DESTRUCTION_LISTENER
    } else {
        ParticleFlags::ZOMBIE
    }
}

/// A fixed-radius particle simulation.
///
/// Particles live in contiguous structure-of-arrays buffers. Indices are
/// stable until the next step that removes particles or until groups are
/// joined; groups are contiguous index ranges.
pub struct ParticleSystem {
    def: ParticleSystemDef,
    buffers: ParticleBuffers,
    index: SpatialIndex,
    contacts: Vec<ParticleContact>,
    body_contacts: Vec<BodyContact>,
    pairs: Vec<Pair>,
    triads: Vec<Triad>,
    groups: SlotMap<ParticleGroupHandle, ParticleGroup>,
    timestamp: u32,
    all_particle_flags: ParticleFlags,
    all_group_flags: ParticleGroupFlags,
    listener: Option<Box<dyn DestructionListener>>,
}

impl ParticleSystem {
    pub fn new(def: ParticleSystemDef) -> Result<Self> {
        def.validate()?;
        log::debug!(
            "creating particle system: radius {}, density {}, max count {}",
            def.radius,
            def.density,
            def.max_count
        );
        Ok(Self {
            buffers: ParticleBuffers::new(def.max_count),
            index: SpatialIndex::new(1.0 / def.diameter()),
            contacts: Vec::new(),
            body_contacts: Vec::new(),
            pairs: Vec::new(),
            triads: Vec::new(),
            groups: SlotMap::with_key(),
            timestamp: 0,
            all_particle_flags: ParticleFlags::empty(),
            all_group_flags: ParticleGroupFlags::empty(),
            listener: None,
            def,
        })
    }

    pub fn def(&self) -> &ParticleSystemDef {
        &self.def
    }

    pub fn radius(&self) -> f32 {
        self.def.radius
    }

    pub fn diameter(&self) -> f32 {
        self.def.diameter()
    }

    /// Changes the particle radius. Existing pairs and triads keep their
    /// rest shapes.
    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        let def = ParticleSystemDef {
            radius,
            ..self.def.clone()
        };
        def.validate()?;
        self.def = def;
        self.index.set_inv_diameter(1.0 / self.def.diameter());
        Ok(())
    }

    pub fn density(&self) -> f32 {
        self.def.density
    }

    pub fn set_density(&mut self, density: f32) -> Result<()> {
        let def = ParticleSystemDef {
            density,
            ..self.def.clone()
        };
        def.validate()?;
        self.def = def;
        Ok(())
    }

    pub fn gravity_scale(&self) -> f32 {
        self.def.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, gravity_scale: f32) {
        self.def.gravity_scale = gravity_scale;
    }

    pub fn damping(&self) -> f32 {
        self.def.damping_strength
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.def.damping_strength = damping;
    }

    pub fn max_count(&self) -> usize {
        self.buffers.max_count
    }

    /// Caps the number of live particles; 0 removes the cap.
    pub fn set_max_count(&mut self, max_count: usize) -> Result<()> {
        if max_count > 0 && max_count < self.buffers.count {
            return Err(ParticleError::InvalidMaxCount {
                requested: max_count,
                count: self.buffers.count,
            });
        }
        self.buffers.max_count = max_count;
        self.def.max_count = max_count;
        Ok(())
    }

    pub fn set_destruction_listener(&mut self, listener: impl DestructionListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_destruction_listener(&mut self) {
        self.listener = None;
    }

    pub fn particle_count(&self) -> usize {
        self.buffers.count
    }

    /// Number of particles that fit before storage must grow.
    pub fn particle_capacity(&self) -> usize {
        self.buffers.capacity()
    }

    /// Incremented by every step and every external write that may change
    /// group statistics.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Union of all particle flags as of the last step.
    pub fn all_particle_flags(&self) -> ParticleFlags {
        self.all_particle_flags
    }

    /// Union of all group flags as of the last step.
    pub fn all_group_flags(&self) -> ParticleGroupFlags {
        self.all_group_flags
    }

    pub fn contacts(&self) -> &[ParticleContact] {
        &self.contacts
    }

    pub fn body_contacts(&self) -> &[BodyContact] {
        &self.body_contacts
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn triads(&self) -> &[Triad] {
        &self.triads
    }

    pub(crate) fn particle_stride(&self) -> f32 {
        PARTICLE_STRIDE * self.def.diameter()
    }

    pub fn particle_mass(&self) -> f32 {
        let stride = self.particle_stride();
        self.def.density * stride * stride
    }

    pub fn particle_inv_mass(&self) -> f32 {
        1.0 / self.particle_mass()
    }

    fn touch(&mut self) {
        self.timestamp = self.timestamp.wrapping_add(1);
    }

    fn stage_params(&self, dt: f32) -> StageParams {
        StageParams {
            dt,
            inv_dt: 1.0 / dt,
            diameter: self.def.diameter(),
            density: self.def.density,
            particle_mass: self.particle_mass(),
            particle_inv_mass: self.particle_inv_mass(),
        }
    }

    /// Appends one particle and returns its index.
    pub fn create_particle(&mut self, def: &ParticleDef) -> Result<usize> {
        let index = self.buffers.create(def)?;
        self.index.push(index);
        Ok(index)
    }

    /// Flags a particle for removal at the next step.
    ///
    /// With `notify`, the destruction listener hears about it when it is removed.
    pub fn destroy_particle(&mut self, index: usize, notify: bool) -> Result<()> {
        let count = self.buffers.count;
        if index >= count {
            return Err(ParticleError::InvalidParticleIndex { index, count });
        }
        self.buffers.flags.data[index] |= destroy_flags(notify);
        Ok(())
    }

    /// Rebuilds the spatial index and the particle contacts from the
    /// current positions without advancing time.
    pub fn update_contacts(&mut self) {
        self.rebuild_contacts(false);
    }

    pub(crate) fn rebuild_contacts(&mut self, except_zombie: bool) {
        let count = self.buffers.count;
        let positions = &self.buffers.position.data[..count];
        let flags = &self.buffers.flags.data[..count];
        self.index.update(positions);
        self.contacts = find_contacts(self.index.proxies(), positions, flags, self.def.diameter());
        if except_zombie {
            self.contacts
                .retain(|c| !c.flags.contains(ParticleFlags::ZOMBIE));
        }
        log::trace!("{} particle contacts", self.contacts.len());
    }

    fn refresh_index(&mut self) {
        if self.index.is_stale() {
            let count = self.buffers.count;
            self.index.update(&self.buffers.position.data[..count]);
        }
    }

    /// Advances the simulation by `dt` without rigid bodies.
    pub fn step(&mut self, dt: f32, gravity: Vec2) {
        self.step_with_world(&mut NoBodies, dt, gravity);
    }

    /// Advances the simulation by `dt`, colliding with and pushing on the
    /// bodies of `world`.
    pub fn step_with_world(&mut self, world: &mut dyn BodyWorld, dt: f32, gravity: Vec2) {
        if !(dt > 0.0) {
            return;
        }
        self.touch();
        if self.buffers.count == 0 {
            return;
        }
        log::trace!("step dt={} count={}", dt, self.buffers.count);

        self.all_particle_flags = self.buffers.flags.data[..self.buffers.count]
            .iter()
            .fold(ParticleFlags::empty(), |acc, &f| acc | f);
        if self.all_particle_flags.contains(ParticleFlags::ZOMBIE) {
            self.solve_zombie();
            if self.buffers.count == 0 {
                return;
            }
        }
        self.all_group_flags = self
            .groups
            .values()
            .fold(ParticleGroupFlags::empty(), |acc, g| acc | g.group_flags);

        let params = self.stage_params(dt);
        self.apply_gravity(&params, gravity);
        self.refresh_index();
        self.solve_collision(world, &params);
        if self.all_group_flags.contains(ParticleGroupFlags::RIGID) {
            self.solve_rigid(dt);
        }
        if self.all_particle_flags.contains(ParticleFlags::WALL) {
            self.solve_wall();
        }
        self.integrate(dt);

        self.rebuild_contacts(false);
        self.update_body_contacts(world);

        self.solve_contact_stages(world, &params);
    }

    fn apply_gravity(&mut self, params: &StageParams, gravity: Vec2) {
        let count = self.buffers.count;
        let g = params.dt * self.def.gravity_scale * gravity;
        let critical_sq = params.critical_velocity_squared();
        let apply = |v: &mut Vec2| {
            *v += g;
            let v2 = v.length_squared();
            if v2 > critical_sq {
                *v *= (critical_sq / v2).sqrt();
            }
        };

        #[cfg(feature = "parallel")]
        self.buffers.velocity.data[..count].par_iter_mut().for_each(apply);

        #[cfg(not(feature = "parallel"))]
        self.buffers.velocity.data[..count].iter_mut().for_each(apply);
    }

    fn integrate(&mut self, dt: f32) {
        let count = self.buffers.count;
        let positions = &mut self.buffers.position.data[..count];
        let velocities = &self.buffers.velocity.data[..count];

        #[cfg(feature = "parallel")]
        positions
            .par_iter_mut()
            .zip(velocities.par_iter())
            .for_each(|(p, v)| *p += dt * *v);

        #[cfg(not(feature = "parallel"))]
        positions
            .iter_mut()
            .zip(velocities)
            .for_each(|(p, v)| *p += dt * *v);
    }

    fn solve_rigid(&mut self, dt: f32) {
        let positions = &self.buffers.position.data;
        let velocities = &mut self.buffers.velocity.data;
        let reference = &self.buffers.reference;
        for group in self.groups.values_mut() {
            if !group.group_flags.contains(ParticleGroupFlags::RIGID) || group.first == group.last {
                continue;
            }
            let range = group.first..group.last;
            group.transform = solve_rigid_group(
                &reference[range.clone()],
                &positions[range.clone()],
                &mut velocities[range],
                dt,
            );
        }
    }

    fn solve_wall(&mut self) {
        let count = self.buffers.count;
        for (v, f) in self.buffers.velocity.data[..count]
            .iter_mut()
            .zip(&self.buffers.flags.data[..count])
        {
            if f.contains(ParticleFlags::WALL) {
                *v = Vec2::ZERO;
            }
        }
    }

    fn solve_contact_stages(&mut self, world: &mut dyn BodyWorld, params: &StageParams) {
        let count = self.buffers.count;
        let all = self.all_particle_flags;
        let def = self.def.clone();

        if all.contains(ParticleFlags::TENSILE) {
            self.buffers.request_accumulation2();
        }
        if self.all_group_flags.contains(ParticleGroupFlags::SOLID) {
            self.buffers.request_depth();
        }
        if all.contains(ParticleFlags::COLOR_MIXING) {
            let capacity = self.buffers.internal_capacity;
            self.buffers.color.request(capacity);
        }

        let buffers = &mut self.buffers;
        let flags = &buffers.flags.data[..count];
        let positions = &buffers.position.data[..count];
        let velocities = &mut buffers.velocity.data[..count];
        let contacts = &self.contacts;
        let body_contacts = &self.body_contacts;

        if all.contains(ParticleFlags::VISCOUS) {
            fluids::solve_viscous(
                params,
                def.viscous_strength,
                contacts,
                body_contacts,
                flags,
                positions,
                velocities,
                world,
            );
        }
        if all.contains(ParticleFlags::POWDER) {
            fluids::solve_powder(
                params,
                def.powder_strength,
                contacts,
                body_contacts,
                flags,
                positions,
                velocities,
                world,
            );
        }
        if all.contains(ParticleFlags::TENSILE) {
            fluids::solve_tensile(
                params,
                def.surface_tension_strength_a,
                def.surface_tension_strength_b,
                contacts,
                velocities,
                &mut buffers.accumulation[..count],
                &mut buffers.accumulation2[..count],
            );
        }
        if all.contains(ParticleFlags::ELASTIC) {
            solve_elastic(
                &self.triads,
                positions,
                velocities,
                params.inv_dt * def.elastic_strength,
            );
        }
        if all.contains(ParticleFlags::SPRING) {
            solve_springs(
                &self.pairs,
                positions,
                velocities,
                params.inv_dt * def.spring_strength,
            );
        }
        if self.all_group_flags.contains(ParticleGroupFlags::SOLID) {
            fluids::solve_solid(
                params,
                def.ejection_strength,
                contacts,
                &buffers.group[..count],
                &buffers.depth[..count],
                velocities,
            );
        }
        if all.contains(ParticleFlags::COLOR_MIXING) {
            fluids::solve_color_mixing(
                def.color_mixing_strength,
                contacts,
                flags,
                &mut buffers.color.data[..count],
            );
        }
        fluids::solve_pressure(
            params,
            def.pressure_strength,
            contacts,
            body_contacts,
            flags,
            positions,
            velocities,
            &mut buffers.accumulation[..count],
            world,
        );
        fluids::solve_damping(
            params,
            def.damping_strength,
            contacts,
            body_contacts,
            positions,
            velocities,
            world,
        );
    }
}
