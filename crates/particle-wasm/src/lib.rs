use glam::Vec2;
use particle_core::{
    BasicWorld, ParticleColor, ParticleDef, ParticleFlags, ParticleGroupDef, ParticleGroupFlags,
    ParticleGroupHandle, ParticleSystem, ParticleSystemDef, Shape, Transform,
};
use wasm_bindgen::prelude::*;

/// GPU-compatible particle struct: 24 bytes, matches WGSL Particle
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParticle {
    position: [f32; 2], //  8 bytes
    velocity: [f32; 2], //  8 bytes
    radius: f32,        //  4 bytes
    color: ParticleColor, //  4 bytes
}

fn to_js(err: particle_core::ParticleError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct ParticleWorld {
    system: ParticleSystem,
    bodies: BasicWorld,
    /// Group ids handed to JS index this table; destroyed groups leave `None`.
    groups: Vec<Option<ParticleGroupHandle>>,
    gpu_buffer: Vec<GpuParticle>,
}

#[wasm_bindgen]
impl ParticleWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(radius: f32, max_count: usize) -> Result<ParticleWorld, JsValue> {
        let system = ParticleSystem::new(ParticleSystemDef {
            radius,
            max_count,
            ..Default::default()
        })
        .map_err(to_js)?;
        web_sys::console::log_1(
            &format!("WASM ParticleWorld created: radius {}, max {} particles", radius, max_count).into()
        );

        Ok(ParticleWorld {
            system,
            bodies: BasicWorld::new(),
            groups: Vec::new(),
            gpu_buffer: Vec::new(),
        })
    }

    /// Advances particles and bodies by `dt`; returns the elapsed milliseconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f32, gravity_x: f32, gravity_y: f32) -> f32 {
        let start = js_sys::Date::now();
        let gravity = Vec2::new(gravity_x, gravity_y);
        self.system.step_with_world(&mut self.bodies, dt, gravity);
        self.bodies.advance(dt, gravity);
        self.forget_destroyed_groups();
        self.write_gpu_output();
        let elapsed = js_sys::Date::now() - start;
        elapsed as f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_ptr(&self) -> *const f32 {
        self.gpu_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_byte_length(&self) -> usize {
        self.gpu_buffer.len() * std::mem::size_of::<GpuParticle>()
    }

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.system.particle_count()
    }

    #[wasm_bindgen]
    pub fn group_count(&self) -> usize {
        self.system.group_count()
    }

    #[wasm_bindgen]
    pub fn create_particle(
        &mut self,
        x: f32, y: f32,
        vx: f32, vy: f32,
        flags: u32,
        rgba: u32,
    ) -> Result<u32, JsValue> {
        let index = self
            .system
            .create_particle(&ParticleDef {
                flags: ParticleFlags::from_bits_truncate(flags),
                position: Vec2::new(x, y),
                velocity: Vec2::new(vx, vy),
                color: unpack_color(rgba),
                ..Default::default()
            })
            .map_err(to_js)?;
        self.write_gpu_output();
        Ok(index as u32)
    }

    #[wasm_bindgen]
    pub fn destroy_particle(&mut self, index: usize) -> Result<(), JsValue> {
        self.system.destroy_particle(index, false).map_err(to_js)
    }

    /// Fills a box centered at `(x, y)`; returns the new group id.
    #[wasm_bindgen]
    pub fn create_box_group(
        &mut self,
        x: f32, y: f32,
        half_width: f32, half_height: f32,
        angle: f32,
        flags: u32,
        group_flags: u32,
        rgba: u32,
    ) -> Result<u32, JsValue> {
        self.create_group(Shape::new_box(half_width, half_height), x, y, angle, flags, group_flags, rgba)
    }

    #[wasm_bindgen]
    pub fn create_circle_group(
        &mut self,
        x: f32, y: f32,
        radius: f32,
        flags: u32,
        group_flags: u32,
        rgba: u32,
    ) -> Result<u32, JsValue> {
        self.create_group(Shape::circle(Vec2::ZERO, radius), x, y, 0.0, flags, group_flags, rgba)
    }

    /// Merges group `b` into group `a`. The id of `b` becomes invalid.
    #[wasm_bindgen]
    pub fn join_groups(&mut self, a: u32, b: u32) -> Result<(), JsValue> {
        let (ha, hb) = (self.handle(a)?, self.handle(b)?);
        self.system.join_particle_groups(ha, hb).map_err(to_js)?;
        self.groups[b as usize] = None;
        self.write_gpu_output();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn destroy_group(&mut self, id: u32) -> Result<(), JsValue> {
        let handle = self.handle(id)?;
        self.system.destroy_particles_in_group(handle, false).map_err(to_js)
    }

    /// Flags every particle within `radius` of `(x, y)`; returns how many.
    #[wasm_bindgen]
    pub fn destroy_particles_in_circle(&mut self, x: f32, y: f32, radius: f32) -> u32 {
        let shape = Shape::circle(Vec2::ZERO, radius);
        let xf = Transform::new(Vec2::new(x, y), 0.0);
        self.system.destroy_particles_in_shape(&shape, &xf, false) as u32
    }

    #[wasm_bindgen]
    pub fn add_static_box(&mut self, x: f32, y: f32, half_width: f32, half_height: f32, angle: f32) {
        self.bodies
            .add_static_body(Vec2::new(x, y), angle, Shape::new_box(half_width, half_height));
    }

    #[wasm_bindgen]
    pub fn add_dynamic_box(
        &mut self,
        x: f32, y: f32,
        half_width: f32, half_height: f32,
        angle: f32,
        density: f32,
    ) {
        self.bodies.add_dynamic_body(
            Vec2::new(x, y),
            angle,
            Shape::new_box(half_width, half_height),
            density,
        );
    }

    #[wasm_bindgen]
    pub fn set_strengths(
        &mut self,
        pressure: f32,
        damping: f32,
        viscous: f32,
        elastic: f32,
        spring: f32,
        powder: f32,
    ) -> Result<(), JsValue> {
        let def = ParticleSystemDef {
            pressure_strength: pressure,
            damping_strength: damping,
            viscous_strength: viscous,
            elastic_strength: elastic,
            spring_strength: spring,
            powder_strength: powder,
            ..self.system.def().clone()
        };
        if self.system.particle_count() > 0 {
            return Err(JsValue::from_str("strengths can only be changed on an empty world"));
        }
        self.system = ParticleSystem::new(def).map_err(to_js)?;
        self.groups.clear();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_gravity_scale(&mut self, gravity_scale: f32) {
        self.system.set_gravity_scale(gravity_scale);
    }

    #[wasm_bindgen]
    pub fn set_damping(&mut self, damping: f32) {
        self.system.set_damping(damping);
    }

    #[wasm_bindgen]
    pub fn collision_energy(&self) -> f32 {
        self.system.compute_collision_energy()
    }
}

impl ParticleWorld {
    #[allow(clippy::too_many_arguments)]
    fn create_group(
        &mut self,
        shape: Shape,
        x: f32,
        y: f32,
        angle: f32,
        flags: u32,
        group_flags: u32,
        rgba: u32,
    ) -> Result<u32, JsValue> {
        let handle = self
            .system
            .create_particle_group(&ParticleGroupDef {
                flags: ParticleFlags::from_bits_truncate(flags),
                group_flags: ParticleGroupFlags::from_bits_truncate(group_flags),
                position: Vec2::new(x, y),
                angle,
                color: unpack_color(rgba),
                shape: Some(shape),
                ..Default::default()
            })
            .map_err(to_js)?;
        self.groups.push(Some(handle));
        self.write_gpu_output();
        Ok((self.groups.len() - 1) as u32)
    }

    fn handle(&self, id: u32) -> Result<ParticleGroupHandle, JsValue> {
        self.groups
            .get(id as usize)
            .copied()
            .flatten()
            .filter(|&h| self.system.group(h).is_some())
            .ok_or_else(|| JsValue::from_str(&format!("unknown particle group {}", id)))
    }

    fn forget_destroyed_groups(&mut self) {
        for slot in &mut self.groups {
            if matches!(slot, Some(h) if self.system.group(*h).is_none()) {
                *slot = None;
            }
        }
    }

    fn write_gpu_output(&mut self) {
        let radius = self.system.radius();
        let positions = self.system.positions();
        let velocities = self.system.velocities();
        let colors = self.system.colors();
        self.gpu_buffer.clear();
        self.gpu_buffer.extend(positions.iter().zip(velocities).enumerate().map(|(i, (p, v))| {
            GpuParticle {
                position: p.to_array(),
                velocity: v.to_array(),
                radius,
                color: colors.map_or(ParticleColor::new(255, 255, 255, 255), |c| c[i]),
            }
        }));
    }
}

fn unpack_color(rgba: u32) -> ParticleColor {
    let [r, g, b, a] = rgba.to_be_bytes();
    ParticleColor::new(r, g, b, a)
}
