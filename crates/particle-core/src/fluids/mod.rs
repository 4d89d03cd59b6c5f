//! Velocity stages that run over the contact lists after positions have
//! been integrated. Each stage is a free function over particle slices so
//! the system can skip stages that no live particle needs.

pub mod color;
pub mod damping;
pub mod powder;
pub mod pressure;
pub mod solid;
pub mod tensile;
pub mod viscous;

pub use color::solve_color_mixing;
pub use damping::solve_damping;
pub use powder::solve_powder;
pub use pressure::solve_pressure;
pub use solid::solve_solid;
pub use tensile::solve_tensile;
pub use viscous::solve_viscous;

/// Per-step quantities shared by the stages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageParams {
    pub dt: f32,
    pub inv_dt: f32,
    pub diameter: f32,
    pub density: f32,
    pub particle_mass: f32,
    pub particle_inv_mass: f32,
}

impl StageParams {
    /// Speed at which a particle crosses one diameter per step.
    pub fn critical_velocity(&self) -> f32 {
        self.diameter * self.inv_dt
    }

    pub fn critical_velocity_squared(&self) -> f32 {
        let v = self.critical_velocity();
        v * v
    }

    pub fn critical_pressure(&self) -> f32 {
        self.density * self.critical_velocity_squared()
    }
}
