use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, Result};

/// Smallest capacity allocated the first time particle storage grows.
pub const MIN_PARTICLE_BUFFER_CAPACITY: usize = 256;

/// Sampling stride of group shapes, as a fraction of the diameter.
pub const PARTICLE_STRIDE: f32 = 0.75;

/// Contact-weight sum below which pressure is zero.
pub const MIN_PARTICLE_WEIGHT: f32 = 1.0;

/// Contact-weight sum above which pressure stops increasing.
pub const MAX_PARTICLE_WEIGHT: f32 = 5.0;

/// Longest triad edge, in diameters.
pub const MAX_TRIAD_DISTANCE: f32 = 2.0;
pub const MAX_TRIAD_DISTANCE_SQUARED: f32 = MAX_TRIAD_DISTANCE * MAX_TRIAD_DISTANCE;

/// Distance particles are kept off a body surface after a swept hit.
pub const LINEAR_SLOP: f32 = 0.005;

/// Contact-weight sum at which a solid particle counts as interior for depth.
pub const DEPTH_SURFACE_WEIGHT: f32 = 0.8;

/// Tunables of a particle system. Each strength feeds exactly one stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSystemDef {
    pub radius: f32,
    pub density: f32,
    pub gravity_scale: f32,
    /// Upper bound on live particles; 0 means unlimited.
    pub max_count: usize,
    pub pressure_strength: f32,
    pub damping_strength: f32,
    pub elastic_strength: f32,
    pub spring_strength: f32,
    pub viscous_strength: f32,
    pub surface_tension_strength_a: f32,
    pub surface_tension_strength_b: f32,
    pub powder_strength: f32,
    pub ejection_strength: f32,
    pub color_mixing_strength: f32,
}

impl Default for ParticleSystemDef {
    fn default() -> Self {
        Self {
            radius: 0.5,
            density: 1.0,
            gravity_scale: 1.0,
            max_count: 0,
            pressure_strength: 0.05,
            damping_strength: 1.0,
            elastic_strength: 0.25,
            spring_strength: 0.25,
            viscous_strength: 0.25,
            surface_tension_strength_a: 0.1,
            surface_tension_strength_b: 0.2,
            powder_strength: 0.5,
            ejection_strength: 0.5,
            color_mixing_strength: 0.5,
        }
    }
}

impl ParticleSystemDef {
    pub fn diameter(&self) -> f32 {
        2.0 * self.radius
    }

    /// Checks that every knob is finite and in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ParticleError::InvalidConfig(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ParticleError::InvalidConfig(format!(
                "density must be positive, got {}",
                self.density
            )));
        }
        if !self.gravity_scale.is_finite() {
            return Err(ParticleError::InvalidConfig(
                "gravity_scale must be finite".to_string(),
            ));
        }
        for (name, value) in [
            ("pressure_strength", self.pressure_strength),
            ("damping_strength", self.damping_strength),
            ("elastic_strength", self.elastic_strength),
            ("spring_strength", self.spring_strength),
            ("viscous_strength", self.viscous_strength),
            ("surface_tension_strength_a", self.surface_tension_strength_a),
            ("surface_tension_strength_b", self.surface_tension_strength_b),
            ("powder_strength", self.powder_strength),
            ("ejection_strength", self.ejection_strength),
            ("color_mixing_strength", self.color_mixing_strength),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParticleError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.color_mixing_strength > 1.0 {
            return Err(ParticleError::InvalidConfig(format!(
                "color_mixing_strength must be at most 1, got {}",
                self.color_mixing_strength
            )));
        }
        Ok(())
    }
}
