//! particle-core - fixed-radius 2D particle simulation
//!
//! Liquid, powder, elastic, spring and rigid materials built from equal-size
//! particles stored in contiguous buffers:
//! - Tag-sorted spatial index for neighbour and region queries
//! - Particle/particle and particle/body contact sets rebuilt every step
//! - Velocity stages for pressure, damping, viscosity, tension and more
//! - Groups as contiguous index ranges, joined and split in place
//!
//! Rigid bodies live outside the crate behind [`BodyWorld`]; [`BasicWorld`]
//! is a small implementation for tests and demos.

pub mod callbacks;
pub mod config;
pub mod constraints;
pub mod error;
pub mod fluids;
pub mod grid;
pub mod group;
pub mod math;
pub mod particle;
pub mod shapes;
pub mod system;
pub mod voronoi;
pub mod world;

pub use callbacks::{DestructionListener, Goodbye};
pub use config::ParticleSystemDef;
pub use error::{ParticleError, Result};
pub use group::{GroupStatistics, ParticleGroup, ParticleGroupDef, ParticleGroupFlags, ParticleGroupHandle};
pub use math::{Aabb, Rot, Transform};
pub use particle::{ParticleColor, ParticleDef, ParticleFlags};
pub use shapes::Shape;
pub use system::ParticleSystem;
pub use world::{BasicWorld, BodyId, BodyWorld, FixtureId, NoBodies};
